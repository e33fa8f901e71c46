//! Interfaces to services owned by other teams: the account-type and
//! interest-rate catalogs, and the client directory.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::ErrorCategory;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    #[error("{entity} `{id}` not found")]
    NotFound { entity: &'static str, id: String },
    #[error("Remote service unavailable: {0}")]
    Unavailable(String),
}

impl CatalogError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            CatalogError::NotFound { .. } => ErrorCategory::NotFound,
            CatalogError::Unavailable(_) => ErrorCategory::DependencyFailure,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountTypeDescriptor {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterestRateDescriptor {
    pub id: String,
    pub name: String,
    pub rate: Decimal,
}

pub trait AccountCatalog: Send + Sync {
    fn account_type(&self, id: &str) -> Result<AccountTypeDescriptor, CatalogError>;

    fn interest_rate(&self, id: &str) -> Result<InterestRateDescriptor, CatalogError>;
}

pub trait ClientDirectory: Send + Sync {
    fn client_exists(&self, client_id: &str) -> Result<bool, CatalogError>;
}
