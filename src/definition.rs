use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::account::AccountStatus;

pub type DefinitionId = u32;

/// Catalog template every client account is opened from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountDefinition {
    pub id: DefinitionId,
    /// Reference into the remote account-type catalog.
    pub account_type_id: String,
    /// Reference into the remote interest-rate catalog.
    pub interest_rate_id: String,
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
    pub status: AccountStatus,
    pub version: u64,
}

/// Fields supplied by the caller when creating or replacing a definition.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DefinitionDraft {
    pub account_type_id: String,
    pub interest_rate_id: String,
    pub code: String,
    pub name: String,
    pub description: Option<String>,
}

impl AccountDefinition {
    pub fn from_draft(draft: DefinitionDraft, now: DateTime<Utc>) -> Self {
        Self {
            id: 0,
            account_type_id: draft.account_type_id,
            interest_rate_id: draft.interest_rate_id,
            code: draft.code,
            name: draft.name,
            description: draft.description,
            created_at: now,
            modified_at: now,
            status: AccountStatus::Active,
            version: 1,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == AccountStatus::Active
    }

    /// Replaces the editable fields; identity, creation time and status stay.
    pub fn revise(&mut self, draft: DefinitionDraft, now: DateTime<Utc>) {
        self.account_type_id = draft.account_type_id;
        self.interest_rate_id = draft.interest_rate_id;
        self.code = draft.code;
        self.name = draft.name;
        self.description = draft.description;
        self.modified_at = now;
    }
}
