use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::{
    account::AccountStatus,
    catalog::{AccountCatalog, AccountTypeDescriptor, CatalogError, InterestRateDescriptor},
    definition::{AccountDefinition, DefinitionDraft, DefinitionId},
    error::ErrorCategory,
    store::{DefinitionStore, StoreError},
};

#[derive(Debug, Error)]
pub enum DefinitionServiceError {
    #[error("Account definition {0} not found")]
    NotFound(DefinitionId),
    /// The definition is stored; only the remote lookups failed.
    #[error("Account definition {} saved but could not be enriched", .definition.id)]
    EnrichmentFailed {
        definition: Box<AccountDefinition>,
        #[source]
        source: CatalogError,
    },
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl DefinitionServiceError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            DefinitionServiceError::NotFound(_) => ErrorCategory::NotFound,
            DefinitionServiceError::EnrichmentFailed { .. } => ErrorCategory::DependencyFailure,
            DefinitionServiceError::Store(err) => err.category(),
        }
    }
}

/// Definition together with its remote classification and rate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnrichedDefinition {
    #[serde(flatten)]
    pub definition: AccountDefinition,
    pub account_type: AccountTypeDescriptor,
    pub interest_rate: InterestRateDescriptor,
}

pub struct AccountDefinitionService<S: ?Sized, C> {
    store: Arc<S>,
    catalog: C,
}

impl<S, C> AccountDefinitionService<S, C>
where
    S: DefinitionStore + ?Sized,
    C: AccountCatalog,
{
    pub fn new(store: Arc<S>, catalog: C) -> Self {
        Self { store, catalog }
    }

    /// Saves a new definition, then enriches it. Code and name must be unique.
    pub fn create(&self, draft: DefinitionDraft) -> Result<EnrichedDefinition, DefinitionServiceError> {
        let saved = self
            .store
            .insert_definition(AccountDefinition::from_draft(draft, Utc::now()))?;
        info!(definition = saved.id, code = %saved.code, "account definition created");
        self.enrich(saved)
    }

    pub fn get(&self, id: DefinitionId) -> Result<EnrichedDefinition, DefinitionServiceError> {
        let definition = self.load(id)?;
        self.enrich(definition)
    }

    pub fn update(
        &self,
        id: DefinitionId,
        draft: DefinitionDraft,
    ) -> Result<AccountDefinition, DefinitionServiceError> {
        let mut definition = self.load(id)?;
        let expected_version = definition.version;
        definition.revise(draft, Utc::now());
        definition.version += 1;
        let saved = self.store.save_definition(definition, expected_version)?;
        info!(definition = saved.id, version = saved.version, "account definition updated");
        Ok(saved)
    }

    /// Logical delete. Already inactive definitions are returned unchanged.
    pub fn deactivate(&self, id: DefinitionId) -> Result<AccountDefinition, DefinitionServiceError> {
        let mut definition = self.load(id)?;
        if !definition.is_active() {
            warn!(definition = id, "account definition already inactive");
            return Ok(definition);
        }
        let expected_version = definition.version;
        definition.status = AccountStatus::Inactive;
        definition.modified_at = Utc::now();
        definition.version += 1;
        let saved = self.store.save_definition(definition, expected_version)?;
        info!(definition = saved.id, "account definition deactivated");
        Ok(saved)
    }

    fn load(&self, id: DefinitionId) -> Result<AccountDefinition, DefinitionServiceError> {
        self.store
            .definition_by_id(id)?
            .ok_or(DefinitionServiceError::NotFound(id))
    }

    fn enrich(
        &self,
        definition: AccountDefinition,
    ) -> Result<EnrichedDefinition, DefinitionServiceError> {
        let lookup = self
            .catalog
            .account_type(&definition.account_type_id)
            .and_then(|account_type| {
                let rate = self.catalog.interest_rate(&definition.interest_rate_id)?;
                Ok((account_type, rate))
            });
        match lookup {
            Ok((account_type, interest_rate)) => Ok(EnrichedDefinition {
                definition,
                account_type,
                interest_rate,
            }),
            Err(source) => {
                warn!(definition = definition.id, error = %source, "definition enrichment failed");
                Err(DefinitionServiceError::EnrichmentFailed {
                    definition: Box::new(definition),
                    source,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{catalog::fakes::FakeCatalog, store::in_memory_store::InMemoryLedgerStore};

    use super::*;

    fn draft(code: &str, name: &str) -> DefinitionDraft {
        DefinitionDraft {
            account_type_id: "SAV".to_string(),
            interest_rate_id: "BASE".to_string(),
            code: code.to_string(),
            name: name.to_string(),
            description: Some("Standard savings".to_string()),
        }
    }

    fn service(catalog: FakeCatalog) -> AccountDefinitionService<InMemoryLedgerStore, FakeCatalog> {
        AccountDefinitionService::new(Arc::new(InMemoryLedgerStore::new()), catalog)
    }

    #[test]
    fn create_returns_enriched_definition() {
        let service = service(FakeCatalog::with_entries("SAV", "BASE"));
        let created = service.create(draft("AHO-01", "Savings")).unwrap();

        assert_eq!(created.definition.id, 1);
        assert_eq!(created.definition.version, 1);
        assert!(created.definition.is_active());
        assert_eq!(created.account_type.id, "SAV");
        assert_eq!(created.interest_rate.id, "BASE");
        assert_eq!(service.get(1).unwrap(), created);
    }

    #[test]
    fn duplicate_code_or_name_rejected() {
        let service = service(FakeCatalog::with_entries("SAV", "BASE"));
        service.create(draft("AHO-01", "Savings")).unwrap();

        let err = service.create(draft("AHO-01", "Other")).unwrap_err();
        assert!(matches!(
            err,
            DefinitionServiceError::Store(StoreError::DuplicateDefinition { field: "code", .. })
        ));
        let err = service.create(draft("AHO-02", "Savings")).unwrap_err();
        assert_eq!(err.category(), ErrorCategory::ValidationFailure);
    }

    #[test]
    fn enrichment_failure_keeps_saved_record() {
        let mut catalog = FakeCatalog::with_entries("SAV", "BASE");
        catalog.down = true;
        let service = service(catalog);

        let err = service.create(draft("AHO-01", "Savings")).unwrap_err();
        assert_eq!(err.category(), ErrorCategory::DependencyFailure);
        match err {
            DefinitionServiceError::EnrichmentFailed { definition, .. } => {
                assert_eq!(definition.id, 1)
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert!(service.store.definition_by_code("AHO-01").unwrap().is_some());
    }

    #[test]
    fn update_and_deactivate_bump_version() {
        let service = service(FakeCatalog::with_entries("SAV", "BASE"));
        service.create(draft("AHO-01", "Savings")).unwrap();
        service.create(draft("CTE-01", "Checking")).unwrap();

        let updated = service.update(1, draft("AHO-01", "Savings plus")).unwrap();
        assert_eq!(updated.version, 2);
        assert_eq!(updated.name, "Savings plus");

        // name clash with the other definition
        assert!(service.update(1, draft("AHO-01", "Checking")).is_err());

        let inactive = service.deactivate(1).unwrap();
        assert_eq!(inactive.status, AccountStatus::Inactive);
        assert_eq!(inactive.version, 3);
        assert_eq!(service.deactivate(1).unwrap().version, 3);

        assert!(matches!(
            service.update(9, draft("X", "Y")).unwrap_err(),
            DefinitionServiceError::NotFound(9)
        ));
    }
}
