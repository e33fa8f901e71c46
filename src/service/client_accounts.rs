use std::sync::Arc;

use chrono::Utc;
use parking_lot::Mutex;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{
    account::{AccountId, AccountNumber, AccountStatus, ClientAccount},
    catalog::{CatalogError, ClientDirectory},
    command::AccountRef,
    definition::DefinitionId,
    error::ErrorCategory,
    numbering::AccountNumberGenerator,
    store::{DefinitionStore, LedgerStore, StoreError},
};

#[derive(Debug, Error)]
pub enum AccountServiceError {
    #[error("Account with {0} not found")]
    AccountNotFound(AccountRef),
    #[error("Client `{0}` not found")]
    ClientNotFound(String),
    #[error("Account definition {0} not found")]
    DefinitionNotFound(DefinitionId),
    #[error("Account definition {0} is inactive")]
    DefinitionInactive(DefinitionId),
    #[error("No unused account number found after {attempts} attempts")]
    NumberSpaceExhausted { attempts: u32 },
    #[error("Account {account} is at version {actual}, not {expected}")]
    StaleVersion {
        account: AccountId,
        expected: u64,
        actual: u64,
    },
    #[error("Client directory lookup failed")]
    Directory(#[source] CatalogError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl AccountServiceError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            AccountServiceError::AccountNotFound(_)
            | AccountServiceError::ClientNotFound(_)
            | AccountServiceError::DefinitionNotFound(_) => ErrorCategory::NotFound,
            AccountServiceError::DefinitionInactive(_) => ErrorCategory::ValidationFailure,
            AccountServiceError::NumberSpaceExhausted { .. }
            | AccountServiceError::StaleVersion { .. } => ErrorCategory::StateConflict,
            AccountServiceError::Directory(_) => ErrorCategory::DependencyFailure,
            AccountServiceError::Store(err) => err.category(),
        }
    }
}

/// Changes allowed on an existing account. Number and balances are not
/// reachable from here.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct AccountPatch {
    pub definition_id: Option<DefinitionId>,
    pub client_id: Option<String>,
    /// When set, the update only applies to this version of the account.
    pub expected_version: Option<u64>,
}

/// Lifecycle of client accounts: opening, lookup, reassignment and
/// activation. Balances are only ever changed by the processor.
pub struct ClientAccountService<S: ?Sized, D, G> {
    store: Arc<S>,
    directory: D,
    numbers: Mutex<G>,
    max_number_attempts: u32,
}

impl<S, D, G> ClientAccountService<S, D, G>
where
    S: LedgerStore + DefinitionStore + ?Sized,
    D: ClientDirectory,
    G: AccountNumberGenerator,
{
    pub fn new(store: Arc<S>, directory: D, numbers: G, max_number_attempts: u32) -> Self {
        Self {
            store,
            directory,
            numbers: Mutex::new(numbers),
            max_number_attempts,
        }
    }

    /// Opens an empty, active account for an existing client under an
    /// active definition.
    pub fn open(
        &self,
        client_id: &str,
        definition_id: DefinitionId,
    ) -> Result<ClientAccount, AccountServiceError> {
        self.require_client(client_id)?;
        self.require_active_definition(definition_id)?;

        for attempt in 1..=self.max_number_attempts {
            let number = self.numbers.lock().next_number();
            let account = ClientAccount::open(definition_id, client_id, number, Utc::now());
            match self.store.insert_account(account) {
                Ok(account) => {
                    info!(
                        account = account.id,
                        number = %account.number,
                        client = client_id,
                        "client account opened"
                    );
                    return Ok(account);
                }
                Err(StoreError::DuplicateAccountNumber(number)) => {
                    debug!(%number, attempt, "account number taken, drawing another");
                }
                Err(err) => return Err(err.into()),
            }
        }
        warn!(client = client_id, attempts = self.max_number_attempts, "account number space exhausted");
        Err(AccountServiceError::NumberSpaceExhausted {
            attempts: self.max_number_attempts,
        })
    }

    pub fn get(&self, id: AccountId) -> Result<ClientAccount, AccountServiceError> {
        self.store
            .account_by_id(id)?
            .ok_or(AccountServiceError::AccountNotFound(AccountRef::Id(id)))
    }

    pub fn get_by_number(&self, number: &AccountNumber) -> Result<ClientAccount, AccountServiceError> {
        self.store
            .account_by_number(number)?
            .ok_or_else(|| AccountServiceError::AccountNotFound(AccountRef::Number(number.clone())))
    }

    /// Looks an account up by number, hiding accounts owned by other clients.
    pub fn get_for_client(
        &self,
        client_id: &str,
        number: &AccountNumber,
    ) -> Result<ClientAccount, AccountServiceError> {
        self.get_by_number(number).and_then(|account| {
            if account.client_id == client_id {
                Ok(account)
            } else {
                Err(AccountServiceError::AccountNotFound(AccountRef::Number(number.clone())))
            }
        })
    }

    pub fn list_for_client(&self, client_id: &str) -> Result<Vec<ClientAccount>, AccountServiceError> {
        Ok(self.store.accounts_for_client(client_id)?)
    }

    pub fn update(
        &self,
        id: AccountId,
        patch: AccountPatch,
    ) -> Result<ClientAccount, AccountServiceError> {
        let mut account = self.get(id)?;
        if let Some(expected) = patch.expected_version {
            if expected != account.version {
                return Err(AccountServiceError::StaleVersion {
                    account: id,
                    expected,
                    actual: account.version,
                });
            }
        }
        if let Some(definition_id) = patch.definition_id {
            if self.store.definition_by_id(definition_id)?.is_none() {
                return Err(AccountServiceError::DefinitionNotFound(definition_id));
            }
            account.definition_id = definition_id;
        }
        if let Some(client_id) = patch.client_id {
            self.require_client(&client_id)?;
            account.client_id = client_id;
        }

        let version = account.version;
        let saved = self.store.save_account(account, version)?;
        info!(account = saved.id, version = saved.version, "client account updated");
        Ok(saved)
    }

    pub fn deactivate(&self, id: AccountId) -> Result<ClientAccount, AccountServiceError> {
        self.set_status(id, AccountStatus::Inactive)
    }

    pub fn activate(&self, id: AccountId) -> Result<ClientAccount, AccountServiceError> {
        self.set_status(id, AccountStatus::Active)
    }

    fn set_status(
        &self,
        id: AccountId,
        status: AccountStatus,
    ) -> Result<ClientAccount, AccountServiceError> {
        let mut account = self.get(id)?;
        if account.status == status {
            warn!(account = id, ?status, "account already in requested status");
            return Ok(account);
        }
        account.status = status;
        let version = account.version;
        let saved = self.store.save_account(account, version)?;
        info!(account = saved.id, ?status, "client account status changed");
        Ok(saved)
    }

    fn require_client(&self, client_id: &str) -> Result<(), AccountServiceError> {
        match self.directory.client_exists(client_id) {
            Ok(true) => Ok(()),
            Ok(false) => Err(AccountServiceError::ClientNotFound(client_id.to_owned())),
            Err(err) => {
                warn!(client = client_id, error = %err, "client directory lookup failed");
                Err(AccountServiceError::Directory(err))
            }
        }
    }

    fn require_active_definition(&self, id: DefinitionId) -> Result<(), AccountServiceError> {
        match self.store.definition_by_id(id)? {
            Some(definition) if definition.is_active() => Ok(()),
            Some(_) => Err(AccountServiceError::DefinitionInactive(id)),
            None => Err(AccountServiceError::DefinitionNotFound(id)),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use rust_decimal::Decimal;

    use crate::{
        catalog::fakes::FakeDirectory,
        definition::{AccountDefinition, DefinitionDraft},
        numbering::RandomAccountNumberGenerator,
        store::in_memory_store::InMemoryLedgerStore,
    };

    use super::*;

    /// Hands out a fixed sequence, repeating the last number forever.
    struct ScriptedNumbers(VecDeque<&'static str>);

    impl AccountNumberGenerator for ScriptedNumbers {
        fn next_number(&mut self) -> AccountNumber {
            let next = if self.0.len() > 1 {
                self.0.pop_front()
            } else {
                self.0.front().copied()
            };
            AccountNumber::parse(next.unwrap_or("0")).unwrap()
        }
    }

    fn store_with_definitions() -> Arc<InMemoryLedgerStore> {
        let store = InMemoryLedgerStore::new();
        for (code, name) in [("AHO", "Savings"), ("CTE", "Checking")] {
            store
                .insert_definition(AccountDefinition::from_draft(
                    DefinitionDraft {
                        account_type_id: "T".to_string(),
                        interest_rate_id: "R".to_string(),
                        code: code.to_string(),
                        name: name.to_string(),
                        description: None,
                    },
                    Utc::now(),
                ))
                .unwrap();
        }
        Arc::new(store)
    }

    fn service<G: AccountNumberGenerator>(
        store: Arc<InMemoryLedgerStore>,
        numbers: G,
    ) -> ClientAccountService<InMemoryLedgerStore, FakeDirectory, G> {
        ClientAccountService::new(store, FakeDirectory::with_clients(&["ana", "luis"]), numbers, 4)
    }

    #[test]
    fn open_creates_empty_active_account() {
        let store = store_with_definitions();
        let service = service(store, RandomAccountNumberGenerator::seeded(1, 10));

        let account = service.open("ana", 1).unwrap();
        assert_eq!(account.id, 1);
        assert_eq!(account.number.as_str().len(), 10);
        assert_eq!(account.available(), Decimal::ZERO);
        assert_eq!(account.ledger(), Decimal::ZERO);
        assert!(account.is_active());
        assert_eq!(account.version, 0);
        assert_eq!(service.get_by_number(&account.number).unwrap(), account);
    }

    #[test]
    fn open_checks_client_and_definition() {
        let store = store_with_definitions();
        let mut definition = store.definition_by_id(2).unwrap().unwrap();
        definition.status = AccountStatus::Inactive;
        definition.version = 2;
        store.save_definition(definition, 1).unwrap();
        let service = service(store, RandomAccountNumberGenerator::seeded(1, 10));

        assert!(matches!(
            service.open("nobody", 1).unwrap_err(),
            AccountServiceError::ClientNotFound(_)
        ));
        assert!(matches!(
            service.open("ana", 9).unwrap_err(),
            AccountServiceError::DefinitionNotFound(9)
        ));
        assert!(matches!(
            service.open("ana", 2).unwrap_err(),
            AccountServiceError::DefinitionInactive(2)
        ));
    }

    #[test]
    fn directory_outage_is_a_dependency_failure() {
        let store = store_with_definitions();
        let mut directory = FakeDirectory::with_clients(&["ana"]);
        directory.down = true;
        let service = ClientAccountService::new(
            store,
            directory,
            RandomAccountNumberGenerator::seeded(1, 10),
            4,
        );
        let err = service.open("ana", 1).unwrap_err();
        assert_eq!(err.category(), ErrorCategory::DependencyFailure);
    }

    #[test]
    fn taken_numbers_are_skipped_until_attempts_run_out() {
        let store = store_with_definitions();
        let service = service(
            store,
            ScriptedNumbers(VecDeque::from(["1111111111", "1111111111", "2222222222"])),
        );

        let first = service.open("ana", 1).unwrap();
        let second = service.open("luis", 1).unwrap();
        assert_eq!(first.number.as_str(), "1111111111");
        assert_eq!(second.number.as_str(), "2222222222");

        // the script now only yields a number that is taken
        let err = service.open("luis", 1).unwrap_err();
        assert!(matches!(
            err,
            AccountServiceError::NumberSpaceExhausted { attempts: 4 }
        ));
    }

    #[test]
    fn lookups_respect_ownership() {
        let store = store_with_definitions();
        let service = service(store, RandomAccountNumberGenerator::seeded(5, 10));
        let account = service.open("ana", 1).unwrap();
        service.open("ana", 2).unwrap();
        service.open("luis", 1).unwrap();

        assert_eq!(service.get_for_client("ana", &account.number).unwrap().id, account.id);
        assert!(matches!(
            service.get_for_client("luis", &account.number).unwrap_err(),
            AccountServiceError::AccountNotFound(_)
        ));
        assert_eq!(service.list_for_client("ana").unwrap().len(), 2);
        assert_eq!(service.get(42).unwrap_err().category(), ErrorCategory::NotFound);
    }

    #[test]
    fn update_changes_owner_and_definition_only() {
        let store = store_with_definitions();
        let service = service(store, RandomAccountNumberGenerator::seeded(3, 10));
        let account = service.open("ana", 1).unwrap();

        let updated = service
            .update(
                account.id,
                AccountPatch {
                    definition_id: Some(2),
                    client_id: Some("luis".to_string()),
                    expected_version: Some(0),
                },
            )
            .unwrap();
        assert_eq!(updated.definition_id, 2);
        assert_eq!(updated.client_id, "luis");
        assert_eq!(updated.number, account.number);
        assert_eq!(updated.version, 1);

        let stale = service
            .update(
                account.id,
                AccountPatch {
                    expected_version: Some(0),
                    ..AccountPatch::default()
                },
            )
            .unwrap_err();
        assert_eq!(stale.category(), ErrorCategory::StateConflict);

        let unknown_client = service
            .update(
                account.id,
                AccountPatch {
                    client_id: Some("nobody".to_string()),
                    ..AccountPatch::default()
                },
            )
            .unwrap_err();
        assert!(matches!(unknown_client, AccountServiceError::ClientNotFound(_)));
    }

    #[test]
    fn status_changes_are_idempotent() {
        let store = store_with_definitions();
        let service = service(store, RandomAccountNumberGenerator::seeded(3, 10));
        let account = service.open("ana", 1).unwrap();

        let inactive = service.deactivate(account.id).unwrap();
        assert_eq!(inactive.status, AccountStatus::Inactive);
        assert_eq!(inactive.version, 1);
        assert_eq!(service.deactivate(account.id).unwrap().version, 1);

        let active = service.activate(account.id).unwrap();
        assert!(active.is_active());
        assert_eq!(active.version, 2);
    }
}
