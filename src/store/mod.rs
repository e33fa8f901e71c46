use thiserror::Error;

use crate::{
    account::{AccountId, AccountNumber, ClientAccount},
    definition::{AccountDefinition, DefinitionId},
    error::ErrorCategory,
    transaction::{NewTransaction, Transaction, TransactionId},
};

pub mod in_memory_store;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("Account {account} was modified concurrently (expected version {expected}, found {actual})")]
    VersionConflict {
        account: AccountId,
        expected: u64,
        actual: u64,
    },
    #[error("Definition {definition} was modified concurrently (expected version {expected}, found {actual})")]
    DefinitionVersionConflict {
        definition: DefinitionId,
        expected: u64,
        actual: u64,
    },
    #[error("Account number {0} is already assigned")]
    DuplicateAccountNumber(AccountNumber),
    #[error("An account definition with {field} `{value}` already exists")]
    DuplicateDefinition { field: &'static str, value: String },
    #[error("Account {0} does not exist in the store")]
    UnknownAccount(AccountId),
    #[error("Definition {0} does not exist in the store")]
    UnknownDefinition(DefinitionId),
    #[error("Account number of account {0} cannot change")]
    AccountNumberChanged(AccountId),
    #[error("Ledger store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            StoreError::VersionConflict { .. } | StoreError::DefinitionVersionConflict { .. } => {
                ErrorCategory::StateConflict
            }
            StoreError::DuplicateAccountNumber(_)
            | StoreError::DuplicateDefinition { .. }
            | StoreError::AccountNumberChanged(_) => ErrorCategory::ValidationFailure,
            StoreError::UnknownAccount(_) | StoreError::UnknownDefinition(_) => {
                ErrorCategory::NotFound
            }
            StoreError::Unavailable(_) => ErrorCategory::DependencyFailure,
        }
    }
}

/// Account state to persist, valid only while the stored version still
/// equals `expected_version`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountWrite {
    pub account: ClientAccount,
    pub expected_version: u64,
}

/// Everything one logical operation writes. Committed all at once or not at all.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteBatch {
    pub accounts: Vec<AccountWrite>,
    pub transactions: Vec<NewTransaction>,
}

/// Stored state after a successful commit, in the order it was staged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitReceipt {
    pub accounts: Vec<ClientAccount>,
    pub transactions: Vec<Transaction>,
}

/// Durable storage for client accounts and their transaction log.
pub trait LedgerStore: Send + Sync {
    fn account_by_id(&self, id: AccountId) -> Result<Option<ClientAccount>, StoreError>;

    fn account_by_number(&self, number: &AccountNumber)
    -> Result<Option<ClientAccount>, StoreError>;

    fn accounts_for_client(&self, client_id: &str) -> Result<Vec<ClientAccount>, StoreError>;

    fn all_accounts(&self) -> Result<Vec<ClientAccount>, StoreError>;

    /// Inserts a new account, assigning its id. Fails on a duplicate number.
    fn insert_account(&self, account: ClientAccount) -> Result<ClientAccount, StoreError>;

    /// Applies every account write and appends every transaction atomically.
    /// A single stale `expected_version` rejects the whole batch with
    /// [`StoreError::VersionConflict`]. Stored versions advance by one.
    fn commit(&self, batch: WriteBatch) -> Result<CommitReceipt, StoreError>;

    fn transaction_by_id(&self, id: TransactionId) -> Result<Option<Transaction>, StoreError>;

    /// Newest first.
    fn transactions_for_account(&self, account_id: AccountId)
    -> Result<Vec<Transaction>, StoreError>;

    fn save_account(
        &self,
        account: ClientAccount,
        expected_version: u64,
    ) -> Result<ClientAccount, StoreError> {
        let account_id = account.id;
        let receipt = self.commit(WriteBatch {
            accounts: vec![AccountWrite {
                account,
                expected_version,
            }],
            transactions: Vec::new(),
        })?;
        receipt
            .accounts
            .into_iter()
            .next()
            .ok_or(StoreError::UnknownAccount(account_id))
    }
}

/// Storage for account definitions.
pub trait DefinitionStore: Send + Sync {
    fn definition_by_id(&self, id: DefinitionId) -> Result<Option<AccountDefinition>, StoreError>;

    fn definition_by_code(&self, code: &str) -> Result<Option<AccountDefinition>, StoreError>;

    fn definition_by_name(&self, name: &str) -> Result<Option<AccountDefinition>, StoreError>;

    /// Inserts a new definition, assigning its id. Code and name must be unique.
    fn insert_definition(
        &self,
        definition: AccountDefinition,
    ) -> Result<AccountDefinition, StoreError>;

    /// Replaces a definition if its stored version equals `expected_version`.
    /// The caller sets the new version on `definition`.
    fn save_definition(
        &self,
        definition: AccountDefinition,
        expected_version: u64,
    ) -> Result<AccountDefinition, StoreError>;
}
