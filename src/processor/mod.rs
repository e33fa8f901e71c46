use thiserror::Error;

use crate::{
    command::{AccountCommandError, AccountRef, TransactionRequest},
    error::ErrorCategory,
    guard::GuardError,
    store::StoreError,
    transaction::Transaction,
};

pub mod disbursement;
pub mod ledger_processor;
pub mod unit_of_work;

#[derive(Debug, Error)]
pub enum TransactionProcessError {
    #[error(transparent)]
    CommandErr(#[from] AccountCommandError),
    #[error(transparent)]
    GuardErr(#[from] GuardError),
    #[error("Account with {0} not found")]
    AccountNotFound(AccountRef),
    #[error(transparent)]
    StoreErr(#[from] StoreError),
}

impl TransactionProcessError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            TransactionProcessError::CommandErr(err) => err.category(),
            TransactionProcessError::GuardErr(err) => err.category(),
            TransactionProcessError::AccountNotFound(_) => ErrorCategory::NotFound,
            TransactionProcessError::StoreErr(err) => err.category(),
        }
    }
}

pub trait TransactionProcessor {
    /// Settles one deposit, withdrawal or transfer and returns its ledger
    /// row. For transfers that is the outbound leg.
    fn process_transaction(
        &self,
        request: TransactionRequest,
    ) -> Result<Transaction, TransactionProcessError>;
}
