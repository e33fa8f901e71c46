use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::{
    account::AccountId,
    error::ErrorCategory,
    store::{LedgerStore, StoreError},
    transaction::{Transaction, TransactionId},
};

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("Transaction {0} not found")]
    TransactionNotFound(TransactionId),
    #[error("Account {0} not found")]
    AccountNotFound(AccountId),
    #[error("Range start {from} is after its end {to}")]
    InvalidRange {
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    },
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl HistoryError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            HistoryError::TransactionNotFound(_) | HistoryError::AccountNotFound(_) => {
                ErrorCategory::NotFound
            }
            HistoryError::InvalidRange { .. } => ErrorCategory::ValidationFailure,
            HistoryError::Store(err) => err.category(),
        }
    }
}

/// Read side of the transaction log.
pub struct TransactionHistory<S: ?Sized> {
    store: Arc<S>,
}

impl<S> TransactionHistory<S>
where
    S: LedgerStore + ?Sized,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub fn get(&self, id: TransactionId) -> Result<Transaction, HistoryError> {
        self.store
            .transaction_by_id(id)?
            .ok_or(HistoryError::TransactionNotFound(id))
    }

    /// Every row recorded against the account, newest first.
    pub fn list_for_account(&self, account_id: AccountId) -> Result<Vec<Transaction>, HistoryError> {
        if self.store.account_by_id(account_id)?.is_none() {
            return Err(HistoryError::AccountNotFound(account_id));
        }
        Ok(self.store.transactions_for_account(account_id)?)
    }

    /// Rows with `from <= timestamp <= to`, newest first.
    pub fn list_for_account_between(
        &self,
        account_id: AccountId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Transaction>, HistoryError> {
        if from > to {
            return Err(HistoryError::InvalidRange { from, to });
        }
        let mut rows = self.list_for_account(account_id)?;
        rows.retain(|tx| tx.timestamp >= from && tx.timestamp <= to);
        Ok(rows)
    }
}
