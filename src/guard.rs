use rust_decimal::Decimal;
use thiserror::Error;

use crate::{
    account::{AccountId, AccountStatus, ClientAccount},
    error::ErrorCategory,
};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GuardError {
    #[error("Account {account} is inactive")]
    AccountInactive { account: AccountId },
    #[error("Insufficient funds in account {account}: available {available}, requested {requested}")]
    InsufficientFunds {
        account: AccountId,
        available: Decimal,
        requested: Decimal,
    },
    #[error("Amount must be greater than zero, got {amount}")]
    InvalidAmount { amount: Decimal },
    #[error("Origin and destination are the same account ({account})")]
    SameAccount { account: AccountId },
    #[error("Crediting {amount} would overflow the balance of account {account}")]
    BalanceOverflow { account: AccountId, amount: Decimal },
}

impl GuardError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            GuardError::InvalidAmount { .. }
            | GuardError::SameAccount { .. }
            | GuardError::BalanceOverflow { .. } => ErrorCategory::ValidationFailure,
            GuardError::AccountInactive { .. } | GuardError::InsufficientFunds { .. } => {
                ErrorCategory::StateConflict
            }
        }
    }
}

pub fn require_active(account: &ClientAccount) -> Result<(), GuardError> {
    if account.status == AccountStatus::Active {
        Ok(())
    } else {
        Err(GuardError::AccountInactive {
            account: account.id,
        })
    }
}

pub fn require_sufficient_funds(account: &ClientAccount, amount: Decimal) -> Result<(), GuardError> {
    if account.available() >= amount {
        Ok(())
    } else {
        Err(GuardError::InsufficientFunds {
            account: account.id,
            available: account.available(),
            requested: amount,
        })
    }
}

/// Both balances must still be representable after the credit.
pub fn require_credit_fits(account: &ClientAccount, amount: Decimal) -> Result<(), GuardError> {
    let fits = account.available().checked_add(amount).is_some()
        && account.ledger().checked_add(amount).is_some();
    if fits {
        Ok(())
    } else {
        Err(GuardError::BalanceOverflow {
            account: account.id,
            amount,
        })
    }
}

pub fn require_positive_amount(amount: Decimal) -> Result<(), GuardError> {
    if amount > Decimal::ZERO {
        Ok(())
    } else {
        Err(GuardError::InvalidAmount { amount })
    }
}

pub fn require_distinct_endpoints(
    origin: AccountId,
    destination: AccountId,
) -> Result<(), GuardError> {
    if origin == destination {
        Err(GuardError::SameAccount { account: origin })
    } else {
        Ok(())
    }
}
