use std::{fmt, str::FromStr};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    account::{AccountId, AccountNumber},
    error::ErrorCategory,
    guard::{self, GuardError},
    transaction::TransactionKind,
};

/// Largest number of decimal places an amount may carry.
pub const AMOUNT_SCALE: u32 = 2;

/// How a caller names an account: REST callers use internal ids, queue
/// payloads use account numbers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountRef {
    Id(AccountId),
    Number(AccountNumber),
}

impl fmt::Display for AccountRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccountRef::Id(id) => write!(f, "id {id}"),
            AccountRef::Number(number) => write!(f, "number {number}"),
        }
    }
}

/// Transaction request as received, before any checks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRequest {
    pub origin: AccountRef,
    pub destination: Option<AccountRef>,
    pub kind: TransactionKind,
    pub amount: Decimal,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SingleLegCommand {
    pub account: AccountRef,
    pub amount: Decimal,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferCommand {
    pub origin: AccountRef,
    pub destination: AccountRef,
    pub amount: Decimal,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionCommand {
    Deposit(SingleLegCommand),
    Withdrawal(SingleLegCommand),
    Transfer(TransferCommand),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AccountCommandError {
    #[error("Unrecognized transaction type `{0}`")]
    InvalidType(String),
    #[error("Destination account is required for {kind:?}")]
    MissingDestination { kind: TransactionKind },
    #[error("Destination account is not accepted for {kind:?}")]
    UnexpectedDestination { kind: TransactionKind },
    #[error("Amount {amount} has more than 2 decimal places")]
    AmountPrecision { amount: Decimal },
    #[error("Description has {len} characters, at most {max} are allowed")]
    DescriptionTooLong { len: usize, max: usize },
    #[error(transparent)]
    Guard(#[from] GuardError),
}

impl AccountCommandError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            AccountCommandError::Guard(err) => err.category(),
            _ => ErrorCategory::ValidationFailure,
        }
    }
}

impl FromStr for TransactionKind {
    type Err = AccountCommandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "DEPOSITO" | "DEPOSIT" => Ok(TransactionKind::Deposit),
            "RETIRO" | "WITHDRAWAL" => Ok(TransactionKind::Withdrawal),
            "TRANSFERENCIA" | "TRANSFER" => Ok(TransactionKind::Transfer),
            _ => Err(AccountCommandError::InvalidType(s.to_owned())),
        }
    }
}

impl TransactionCommand {
    pub fn parse_command(
        request: TransactionRequest,
        description_max_len: usize,
    ) -> Result<Self, AccountCommandError> {
        let TransactionRequest {
            origin,
            destination,
            kind,
            amount,
            description,
        } = request;
        Self::check_amount(amount)?;
        Self::check_description(description.as_deref(), description_max_len)?;

        match (kind, destination) {
            (TransactionKind::Deposit, None) => Ok(Self::Deposit(SingleLegCommand {
                account: origin,
                amount,
                description,
            })),
            (TransactionKind::Withdrawal, None) => Ok(Self::Withdrawal(SingleLegCommand {
                account: origin,
                amount,
                description,
            })),
            (TransactionKind::Transfer, Some(destination)) => Ok(Self::Transfer(TransferCommand {
                origin,
                destination,
                amount,
                description,
            })),
            (TransactionKind::Transfer, None) => {
                Err(AccountCommandError::MissingDestination { kind })
            }
            (TransactionKind::Deposit | TransactionKind::Withdrawal, Some(_)) => {
                Err(AccountCommandError::UnexpectedDestination { kind })
            }
        }
    }

    pub fn check_amount(amount: Decimal) -> Result<(), AccountCommandError> {
        guard::require_positive_amount(amount)?;
        if amount.normalize().scale() > AMOUNT_SCALE {
            return Err(AccountCommandError::AmountPrecision { amount });
        }
        Ok(())
    }

    pub fn check_description(
        description: Option<&str>,
        max: usize,
    ) -> Result<(), AccountCommandError> {
        match description.map(|d| d.chars().count()) {
            Some(len) if len > max => Err(AccountCommandError::DescriptionTooLong { len, max }),
            _ => Ok(()),
        }
    }

    pub fn kind(&self) -> TransactionKind {
        match self {
            TransactionCommand::Deposit(_) => TransactionKind::Deposit,
            TransactionCommand::Withdrawal(_) => TransactionKind::Withdrawal,
            TransactionCommand::Transfer(_) => TransactionKind::Transfer,
        }
    }

    pub fn amount(&self) -> Decimal {
        match self {
            TransactionCommand::Deposit(cmd) | TransactionCommand::Withdrawal(cmd) => cmd.amount,
            TransactionCommand::Transfer(cmd) => cmd.amount,
        }
    }
}
