use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    definition::DefinitionId,
    guard::{self, GuardError},
};

pub type AccountId = u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AccountStatus {
    #[serde(alias = "ACTIVO")]
    Active,
    #[serde(alias = "INACTIVO")]
    Inactive,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Account number `{0}` must be a non-empty string of digits")]
pub struct InvalidAccountNumber(pub String);

/// Fixed-length numeric identifier handed out to clients. Immutable once
/// assigned to an account.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AccountNumber(String);

impl AccountNumber {
    pub fn parse(value: &str) -> Result<Self, InvalidAccountNumber> {
        if !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit()) {
            Ok(Self(value.to_owned()))
        } else {
            Err(InvalidAccountNumber(value.to_owned()))
        }
    }

    /// Caller guarantees `digits` is non-empty and numeric.
    pub(crate) fn from_digits(digits: String) -> Self {
        debug_assert!(!digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()));
        Self(digits)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for AccountNumber {
    type Error = InvalidAccountNumber;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<AccountNumber> for String {
    fn from(value: AccountNumber) -> Self {
        value.0
    }
}

impl fmt::Display for AccountNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BalanceEventKind {
    Credited,
    Debited,
}

/// Balance change already approved by the guard. Applying it performs no
/// further validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BalanceEvent {
    pub account_id: AccountId,
    pub amount: Decimal,
    pub kind: BalanceEventKind,
}

/// Client-owned account holding the available and ledger balances.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClientAccount {
    /// Assigned by the store on insert.
    pub id: AccountId,
    pub definition_id: DefinitionId,
    pub client_id: String,
    pub number: AccountNumber,
    available: Decimal,
    ledger: Decimal,
    pub opened_at: DateTime<Utc>,
    pub status: AccountStatus,
    /// Version as last read from the store.
    pub version: u64,
}

impl ClientAccount {
    pub fn open(
        definition_id: DefinitionId,
        client_id: impl Into<String>,
        number: AccountNumber,
        opened_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: 0,
            definition_id,
            client_id: client_id.into(),
            number,
            available: Decimal::ZERO,
            ledger: Decimal::ZERO,
            opened_at,
            status: AccountStatus::Active,
            version: 0,
        }
    }

    /// Sets both balances, used when importing accounts that already carry funds.
    pub fn with_opening_balance(mut self, balance: Decimal) -> Self {
        self.available = balance;
        self.ledger = balance;
        self
    }

    pub fn available(&self) -> Decimal {
        self.available
    }

    pub fn ledger(&self) -> Decimal {
        self.ledger
    }

    pub fn is_active(&self) -> bool {
        self.status == AccountStatus::Active
    }

    pub fn apply(&mut self, event: &BalanceEvent) {
        match event.kind {
            BalanceEventKind::Credited => {
                self.available += event.amount;
                self.ledger += event.amount;
            }
            BalanceEventKind::Debited => {
                self.available -= event.amount;
                self.ledger -= event.amount;
            }
        }
    }

    pub fn handle_credit(&self, amount: Decimal) -> Result<BalanceEvent, GuardError> {
        guard::require_active(self)?;
        guard::require_credit_fits(self, amount)?;
        Ok(BalanceEvent {
            account_id: self.id,
            amount,
            kind: BalanceEventKind::Credited,
        })
    }

    pub fn handle_debit(&self, amount: Decimal) -> Result<BalanceEvent, GuardError> {
        guard::require_active(self)?;
        guard::require_sufficient_funds(self, amount)?;
        Ok(BalanceEvent {
            account_id: self.id,
            amount,
            kind: BalanceEventKind::Debited,
        })
    }
}

/// Approves a transfer between two accounts, returning the debit and credit
/// events in that order.
pub fn handle_transfer(
    origin: &ClientAccount,
    destination: &ClientAccount,
    amount: Decimal,
) -> Result<(BalanceEvent, BalanceEvent), GuardError> {
    guard::require_distinct_endpoints(origin.id, destination.id)?;
    guard::require_active(origin)?;
    guard::require_active(destination)?;
    let debit = origin.handle_debit(amount)?;
    let credit = destination.handle_credit(amount)?;
    Ok((debit, credit))
}
