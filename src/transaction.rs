use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::account::AccountId;

pub type TransactionId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionKind {
    #[serde(rename = "DEPOSITO")]
    Deposit,
    #[serde(rename = "RETIRO")]
    Withdrawal,
    #[serde(rename = "TRANSFERENCIA")]
    Transfer,
}

impl TransactionKind {
    pub fn wire_name(self) -> &'static str {
        match self {
            TransactionKind::Deposit => "DEPOSITO",
            TransactionKind::Withdrawal => "RETIRO",
            TransactionKind::Transfer => "TRANSFERENCIA",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionStatus {
    #[serde(rename = "PENDIENTE")]
    Pending,
    #[serde(rename = "PROCESADO")]
    Processed,
}

/// Which side of a transfer a ledger row records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransferLeg {
    Outbound,
    Inbound,
}

/// Ledger row staged in a unit of work, not yet holding a store id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTransaction {
    pub account_id: AccountId,
    pub destination_account_id: Option<AccountId>,
    pub kind: TransactionKind,
    pub transfer_leg: Option<TransferLeg>,
    pub amount: Decimal,
    pub description: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub status: TransactionStatus,
}

impl NewTransaction {
    pub fn new(
        account_id: AccountId,
        kind: TransactionKind,
        amount: Decimal,
        description: Option<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            account_id,
            destination_account_id: None,
            kind,
            transfer_leg: None,
            amount,
            description,
            timestamp,
            status: TransactionStatus::Pending,
        }
    }

    pub fn transfer_leg(mut self, leg: TransferLeg, counter_account: AccountId) -> Self {
        self.transfer_leg = Some(leg);
        self.destination_account_id = Some(counter_account);
        self
    }

    pub fn processed(mut self) -> Self {
        self.status = TransactionStatus::Processed;
        self
    }

    pub fn into_persisted(self, id: TransactionId) -> Transaction {
        Transaction {
            id,
            account_id: self.account_id,
            destination_account_id: self.destination_account_id,
            kind: self.kind,
            transfer_leg: self.transfer_leg,
            amount: self.amount,
            description: self.description,
            timestamp: self.timestamp,
            status: self.status,
            version: 0,
        }
    }
}

/// Immutable ledger row as stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub account_id: AccountId,
    /// Counter-account of a transfer leg.
    pub destination_account_id: Option<AccountId>,
    pub kind: TransactionKind,
    pub transfer_leg: Option<TransferLeg>,
    pub amount: Decimal,
    pub description: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub status: TransactionStatus,
    pub version: u64,
}
