//! Queue-producing entry point. Requests are checked against current account
//! state, then handed to an external transport that settles them later.

use std::sync::Arc;

use parking_lot::Mutex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    account::{self, AccountNumber},
    command::{AccountRef, TransactionCommand, TransactionRequest},
    config::{LedgerConfig, QueueConfig},
    error::ErrorCategory,
    processor::{TransactionProcessError, unit_of_work::UnitOfWork},
    store::LedgerStore,
    transaction::TransactionKind,
};

/// Body of a queued request, addressed by account numbers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueuePayload {
    pub origin_account_number: AccountNumber,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination_account_number: Option<AccountNumber>,
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    pub amount: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl QueuePayload {
    pub fn into_request(self) -> TransactionRequest {
        TransactionRequest {
            origin: AccountRef::Number(self.origin_account_number),
            destination: self.destination_account_number.map(AccountRef::Number),
            kind: self.kind,
            amount: self.amount,
            description: self.description,
        }
    }
}

/// What actually travels on the channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueMessage {
    pub tracking_id: Uuid,
    #[serde(flatten)]
    pub payload: QueuePayload,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum QueueStatus {
    Queued,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueuedReceipt {
    pub tracking_id: Uuid,
    pub status: QueueStatus,
    pub kind: TransactionKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct TransportError(pub String);

/// Fire-and-forget transport with one addressable channel per transaction kind.
pub trait TransactionPublisher: Send + Sync {
    fn publish(&self, channel: &str, body: &str) -> Result<(), TransportError>;
}

#[derive(Debug, Error)]
pub enum IntakeError {
    #[error(transparent)]
    Rejected(#[from] TransactionProcessError),
    #[error("Failed to encode queue message")]
    Encode(#[from] serde_json::Error),
    #[error("Publishing to `{channel}` failed")]
    Transport {
        channel: String,
        #[source]
        source: TransportError,
    },
}

impl IntakeError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            IntakeError::Rejected(err) => err.category(),
            IntakeError::Encode(_) | IntakeError::Transport { .. } => {
                ErrorCategory::DependencyFailure
            }
        }
    }
}

/// Runs the same guard checks the processor runs, against current account
/// state, without writing anything.
pub struct IntakeValidator<S: ?Sized> {
    store: Arc<S>,
    description_max_len: usize,
}

impl<S> IntakeValidator<S>
where
    S: LedgerStore + ?Sized,
{
    pub fn new(store: Arc<S>, description_max_len: usize) -> Self {
        Self {
            store,
            description_max_len,
        }
    }

    pub fn validate(
        &self,
        request: TransactionRequest,
    ) -> Result<TransactionCommand, TransactionProcessError> {
        let command = TransactionCommand::parse_command(request, self.description_max_len)?;

        // never committed, dropped at the end of the call
        let mut uow = UnitOfWork::begin(self.store.as_ref());
        match &command {
            TransactionCommand::Deposit(cmd) => {
                uow.account(&cmd.account)?.handle_credit(cmd.amount)?;
            }
            TransactionCommand::Withdrawal(cmd) => {
                uow.account(&cmd.account)?.handle_debit(cmd.amount)?;
            }
            TransactionCommand::Transfer(cmd) => {
                let origin = uow.account(&cmd.origin)?;
                let destination = uow.account(&cmd.destination)?;
                account::handle_transfer(&origin, &destination, cmd.amount)?;
            }
        }
        Ok(command)
    }
}

pub struct TransactionIntake<S: ?Sized, P> {
    validator: IntakeValidator<S>,
    publisher: P,
    queues: QueueConfig,
}

impl<S, P> TransactionIntake<S, P>
where
    S: LedgerStore + ?Sized,
    P: TransactionPublisher,
{
    pub fn new(store: Arc<S>, publisher: P, config: &LedgerConfig) -> Self {
        Self {
            validator: IntakeValidator::new(store, config.description_max_len),
            publisher,
            queues: config.queues.clone(),
        }
    }

    pub fn publisher(&self) -> &P {
        &self.publisher
    }

    /// Validates and enqueues a request. The receipt only means the message
    /// was accepted by the transport; settlement happens elsewhere.
    pub fn submit(&self, payload: QueuePayload) -> Result<QueuedReceipt, IntakeError> {
        let command = match self.validator.validate(payload.clone().into_request()) {
            Ok(command) => command,
            Err(err) => {
                warn!(
                    kind = payload.kind.wire_name(),
                    origin = %payload.origin_account_number,
                    category = %err.category(),
                    error = %err,
                    "queued request rejected"
                );
                return Err(err.into());
            }
        };
        let kind = command.kind();

        let message = QueueMessage {
            tracking_id: Uuid::new_v4(),
            payload,
        };
        let body = serde_json::to_string(&message)?;
        let channel = self.channel(kind);
        self.publisher
            .publish(channel, &body)
            .map_err(|source| IntakeError::Transport {
                channel: channel.to_owned(),
                source,
            })?;

        info!(
            tracking_id = %message.tracking_id,
            channel,
            kind = kind.wire_name(),
            amount = %command.amount(),
            "transaction queued"
        );
        Ok(QueuedReceipt {
            tracking_id: message.tracking_id,
            status: QueueStatus::Queued,
            kind,
        })
    }

    fn channel(&self, kind: TransactionKind) -> &str {
        match kind {
            TransactionKind::Deposit => &self.queues.deposit,
            TransactionKind::Withdrawal => &self.queues.withdrawal,
            TransactionKind::Transfer => &self.queues.transfer,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedMessage {
    pub channel: String,
    pub body: String,
}

/// Publisher that keeps messages in memory until drained.
#[derive(Default)]
pub struct InMemoryPublisher {
    messages: Mutex<Vec<PublishedMessage>>,
}

impl InMemoryPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn drain(&self) -> Vec<PublishedMessage> {
        std::mem::take(&mut *self.messages.lock())
    }
}

impl TransactionPublisher for InMemoryPublisher {
    fn publish(&self, channel: &str, body: &str) -> Result<(), TransportError> {
        self.messages.lock().push(PublishedMessage {
            channel: channel.to_owned(),
            body: body.to_owned(),
        });
        Ok(())
    }
}
