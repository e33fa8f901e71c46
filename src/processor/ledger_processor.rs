use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{info, warn};

use crate::{
    account::{self, AccountId},
    command::{AccountRef, SingleLegCommand, TransactionCommand, TransactionRequest, TransferCommand},
    config::LedgerConfig,
    store::{CommitReceipt, LedgerStore, StoreError},
    transaction::{NewTransaction, Transaction, TransactionKind, TransferLeg},
};

use super::{TransactionProcessError, TransactionProcessor, unit_of_work::UnitOfWork};

/// Both ledger rows written for one transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransferLegs {
    pub outbound: Transaction,
    pub inbound: Transaction,
}

/// Descriptions written on the two rows of a transfer.
#[derive(Debug, Clone)]
pub(crate) struct LegDescriptions {
    outbound: String,
    inbound: String,
}

impl LegDescriptions {
    fn for_transfer(note: Option<&str>) -> Self {
        let with_note = |prefix: &str| match note {
            Some(note) if !note.is_empty() => format!("{prefix}: {note}"),
            _ => prefix.to_string(),
        };
        Self {
            outbound: with_note("Outbound transfer"),
            inbound: with_note("Inbound transfer"),
        }
    }

    pub(crate) fn for_loan_origination(client: AccountId, origination: AccountId) -> Self {
        Self {
            outbound: format!("Loan origination payment to account {origination}"),
            inbound: format!("Loan origination payment from client account {client}"),
        }
    }
}

/// Balance-mutation engine. Holds no account state between calls; every
/// operation reads fresh rows inside its own [`UnitOfWork`].
pub struct LedgerProcessor<S: ?Sized> {
    store: Arc<S>,
    config: LedgerConfig,
}

impl<S> LedgerProcessor<S>
where
    S: LedgerStore + ?Sized,
{
    pub fn new(store: Arc<S>, config: LedgerConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// Settles a parsed command; transfers return their outbound leg.
    pub fn process(
        &self,
        command: &TransactionCommand,
    ) -> Result<Transaction, TransactionProcessError> {
        let operation = command.kind().wire_name();
        match command {
            TransactionCommand::Deposit(cmd) => {
                let (leg, receipt) =
                    self.run_atomic(operation, |uow, now| self.stage_deposit(uow, cmd, now))?;
                receipt_leg(&receipt, leg)
            }
            TransactionCommand::Withdrawal(cmd) => {
                let (leg, receipt) =
                    self.run_atomic(operation, |uow, now| self.stage_withdrawal(uow, cmd, now))?;
                receipt_leg(&receipt, leg)
            }
            TransactionCommand::Transfer(cmd) => self.transfer(cmd).map(|legs| legs.outbound),
        }
    }

    /// Moves funds between two accounts, writing an outbound row against
    /// the origin and an inbound row against the destination.
    pub fn transfer(&self, command: &TransferCommand) -> Result<TransferLegs, TransactionProcessError> {
        let ((outbound, inbound), receipt) =
            self.run_atomic(TransactionKind::Transfer.wire_name(), |uow, now| {
                let origin = uow.account(&command.origin)?;
                let destination = uow.account(&command.destination)?;
                let descriptions = LegDescriptions::for_transfer(command.description.as_deref());
                self.stage_transfer(uow, origin.id, destination.id, command.amount, &descriptions, now)
            })?;
        Ok(TransferLegs {
            outbound: receipt_leg(&receipt, outbound)?,
            inbound: receipt_leg(&receipt, inbound)?,
        })
    }

    /// Runs `stage` in a fresh unit of work and commits it. A version
    /// conflict re-runs the whole operation against fresh state, at most
    /// `max_version_retries` times.
    pub(crate) fn run_atomic<T>(
        &self,
        operation: &'static str,
        mut stage: impl FnMut(&mut UnitOfWork<'_, S>, DateTime<Utc>) -> Result<T, TransactionProcessError>,
    ) -> Result<(T, CommitReceipt), TransactionProcessError> {
        let mut attempt = 0;
        loop {
            let mut uow = UnitOfWork::begin(self.store.as_ref());
            let staged = match stage(&mut uow, Utc::now()) {
                Ok(staged) => staged,
                Err(err) => {
                    warn!(operation, category = %err.category(), error = %err, "operation rejected");
                    return Err(err);
                }
            };
            match uow.commit() {
                Ok(receipt) => {
                    info!(
                        operation,
                        accounts = receipt.accounts.len(),
                        transactions = receipt.transactions.len(),
                        "operation committed"
                    );
                    return Ok((staged, receipt));
                }
                Err(err @ StoreError::VersionConflict { .. })
                    if attempt < self.config.max_version_retries =>
                {
                    attempt += 1;
                    warn!(operation, attempt, error = %err, "retrying with fresh state");
                }
                Err(err) => {
                    warn!(operation, error = %err, "commit failed");
                    return Err(err.into());
                }
            }
        }
    }

    pub(crate) fn stage_deposit(
        &self,
        uow: &mut UnitOfWork<'_, S>,
        command: &SingleLegCommand,
        now: DateTime<Utc>,
    ) -> Result<usize, TransactionProcessError> {
        let account = uow.account(&command.account)?;
        let event = account.handle_credit(command.amount)?;
        uow.apply(&event)?;
        Ok(uow.save_transaction(
            NewTransaction::new(
                account.id,
                TransactionKind::Deposit,
                command.amount,
                command.description.clone(),
                now,
            )
            .processed(),
        ))
    }

    pub(crate) fn stage_withdrawal(
        &self,
        uow: &mut UnitOfWork<'_, S>,
        command: &SingleLegCommand,
        now: DateTime<Utc>,
    ) -> Result<usize, TransactionProcessError> {
        let account = uow.account(&command.account)?;
        let event = account.handle_debit(command.amount)?;
        uow.apply(&event)?;
        Ok(uow.save_transaction(
            NewTransaction::new(
                account.id,
                TransactionKind::Withdrawal,
                command.amount,
                command.description.clone(),
                now,
            )
            .processed(),
        ))
    }

    pub(crate) fn stage_transfer(
        &self,
        uow: &mut UnitOfWork<'_, S>,
        origin: AccountId,
        destination: AccountId,
        amount: Decimal,
        descriptions: &LegDescriptions,
        now: DateTime<Utc>,
    ) -> Result<(usize, usize), TransactionProcessError> {
        let origin = uow.account(&AccountRef::Id(origin))?;
        let destination = uow.account(&AccountRef::Id(destination))?;
        let (debit, credit) = account::handle_transfer(&origin, &destination, amount)?;
        uow.apply(&debit)?;
        uow.apply(&credit)?;

        let max = self.config.description_max_len;
        let outbound = uow.save_transaction(
            NewTransaction::new(
                origin.id,
                TransactionKind::Transfer,
                amount,
                Some(truncate(&descriptions.outbound, max)),
                now,
            )
            .transfer_leg(TransferLeg::Outbound, destination.id)
            .processed(),
        );
        let inbound = uow.save_transaction(
            NewTransaction::new(
                destination.id,
                TransactionKind::Transfer,
                amount,
                Some(truncate(&descriptions.inbound, max)),
                now,
            )
            .transfer_leg(TransferLeg::Inbound, origin.id)
            .processed(),
        );
        Ok((outbound, inbound))
    }
}

impl<S> TransactionProcessor for LedgerProcessor<S>
where
    S: LedgerStore + ?Sized,
{
    fn process_transaction(
        &self,
        request: TransactionRequest,
    ) -> Result<Transaction, TransactionProcessError> {
        let command = TransactionCommand::parse_command(request, self.config.description_max_len)?;
        self.process(&command)
    }
}

pub(crate) fn receipt_leg(
    receipt: &CommitReceipt,
    index: usize,
) -> Result<Transaction, TransactionProcessError> {
    receipt.transactions.get(index).cloned().ok_or_else(|| {
        StoreError::Unavailable(format!("commit receipt has no transaction at position {index}"))
            .into()
    })
}

fn truncate(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use crate::{
        account::{AccountNumber, AccountStatus, ClientAccount},
        guard::GuardError,
        store::in_memory_store::InMemoryLedgerStore,
        transaction::TransactionStatus,
    };

    use super::*;

    fn processor_with(balances: &[Decimal]) -> LedgerProcessor<InMemoryLedgerStore> {
        let store = InMemoryLedgerStore::new();
        for (i, balance) in balances.iter().enumerate() {
            let number = AccountNumber::parse(&format!("{:010}", i + 1)).unwrap();
            store
                .insert_account(
                    ClientAccount::open(1, format!("client-{i}"), number, Utc::now())
                        .with_opening_balance(*balance),
                )
                .unwrap();
        }
        LedgerProcessor::new(Arc::new(store), LedgerConfig::default())
    }

    fn request(
        kind: TransactionKind,
        origin: AccountId,
        destination: Option<AccountId>,
        amount: Decimal,
    ) -> TransactionRequest {
        TransactionRequest {
            origin: AccountRef::Id(origin),
            destination: destination.map(AccountRef::Id),
            kind,
            amount,
            description: Some("test".to_string()),
        }
    }

    fn balance(processor: &LedgerProcessor<InMemoryLedgerStore>, id: AccountId) -> (Decimal, Decimal) {
        let acc = processor.store().account_by_id(id).unwrap().unwrap();
        (acc.available(), acc.ledger())
    }

    #[test]
    fn deposit_and_withdraw() {
        let processor = processor_with(&[Decimal::ZERO]);

        let tx = processor
            .process_transaction(request(TransactionKind::Deposit, 1, None, Decimal::new(10000, 2)))
            .unwrap();
        assert_eq!(tx.kind, TransactionKind::Deposit);
        assert_eq!(tx.status, TransactionStatus::Processed);
        assert_eq!(tx.description.as_deref(), Some("test"));

        processor
            .process_transaction(request(TransactionKind::Withdrawal, 1, None, Decimal::new(3000, 2)))
            .unwrap();
        assert_eq!(balance(&processor, 1), (Decimal::new(7000, 2), Decimal::new(7000, 2)));
        assert_eq!(processor.store().account_by_id(1).unwrap().unwrap().version, 2);
    }

    #[test]
    fn withdrawal_over_balance_leaves_account_untouched() {
        let processor = processor_with(&[Decimal::new(50, 0)]);
        let err = processor
            .process_transaction(request(TransactionKind::Withdrawal, 1, None, Decimal::new(51, 0)))
            .unwrap_err();
        assert!(matches!(
            err,
            TransactionProcessError::GuardErr(GuardError::InsufficientFunds { account: 1, .. })
        ));
        assert_eq!(balance(&processor, 1), (Decimal::new(50, 0), Decimal::new(50, 0)));
        assert_eq!(processor.store().transaction_count(), 0);
    }

    #[test]
    fn inactive_account_rejects_deposit() {
        let processor = processor_with(&[Decimal::ZERO]);
        let mut acc = processor.store().account_by_id(1).unwrap().unwrap();
        acc.status = AccountStatus::Inactive;
        processor.store().save_account(acc, 0).unwrap();

        let err = processor
            .process_transaction(request(TransactionKind::Deposit, 1, None, Decimal::ONE))
            .unwrap_err();
        assert!(matches!(
            err,
            TransactionProcessError::GuardErr(GuardError::AccountInactive { account: 1 })
        ));
    }

    #[test]
    fn transfer_writes_two_linked_rows() {
        let processor = processor_with(&[Decimal::new(100, 0), Decimal::new(5, 0)]);
        let legs = processor
            .transfer(&TransferCommand {
                origin: AccountRef::Id(1),
                destination: AccountRef::Id(2),
                amount: Decimal::new(40, 0),
                description: Some("rent".to_string()),
            })
            .unwrap();

        assert_eq!(legs.outbound.account_id, 1);
        assert_eq!(legs.outbound.destination_account_id, Some(2));
        assert_eq!(legs.outbound.transfer_leg, Some(TransferLeg::Outbound));
        assert_eq!(legs.outbound.description.as_deref(), Some("Outbound transfer: rent"));
        assert_eq!(legs.inbound.account_id, 2);
        assert_eq!(legs.inbound.destination_account_id, Some(1));
        assert_eq!(legs.inbound.transfer_leg, Some(TransferLeg::Inbound));
        assert_eq!(legs.inbound.description.as_deref(), Some("Inbound transfer: rent"));

        assert_eq!(balance(&processor, 1), (Decimal::new(60, 0), Decimal::new(60, 0)));
        assert_eq!(balance(&processor, 2), (Decimal::new(45, 0), Decimal::new(45, 0)));
    }

    #[test]
    fn process_returns_outbound_leg_for_transfers() {
        let processor = processor_with(&[Decimal::new(10, 0), Decimal::ZERO]);
        let tx = processor
            .process_transaction(request(TransactionKind::Transfer, 1, Some(2), Decimal::ONE))
            .unwrap();
        assert_eq!(tx.account_id, 1);
        assert_eq!(tx.transfer_leg, Some(TransferLeg::Outbound));
        assert_eq!(processor.store().transaction_count(), 2);
    }

    #[test]
    fn transfer_to_same_account_is_rejected() {
        let processor = processor_with(&[Decimal::new(10, 0)]);
        let err = processor
            .process_transaction(request(TransactionKind::Transfer, 1, Some(1), Decimal::ONE))
            .unwrap_err();
        assert!(matches!(
            err,
            TransactionProcessError::GuardErr(GuardError::SameAccount { account: 1 })
        ));
        assert_eq!(balance(&processor, 1), (Decimal::new(10, 0), Decimal::new(10, 0)));
    }

    #[test]
    fn transfer_to_unknown_account_is_not_found() {
        let processor = processor_with(&[Decimal::new(10, 0)]);
        let err = processor
            .process_transaction(request(TransactionKind::Transfer, 1, Some(7), Decimal::ONE))
            .unwrap_err();
        assert!(matches!(
            err,
            TransactionProcessError::AccountNotFound(AccountRef::Id(7))
        ));
        assert_eq!(err.category(), crate::error::ErrorCategory::NotFound);
    }

    #[test]
    fn deposit_onto_max_balance_is_rejected_not_applied() {
        let processor = processor_with(&[Decimal::MAX, Decimal::TEN]);
        let err = processor
            .process_transaction(request(TransactionKind::Deposit, 1, None, Decimal::new(100, 2)))
            .unwrap_err();
        assert!(matches!(
            err,
            TransactionProcessError::GuardErr(GuardError::BalanceOverflow { account: 1, .. })
        ));
        assert_eq!(err.category(), crate::error::ErrorCategory::ValidationFailure);

        let err = processor
            .process_transaction(request(TransactionKind::Transfer, 2, Some(1), Decimal::ONE))
            .unwrap_err();
        assert!(matches!(
            err,
            TransactionProcessError::GuardErr(GuardError::BalanceOverflow { account: 1, .. })
        ));
        assert_eq!(balance(&processor, 1), (Decimal::MAX, Decimal::MAX));
        assert_eq!(balance(&processor, 2), (Decimal::TEN, Decimal::TEN));
        assert_eq!(processor.store().transaction_count(), 0);
    }

    #[test]
    fn long_generated_descriptions_are_truncated() {
        let processor = processor_with(&[Decimal::new(10, 0), Decimal::ZERO]);
        let mut req = request(TransactionKind::Transfer, 1, Some(2), Decimal::ONE);
        req.description = Some("x".repeat(150));
        let tx = processor.process_transaction(req).unwrap();
        let description = tx.description.unwrap();
        assert_eq!(description.chars().count(), 150);
        assert!(description.starts_with("Outbound transfer: x"));
    }
}
