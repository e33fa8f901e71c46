//! Bootstraps the ledger from CSV files so the binary and the integration
//! tests drive the same code.

use std::{
    io::{Read, Write},
    sync::Arc,
};

use anyhow::{Context, Result};
use chrono::Utc;
use thiserror::Error;

use crate::{
    account::{AccountId, AccountNumber, AccountStatus, ClientAccount},
    command::{AccountRef, TransactionRequest},
    config::LedgerConfig,
    definition::DefinitionId,
    error::ErrorCategory,
    processor::{
        TransactionProcessError, TransactionProcessor, disbursement::DisbursementRequest,
        ledger_processor::LedgerProcessor,
    },
    store::{LedgerStore, in_memory_store::InMemoryLedgerStore},
    transaction::TransactionKind,
};
use csv_parser::{AccountRow, CsvParser, RequestRow};
use csv_printer::print_accounts;
pub mod csv_parser;
pub mod csv_printer;

/// Request type that pays out a loan through the disbursement flow.
pub const DISBURSEMENT_TYPE: &str = "DESEMBOLSO";

/// Imported accounts carry no definition.
const IMPORTED_DEFINITION: DefinitionId = 0;

#[derive(Debug, Error)]
pub enum RowError {
    #[error("Malformed row: {0}")]
    Malformed(#[from] csv::Error),
    #[error("Disbursement needs an origination account in `destination`")]
    MissingOrigination,
    #[error(transparent)]
    Rejected(#[from] TransactionProcessError),
}

impl RowError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            RowError::Malformed(_) | RowError::MissingOrigination => {
                ErrorCategory::ValidationFailure
            }
            RowError::Rejected(err) => err.category(),
        }
    }
}

pub struct Service<'w, A, R, W: 'w> {
    pub accounts: A,
    pub requests: R,
    pub output: &'w mut W,
    pub config: LedgerConfig,
    pub error_printer: Box<dyn FnMut(u64, RowError)>,
}

impl<'w, A, R, W> Service<'w, A, R, W>
where
    A: Read,
    R: Read,
    W: Write + 'w,
{
    pub fn run(mut self) -> Result<()> {
        let store = Arc::new(InMemoryLedgerStore::new());
        seed_accounts(store.as_ref(), self.accounts)?;

        let processor = LedgerProcessor::new(store.clone(), self.config);
        for (line, row) in CsvParser::<_, RequestRow>::new(self.requests) {
            let result = row
                .map_err(RowError::from)
                .and_then(|row| apply_request(&processor, row));
            if let Err(err) = result {
                (self.error_printer)(line, err);
            }
        }

        print_accounts(self.output, &store.all_accounts()?)
    }
}

fn seed_accounts<S, A>(store: &S, source: A) -> Result<()>
where
    S: LedgerStore + ?Sized,
    A: Read,
{
    for (line, row) in CsvParser::<_, AccountRow>::new(source) {
        let row = row.with_context(|| format!("Invalid account at line {line}"))?;
        if row.balance.is_sign_negative() && !row.balance.is_zero() {
            anyhow::bail!(
                "Invalid account at line {line}: balance {} is negative",
                row.balance
            );
        }
        let mut account =
            ClientAccount::open(IMPORTED_DEFINITION, row.client, row.number, Utc::now())
                .with_opening_balance(row.balance);
        if !row.active {
            account.status = AccountStatus::Inactive;
        }
        store
            .insert_account(account)
            .with_context(|| format!("Failed to import account at line {line}"))?;
    }
    Ok(())
}

fn apply_request<S>(processor: &LedgerProcessor<S>, row: RequestRow) -> Result<(), RowError>
where
    S: LedgerStore + ?Sized,
{
    if row.kind.trim().eq_ignore_ascii_case(DISBURSEMENT_TYPE) {
        let origination = row.destination.ok_or(RowError::MissingOrigination)?;
        let request = DisbursementRequest {
            client_account_id: resolve(processor, row.origin)?,
            origination_account_id: resolve(processor, origination)?,
            amount: row.amount,
            description: row.description,
        };
        processor.disburse(&request)?;
        return Ok(());
    }

    let kind = row
        .kind
        .parse::<TransactionKind>()
        .map_err(TransactionProcessError::from)?;
    processor.process_transaction(TransactionRequest {
        origin: AccountRef::Number(row.origin),
        destination: row.destination.map(AccountRef::Number),
        kind,
        amount: row.amount,
        description: row.description,
    })?;
    Ok(())
}

fn resolve<S>(
    processor: &LedgerProcessor<S>,
    number: AccountNumber,
) -> Result<AccountId, TransactionProcessError>
where
    S: LedgerStore + ?Sized,
{
    match processor.store().account_by_number(&number)? {
        Some(account) => Ok(account.id),
        None => Err(TransactionProcessError::AccountNotFound(AccountRef::Number(number))),
    }
}

