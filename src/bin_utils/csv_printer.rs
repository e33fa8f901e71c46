use std::io::Write;

use anyhow::Context;
use csv::Writer;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::account::{AccountNumber, AccountStatus, ClientAccount};

#[derive(Debug, Serialize)]
struct BalanceRow<'a> {
    number: &'a AccountNumber,
    client: &'a str,
    available: Decimal,
    ledger: Decimal,
    status: AccountStatus,
}

/// Writes `number,client,available,ledger,status` for every account.
pub fn print_accounts<'a, W>(
    output: &mut W,
    accounts: impl IntoIterator<Item = &'a ClientAccount>,
) -> anyhow::Result<()>
where
    W: Write,
{
    let mut writer = Writer::from_writer(output);
    for acc in accounts {
        writer
            .serialize(BalanceRow {
                number: &acc.number,
                client: &acc.client_id,
                available: acc.available(),
                ledger: acc.ledger(),
                status: acc.status,
            })
            .with_context(|| format!("Failed to write account {} to CSV", acc.number))?;
    }
    writer.flush().context("Failed to flush CSV writer")
}
