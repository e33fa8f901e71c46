use std::fs::File;

use account_ledger::{bin_utils::Service, config::LedgerConfig, logging::init_logging};
use anyhow::{Context, Result};

fn main() -> Result<()> {
    let mut args = std::env::args().skip(1);
    let accounts_file = args
        .next()
        .context("Expected the accounts file as the first argument")?;
    let requests_file = args
        .next()
        .context("Expected the requests file as the second argument")?;

    let config = LedgerConfig::from_env()?;
    init_logging(&config);

    let accounts = File::open(&accounts_file)
        .with_context(|| format!("Failed to open `{accounts_file}`"))?;
    let requests = File::open(&requests_file)
        .with_context(|| format!("Failed to open `{requests_file}`"))?;

    let service = Service {
        accounts,
        requests,
        output: &mut std::io::stdout(),
        config,
        error_printer: Box::new(|line, err| {
            eprintln!("Error at line {line} [{}]: {err}", err.category())
        }),
    };
    service.run()
}
