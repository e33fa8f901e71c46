/// Client accounts and their balances. Balance changes are approved by
/// handling a credit or debit, which yields an event, and then applied.
pub mod account;

/// Parses raw transaction requests into commands executed by [`processor`].
pub mod command;

/// YAML settings with defaults and an env override for the file path.
pub mod config;

/// Account definition templates.
pub mod definition;

/// Error categories shared by every module.
pub mod error;

/// Checks every balance mutation must pass, used by the processor and the
/// intake validator alike.
pub mod guard;

/// Tracing subscriber setup.
pub mod logging;

/// Transaction log rows.
pub mod transaction;

/// Persistence interfaces, plus "in memory" implementation.
pub mod store;

/// Transaction processor interface and the ledger processor that settles
/// deposits, withdrawals, transfers and loan disbursements atomically.
pub mod processor;

/// Account number generation.
pub mod numbering;

/// Remote catalog and client directory interfaces.
pub mod catalog;

/// Asynchronous intake: validate now, publish for later settlement.
pub mod intake;

/// Account, definition and history services over the store.
pub mod service;

/// CSV bootstrap used by the binary and the integration tests.
pub mod bin_utils;
