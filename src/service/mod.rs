//! Account, definition and history operations that do not move money.

pub mod client_accounts;
pub mod definitions;
pub mod history;
