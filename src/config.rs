use std::{fs, path::Path};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::account::AccountId;

pub const CONFIG_ENV_VAR: &str = "LEDGER_CONFIG";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Account every loan disbursement is funded from.
    pub pool_account_id: AccountId,
    pub account_number_length: usize,
    /// Attempts at drawing an unused account number before giving up.
    pub max_number_attempts: u32,
    /// Extra attempts after an optimistic version conflict.
    pub max_version_retries: u32,
    pub description_max_len: usize,
    pub queues: QueueConfig,
    pub log_level: String,
    pub log_json: bool,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            pool_account_id: 1,
            account_number_length: 10,
            max_number_attempts: 32,
            max_version_retries: 3,
            description_max_len: 150,
            queues: QueueConfig::default(),
            log_level: "info".to_string(),
            log_json: false,
        }
    }
}

/// Channel names for queued transactions, one per transaction type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    pub deposit: String,
    pub withdrawal: String,
    pub transfer: String,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            deposit: "transactions.deposit".to_string(),
            withdrawal: "transactions.withdrawal".to_string(),
            transfer: "transactions.transfer".to_string(),
        }
    }
}

impl LedgerConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file `{}`", path.display()))?;
        Self::from_yaml(&content)
            .with_context(|| format!("Failed to parse config file `{}`", path.display()))
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads the file named by `LEDGER_CONFIG`, or defaults when it is unset.
    pub fn from_env() -> Result<Self> {
        match std::env::var(CONFIG_ENV_VAR) {
            Ok(path) => Self::load(path),
            Err(_) => Ok(Self::default()),
        }
    }

    fn validate(&self) -> Result<()> {
        if !(1..=18).contains(&self.account_number_length) {
            anyhow::bail!(
                "account_number_length must be between 1 and 18, got {}",
                self.account_number_length
            );
        }
        if self.max_number_attempts == 0 {
            anyhow::bail!("max_number_attempts must be at least 1");
        }
        Ok(())
    }
}
