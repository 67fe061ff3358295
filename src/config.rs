//! Configuration management for TallyChain

use crate::blockchain::ReplayOptions;
use crate::error::ChainError;
use crate::transaction::{Amount, Transaction};
use serde::Deserialize;
use std::fs;
use std::path::Path;

pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub ledger: LedgerConfig,
    #[serde(default)]
    pub genesis: GenesisConfig,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct LedgerConfig {
    /// Entries taken from the console before a block is sealed.
    #[serde(default = "default_transactions_per_block")]
    pub transactions_per_block: usize,
    #[serde(default)]
    pub allow_non_genesis_start: bool,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            transactions_per_block: default_transactions_per_block(),
            allow_non_genesis_start: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct GenesisConfig {
    #[serde(default = "default_genesis_account")]
    pub account: String,
    #[serde(default = "default_genesis_amount")]
    pub amount: Amount,
}

impl Default for GenesisConfig {
    fn default() -> Self {
        Self {
            account: default_genesis_account(),
            amount: default_genesis_amount(),
        }
    }
}

fn default_db_path() -> String {
    "./data/tallychain.db".to_string()
}

fn default_transactions_per_block() -> usize {
    3
}

fn default_genesis_account() -> String {
    "Venti".to_string()
}

fn default_genesis_amount() -> Amount {
    1_000_000_000_000_000
}

impl Config {
    pub fn replay_options(&self) -> ReplayOptions {
        ReplayOptions {
            allow_non_genesis_start: self.ledger.allow_non_genesis_start,
        }
    }

    /// The transaction recorded in a fresh chain's genesis block.
    pub fn genesis_transaction(&self) -> Transaction {
        Transaction::genesis(&self.genesis.account, self.genesis.amount)
    }

    pub fn validate(&self) -> Result<(), ChainError> {
        if self.database.path.is_empty() {
            return Err(ChainError::ConfigError(
                "database.path must be set in config.toml".to_string(),
            ));
        }

        if self.ledger.transactions_per_block == 0 {
            return Err(ChainError::ConfigError(
                "ledger.transactions_per_block must be at least 1".to_string(),
            ));
        }

        if self.genesis.account.is_empty() {
            return Err(ChainError::ConfigError(
                "genesis.account must be set in config.toml".to_string(),
            ));
        }

        if self.genesis.amount <= 0 {
            return Err(ChainError::ConfigError(format!(
                "genesis.amount must be positive, got {}",
                self.genesis.amount
            )));
        }

        Ok(())
    }
}

/// Reads `./config.toml`, falling back to defaults when it is absent.
pub fn load_config() -> Result<Config, ChainError> {
    load_config_from(DEFAULT_CONFIG_PATH)
}

pub fn load_config_from(path: impl AsRef<Path>) -> Result<Config, ChainError> {
    let path = path.as_ref();
    let config = if path.exists() {
        let config_str = fs::read_to_string(path)?;
        parse_config(&config_str)?
    } else {
        Config::default()
    };

    config.validate()?;
    Ok(config)
}

pub fn parse_config(config_str: &str) -> Result<Config, ChainError> {
    if config_str.trim().is_empty() {
        return Ok(Config::default());
    }
    Ok(toml::from_str(config_str)?)
}
