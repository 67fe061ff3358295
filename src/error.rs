//! Error types for TallyChain

use crate::transaction::{Transaction, TransactionRejection};
use thiserror::Error;

/// Which half of a block's parent linkage failed to line up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SequenceBreakKind {
    /// `index != parent.index + 1`
    IndexMismatch { expected: u64, found: u64 },
    /// `previous_hash != parent.hash`
    ParentHashMismatch { expected: String, found: String },
    /// The parent already holds the largest representable index.
    IndexExhausted { parent: u64 },
}

impl std::fmt::Display for SequenceBreakKind {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            SequenceBreakKind::IndexMismatch { expected, found } => {
                write!(f, "index does not match parent (expected {}, found {})", expected, found)
            }
            SequenceBreakKind::ParentHashMismatch { expected, found } => {
                write!(f, "parent hash not accurate (expected {}, found {})", expected, found)
            }
            SequenceBreakKind::IndexExhausted { parent } => {
                write!(f, "parent index {} has no successor", parent)
            }
        }
    }
}

#[derive(Error, Debug, Clone)]
pub enum ChainError {
    #[error("Invalid transaction{}: {transaction} ({reason})", in_block(.block_index))]
    InvalidTransaction {
        block_index: Option<u64>,
        transaction: Transaction,
        reason: TransactionRejection,
    },

    #[error("Hash does not match contents of block {index}")]
    HashMismatch { index: u64 },

    #[error("Broken chain sequence at block {index}: {kind}")]
    SequenceBreak { index: u64, kind: SequenceBreakKind },

    #[error("Blockchain doesn't start at genesis block (first block has index {index})")]
    NonGenesisStart { index: u64 },

    #[error("Chain is empty: no genesis block found")]
    EmptyChain,

    #[error("A chain already exists in this store")]
    ChainAlreadyExists,

    #[error("Block {0} already exists")]
    BlockAlreadyExists(u64),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(String),
}

fn in_block(block_index: &Option<u64>) -> String {
    match block_index {
        Some(index) => format!(" in block {}", index),
        None => String::new(),
    }
}

impl ChainError {
    /// Chain-level failures: the stored history itself is inconsistent.
    /// These are never skip-and-continue.
    pub fn is_integrity_failure(&self) -> bool {
        matches!(
            self,
            ChainError::HashMismatch { .. }
                | ChainError::SequenceBreak { .. }
                | ChainError::InvalidTransaction { block_index: Some(_), .. }
        )
    }

    /// `NonGenesisStart` is the only warning-class condition; a host may choose
    /// to downgrade it after explicit operator confirmation.
    pub fn is_warning(&self) -> bool {
        matches!(self, ChainError::NonGenesisStart { .. })
    }
}

impl From<std::io::Error> for ChainError {
    fn from(err: std::io::Error) -> Self {
        ChainError::IoError(err.to_string())
    }
}

impl From<serde_json::Error> for ChainError {
    fn from(err: serde_json::Error) -> Self {
        ChainError::Serialization(err.to_string())
    }
}

impl From<rusqlite::Error> for ChainError {
    fn from(err: rusqlite::Error) -> Self {
        ChainError::DatabaseError(err.to_string())
    }
}

impl From<toml::de::Error> for ChainError {
    fn from(err: toml::de::Error) -> Self {
        ChainError::ConfigError(err.to_string())
    }
}

/// Convenience alias used across the crate
pub type Result<T> = std::result::Result<T, ChainError>;
