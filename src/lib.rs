//! TallyChain - a hash-linked, append-only ledger of balance transfers
//!
//! # Architecture
//!
//! The crate is organized into logical modules:
//!
//! ## Core Ledger
//! - [`blockchain`] - Blocks, account state, chain validation and replay
//! - [`transaction`] - Transfer deltas and the conservation/overdraft gate
//!
//! ## Storage
//! - [`persistence`] - Block store (SQLite and in-memory)
//!
//! ## Configuration & Utilities
//! - [`config`] - Configuration management
//! - [`error`] - Error types
//! - `cli` - Helpers shared by the binaries (feature `cli`)

#![forbid(unsafe_code)]

// ============================================================================
// Core Ledger
// ============================================================================
pub mod blockchain;
pub mod transaction;

// ============================================================================
// Storage
// ============================================================================
pub mod persistence;

// ============================================================================
// Configuration & Utilities
// ============================================================================
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod error;

pub use blockchain::{check_chain, replay, Block, BlockRecord, Blockchain, ReplayOptions, State};
pub use error::{ChainError, Result};
pub use transaction::{Amount, Delta, Transaction, TransactionRejection};
