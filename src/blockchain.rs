// Thin re-export module: implementation lives in `blockchain/core.rs`, split
// into state derivation, block/chain management, drafting and validation.

pub mod core;
pub use self::core::*;
