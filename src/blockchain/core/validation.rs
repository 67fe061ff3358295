use crate::blockchain::core::chain::Block;
use crate::blockchain::core::state::State;
use crate::error::{ChainError, Result, SequenceBreakKind};
use tracing::{debug, info, warn};

/// How replay treats a loaded sequence whose first block is not index 0.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplayOptions {
    /// Off by default: a non-genesis start is a hard error. Hosts turn this on
    /// only after an operator has explicitly acknowledged the condition.
    pub allow_non_genesis_start: bool,
}

impl ReplayOptions {
    pub fn strict() -> Self {
        Self::default()
    }

    pub fn allowing_non_genesis_start() -> Self {
        ReplayOptions {
            allow_non_genesis_start: true,
        }
    }
}

impl Block {
    /// Verifies this block as the successor of `parent` and returns the state
    /// after folding its transactions into `state`.
    ///
    /// Checks run in a fixed order and the first failure wins: transactions,
    /// own hash, index sequence, parent hash.
    pub fn check_block_validity(&self, parent: &Block, state: &State) -> Result<State> {
        let mut state = state.clone();
        for tx in self.data() {
            if let Err(reason) = tx.validate(&state) {
                return Err(ChainError::InvalidTransaction {
                    block_index: Some(self.index()),
                    transaction: tx.clone(),
                    reason,
                });
            }
            state = state.apply(tx);
        }

        if !self.check_block_hash() {
            return Err(ChainError::HashMismatch { index: self.index() });
        }

        let expected_index = parent.index().checked_add(1).ok_or(ChainError::SequenceBreak {
            index: self.index(),
            kind: SequenceBreakKind::IndexExhausted { parent: parent.index() },
        })?;
        if self.index() != expected_index {
            return Err(ChainError::SequenceBreak {
                index: self.index(),
                kind: SequenceBreakKind::IndexMismatch {
                    expected: expected_index,
                    found: self.index(),
                },
            });
        }

        if self.previous_hash() != parent.hash() {
            return Err(ChainError::SequenceBreak {
                index: self.index(),
                kind: SequenceBreakKind::ParentHashMismatch {
                    expected: parent.hash().to_string(),
                    found: self.previous_hash().to_string(),
                },
            });
        }

        debug!("Block {} verified against parent {}", self.index(), parent.index());
        Ok(state)
    }
}

/// Rebuilds account state from an index-ordered block sequence, verifying
/// every hash and link on the way. Stops at the first inconsistency.
///
/// The first block's transactions are trusted as the initial supply and are
/// not run through the transaction validator.
pub fn replay(blocks: &[Block], options: ReplayOptions) -> Result<State> {
    let (first, rest) = blocks.split_first().ok_or(ChainError::EmptyChain)?;

    let mut state = State::new();
    for tx in first.data() {
        state = state.checked_apply(tx).map_err(|reason| ChainError::InvalidTransaction {
            block_index: Some(first.index()),
            transaction: tx.clone(),
            reason,
        })?;
    }

    if !first.check_block_hash() {
        return Err(ChainError::HashMismatch { index: first.index() });
    }

    if !first.is_genesis() {
        if !options.allow_non_genesis_start {
            return Err(ChainError::NonGenesisStart { index: first.index() });
        }
        warn!(
            "Blockchain doesn't start at genesis block (first index {}); continuing as acknowledged",
            first.index()
        );
    }

    let mut parent = first;
    for block in rest {
        state = block.check_block_validity(parent, &state)?;
        parent = block;
    }

    info!(
        "Replayed {} block(s) up to index {}: {} account(s)",
        blocks.len(),
        parent.index(),
        state.len()
    );
    Ok(state)
}

/// Strict replay: a non-genesis start is an error.
pub fn check_chain(blocks: &[Block]) -> Result<State> {
    replay(blocks, ReplayOptions::strict())
}
