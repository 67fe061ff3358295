use crate::blockchain::core::chain::Block;
use crate::blockchain::core::state::State;
use crate::error::{ChainError, Result};
use crate::transaction::Transaction;
use tracing::debug;

/// A block being filled on top of a known parent.
///
/// Each offered transaction is gated against the running state; accepted ones
/// advance it, rejected ones leave it exactly as it was.
#[derive(Debug, Clone)]
pub struct BlockDraft {
    parent: Block,
    state: State,
    transactions: Vec<Transaction>,
}

impl BlockDraft {
    pub fn new(parent: &Block, state: &State) -> Self {
        BlockDraft {
            parent: parent.clone(),
            state: state.clone(),
            transactions: Vec::new(),
        }
    }

    /// Accepts `tx` and returns the state after it, or rejects it with
    /// [`ChainError::InvalidTransaction`]. A rejected transaction should be
    /// dropped; offering it again unchanged fails the same way.
    pub fn offer(&mut self, tx: Transaction) -> Result<&State> {
        if let Err(reason) = tx.validate(&self.state) {
            return Err(ChainError::InvalidTransaction {
                block_index: None,
                transaction: tx,
                reason,
            });
        }
        debug!("Accepted transaction {} into draft of block {}", tx, self.parent.index().saturating_add(1));
        self.state = self.state.apply(&tx);
        self.transactions.push(tx);
        Ok(&self.state)
    }

    /// State after every accepted transaction.
    pub fn state(&self) -> &State {
        &self.state
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    pub fn parent_index(&self) -> u64 {
        self.parent.index()
    }

    pub fn parent_hash(&self) -> &str {
        self.parent.hash()
    }

    pub fn seal(self) -> Block {
        Block::next_block(&self.parent, self.transactions)
    }

    pub fn seal_at(self, timestamp: impl Into<String>) -> Block {
        Block::next_at(&self.parent, self.transactions, timestamp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft() -> BlockDraft {
        let genesis = Block::genesis_at(Transaction::genesis("Venti", 1_000), "t0");
        let state = State::new().apply(&Transaction::genesis("Venti", 1_000));
        BlockDraft::new(&genesis, &state)
    }

    #[test]
    fn test_offer_accepts_and_advances_state() {
        let mut draft = draft();
        let state = draft.offer(Transaction::transfer("Venti", "Alice", 100)).unwrap();
        assert_eq!(state.balance("Alice"), 100);
        assert_eq!(draft.len(), 1);
    }

    #[test]
    fn test_rejected_offer_leaves_state_unchanged() {
        let mut draft = draft();
        draft.offer(Transaction::transfer("Venti", "Alice", 100)).unwrap();
        let before = draft.state().clone();

        let err = draft.offer(Transaction::transfer("Alice", "Bob", 500)).unwrap_err();
        match err {
            ChainError::InvalidTransaction {
                block_index,
                transaction,
                ..
            } => {
                assert_eq!(block_index, None);
                assert_eq!(transaction, Transaction::transfer("Alice", "Bob", 500));
            }
            other => panic!("expected InvalidTransaction, got {:?}", other),
        }
        assert_eq!(*draft.state(), before);
        assert_eq!(draft.len(), 1);
    }

    #[test]
    fn test_later_offers_see_earlier_ones() {
        let mut draft = draft();
        draft.offer(Transaction::transfer("Venti", "Alice", 100)).unwrap();
        assert!(draft.offer(Transaction::transfer("Alice", "Bob", 100)).is_ok());
        assert!(draft.offer(Transaction::transfer("Alice", "Bob", 1)).is_err());
    }

    #[test]
    fn test_seal_links_to_parent() {
        let mut draft = draft();
        draft.offer(Transaction::transfer("Venti", "Alice", 1)).unwrap();
        let parent_hash = draft.parent_hash().to_string();
        let block = draft.seal_at("t1");
        assert_eq!(block.index(), 1);
        assert_eq!(block.previous_hash(), parent_hash);
        assert_eq!(block.data().len(), 1);
        assert!(block.check_block_hash());
    }
}
