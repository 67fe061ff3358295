use crate::blockchain::core::draft::BlockDraft;
use crate::blockchain::core::state::State;
use crate::blockchain::core::validation::{replay, ReplayOptions};
use crate::error::{ChainError, Result};
use crate::persistence::{InMemoryPersistence, Persistence};
use crate::transaction::{Transaction, TransactionList, TransactionRejection};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{info, warn};

/// `previous_hash` of the genesis block, which has no parent.
pub const GENESIS_PREVIOUS_HASH: &str = "0";

/// Layout of block timestamps. The string is hashed as-is, so it must never change.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

pub fn current_timestamp() -> String {
    chrono::Utc::now().format(TIMESTAMP_FORMAT).to_string()
}

/// Flat five-field form of a block, as handed to and read back from storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockRecord {
    pub index: u64,
    pub timestamp: String,
    /// Compact JSON array of delta mappings, e.g. `[{"Alice":100,"Venti":-100}]`.
    pub data: String,
    pub previous_hash: String,
    pub hash: String,
}

/// One committed batch of transactions.
///
/// A block holds its parent's hash by value, never the parent itself, so
/// linkage checks must be handed the parent explicitly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    index: u64,
    timestamp: String,
    data: Vec<Transaction>,
    previous_hash: String,
    hash: String,
}

impl Block {
    /// SHA-256 (lowercase hex) over `index ++ timestamp ++ data ++ previous_hash`.
    ///
    /// `data` is rendered as the same compact JSON stored in [`BlockRecord::data`].
    /// Any change to this rendering invalidates every stored hash.
    pub fn hash_block(index: u64, timestamp: &str, data: &[Transaction], previous_hash: &str) -> String {
        let block_string = format!("{}{}{}{}", index, timestamp, TransactionList(data), previous_hash);
        let mut hasher = Sha256::new();
        hasher.update(block_string.as_bytes());
        hex::encode(hasher.finalize())
    }

    fn sealed(index: u64, timestamp: String, data: Vec<Transaction>, previous_hash: String) -> Self {
        let hash = Self::hash_block(index, &timestamp, &data, &previous_hash);
        Block {
            index,
            timestamp,
            data,
            previous_hash,
            hash,
        }
    }

    pub fn create_genesis_block(initial_state: Transaction) -> Self {
        Self::genesis_at(initial_state, current_timestamp())
    }

    pub fn genesis_at(initial_state: Transaction, timestamp: impl Into<String>) -> Self {
        Self::sealed(0, timestamp.into(), vec![initial_state], GENESIS_PREVIOUS_HASH.to_string())
    }

    pub fn next_block(parent: &Block, transactions: Vec<Transaction>) -> Self {
        Self::next_at(parent, transactions, current_timestamp())
    }

    /// A child of a parent at `u64::MAX` keeps that index and fails the sequence check.
    pub fn next_at(parent: &Block, transactions: Vec<Transaction>, timestamp: impl Into<String>) -> Self {
        Self::sealed(parent.index.saturating_add(1), timestamp.into(), transactions, parent.hash.clone())
    }

    /// Recomputes the hash from this block's own fields and compares it to the stored one.
    pub fn check_block_hash(&self) -> bool {
        Self::hash_block(self.index, &self.timestamp, &self.data, &self.previous_hash) == self.hash
    }

    pub fn index(&self) -> u64 {
        self.index
    }

    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }

    pub fn data(&self) -> &[Transaction] {
        &self.data
    }

    pub fn previous_hash(&self) -> &str {
        &self.previous_hash
    }

    pub fn hash(&self) -> &str {
        &self.hash
    }

    pub fn is_genesis(&self) -> bool {
        self.index == 0
    }

    pub fn to_record(&self) -> BlockRecord {
        BlockRecord {
            index: self.index,
            timestamp: self.timestamp.clone(),
            data: TransactionList(&self.data).to_string(),
            previous_hash: self.previous_hash.clone(),
            hash: self.hash.clone(),
        }
    }

    /// Rebuilds a block from its stored record. The stored hash is kept as-is;
    /// whether it still matches is for [`Block::check_block_hash`] to decide.
    ///
    /// The hash covers the exact stored text, so data that parses but is not
    /// in canonical form (spacing, key order, duplicate keys) is a `HashMismatch`.
    pub fn from_record(record: BlockRecord) -> Result<Self> {
        let data: Vec<Transaction> = serde_json::from_str(&record.data).map_err(|e| {
            ChainError::Serialization(format!(
                "Failed to parse transactions of block {}: {}",
                record.index, e
            ))
        })?;
        if TransactionList(&data).to_string() != record.data {
            return Err(ChainError::HashMismatch { index: record.index });
        }
        Ok(Block {
            index: record.index,
            timestamp: record.timestamp,
            data,
            previous_hash: record.previous_hash,
            hash: record.hash,
        })
    }
}

/// Outcome of sealing one batch of candidate transactions.
#[derive(Debug, Clone)]
pub struct BlockOutcome {
    pub index: u64,
    pub accepted: usize,
    pub rejected: Vec<(Transaction, TransactionRejection)>,
}

/// The running chain and the state derived from it.
///
/// Appending takes `&mut self`: reading the tail, building the new block and
/// persisting it happen as one exclusive step.
pub struct Blockchain {
    blocks: Vec<Block>,
    state: State,
    persistence: Box<dyn Persistence>,
}

impl Blockchain {
    /// Starts a new chain whose genesis block holds `genesis`, kept in memory only.
    pub fn new(genesis: Transaction) -> Result<Self> {
        Self::create(genesis, Box::new(InMemoryPersistence::new()))
    }

    /// Starts a new chain in `persistence`, which must not hold any block yet.
    pub fn create(genesis: Transaction, persistence: Box<dyn Persistence>) -> Result<Self> {
        Self::create_with_block(Block::create_genesis_block(genesis), persistence)
    }

    pub fn create_with_block(genesis_block: Block, persistence: Box<dyn Persistence>) -> Result<Self> {
        if !persistence.is_empty()? {
            return Err(ChainError::ChainAlreadyExists);
        }
        let state = replay(std::slice::from_ref(&genesis_block), ReplayOptions::default())?;
        persistence.save_block(&genesis_block.to_record())?;
        info!(
            "Created genesis block {} seeding {} account(s)",
            genesis_block.hash(),
            state.len()
        );

        Ok(Blockchain {
            blocks: vec![genesis_block],
            state,
            persistence,
        })
    }

    /// Reads every stored block and replays it. The engine is only returned if
    /// the whole history verifies.
    pub fn load(persistence: Box<dyn Persistence>, options: ReplayOptions) -> Result<Self> {
        let records = persistence.load_records()?;
        let (blocks, state) = Self::from_records(records, options)?;
        info!(
            "Loaded chain with {} block(s), tip {}",
            blocks.len(),
            blocks.last().map(|b| b.index()).unwrap_or(0)
        );

        Ok(Blockchain {
            blocks,
            state,
            persistence,
        })
    }

    /// Reconstructs and verifies a chain from records in ascending index order.
    pub fn from_records(records: Vec<BlockRecord>, options: ReplayOptions) -> Result<(Vec<Block>, State)> {
        let blocks = records
            .into_iter()
            .map(Block::from_record)
            .collect::<Result<Vec<_>>>()?;
        let state = replay(&blocks, options)?;
        Ok((blocks, state))
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn tip(&self) -> &Block {
        // Never empty: every constructor installs at least the first block.
        &self.blocks[self.blocks.len() - 1]
    }

    pub fn height(&self) -> u64 {
        self.tip().index()
    }

    pub fn state(&self) -> &State {
        &self.state
    }

    pub fn persistence(&self) -> &dyn Persistence {
        self.persistence.as_ref()
    }

    /// Opens a block on top of the current tip, gated against the current state.
    pub fn draft(&self) -> BlockDraft {
        BlockDraft::new(self.tip(), &self.state)
    }

    /// Seals `draft` and appends it. Fails if the chain moved since the draft was opened.
    pub fn commit(&mut self, draft: BlockDraft) -> Result<&Block> {
        let tip = self.tip();
        if draft.parent_hash() != tip.hash() {
            return Err(ChainError::SequenceBreak {
                index: draft.parent_index().saturating_add(1),
                kind: crate::error::SequenceBreakKind::ParentHashMismatch {
                    expected: tip.hash().to_string(),
                    found: draft.parent_hash().to_string(),
                },
            });
        }
        self.append_block(draft.seal())?;
        Ok(self.tip())
    }

    /// Offers each candidate in order, drops the ones that fail validation and
    /// appends a block holding the rest. An empty block is still appended.
    pub fn add_block<I>(&mut self, candidates: I) -> Result<BlockOutcome>
    where
        I: IntoIterator<Item = Transaction>,
    {
        let mut draft = self.draft();
        let mut rejected = Vec::new();
        for tx in candidates {
            match draft.offer(tx) {
                Ok(_) => {}
                Err(ChainError::InvalidTransaction {
                    transaction, reason, ..
                }) => {
                    warn!("Invalid transaction {}, ignoring: {}", transaction, reason);
                    rejected.push((transaction, reason));
                }
                Err(e) => return Err(e),
            }
        }

        let accepted = draft.len();
        let block = self.commit(draft)?;
        Ok(BlockOutcome {
            index: block.index(),
            accepted,
            rejected,
        })
    }

    /// Verifies `block` against the tip and current state, persists it, then
    /// commits it in memory. Nothing changes if any step fails.
    pub fn append_block(&mut self, block: Block) -> Result<()> {
        let state = block.check_block_validity(self.tip(), &self.state)?;
        self.persistence.save_block(&block.to_record())?;
        info!(
            "Block #{} has been added to the blockchain ({} transaction(s), hash {})",
            block.index(),
            block.data().len(),
            block.hash()
        );

        self.blocks.push(block);
        self.state = state;
        Ok(())
    }

    /// Replays the in-memory chain from scratch.
    pub fn validate(&self, options: ReplayOptions) -> Result<State> {
        replay(&self.blocks, options)
    }
}
