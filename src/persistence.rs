//! Database persistence layer for TallyChain
//!
//! Blocks are stored as flat [`BlockRecord`]s, one row per block keyed by index.
//! Storage is append-only: a second record for an existing index is refused.

use crate::blockchain::BlockRecord;
use crate::error::ChainError;
use rusqlite::{params, Connection, ErrorCode};
use std::sync::{Arc, Mutex};

/// Abstraction for persistence backends.
pub trait Persistence: Send + Sync {
    /// Appends one block record. Fails with `BlockAlreadyExists` if the index is taken.
    fn save_block(&self, record: &BlockRecord) -> Result<(), ChainError>;
    /// Every stored record, ascending by index, ready for replay.
    fn load_records(&self) -> Result<Vec<BlockRecord>, ChainError>;
    /// The record with the highest index (the current tail), if any.
    fn last_record(&self) -> Result<Option<BlockRecord>, ChainError>;
    /// Drops every stored record.
    fn reset(&self) -> Result<(), ChainError>;

    fn is_empty(&self) -> Result<bool, ChainError> {
        Ok(self.last_record()?.is_none())
    }
}

const CREATE_TABLE_SQL: &str = "CREATE TABLE IF NOT EXISTS blockchain (
    blockindex INTEGER PRIMARY KEY,
    timestamp TEXT NOT NULL,
    transactions TEXT NOT NULL,
    prevhash TEXT NOT NULL,
    thishash TEXT NOT NULL
)";

pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    pub fn open(path: &str) -> Result<Self, ChainError> {
        let conn = Connection::open(path)
            .map_err(|e| ChainError::DatabaseError(format!("Failed to open database: {}", e)))?;

        conn.execute(CREATE_TABLE_SQL, [])
            .map_err(|e| ChainError::DatabaseError(format!("Failed to create blockchain table: {}", e)))?;

        Ok(Database { conn: Mutex::new(conn) })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, ChainError> {
        self.conn
            .lock()
            .map_err(|_| ChainError::DatabaseError("Mutex poisoned".to_string()))
    }

    pub fn save_block(&self, record: &BlockRecord) -> Result<(), ChainError> {
        let index = i64::try_from(record.index)
            .map_err(|_| ChainError::DatabaseError(format!("Block index {} out of range", record.index)))?;

        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO blockchain (blockindex, timestamp, transactions, prevhash, thishash)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                index,
                record.timestamp,
                record.data,
                record.previous_hash,
                record.hash,
            ],
        )
        .map_err(|e| match e {
            rusqlite::Error::SqliteFailure(ref err, _) if err.code == ErrorCode::ConstraintViolation => {
                ChainError::BlockAlreadyExists(record.index)
            }
            other => ChainError::DatabaseError(format!("Failed to save block: {}", other)),
        })?;

        Ok(())
    }

    pub fn load_records(&self) -> Result<Vec<BlockRecord>, ChainError> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(
                "SELECT blockindex, timestamp, transactions, prevhash, thishash
                 FROM blockchain ORDER BY blockindex ASC",
            )
            .map_err(|e| ChainError::DatabaseError(format!("Failed to prepare query: {}", e)))?;

        let rows = stmt
            .query_map([], read_row)
            .map_err(|e| ChainError::DatabaseError(format!("Failed to query blocks: {}", e)))?;

        let mut records = Vec::new();
        for row in rows {
            let row = row.map_err(|e| ChainError::DatabaseError(format!("Failed to load block: {}", e)))?;
            records.push(into_record(row)?);
        }
        Ok(records)
    }

    pub fn last_record(&self) -> Result<Option<BlockRecord>, ChainError> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(
                "SELECT blockindex, timestamp, transactions, prevhash, thishash
                 FROM blockchain ORDER BY blockindex DESC LIMIT 1",
            )
            .map_err(|e| ChainError::DatabaseError(format!("Failed to prepare query: {}", e)))?;

        let mut rows = stmt
            .query_map([], read_row)
            .map_err(|e| ChainError::DatabaseError(format!("Failed to query last block: {}", e)))?;

        match rows.next() {
            Some(row) => {
                let row = row.map_err(|e| ChainError::DatabaseError(format!("Failed to load block: {}", e)))?;
                Ok(Some(into_record(row)?))
            }
            None => Ok(None),
        }
    }

    pub fn reset(&self) -> Result<(), ChainError> {
        let conn = self.lock()?;
        let tx = conn
            .unchecked_transaction()
            .map_err(|e| ChainError::DatabaseError(format!("Failed to start transaction: {}", e)))?;

        tx.execute("DROP TABLE IF EXISTS blockchain", [])
            .map_err(|e| ChainError::DatabaseError(format!("Failed to drop blockchain table: {}", e)))?;
        tx.execute(CREATE_TABLE_SQL, [])
            .map_err(|e| ChainError::DatabaseError(format!("Failed to create blockchain table: {}", e)))?;

        tx.commit()
            .map_err(|e| ChainError::DatabaseError(format!("Failed to commit transaction: {}", e)))?;
        Ok(())
    }
}

type RawRow = (i64, String, String, String, String);

fn read_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawRow> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?))
}

fn into_record((index, timestamp, data, previous_hash, hash): RawRow) -> Result<BlockRecord, ChainError> {
    let index = u64::try_from(index)
        .map_err(|_| ChainError::DatabaseError(format!("Negative block index {} in store", index)))?;
    Ok(BlockRecord {
        index,
        timestamp,
        data,
        previous_hash,
        hash,
    })
}

// Implement the Persistence trait for the rusqlite-backed Database
impl Persistence for Database {
    fn save_block(&self, record: &BlockRecord) -> Result<(), ChainError> {
        Database::save_block(self, record)
    }

    fn load_records(&self) -> Result<Vec<BlockRecord>, ChainError> {
        Database::load_records(self)
    }

    fn last_record(&self) -> Result<Option<BlockRecord>, ChainError> {
        Database::last_record(self)
    }

    fn reset(&self) -> Result<(), ChainError> {
        Database::reset(self)
    }
}

/// Simple in-memory persistence implementation useful for tests and ephemeral runs.
/// Clones share the same underlying records.
#[derive(Clone, Default)]
pub struct InMemoryPersistence {
    records: Arc<Mutex<Vec<BlockRecord>>>,
}

impl InMemoryPersistence {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Vec<BlockRecord>>, ChainError> {
        self.records
            .lock()
            .map_err(|_| ChainError::DatabaseError("Mutex poisoned".to_string()))
    }
}

impl Persistence for InMemoryPersistence {
    fn save_block(&self, record: &BlockRecord) -> Result<(), ChainError> {
        let mut records = self.lock()?;
        match records.binary_search_by_key(&record.index, |r| r.index) {
            Ok(_) => Err(ChainError::BlockAlreadyExists(record.index)),
            Err(pos) => {
                records.insert(pos, record.clone());
                Ok(())
            }
        }
    }

    fn load_records(&self) -> Result<Vec<BlockRecord>, ChainError> {
        Ok(self.lock()?.clone())
    }

    fn last_record(&self) -> Result<Option<BlockRecord>, ChainError> {
        Ok(self.lock()?.last().cloned())
    }

    fn reset(&self) -> Result<(), ChainError> {
        self.lock()?.clear();
        Ok(())
    }
}
