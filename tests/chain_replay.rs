//! Integration tests for building, storing and replaying a chain on disk

use tallychain::blockchain::{check_chain, Block, BlockRecord, Blockchain, ReplayOptions};
use tallychain::error::{ChainError, SequenceBreakKind};
use tallychain::persistence::{Database, Persistence};
use tallychain::transaction::{Transaction, TransactionRejection};
use tempfile::TempDir;

const GENESIS_AMOUNT: i64 = 1_000_000_000_000_000;

/// Helper to open a fresh on-disk store inside a temp directory
fn open_db(dir: &TempDir) -> Result<Database, Box<dyn std::error::Error>> {
    let path = dir.path().join("ledger.db");
    Ok(Database::open(path.to_str().ok_or("non-utf8 temp path")?)?)
}

fn new_chain(dir: &TempDir) -> Result<Blockchain, Box<dyn std::error::Error>> {
    let db = open_db(dir)?;
    Ok(Blockchain::create(Transaction::genesis("Venti", GENESIS_AMOUNT), Box::new(db))?)
}

fn reload(dir: &TempDir) -> Result<Result<Blockchain, ChainError>, Box<dyn std::error::Error>> {
    Ok(Blockchain::load(Box::new(open_db(dir)?), ReplayOptions::default()))
}

/// Rewrites the stored chain with `records`, bypassing every check.
fn overwrite(dir: &TempDir, records: &[BlockRecord]) -> Result<(), Box<dyn std::error::Error>> {
    let db = open_db(dir)?;
    db.reset()?;
    for record in records {
        db.save_block(record)?;
    }
    Ok(())
}

#[test]
fn test_genesis_only_chain_replays_to_initial_supply() -> Result<(), Box<dyn std::error::Error>> {
    let dir = TempDir::new()?;
    new_chain(&dir)?;

    let chain = reload(&dir)??;
    assert_eq!(chain.blocks().len(), 1);
    assert_eq!(chain.state().len(), 1);
    assert_eq!(chain.state().balance("Venti"), GENESIS_AMOUNT);
    Ok(())
}

#[test]
fn test_transfers_survive_reload() -> Result<(), Box<dyn std::error::Error>> {
    let dir = TempDir::new()?;
    let mut chain = new_chain(&dir)?;

    let outcome = chain.add_block(vec![Transaction::transfer("Venti", "Alice", 100)])?;
    assert!(outcome.rejected.is_empty());
    assert_eq!(chain.state().balance("Venti"), 999_999_999_999_900);
    assert_eq!(chain.state().balance("Alice"), 100);

    let outcome = chain.add_block(vec![Transaction::transfer("Alice", "Bob", 500)])?;
    assert_eq!(outcome.accepted, 0);
    assert!(matches!(
        outcome.rejected[0].1,
        TransactionRejection::Overdraft { ref account, balance: 100, delta: -500 } if account == "Alice"
    ));
    assert_eq!(chain.state().balance("Alice"), 100);
    assert!(!chain.state().contains("Bob"));

    let reloaded = reload(&dir)??;
    assert_eq!(reloaded.height(), 2);
    assert_eq!(reloaded.state(), chain.state());
    assert_eq!(reloaded.blocks(), chain.blocks());
    Ok(())
}

#[test]
fn test_tampered_data_is_hash_mismatch() -> Result<(), Box<dyn std::error::Error>> {
    let dir = TempDir::new()?;
    let mut chain = new_chain(&dir)?;
    chain.add_block(vec![Transaction::transfer("Venti", "Alice", 100)])?;
    chain.add_block(vec![Transaction::transfer("Alice", "Bob", 10)])?;

    let mut records = open_db(&dir)?.load_records()?;
    records[1].data = r#"[{"Alice":90,"Venti":-90}]"#.to_string();
    overwrite(&dir, &records)?;

    let tampered = Block::from_record(records[1].clone())?;
    assert!(!tampered.check_block_hash());

    let err = reload(&dir)?.err();
    assert!(matches!(err, Some(ChainError::HashMismatch { index: 1 })));
    Ok(())
}

#[test]
fn test_reformatted_data_is_hash_mismatch() -> Result<(), Box<dyn std::error::Error>> {
    let dir = TempDir::new()?;
    let mut chain = new_chain(&dir)?;
    chain.add_block(vec![Transaction::transfer("Venti", "Alice", 100)])?;

    // Same transfer, different spelling.
    let mut records = open_db(&dir)?.load_records()?;
    records[1].data = r#"[ { "Venti" : -100 , "Alice" : 100 } ]"#.to_string();
    overwrite(&dir, &records)?;

    let err = reload(&dir)?.err();
    assert!(matches!(err, Some(ChainError::HashMismatch { index: 1 })));
    Ok(())
}

#[test]
fn test_skipped_parent_is_sequence_break()-> Result<(), Box<dyn std::error::Error>> {
    let dir = TempDir::new()?;
    let mut chain = new_chain(&dir)?;
    chain.add_block(Vec::new())?;
    chain.add_block(Vec::new())?;

    let mut records = open_db(&dir)?.load_records()?;
    let genesis_hash = records[0].hash.clone();
    let block2 = &mut records[2];
    block2.previous_hash = genesis_hash;
    block2.hash = Block::hash_block(block2.index, &block2.timestamp, &[], &block2.previous_hash);
    overwrite(&dir, &records)?;

    match reload(&dir)?.err() {
        Some(ChainError::SequenceBreak {
            index: 2,
            kind: SequenceBreakKind::ParentHashMismatch { .. },
        }) => {}
        other => panic!("expected SequenceBreak at block 2, got {:?}", other.map(|e| e.to_string())),
    }
    Ok(())
}

#[test]
fn test_empty_block_links_and_keeps_state() -> Result<(), Box<dyn std::error::Error>> {
    let dir = TempDir::new()?;
    let mut chain = new_chain(&dir)?;
    let before = chain.state().clone();

    let outcome = chain.add_block(Vec::new())?;
    assert_eq!(outcome.index, 1);
    assert_eq!(*chain.state(), before);

    let block = chain.tip();
    assert!(block.data().is_empty());
    assert!(block.check_block_hash());
    assert_eq!(block.previous_hash(), chain.blocks()[0].hash());

    let stored = open_db(&dir)?.last_record()?.ok_or("missing tail record")?;
    assert_eq!(stored.data, "[]");
    assert_eq!(reload(&dir)??.state(), &before);
    Ok(())
}

#[test]
fn test_missing_genesis_needs_acknowledgement() -> Result<(), Box<dyn std::error::Error>> {
    let dir = TempDir::new()?;
    let mut chain = new_chain(&dir)?;
    chain.add_block(vec![Transaction::transfer("Venti", "Alice", 100)])?;
    chain.add_block(vec![Transaction::transfer("Alice", "Bob", 10)])?;

    let records = open_db(&dir)?.load_records()?;
    overwrite(&dir, &records[1..])?;

    let err = reload(&dir)?.err();
    assert!(matches!(err, Some(ChainError::NonGenesisStart { index: 1 })));

    let chain = Blockchain::load(
        Box::new(open_db(&dir)?),
        ReplayOptions::allowing_non_genesis_start(),
    )?;
    // Block 1 is folded unchecked, block 2 is then gated against it.
    assert_eq!(chain.state().balance("Alice"), 90);
    assert_eq!(chain.state().balance("Bob"), 10);
    assert_eq!(chain.state().balance("Venti"), -100);
    Ok(())
}

#[test]
fn test_create_on_existing_store_is_refused() -> Result<(), Box<dyn std::error::Error>> {
    let dir = TempDir::new()?;
    new_chain(&dir)?;

    let again = Blockchain::create(Transaction::genesis("Venti", 5), Box::new(open_db(&dir)?)).err();
    assert!(matches!(again, Some(ChainError::ChainAlreadyExists)));
    assert_eq!(reload(&dir)??.state().balance("Venti"), GENESIS_AMOUNT);
    Ok(())
}

#[test]
fn test_duplicate_block_is_not_stored() -> Result<(), Box<dyn std::error::Error>> {
    let dir = TempDir::new()?;
    let mut chain = new_chain(&dir)?;
    chain.add_block(Vec::new())?;

    let db = open_db(&dir)?;
    let tail = db.last_record()?.ok_or("missing tail record")?;
    assert!(matches!(db.save_block(&tail), Err(ChainError::BlockAlreadyExists(1))));
    assert_eq!(db.load_records()?.len(), 2);
    Ok(())
}

#[test]
fn test_check_chain_on_loaded_blocks() -> Result<(), Box<dyn std::error::Error>> {
    let dir = TempDir::new()?;
    let mut chain = new_chain(&dir)?;
    chain.add_block(vec![
        Transaction::transfer("Venti", "Alice", 100),
        Transaction::transfer("Alice", "Carol", 25),
    ])?;

    let (blocks, state) = Blockchain::from_records(open_db(&dir)?.load_records()?, ReplayOptions::default())?;
    assert_eq!(check_chain(&blocks)?, state);
    assert_eq!(state.balance("Carol"), 25);
    assert_eq!(state.total_supply(), GENESIS_AMOUNT as i128);
    Ok(())
}
