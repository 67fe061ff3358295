#![forbid(unsafe_code)]
//! Interactive ledger console: enter transfers, seal them into blocks.

use clap::Parser;
use colored::*;
use std::io::{self, BufRead};
use std::path::PathBuf;
use tallychain::blockchain::{BlockDraft, Blockchain, ReplayOptions};
use tallychain::cli::{confirm, init_logging, load_blockchain, open_database, parse_amount, prompt_line, state_table};
use tallychain::config::{load_config_from, Config, DEFAULT_CONFIG_PATH};
use tallychain::error::ChainError;
use tallychain::persistence::Persistence;
use tallychain::transaction::Transaction;

const EXIT_WORD: &str = "EXIT";

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the configuration file
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();
    let cli = Cli::parse();
    let config = load_config_from(&cli.config)?;

    let stdin = io::stdin();
    let mut input = stdin.lock();

    let mut chain = open_chain(&config, &mut input)?;
    println!(
        "{}",
        format!(
            "⛓️  Chain ready at height {} with {} account(s)",
            chain.height(),
            chain.state().len()
        )
        .bright_cyan()
        .bold()
    );
    println!(
        "{}",
        format!(
            "A block is sealed every {} entries. Type {} as sender to stop.",
            config.ledger.transactions_per_block, EXIT_WORD
        )
        .yellow()
    );

    let mut draft = chain.draft();
    let mut entries = 0;
    loop {
        println!();
        let Some(sender) = prompt_line(&mut input, "Sender: ")? else {
            break;
        };
        if sender == EXIT_WORD {
            break;
        }
        if sender.is_empty() {
            eprintln!("{}", "Sender cannot be empty".red());
            continue;
        }
        let Some(receiver) = prompt_line(&mut input, "Receiver: ")? else {
            break;
        };
        let Some(amount) = prompt_line(&mut input, "Amount: ")? else {
            break;
        };
        let amount = match parse_amount(&amount) {
            Ok(amount) => amount,
            Err(msg) => {
                eprintln!("{}", msg.red());
                continue;
            }
        };

        entries += 1;
        match draft.offer(Transaction::transfer(sender, receiver, amount)) {
            Ok(_) => println!("{}", "✅ Transaction accepted".green()),
            Err(ChainError::InvalidTransaction { transaction, reason, .. }) => {
                println!("{}", format!("❌ Rejected {}: {}", transaction, reason).red());
            }
            Err(e) => return Err(e.into()),
        }

        if entries >= config.ledger.transactions_per_block {
            seal(&mut chain, draft)?;
            draft = chain.draft();
            entries = 0;
        }
    }

    if !draft.is_empty() {
        seal(&mut chain, draft)?;
    }

    println!();
    println!("{}", state_table(chain.state()));
    Ok(())
}

/// Loads the stored chain, creating it from config when the store is empty.
/// A chain that does not start at genesis is only accepted after the operator confirms.
fn open_chain<R: BufRead>(config: &Config, input: &mut R) -> Result<Blockchain, Box<dyn std::error::Error>> {
    let db = open_database(config)?;
    if db.is_empty()? {
        println!("{}", "No chain found, creating genesis block".yellow());
        return Ok(Blockchain::create(config.genesis_transaction(), Box::new(db))?);
    }

    match Blockchain::load(Box::new(db), config.replay_options()) {
        Ok(chain) => Ok(chain),
        Err(e) if e.is_warning() => {
            eprintln!("{}", format!("⚠️  WARNING: {}", e).bright_yellow().bold());
            if confirm(input, "Continue with this chain anyway?")? {
                Ok(load_blockchain(config, ReplayOptions::allowing_non_genesis_start())?)
            } else {
                Err(e.into())
            }
        }
        Err(e) => Err(e.into()),
    }
}

fn seal(chain: &mut Blockchain, draft: BlockDraft) -> Result<(), ChainError> {
    let accepted = draft.len();
    let block = chain.commit(draft)?;
    println!(
        "{}",
        format!(
            "📦 Block #{} sealed with {} transaction(s): {}",
            block.index(),
            accepted,
            block.hash()
        )
        .bright_green()
        .bold()
    );
    Ok(())
}
