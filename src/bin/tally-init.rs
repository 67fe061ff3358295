#![forbid(unsafe_code)]
//! Creates the block store and writes the genesis block.

use clap::Parser;
use colored::*;
use std::path::PathBuf;
use tallychain::blockchain::Blockchain;
use tallychain::cli::{init_logging, open_database};
use tallychain::config::{load_config_from, DEFAULT_CONFIG_PATH};
use tallychain::error::ChainError;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the configuration file
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,
    /// Drop every stored block before creating the genesis block
    #[arg(long)]
    reset: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();
    let cli = Cli::parse();
    let config = load_config_from(&cli.config)?;

    let db = open_database(&config)?;
    if cli.reset {
        db.reset()?;
        println!("{}", format!("🗑️  Cleared {}", config.database.path).yellow());
    }

    match Blockchain::create(config.genesis_transaction(), Box::new(db)) {
        Ok(chain) => {
            let genesis = chain.tip();
            println!("{}", "✅ Genesis block created".bright_green().bold());
            println!("   Store:     {}", config.database.path.bright_white());
            println!("   Hash:      {}", genesis.hash().bright_white());
            println!("   Timestamp: {}", genesis.timestamp());
            println!(
                "   Supply:    {} held by {}",
                config.genesis.amount.to_string().bright_yellow(),
                config.genesis.account.bright_cyan()
            );
            Ok(())
        }
        Err(ChainError::ChainAlreadyExists) => {
            eprintln!(
                "{}",
                format!("❌ {} already holds a chain", config.database.path).red().bold()
            );
            eprintln!("{}", "💡 Run with --reset to start over".yellow());
            Err(ChainError::ChainAlreadyExists.into())
        }
        Err(e) => Err(e.into()),
    }
}
