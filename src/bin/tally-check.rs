#![forbid(unsafe_code)]
//! Replays the stored chain from genesis and prints the resulting balances.

use clap::Parser;
use colored::*;
use std::path::PathBuf;
use tallychain::blockchain::ReplayOptions;
use tallychain::cli::{init_logging, load_blockchain, state_table};
use tallychain::config::{load_config_from, DEFAULT_CONFIG_PATH};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the configuration file
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,
    /// Accept a stored chain whose first block is not the genesis block
    #[arg(long)]
    allow_non_genesis_start: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();
    let cli = Cli::parse();
    let config = load_config_from(&cli.config)?;

    let options = ReplayOptions {
        allow_non_genesis_start: cli.allow_non_genesis_start || config.ledger.allow_non_genesis_start,
    };

    let chain = match load_blockchain(&config, options) {
        Ok(chain) => chain,
        Err(e) => {
            eprintln!("{}", "❌ Chain verification failed".red().bold());
            eprintln!("   {}", e.to_string().red());
            if e.is_warning() {
                eprintln!("{}", "💡 Re-run with --allow-non-genesis-start to accept it".yellow());
            }
            return Err(e.into());
        }
    };

    println!("{}", "✅ Chain verified".bright_green().bold());
    println!("   Blocks:  {}", chain.blocks().len());
    println!("   Height:  {}", chain.height());
    println!("   Tip:     {}", chain.tip().hash().bright_white());
    println!("   Supply:  {}", chain.state().total_supply().to_string().bright_yellow());
    println!();
    println!("{}", state_table(chain.state()));

    Ok(())
}
