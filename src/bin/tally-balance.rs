#![forbid(unsafe_code)]
use clap::Parser;
use std::path::PathBuf;
use tallychain::cli::{init_logging, load_blockchain_from_config};
use tallychain::config::DEFAULT_CONFIG_PATH;

#[derive(Parser)]
#[command(author, version, about = "Show the balance of one account", long_about = None)]
struct Cli {
    /// Account name
    account: String,
    /// Path to the configuration file
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();
    let cli = Cli::parse();

    let (_config, chain) = load_blockchain_from_config(&cli.config)?;

    println!("Account: {}", cli.account);
    println!("Chain height: {}", chain.height());
    if chain.state().contains(&cli.account) {
        println!("Balance: {}", chain.state().balance(&cli.account));
    } else {
        println!("Balance: 0 (account has never appeared in a transaction)");
    }

    Ok(())
}
