#![forbid(unsafe_code)]

use colored::*;

fn main() {
    println!("{}", "TallyChain CLI".bright_cyan().bold());
    println!("{}", "--------------".bright_cyan());
    println!();
    println!(
        "{}",
        "This is the main entry point, but the ledger is driven through separate binaries.".yellow()
    );
    println!(
        "{}",
        "Use 'cargo run --bin <binary_name>' to run a specific command.".yellow()
    );
    println!();
    println!("{}", "Available binaries:".bright_green().underline());
    println!("  - {}  {}", "tally-init".bright_white(), "create the store and its genesis block".dimmed());
    println!("  - {}   {}", "tally-run".bright_white(), "enter transfers and seal blocks".dimmed());
    println!("  - {} {}", "tally-check".bright_white(), "replay and verify the stored chain".dimmed());
    println!("  - {} {}", "tally-balance".bright_white(), "show one account's balance".dimmed());
    println!();
    println!("{}", "Settings are read from ./config.toml when present; log level from RUST_LOG.".yellow());
    println!();
    println!("{}", "Example:".bright_green().underline());
    println!("{}", "  cargo run --bin tally-init && cargo run --bin tally-run".italic());
}
