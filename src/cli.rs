//! Shared plumbing for the `tally-*` binaries

use crate::blockchain::{Blockchain, ReplayOptions, State};
use crate::config::{load_config_from, Config};
use crate::error::ChainError;
use crate::persistence::Database;
use crate::transaction::Amount;
use comfy_table::presets::UTF8_FULL;
use comfy_table::Color as TableColor;
use comfy_table::{Attribute, Cell, CellAlignment, ContentArrangement, Table};
use std::io::{self, BufRead, Write};
use std::path::Path;
use tracing_subscriber::EnvFilter;

/// Installs the fmt subscriber. `RUST_LOG` overrides the default `info` level.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// Opens the configured SQLite file, creating its directory if needed.
pub fn open_database(config: &Config) -> Result<Database, ChainError> {
    if let Some(parent) = Path::new(&config.database.path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Database::open(&config.database.path)
}

pub fn load_blockchain(config: &Config, options: ReplayOptions) -> Result<Blockchain, ChainError> {
    let db = open_database(config)?;
    Blockchain::load(Box::new(db), options)
}

pub fn load_blockchain_from_config(
    config_path: impl AsRef<Path>,
) -> Result<(Config, Blockchain), ChainError> {
    let config = load_config_from(config_path)?;
    let chain = load_blockchain(&config, config.replay_options())?;
    Ok((config, chain))
}

/// Prints `prompt` and reads one trimmed line. `None` at end of input.
pub fn prompt_line<R: BufRead>(input: &mut R, prompt: &str) -> io::Result<Option<String>> {
    print!("{}", prompt);
    io::stdout().flush()?;

    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}

/// Asks a yes/no question; anything but `y`/`yes` counts as no.
pub fn confirm<R: BufRead>(input: &mut R, prompt: &str) -> io::Result<bool> {
    let answer = prompt_line(input, &format!("{} [y/N] ", prompt))?;
    Ok(matches!(
        answer.as_deref().map(str::to_ascii_lowercase).as_deref(),
        Some("y") | Some("yes")
    ))
}

pub fn parse_amount(input: &str) -> Result<Amount, String> {
    input
        .trim()
        .parse::<Amount>()
        .map_err(|e| format!("'{}' is not a whole amount: {}", input.trim(), e))
}

pub fn state_table(state: &State) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("Account")
                .fg(TableColor::Cyan)
                .add_attribute(Attribute::Bold),
            Cell::new("Balance")
                .fg(TableColor::Cyan)
                .add_attribute(Attribute::Bold),
        ]);

    for (account, balance) in state.iter() {
        let color = if balance < 0 {
            TableColor::Red
        } else {
            TableColor::Green
        };
        table.add_row(vec![
            Cell::new(account),
            Cell::new(balance).fg(color).set_alignment(CellAlignment::Right),
        ]);
    }
    table
}
