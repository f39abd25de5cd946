//! Chain validation command.

use super::{Session, DEFAULT_DATA_DIR};
use anyhow::{bail, Result};
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;

#[derive(Args)]
pub struct ValidateArgs {
    /// Directory to store ledger data
    #[arg(short, long, default_value = DEFAULT_DATA_DIR)]
    data_dir: PathBuf,
}

pub fn run(args: ValidateArgs) -> Result<()> {
    let session = Session::open(&args.data_dir)?;
    let stats = session.ledger.stats();

    println!();
    println!("  Blocks:  {}", (stats.height + 1).to_string().bright_cyan());
    println!("  Tail:    {}", stats.tail_hash.to_hex().bright_yellow());
    println!("  Pending: {}", stats.pending_transactions);
    println!("  Miners:  {}", stats.miners);
    println!();

    match session.ledger.first_fault() {
        None => {
            println!("{}  Chain is valid", "✓".green().bold());
            Ok(())
        }
        Some(fault) => {
            println!("{}  Chain is invalid", "✗".red().bold());
            bail!("{}", fault)
        }
    }
}
