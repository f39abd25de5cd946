//! Balance query command.

use super::{Session, DEFAULT_DATA_DIR};
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;

#[derive(Args)]
pub struct BalanceArgs {
    /// Directory to store ledger data
    #[arg(short, long, default_value = DEFAULT_DATA_DIR)]
    data_dir: PathBuf,

    /// Address to query
    address: String,
}

pub fn run(args: BalanceArgs) -> Result<()> {
    let session = Session::open(&args.data_dir)?;
    let balance = session.ledger.balance_of(&args.address);

    println!();
    println!("  Address: {}", args.address.bright_yellow());
    println!("  Balance: {}", balance.to_string().bright_cyan());
    println!();
    Ok(())
}
