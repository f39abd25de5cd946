//! Miner statistics command.

use super::{Session, DEFAULT_DATA_DIR};
use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use colored::Colorize;
use settlechain_core::MinerAccount;
use std::path::PathBuf;

#[derive(Args)]
pub struct MinerArgs {
    #[command(subcommand)]
    command: MinerCommand,
}

#[derive(Subcommand)]
enum MinerCommand {
    /// List every miner with committed blocks
    List {
        /// Directory to store ledger data
        #[arg(short, long, default_value = DEFAULT_DATA_DIR)]
        data_dir: PathBuf,
    },
    /// Show one miner's totals
    Show {
        /// Directory to store ledger data
        #[arg(short, long, default_value = DEFAULT_DATA_DIR)]
        data_dir: PathBuf,

        /// Miner address
        address: String,
    },
}

pub fn run(args: MinerArgs) -> Result<()> {
    match args.command {
        MinerCommand::List { data_dir } => {
            let session = Session::open(&data_dir)?;
            let accounts = session.ledger.miner_accounts();

            println!();
            println!("{}", format!("Miners ({}):", accounts.len()).bold().cyan());
            println!();
            for account in &accounts {
                println!(
                    "  {} {} txs, reward {}",
                    account.address.bright_yellow(),
                    account.total_mined_transactions,
                    account.total_reward.to_string().bright_cyan()
                );
            }
            println!();
            Ok(())
        }
        MinerCommand::Show { data_dir, address } => {
            let session = Session::open(&data_dir)?;
            let account = session
                .ledger
                .miner_account(&address)
                .with_context(|| format!("No blocks mined by {}", address))?;
            print_account(&account);
            Ok(())
        }
    }
}

fn print_account(account: &MinerAccount) {
    println!();
    println!("{}", "Miner Information:".bold().cyan());
    println!();
    println!("  Address:            {}", account.address.bright_yellow());
    println!("  Mined Transactions: {}", account.total_mined_transactions);
    println!("  Total Nonce:        {}", account.total_nonce);
    println!(
        "  Total Reward:       {}",
        account.total_reward.to_string().bright_cyan()
    );
    println!();
}
