//! Mining command.

use super::{Session, DEFAULT_DATA_DIR};
use anyhow::{bail, Result};
use clap::Args;
use colored::Colorize;
use settlechain_chain::MiningOutcome;
use std::path::PathBuf;

#[derive(Args)]
pub struct MineArgs {
    /// Directory to store ledger data
    #[arg(short, long, default_value = DEFAULT_DATA_DIR)]
    data_dir: PathBuf,

    /// Address credited with the block reward
    #[arg(short, long)]
    miner: String,

    /// Number of rounds to run; stops early when nothing is left to mine
    #[arg(short, long, default_value = "1")]
    rounds: u32,
}

pub async fn run(args: MineArgs) -> Result<()> {
    if args.rounds == 0 {
        bail!("--rounds must be at least 1");
    }

    let session = Session::open(&args.data_dir)?;

    println!("{}", "Mining...".bold().cyan());
    println!(
        "  Difficulty: {}",
        session.ledger.config().difficulty.to_string().bright_cyan()
    );
    println!();

    let mut mined = 0;
    for _ in 0..args.rounds {
        match session.ledger.mine_next_block(&args.miner).await? {
            MiningOutcome::Mined(block) => {
                mined += 1;
                println!("{}  Block mined", "✓".green().bold());
                println!("    Index:        {}", block.index.to_string().bright_cyan());
                println!("    Hash:         {}", block.hash.to_hex().bright_yellow());
                println!("    Nonce:        {}", block.nonce);
                println!(
                    "    Transactions: {} (+ reward {})",
                    block.mined_transaction_count(),
                    block.reward
                );
            }
            MiningOutcome::Empty => {
                println!(
                    "{}  Nothing to mine: no pending transaction passed validation",
                    "-".bright_black()
                );
                break;
            }
        }
    }

    if let Some(account) = session.ledger.miner_account(&args.miner) {
        println!();
        println!(
            "  {} mined {} block(s) this run; lifetime reward {}",
            args.miner.bright_yellow(),
            mined,
            account.total_reward.to_string().bright_cyan()
        );
    }

    session.close()
}
