//! Initialize ledger command.

use super::{Session, DEFAULT_DATA_DIR};
use crate::config::{CliConfig, DEFAULT_VALIDATOR_URL};
use anyhow::{bail, Context, Result};
use clap::Args;
use colored::Colorize;
use settlechain_chain::SelectionPolicy;
use std::fs;
use std::path::PathBuf;

#[derive(Args)]
pub struct InitArgs {
    /// Directory to store ledger data
    #[arg(short, long, default_value = DEFAULT_DATA_DIR)]
    data_dir: PathBuf,

    /// Leading zero hex digits required in block hashes
    #[arg(long, default_value = "4")]
    difficulty: u32,

    /// Reward credited to the miner of each block
    #[arg(long, default_value = "3.125")]
    reward: f64,

    /// Maximum transactions per mining round (1 to 20)
    #[arg(long, default_value = "20")]
    max_batch: usize,

    /// Milliseconds to wait for each settlement check
    #[arg(long, default_value = "5000")]
    timeout_ms: u64,

    /// Batch selection policy
    #[arg(long, value_enum, default_value = "random")]
    selection: Selection,

    /// Base URL of the settlement validator
    #[arg(long, default_value = DEFAULT_VALIDATOR_URL)]
    validator_url: String,
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum Selection {
    Random,
    Fifo,
}

impl From<Selection> for SelectionPolicy {
    fn from(selection: Selection) -> Self {
        match selection {
            Selection::Random => SelectionPolicy::Random,
            Selection::Fifo => SelectionPolicy::Fifo,
        }
    }
}

pub fn run(args: InitArgs) -> Result<()> {
    println!("{}", "Initializing settlechain...".bold().cyan());
    println!();

    if CliConfig::path(&args.data_dir).exists() {
        bail!(
            "Ledger already initialized in {}",
            args.data_dir.display()
        );
    }

    let mut config = CliConfig {
        validator_url: args.validator_url,
        ..CliConfig::default()
    };
    config.ledger.difficulty = args.difficulty;
    config.ledger.mining_reward = args.reward;
    config.ledger.max_batch_size = args.max_batch;
    config.ledger.validation_timeout_ms = args.timeout_ms;
    config.ledger.selection = args.selection.into();
    config
        .ledger
        .validate()
        .with_context(|| "Invalid ledger settings")?;

    fs::create_dir_all(&args.data_dir)
        .with_context(|| format!("Failed to create data directory: {:?}", args.data_dir))?;
    println!("{}  Created data directory", "✓".green().bold());

    let session = Session::open_with(&args.data_dir, config.clone())?;
    let genesis = session
        .ledger
        .block(0)
        .context("Genesis block missing after open")?;
    session.close()?;

    println!("{}  Created genesis block", "✓".green().bold());
    println!("    Hash: {}", genesis.hash.to_hex().bright_yellow());
    println!("    Index: {}", "0".bright_cyan());

    let config_file = config.save(&args.data_dir)?;
    println!(
        "{}  Saved config to: {}",
        "✓".green().bold(),
        config_file.display().to_string().bright_black()
    );

    println!();
    println!("{}", "Ledger initialized successfully!".green().bold());
    println!();
    println!("Next steps:");
    println!(
        "  • Use {} to submit transactions",
        "settlechain tx submit".bright_cyan()
    );
    println!(
        "  • Use {} to mine a block",
        "settlechain mine --miner <address>".bright_cyan()
    );
    println!(
        "  • Use {} to explore blocks",
        "settlechain block list".bright_cyan()
    );

    Ok(())
}
