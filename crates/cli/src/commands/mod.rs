//! CLI commands module.

use crate::config::CliConfig;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Subcommand;
use settlechain_chain::MiningCoordinator;
use settlechain_settlement::HttpSettlementClient;
use settlechain_storage::SledStore;
use std::path::{Path, PathBuf};
use std::sync::Arc;

mod balance;
mod block;
mod init;
mod mine;
mod miner;
mod tx;
mod validate;

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new ledger
    Init(init::InitArgs),
    /// Submit and inspect transactions
    Tx(tx::TxArgs),
    /// Run mining rounds
    Mine(mine::MineArgs),
    /// Check the integrity of the chain
    Validate(validate::ValidateArgs),
    /// Show the balance of an address
    Balance(balance::BalanceArgs),
    /// Block operations
    Block(block::BlockArgs),
    /// Miner statistics
    Miner(miner::MinerArgs),
}

pub async fn run(cmd: Commands) -> Result<()> {
    match cmd {
        Commands::Init(args) => init::run(args),
        Commands::Tx(args) => tx::run(args),
        Commands::Mine(args) => mine::run(args).await,
        Commands::Validate(args) => validate::run(args),
        Commands::Balance(args) => balance::run(args),
        Commands::Block(args) => block::run(args),
        Commands::Miner(args) => miner::run(args),
    }
}

/// Default data directory.
pub const DEFAULT_DATA_DIR: &str = "./data";

/// Subdirectory of the data directory holding the sled database.
const LEDGER_DIR: &str = "ledger";

/// An opened ledger and the store behind it.
pub struct Session {
    pub ledger: MiningCoordinator,
    store: Arc<SledStore>,
}

impl Session {
    /// Open the ledger in `data_dir` using its `config.json`.
    pub fn open(data_dir: &Path) -> Result<Self> {
        let config = CliConfig::load(data_dir)?;
        Self::open_with(data_dir, config)
    }

    pub fn open_with(data_dir: &Path, config: CliConfig) -> Result<Self> {
        let store = Arc::new(
            SledStore::open(ledger_path(data_dir))
                .with_context(|| "Failed to open storage. Did you run 'settlechain init'?")?,
        );
        let validator = HttpSettlementClient::new(&config.validator_url)
            .with_context(|| format!("Invalid validator url: {}", config.validator_url))?;
        let ledger = MiningCoordinator::open(store.clone(), Arc::new(validator), config.ledger)
            .with_context(|| "Failed to load ledger")?;
        Ok(Self { ledger, store })
    }

    /// Flush pending writes to disk.
    pub fn close(self) -> Result<()> {
        self.store.flush().with_context(|| "Failed to flush storage")?;
        Ok(())
    }
}

fn ledger_path(data_dir: &Path) -> PathBuf {
    data_dir.join(LEDGER_DIR)
}

/// Render a Unix-millisecond timestamp string for display.
pub fn format_timestamp(millis: &str) -> String {
    millis
        .parse::<i64>()
        .ok()
        .and_then(DateTime::<Utc>::from_timestamp_millis)
        .map(|t| t.format("%Y-%m-%d %H:%M:%S%.3f UTC").to_string())
        .unwrap_or_else(|| millis.to_string())
}

/// Shorten a hex string for list views.
pub fn short_hex(hex: &str) -> &str {
    &hex[..hex.len().min(16)]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_timestamp() {
        assert_eq!(
            format_timestamp("1700000000000"),
            "2023-11-14 22:13:20.000 UTC"
        );
        assert_eq!(format_timestamp("not-a-time"), "not-a-time");
    }

    #[test]
    fn test_short_hex() {
        assert_eq!(short_hex("abcdef"), "abcdef");
        assert_eq!(short_hex(&"0".repeat(64)).len(), 16);
    }

    #[test]
    fn test_session_creates_genesis_once() {
        let dir = tempfile::tempdir().unwrap();
        CliConfig::default().save(dir.path()).unwrap();

        let session = Session::open(dir.path()).unwrap();
        let genesis = session.ledger.block(0).unwrap();
        session.close().unwrap();

        let session = Session::open(dir.path()).unwrap();
        assert_eq!(session.ledger.height(), 0);
        assert_eq!(session.ledger.block(0).unwrap(), genesis);
    }
}
