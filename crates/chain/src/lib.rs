//! Ledger orchestration for settlechain.
//!
//! This crate turns the building blocks of the other crates into a working
//! ledger:
//! - **Chain**: the in-memory block sequence and its validity check
//! - **Mempool**: pending transactions and batch selection
//! - **Miner ledger**: cumulative per-miner totals
//! - **Coordinator**: the select, validate, seal and commit mining round
//!
//! # Example
//!
//! ```rust,no_run
//! use settlechain_chain::{LedgerConfig, MiningCoordinator};
//! use settlechain_core::{Payload, TransactionKind};
//! use settlechain_settlement::HttpSettlementClient;
//! use settlechain_storage::SledStore;
//! use std::sync::Arc;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(SledStore::open("./ledger_data")?);
//! let validator = Arc::new(HttpSettlementClient::new("http://safeblockcom.test")?);
//! let ledger = MiningCoordinator::open(store, validator, LedgerConfig::default())?;
//!
//! let payload = Payload::from_json_str(r#"{"orderId":"ord-42"}"#)?;
//! ledger.submit_transaction(
//!     TransactionKind::Transfer,
//!     Some("alice".into()),
//!     "shop".into(),
//!     25.0,
//!     payload,
//! )?;
//!
//! let outcome = ledger.mine_next_block("miner-1").await?;
//! println!("mined: {}", outcome.is_mined());
//! # Ok(())
//! # }
//! ```

pub mod blockchain;
pub mod config;
pub mod coordinator;
pub mod mempool;
pub mod miner;

// Re-export commonly used types
pub use blockchain::{Chain, ChainError, ChainFault, FaultKind};
pub use config::{ConfigError, LedgerConfig, SelectionPolicy, MAX_BATCH_SIZE, MAX_DIFFICULTY};
pub use coordinator::{LedgerStats, MiningCoordinator, MiningError, MiningOutcome};
pub use mempool::{FifoSelection, Mempool, MempoolError, RandomSelection, SelectionStrategy};
pub use miner::MinerLedger;
