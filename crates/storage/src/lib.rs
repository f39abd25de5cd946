//! Persistent storage layer for settlechain.
//!
//! This crate provides the storage backends for the ledger:
//! - Block storage (by index) and chain tail tracking
//! - Submitted and mined transactions
//! - Mined records (which miner embedded which transaction)
//! - Miner accounts
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                    Mining Layer                          │
//! │        (MiningCoordinator, depends on LedgerStore)       │
//! └────────────────────────┬────────────────────────────────┘
//!                          │
//! ┌────────────────────────▼────────────────────────────────┐
//! │                   LedgerStore trait                      │
//! │  ┌─────────────────────────┐  ┌──────────────────────┐  │
//! │  │ SledStore               │  │ MemoryStore          │  │
//! │  │  - ChainStore (blocks)  │  │  - mutex-guarded     │  │
//! │  │  - Storage (sled + key  │  │    maps              │  │
//! │  │    helpers, batches)    │  │                      │  │
//! │  └─────────────────────────┘  └──────────────────────┘  │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use settlechain_core::Block;
//! use settlechain_storage::{LedgerStore, SledStore};
//!
//! let store = SledStore::open("./ledger_data").unwrap();
//! if store.blocks().unwrap().is_empty() {
//!     store.init_genesis(&Block::genesis(3.125, 4)).unwrap();
//! }
//! ```

pub mod chain;
pub mod db;
pub mod ledger;
pub mod memory;

#[cfg(test)]
mod testing;

// Re-export commonly used types
pub use chain::ChainStore;
pub use db::{BatchOp, Result, Storage, StorageError};
pub use ledger::{LedgerStore, SledStore, StoredTransaction};
pub use memory::MemoryStore;
