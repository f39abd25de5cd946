//! Core ledger primitives for settlechain.
//!
//! This crate provides the fundamental types used throughout the ledger:
//! - Hashing (Blake3) and the canonical block digest
//! - Transactions and their opaque payloads
//! - Blocks and proof-of-work sealing
//! - Miner bookkeeping records

pub mod account;
pub mod block;
pub mod hash;
pub mod transaction;

// Re-export commonly used types at the crate root
pub use account::{MinedRecord, MinerAccount, MinerDelta};
pub use block::{Block, GENESIS_MINER};
pub use hash::{digest, hash, Hash, H256};
pub use transaction::{Payload, Transaction, TransactionError, TransactionKind};
