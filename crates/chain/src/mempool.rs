//! Pool of submitted transactions waiting to be mined.
//!
//! The pool keeps pending transactions in submission order together with
//! the identifiers already embedded in committed blocks. Which pending
//! transactions go into the next block is decided by a pluggable
//! [`SelectionStrategy`].

use crate::config::MAX_BATCH_SIZE;
use rand::seq::SliceRandom;
use rand::Rng;
use settlechain_core::{Block, Transaction, TransactionError};
use std::collections::{HashMap, HashSet, VecDeque};
use thiserror::Error;

/// Errors that can occur during mempool operations.
#[derive(Debug, Error)]
pub enum MempoolError {
    #[error("transaction {0} already submitted")]
    DuplicateTransaction(String),

    #[error("transaction rejected: {0}")]
    Rejected(#[from] TransactionError),

    #[error("storage error: {0}")]
    Storage(#[from] settlechain_storage::StorageError),
}

pub type Result<T> = std::result::Result<T, MempoolError>;

// =============================================================================
// Selection strategies
// =============================================================================

/// Chooses the batch of a mining round from the eligible transactions.
pub trait SelectionStrategy: Send + Sync {
    /// Pick a batch out of `eligible`, which is in submission order.
    fn select(&self, eligible: Vec<Transaction>) -> Vec<Transaction>;
}

/// Draws a size uniformly from `[1, max_batch]`, caps it at the number of
/// eligible transactions and picks that many at random.
///
/// `max_batch` is clamped to `[1, MAX_BATCH_SIZE]`.
#[derive(Debug, Clone)]
pub struct RandomSelection {
    max_batch: usize,
}

impl RandomSelection {
    pub fn new(max_batch: usize) -> Self {
        Self {
            max_batch: max_batch.clamp(1, MAX_BATCH_SIZE),
        }
    }
}

impl SelectionStrategy for RandomSelection {
    fn select(&self, eligible: Vec<Transaction>) -> Vec<Transaction> {
        if eligible.is_empty() {
            return eligible;
        }
        let mut rng = rand::thread_rng();
        let size = rng.gen_range(1..=self.max_batch).min(eligible.len());
        eligible.choose_multiple(&mut rng, size).cloned().collect()
    }
}

/// Takes the oldest `max_batch` transactions, with `max_batch` clamped to
/// `[1, MAX_BATCH_SIZE]`.
#[derive(Debug, Clone)]
pub struct FifoSelection {
    max_batch: usize,
}

impl FifoSelection {
    pub fn new(max_batch: usize) -> Self {
        Self {
            max_batch: max_batch.clamp(1, MAX_BATCH_SIZE),
        }
    }
}

impl SelectionStrategy for FifoSelection {
    fn select(&self, mut eligible: Vec<Transaction>) -> Vec<Transaction> {
        eligible.truncate(self.max_batch);
        eligible
    }
}

// =============================================================================
// Mempool
// =============================================================================

/// Pending transaction pool.
#[derive(Default)]
pub struct Mempool {
    /// Pending transactions indexed by identifier.
    transactions: HashMap<String, Transaction>,
    /// Pending identifiers in submission order.
    order: VecDeque<String>,
    /// Identifiers embedded in committed blocks.
    mined: HashSet<String>,
}

impl Mempool {
    /// Create an empty pool.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a pool from the committed chain and the transactions the
    /// store still lists as pending.
    pub fn restore(committed: &[Block], pending: Vec<Transaction>) -> Self {
        let mut pool = Self::new();
        for block in committed {
            pool.mark_mined(block);
        }
        for tx in pending {
            if let Err(e) = pool.add(tx) {
                tracing::warn!(error = %e, "skipping pending transaction while restoring");
            }
        }
        pool
    }

    /// Number of pending transactions.
    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    /// Check if a transaction is pending.
    pub fn contains(&self, identifier: &str) -> bool {
        self.transactions.contains_key(identifier)
    }

    /// Get a pending transaction.
    pub fn get(&self, identifier: &str) -> Option<&Transaction> {
        self.transactions.get(identifier)
    }

    /// Check that `tx` could be added without changing the pool.
    pub fn check_new(&self, tx: &Transaction) -> Result<()> {
        tx.validate_submission()?;
        if self.contains(&tx.identifier) || self.mined.contains(&tx.identifier) {
            return Err(MempoolError::DuplicateTransaction(tx.identifier.clone()));
        }
        Ok(())
    }

    /// Add a transaction to the pool.
    pub fn add(&mut self, tx: Transaction) -> Result<()> {
        self.check_new(&tx)?;
        self.order.push_back(tx.identifier.clone());
        self.transactions.insert(tx.identifier.clone(), tx);
        Ok(())
    }

    /// Choose the batch for `miner`'s next round.
    ///
    /// The pool itself is left unchanged; selected transactions stay pending
    /// until a block containing them commits. A committed transaction leaves
    /// the pool, so no miner can select it again.
    pub fn select_batch(&self, miner: &str, strategy: &dyn SelectionStrategy) -> Vec<Transaction> {
        let batch = strategy.select(self.get_all());
        tracing::debug!(
            miner,
            pending = self.len(),
            selected = batch.len(),
            "selected batch"
        );
        batch
    }

    /// Record a committed block: its transactions leave the pool and are
    /// remembered as mined.
    pub fn mark_mined(&mut self, block: &Block) {
        for tx in &block.transactions {
            if self.transactions.remove(&tx.identifier).is_some() {
                self.order.retain(|id| id != &tx.identifier);
            }
            self.mined.insert(tx.identifier.clone());
        }
    }

    /// Get all pending transactions in submission order.
    pub fn get_all(&self) -> Vec<Transaction> {
        self.order
            .iter()
            .filter_map(|id| self.transactions.get(id).cloned())
            .collect()
    }
}
