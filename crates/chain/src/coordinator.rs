//! Mining round orchestration.
//!
//! A round moves through four stages:
//!
//! 1. **Selecting**: pick a batch from the pending pool.
//! 2. **Validating**: confirm each candidate with the settlement validator,
//!    concurrently and with a bounded wait. Rejected candidates stay pending.
//! 3. **Sealing**: append the reward transaction and search for a nonce on a
//!    blocking thread, holding no lock that readers need. Dropping the round
//!    future stops the search.
//! 4. **Committing**: persist the block, its transactions, their mined
//!    records and the miner's totals in one atomic write, then update the
//!    in-memory chain, pool and miner ledger.
//!
//! Rounds are serialized by a round lock, so two miners never race to
//! extend the same tail. Reads (validity, balances, stats) only take the
//! chain's read lock and proceed while a round is sealing.

use crate::blockchain::{Chain, ChainError, ChainFault};
use crate::config::{ConfigError, LedgerConfig};
use crate::mempool::{Mempool, MempoolError, SelectionStrategy};
use crate::miner::MinerLedger;
use futures::future::join_all;
use parking_lot::{Mutex, RwLock};
use settlechain_core::{Block, Hash, MinerAccount, Payload, Transaction, TransactionKind};
use settlechain_settlement::{check_transaction, SettlementValidator};
use settlechain_storage::{LedgerStore, StorageError, StoredTransaction};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors that can end a mining round or prevent the ledger from opening.
#[derive(Debug, Error)]
pub enum MiningError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("chain error: {0}")]
    Chain(#[from] ChainError),

    #[error("sealing task failed: {0}")]
    Sealing(String),

    #[error("sealing was cancelled")]
    Cancelled,

    #[error("miner address must not be empty")]
    EmptyMiner,
}

pub type Result<T> = std::result::Result<T, MiningError>;

/// Result of a mining round that did not fail.
#[derive(Debug, Clone, PartialEq)]
pub enum MiningOutcome {
    /// A block was sealed and committed.
    Mined(Block),
    /// Nothing was pending, or no candidate passed validation.
    Empty,
}

impl MiningOutcome {
    pub fn block(&self) -> Option<&Block> {
        match self {
            MiningOutcome::Mined(block) => Some(block),
            MiningOutcome::Empty => None,
        }
    }

    pub fn is_mined(&self) -> bool {
        matches!(self, MiningOutcome::Mined(_))
    }
}

/// Ledger statistics.
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerStats {
    /// Index of the tail block.
    pub height: u64,
    /// Hash of the tail block.
    pub tail_hash: Hash,
    /// Transactions waiting to be mined.
    pub pending_transactions: usize,
    /// Miners with at least one committed block.
    pub miners: usize,
    /// Whether the chain currently passes validation.
    pub valid: bool,
}

/// Raises its flag when dropped, which ends a nonce search on another thread.
struct CancelOnDrop(Arc<AtomicBool>);

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        self.0.store(true, Ordering::Relaxed);
    }
}

/// Owns the ledger state and runs mining rounds against it.
pub struct MiningCoordinator {
    config: LedgerConfig,
    store: Arc<dyn LedgerStore>,
    validator: Arc<dyn SettlementValidator>,
    strategy: Box<dyn SelectionStrategy>,
    chain: RwLock<Chain>,
    pool: Mutex<Mempool>,
    miners: Mutex<MinerLedger>,
    round: tokio::sync::Mutex<()>,
}

impl MiningCoordinator {
    /// Open the ledger held by `store`.
    ///
    /// An empty store gets a genesis block built from `config`; otherwise the
    /// chain, the pending pool and the miner ledger are loaded from it.
    pub fn open(
        store: Arc<dyn LedgerStore>,
        validator: Arc<dyn SettlementValidator>,
        config: LedgerConfig,
    ) -> Result<Self> {
        config.validate()?;

        let blocks = store.blocks()?;
        let chain = if blocks.is_empty() {
            let genesis = Block::genesis(config.mining_reward, config.difficulty);
            store.init_genesis(&genesis)?;
            info!(hash = %genesis.hash, "created genesis block");
            Chain::new(genesis)
        } else {
            Chain::from_blocks(blocks)?
        };

        let pool = Mempool::restore(chain.blocks(), store.pending_transactions(None)?);
        let miners = MinerLedger::from_accounts(store.miner_accounts()?);

        info!(
            height = chain.height(),
            pending = pool.len(),
            miners = miners.len(),
            "ledger opened"
        );

        Ok(Self {
            strategy: config.selection_strategy(),
            config,
            store,
            validator,
            chain: RwLock::new(chain),
            pool: Mutex::new(pool),
            miners: Mutex::new(miners),
            round: tokio::sync::Mutex::new(()),
        })
    }

    /// Replace the selection strategy derived from the configuration.
    pub fn with_strategy(mut self, strategy: Box<dyn SelectionStrategy>) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    // =========================================================================
    // Submission
    // =========================================================================

    /// Create a transaction, persist it as pending and add it to the pool.
    ///
    /// Returns the new transaction's identifier.
    pub fn submit_transaction(
        &self,
        kind: TransactionKind,
        sender: Option<String>,
        recipient: String,
        amount: f64,
        payload: Payload,
    ) -> std::result::Result<String, MempoolError> {
        let tx = Transaction::new(kind, sender, recipient, amount, payload);

        let mut pool = self.pool.lock();
        pool.check_new(&tx)?;
        self.store.insert_transaction(&tx)?;

        let identifier = tx.identifier.clone();
        info!(transaction = %identifier, kind = %tx.kind, amount = tx.amount, "transaction submitted");
        pool.add(tx)?;
        Ok(identifier)
    }

    // =========================================================================
    // Mining
    // =========================================================================

    /// Run one mining round on behalf of `miner`.
    ///
    /// Returns [`MiningOutcome::Empty`] without writing anything when no
    /// candidate survives selection and validation. On error nothing has
    /// been committed and every candidate is still pending. The same holds
    /// when the returned future is dropped before it completes.
    pub async fn mine_next_block(&self, miner: &str) -> Result<MiningOutcome> {
        if miner.trim().is_empty() {
            return Err(MiningError::EmptyMiner);
        }
        let _round = self.round.lock().await;

        let batch = self.pool.lock().select_batch(miner, self.strategy.as_ref());
        if batch.is_empty() {
            info!(miner, "no pending transactions to mine");
            return Ok(MiningOutcome::Empty);
        }

        let selected = batch.len();
        let mut transactions = self.validate_batch(batch).await;
        if transactions.is_empty() {
            info!(miner, selected, "no candidate passed settlement validation");
            return Ok(MiningOutcome::Empty);
        }
        let validated = transactions.len();
        transactions.push(Transaction::reward(miner, self.config.mining_reward));

        let (index, previous_hash) = {
            let chain = self.chain.read();
            (chain.height() + 1, chain.tail_hash())
        };
        let mut candidate = Block::new(
            index,
            previous_hash,
            miner,
            transactions,
            self.config.mining_reward,
            self.config.difficulty,
        );
        let cancel = Arc::new(AtomicBool::new(false));
        let _guard = CancelOnDrop(Arc::clone(&cancel));
        let (block, sealed) = tokio::task::spawn_blocking(move || {
            let sealed = candidate.seal_until(&cancel);
            (candidate, sealed)
        })
        .await
        .map_err(|e| MiningError::Sealing(e.to_string()))?;
        if !sealed {
            return Err(MiningError::Cancelled);
        }

        self.commit(&block)?;

        info!(
            miner,
            index = block.index,
            nonce = block.nonce,
            hash = %block.hash,
            selected,
            validated,
            "block mined"
        );
        Ok(MiningOutcome::Mined(block))
    }

    /// Check every candidate concurrently; keep the confirmed ones in batch order.
    async fn validate_batch(&self, batch: Vec<Transaction>) -> Vec<Transaction> {
        let timeout = self.config.validation_timeout();
        let checks = batch
            .iter()
            .map(|tx| check_transaction(self.validator.as_ref(), tx, timeout));
        let results = join_all(checks).await;

        batch
            .into_iter()
            .zip(results)
            .filter_map(|(tx, result)| match result {
                Ok(()) => Some(tx),
                Err(e) => {
                    warn!(transaction = %tx.identifier, error = %e, "transaction left pending");
                    None
                }
            })
            .collect()
    }

    /// Persist `block`, then apply it to the in-memory state.
    ///
    /// Holding the chain's write lock across the store write keeps readers
    /// from seeing a chain that disagrees with the store.
    fn commit(&self, block: &Block) -> Result<()> {
        let mut chain = self.chain.write();
        chain.check_append(block)?;

        let stored = self.store.commit_block(block)?;

        chain.append(block.clone())?;
        self.pool.lock().mark_mined(block);
        let mut miners = self.miners.lock();
        let account = miners.register_or_accumulate(&block.miner, &block.miner_delta());
        if account != &stored {
            warn!(miner = %block.miner, "in-memory miner totals differ from the store");
        }
        debug!(
            miner = %account.address,
            total_nonce = account.total_nonce,
            total_mined = account.total_mined_transactions,
            total_reward = account.total_reward,
            "miner ledger updated"
        );
        Ok(())
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Check whether every block after genesis is intact and linked.
    pub fn is_chain_valid(&self) -> bool {
        self.chain.read().is_valid()
    }

    /// The first invalid block, if any.
    pub fn first_fault(&self) -> Option<ChainFault> {
        self.chain.read().first_fault()
    }

    /// Net balance of `address` over the committed chain.
    pub fn balance_of(&self, address: &str) -> f64 {
        self.chain.read().balance_of(address)
    }

    /// Index of the tail block.
    pub fn height(&self) -> u64 {
        self.chain.read().height()
    }

    pub fn block(&self, index: u64) -> Option<Block> {
        self.chain.read().get(index).cloned()
    }

    /// Snapshot of the whole chain.
    pub fn blocks(&self) -> Vec<Block> {
        self.chain.read().blocks().to_vec()
    }

    /// Pending transactions in submission order.
    pub fn pending_transactions(&self) -> Vec<Transaction> {
        self.pool.lock().get_all()
    }

    /// Look a transaction up in the store, pending or committed.
    pub fn transaction(&self, identifier: &str) -> Result<Option<StoredTransaction>> {
        Ok(self.store.transaction(identifier)?)
    }

    pub fn miner_account(&self, address: &str) -> Option<MinerAccount> {
        self.miners.lock().get(address).cloned()
    }

    pub fn miner_accounts(&self) -> Vec<MinerAccount> {
        self.miners.lock().accounts()
    }

    /// Get ledger statistics.
    pub fn stats(&self) -> LedgerStats {
        let (height, tail_hash, valid) = {
            let chain = self.chain.read();
            (chain.height(), chain.tail_hash(), chain.is_valid())
        };
        LedgerStats {
            height,
            tail_hash,
            pending_transactions: self.pool.lock().len(),
            miners: self.miners.lock().len(),
            valid,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mempool::FifoSelection;
    use async_trait::async_trait;
    use serde_json::json;
    use settlechain_settlement::Settlement;
    use settlechain_storage::MemoryStore;
    use std::collections::HashSet;

    /// Approves exactly the listed order ids.
    struct ApproveList(HashSet<String>);

    #[async_trait]
    impl SettlementValidator for ApproveList {
        async fn check_settlement(
            &self,
            reference_id: &str,
        ) -> settlechain_settlement::Result<Settlement> {
            Ok(if self.0.contains(reference_id) {
                Settlement::succeeded()
            } else {
                Settlement::failed("processing")
            })
        }
    }

    fn coordinator(approved: &[&str]) -> MiningCoordinator {
        let validator = ApproveList(approved.iter().map(|s| s.to_string()).collect());
        let config = LedgerConfig {
            difficulty: 1,
            ..LedgerConfig::default()
        };
        MiningCoordinator::open(Arc::new(MemoryStore::new()), Arc::new(validator), config)
            .unwrap()
            .with_strategy(Box::new(FifoSelection::new(20)))
    }

    fn submit(coordinator: &MiningCoordinator, order_id: &str) -> String {
        coordinator
            .submit_transaction(
                TransactionKind::Transfer,
                Some("alice".into()),
                "shop".into(),
                10.0,
                Payload::new(&json!({ "orderId": order_id })),
            )
            .unwrap()
    }

    #[test]
    fn test_open_creates_genesis() {
        let coordinator = coordinator(&[]);
        let genesis = coordinator.block(0).unwrap();
        assert_eq!(genesis.miner, "genesis");
        assert_eq!(genesis.previous_hash, Hash::ZERO);
        assert_eq!(coordinator.height(), 0);
        assert!(coordinator.is_chain_valid());
    }

    #[test]
    fn test_open_rejects_bad_config() {
        let config = LedgerConfig {
            max_batch_size: 0,
            ..LedgerConfig::default()
        };
        let result = MiningCoordinator::open(
            Arc::new(MemoryStore::new()),
            Arc::new(ApproveList(HashSet::new())),
            config,
        );
        assert!(matches!(result, Err(MiningError::Config(_))));
    }

    #[test]
    fn test_submit_adds_pending() {
        let coordinator = coordinator(&[]);
        let id = submit(&coordinator, "ord-1");
        assert!(id.starts_with("TX-"));
        assert_eq!(coordinator.pending_transactions().len(), 1);
        assert!(coordinator.transaction(&id).unwrap().unwrap().is_pending());
    }

    #[test]
    fn test_submit_rejects_negative_amount() {
        let coordinator = coordinator(&[]);
        let result = coordinator.submit_transaction(
            TransactionKind::Transfer,
            None,
            "shop".into(),
            -1.0,
            Payload::empty(),
        );
        assert!(matches!(result, Err(MempoolError::Rejected(_))));
        assert!(coordinator.pending_transactions().is_empty());
    }

    #[tokio::test]
    async fn test_mine_with_partial_approval() {
        let coordinator = coordinator(&["ord-1", "ord-3"]);
        let id1 = submit(&coordinator, "ord-1");
        let id2 = submit(&coordinator, "ord-2");
        let id3 = submit(&coordinator, "ord-3");

        let outcome = coordinator.mine_next_block("miner-a").await.unwrap();
        let block = outcome.block().unwrap();

        let ids: Vec<_> = block.transactions.iter().map(|tx| tx.identifier.clone()).collect();
        assert_eq!(ids.len(), 3);
        assert_eq!(&ids[..2], &[id1, id3]);
        assert!(block.transactions[2].is_reward());
        assert!(block.meets_difficulty());

        let pending = coordinator.pending_transactions();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].identifier, id2);

        let account = coordinator.miner_account("miner-a").unwrap();
        assert_eq!(account.total_mined_transactions, 2);
        assert_eq!(account.total_reward, 3.125);
        assert_eq!(account.total_nonce, block.nonce);
    }

    #[tokio::test]
    async fn test_mine_empty_pool() {
        let coordinator = coordinator(&[]);
        let outcome = coordinator.mine_next_block("miner-a").await.unwrap();
        assert_eq!(outcome, MiningOutcome::Empty);
        assert_eq!(coordinator.height(), 0);
        assert!(coordinator.miner_account("miner-a").is_none());
    }

    #[tokio::test]
    async fn test_mine_rejects_empty_miner() {
        let coordinator = coordinator(&[]);
        assert!(matches!(
            coordinator.mine_next_block("  ").await,
            Err(MiningError::EmptyMiner)
        ));
    }

    #[tokio::test]
    async fn test_stats() {
        let coordinator = coordinator(&["ord-1"]);
        submit(&coordinator, "ord-1");
        submit(&coordinator, "ord-2");
        coordinator.mine_next_block("miner-a").await.unwrap();

        let stats = coordinator.stats();
        assert_eq!(stats.height, 1);
        assert_eq!(stats.pending_transactions, 1);
        assert_eq!(stats.miners, 1);
        assert!(stats.valid);
        assert_eq!(stats.tail_hash, coordinator.block(1).unwrap().hash);
    }
}
