//! The ledger persistence boundary and its sled-backed implementation.

use crate::chain::ChainStore;
use crate::db::{BatchOp, Result, Storage, StorageError, MINER_PREFIX, PENDING_PREFIX};
use serde::{Deserialize, Serialize};
use settlechain_core::{Block, MinedRecord, MinerAccount, Transaction};
use std::path::Path;

/// A transaction as persisted, with the block that embeds it (if any).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredTransaction {
    pub transaction: Transaction,
    /// Index of the embedding block; None while pending.
    pub block_index: Option<u64>,
}

impl StoredTransaction {
    pub fn is_pending(&self) -> bool {
        self.block_index.is_none()
    }
}

/// Durable storage of blocks, transactions, mined records and miner accounts.
///
/// The mining code depends on this trait only, so any backend honoring the
/// contract can stand in for sled.
pub trait LedgerStore: Send + Sync {
    /// Persist the genesis block of an empty store.
    fn init_genesis(&self, genesis: &Block) -> Result<()>;

    /// Persist a submitted transaction as pending (no block).
    fn insert_transaction(&self, tx: &Transaction) -> Result<()>;

    /// Pending transactions ordered by identifier, skipping those already
    /// recorded as mined by `excluding_miner`.
    fn pending_transactions(&self, excluding_miner: Option<&str>) -> Result<Vec<Transaction>>;

    /// Look up a transaction by identifier.
    fn transaction(&self, identifier: &str) -> Result<Option<StoredTransaction>>;

    /// Commit a sealed block in a single atomic write.
    ///
    /// Stores the block and each embedded transaction (bound to the block and
    /// no longer pending), records one mined record per embedded transaction
    /// for the block's miner, and folds the block into the miner's account.
    /// Returns the updated account. On error nothing is written.
    fn commit_block(&self, block: &Block) -> Result<MinerAccount>;

    /// Every stored block ordered by index.
    fn blocks(&self) -> Result<Vec<Block>>;

    /// The account of `address`, if it has mined before.
    fn miner_account(&self, address: &str) -> Result<Option<MinerAccount>>;

    /// Every miner account.
    fn miner_accounts(&self) -> Result<Vec<MinerAccount>>;

    /// Mined records of `miner`.
    fn mined_records(&self, miner: &str) -> Result<Vec<MinedRecord>>;
}

/// [`LedgerStore`] backed by a sled database.
pub struct SledStore {
    storage: Storage,
}

impl SledStore {
    /// Open (or create) a store at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self {
            storage: Storage::open(path)?,
        })
    }

    /// Open an in-memory sled store (for testing).
    pub fn open_temporary() -> Result<Self> {
        Ok(Self {
            storage: Storage::open_temporary()?,
        })
    }

    /// Flush all pending writes to disk.
    pub fn flush(&self) -> Result<()> {
        self.storage.flush()
    }

    fn chain(&self) -> ChainStore<'_> {
        ChainStore::new(&self.storage)
    }
}

impl LedgerStore for SledStore {
    fn init_genesis(&self, genesis: &Block) -> Result<()> {
        self.chain().init_genesis(genesis)?;
        tracing::info!(hash = %genesis.hash, "genesis block stored");
        Ok(())
    }

    fn insert_transaction(&self, tx: &Transaction) -> Result<()> {
        let key = Storage::transaction_key(&tx.identifier);
        if self.storage.contains(&key)? {
            return Err(StorageError::DuplicateTransaction(tx.identifier.clone()));
        }

        let stored = StoredTransaction {
            transaction: tx.clone(),
            block_index: None,
        };
        self.storage.batch(vec![
            BatchOp::put(key, &stored)?,
            BatchOp::put(Storage::pending_key(&tx.identifier), &())?,
        ])
    }

    fn pending_transactions(&self, excluding_miner: Option<&str>) -> Result<Vec<Transaction>> {
        let mut pending = Vec::new();
        for id in self.storage.scan_key_suffixes(PENDING_PREFIX.as_bytes())? {
            if let Some(miner) = excluding_miner {
                if self.storage.contains(Storage::mined_key(&id, miner))? {
                    continue;
                }
            }
            let stored: StoredTransaction =
                self.storage.get_or_err(Storage::transaction_key(&id))?;
            pending.push(stored.transaction);
        }
        Ok(pending)
    }

    fn transaction(&self, identifier: &str) -> Result<Option<StoredTransaction>> {
        self.storage.get(Storage::transaction_key(identifier))
    }

    fn commit_block(&self, block: &Block) -> Result<MinerAccount> {
        let chain = self.chain();
        chain.check_extends(block)?;

        let mut ops = ChainStore::block_ops(block)?;

        for tx in &block.transactions {
            let stored = StoredTransaction {
                transaction: tx.clone(),
                block_index: Some(block.index),
            };
            ops.push(BatchOp::put(Storage::transaction_key(&tx.identifier), &stored)?);
            ops.push(BatchOp::Remove {
                key: Storage::pending_key(&tx.identifier),
            });
        }

        for record in block.mined_records() {
            let key = Storage::mined_key(&record.transaction_id, &record.miner);
            if self.storage.contains(&key)? {
                return Err(StorageError::DuplicateMinedRecord {
                    transaction_id: record.transaction_id,
                    miner: record.miner,
                });
            }
            ops.push(BatchOp::put(key, &record)?);
        }

        let delta = block.miner_delta();
        let account = match self.miner_account(&block.miner)? {
            Some(mut account) => {
                account.accumulate(&delta);
                account
            }
            None => MinerAccount::new(block.miner.clone(), &delta),
        };
        ops.push(BatchOp::put(Storage::miner_key(&block.miner), &account)?);

        self.storage.batch(ops)?;

        tracing::debug!(
            index = block.index,
            miner = %block.miner,
            transactions = block.tx_count(),
            "block committed to sled"
        );
        Ok(account)
    }

    fn blocks(&self) -> Result<Vec<Block>> {
        self.chain().get_blocks()
    }

    fn miner_account(&self, address: &str) -> Result<Option<MinerAccount>> {
        self.storage.get(Storage::miner_key(address))
    }

    fn miner_accounts(&self) -> Result<Vec<MinerAccount>> {
        self.storage.scan_values(MINER_PREFIX.as_bytes())
    }

    fn mined_records(&self, miner: &str) -> Result<Vec<MinedRecord>> {
        let records: Vec<MinedRecord> = self
            .storage
            .scan_values(Storage::mined_prefix(miner).as_bytes())?;
        // Addresses containing ':' can share a prefix with other miners.
        Ok(records.into_iter().filter(|r| r.miner == miner).collect())
    }
}
