//! In-memory [`LedgerStore`] implementation.

use crate::db::{Result, StorageError};
use crate::ledger::{LedgerStore, StoredTransaction};
use parking_lot::Mutex;
use settlechain_core::{Block, MinedRecord, MinerAccount, Transaction};
use std::collections::{BTreeMap, HashMap};

#[derive(Default)]
struct MemoryState {
    blocks: Vec<Block>,
    /// Transactions keyed by identifier, which also orders the pending set.
    transactions: BTreeMap<String, StoredTransaction>,
    /// Mined records keyed by (transaction id, miner).
    mined: HashMap<(String, String), MinedRecord>,
    miners: BTreeMap<String, MinerAccount>,
}

/// A [`LedgerStore`] that keeps everything in process memory.
///
/// Each operation runs under a single lock, so commits are atomic with
/// respect to every other call.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LedgerStore for MemoryStore {
    fn init_genesis(&self, genesis: &Block) -> Result<()> {
        if genesis.index != 0 {
            return Err(StorageError::InvalidGenesis(
                "Genesis block must have index 0".into(),
            ));
        }
        let mut state = self.state.lock();
        if !state.blocks.is_empty() {
            return Err(StorageError::InvalidGenesis(
                "Chain already initialized".into(),
            ));
        }
        state.blocks.push(genesis.clone());
        Ok(())
    }

    fn insert_transaction(&self, tx: &Transaction) -> Result<()> {
        let mut state = self.state.lock();
        if state.transactions.contains_key(&tx.identifier) {
            return Err(StorageError::DuplicateTransaction(tx.identifier.clone()));
        }
        state.transactions.insert(
            tx.identifier.clone(),
            StoredTransaction {
                transaction: tx.clone(),
                block_index: None,
            },
        );
        Ok(())
    }

    fn pending_transactions(&self, excluding_miner: Option<&str>) -> Result<Vec<Transaction>> {
        let state = self.state.lock();
        Ok(state
            .transactions
            .values()
            .filter(|stored| stored.is_pending())
            .filter(|stored| match excluding_miner {
                Some(miner) => !state.mined.contains_key(&(
                    stored.transaction.identifier.clone(),
                    miner.to_string(),
                )),
                None => true,
            })
            .map(|stored| stored.transaction.clone())
            .collect())
    }

    fn transaction(&self, identifier: &str) -> Result<Option<StoredTransaction>> {
        Ok(self.state.lock().transactions.get(identifier).cloned())
    }

    fn commit_block(&self, block: &Block) -> Result<MinerAccount> {
        let mut state = self.state.lock();

        let tail = state
            .blocks
            .last()
            .ok_or_else(|| StorageError::InvalidGenesis("Chain not initialized".into()))?;
        let expected = tail.index + 1;
        if block.index != expected {
            return Err(StorageError::IndexMismatch {
                expected,
                got: block.index,
            });
        }
        if block.previous_hash != tail.hash {
            return Err(StorageError::PreviousHashMismatch { index: block.index });
        }

        let records = block.mined_records();
        for record in &records {
            let key = (record.transaction_id.clone(), record.miner.clone());
            if state.mined.contains_key(&key) {
                return Err(StorageError::DuplicateMinedRecord {
                    transaction_id: record.transaction_id.clone(),
                    miner: record.miner.clone(),
                });
            }
        }

        // Every check has passed; from here on the commit cannot fail.
        state.blocks.push(block.clone());
        for tx in &block.transactions {
            state.transactions.insert(
                tx.identifier.clone(),
                StoredTransaction {
                    transaction: tx.clone(),
                    block_index: Some(block.index),
                },
            );
        }
        for record in records {
            state
                .mined
                .insert((record.transaction_id.clone(), record.miner.clone()), record);
        }

        let delta = block.miner_delta();
        let account = state
            .miners
            .entry(block.miner.clone())
            .and_modify(|account| account.accumulate(&delta))
            .or_insert_with(|| MinerAccount::new(block.miner.clone(), &delta))
            .clone();
        Ok(account)
    }

    fn blocks(&self) -> Result<Vec<Block>> {
        Ok(self.state.lock().blocks.clone())
    }

    fn miner_account(&self, address: &str) -> Result<Option<MinerAccount>> {
        Ok(self.state.lock().miners.get(address).cloned())
    }

    fn miner_accounts(&self) -> Result<Vec<MinerAccount>> {
        Ok(self.state.lock().miners.values().cloned().collect())
    }

    fn mined_records(&self, miner: &str) -> Result<Vec<MinedRecord>> {
        let state = self.state.lock();
        let mut records: Vec<MinedRecord> = state
            .mined
            .values()
            .filter(|r| r.miner == miner)
            .cloned()
            .collect();
        records.sort_by(|a, b| a.transaction_id.cmp(&b.transaction_id));
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{mined_block, submitted};

    fn setup() -> (MemoryStore, Block) {
        let store = MemoryStore::new();
        let genesis = Block::genesis(3.125, 0);
        store.init_genesis(&genesis).unwrap();
        (store, genesis)
    }

    #[test]
    fn test_genesis_only_once() {
        let (store, genesis) = setup();
        assert!(matches!(
            store.init_genesis(&genesis),
            Err(StorageError::InvalidGenesis(_))
        ));
        assert_eq!(store.blocks().unwrap(), vec![genesis]);
    }

    #[test]
    fn test_commit_moves_transactions_out_of_pending() {
        let (store, genesis) = setup();
        let tx1 = submitted("ord-1");
        let tx2 = submitted("ord-2");
        store.insert_transaction(&tx1).unwrap();
        store.insert_transaction(&tx2).unwrap();

        let block = mined_block(&genesis, "miner-a", vec![tx2.clone()]);
        let account = store.commit_block(&block).unwrap();

        assert_eq!(account.total_mined_transactions, 1);
        assert_eq!(store.pending_transactions(None).unwrap(), vec![tx1]);
        assert_eq!(
            store.transaction(&tx2.identifier).unwrap().unwrap().block_index,
            Some(1)
        );
        assert_eq!(store.mined_records("miner-a").unwrap().len(), 2);
        assert!(store.mined_records("miner-b").unwrap().is_empty());
    }

    #[test]
    fn test_commit_rejects_wrong_index() {
        let (store, genesis) = setup();
        let mut block = mined_block(&genesis, "miner-a", vec![submitted("ord-1")]);
        block.index = 4;

        assert!(matches!(
            store.commit_block(&block),
            Err(StorageError::IndexMismatch {
                expected: 1,
                got: 4
            })
        ));
        assert!(store.miner_accounts().unwrap().is_empty());
    }

    #[test]
    fn test_duplicate_record_leaves_state_untouched() {
        let (store, genesis) = setup();
        let tx = submitted("ord-1");

        let block1 = mined_block(&genesis, "miner-a", vec![tx.clone()]);
        store.commit_block(&block1).unwrap();
        let before = store.miner_account("miner-a").unwrap();

        let block2 = mined_block(&block1, "miner-a", vec![tx]);
        assert!(store.commit_block(&block2).is_err());
        assert_eq!(store.blocks().unwrap().len(), 2);
        assert_eq!(store.miner_account("miner-a").unwrap(), before);
    }
}
