//! Blocks and proof-of-work sealing.

use crate::account::{MinedRecord, MinerDelta};
use crate::hash::{digest, Hash};
use crate::transaction::Transaction;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Miner identifier recorded on the genesis block.
pub const GENESIS_MINER: &str = "genesis";

/// Nonces tried between two looks at the cancel flag.
const CANCEL_CHECK_INTERVAL: u64 = 1024;

/// A block of transactions sealed with a proof-of-work nonce.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    /// Position in the chain (0 for genesis).
    pub index: u64,
    /// Creation time in Unix milliseconds, rendered as a string.
    pub timestamp: String,
    /// Address of the miner that sealed the block.
    pub miner: String,
    /// Transactions in seal order; the reward transaction comes last.
    pub transactions: Vec<Transaction>,
    /// Hash of the chain tail when this block was built.
    pub previous_hash: Hash,
    /// Reward credited to `miner`.
    pub reward: f64,
    /// Required number of leading zero hex digits in `hash`.
    pub difficulty: u32,
    /// Proof-of-work nonce.
    pub nonce: u64,
    /// Digest of the hashed fields at the current nonce.
    pub hash: Hash,
}

impl Block {
    /// Create a new unsealed block (nonce 0, hash computed at nonce 0).
    pub fn new(
        index: u64,
        previous_hash: Hash,
        miner: impl Into<String>,
        transactions: Vec<Transaction>,
        reward: f64,
        difficulty: u32,
    ) -> Self {
        let mut block = Self {
            index,
            timestamp: Self::current_timestamp(),
            miner: miner.into(),
            transactions,
            previous_hash,
            reward,
            difficulty,
            nonce: 0,
            hash: Hash::ZERO,
        };
        block.hash = block.compute_hash();
        block
    }

    /// Create the genesis block.
    pub fn genesis(reward: f64, difficulty: u32) -> Self {
        Self::new(0, Hash::ZERO, GENESIS_MINER, Vec::new(), reward, difficulty)
    }

    /// Get the current Unix timestamp in milliseconds.
    pub fn current_timestamp() -> String {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or_default()
            .to_string()
    }

    /// Recompute the digest from the block's fields.
    pub fn compute_hash(&self) -> Hash {
        digest(
            self.index,
            &self.previous_hash,
            &self.timestamp,
            &self.miner,
            &self.transactions,
            self.nonce,
        )
    }

    /// Search for a nonce whose hash meets the block's difficulty.
    ///
    /// The search always restarts from nonce 0, so sealing the same fields
    /// twice lands on the same nonce. Expected cost grows as 16^difficulty.
    pub fn seal(&mut self) {
        self.seal_until(&AtomicBool::new(false));
    }

    /// Like [`Block::seal`], but gives up once `cancel` is set.
    ///
    /// Returns `false` when the search was cancelled, leaving the block
    /// unsealed.
    pub fn seal_until(&mut self, cancel: &AtomicBool) -> bool {
        self.nonce = 0;
        self.hash = self.compute_hash();
        while !self.hash.meets_difficulty(self.difficulty) {
            if self.nonce % CANCEL_CHECK_INTERVAL == 0 && cancel.load(Ordering::Relaxed) {
                tracing::debug!(index = self.index, nonce = self.nonce, "sealing cancelled");
                return false;
            }
            self.nonce += 1;
            self.hash = self.compute_hash();
        }
        tracing::debug!(
            index = self.index,
            nonce = self.nonce,
            hash = %self.hash,
            "block sealed"
        );
        true
    }

    /// Create a sealed block.
    pub fn sealed(mut self) -> Self {
        self.seal();
        self
    }

    /// Check that `hash` is the digest of the current fields.
    pub fn verify_hash(&self) -> bool {
        self.hash == self.compute_hash()
    }

    /// Check that `hash` satisfies the block's difficulty.
    pub fn meets_difficulty(&self) -> bool {
        self.hash.meets_difficulty(self.difficulty)
    }

    /// Check if this is the genesis block.
    pub fn is_genesis(&self) -> bool {
        self.index == 0 && self.previous_hash == Hash::ZERO
    }

    /// Get the number of transactions in this block.
    pub fn tx_count(&self) -> usize {
        self.transactions.len()
    }

    /// Number of non-reward transactions in this block.
    pub fn mined_transaction_count(&self) -> usize {
        self.transactions.iter().filter(|tx| !tx.is_reward()).count()
    }

    /// The reward transaction, if the block carries one.
    pub fn reward_transaction(&self) -> Option<&Transaction> {
        self.transactions.last().filter(|tx| tx.is_reward())
    }

    /// This block's contribution to its miner's running totals.
    pub fn miner_delta(&self) -> MinerDelta {
        MinerDelta {
            nonce: self.nonce,
            mined_transactions: self.mined_transaction_count() as u64,
            reward: self.reward,
        }
    }

    /// One mined record per embedded transaction, keyed to the block's miner.
    pub fn mined_records(&self) -> Vec<MinedRecord> {
        self.transactions
            .iter()
            .map(|tx| MinedRecord {
                transaction_id: tx.identifier.clone(),
                block_index: self.index,
                miner: self.miner.clone(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transaction::{Payload, TransactionKind};

    fn transfer(amount: f64) -> Transaction {
        Transaction::new(
            TransactionKind::Transfer,
            Some("alice".into()),
            "bob".into(),
            amount,
            Payload::empty(),
        )
    }

    fn block_with(transactions: Vec<Transaction>, difficulty: u32) -> Block {
        Block::new(1, Hash::ZERO, "miner-a", transactions, 3.125, difficulty)
    }

    #[test]
    fn test_genesis_block() {
        let genesis = Block::genesis(3.125, 4);

        assert!(genesis.is_genesis());
        assert_eq!(genesis.index, 0);
        assert_eq!(genesis.previous_hash, Hash::ZERO);
        assert_eq!(genesis.miner, GENESIS_MINER);
        assert_eq!(genesis.nonce, 0);
        assert!(genesis.transactions.is_empty());
        assert!(genesis.verify_hash());
    }

    #[test]
    fn test_new_block_is_unsealed() {
        let block = block_with(vec![transfer(1.0)], 2);
        assert_eq!(block.nonce, 0);
        assert_eq!(block.hash, block.compute_hash());
    }

    #[test]
    fn test_block_hash_deterministic() {
        let block = block_with(vec![transfer(1.0)], 1);
        assert_eq!(block.compute_hash(), block.compute_hash());
        assert_eq!(block.clone().compute_hash(), block.compute_hash());
    }

    #[test]
    fn test_seal_meets_difficulty() {
        for difficulty in 0..=3 {
            let block = block_with(vec![transfer(5.0)], difficulty).sealed();
            assert!(block.meets_difficulty());
            assert!(block.hash.leading_zero_digits() >= difficulty);
            assert!(block.verify_hash());
        }
    }

    #[test]
    fn test_seal_difficulty_zero_keeps_nonce_zero() {
        let block = block_with(vec![], 0).sealed();
        assert_eq!(block.nonce, 0);
    }

    #[test]
    fn test_seal_is_reproducible() {
        let mut block = block_with(vec![transfer(2.0)], 2);
        block.seal();
        let (nonce, hash) = (block.nonce, block.hash);

        block.seal();
        assert_eq!(block.nonce, nonce);
        assert_eq!(block.hash, hash);
    }

    #[test]
    fn test_seal_until_stops_when_cancelled() {
        let cancel = AtomicBool::new(true);
        let mut block = block_with(vec![transfer(2.0)], 64);
        assert!(!block.seal_until(&cancel));
        assert!(!block.meets_difficulty());

        // a search already under way notices the flag
        let cancel = std::sync::Arc::new(AtomicBool::new(false));
        let flag = cancel.clone();
        let search = std::thread::spawn(move || {
            let mut block = block_with(vec![transfer(2.0)], 64);
            block.seal_until(&flag)
        });
        std::thread::sleep(std::time::Duration::from_millis(50));
        cancel.store(true, Ordering::Relaxed);
        assert!(!search.join().unwrap());
    }

    #[test]
    fn test_seal_until_finishes_when_not_cancelled() {
        let mut block = block_with(vec![transfer(2.0)], 2);
        assert!(block.seal_until(&AtomicBool::new(false)));
        assert!(block.meets_difficulty());
        assert!(block.verify_hash());
    }

    #[test]
    fn test_tampering_breaks_hash() {
        let mut block = block_with(vec![transfer(2.0)], 1).sealed();
        block.transactions[0].amount = 2000.0;
        assert!(!block.verify_hash());

        let mut block = block_with(vec![transfer(2.0)], 1).sealed();
        block.nonce += 1;
        assert!(!block.verify_hash());
    }

    #[test]
    fn test_reward_and_counts() {
        let reward = Transaction::reward("miner-a", 3.125);
        let block = block_with(vec![transfer(1.0), transfer(2.0), reward.clone()], 0);

        assert_eq!(block.tx_count(), 3);
        assert_eq!(block.mined_transaction_count(), 2);
        assert_eq!(block.reward_transaction(), Some(&reward));

        let delta = block.miner_delta();
        assert_eq!(delta.nonce, block.nonce);
        assert_eq!(delta.mined_transactions, 2);
        assert_eq!(delta.reward, 3.125);
    }

    #[test]
    fn test_mined_records_cover_every_transaction() {
        let txs = vec![transfer(1.0), Transaction::reward("miner-a", 3.125)];
        let block = block_with(txs.clone(), 0);
        let records = block.mined_records();

        assert_eq!(records.len(), 2);
        for (record, tx) in records.iter().zip(&txs) {
            assert_eq!(record.transaction_id, tx.identifier);
            assert_eq!(record.block_index, 1);
            assert_eq!(record.miner, "miner-a");
        }
    }
}
