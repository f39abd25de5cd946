//! Miner bookkeeping records.

use serde::{Deserialize, Serialize};

/// One block's contribution to a miner's running totals.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MinerDelta {
    /// Nonce the block was sealed with.
    pub nonce: u64,
    /// Validated transactions embedded in the block (reward excluded).
    pub mined_transactions: u64,
    /// Reward credited for the block.
    pub reward: f64,
}

/// Running totals for a miner address.
///
/// All three counters only ever grow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MinerAccount {
    /// Miner address (unique key).
    pub address: String,
    /// Sum of the nonces of every block sealed by this miner.
    pub total_nonce: u64,
    /// Count of validated transactions included by this miner.
    pub total_mined_transactions: u64,
    /// Sum of rewards credited to this miner.
    pub total_reward: f64,
}

impl MinerAccount {
    /// Create an account whose totals are the first block's contribution.
    pub fn new(address: impl Into<String>, delta: &MinerDelta) -> Self {
        Self {
            address: address.into(),
            total_nonce: delta.nonce,
            total_mined_transactions: delta.mined_transactions,
            total_reward: delta.reward.max(0.0),
        }
    }

    /// Add a block's contribution to the totals.
    pub fn accumulate(&mut self, delta: &MinerDelta) {
        self.total_nonce = self.total_nonce.saturating_add(delta.nonce);
        self.total_mined_transactions = self
            .total_mined_transactions
            .saturating_add(delta.mined_transactions);
        self.total_reward += delta.reward.max(0.0);
    }
}

/// Records that `miner` embedded `transaction_id` in block `block_index`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MinedRecord {
    pub transaction_id: String,
    pub block_index: u64,
    pub miner: String,
}
