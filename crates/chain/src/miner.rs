//! Cumulative per-miner statistics.

use settlechain_core::{MinerAccount, MinerDelta};
use std::collections::HashMap;

/// In-memory view of every miner's lifetime totals.
#[derive(Debug, Default)]
pub struct MinerLedger {
    accounts: HashMap<String, MinerAccount>,
}

impl MinerLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild the ledger from persisted accounts.
    pub fn from_accounts(accounts: impl IntoIterator<Item = MinerAccount>) -> Self {
        Self {
            accounts: accounts
                .into_iter()
                .map(|account| (account.address.clone(), account))
                .collect(),
        }
    }

    /// Create the account for `address` from `delta`, or add `delta` to the
    /// existing totals. Returns the updated account.
    pub fn register_or_accumulate(&mut self, address: &str, delta: &MinerDelta) -> &MinerAccount {
        self.accounts
            .entry(address.to_string())
            .and_modify(|account| account.accumulate(delta))
            .or_insert_with(|| MinerAccount::new(address, delta))
    }

    pub fn get(&self, address: &str) -> Option<&MinerAccount> {
        self.accounts.get(address)
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    /// All accounts, sorted by address.
    pub fn accounts(&self) -> Vec<MinerAccount> {
        let mut accounts: Vec<_> = self.accounts.values().cloned().collect();
        accounts.sort_by(|a, b| a.address.cmp(&b.address));
        accounts
    }
}
