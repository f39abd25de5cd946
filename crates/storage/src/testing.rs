//! Fixtures shared by the store tests.

use serde_json::json;
use settlechain_core::{Block, Payload, Transaction, TransactionKind};

/// A pending transfer referencing `order_id`.
pub fn submitted(order_id: &str) -> Transaction {
    Transaction::new(
        TransactionKind::Transfer,
        Some("alice".into()),
        "bob".into(),
        10.0,
        Payload::new(&json!({ "orderId": order_id })),
    )
}

/// A sealed child of `parent` carrying `transactions` plus a reward.
pub fn mined_block(parent: &Block, miner: &str, mut transactions: Vec<Transaction>) -> Block {
    transactions.push(Transaction::reward(miner, 3.125));
    Block::new(parent.index + 1, parent.hash, miner, transactions, 3.125, 1).sealed()
}
