//! External settlement validation for settlechain.
//!
//! A pending transaction only enters a block once the real-world event it
//! references (an order payment) is confirmed by an external service. This
//! crate provides:
//! - The [`SettlementValidator`] contract the miner depends on
//! - [`check_transaction`], the bounded-wait check of a single transaction
//! - [`HttpSettlementClient`], the client for the order-status service
//!
//! # Example
//!
//! ```rust,no_run
//! use settlechain_settlement::{HttpSettlementClient, SettlementValidator};
//!
//! # async fn run() -> settlechain_settlement::Result<()> {
//! let client = HttpSettlementClient::new("http://safeblockcom.test")?;
//! let settlement = client.check_settlement("ord-1").await?;
//! println!("settled: {}", settlement.succeeded);
//! # Ok(())
//! # }
//! ```

pub mod http;
pub mod validator;

// Re-export commonly used types
pub use http::HttpSettlementClient;
pub use validator::{
    check_transaction, Result, Settlement, SettlementError, SettlementValidator,
};
