//! The settlement validator contract and the per-transaction check.

use async_trait::async_trait;
use settlechain_core::Transaction;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while confirming a settlement.
#[derive(Debug, Error)]
pub enum SettlementError {
    #[error("transaction {0} carries no order reference")]
    MissingReference(String),

    #[error("invalid validator url: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("unsupported validator url: {0}")]
    UnsupportedUrl(String),

    #[error("transport error: {0}")]
    Transport(#[from] std::io::Error),

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("invalid response body: {0}")]
    Json(#[from] serde_json::Error),

    #[error("validator did not answer within {0:?}")]
    Timeout(Duration),

    #[error("settlement not confirmed (status: {0})")]
    NotSettled(String),
}

pub type Result<T> = std::result::Result<T, SettlementError>;

/// Answer of the external validator for one reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settlement {
    /// Whether the referenced event has settled.
    pub succeeded: bool,
    /// Status reported by the validator, for logging.
    pub status: String,
}

impl Settlement {
    pub fn succeeded() -> Self {
        Self {
            succeeded: true,
            status: "succeeded".to_string(),
        }
    }

    pub fn failed(status: impl Into<String>) -> Self {
        Self {
            succeeded: false,
            status: status.into(),
        }
    }
}

/// A remote service confirming that a transaction's real-world event settled.
#[async_trait]
pub trait SettlementValidator: Send + Sync {
    /// Ask whether the event identified by `reference_id` has settled.
    async fn check_settlement(&self, reference_id: &str) -> Result<Settlement>;
}

/// Confirm one transaction against `validator`, waiting at most `timeout`.
///
/// Returns `Ok(())` only for a confirmed settlement. A missing reference, a
/// transport failure, an expired wait or a non-success status are all errors
/// the caller treats as a rejection of this transaction alone.
pub async fn check_transaction(
    validator: &dyn SettlementValidator,
    tx: &Transaction,
    timeout: Duration,
) -> Result<()> {
    let reference = tx
        .payload
        .order_id()
        .ok_or_else(|| SettlementError::MissingReference(tx.identifier.clone()))?;

    let settlement = tokio::time::timeout(timeout, validator.check_settlement(&reference))
        .await
        .map_err(|_| SettlementError::Timeout(timeout))??;

    if !settlement.succeeded {
        return Err(SettlementError::NotSettled(settlement.status));
    }

    tracing::debug!(
        transaction = %tx.identifier,
        reference = %reference,
        "settlement confirmed"
    );
    Ok(())
}
