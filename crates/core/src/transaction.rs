//! Ledger transactions and their opaque payloads.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

/// Errors that can occur when building or submitting a transaction.
#[derive(Debug, Error)]
pub enum TransactionError {
    #[error("amount must be a finite, non-negative number (got {0})")]
    InvalidAmount(f64),

    #[error("recipient must not be empty")]
    EmptyRecipient,

    #[error("reward transactions are synthesized by miners and cannot be submitted")]
    RewardNotSubmittable,

    #[error("unknown transaction kind: {0}")]
    UnknownKind(String),

    #[error("payload is not valid JSON: {0}")]
    InvalidPayload(#[from] serde_json::Error),
}

/// The kind of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    /// Ordinary value transfer, typically backed by an external order.
    Transfer,
    /// Registration of a participant.
    Registration,
    /// Network-originated credit to the miner that sealed a block.
    Reward,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Transfer => "transfer",
            TransactionKind::Registration => "registration",
            TransactionKind::Reward => "reward",
        }
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionKind {
    type Err = TransactionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "transfer" => Ok(TransactionKind::Transfer),
            "registration" => Ok(TransactionKind::Registration),
            "reward" => Ok(TransactionKind::Reward),
            other => Err(TransactionError::UnknownKind(other.to_string())),
        }
    }
}

/// Opaque structured data attached to a transaction.
///
/// Stored as canonical JSON text (object keys sorted) so that it serializes
/// identically everywhere, including inside the block digest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payload(String);

impl Payload {
    /// An empty JSON object.
    pub fn empty() -> Self {
        Self("{}".to_string())
    }

    /// Build a payload from a JSON value.
    pub fn new(value: &serde_json::Value) -> Self {
        Self(value.to_string())
    }

    /// Parse and canonicalize a JSON document.
    pub fn from_json_str(s: &str) -> Result<Self, TransactionError> {
        let value: serde_json::Value = serde_json::from_str(s)?;
        Ok(Self::new(&value))
    }

    /// The canonical JSON text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Decode the payload back into a JSON value.
    pub fn value(&self) -> Result<serde_json::Value, TransactionError> {
        Ok(serde_json::from_str(&self.0)?)
    }

    /// The external order reference (`orderId`), if present.
    ///
    /// Accepts both string and integer ids; anything else counts as absent.
    pub fn order_id(&self) -> Option<String> {
        let value = self.value().ok()?;
        match value.get("orderId")? {
            serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
            serde_json::Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}

impl Default for Payload {
    fn default() -> Self {
        Self::empty()
    }
}

/// A transaction on the ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Globally unique identifier assigned at creation.
    pub identifier: String,
    /// Transaction kind.
    pub kind: TransactionKind,
    /// Sender identifier (None for network-originated rewards).
    pub sender: Option<String>,
    /// Recipient identifier.
    pub recipient: String,
    /// Amount moved from sender to recipient.
    pub amount: f64,
    /// Opaque data interpreted only by the external validator.
    pub payload: Payload,
}

impl Transaction {
    /// Create a new transaction with a fresh `TX-` identifier.
    pub fn new(
        kind: TransactionKind,
        sender: Option<String>,
        recipient: String,
        amount: f64,
        payload: Payload,
    ) -> Self {
        Self {
            identifier: fresh_identifier("TX"),
            kind,
            sender,
            recipient,
            amount,
            payload,
        }
    }

    /// Create the reward transaction crediting `miner` with `amount`.
    pub fn reward(miner: &str, amount: f64) -> Self {
        Self {
            identifier: fresh_identifier("REWARD"),
            kind: TransactionKind::Reward,
            sender: None,
            recipient: miner.to_string(),
            amount,
            payload: Payload::empty(),
        }
    }

    /// Check that this transaction may be submitted by a client.
    pub fn validate_submission(&self) -> Result<(), TransactionError> {
        if !self.amount.is_finite() || self.amount < 0.0 {
            return Err(TransactionError::InvalidAmount(self.amount));
        }
        if self.recipient.trim().is_empty() {
            return Err(TransactionError::EmptyRecipient);
        }
        if self.is_reward() {
            return Err(TransactionError::RewardNotSubmittable);
        }
        Ok(())
    }

    /// Check if this is a reward transaction.
    pub fn is_reward(&self) -> bool {
        self.kind == TransactionKind::Reward
    }

    /// Net effect of this transaction on `address`'s balance.
    pub fn balance_delta(&self, address: &str) -> f64 {
        let mut delta = 0.0;
        if self.sender.as_deref() == Some(address) {
            delta -= self.amount;
        }
        if self.recipient == address {
            delta += self.amount;
        }
        delta
    }
}

/// Build a `{prefix}-{unix_millis}-{uuid}` identifier.
fn fresh_identifier(prefix: &str) -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();
    format!("{}-{}-{}", prefix, millis, uuid::Uuid::new_v4())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn transfer(amount: f64) -> Transaction {
        Transaction::new(
            TransactionKind::Transfer,
            Some("alice".into()),
            "bob".into(),
            amount,
            Payload::new(&json!({ "orderId": "ord-1" })),
        )
    }

    #[test]
    fn test_identifiers_are_unique() {
        let a = transfer(1.0);
        let b = transfer(1.0);
        assert!(a.identifier.starts_with("TX-"));
        assert_ne!(a.identifier, b.identifier);
    }

    #[test]
    fn test_reward_transaction() {
        let tx = Transaction::reward("miner-a", 3.125);
        assert!(tx.is_reward());
        assert!(tx.identifier.starts_with("REWARD-"));
        assert_eq!(tx.sender, None);
        assert_eq!(tx.recipient, "miner-a");
        assert_eq!(tx.amount, 3.125);
    }

    #[test]
    fn test_submission_validation() {
        assert!(transfer(10.0).validate_submission().is_ok());
        assert!(transfer(0.0).validate_submission().is_ok());

        assert!(matches!(
            transfer(-1.0).validate_submission(),
            Err(TransactionError::InvalidAmount(_))
        ));
        assert!(matches!(
            transfer(f64::NAN).validate_submission(),
            Err(TransactionError::InvalidAmount(_))
        ));

        let mut tx = transfer(1.0);
        tx.recipient = "  ".into();
        assert!(matches!(
            tx.validate_submission(),
            Err(TransactionError::EmptyRecipient)
        ));

        assert!(matches!(
            Transaction::reward("m", 1.0).validate_submission(),
            Err(TransactionError::RewardNotSubmittable)
        ));
    }

    #[test]
    fn test_kind_parsing() {
        assert_eq!(
            "transfer".parse::<TransactionKind>().unwrap(),
            TransactionKind::Transfer
        );
        assert_eq!(
            "Registration".parse::<TransactionKind>().unwrap(),
            TransactionKind::Registration
        );
        assert!(matches!(
            "refund".parse::<TransactionKind>(),
            Err(TransactionError::UnknownKind(_))
        ));
        assert_eq!(TransactionKind::Reward.to_string(), "reward");
    }

    #[test]
    fn test_payload_is_canonical() {
        let a = Payload::from_json_str(r#"{"b": 1, "a": 2}"#).unwrap();
        let b = Payload::from_json_str(r#"{"a":2,"b":1}"#).unwrap();
        assert_eq!(a, b);
        assert!(Payload::from_json_str("not json").is_err());
    }

    #[test]
    fn test_payload_order_id() {
        assert_eq!(
            Payload::new(&json!({ "orderId": "ord-7" })).order_id(),
            Some("ord-7".to_string())
        );
        assert_eq!(
            Payload::new(&json!({ "orderId": 1234 })).order_id(),
            Some("1234".to_string())
        );
        assert_eq!(Payload::new(&json!({ "orderId": "" })).order_id(), None);
        assert_eq!(Payload::new(&json!({ "order": "x" })).order_id(), None);
        assert_eq!(Payload::new(&json!([1, 2])).order_id(), None);
        assert_eq!(Payload::empty().order_id(), None);
    }

    #[test]
    fn test_balance_delta() {
        let tx = transfer(7.5);
        assert_eq!(tx.balance_delta("alice"), -7.5);
        assert_eq!(tx.balance_delta("bob"), 7.5);
        assert_eq!(tx.balance_delta("carol"), 0.0);

        let reward = Transaction::reward("bob", 3.125);
        assert_eq!(reward.balance_delta("bob"), 3.125);
    }

    #[test]
    fn test_bincode_roundtrip_keeps_payload() {
        let tx = transfer(2.0);
        let encoded = bincode::serialize(&tx).unwrap();
        let decoded: Transaction = bincode::deserialize(&encoded).unwrap();
        assert_eq!(decoded, tx);
        assert_eq!(decoded.payload.order_id(), Some("ord-1".to_string()));
    }
}
