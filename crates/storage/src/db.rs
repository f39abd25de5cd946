//! sled database wrapper with serialization helpers.

use std::path::Path;

use sled::Db;
use thiserror::Error;

/// Storage errors.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] sled::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    #[error("Key not found: {0}")]
    NotFound(String),

    #[error("Invalid genesis: {0}")]
    InvalidGenesis(String),

    #[error("Expected block index {expected}, got {got}")]
    IndexMismatch { expected: u64, got: u64 },

    #[error("Block {index} does not link to the stored chain tail")]
    PreviousHashMismatch { index: u64 },

    #[error("Transaction already stored: {0}")]
    DuplicateTransaction(String),

    #[error("Transaction {transaction_id} already mined by {miner}")]
    DuplicateMinedRecord {
        transaction_id: String,
        miner: String,
    },
}

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Wrapper around sled database with serialization helpers.
pub struct Storage {
    db: Db,
}

impl Storage {
    /// Open a database at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let db = sled::open(path)?;
        Ok(Self { db })
    }

    /// Open an in-memory database (for testing).
    pub fn open_temporary() -> Result<Self> {
        let db = sled::Config::new().temporary(true).open()?;
        Ok(Self { db })
    }

    /// Store a serializable value.
    pub fn put<K, V>(&self, key: K, value: &V) -> Result<()>
    where
        K: AsRef<[u8]>,
        V: serde::Serialize,
    {
        let encoded = bincode::serialize(value)?;
        self.db.insert(key, encoded)?;
        Ok(())
    }

    /// Retrieve and deserialize a value.
    pub fn get<K, V>(&self, key: K) -> Result<Option<V>>
    where
        K: AsRef<[u8]>,
        V: serde::de::DeserializeOwned,
    {
        match self.db.get(key)? {
            Some(bytes) => {
                let value = bincode::deserialize(&bytes)?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    /// Retrieve a value, returning error if not found.
    pub fn get_or_err<K, V>(&self, key: K) -> Result<V>
    where
        K: AsRef<[u8]> + std::fmt::Debug + Clone,
        V: serde::de::DeserializeOwned,
    {
        self.get(key.clone())?
            .ok_or_else(|| StorageError::NotFound(format!("{:?}", key)))
    }

    /// Check if a key exists.
    pub fn contains<K: AsRef<[u8]>>(&self, key: K) -> Result<bool> {
        Ok(self.db.contains_key(key)?)
    }

    /// Deserialize every value stored under `prefix`, in key order.
    pub fn scan_values<V>(&self, prefix: &[u8]) -> Result<Vec<V>>
    where
        V: serde::de::DeserializeOwned,
    {
        let mut values = Vec::new();
        for entry in self.db.scan_prefix(prefix) {
            let (_, bytes) = entry?;
            values.push(bincode::deserialize(&bytes)?);
        }
        Ok(values)
    }

    /// Collect the key suffixes stored under `prefix`, in key order.
    pub fn scan_key_suffixes(&self, prefix: &[u8]) -> Result<Vec<String>> {
        let mut suffixes = Vec::new();
        for entry in self.db.scan_prefix(prefix) {
            let (key, _) = entry?;
            suffixes.push(String::from_utf8_lossy(&key[prefix.len()..]).into_owned());
        }
        Ok(suffixes)
    }

    /// Apply multiple operations atomically.
    ///
    /// The batch collects operations in memory, then `apply_batch` writes them
    /// atomically through sled's write-ahead log.
    pub fn batch(&self, operations: Vec<BatchOp>) -> Result<()> {
        let mut batch = sled::Batch::default();
        for op in operations {
            match op {
                BatchOp::Insert { key, value } => batch.insert(key, value),
                BatchOp::Remove { key } => batch.remove(key),
            }
        }
        self.db.apply_batch(batch)?;
        Ok(())
    }

    /// Flush all pending writes to disk.
    pub fn flush(&self) -> Result<()> {
        self.db.flush()?;
        Ok(())
    }

    // =========================================================================
    // Key Construction Helpers
    // =========================================================================

    /// Create a prefixed key for blocks by index.
    /// Format: "block:index:{index:020}" (zero padded so keys sort by index)
    pub fn block_index_key(index: u64) -> Vec<u8> {
        format!("block:index:{:020}", index).into_bytes()
    }

    /// Create a prefixed key for transactions.
    /// Format: "tx:{identifier}"
    pub fn transaction_key(identifier: &str) -> Vec<u8> {
        format!("tx:{}", identifier).into_bytes()
    }

    /// Create a prefixed key marking a transaction as pending.
    /// Format: "pending:{identifier}"
    pub fn pending_key(identifier: &str) -> Vec<u8> {
        format!("{}{}", PENDING_PREFIX, identifier).into_bytes()
    }

    /// Create a prefixed key for a mined record.
    /// Format: "mined:{miner}:{identifier}"
    pub fn mined_key(identifier: &str, miner: &str) -> Vec<u8> {
        format!("{}{}", Self::mined_prefix(miner), identifier).into_bytes()
    }

    /// Prefix shared by every mined record of `miner`.
    pub fn mined_prefix(miner: &str) -> String {
        format!("mined:{}:", miner)
    }

    /// Create a prefixed key for miner accounts.
    /// Format: "miner:{address}"
    pub fn miner_key(address: &str) -> Vec<u8> {
        format!("{}{}", MINER_PREFIX, address).into_bytes()
    }
}

/// Prefix of the pending transaction markers.
pub const PENDING_PREFIX: &str = "pending:";

/// Prefix of the miner account entries.
pub const MINER_PREFIX: &str = "miner:";

/// Batch operation for atomic updates.
pub enum BatchOp {
    Insert { key: Vec<u8>, value: Vec<u8> },
    Remove { key: Vec<u8> },
}

impl BatchOp {
    /// Build an insert of a bincode-encoded value.
    pub fn put<V: serde::Serialize>(key: Vec<u8>, value: &V) -> Result<Self> {
        Ok(BatchOp::Insert {
            key,
            value: bincode::serialize(value)?,
        })
    }
}
