//! Blake3 hashing utilities and the block digest.

use crate::transaction::Transaction;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A named alias for a 32-byte(u8) array, used to represent a 256-bit hash.
pub type H256 = [u8; 32];

/// A wrapper type for H256 with Display and Debug formatting.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Hash(pub H256);

impl Hash {
    /// The zero hash (all zeros). Used as the genesis block's previous hash.
    pub const ZERO: Self = Self([0u8; 32]);

    /// Convert to a hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse from a hex string.
    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let bytes = hex::decode(s)?;
        if bytes.len() != 32 {
            return Err(hex::FromHexError::InvalidStringLength);
        }
        let mut arr = [0u8; 32];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }

    /// Number of leading `'0'` digits in the hex rendering of this hash.
    pub fn leading_zero_digits(&self) -> u32 {
        let mut count = 0;
        for byte in self.0 {
            if byte == 0 {
                count += 2;
                continue;
            }
            if byte >> 4 == 0 {
                count += 1;
            }
            break;
        }
        count
    }

    /// Check whether the first `difficulty` hex digits are all zero.
    pub fn meets_difficulty(&self, difficulty: u32) -> bool {
        self.leading_zero_digits() >= difficulty
    }
}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash({})", &self.to_hex()[..12])
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Hash arbitrary data using Blake3.
pub fn hash(data: &[u8]) -> Hash {
    Hash(blake3::hash(data).into())
}

/// The fields of a block that take part in its digest, in canonical order.
///
/// `reward` and `difficulty` are deliberately absent: they describe the block
/// but are not committed to by its hash.
#[derive(Serialize)]
struct DigestFields<'a> {
    index: u64,
    previous_hash: &'a Hash,
    timestamp: &'a str,
    miner: &'a str,
    transactions: &'a [Transaction],
    nonce: u64,
}

/// Compute the block digest over its hashed fields.
///
/// Transactions are serialized with bincode in declaration order, so two
/// callers holding equal field values always obtain the same digest.
pub fn digest(
    index: u64,
    previous_hash: &Hash,
    timestamp: &str,
    miner: &str,
    transactions: &[Transaction],
    nonce: u64,
) -> Hash {
    let fields = DigestFields {
        index,
        previous_hash,
        timestamp,
        miner,
        transactions,
        nonce,
    };
    let encoded = bincode::serialize(&fields).expect("serialization should not fail");
    hash(&encoded)
}
