//! The in-memory block sequence.
//!
//! [`Chain`] holds every committed block in index order. It only accepts a
//! block that extends the current tail, and it can re-derive its own
//! validity from the blocks' hashes and links at any time.

use settlechain_core::{Block, Hash};
use std::fmt;
use thiserror::Error;

/// Errors that can occur while building or extending a chain.
#[derive(Debug, Error)]
pub enum ChainError {
    #[error("chain has no blocks")]
    Empty,

    #[error("first block is not a genesis block")]
    NotGenesis,

    #[error("block index mismatch: expected {expected}, got {got}")]
    IndexMismatch { expected: u64, got: u64 },

    #[error("block {index} does not link to the current tail")]
    PreviousHashMismatch { index: u64 },
}

pub type Result<T> = std::result::Result<T, ChainError>;

/// What is wrong with the first invalid block of a chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultKind {
    /// The stored hash is not the digest of the block's fields.
    HashMismatch,
    /// `previous_hash` differs from the preceding block's hash.
    BrokenLink,
    /// The hash does not carry the block's required leading zeros.
    InsufficientWork,
}

/// The first block that breaks chain validity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainFault {
    pub index: u64,
    pub kind: FaultKind,
}

impl fmt::Display for ChainFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let what = match self.kind {
            FaultKind::HashMismatch => "hash does not match contents",
            FaultKind::BrokenLink => "previous hash does not match prior block",
            FaultKind::InsufficientWork => "hash does not meet difficulty",
        };
        write!(f, "block {}: {}", self.index, what)
    }
}

/// Ordered sequence of committed blocks, starting at genesis.
#[derive(Debug, Clone)]
pub struct Chain {
    blocks: Vec<Block>,
}

impl Chain {
    /// Start a chain from its genesis block.
    pub fn new(genesis: Block) -> Self {
        Self {
            blocks: vec![genesis],
        }
    }

    /// Rebuild a chain from persisted blocks.
    ///
    /// Only the shape is checked (a genesis first, consecutive indices).
    /// Hashes and links are left to [`Chain::is_valid`], so a tampered store
    /// still loads and reports itself as invalid.
    pub fn from_blocks(blocks: Vec<Block>) -> Result<Self> {
        let first = blocks.first().ok_or(ChainError::Empty)?;
        if first.index != 0 {
            return Err(ChainError::NotGenesis);
        }
        for (position, block) in blocks.iter().enumerate() {
            if block.index != position as u64 {
                return Err(ChainError::IndexMismatch {
                    expected: position as u64,
                    got: block.index,
                });
            }
        }
        Ok(Self { blocks })
    }

    /// Number of blocks, genesis included.
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Always false: a chain holds at least its genesis block.
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Index of the tail block.
    pub fn height(&self) -> u64 {
        self.tail().index
    }

    /// The most recently appended block.
    pub fn tail(&self) -> &Block {
        // `new` and `from_blocks` both guarantee one block.
        &self.blocks[self.blocks.len() - 1]
    }

    /// The tail's hash, which the next block must link to.
    pub fn tail_hash(&self) -> Hash {
        self.tail().hash
    }

    pub fn get(&self, index: u64) -> Option<&Block> {
        usize::try_from(index).ok().and_then(|i| self.blocks.get(i))
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Check that `block` extends the current tail.
    pub fn check_append(&self, block: &Block) -> Result<()> {
        let tail = self.tail();
        let expected = tail.index + 1;
        if block.index != expected {
            return Err(ChainError::IndexMismatch {
                expected,
                got: block.index,
            });
        }
        if block.previous_hash != tail.hash {
            return Err(ChainError::PreviousHashMismatch { index: block.index });
        }
        Ok(())
    }

    /// Append a block that extends the current tail.
    pub fn append(&mut self, block: Block) -> Result<()> {
        self.check_append(&block)?;
        self.blocks.push(block);
        Ok(())
    }

    /// Walk the chain and return the first invalid block, if any.
    ///
    /// Genesis is exempt. Every later block must hash to its stored hash,
    /// link to its predecessor and meet its own difficulty.
    pub fn first_fault(&self) -> Option<ChainFault> {
        self.blocks.windows(2).find_map(|pair| {
            let (previous, block) = (&pair[0], &pair[1]);
            let kind = if !block.verify_hash() {
                FaultKind::HashMismatch
            } else if block.previous_hash != previous.hash {
                FaultKind::BrokenLink
            } else if !block.meets_difficulty() {
                FaultKind::InsufficientWork
            } else {
                return None;
            };
            Some(ChainFault {
                index: block.index,
                kind,
            })
        })
    }

    /// Check whether every block after genesis is intact and linked.
    pub fn is_valid(&self) -> bool {
        self.first_fault().is_none()
    }

    /// Net balance of `address` over every committed transaction.
    ///
    /// Sent amounts are subtracted, received amounts (rewards included)
    /// are added.
    pub fn balance_of(&self, address: &str) -> f64 {
        self.blocks
            .iter()
            .flat_map(|block| &block.transactions)
            .map(|tx| tx.balance_delta(address))
            .sum()
    }
}
