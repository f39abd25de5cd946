//! Block storage and chain head tracking.

use crate::db::{BatchOp, Result, Storage, StorageError};
use settlechain_core::{Block, Hash};

/// Keys for chain metadata.
const CHAIN_HEAD_KEY: &[u8] = b"chain:head";
const CHAIN_HEIGHT_KEY: &[u8] = b"chain:height";

/// Manages block storage and the chain tail.
pub struct ChainStore<'a> {
    storage: &'a Storage,
}

impl<'a> ChainStore<'a> {
    /// Create a new ChainStore wrapping the given storage.
    pub fn new(storage: &'a Storage) -> Self {
        Self { storage }
    }

    // =========================================================================
    // Block Storage
    // =========================================================================

    /// Get a block by its index.
    pub fn get_block(&self, index: u64) -> Result<Option<Block>> {
        self.storage.get(Storage::block_index_key(index))
    }

    /// Get the current chain head hash.
    pub fn get_head(&self) -> Result<Option<Hash>> {
        self.storage.get(CHAIN_HEAD_KEY)
    }

    /// Get the index of the chain tail.
    /// Returns 0 if the chain is not initialized.
    pub fn get_height(&self) -> Result<u64> {
        Ok(self.storage.get::<_, u64>(CHAIN_HEIGHT_KEY)?.unwrap_or(0))
    }

    /// Check if the chain is initialized (has a genesis block).
    pub fn is_initialized(&self) -> Result<bool> {
        Ok(self.get_head()?.is_some())
    }

    /// Get every stored block ordered by index.
    pub fn get_blocks(&self) -> Result<Vec<Block>> {
        if !self.is_initialized()? {
            return Ok(Vec::new());
        }
        self.get_blocks_range(0, self.get_height()?)
    }

    /// Get blocks in a range [from_index, to_index].
    pub fn get_blocks_range(&self, from_index: u64, to_index: u64) -> Result<Vec<Block>> {
        let mut blocks = Vec::new();
        for index in from_index..=to_index {
            match self.get_block(index)? {
                Some(block) => blocks.push(block),
                None => break, // Stop at first missing block
            }
        }
        Ok(blocks)
    }

    // =========================================================================
    // Genesis Block
    // =========================================================================

    /// Initialize the chain with a genesis block.
    ///
    /// This will fail if:
    /// - The block index is not 0
    /// - The chain is already initialized
    pub fn init_genesis(&self, genesis: &Block) -> Result<()> {
        if genesis.index != 0 {
            return Err(StorageError::InvalidGenesis(
                "Genesis block must have index 0".into(),
            ));
        }

        if self.is_initialized()? {
            return Err(StorageError::InvalidGenesis(
                "Chain already initialized".into(),
            ));
        }

        self.storage.batch(Self::block_ops(genesis)?)
    }

    // =========================================================================
    // Chain Operations
    // =========================================================================

    /// Check that `block` extends the stored tail.
    ///
    /// The block index must be exactly height + 1 and its previous hash must
    /// match the current head.
    pub fn check_extends(&self, block: &Block) -> Result<()> {
        let head = self
            .get_head()?
            .ok_or_else(|| StorageError::InvalidGenesis("Chain not initialized".into()))?;

        let expected = self.get_height()? + 1;
        if block.index != expected {
            return Err(StorageError::IndexMismatch {
                expected,
                got: block.index,
            });
        }

        if block.previous_hash != head {
            return Err(StorageError::PreviousHashMismatch { index: block.index });
        }

        Ok(())
    }

    /// Batch operations that store `block` and make it the new head.
    ///
    /// The caller is responsible for applying these together with any other
    /// writes of the same commit.
    pub fn block_ops(block: &Block) -> Result<Vec<BatchOp>> {
        Ok(vec![
            BatchOp::put(Storage::block_index_key(block.index), block)?,
            BatchOp::put(CHAIN_HEAD_KEY.to_vec(), &block.hash)?,
            BatchOp::put(CHAIN_HEIGHT_KEY.to_vec(), &block.index)?,
        ])
    }
}
