//! Ledger configuration.

use crate::mempool::{FifoSelection, RandomSelection, SelectionStrategy};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Hard cap on difficulty: a hash has 64 hex digits.
pub const MAX_DIFFICULTY: u32 = 64;

/// Hard cap on the transactions selected for one block.
pub const MAX_BATCH_SIZE: usize = 20;

/// Errors raised by [`LedgerConfig::validate`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("difficulty {0} exceeds the maximum of {MAX_DIFFICULTY}")]
    DifficultyTooHigh(u32),

    #[error("mining reward must be a finite, non-negative number (got {0})")]
    InvalidReward(f64),

    #[error("max_batch_size must be at least 1")]
    ZeroBatchSize,

    #[error("max_batch_size {0} exceeds the maximum of {MAX_BATCH_SIZE}")]
    BatchSizeTooLarge(usize),

    #[error("validation_timeout_ms must be at least 1")]
    ZeroTimeout,
}

/// How the next batch of pending transactions is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectionPolicy {
    /// A random subset of random size in `[1, max_batch_size]`.
    #[default]
    Random,
    /// The oldest pending transactions first.
    Fifo,
}

/// Ledger configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Required leading zero hex digits in a sealed block hash.
    pub difficulty: u32,
    /// Reward credited to the miner of each non-empty block.
    pub mining_reward: f64,
    /// Maximum transactions selected per mining round.
    pub max_batch_size: usize,
    /// Bounded wait for each external settlement check.
    pub validation_timeout_ms: u64,
    /// Batch selection policy.
    pub selection: SelectionPolicy,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            difficulty: 4,
            mining_reward: 3.125,
            max_batch_size: MAX_BATCH_SIZE,
            validation_timeout_ms: 5_000,
            selection: SelectionPolicy::Random,
        }
    }
}

impl LedgerConfig {
    /// Check that every value is in range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.difficulty > MAX_DIFFICULTY {
            return Err(ConfigError::DifficultyTooHigh(self.difficulty));
        }
        if !self.mining_reward.is_finite() || self.mining_reward < 0.0 {
            return Err(ConfigError::InvalidReward(self.mining_reward));
        }
        if self.max_batch_size == 0 {
            return Err(ConfigError::ZeroBatchSize);
        }
        if self.max_batch_size > MAX_BATCH_SIZE {
            return Err(ConfigError::BatchSizeTooLarge(self.max_batch_size));
        }
        if self.validation_timeout_ms == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        Ok(())
    }

    /// The settlement wait as a [`Duration`].
    pub fn validation_timeout(&self) -> Duration {
        Duration::from_millis(self.validation_timeout_ms)
    }

    /// Build the configured selection strategy.
    pub fn selection_strategy(&self) -> Box<dyn SelectionStrategy> {
        match self.selection {
            SelectionPolicy::Random => Box::new(RandomSelection::new(self.max_batch_size)),
            SelectionPolicy::Fifo => Box::new(FifoSelection::new(self.max_batch_size)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = LedgerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.difficulty, 4);
        assert_eq!(config.mining_reward, 3.125);
        assert_eq!(config.max_batch_size, 20);
        assert_eq!(config.validation_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn test_validate_rejects_out_of_range() {
        let mut config = LedgerConfig {
            difficulty: 65,
            ..LedgerConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::DifficultyTooHigh(65))
        ));

        config.difficulty = 2;
        config.mining_reward = -1.0;
        assert!(matches!(config.validate(), Err(ConfigError::InvalidReward(_))));

        config.mining_reward = 1.0;
        config.max_batch_size = 0;
        assert!(matches!(config.validate(), Err(ConfigError::ZeroBatchSize)));

        config.max_batch_size = MAX_BATCH_SIZE + 1;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::BatchSizeTooLarge(21))
        ));

        config.max_batch_size = MAX_BATCH_SIZE;
        assert!(config.validate().is_ok());

        config.max_batch_size = 5;
        config.validation_timeout_ms = 0;
        assert!(matches!(config.validate(), Err(ConfigError::ZeroTimeout)));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: LedgerConfig =
            serde_json::from_str(r#"{ "difficulty": 2, "selection": "fifo" }"#).unwrap();
        assert_eq!(config.difficulty, 2);
        assert_eq!(config.selection, SelectionPolicy::Fifo);
        assert_eq!(config.mining_reward, 3.125);
        assert_eq!(config.max_batch_size, 20);
    }
}
