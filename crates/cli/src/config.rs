//! The `config.json` file kept in the data directory.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use settlechain_chain::LedgerConfig;
use std::fs;
use std::path::{Path, PathBuf};

/// File name of the configuration inside the data directory.
pub const CONFIG_FILE: &str = "config.json";

/// Base URL of the order-status service used when none is configured.
pub const DEFAULT_VALIDATOR_URL: &str = "http://safeblockcom.test";

/// Everything a command needs to open the ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// Base URL of the settlement validator.
    pub validator_url: String,
    /// Ledger parameters.
    pub ledger: LedgerConfig,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            validator_url: DEFAULT_VALIDATOR_URL.to_string(),
            ledger: LedgerConfig::default(),
        }
    }
}

impl CliConfig {
    pub fn path(data_dir: &Path) -> PathBuf {
        data_dir.join(CONFIG_FILE)
    }

    /// Read and validate the configuration in `data_dir`.
    pub fn load(data_dir: &Path) -> Result<Self> {
        let path = Self::path(data_dir);
        let text = fs::read_to_string(&path).with_context(|| {
            format!(
                "Failed to read {}. Did you run 'settlechain init'?",
                path.display()
            )
        })?;
        let config: Self = serde_json::from_str(&text)
            .with_context(|| format!("Invalid config file: {}", path.display()))?;
        config
            .ledger
            .validate()
            .with_context(|| format!("Invalid ledger settings in {}", path.display()))?;
        Ok(config)
    }

    /// Write the configuration to `data_dir`.
    pub fn save(&self, data_dir: &Path) -> Result<PathBuf> {
        let path = Self::path(data_dir);
        fs::write(&path, serde_json::to_string_pretty(self)?)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(path)
    }
}
