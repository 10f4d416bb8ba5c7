//! Node configuration, loaded from TOML.
//!
//! Every field has a default, so an empty file is a valid config:
//!
//! ```toml
//! overlay = "7000000000000000000000000000000000000000000000000000000000000000"
//! data_dir = "/var/lib/swarmsync"
//!
//! [pushsync]
//! retry_interval_ms = 10000
//! receipt_timeout_ms = 2000
//! max_retries = 3
//! empty_batch_delay_ms = 500
//! ```

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};
use swarmsync_core::{Address, CoreError};
use swarmsync_pushsync::PushSyncConfig;

/// File name of the SQLite database inside `data_dir`.
pub const DB_FILE_NAME: &str = "chunks.db";

/// Configuration for a [`Node`](crate::Node).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// Overlay address of the node, 64 hex characters.
    pub overlay: String,

    /// Directory for the persistent chunk store. Chunks are kept in memory
    /// when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,

    pub pushsync: PushSyncConfig,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            overlay: Address::ZERO.to_hex(),
            data_dir: None,
            pushsync: PushSyncConfig::default(),
        }
    }
}

impl NodeConfig {
    /// Config for the node at `overlay`, everything else default.
    pub fn for_overlay(overlay: &Address) -> Self {
        Self {
            overlay: overlay.to_hex(),
            ..Self::default()
        }
    }

    /// Read and parse a TOML config file.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        Self::from_toml_str(&text)
            .with_context(|| format!("failed to parse config {}", path.display()))
    }

    /// Parse a TOML document.
    pub fn from_toml_str(text: &str) -> anyhow::Result<Self> {
        let config: Self = toml::from_str(text)?;
        config.overlay_address()?;
        Ok(config)
    }

    /// Render as a TOML document.
    pub fn to_toml_string(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// The parsed overlay address.
    pub fn overlay_address(&self) -> Result<Address, CoreError> {
        Address::from_hex(&self.overlay)
    }

    /// Path of the SQLite database, if a data directory is configured.
    pub fn db_path(&self) -> Option<PathBuf> {
        self.data_dir.as_ref().map(|dir| dir.join(DB_FILE_NAME))
    }
}
