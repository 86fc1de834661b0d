//! Configuration for pkvault

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::VaultError;

/// Default storage directory
pub fn default_storage_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("pkvault")
}

/// Configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding the vault database and config file
    #[serde(default = "default_storage_dir")]
    pub storage_dir: PathBuf,

    /// Sled page cache size in bytes
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity_bytes: u64,

    /// Flush to disk after every write
    #[serde(default = "default_true")]
    pub flush_on_write: bool,

    /// Remove orphaned payload/metadata rows when the vault is opened
    #[serde(default)]
    pub reconcile_on_open: bool,

    /// Slot count of directory containers created by `restore`
    #[serde(default = "default_container_slots")]
    pub container_slots: usize,
}

fn default_cache_capacity() -> u64 {
    64 * 1024 * 1024
}

fn default_true() -> bool {
    true
}

fn default_container_slots() -> usize {
    30
}

impl Default for Config {
    fn default() -> Self {
        Self {
            storage_dir: default_storage_dir(),
            cache_capacity_bytes: default_cache_capacity(),
            flush_on_write: true,
            reconcile_on_open: false,
            container_slots: default_container_slots(),
        }
    }
}

impl Config {
    /// Load config from file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, VaultError> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| VaultError::Config(e.to_string()))
    }

    /// Save config to file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), VaultError> {
        let content =
            toml::to_string_pretty(self).map_err(|e| VaultError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get vault database path
    pub fn db_path(&self) -> PathBuf {
        self.storage_dir.join("vault.sled")
    }

    /// Get config file path
    pub fn config_path(&self) -> PathBuf {
        self.storage_dir.join("config.toml")
    }

    /// Sled settings derived from this config
    pub fn store_config(&self) -> crate::store::SledStoreConfig {
        crate::store::SledStoreConfig {
            db_path: self.db_path(),
            cache_capacity: self.cache_capacity_bytes,
            flush_on_write: self.flush_on_write,
        }
    }
}
