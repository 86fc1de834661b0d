//! Sled-backed store
//!
//! One sled database, one tree per namespace. Sled persists each tree
//! operation on its own, which is exactly the per-operation atomicity the
//! repository relies on.

use async_trait::async_trait;
use futures::StreamExt;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::{KvStore, Namespace, ScanStream};
use crate::error::VaultError;

/// Configuration for the sled store
#[derive(Debug, Clone)]
pub struct SledStoreConfig {
    /// Path to sled database directory
    pub db_path: PathBuf,
    /// Cache size in bytes
    pub cache_capacity: u64,
    /// Flush to disk after every put/delete
    pub flush_on_write: bool,
}

impl Default for SledStoreConfig {
    fn default() -> Self {
        Self {
            db_path: crate::config::default_storage_dir().join("vault.sled"),
            cache_capacity: 64 * 1024 * 1024, // 64MB
            flush_on_write: true,
        }
    }
}

/// Durable store backed by sled
pub struct SledStore {
    db: sled::Db,
    data: sled::Tree,
    meta: sled::Tree,
    flush_on_write: bool,
}

impl SledStore {
    /// Open or create the store
    pub async fn open(config: SledStoreConfig) -> Result<Self, VaultError> {
        if let Some(parent) = config.db_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let db = sled::Config::new()
            .path(&config.db_path)
            .cache_capacity(config.cache_capacity)
            .mode(sled::Mode::HighThroughput)
            .open()?;

        let data = db.open_tree(Namespace::Data.as_str())?;
        let meta = db.open_tree(Namespace::Meta.as_str())?;

        info!(
            path = %config.db_path.display(),
            payloads = data.len(),
            descriptors = meta.len(),
            "Opened vault store"
        );

        Ok(Self {
            db,
            data,
            meta,
            flush_on_write: config.flush_on_write,
        })
    }

    /// Open a store at a specific path with default settings
    pub async fn at_path(path: impl AsRef<Path>) -> Result<Self, VaultError> {
        Self::open(SledStoreConfig {
            db_path: path.as_ref().to_path_buf(),
            ..Default::default()
        })
        .await
    }

    fn tree(&self, ns: Namespace) -> &sled::Tree {
        match ns {
            Namespace::Data => &self.data,
            Namespace::Meta => &self.meta,
        }
    }

    async fn maybe_flush(&self) -> Result<(), VaultError> {
        if self.flush_on_write {
            self.db.flush_async().await?;
        }
        Ok(())
    }
}

#[async_trait]
impl KvStore for SledStore {
    async fn put(&self, ns: Namespace, key: &str, value: Vec<u8>) -> Result<(), VaultError> {
        let size = value.len();
        self.tree(ns).insert(key.as_bytes(), value)?;
        debug!(namespace = %ns, key = %key, size, "Put row");
        self.maybe_flush().await
    }

    async fn get(&self, ns: Namespace, key: &str) -> Result<Option<Vec<u8>>, VaultError> {
        Ok(self.tree(ns).get(key.as_bytes())?.map(|v| v.to_vec()))
    }

    async fn delete(&self, ns: Namespace, key: &str) -> Result<(), VaultError> {
        if self.tree(ns).remove(key.as_bytes())?.is_some() {
            debug!(namespace = %ns, key = %key, "Deleted row");
            self.maybe_flush().await?;
        }
        Ok(())
    }

    fn scan_all(&self, ns: Namespace) -> ScanStream {
        let iter = self.tree(ns).iter().map(|item| -> Result<_, VaultError> {
            let (key, value) = item?;
            Ok((String::from_utf8_lossy(&key).into_owned(), value.to_vec()))
        });
        futures::stream::iter(iter).boxed()
    }

    async fn flush(&self) -> Result<(), VaultError> {
        self.db.flush_async().await?;
        Ok(())
    }
}
