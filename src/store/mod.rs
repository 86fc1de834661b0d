//! Dual-namespace key-value persistence
//!
//! Backups live in two namespaces that share one key space:
//!
//! ```text
//! data: <uuid> -> raw record bytes
//! meta: <uuid> -> MessagePack descriptor
//! ```
//!
//! Each operation is atomic on its own. There is no transaction spanning two
//! operations, so a crash between a `data` put and the matching `meta` put
//! leaves an orphan row behind. `BackupRepository::reconcile` sweeps those.

pub mod memory;
pub mod sled_store;

use async_trait::async_trait;
use futures::stream::BoxStream;
use std::fmt;

use crate::error::VaultError;

pub use memory::MemoryStore;
pub use sled_store::{SledStore, SledStoreConfig};

/// Logical partition of the key space
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Namespace {
    /// Raw payload bytes
    Data,
    /// Descriptor rows
    Meta,
}

impl Namespace {
    pub const ALL: [Namespace; 2] = [Namespace::Data, Namespace::Meta];

    /// Name of the namespace as persisted (sled tree name)
    pub fn as_str(&self) -> &'static str {
        match self {
            Namespace::Data => "data",
            Namespace::Meta => "meta",
        }
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lazy scan over one namespace, yielding `(key, value)` pairs
pub type ScanStream = BoxStream<'static, Result<(String, Vec<u8>), VaultError>>;

/// Key-value backend holding both namespaces
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Upsert a value
    async fn put(&self, ns: Namespace, key: &str, value: Vec<u8>) -> Result<(), VaultError>;

    /// Read a value, `None` when the key is absent
    async fn get(&self, ns: Namespace, key: &str) -> Result<Option<Vec<u8>>, VaultError>;

    /// Remove a value; removing an absent key is a no-op
    async fn delete(&self, ns: Namespace, key: &str) -> Result<(), VaultError>;

    /// Scan every row of a namespace. Order is unspecified and each call
    /// starts over from the beginning.
    fn scan_all(&self, ns: Namespace) -> ScanStream;

    /// Push buffered writes to durable storage
    async fn flush(&self) -> Result<(), VaultError> {
        Ok(())
    }
}
