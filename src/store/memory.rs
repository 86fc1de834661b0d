//! Volatile in-process store
//!
//! Same contract as the sled store minus durability. Scans iterate over a
//! snapshot taken when the scan starts.

use async_trait::async_trait;
use futures::StreamExt;
use std::collections::HashMap;
use std::sync::RwLock;

use super::{KvStore, Namespace, ScanStream};
use crate::error::VaultError;

#[derive(Default)]
pub struct MemoryStore {
    rows: RwLock<HashMap<Namespace, HashMap<String, Vec<u8>>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rows in a namespace
    pub fn len(&self, ns: Namespace) -> usize {
        self.rows
            .read()
            .map(|rows| rows.get(&ns).map_or(0, HashMap::len))
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        Namespace::ALL.iter().all(|ns| self.len(*ns) == 0)
    }
}

fn poisoned<T>(e: std::sync::PoisonError<T>) -> VaultError {
    VaultError::Internal(format!("Lock poisoned: {}", e))
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn put(&self, ns: Namespace, key: &str, value: Vec<u8>) -> Result<(), VaultError> {
        let mut rows = self.rows.write().map_err(poisoned)?;
        rows.entry(ns).or_default().insert(key.to_string(), value);
        Ok(())
    }

    async fn get(&self, ns: Namespace, key: &str) -> Result<Option<Vec<u8>>, VaultError> {
        let rows = self.rows.read().map_err(poisoned)?;
        Ok(rows.get(&ns).and_then(|t| t.get(key)).cloned())
    }

    async fn delete(&self, ns: Namespace, key: &str) -> Result<(), VaultError> {
        let mut rows = self.rows.write().map_err(poisoned)?;
        if let Some(table) = rows.get_mut(&ns) {
            table.remove(key);
        }
        Ok(())
    }

    fn scan_all(&self, ns: Namespace) -> ScanStream {
        let snapshot: Vec<Result<(String, Vec<u8>), VaultError>> = match self.rows.read() {
            Ok(rows) => rows
                .get(&ns)
                .map(|t| t.iter().map(|(k, v)| Ok((k.clone(), v.clone()))).collect())
                .unwrap_or_default(),
            Err(e) => vec![Err(poisoned(e))],
        };
        futures::stream::iter(snapshot).boxed()
    }
}
