//! Backup entry repository
//!
//! Owns the lifecycle of a backup across both namespaces. Nothing else
//! writes entry rows.
//!
//! Write order matters because the namespaces are not transactional:
//!
//! - `save` writes the payload before the descriptor, so a failure in
//!   between leaves an unlisted payload rather than a descriptor pointing
//!   at nothing
//! - `delete` removes the descriptor first for the same reason
//!
//! Leftover payloads (and descriptors from older or damaged stores) are
//! removed by [`BackupRepository::reconcile`].

use chrono::Utc;
use futures::StreamExt;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::entry::{BackupEntry, MetaRow};
use crate::error::VaultError;
use crate::hash::content_hash;
use crate::record::{EntityRecord, RecordCodec, RecordFormat, RecordNamer};
use crate::store::{KvStore, Namespace, SledStore};

/// Parse a backup id from its canonical string form
pub fn parse_id(value: &str) -> Result<Uuid, VaultError> {
    Uuid::parse_str(value.trim()).map_err(|_| VaultError::InvalidId(value.to_string()))
}

/// Result of a fetch that keeps "missing" and "unparseable" apart
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome<R> {
    Found(R),
    /// No payload, or an empty one
    Missing,
    /// Payload present but the codec rejected it
    Corrupt,
}

impl<R> FetchOutcome<R> {
    pub fn into_option(self) -> Option<R> {
        match self {
            FetchOutcome::Found(record) => Some(record),
            FetchOutcome::Missing | FetchOutcome::Corrupt => None,
        }
    }
}

/// Integrity of a stored payload against its descriptor
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Integrity {
    Intact,
    Mismatch { expected: String, actual: String },
    MissingPayload,
    MissingMetadata,
}

/// Orphans removed by a reconcile pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Keys that had a payload but no descriptor
    pub payload_orphans: Vec<String>,
    /// Keys that had a descriptor but no payload
    pub metadata_orphans: Vec<String>,
}

impl ReconcileReport {
    pub fn removed(&self) -> usize {
        self.payload_orphans.len() + self.metadata_orphans.len()
    }

    pub fn is_clean(&self) -> bool {
        self.removed() == 0
    }
}

/// Backup repository over a dual-namespace store
pub struct BackupRepository<C: RecordCodec> {
    store: Arc<dyn KvStore>,
    codec: C,
    namer: Box<dyn RecordNamer<C::Record>>,
}

impl<C: RecordCodec> BackupRepository<C> {
    pub fn new<N>(store: Arc<dyn KvStore>, codec: C, namer: N) -> Self
    where
        N: RecordNamer<C::Record> + 'static,
    {
        Self {
            store,
            codec,
            namer: Box::new(namer),
        }
    }

    /// Open the sled-backed vault described by `config`
    pub async fn open<N>(config: &Config, codec: C, namer: N) -> Result<Self, VaultError>
    where
        N: RecordNamer<C::Record> + 'static,
    {
        let store = SledStore::open(config.store_config()).await?;
        let repo = Self::new(Arc::new(store), codec, namer);

        if config.reconcile_on_open {
            let report = repo.reconcile().await?;
            if !report.is_clean() {
                warn!(removed = report.removed(), "Removed orphaned rows on open");
            }
        }

        Ok(repo)
    }

    pub fn codec(&self) -> &C {
        &self.codec
    }

    /// Back up a record and return its descriptor
    pub async fn save(&self, record: Option<C::Record>) -> Result<BackupEntry, VaultError> {
        let mut record =
            record.ok_or_else(|| VaultError::Validation("record is required".to_string()))?;

        self.codec.refresh_integrity(&mut record);
        let payload = self.codec.serialize(&record).unwrap_or_default();
        if payload.is_empty() {
            debug!("Record has no payload, storing empty backup");
        }

        let species = record.species();
        let entry = BackupEntry {
            id: Uuid::new_v4(),
            file_name: self.namer.clean_file_name(&record),
            species_name: self.namer.species_display_name(species),
            species,
            extension: record.extension().to_string(),
            created_utc: Utc::now().timestamp(),
            sha256: content_hash(&payload),
        };

        let key = entry.key();
        let row = entry.encode()?;
        let size = payload.len();

        self.store.put(Namespace::Data, &key, payload).await?;
        self.store.put(Namespace::Meta, &key, row).await?;

        info!(
            id = %entry.id,
            species = entry.species,
            size,
            sha256 = %entry.sha256,
            "Saved backup"
        );

        Ok(entry)
    }

    /// All descriptors, in store order. Damaged rows fall back to defaults
    /// or are skipped; they never fail the listing.
    pub async fn list(&self) -> Result<Vec<BackupEntry>, VaultError> {
        let mut rows = self.store.scan_all(Namespace::Meta);
        let mut entries = Vec::new();

        while let Some(item) = rows.next().await {
            let (key, value) = item?;
            match MetaRow::decode(&value) {
                Ok(row) => match row.into_entry(&key) {
                    Some(entry) => entries.push(entry),
                    None => warn!(key = %key, "Skipping descriptor without a usable id"),
                },
                Err(e) => warn!(key = %key, error = %e, "Skipping undecodable descriptor"),
            }
        }

        Ok(entries)
    }

    /// Number of stored descriptors
    pub async fn count(&self) -> Result<usize, VaultError> {
        let mut rows = self.store.scan_all(Namespace::Meta);
        let mut count = 0;
        while let Some(item) = rows.next().await {
            item?;
            count += 1;
        }
        Ok(count)
    }

    /// Descriptor for one backup
    pub async fn get_entry(&self, id: Uuid) -> Result<Option<BackupEntry>, VaultError> {
        let key = id.to_string();
        let Some(value) = self.store.get(Namespace::Meta, &key).await? else {
            return Ok(None);
        };
        match MetaRow::decode(&value) {
            Ok(row) => Ok(row.into_entry(&key)),
            Err(e) => {
                warn!(id = %id, error = %e, "Undecodable descriptor");
                Ok(None)
            }
        }
    }

    /// Fetch and parse a stored record
    pub async fn fetch(&self, id: Uuid) -> Result<Option<C::Record>, VaultError> {
        Ok(self.lookup(id, None).await?.into_option())
    }

    /// Fetch a stored record, telling missing and unparseable payloads
    /// apart. `context` is passed to the codec as the format of the
    /// container the record is going to.
    pub async fn lookup(
        &self,
        id: Uuid,
        context: Option<RecordFormat>,
    ) -> Result<FetchOutcome<C::Record>, VaultError> {
        let key = id.to_string();
        let payload = match self.store.get(Namespace::Data, &key).await? {
            Some(payload) if !payload.is_empty() => payload,
            _ => {
                debug!(id = %id, "No payload for backup");
                return Ok(FetchOutcome::Missing);
            }
        };

        // A payload without a descriptor is an unlisted orphan
        let Some(entry) = self.get_entry(id).await? else {
            debug!(id = %id, "No descriptor for backup payload");
            return Ok(FetchOutcome::Missing);
        };
        let hint = entry.extension;

        match self.codec.parse(&payload, &hint, context) {
            Some(record) => Ok(FetchOutcome::Found(record)),
            None => {
                warn!(id = %id, extension = %hint, "Stored payload could not be parsed");
                Ok(FetchOutcome::Corrupt)
            }
        }
    }

    /// Remove a backup. Removing an unknown id succeeds.
    pub async fn delete(&self, id: Uuid) -> Result<(), VaultError> {
        let key = id.to_string();
        self.store.delete(Namespace::Meta, &key).await?;
        self.store.delete(Namespace::Data, &key).await?;
        info!(id = %id, "Deleted backup");
        Ok(())
    }

    /// Recompute the payload digest and compare it with the descriptor
    pub async fn verify(&self, id: Uuid) -> Result<Integrity, VaultError> {
        let Some(entry) = self.get_entry(id).await? else {
            return Ok(Integrity::MissingMetadata);
        };
        let Some(payload) = self.store.get(Namespace::Data, &entry.key()).await? else {
            return Ok(Integrity::MissingPayload);
        };

        let actual = content_hash(&payload);
        if actual == entry.sha256 {
            Ok(Integrity::Intact)
        } else {
            warn!(id = %id, expected = %entry.sha256, actual = %actual, "Payload hash mismatch");
            Ok(Integrity::Mismatch {
                expected: entry.sha256,
                actual,
            })
        }
    }

    /// Descriptors whose payload digest equals `sha256`
    pub async fn find_by_hash(&self, sha256: &str) -> Result<Vec<BackupEntry>, VaultError> {
        let sha256 = sha256.to_ascii_lowercase();
        Ok(self
            .list()
            .await?
            .into_iter()
            .filter(|entry| entry.sha256 == sha256)
            .collect())
    }

    /// Delete every row that has no counterpart in the other namespace.
    ///
    /// The two namespaces are scanned one after the other, so this must not
    /// run while a `save` or `delete` is in flight on the same store.
    pub async fn reconcile(&self) -> Result<ReconcileReport, VaultError> {
        let data_keys = self.keys(Namespace::Data).await?;
        let meta_keys = self.keys(Namespace::Meta).await?;

        let mut report = ReconcileReport {
            payload_orphans: data_keys.difference(&meta_keys).cloned().collect(),
            metadata_orphans: meta_keys.difference(&data_keys).cloned().collect(),
        };
        report.payload_orphans.sort();
        report.metadata_orphans.sort();

        for key in &report.payload_orphans {
            self.store.delete(Namespace::Data, key).await?;
        }
        for key in &report.metadata_orphans {
            self.store.delete(Namespace::Meta, key).await?;
        }

        info!(
            payload_orphans = report.payload_orphans.len(),
            metadata_orphans = report.metadata_orphans.len(),
            "Reconciled vault"
        );

        Ok(report)
    }

    async fn keys(&self, ns: Namespace) -> Result<HashSet<String>, VaultError> {
        let mut rows = self.store.scan_all(ns);
        let mut keys = HashSet::new();
        while let Some(item) = rows.next().await {
            let (key, _) = item?;
            keys.insert(key);
        }
        Ok(keys)
    }
}
