//! Restore orchestration
//!
//! A restore is a straight pipeline that stops at the first failure:
//!
//! ```text
//! fetch -> (convert if formats differ) -> find open slot -> write
//! ```
//!
//! The container is only touched by the final write, so any failure before
//! it leaves the container exactly as it was.

use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::VaultError;
use crate::record::{ConversionError, EntityRecord, FormatConverter, RecordCodec, SaveContainer};
use crate::repository::BackupRepository;

/// Why a restore did not happen
#[derive(Error, Debug)]
pub enum RestoreFailure {
    #[error("backup not found or unreadable")]
    NotFound,

    #[error("no target container")]
    NoContainer,

    #[error("conversion failed: {0}")]
    ConversionFailed(#[source] ConversionError),

    #[error("container has no open slot")]
    NoOpenSlot,

    #[error("storage error: {0}")]
    Storage(#[from] VaultError),
}

/// Where a restored record landed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RestoreSuccess {
    pub slot: usize,
    /// Whether the record went through the converter
    pub converted: bool,
}

/// Restores backups into save containers
pub struct Restorer<C: RecordCodec> {
    repo: Arc<BackupRepository<C>>,
    converter: Box<dyn FormatConverter<C::Record>>,
}

impl<C: RecordCodec> Restorer<C> {
    pub fn new<V>(repo: Arc<BackupRepository<C>>, converter: V) -> Self
    where
        V: FormatConverter<C::Record> + 'static,
    {
        Self {
            repo,
            converter: Box::new(converter),
        }
    }

    pub fn repository(&self) -> &Arc<BackupRepository<C>> {
        &self.repo
    }

    /// Restore a backup into the first open slot of `container`
    pub async fn restore<S>(
        &self,
        id: Uuid,
        container: Option<&mut S>,
    ) -> Result<RestoreSuccess, RestoreFailure>
    where
        S: SaveContainer<Record = C::Record>,
    {
        let context = container.as_ref().map(|c| c.expected_format());
        let mut record = self
            .repo
            .lookup(id, context)
            .await?
            .into_option()
            .ok_or(RestoreFailure::NotFound)?;

        let container = container.ok_or(RestoreFailure::NoContainer)?;

        let target = container.expected_format();
        let converted = record.format() != target;
        if converted {
            let from = record.format();
            record = self
                .converter
                .convert(record, target)
                .map_err(RestoreFailure::ConversionFailed)?;
            info!(id = %id, from = %from, to = %target, "Converted record for restore");
        }

        let slot = container.next_open_slot().ok_or(RestoreFailure::NoOpenSlot)?;
        container.write_at(slot, record)?;

        info!(id = %id, slot, converted, "Restored backup");
        Ok(RestoreSuccess { slot, converted })
    }

    /// Restore a backup, reporting only whether it worked
    pub async fn restore_to_container<S>(&self, id: Uuid, container: Option<&mut S>) -> bool
    where
        S: SaveContainer<Record = C::Record>,
    {
        match self.restore(id, container).await {
            Ok(_) => true,
            Err(e) => {
                warn!(id = %id, reason = %e, "Restore failed");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::SlotContainer;
    use crate::record::{BasicCodec, BasicRecord, DefaultNamer, RecordFormat, StrictConverter};
    use crate::store::{KvStore, MemoryStore, Namespace};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn restorer() -> Restorer<BasicCodec> {
        let repo = BackupRepository::new(Arc::new(MemoryStore::new()), BasicCodec, DefaultNamer);
        Restorer::new(Arc::new(repo), StrictConverter)
    }

    /// Converter that counts calls and never succeeds
    struct CountingConverter(Arc<AtomicUsize>);

    impl FormatConverter<BasicRecord> for CountingConverter {
        fn convert(
            &self,
            _record: BasicRecord,
            _target: RecordFormat,
        ) -> Result<BasicRecord, ConversionError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Err(ConversionError::Incompatible("counting only".to_string()))
        }
    }

    #[tokio::test]
    async fn test_restore_same_format_skips_conversion() {
        let calls = Arc::new(AtomicUsize::new(0));
        let repo = Arc::new(BackupRepository::new(
            Arc::new(MemoryStore::new()),
            BasicCodec,
            DefaultNamer,
        ));
        let restorer = Restorer::new(repo.clone(), CountingConverter(calls.clone()));

        let record = BasicRecord::new(RecordFormat::Pk7, 25, &[1, 2, 3]);
        let entry = repo.save(Some(record.clone())).await.unwrap();

        let mut container = SlotContainer::<BasicRecord>::new(RecordFormat::Pk7, 3);
        let outcome = restorer.restore(entry.id, Some(&mut container)).await.unwrap();

        assert_eq!(outcome, RestoreSuccess { slot: 0, converted: false });
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(container.get(0), Some(&record));
    }

    #[tokio::test]
    async fn test_restore_converts_between_formats() {
        let restorer = restorer();
        let entry = restorer
            .repository()
            .save(Some(BasicRecord::new(RecordFormat::Pk6, 700, &[])))
            .await
            .unwrap();

        let mut container = SlotContainer::<BasicRecord>::new(RecordFormat::Pk7, 1);
        let outcome = restorer.restore(entry.id, Some(&mut container)).await.unwrap();

        assert!(outcome.converted);
        let restored = container.get(0).unwrap();
        assert_eq!(restored.format(), RecordFormat::Pk7);
        assert_eq!(restored.species(), 700);
    }

    #[tokio::test]
    async fn test_conversion_failure() {
        let restorer = restorer();
        let entry = restorer
            .repository()
            .save(Some(BasicRecord::new(RecordFormat::Pk3, 1, &[])))
            .await
            .unwrap();

        let mut container = SlotContainer::<BasicRecord>::new(RecordFormat::Pk9, 1);
        let result = restorer.restore(entry.id, Some(&mut container)).await;

        assert!(matches!(result, Err(RestoreFailure::ConversionFailed(_))));
        assert_eq!(container.occupied(), 0);
        assert!(!restorer.restore_to_container(entry.id, Some(&mut container)).await);
    }

    #[tokio::test]
    async fn test_payload_without_descriptor_is_not_restored() {
        let store = Arc::new(MemoryStore::new());
        let repo = Arc::new(BackupRepository::new(store.clone(), BasicCodec, DefaultNamer));
        let restorer = Restorer::new(repo.clone(), StrictConverter);

        let entry = repo
            .save(Some(BasicRecord::new(RecordFormat::Pk3, 1, &[])))
            .await
            .unwrap();
        // Only the descriptor is gone, as after a crash mid-delete
        store.delete(Namespace::Meta, &entry.key()).await.unwrap();

        let mut container = SlotContainer::<BasicRecord>::new(RecordFormat::Pk9, 1);
        let result = restorer.restore(entry.id, Some(&mut container)).await;
        assert!(matches!(result, Err(RestoreFailure::NotFound)));
        assert_eq!(container.occupied(), 0);
    }

    #[tokio::test]
    async fn test_full_container_is_unchanged() {
        let restorer = restorer();
        let entry = restorer
            .repository()
            .save(Some(BasicRecord::new(RecordFormat::Pk7, 1, &[])))
            .await
            .unwrap();

        let occupant = BasicRecord::new(RecordFormat::Pk7, 2, &[]);
        let mut container = SlotContainer::<BasicRecord>::new(RecordFormat::Pk7, 1);
        container.write_at(0, occupant.clone()).unwrap();

        let result = restorer.restore(entry.id, Some(&mut container)).await;
        assert!(matches!(result, Err(RestoreFailure::NoOpenSlot)));
        assert_eq!(container.get(0), Some(&occupant));
    }

    #[tokio::test]
    async fn test_missing_backup_or_container() {
        let restorer = restorer();
        let mut container = SlotContainer::<BasicRecord>::new(RecordFormat::Pk7, 1);

        let result = restorer.restore(Uuid::new_v4(), Some(&mut container)).await;
        assert!(matches!(result, Err(RestoreFailure::NotFound)));

        let entry = restorer
            .repository()
            .save(Some(BasicRecord::new(RecordFormat::Pk7, 1, &[])))
            .await
            .unwrap();
        let result = restorer
            .restore::<SlotContainer<BasicRecord>>(entry.id, None)
            .await;
        assert!(matches!(result, Err(RestoreFailure::NoContainer)));

        assert!(restorer.restore_to_container(entry.id, Some(&mut container)).await);
        assert_eq!(container.occupied(), 1);
    }
}
