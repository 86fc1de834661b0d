//! Save containers that backups can be restored into
//!
//! Slots fill from the lowest index up. A container never reorders or
//! compacts slots, so once a slot is occupied it stays occupied.

use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::VaultError;
use crate::record::{EntityRecord, RecordCodec, RecordFormat, SaveContainer};

/// Fixed-capacity in-memory container
#[derive(Debug, Clone)]
pub struct SlotContainer<R> {
    format: RecordFormat,
    slots: Vec<Option<R>>,
}

impl<R: EntityRecord> SlotContainer<R> {
    pub fn new(format: RecordFormat, capacity: usize) -> Self {
        Self {
            format,
            slots: vec![None; capacity],
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn get(&self, index: usize) -> Option<&R> {
        self.slots.get(index).and_then(Option::as_ref)
    }

    /// Number of occupied slots
    pub fn occupied(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    pub fn is_full(&self) -> bool {
        self.next_open_slot().is_none()
    }
}

impl<R: EntityRecord> SaveContainer for SlotContainer<R> {
    type Record = R;

    fn expected_format(&self) -> RecordFormat {
        self.format
    }

    fn next_open_slot(&self) -> Option<usize> {
        self.slots.iter().position(Option::is_none)
    }

    fn write_at(&mut self, index: usize, record: R) -> Result<(), VaultError> {
        if record.format() != self.format {
            return Err(VaultError::Container(format!(
                "container holds {} records, got {}",
                self.format,
                record.format()
            )));
        }
        let slot = self.slots.get_mut(index).ok_or_else(|| {
            VaultError::Container(format!("slot {} out of range", index))
        })?;
        *slot = Some(record);
        Ok(())
    }
}

/// Container stored as one file per slot: `slot-000.pk7`, `slot-001.pk7`, ...
pub struct DirectoryContainer<C> {
    dir: PathBuf,
    format: RecordFormat,
    capacity: usize,
    codec: C,
}

impl<C: RecordCodec> DirectoryContainer<C> {
    /// Open a directory as a container, creating it if needed
    pub fn open(
        dir: impl AsRef<Path>,
        format: RecordFormat,
        capacity: usize,
        codec: C,
    ) -> Result<Self, VaultError> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            format,
            capacity,
            codec,
        })
    }

    pub fn slot_path(&self, index: usize) -> PathBuf {
        self.dir
            .join(format!("slot-{:03}{}", index, self.format.extension()))
    }

    /// Parse the record stored in a slot
    pub fn read_slot(&self, index: usize) -> Result<Option<C::Record>, VaultError> {
        let path = self.slot_path(index);
        if !path.exists() {
            return Ok(None);
        }
        let bytes = std::fs::read(&path)?;
        Ok(self
            .codec
            .parse(&bytes, self.format.extension(), Some(self.format)))
    }
}

impl<C: RecordCodec> SaveContainer for DirectoryContainer<C> {
    type Record = C::Record;

    fn expected_format(&self) -> RecordFormat {
        self.format
    }

    fn next_open_slot(&self) -> Option<usize> {
        (0..self.capacity).find(|i| !self.slot_path(*i).exists())
    }

    fn write_at(&mut self, index: usize, record: C::Record) -> Result<(), VaultError> {
        if index >= self.capacity {
            return Err(VaultError::Container(format!("slot {} out of range", index)));
        }
        if record.format() != self.format {
            return Err(VaultError::Container(format!(
                "container holds {} records, got {}",
                self.format,
                record.format()
            )));
        }
        let bytes = self
            .codec
            .serialize(&record)
            .ok_or_else(|| VaultError::Container("record has no payload".to_string()))?;

        let path = self.slot_path(index);
        std::fs::write(&path, bytes)?;
        debug!(path = %path.display(), "Wrote container slot");
        Ok(())
    }
}
