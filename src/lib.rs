//! pkvault - content-addressed backups for creature records
//!
//! Individual records are backed up into a local vault and can later be
//! restored into a save container, converting between generation formats
//! when needed.
//!
//! ## Architecture
//!
//! - **Store**: key-value backend with two namespaces sharing one key space,
//!   `data` (raw payload) and `meta` (descriptor)
//! - **Repository**: save/list/fetch/delete across both namespaces, id
//!   assignment, SHA256 fingerprints
//! - **Restorer**: fetch, convert, place into the first open slot
//!
//! Record parsing, naming, conversion and the save container itself are
//! traits in [`record`]; [`record::basic`] and [`container`] hold reference
//! implementations.
//!
//! ## Storage Layout
//!
//! ```text
//! ~/.local/share/pkvault/
//! ├── vault.sled/    # sled database, trees `data` and `meta`
//! └── config.toml    # Configuration
//! ```
//!
//! ## Consistency
//!
//! The two namespaces are written one after the other without a shared
//! transaction. A crash in between leaves an orphan row, which
//! [`BackupRepository::reconcile`] removes.

pub mod config;
pub mod container;
pub mod entry;
pub mod error;
pub mod hash;
pub mod record;
pub mod repository;
pub mod restore;
pub mod store;

// Re-exports
pub use config::Config;
pub use container::{DirectoryContainer, SlotContainer};
pub use entry::BackupEntry;
pub use error::VaultError;
pub use hash::content_hash;
pub use record::{
    EntityRecord, FormatConverter, RecordCodec, RecordFormat, RecordNamer, SaveContainer,
};
pub use repository::{BackupRepository, FetchOutcome, Integrity, ReconcileReport};
pub use restore::{RestoreFailure, RestoreSuccess, Restorer};
pub use store::{KvStore, MemoryStore, Namespace, SledStore};
