//! Backup descriptors
//!
//! [`BackupEntry`] is what callers see. [`MetaRow`] is its persisted form in
//! the `meta` namespace: every field is optional on read so a single damaged
//! row degrades to defaults instead of failing a listing.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::VaultError;

/// Fallback for a missing file or species name
pub const UNKNOWN_NAME: &str = "unknown";

/// Descriptor of one stored backup. Fields are a snapshot taken when the
/// backup was created and are never updated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupEntry {
    pub id: Uuid,
    pub file_name: String,
    pub species_name: String,
    pub species: u16,
    /// Includes the leading separator, e.g. `.pkm`
    pub extension: String,
    /// Seconds since the Unix epoch
    pub created_utc: i64,
    /// Lowercase hex SHA256 of the payload
    pub sha256: String,
}

impl BackupEntry {
    /// Store key for this entry in both namespaces
    pub fn key(&self) -> String {
        self.id.to_string()
    }

    pub fn encode(&self) -> Result<Vec<u8>, VaultError> {
        Ok(rmp_serde::to_vec_named(&MetaRow::from(self))?)
    }
}

/// Persisted descriptor row
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MetaRow {
    pub id: Option<String>,
    pub file_name: Option<String>,
    pub species: Option<u16>,
    pub species_name: Option<String>,
    pub extension: Option<String>,
    pub created_utc: Option<i64>,
    pub sha256: Option<String>,
}

impl MetaRow {
    pub fn decode(bytes: &[u8]) -> Result<Self, VaultError> {
        Ok(rmp_serde::from_slice(bytes)?)
    }

    /// Turn a row into an entry, filling gaps with defaults. The store key
    /// is the id; the copy inside the row is only used when the key does not
    /// parse. `None` when neither does.
    pub fn into_entry(self, key: &str) -> Option<BackupEntry> {
        let id = Uuid::parse_str(key)
            .ok()
            .or_else(|| self.id.as_deref().and_then(|s| Uuid::parse_str(s).ok()))?;

        Some(BackupEntry {
            id,
            file_name: self.file_name.unwrap_or_else(|| UNKNOWN_NAME.to_string()),
            species_name: self.species_name.unwrap_or_else(|| UNKNOWN_NAME.to_string()),
            species: self.species.unwrap_or(0),
            extension: self.extension.unwrap_or_default(),
            created_utc: self.created_utc.unwrap_or(0),
            sha256: self.sha256.unwrap_or_default(),
        })
    }
}

impl From<&BackupEntry> for MetaRow {
    fn from(entry: &BackupEntry) -> Self {
        Self {
            id: Some(entry.key()),
            file_name: Some(entry.file_name.clone()),
            species: Some(entry.species),
            species_name: Some(entry.species_name.clone()),
            extension: Some(entry.extension.clone()),
            created_utc: Some(entry.created_utc),
            sha256: Some(entry.sha256.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_entry() -> BackupEntry {
        BackupEntry {
            id: Uuid::new_v4(),
            file_name: "0001.pkm".to_string(),
            species_name: "Species #1".to_string(),
            species: 1,
            extension: ".pkm".to_string(),
            created_utc: 1_700_000_000,
            sha256: "ab".repeat(32),
        }
    }

    #[test]
    fn test_encode_decode_row() {
        let entry = sample_entry();
        let bytes = entry.encode().unwrap();
        let row = MetaRow::decode(&bytes).unwrap();
        assert_eq!(row.into_entry("ignored"), Some(entry));
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let id = Uuid::new_v4();
        let partial = MetaRow {
            species: Some(25),
            ..Default::default()
        };
        let bytes = rmp_serde::to_vec_named(&partial).unwrap();

        let entry = MetaRow::decode(&bytes).unwrap().into_entry(&id.to_string()).unwrap();
        assert_eq!(entry.id, id);
        assert_eq!(entry.species, 25);
        assert_eq!(entry.file_name, UNKNOWN_NAME);
        assert_eq!(entry.species_name, UNKNOWN_NAME);
        assert_eq!(entry.extension, "");
        assert_eq!(entry.created_utc, 0);
        assert_eq!(entry.sha256, "");
    }

    #[test]
    fn test_store_key_wins_over_embedded_id() {
        let entry = sample_entry();
        let key = Uuid::new_v4();
        let row = MetaRow::decode(&entry.encode().unwrap()).unwrap();

        let listed = row.clone().into_entry(&key.to_string()).unwrap();
        assert_eq!(listed.id, key);
        assert_eq!(listed.species, entry.species);

        assert_eq!(row.into_entry("not-a-uuid").unwrap().id, entry.id);
    }

    #[test]
    fn test_unusable_id_is_rejected() {
        let row = MetaRow::default();
        assert!(row.into_entry("not-a-uuid").is_none());
    }

    #[test]
    fn test_row_uses_camel_case_fields() {
        let bytes = sample_entry().encode().unwrap();
        let value: serde_json::Value = rmp_serde::from_slice(&bytes).unwrap();
        for field in ["id", "fileName", "species", "speciesName", "extension", "createdUtc", "sha256"] {
            assert!(value.get(field).is_some(), "missing {}", field);
        }
    }
}
