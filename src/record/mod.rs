//! Record collaborators
//!
//! The vault does not understand creature data itself. It talks to four
//! seams:
//!
//! - [`RecordCodec`] turns bytes into records and back, and refreshes the
//!   record's own checksum before serialization
//! - [`RecordNamer`] produces display names for descriptors
//! - [`FormatConverter`] maps a record between generation formats
//! - [`SaveContainer`] is the slot-based target of a restore
//!
//! [`basic`] provides a small reference implementation of each.

pub mod basic;

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::VaultError;

pub use basic::{BasicCodec, BasicRecord, DefaultNamer, StrictConverter};

/// On-disk record format, one per game generation layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecordFormat {
    Pkm,
    Pk3,
    Pk4,
    Pk5,
    Pk6,
    Pk7,
    Pk8,
    Pk9,
}

impl RecordFormat {
    pub const ALL: [RecordFormat; 8] = [
        RecordFormat::Pkm,
        RecordFormat::Pk3,
        RecordFormat::Pk4,
        RecordFormat::Pk5,
        RecordFormat::Pk6,
        RecordFormat::Pk7,
        RecordFormat::Pk8,
        RecordFormat::Pk9,
    ];

    /// File extension including the leading separator
    pub fn extension(&self) -> &'static str {
        match self {
            RecordFormat::Pkm => ".pkm",
            RecordFormat::Pk3 => ".pk3",
            RecordFormat::Pk4 => ".pk4",
            RecordFormat::Pk5 => ".pk5",
            RecordFormat::Pk6 => ".pk6",
            RecordFormat::Pk7 => ".pk7",
            RecordFormat::Pk8 => ".pk8",
            RecordFormat::Pk9 => ".pk9",
        }
    }

    /// Detect the format from an extension; the leading `.` and case are
    /// ignored
    pub fn from_extension(ext: &str) -> Option<Self> {
        let ext = ext.trim().trim_start_matches('.').to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|f| f.extension().trim_start_matches('.') == ext)
    }
}

impl fmt::Display for RecordFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// A structured creature record
pub trait EntityRecord: Clone + Send + Sync + 'static {
    /// National species id
    fn species(&self) -> u16;

    /// Concrete format of this record
    fn format(&self) -> RecordFormat;

    /// Extension used when the record is written out
    fn extension(&self) -> &'static str {
        self.format().extension()
    }
}

/// Record format library
pub trait RecordCodec: Send + Sync + 'static {
    type Record: EntityRecord;

    /// Recompute whatever checksum the format carries
    fn refresh_integrity(&self, record: &mut Self::Record);

    /// Serialized bytes of the record, `None` when it exposes no payload
    fn serialize(&self, record: &Self::Record) -> Option<Vec<u8>>;

    /// Parse bytes back into a record. `extension_hint` selects the parser;
    /// `context` is the format of the container the record is headed for.
    /// Codecs may use it to disambiguate, but the parsed record must keep
    /// the concrete format of its bytes so the restore path can tell when
    /// a conversion is needed.
    fn parse(
        &self,
        bytes: &[u8],
        extension_hint: &str,
        context: Option<RecordFormat>,
    ) -> Option<Self::Record>;
}

/// Display naming for descriptors
pub trait RecordNamer<R>: Send + Sync {
    fn clean_file_name(&self, record: &R) -> String;

    fn species_display_name(&self, species: u16) -> String;
}

/// Why a conversion did not happen
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversionError {
    /// No conversion path between the two formats
    Unsupported { from: RecordFormat, to: RecordFormat },
    /// The record cannot exist in the target format
    Incompatible(String),
}

impl fmt::Display for ConversionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConversionError::Unsupported { from, to } => {
                write!(f, "no conversion from {} to {}", from, to)
            }
            ConversionError::Incompatible(reason) => write!(f, "incompatible record: {}", reason),
        }
    }
}

impl std::error::Error for ConversionError {}

/// Generation format conversion
pub trait FormatConverter<R>: Send + Sync {
    fn convert(&self, record: R, target: RecordFormat) -> Result<R, ConversionError>;
}

/// Slot-based save container that restored records are written into
pub trait SaveContainer {
    type Record;

    /// Format every record in this container must have
    fn expected_format(&self) -> RecordFormat;

    /// Lowest empty slot, `None` when full
    fn next_open_slot(&self) -> Option<usize>;

    /// Store a record at a slot
    fn write_at(&mut self, index: usize, record: Self::Record) -> Result<(), VaultError>;
}
