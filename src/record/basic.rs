//! Reference record format
//!
//! A fixed-layout record close to the party/box structures of the later
//! generations:
//!
//! ```text
//! 0x00..0x06  encryption constant / unused
//! 0x06..0x08  checksum (u16 LE, wrapping sum of u16 LE words from 0x08)
//! 0x08..0x0A  species (u16 LE)
//! 0x0A..      body
//! ```

use super::{
    ConversionError, EntityRecord, FormatConverter, RecordCodec, RecordFormat, RecordNamer,
};

/// Smallest byte length the parser accepts
pub const MIN_RECORD_LEN: usize = 0x10;

const CHECKSUM_OFFSET: usize = 0x06;
const SPECIES_OFFSET: usize = 0x08;

/// Raw record bytes tagged with their format
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasicRecord {
    format: RecordFormat,
    data: Vec<u8>,
}

impl BasicRecord {
    /// Build a record for a species with an arbitrary body. The result is
    /// padded to [`MIN_RECORD_LEN`] and carries a valid checksum.
    pub fn new(format: RecordFormat, species: u16, body: &[u8]) -> Self {
        let mut data = vec![0u8; SPECIES_OFFSET + 2];
        data[SPECIES_OFFSET..SPECIES_OFFSET + 2].copy_from_slice(&species.to_le_bytes());
        data.extend_from_slice(body);
        if data.len() < MIN_RECORD_LEN {
            data.resize(MIN_RECORD_LEN, 0);
        }
        let mut record = Self { format, data };
        record.write_checksum();
        record
    }

    /// Wrap bytes as-is, without length or checksum checks
    pub fn from_raw(format: RecordFormat, data: Vec<u8>) -> Self {
        Self { format, data }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn set_species(&mut self, species: u16) {
        if self.data.len() >= SPECIES_OFFSET + 2 {
            self.data[SPECIES_OFFSET..SPECIES_OFFSET + 2].copy_from_slice(&species.to_le_bytes());
        }
    }

    /// Checksum currently stored in the record
    pub fn stored_checksum(&self) -> Option<u16> {
        read_u16(&self.data, CHECKSUM_OFFSET)
    }

    /// Checksum the record's contents should carry
    pub fn compute_checksum(&self) -> u16 {
        self.data
            .get(SPECIES_OFFSET..)
            .unwrap_or_default()
            .chunks(2)
            .map(|w| u16::from_le_bytes([*w.first().unwrap_or(&0), *w.get(1).unwrap_or(&0)]))
            .fold(0u16, u16::wrapping_add)
    }

    pub fn checksum_valid(&self) -> bool {
        self.stored_checksum() == Some(self.compute_checksum())
    }

    fn write_checksum(&mut self) {
        if self.data.len() >= CHECKSUM_OFFSET + 2 {
            let sum = self.compute_checksum();
            self.data[CHECKSUM_OFFSET..CHECKSUM_OFFSET + 2].copy_from_slice(&sum.to_le_bytes());
        }
    }
}

fn read_u16(data: &[u8], offset: usize) -> Option<u16> {
    data.get(offset..offset + 2)
        .map(|b| u16::from_le_bytes([b[0], b[1]]))
}

impl EntityRecord for BasicRecord {
    fn species(&self) -> u16 {
        read_u16(&self.data, SPECIES_OFFSET).unwrap_or(0)
    }

    fn format(&self) -> RecordFormat {
        self.format
    }
}

/// Codec for [`BasicRecord`]
#[derive(Debug, Clone, Copy, Default)]
pub struct BasicCodec;

impl RecordCodec for BasicCodec {
    type Record = BasicRecord;

    fn refresh_integrity(&self, record: &mut BasicRecord) {
        record.write_checksum();
    }

    fn serialize(&self, record: &BasicRecord) -> Option<Vec<u8>> {
        if record.data.is_empty() {
            None
        } else {
            Some(record.data.clone())
        }
    }

    fn parse(
        &self,
        bytes: &[u8],
        extension_hint: &str,
        _context: Option<RecordFormat>,
    ) -> Option<BasicRecord> {
        if bytes.len() < MIN_RECORD_LEN {
            return None;
        }
        // Every extension names exactly one layout, so the target container
        // never decides the format
        let format = RecordFormat::from_extension(extension_hint)?;
        Some(BasicRecord::from_raw(format, bytes.to_vec()))
    }
}

/// File and species naming without localization tables
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultNamer;

impl<R: EntityRecord> RecordNamer<R> for DefaultNamer {
    fn clean_file_name(&self, record: &R) -> String {
        format!("{:04}{}", record.species(), record.extension())
    }

    fn species_display_name(&self, species: u16) -> String {
        format!("Species #{}", species)
    }
}

/// Converter that only re-tags records between formats sharing a layout
#[derive(Debug, Clone, Copy, Default)]
pub struct StrictConverter;

impl StrictConverter {
    fn same_layout(a: RecordFormat, b: RecordFormat) -> bool {
        use RecordFormat::*;
        a == b || matches!((a, b), (Pk4, Pk5) | (Pk5, Pk4) | (Pk6, Pk7) | (Pk7, Pk6))
    }
}

impl FormatConverter<BasicRecord> for StrictConverter {
    fn convert(
        &self,
        record: BasicRecord,
        target: RecordFormat,
    ) -> Result<BasicRecord, ConversionError> {
        if !Self::same_layout(record.format, target) {
            return Err(ConversionError::Unsupported {
                from: record.format,
                to: target,
            });
        }
        Ok(BasicRecord {
            format: target,
            data: record.data,
        })
    }
}
