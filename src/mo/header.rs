//! MO catalog header parsing and byte-order detection.

use byteorder::{BigEndian, ByteOrder, LittleEndian};
use log::debug;

use super::error::{MoError, Result};
use super::source::ByteSource;

/// Magic bytes of a big-endian catalog.
pub const MAGIC_BE: [u8; 4] = [0x95, 0x04, 0x12, 0xde];
/// Magic bytes of a little-endian catalog.
pub const MAGIC_LE: [u8; 4] = [0xde, 0x12, 0x04, 0x95];

/// Byte order of a catalog, decided by which magic sequence matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endianness {
    Little,
    Big,
}

impl Endianness {
    /// Decode a u32 from a 4-byte slice in this byte order.
    pub fn read_u32(self, buf: &[u8]) -> u32 {
        match self {
            Endianness::Little => LittleEndian::read_u32(buf),
            Endianness::Big => BigEndian::read_u32(buf),
        }
    }
}

/// Parsed fixed-size MO file header.
///
/// The header is the first 20 bytes of the file:
/// - 4 bytes: magic (selects byte order)
/// - 4 bytes: format revision
/// - 4 bytes: number of strings
/// - 4 bytes: offset of the originals table
/// - 4 bytes: offset of the translations table
#[derive(Debug, Clone, Copy)]
pub struct MoHeader {
    pub endianness: Endianness,
    /// Captured but not validated, for tolerance of future revisions.
    pub revision: u32,
    /// Total number of entries, including the reserved metadata entry 0.
    pub total: u32,
    /// File offset of the originals (length, offset) pair table.
    pub originals_offset: u32,
    /// File offset of the translations (length, offset) pair table.
    pub translations_offset: u32,
}

impl MoHeader {
    /// Size of the header in bytes. Construction never reads past this.
    pub const SIZE: usize = 20;

    /// Parse the header from the start of a byte source.
    ///
    /// Reads exactly [`MoHeader::SIZE`] bytes. A magic mismatch returns
    /// [`MoError::BadMagic`]; callers treat that as "not a catalog"
    /// rather than a fatal condition.
    pub fn parse(source: &mut dyn ByteSource) -> Result<Self> {
        source.seek(0)?;
        let magic = source.read(4)?;

        let endianness = if magic == MAGIC_BE {
            Endianness::Big
        } else if magic == MAGIC_LE {
            Endianness::Little
        } else {
            let mut raw = [0u8; 4];
            raw.copy_from_slice(&magic);
            return Err(MoError::BadMagic(raw));
        };

        let rest = source.read(16)?;
        let header = MoHeader {
            endianness,
            revision: endianness.read_u32(&rest[0..4]),
            total: endianness.read_u32(&rest[4..8]),
            originals_offset: endianness.read_u32(&rest[8..12]),
            translations_offset: endianness.read_u32(&rest[12..16]),
        };

        debug!(
            "Catalog header: {:?}, revision={}, {} entries",
            header.endianness, header.revision, header.total
        );

        Ok(header)
    }
}
