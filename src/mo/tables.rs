//! Offset-index tables and the optional full string cache.

use std::collections::HashMap;

use log::debug;

use super::error::Result;
use super::header::MoHeader;
use super::source::ByteSource;

/// One (length, offset) slot in an index table.
///
/// `offset` points at the raw string bytes; `length` is authoritative and
/// the string carries no terminator. When `length` is zero the offset is
/// meaningless and must not be dereferenced.
#[derive(Debug, Clone, Copy)]
pub struct StringSlot {
    pub length: u32,
    pub offset: u32,
}

/// The two parallel index tables of a catalog.
///
/// Index `i` in `originals` and `translations` refer to the same logical
/// entry. The originals table is sorted by raw byte content, which is what
/// makes binary search over it valid.
#[derive(Debug)]
pub struct IndexTables {
    originals: Vec<StringSlot>,
    translations: Vec<StringSlot>,
}

/// Full in-memory map from original bytes to translation bytes.
///
/// Entry 0 lands in here under the empty key: its "translation" is the
/// catalog metadata header, not a real translation.
pub type CacheMap = HashMap<Vec<u8>, Vec<u8>>;

impl IndexTables {
    /// Read both index tables from the source.
    ///
    /// Seeks to each table offset and reads `2 * total` u32 values,
    /// interleaved as (length, offset) pairs.
    pub fn load(source: &mut dyn ByteSource, header: &MoHeader) -> Result<Self> {
        let originals = read_slot_table(source, header, header.originals_offset)?;
        let translations = read_slot_table(source, header, header.translations_offset)?;
        debug!("Index tables loaded: {} entries", originals.len());
        Ok(Self {
            originals,
            translations,
        })
    }

    /// Number of entries in the catalog.
    pub fn len(&self) -> usize {
        self.originals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.originals.is_empty()
    }

    /// Read the original string bytes at entry `index`.
    pub fn original(&self, source: &mut dyn ByteSource, index: usize) -> Result<Vec<u8>> {
        read_slot(source, self.originals[index])
    }

    /// Read the translation string bytes at entry `index`.
    pub fn translation(&self, source: &mut dyn ByteSource, index: usize) -> Result<Vec<u8>> {
        read_slot(source, self.translations[index])
    }

    /// Build the full original -> translation cache in one pass.
    pub fn build_cache(&self, source: &mut dyn ByteSource) -> Result<CacheMap> {
        let mut cache = CacheMap::with_capacity(self.len());
        for i in 0..self.len() {
            let original = self.original(source, i)?;
            let translation = self.translation(source, i)?;
            cache.insert(original, translation);
        }
        debug!("String cache built: {} entries", cache.len());
        Ok(cache)
    }
}

fn read_slot_table(
    source: &mut dyn ByteSource,
    header: &MoHeader,
    table_offset: u32,
) -> Result<Vec<StringSlot>> {
    let total = header.total as usize;
    source.seek(table_offset as u64)?;
    let raw = source.read(total * 8)?;

    let mut slots = Vec::with_capacity(total);
    for pair in raw.chunks_exact(8) {
        slots.push(StringSlot {
            length: header.endianness.read_u32(&pair[0..4]),
            offset: header.endianness.read_u32(&pair[4..8]),
        });
    }
    Ok(slots)
}

/// Read the bytes a slot points at. Zero-length slots yield empty bytes
/// without touching the source.
fn read_slot(source: &mut dyn ByteSource, slot: StringSlot) -> Result<Vec<u8>> {
    if slot.length == 0 {
        return Ok(Vec::new());
    }
    source.seek(slot.offset as u64)?;
    source.read(slot.length as usize)
}
