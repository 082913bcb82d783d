//! Export of a decoded catalog to a persisted table.
//!
//! This is an optional utility layered on top of the lookup engine, not
//! part of the lookup path: it drains a cache-enabled reader, transcodes
//! the table to UTF-8 when the catalog metadata declares another
//! charset, attaches a metadata record, and serializes the result as
//! JSON to any sink. Unlike lookups, export is allowed to fail hard.

use std::collections::BTreeMap;
use std::io::Write;
use std::sync::OnceLock;

use encoding_rs::Encoding;
use log::info;
use regex::Regex;
use serde::Serialize;

use super::error::{MoError, Result};
use super::reader::MoReader;

/// Metadata record attached to an exported table.
#[derive(Debug, Serialize)]
pub struct ExportMeta {
    /// Format revision from the catalog header.
    pub revision: u32,
    /// Entry count from the catalog header.
    pub total_strings: u32,
    /// Number of entries actually exported; sanity check for consumers.
    pub table_size: usize,
    /// Version tag of the export layout itself.
    pub format_version: &'static str,
    /// Encoding of the exported strings. Always UTF-8.
    pub encoding: &'static str,
}

#[derive(Debug, Serialize)]
struct ExportTable {
    meta: ExportMeta,
    entries: BTreeMap<String, String>,
}

/// Serialize a decoded catalog to `out` as UTF-8 JSON.
///
/// The reader must be cache-enabled and backed by a valid catalog;
/// pass-through readers have nothing to export.
pub fn export_catalog<W: Write>(reader: &MoReader, out: &mut W) -> Result<()> {
    if reader.is_passthrough() {
        return Err(MoError::Export(
            "no catalog behind this reader".to_string(),
        ));
    }
    let cache = reader.cache().ok_or_else(|| {
        MoError::Export("catalog table unavailable (is caching enabled?)".to_string())
    })?;

    let metadata = reader.metadata().unwrap_or_default();
    let encoding = declared_encoding(&metadata);

    let mut entries = BTreeMap::new();
    for (original, translation) in cache {
        entries.insert(decode(original, encoding), decode(translation, encoding));
    }

    let table = ExportTable {
        meta: ExportMeta {
            revision: reader.revision().unwrap_or(0),
            total_strings: reader.total_entries(),
            table_size: entries.len(),
            format_version: "A",
            encoding: "UTF-8",
        },
        entries,
    };

    info!(
        "Exporting {} entries (source charset: {})",
        table.meta.table_size,
        encoding.map(Encoding::name).unwrap_or("UTF-8")
    );

    serde_json::to_writer_pretty(&mut *out, &table)
        .map_err(|e| MoError::Export(e.to_string()))?;
    out.write_all(b"\n")?;
    Ok(())
}

/// The charset the catalog declares in its `Content-Type` metadata line,
/// if it is something other than UTF-8.
fn declared_encoding(metadata: &str) -> Option<&'static Encoding> {
    static CONTENT_TYPE_LINE: OnceLock<Regex> = OnceLock::new();
    let re = CONTENT_TYPE_LINE
        .get_or_init(|| Regex::new(r"(?im)^content-type:[ \t]*(.*)$").unwrap());

    let content_type = re.captures(metadata)?[1].to_string();
    let charset = content_type.split(';').find_map(|part| {
        let (prop, value) = part.trim().split_once('=')?;
        prop.trim()
            .eq_ignore_ascii_case("charset")
            .then(|| value.trim().to_string())
    })?;

    if charset.eq_ignore_ascii_case("utf-8") {
        return None;
    }
    Encoding::for_label(charset.as_bytes())
}

fn decode(bytes: &[u8], encoding: Option<&'static Encoding>) -> String {
    match encoding {
        Some(encoding) => {
            let (text, _, _) = encoding.decode(bytes);
            text.into_owned()
        }
        None => String::from_utf8_lossy(bytes).into_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn charset_sniffing() {
        let metadata = "Project-Id-Version: demo\nContent-Type: text/plain; charset=ISO-8859-1\n";
        assert_eq!(
            declared_encoding(metadata).map(Encoding::name),
            Some("windows-1252")
        );
        assert!(declared_encoding("Content-Type: text/plain; charset=UTF-8\n").is_none());
        assert!(declared_encoding("Language: de\n").is_none());
    }

    #[test]
    fn latin1_bytes_decode() {
        let encoding = Encoding::for_label(b"ISO-8859-1");
        assert_eq!(decode(b"caf\xe9", encoding), "café");
    }
}
