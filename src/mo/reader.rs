//! The catalog lookup engine.

use std::cmp::Ordering;
use std::path::Path;
use std::sync::{Mutex, OnceLock};

use log::{info, warn};

use super::context;
use super::error::MoError;
use super::header::{Endianness, MoHeader};
use super::plural::PluralRule;
use super::source::{ByteSource, FileSource};
use super::tables::{CacheMap, IndexTables};

/// A reader for compiled gettext message catalogs.
///
/// Construction reads only the 20-byte header and never fails: if the
/// source is unusable or the magic bytes do not match, the reader enters
/// pass-through mode, where every lookup returns its input unchanged (or
/// the simple `n != 1` plural fallback). The cause is kept on the reader
/// and can be inspected with [`catalog_error`](Self::catalog_error).
///
/// Two lookup strategies are available. With caching enabled (the
/// default), the first lookup reads every entry once into a hash map.
/// With caching disabled, each lookup binary-searches the on-disk index
/// tables and reads only the strings it touches, the right trade-off
/// for very large catalogs that are consulted rarely.
///
/// Index tables and the cache load lazily, at most once, even when the
/// reader is shared across threads.
pub struct MoReader {
    source: Option<Mutex<Box<dyn ByteSource>>>,
    header: Option<MoHeader>,
    enable_cache: bool,
    error: Option<MoError>,

    tables: OnceLock<Option<IndexTables>>,
    cache: OnceLock<Option<CacheMap>>,
    plural: OnceLock<PluralRule>,
}

impl MoReader {
    /// Build a reader over an arbitrary byte source.
    ///
    /// `enable_cache` selects the full in-memory cache strategy; pass
    /// `false` to binary-search the index tables on demand instead.
    pub fn new(mut source: Box<dyn ByteSource>, enable_cache: bool) -> Self {
        match MoHeader::parse(&mut *source) {
            Ok(header) => {
                info!(
                    "Catalog opened: {} entries, revision {}",
                    header.total, header.revision
                );
                Self {
                    source: Some(Mutex::new(source)),
                    header: Some(header),
                    enable_cache,
                    error: None,
                    tables: OnceLock::new(),
                    cache: OnceLock::new(),
                    plural: OnceLock::new(),
                }
            }
            Err(e) => {
                warn!("Not a usable catalog, entering pass-through mode: {}", e);
                Self::degraded(Some(e), enable_cache)
            }
        }
    }

    /// Open a catalog file with the default full-cache strategy.
    ///
    /// A missing or unreadable file yields a pass-through reader, not an
    /// error; lookups simply return their input.
    pub fn open(path: impl AsRef<Path>) -> Self {
        Self::open_with_cache(path, true)
    }

    /// Open a catalog file with an explicit cache strategy.
    pub fn open_with_cache(path: impl AsRef<Path>, enable_cache: bool) -> Self {
        match FileSource::open(path) {
            Ok(source) => Self::new(Box::new(source), enable_cache),
            Err(e) => {
                warn!("Catalog source unavailable, entering pass-through mode: {}", e);
                Self::degraded(Some(e), enable_cache)
            }
        }
    }

    /// A reader with no catalog at all; every lookup passes through.
    pub fn passthrough() -> Self {
        Self::degraded(None, true)
    }

    fn degraded(error: Option<MoError>, enable_cache: bool) -> Self {
        Self {
            source: None,
            header: None,
            enable_cache,
            error,
            tables: OnceLock::new(),
            cache: OnceLock::new(),
            plural: OnceLock::new(),
        }
    }

    /// True when no valid catalog is behind this reader.
    pub fn is_passthrough(&self) -> bool {
        self.header.is_none()
    }

    /// The construction-time failure that forced pass-through mode, if any.
    pub fn catalog_error(&self) -> Option<&MoError> {
        self.error.as_ref()
    }

    /// Format revision from the catalog header.
    pub fn revision(&self) -> Option<u32> {
        self.header.map(|h| h.revision)
    }

    /// Total number of entries, including the reserved metadata entry.
    pub fn total_entries(&self) -> u32 {
        self.header.map(|h| h.total).unwrap_or(0)
    }

    /// Byte order of the catalog.
    pub fn endianness(&self) -> Option<Endianness> {
        self.header.map(|h| h.endianness)
    }

    /// Translate a message, returning it unchanged when the catalog has
    /// no entry for it.
    pub fn translate(&self, msgid: &str) -> String {
        if self.is_passthrough() {
            return msgid.to_string();
        }
        match self.lookup(msgid.as_bytes()) {
            Some(translation) => String::from_utf8_lossy(&translation).into_owned(),
            None => msgid.to_string(),
        }
    }

    /// Translate a message with plural forms.
    ///
    /// The catalog key is `singular \0 plural`; the stored translation
    /// holds every plural form NUL-separated, and the catalog's
    /// Plural-Forms rule picks one for `n`. On a miss (or in pass-through
    /// mode) this falls back to `plural` when `n != 1`, else `singular`.
    pub fn translate_plural(&self, singular: &str, plural: &str, n: u64) -> String {
        let fallback = || {
            if n != 1 { plural } else { singular }.to_string()
        };
        if self.is_passthrough() {
            return fallback();
        }

        let select = self.plural_rule().select(n);

        let mut key = Vec::with_capacity(singular.len() + 1 + plural.len());
        key.extend_from_slice(singular.as_bytes());
        key.push(0);
        key.extend_from_slice(plural.as_bytes());

        match self.lookup(&key) {
            Some(stored) => {
                let forms: Vec<&[u8]> = stored.split(|b| *b == 0).collect();
                // A rule can promise more forms than the entry stores.
                let index = select.min(forms.len() - 1);
                String::from_utf8_lossy(forms[index]).into_owned()
            }
            None => fallback(),
        }
    }

    /// Translate a context-scoped message.
    ///
    /// If the lookup misses, the encoded key echoes back still carrying
    /// the 0x04 separator, and the bare `msgid` is returned instead.
    pub fn translate_context(&self, ctx: &str, msgid: &str) -> String {
        let ret = self.translate(&context::encode(ctx, msgid));
        if context::is_unresolved(&ret) {
            msgid.to_string()
        } else {
            ret
        }
    }

    /// Translate a context-scoped message with plural forms.
    ///
    /// The context qualifies the singular only; the plural half of the
    /// key stays bare. The same 0x04 sentinel check applies to the result.
    pub fn translate_context_plural(
        &self,
        ctx: &str,
        singular: &str,
        plural: &str,
        n: u64,
    ) -> String {
        let ret = self.translate_plural(&context::encode(ctx, singular), plural, n);
        if context::is_unresolved(&ret) {
            singular.to_string()
        } else {
            ret
        }
    }

    /// The plural rule extracted from the catalog metadata, memoized.
    pub fn plural_rule(&self) -> &PluralRule {
        self.plural.get_or_init(|| {
            let metadata = self.metadata().unwrap_or_default();
            PluralRule::from_metadata(&metadata)
        })
    }

    /// The catalog metadata header (entry 0's translation): `key: value`
    /// lines such as `Content-Type` and `Plural-Forms`.
    pub fn metadata(&self) -> Option<String> {
        if self.enable_cache {
            let cache = self.cache()?;
            cache
                .get(&b""[..])
                .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
        } else {
            let tables = self.tables()?;
            if tables.is_empty() {
                return None;
            }
            let mut source = self.lock_source()?;
            tables
                .translation(&mut **source, 0)
                .ok()
                .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
        }
    }

    /// Resolve a raw key to its stored translation bytes.
    fn lookup(&self, key: &[u8]) -> Option<Vec<u8>> {
        if self.enable_cache {
            self.cache()?.get(key).cloned()
        } else {
            let tables = self.tables()?;
            let mut source = self.lock_source()?;
            let index = find_string(tables, &mut **source, key)?;
            tables.translation(&mut **source, index).ok()
        }
    }

    /// Index tables, loaded at most once. A load failure parks them as
    /// permanently absent and lookups degrade to identity.
    fn tables(&self) -> Option<&IndexTables> {
        self.tables
            .get_or_init(|| {
                let header = self.header?;
                let mut source = self.lock_source()?;
                match IndexTables::load(&mut **source, &header) {
                    Ok(tables) => Some(tables),
                    Err(e) => {
                        warn!("Failed to load catalog index tables: {}", e);
                        None
                    }
                }
            })
            .as_ref()
    }

    /// Full string cache, built at most once.
    pub(crate) fn cache(&self) -> Option<&CacheMap> {
        if !self.enable_cache {
            return None;
        }
        self.cache
            .get_or_init(|| {
                let tables = self.tables()?;
                let mut source = self.lock_source()?;
                match tables.build_cache(&mut **source) {
                    Ok(cache) => Some(cache),
                    Err(e) => {
                        warn!("Failed to build catalog string cache: {}", e);
                        None
                    }
                }
            })
            .as_ref()
    }

    fn lock_source(&self) -> Option<std::sync::MutexGuard<'_, Box<dyn ByteSource>>> {
        self.source.as_ref()?.lock().ok()
    }
}

/// Binary search for a key over the byte-sorted originals table.
///
/// The window is `[start, end)`. A collapsed window compares its one
/// candidate for exact equality; inverted bounds are swapped and the
/// search retried. Comparison is plain byte order, matching the order
/// the catalog was encoded in, never locale-aware.
fn find_string(
    tables: &IndexTables,
    source: &mut dyn ByteSource,
    target: &[u8],
) -> Option<usize> {
    if tables.is_empty() {
        return None;
    }
    let mut start = 0usize;
    let mut end = tables.len();
    loop {
        if start.abs_diff(end) <= 1 {
            let candidate = tables.original(source, start).ok()?;
            return if candidate == target { Some(start) } else { None };
        }
        if start > end {
            // Should not happen in a well-formed catalog.
            std::mem::swap(&mut start, &mut end);
            continue;
        }
        let half = (start + end) / 2;
        let probe = tables.original(source, half).ok()?;
        match target.cmp(&probe[..]) {
            Ordering::Equal => return Some(half),
            Ordering::Less => end = half,
            Ordering::Greater => start = half,
        }
    }
}
