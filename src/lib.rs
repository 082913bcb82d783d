//! # mo-reader
//!
//! A reader for compiled gettext message catalogs (`.mo` files).
//!
//! Decodes the binary catalog format (both byte orders), serves
//! translation lookups with either a full in-memory cache or on-demand
//! binary search over the catalog's index tables, and evaluates the
//! catalog's `Plural-Forms` rule to pick plural variants. A missing or
//! corrupt catalog never breaks the caller: the reader degrades to
//! pass-through mode and returns lookups unchanged.
//!
//! ```no_run
//! use mo_reader::MoReader;
//!
//! let catalog = MoReader::open("locale/de/LC_MESSAGES/app.mo");
//! println!("{}", catalog.translate("Open file"));
//! println!("{}", catalog.translate_plural("one item", "%d items", 5));
//! ```
pub mod mo;

// Re-export the main types for convenience
pub use mo::{
    export_catalog, ByteSource, Endianness, FileSource, MemSource, MoError, MoHeader, MoReader,
    PluralRule, Result,
};
