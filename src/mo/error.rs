//! Custom error types for the mo-reader crate.

use thiserror::Error;

/// The primary error type for all operations in this crate.
///
/// Lookup operations never surface these to the caller: once a reader is
/// constructed, every failure path degrades to returning the input string
/// (or the simple plural fallback). The construction-time error, if any,
/// is kept on the reader and can be inspected with
/// [`MoReader::catalog_error`](super::MoReader::catalog_error).
#[derive(Debug, Error)]
pub enum MoError {
    /// An error originating from I/O operations.
    #[error("I/O error: {0:?}")]
    Io(#[from] std::io::Error),

    /// The first four bytes match neither MO magic sequence.
    #[error("Bad magic bytes {0:02x?}: not an MO catalog")]
    BadMagic([u8; 4]),

    /// The byte source returned fewer bytes than requested.
    #[error("Truncated read: expected {expected} bytes, got {found}")]
    TruncatedRead { expected: usize, found: usize },

    /// A Plural-Forms expression could not be parsed.
    #[error("Unparseable plural rule: {0}")]
    PluralParse(String),

    /// The export utility could not produce its output.
    #[error("Export failed: {0}")]
    Export(String),
}

/// A convenience `Result` type alias using the crate's `MoError` type.
pub type Result<T> = std::result::Result<T, MoError>;
