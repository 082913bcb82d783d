//! Core MO catalog reader module

pub mod context;
pub mod error;
pub mod export;
pub mod header;
pub mod plural;
pub mod source;
pub mod tables;

mod reader;

pub use error::{MoError, Result};
pub use export::export_catalog;
pub use header::{Endianness, MoHeader};
pub use plural::PluralRule;
pub use reader::MoReader;
pub use source::{ByteSource, FileSource, MemSource};
