//! Random-access byte sources feeding the catalog reader.
//!
//! The reader only needs four operations: read exactly `n` bytes, seek to
//! an absolute position, report the current position, and report the total
//! length. Anything that can do that (a file, a byte buffer, a network
//! stream wrapper) can back a catalog.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use super::error::{MoError, Result};

/// A random-access byte reader.
///
/// `read` must return exactly `n` bytes or fail; short reads are errors.
pub trait ByteSource: Send {
    /// Read exactly `n` bytes from the current position.
    fn read(&mut self, n: usize) -> Result<Vec<u8>>;

    /// Seek to an absolute byte offset.
    fn seek(&mut self, pos: u64) -> Result<()>;

    /// The current byte offset.
    fn position(&self) -> u64;

    /// Total length of the underlying data in bytes.
    fn len(&self) -> u64;

    /// True if the underlying data is empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A [`ByteSource`] backed by a file on disk.
#[derive(Debug)]
pub struct FileSource {
    file: File,
    pos: u64,
    length: u64,
}

impl FileSource {
    /// Open a file as a byte source.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let length = file.metadata()?.len();
        Ok(Self {
            file,
            pos: 0,
            length,
        })
    }
}

impl ByteSource for FileSource {
    fn read(&mut self, n: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; n];
        match self.file.read_exact(&mut buf) {
            Ok(()) => {
                self.pos += n as u64;
                Ok(buf)
            }
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                let found = (self.length.saturating_sub(self.pos)) as usize;
                Err(MoError::TruncatedRead { expected: n, found })
            }
            Err(e) => Err(e.into()),
        }
    }

    fn seek(&mut self, pos: u64) -> Result<()> {
        self.pos = self.file.seek(SeekFrom::Start(pos))?;
        Ok(())
    }

    fn position(&self) -> u64 {
        self.pos
    }

    fn len(&self) -> u64 {
        self.length
    }
}

/// A [`ByteSource`] over an in-memory byte buffer.
#[derive(Debug, Clone)]
pub struct MemSource {
    data: Vec<u8>,
    pos: usize,
}

impl MemSource {
    pub fn new(data: impl Into<Vec<u8>>) -> Self {
        Self {
            data: data.into(),
            pos: 0,
        }
    }
}

impl ByteSource for MemSource {
    fn read(&mut self, n: usize) -> Result<Vec<u8>> {
        let end = self.pos.checked_add(n).unwrap_or(usize::MAX);
        if end > self.data.len() {
            return Err(MoError::TruncatedRead {
                expected: n,
                found: self.data.len().saturating_sub(self.pos),
            });
        }
        let buf = self.data[self.pos..end].to_vec();
        self.pos = end;
        Ok(buf)
    }

    fn seek(&mut self, pos: u64) -> Result<()> {
        // Seeking past the end is legal; the next read fails instead.
        self.pos = pos.min(self.data.len() as u64) as usize;
        Ok(())
    }

    fn position(&self) -> u64 {
        self.pos as u64
    }

    fn len(&self) -> u64 {
        self.data.len() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mem_source_reads_exactly() {
        let mut src = MemSource::new(vec![1, 2, 3, 4, 5]);
        assert_eq!(src.read(2).unwrap(), vec![1, 2]);
        assert_eq!(src.position(), 2);
        src.seek(4).unwrap();
        assert_eq!(src.read(1).unwrap(), vec![5]);
        assert!(matches!(
            src.read(1),
            Err(MoError::TruncatedRead {
                expected: 1,
                found: 0
            })
        ));
    }

    #[test]
    fn mem_source_short_read_is_an_error() {
        let mut src = MemSource::new(vec![0u8; 3]);
        assert!(matches!(
            src.read(10),
            Err(MoError::TruncatedRead {
                expected: 10,
                found: 3
            })
        ));
    }
}
