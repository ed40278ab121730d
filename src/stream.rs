//! Random-access byte streams that bitmaps read from and write to.

use alloc::vec::Vec;

use crate::error::DibError;

/// Absolute-offset byte I/O.
///
/// Every call transfers exactly `buf.len()` bytes or fails; there are no
/// short reads.
pub trait DibStream {
    /// Whether the stream can currently service reads and writes.
    fn is_ready(&self) -> bool;

    /// Fill `buf` from `offset`. Running past the end is `UnexpectedEof`.
    fn read_at(&mut self, buf: &mut [u8], offset: u64) -> Result<(), DibError>;

    /// Write all of `buf` at `offset`.
    fn write_at(&mut self, buf: &[u8], offset: u64) -> Result<(), DibError>;

    /// Flush pending writes to the backing store.
    fn sync(&mut self) -> Result<(), DibError> {
        Ok(())
    }
}

impl<T: DibStream + ?Sized> DibStream for &mut T {
    fn is_ready(&self) -> bool {
        (**self).is_ready()
    }

    fn read_at(&mut self, buf: &mut [u8], offset: u64) -> Result<(), DibError> {
        (**self).read_at(buf, offset)
    }

    fn write_at(&mut self, buf: &[u8], offset: u64) -> Result<(), DibError> {
        (**self).write_at(buf, offset)
    }

    fn sync(&mut self) -> Result<(), DibError> {
        (**self).sync()
    }
}

fn span(offset: u64, len: usize) -> Option<(usize, usize)> {
    let start = usize::try_from(offset).ok()?;
    let end = start.checked_add(len)?;
    Some((start, end))
}

// ── In-memory ───────────────────────────────────────────────────────

/// A growable in-memory stream.
///
/// Writes past the end extend the buffer, zero-filling any gap.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MemoryStream {
    data: Vec<u8>,
}

impl MemoryStream {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_vec(data: Vec<u8>) -> Self {
        Self { data }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl From<Vec<u8>> for MemoryStream {
    fn from(data: Vec<u8>) -> Self {
        Self::from_vec(data)
    }
}

impl DibStream for MemoryStream {
    fn is_ready(&self) -> bool {
        true
    }

    fn read_at(&mut self, buf: &mut [u8], offset: u64) -> Result<(), DibError> {
        let (start, end) = span(offset, buf.len()).ok_or(DibError::UnexpectedEof)?;
        let src = self.data.get(start..end).ok_or(DibError::UnexpectedEof)?;
        buf.copy_from_slice(src);
        Ok(())
    }

    fn write_at(&mut self, buf: &[u8], offset: u64) -> Result<(), DibError> {
        let (start, end) = span(offset, buf.len()).ok_or_else(|| {
            DibError::WriteFailed(alloc::format!("offset {offset} is not addressable"))
        })?;
        if end > self.data.len() {
            self.data.resize(end, 0);
        }
        self.data[start..end].copy_from_slice(buf);
        Ok(())
    }
}

/// A read-only view over borrowed bytes.
#[derive(Clone, Copy, Debug)]
pub struct SliceStream<'a> {
    data: &'a [u8],
}

impl<'a> SliceStream<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data }
    }
}

impl DibStream for SliceStream<'_> {
    fn is_ready(&self) -> bool {
        true
    }

    fn read_at(&mut self, buf: &mut [u8], offset: u64) -> Result<(), DibError> {
        let (start, end) = span(offset, buf.len()).ok_or(DibError::UnexpectedEof)?;
        let src = self.data.get(start..end).ok_or(DibError::UnexpectedEof)?;
        buf.copy_from_slice(src);
        Ok(())
    }

    fn write_at(&mut self, _buf: &[u8], offset: u64) -> Result<(), DibError> {
        Err(DibError::WriteFailed(alloc::format!(
            "read-only stream, write at {offset}"
        )))
    }
}

// ── File-backed ─────────────────────────────────────────────────────

#[cfg(feature = "std")]
pub use file::FileStream;

#[cfg(feature = "std")]
mod file {
    use std::fs::{File, OpenOptions};
    use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};
    use std::path::Path;
    use std::string::ToString;

    use super::DibStream;
    use crate::error::DibError;

    /// A stream over a seekable file.
    #[derive(Debug)]
    pub struct FileStream {
        file: File,
    }

    impl FileStream {
        /// Open an existing file for reading and writing.
        pub fn open(path: impl AsRef<Path>) -> Result<Self, DibError> {
            let file = OpenOptions::new().read(true).write(true).open(path)?;
            Ok(Self { file })
        }

        /// Create (or truncate) a file for reading and writing.
        pub fn create(path: impl AsRef<Path>) -> Result<Self, DibError> {
            let file = OpenOptions::new()
                .read(true)
                .write(true)
                .create(true)
                .truncate(true)
                .open(path)?;
            Ok(Self { file })
        }

        pub fn from_file(file: File) -> Self {
            Self { file }
        }

        pub fn into_inner(self) -> File {
            self.file
        }

        fn seek(&mut self, offset: u64) -> Result<(), DibError> {
            self.file
                .seek(SeekFrom::Start(offset))
                .map(|_| ())
                .map_err(|e| DibError::SeekFailed(e.to_string()))
        }
    }

    impl DibStream for FileStream {
        fn is_ready(&self) -> bool {
            true
        }

        fn read_at(&mut self, buf: &mut [u8], offset: u64) -> Result<(), DibError> {
            self.seek(offset)?;
            self.file.read_exact(buf).map_err(|e| match e.kind() {
                ErrorKind::UnexpectedEof => DibError::UnexpectedEof,
                _ => DibError::Io(e),
            })
        }

        fn write_at(&mut self, buf: &[u8], offset: u64) -> Result<(), DibError> {
            self.seek(offset)?;
            self.file
                .write_all(buf)
                .map_err(|e| DibError::WriteFailed(e.to_string()))
        }

        fn sync(&mut self) -> Result<(), DibError> {
            self.file
                .flush()
                .map_err(|e| DibError::WriteFailed(e.to_string()))
        }
    }
}
