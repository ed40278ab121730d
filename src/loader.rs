use alloc::format;
use alloc::vec;

use crate::error::DibError;
use crate::headers::{
    DibHeader, FileHeader, HEADER_OFFSET, HEADER_SIZE_OFFSET, HeaderVariant, InfoHeader,
};
use crate::stream::DibStream;

/// Exclusive owner of a DIB stream, with its file header and header size.
///
/// The loader is move-only: a bitmap takes it by value, and only one bitmap
/// can address a stream at a time.
#[derive(Debug)]
pub struct DibLoader<S: DibStream> {
    stream: S,
    file_header: FileHeader,
    header_size: u32,
}

impl<S: DibStream> DibLoader<S> {
    /// Read the file header and header-size field from `stream`.
    ///
    /// Streams too short to hold both fail with `InvalidFormat`. The
    /// signature is not checked here; see [`DibLoader::is_enabled`].
    pub fn open(mut stream: S) -> Result<Self, DibError> {
        let (file_header, header_size) = read_prefix(&mut stream)?;
        Ok(Self {
            stream,
            file_header,
            header_size,
        })
    }

    /// Whether the stream is usable and starts with a `"BM"` file header.
    pub fn is_enabled(&self) -> bool {
        self.stream.is_ready() && self.file_header.is_valid()
    }

    pub fn file_header(&self) -> &FileHeader {
        &self.file_header
    }

    /// The header-size field at offset 14, including its own 4 bytes.
    pub fn header_size(&self) -> u32 {
        self.header_size
    }

    /// The header generation to parse this stream with.
    ///
    /// Known sizes map exactly. Other sizes of at least 40 bytes are
    /// extended info headers and parse as the largest known generation they
    /// contain.
    pub fn variant(&self) -> Option<HeaderVariant> {
        HeaderVariant::from_size(self.header_size).or(match self.header_size {
            s if s >= HeaderVariant::V5.size() => Some(HeaderVariant::V5),
            s if s >= HeaderVariant::V4.size() => Some(HeaderVariant::V4),
            s if s >= InfoHeader::SIZE => Some(HeaderVariant::Info),
            _ => None,
        })
    }

    /// Parse the header fields as generation `H`.
    ///
    /// Fails with `InvalidFormat` when the stored header is shorter than `H`.
    pub fn read_header<H: DibHeader>(&mut self) -> Result<H, DibError> {
        if self.header_size < H::SIZE {
            return Err(DibError::InvalidFormat(format!(
                "header is {} bytes, {:?} needs {}",
                self.header_size,
                H::VARIANT,
                H::SIZE
            )));
        }
        let mut buf = vec![0u8; (H::SIZE - 4) as usize];
        self.stream.read_at(&mut buf, HEADER_OFFSET)?;
        H::parse(&buf)
    }

    /// Flush the stream and re-read the file header and header size.
    pub fn sync(&mut self) -> Result<(), DibError> {
        self.stream.sync()?;
        let (file_header, header_size) = read_prefix(&mut self.stream)?;
        self.file_header = file_header;
        self.header_size = header_size;
        Ok(())
    }

    pub fn read_at(&mut self, buf: &mut [u8], offset: u64) -> Result<(), DibError> {
        self.stream.read_at(buf, offset)
    }

    pub fn write_at(&mut self, buf: &[u8], offset: u64) -> Result<(), DibError> {
        self.stream.write_at(buf, offset)
    }

    pub fn stream(&self) -> &S {
        &self.stream
    }

    pub(crate) fn stream_mut(&mut self) -> &mut S {
        &mut self.stream
    }

    pub fn into_stream(self) -> S {
        self.stream
    }
}

fn read_prefix<S: DibStream>(stream: &mut S) -> Result<(FileHeader, u32), DibError> {
    let mut buf = [0u8; FileHeader::SIZE + 4];
    stream.read_at(&mut buf, 0).map_err(|e| match e {
        DibError::UnexpectedEof => DibError::InvalidFormat(format!(
            "stream is shorter than {} bytes",
            FileHeader::SIZE + 4
        )),
        other => other,
    })?;
    let file_header = FileHeader::parse(&buf)?;
    let at = HEADER_SIZE_OFFSET as usize;
    let header_size = u32::from_le_bytes([buf[at], buf[at + 1], buf[at + 2], buf[at + 3]]);
    Ok((file_header, header_size))
}
