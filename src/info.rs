use alloc::format;

use crate::error::DibError;
use crate::headers::{
    Compression, CoreHeader, DibHeader, HeaderVariant, InfoHeader, V4Header, V5Header,
};
use crate::loader::DibLoader;
use crate::pixel::BitDepth;
use crate::stream::{DibStream, SliceStream};

/// Header summary of a DIB file, read without touching pixel data.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ImageInfo {
    pub width: u32,
    pub height: u32,
    pub bit_depth: BitDepth,
    pub variant: HeaderVariant,
    pub compression: Compression,
    /// Absolute offset of the pixel array.
    pub pixel_offset: u32,
    /// Declared file size; not validated against the actual length.
    pub file_size: u32,
}

impl ImageInfo {
    /// Probe BMP bytes.
    pub fn from_bytes(data: &[u8]) -> Result<Self, DibError> {
        let mut loader = DibLoader::open(SliceStream::new(data))?;
        Self::from_loader(&mut loader)
    }

    pub(crate) fn from_loader<S: DibStream>(loader: &mut DibLoader<S>) -> Result<Self, DibError> {
        if !loader.file_header().is_valid() {
            return Err(DibError::InvalidFormat("missing BM signature".into()));
        }
        let variant = loader.variant().ok_or_else(|| {
            DibError::InvalidFormat(format!(
                "unsupported header size {}",
                loader.header_size()
            ))
        })?;
        match variant {
            HeaderVariant::Core => probe::<CoreHeader, S>(loader, variant),
            HeaderVariant::Info => probe::<InfoHeader, S>(loader, variant),
            HeaderVariant::V4 => probe::<V4Header, S>(loader, variant),
            HeaderVariant::V5 => probe::<V5Header, S>(loader, variant),
        }
    }
}

fn probe<H: DibHeader, S: DibStream>(
    loader: &mut DibLoader<S>,
    variant: HeaderVariant,
) -> Result<ImageInfo, DibError> {
    let header: H = loader.read_header()?;
    let size = header.image_size()?;
    Ok(ImageInfo {
        width: size.width(),
        height: size.height(),
        bit_depth: header.bit_depth()?,
        variant,
        compression: header.compression(),
        pixel_offset: loader.file_header().pixel_offset,
        file_size: loader.file_header().file_size,
    })
}
