use alloc::format;
use alloc::vec::Vec;

use enough::Stop;
use imgref::ImgRef;
use rgb::RGB8;

use crate::bitmap::DibBitmap;
use crate::error::DibError;
use crate::geometry::{Geometry, ImageSize};
use crate::headers::{
    CoreHeader, DibHeader, FileHeader, HeaderVariant, InfoHeader, V4Header, V5Header,
};
use crate::limits::Limits;
use crate::pixel::BitDepth;
use crate::stream::MemoryStream;

/// Encode an RGB image as an uncompressed BMP file.
#[derive(Clone, Copy, Debug)]
pub struct EncodeRequest<'a> {
    variant: HeaderVariant,
    depth: BitDepth,
    limits: Option<&'a Limits>,
}

impl<'a> EncodeRequest<'a> {
    /// Target header generation and bit depth.
    ///
    /// Only direct-color depths encode: 16/24/32 for Info/V4/V5, 24 for Core.
    pub fn new(variant: HeaderVariant, depth: BitDepth) -> Self {
        Self {
            variant,
            depth,
            limits: None,
        }
    }

    pub fn with_limits(mut self, limits: &'a Limits) -> Self {
        self.limits = Some(limits);
        self
    }

    pub fn encode(self, image: ImgRef<'_, RGB8>, stop: impl Stop) -> Result<Vec<u8>, DibError> {
        let dim = |v: usize| {
            u32::try_from(v)
                .map_err(|_| DibError::InvalidArgument(format!("image dimension {v} too large")))
        };
        let size = ImageSize::new(dim(image.width())?, dim(image.height())?)?;
        let geometry = Geometry::new(self.depth, size)?;
        let total = (FileHeader::SIZE as u64 + u64::from(self.variant.size()))
            .checked_add(geometry.image_byte_length())
            .and_then(|t| usize::try_from(t).ok())
            .ok_or(DibError::DimensionsTooLarge {
                width: size.width(),
                height: size.height(),
            })?;
        if let Some(limits) = self.limits {
            limits.check(size.width(), size.height())?;
            limits.check_memory(total)?;
        }
        stop.check()?;

        match self.variant {
            HeaderVariant::Core => generate::<CoreHeader>(size, self.depth, image, total, &stop),
            HeaderVariant::Info => generate::<InfoHeader>(size, self.depth, image, total, &stop),
            HeaderVariant::V4 => generate::<V4Header>(size, self.depth, image, total, &stop),
            HeaderVariant::V5 => generate::<V5Header>(size, self.depth, image, total, &stop),
        }
    }
}

fn generate<H: DibHeader>(
    size: ImageSize,
    depth: BitDepth,
    image: ImgRef<'_, RGB8>,
    capacity: usize,
    stop: &dyn Stop,
) -> Result<Vec<u8>, DibError> {
    let header = H::for_image(size, depth)?;
    let stream = MemoryStream::from_vec(Vec::with_capacity(capacity));
    let bitmap = DibBitmap::generate(stream, header, image, stop)?.ok_or_else(|| {
        DibError::InvalidFormat("encoded bitmap failed to reopen".into())
    })?;
    Ok(bitmap.into_loader().into_stream().into_inner())
}
