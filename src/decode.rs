use enough::Stop;
use imgref::ImgVec;
use rgb::RGB8;

use crate::bitmap::{CoreBitmap, InfoBitmap, V4Bitmap, V5Bitmap};
use crate::error::DibError;
use crate::geometry::{Geometry, ImageSize};
use crate::headers::HeaderVariant;
use crate::info::ImageInfo;
use crate::limits::Limits;
use crate::stream::SliceStream;

/// Decoded image and the header summary it came from.
#[derive(Clone, Debug)]
pub struct DecodeOutput {
    pub image: ImgVec<RGB8>,
    pub info: ImageInfo,
}

impl DecodeOutput {
    pub fn width(&self) -> u32 {
        self.info.width
    }

    pub fn height(&self) -> u32 {
        self.info.height
    }

    pub fn into_image(self) -> ImgVec<RGB8> {
        self.image
    }
}

/// Decode a BMP byte slice to RGB.
#[derive(Clone, Copy, Debug)]
pub struct DecodeRequest<'a> {
    data: &'a [u8],
    limits: Option<&'a Limits>,
}

impl<'a> DecodeRequest<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, limits: None }
    }

    pub fn with_limits(mut self, limits: &'a Limits) -> Self {
        self.limits = Some(limits);
        self
    }

    /// Probe the header, check limits, then decode every pixel.
    ///
    /// An uncompressed pixel array that runs past the end of `data` is
    /// `UnexpectedEof`, reported before any output is allocated.
    pub fn decode(self, stop: impl Stop) -> Result<DecodeOutput, DibError> {
        let info = ImageInfo::from_bytes(self.data)?;
        if let Some(limits) = self.limits {
            limits.check(info.width, info.height)?;
            let out_bytes = u64::from(info.width)
                .checked_mul(u64::from(info.height))
                .and_then(|px| px.checked_mul(3))
                .and_then(|b| usize::try_from(b).ok())
                .ok_or(DibError::DimensionsTooLarge {
                    width: info.width,
                    height: info.height,
                })?;
            limits.check_memory(out_bytes)?;
        }
        if info.compression.is_uncompressed() {
            let size = ImageSize::new(info.width, info.height)?;
            let geometry = Geometry::new(info.bit_depth, size)?;
            let end = u64::from(info.pixel_offset).checked_add(geometry.image_byte_length());
            if end.is_none_or(|end| end > self.data.len() as u64) {
                return Err(DibError::UnexpectedEof);
            }
        }
        stop.check()?;

        let stream = SliceStream::new(self.data);
        let image = match info.variant {
            HeaderVariant::Core => CoreBitmap::open(stream)?.to_imgvec(&stop)?,
            HeaderVariant::Info => InfoBitmap::open(stream)?.to_imgvec(&stop)?,
            HeaderVariant::V4 => V4Bitmap::open(stream)?.to_imgvec(&stop)?,
            HeaderVariant::V5 => V5Bitmap::open(stream)?.to_imgvec(&stop)?,
        };
        Ok(DecodeOutput { image, info })
    }
}
