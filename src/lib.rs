//! # zendib
//!
//! Windows DIB/BMP codec with cursor-based pixel access.
//!
//! A DIB stores its pixel array bottom-up: the first scanline on disk is the
//! bottom row of the image, and every scanline is padded to a multiple of 4
//! bytes. This crate maps between top-left `(x, y)` coordinates and those
//! on-disk byte offsets, converts packed pixel values to and from RGB, and
//! wraps both in façades for the four header generations.
//!
//! ## Layers
//!
//! - [`Geometry`]: pure coordinate / linear index / byte offset arithmetic.
//! - [`PixelData`]: one packed pixel value, tagged by [`BitDepth`].
//! - [`scan::PixelCursor`] and [`scan::PixelWriter`]: read and write paths
//!   over any [`DibStream`].
//! - [`DibBitmap`] ([`CoreBitmap`], [`InfoBitmap`], [`V4Bitmap`],
//!   [`V5Bitmap`]): palette and compression policy per header generation.
//! - [`DecodeRequest`], [`EncodeRequest`], [`ImageInfo`]: byte-slice API with
//!   [`Limits`] and cooperative cancellation.
//!
//! ## Supported data
//!
//! - Read: uncompressed 1/4/8-bit indexed, 16/24/32-bit direct color, and
//!   16/32-bit `BI_BITFIELDS` / `BI_ALPHABITFIELDS`
//! - Write: 16/24/32-bit direct color (24-bit only for Core headers)
//!
//! ## Non-Goals
//!
//! - RLE4/RLE8/JPEG/PNG payloads (reported as `NotImplemented`)
//! - Writing indexed images
//! - Color management beyond passing header fields through
//! - Top-down (negative height) images
//!
//! ## Usage
//!
//! ```no_run
//! use zendib::{BitDepth, DecodeRequest, EncodeRequest, HeaderVariant, ImageInfo};
//! use enough::Unstoppable;
//!
//! let data: &[u8] = &[]; // your BMP bytes
//!
//! // Probe without decoding
//! let info = ImageInfo::from_bytes(data)?;
//! println!("{}x{} {:?}", info.width, info.height, info.variant);
//!
//! let decoded = DecodeRequest::new(data).decode(Unstoppable)?;
//!
//! let encoded = EncodeRequest::new(HeaderVariant::Info, BitDepth::Bit24)
//!     .encode(decoded.image.as_ref(), Unstoppable)?;
//! # Ok::<(), zendib::DibError>(())
//! ```
//!
//! Random access goes through a façade:
//!
//! ```no_run
//! use zendib::{InfoBitmap, MemoryStream, Point};
//!
//! let bytes: Vec<u8> = Vec::new(); // your BMP bytes
//! let mut bmp = InfoBitmap::open(MemoryStream::from_vec(bytes))?;
//! let top_left = bmp.get_pixel(Point::new(0, 0))?;
//! bmp.set_pixel(Point::new(0, 0), rgb::RGB8::new(255, 0, 0))?;
//! # let _ = top_left;
//! # Ok::<(), zendib::DibError>(())
//! ```

#![cfg_attr(not(feature = "std"), no_std)]
#![forbid(unsafe_code)]

extern crate alloc;

mod bitmap;
mod decode;
mod encode;
mod error;
mod geometry;
pub mod headers;
mod info;
mod limits;
mod loader;
mod pixel;
pub mod scan;
mod stream;

// Re-exports
pub use bitmap::{CoreBitmap, DibBitmap, InfoBitmap, V4Bitmap, V5Bitmap};
pub use decode::{DecodeOutput, DecodeRequest};
pub use encode::EncodeRequest;
pub use enough::{Stop, Unstoppable};
pub use error::DibError;
pub use geometry::{Geometry, ImageSize, Point, Rect};
pub use headers::{Compression, DibHeader, HeaderVariant};
pub use info::ImageInfo;
pub use limits::Limits;
pub use loader::DibLoader;
pub use pixel::{BitDepth, CoreDepths, DepthFamily, PixelData, RgbDepths};
#[cfg(feature = "std")]
pub use stream::FileStream;
pub use stream::{DibStream, MemoryStream, SliceStream};
