//! Coordinate, linear index, and byte offset mapping for bottom-up DIB rows.
//!
//! Coordinates are top-left based: `(0, 0)` is the top-left visual pixel.
//! Linear indices follow disk order: index 0 is the left pixel of the bottom
//! visual row, and rows are `stride_bytes` apart.

use alloc::format;

use crate::error::DibError;
use crate::pixel::BitDepth;

/// Width and height of a pixel grid. Both are in `1..=i32::MAX`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ImageSize {
    width: u32,
    height: u32,
}

impl ImageSize {
    pub fn new(width: u32, height: u32) -> Result<Self, DibError> {
        if width == 0 || height == 0 {
            return Err(DibError::InvalidArgument(format!(
                "image dimensions must be nonzero, got {width}x{height}"
            )));
        }
        if width > i32::MAX as u32 || height > i32::MAX as u32 {
            return Err(DibError::InvalidArgument(format!(
                "image dimensions {width}x{height} exceed {}",
                i32::MAX
            )));
        }
        Ok(Self { width, height })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Number of pixels, `width * height`.
    pub fn len(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }

    /// Always false; an `ImageSize` has at least one pixel.
    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn contains(&self, pos: Point) -> bool {
        pos.x >= 0 && pos.y >= 0 && (pos.x as u32) < self.width && (pos.y as u32) < self.height
    }
}

/// A pixel coordinate, top-left origin.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// A rectangular region, top-left origin.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub const fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// The whole image.
    pub fn of(size: ImageSize) -> Self {
        Self::new(0, 0, size.width(), size.height())
    }

    /// Check that the region is non-empty and lies inside `size`.
    pub(crate) fn check_within(&self, size: ImageSize) -> Result<(), DibError> {
        if self.x < 0 || self.y < 0 {
            return Err(DibError::InvalidArgument(format!(
                "area origin ({}, {}) is negative",
                self.x, self.y
            )));
        }
        let right = u64::from(self.x as u32) + u64::from(self.width);
        let bottom = u64::from(self.y as u32) + u64::from(self.height);
        if self.width == 0
            || self.height == 0
            || right > u64::from(size.width())
            || bottom > u64::from(size.height())
        {
            return Err(DibError::OutOfRange(format!(
                "area {}x{} at ({}, {}) does not fit in {}x{}",
                self.width,
                self.height,
                self.x,
                self.y,
                size.width(),
                size.height()
            )));
        }
        Ok(())
    }
}

/// Pure address arithmetic for one `(depth, size)` pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Geometry {
    depth: BitDepth,
    size: ImageSize,
    stride: u64,
}

impl Geometry {
    /// Fails with `DimensionsTooLarge` when the pixel array size overflows `u64`.
    pub fn new(depth: BitDepth, size: ImageSize) -> Result<Self, DibError> {
        let bits = u64::from(size.width()) * u64::from(depth.bits());
        let stride = bits.div_ceil(32) * 4;
        stride
            .checked_mul(u64::from(size.height()))
            .ok_or(DibError::DimensionsTooLarge {
                width: size.width(),
                height: size.height(),
            })?;
        Ok(Self {
            depth,
            size,
            stride,
        })
    }

    pub fn depth(&self) -> BitDepth {
        self.depth
    }

    pub fn size(&self) -> ImageSize {
        self.size
    }

    pub fn pixel_byte_length(&self) -> usize {
        self.depth.byte_length()
    }

    /// Bytes per row including padding; a multiple of 4.
    pub fn stride_bytes(&self) -> u64 {
        self.stride
    }

    /// Bytes per row holding pixel bits, without padding.
    pub fn packed_row_bytes(&self) -> u64 {
        (u64::from(self.size.width()) * u64::from(self.depth.bits())).div_ceil(8)
    }

    pub fn image_byte_length(&self) -> u64 {
        // checked in new()
        self.stride * u64::from(self.size.height())
    }

    /// Number of addressable pixels.
    pub fn len(&self) -> i64 {
        self.size.len() as i64
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    fn check_point(&self, pos: Point) -> Result<(u64, u64), DibError> {
        if pos.x < 0 || pos.y < 0 {
            return Err(DibError::InvalidArgument(format!(
                "negative coordinate ({}, {})",
                pos.x, pos.y
            )));
        }
        let (x, y) = (pos.x as u32, pos.y as u32);
        if x >= self.size.width() || y >= self.size.height() {
            return Err(DibError::OutOfRange(format!(
                "({x}, {y}) outside {}x{}",
                self.size.width(),
                self.size.height()
            )));
        }
        let disk_row = u64::from(self.size.height() - 1 - y);
        Ok((u64::from(x), disk_row))
    }

    fn check_index(&self, index: i64) -> Result<(u64, u64), DibError> {
        if index < 0 || index >= self.len() {
            return Err(DibError::OutOfRange(format!(
                "index {index} outside [0, {})",
                self.len()
            )));
        }
        let w = u64::from(self.size.width());
        let index = index as u64;
        Ok((index % w, index / w))
    }

    /// Linear disk-order index of a coordinate.
    pub fn index_of(&self, pos: Point) -> Result<i64, DibError> {
        let (x, disk_row) = self.check_point(pos)?;
        Ok((disk_row * u64::from(self.size.width()) + x) as i64)
    }

    /// Coordinate of a linear disk-order index.
    pub fn position_of(&self, index: i64) -> Result<Point, DibError> {
        let (col, disk_row) = self.check_index(index)?;
        let y = u64::from(self.size.height()) - 1 - disk_row;
        Ok(Point::new(col as i32, y as i32))
    }

    /// Byte offset of a coordinate, relative to the start of the pixel array.
    pub fn byte_offset_of(&self, pos: Point) -> Result<u64, DibError> {
        let (x, disk_row) = self.check_point(pos)?;
        Ok(self.offset(x, disk_row))
    }

    /// Byte offset of a linear index, relative to the start of the pixel array.
    pub fn byte_offset_of_index(&self, index: i64) -> Result<u64, DibError> {
        let (col, disk_row) = self.check_index(index)?;
        Ok(self.offset(col, disk_row))
    }

    fn offset(&self, col: u64, disk_row: u64) -> u64 {
        self.stride * disk_row + (col * u64::from(self.depth.bits())) / 8
    }

    /// Right shift that moves pixel `x` to the low bits of its byte.
    ///
    /// The leftmost pixel of a byte sits in its most significant bits.
    /// Byte-aligned depths always return 0.
    pub fn bit_shift_of(&self, x: u32) -> u32 {
        let bits = u32::from(self.depth.bits());
        if bits >= 8 {
            return 0;
        }
        8 - bits - (x * bits) % 8
    }

    /// Whether `index` is the last pixel of its row.
    pub(crate) fn ends_row(&self, index: i64) -> bool {
        (index as u64 + 1) % u64::from(self.size.width()) == 0
    }
}
