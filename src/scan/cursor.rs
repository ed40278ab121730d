use core::cmp::Ordering;
use core::fmt;
use core::marker::PhantomData;

use super::{Origin, check_depth, read_pixel};
use crate::error::DibError;
use crate::geometry::{Geometry, ImageSize, Point};
use crate::pixel::{BitDepth, DepthFamily, PixelData, RgbDepths};
use crate::stream::DibStream;

const BEFORE_BEGIN: i64 = -1;

/// Bidirectional cursor over a pixel array that starts `offset` bytes into
/// a stream.
///
/// Positions are linear disk-order indices. Besides the valid range
/// `[0, len)` the cursor has two sentinel states: before-begin (`-1`) and
/// after-end (`len`). Landing on a valid position reads that pixel once and
/// caches it.
///
/// The cache is not invalidated if the stream is modified through another
/// path while the cursor is alive; the cursor's exclusive borrow of the
/// stream normally rules that out.
pub struct PixelCursor<'s, S: DibStream + ?Sized, F: DepthFamily = RgbDepths> {
    stream: &'s mut S,
    offset: u64,
    geometry: Geometry,
    current: i64,
    value: Option<PixelData>,
    _family: PhantomData<F>,
}

impl<'s, S: DibStream + ?Sized, F: DepthFamily> PixelCursor<'s, S, F> {
    /// Open a cursor positioned at [`Origin::Begin`].
    ///
    /// Fails with `InvalidArgument` if `depth` is not part of the family `F`.
    pub fn new(
        stream: &'s mut S,
        offset: u64,
        depth: BitDepth,
        size: ImageSize,
    ) -> Result<Self, DibError> {
        F::check(depth)?;
        let geometry = Geometry::new(depth, size)?;
        let mut cursor = Self {
            stream,
            offset,
            geometry,
            current: BEFORE_BEGIN,
            value: None,
            _family: PhantomData,
        };
        cursor.reset(Origin::Begin)?;
        Ok(cursor)
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    /// Number of addressable pixels.
    pub fn len(&self) -> i64 {
        self.geometry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.geometry.is_empty()
    }

    /// Current linear position, including the sentinels `-1` and `len`.
    pub fn position(&self) -> i64 {
        self.current
    }

    pub fn has_value(&self) -> bool {
        self.current >= 0 && self.current < self.len()
    }

    pub fn is_before_begin(&self) -> bool {
        self.current < 0
    }

    pub fn is_after_end(&self) -> bool {
        self.current >= self.len()
    }

    /// Load the pixel at `index` and move there only if the read succeeds.
    fn land(&mut self, index: i64) -> Result<(), DibError> {
        let value = read_pixel(&mut *self.stream, self.offset, &self.geometry, index)?;
        self.current = index;
        self.value = Some(value);
        Ok(())
    }

    fn park(&mut self, sentinel: i64) {
        self.current = sentinel;
        self.value = None;
    }

    pub fn reset(&mut self, origin: Origin) -> Result<(), DibError> {
        let index = match origin {
            Origin::Begin => 0,
            Origin::End => self.len() - 1,
        };
        self.land(index)
    }

    /// Advance one pixel. Returns false once past the last pixel.
    pub fn next(&mut self) -> Result<bool, DibError> {
        self.next_by(1)
    }

    /// Advance `n` pixels, clamping to the after-end sentinel.
    pub fn next_by(&mut self, n: u64) -> Result<bool, DibError> {
        if self.is_after_end() {
            return Ok(false);
        }
        let target = i64::try_from(n)
            .ok()
            .and_then(|n| self.current.checked_add(n))
            .filter(|&t| t < self.len());
        match target {
            Some(index) => {
                self.land(index)?;
                Ok(true)
            }
            None => {
                self.park(self.len());
                Ok(false)
            }
        }
    }

    /// Step back one pixel. Returns false once before the first pixel.
    pub fn previous(&mut self) -> Result<bool, DibError> {
        self.previous_by(1)
    }

    /// Step back `n` pixels, clamping to the before-begin sentinel.
    pub fn previous_by(&mut self, n: u64) -> Result<bool, DibError> {
        if self.is_before_begin() {
            return Ok(false);
        }
        let target = i64::try_from(n)
            .ok()
            .and_then(|n| self.current.checked_sub(n))
            .filter(|&t| t >= 0);
        match target {
            Some(index) => {
                self.land(index)?;
                Ok(true)
            }
            None => {
                self.park(BEFORE_BEGIN);
                Ok(false)
            }
        }
    }

    /// Move to a coordinate.
    ///
    /// Negative coordinates fail with `InvalidArgument`, coordinates past the
    /// image with `OutOfRange`. On any failure the cursor is left where it was.
    pub fn jump_to(&mut self, pos: Point) -> Result<(), DibError> {
        let index = self.geometry.index_of(pos)?;
        self.land(index)
    }

    /// Move to a linear index; fails with `OutOfRange` outside `[0, len)`.
    pub fn jump_to_index(&mut self, index: i64) -> Result<(), DibError> {
        self.geometry.position_of(index)?;
        self.land(index)
    }

    /// The cached pixel value.
    pub fn current(&self) -> Result<PixelData, DibError> {
        self.value.ok_or_else(|| {
            DibError::InvalidOperation(alloc::format!(
                "cursor at {} has no value (valid range 0..{})",
                self.current,
                self.len()
            ))
        })
    }

    /// Coordinate of the current position, or `None` at either sentinel.
    pub fn current_pos(&self) -> Option<Point> {
        self.geometry.position_of(self.current).ok()
    }

    /// Overwrite the pixel at the current position without moving.
    ///
    /// Fails with `InvalidOperation` if `value` has a different depth than
    /// the pixel array and with `OutOfRange` at a sentinel position.
    pub fn write(&mut self, value: PixelData) -> Result<(), DibError> {
        check_depth(&self.geometry, &value)?;
        let value = PixelData::from_raw(value.depth(), value.raw());
        let at = self.offset + self.geometry.byte_offset_of_index(self.current)?;
        if self.geometry.depth().is_indexed() {
            let col = (self.current as u64 % u64::from(self.geometry.size().width())) as u32;
            let shift = self.geometry.bit_shift_of(col);
            let mask = (self.geometry.depth().value_mask() as u8) << shift;
            let mut byte = [0u8; 1];
            self.stream.read_at(&mut byte, at)?;
            byte[0] = (byte[0] & !mask) | ((value.raw() as u8) << shift);
            self.stream.write_at(&byte, at)?;
        } else {
            self.stream.write_at(value.as_bytes(), at)?;
        }
        self.value = Some(value);
        Ok(())
    }

    /// Signed number of steps from this cursor to `other`.
    pub fn distance_to<T: DibStream + ?Sized, G: DepthFamily>(
        &self,
        other: &PixelCursor<'_, T, G>,
    ) -> i64 {
        other.current - self.current
    }
}

impl<S: DibStream + ?Sized, T: DibStream + ?Sized, F: DepthFamily, G: DepthFamily>
    PartialEq<PixelCursor<'_, T, G>> for PixelCursor<'_, S, F>
{
    fn eq(&self, other: &PixelCursor<'_, T, G>) -> bool {
        self.current == other.current
    }
}

impl<S: DibStream + ?Sized, T: DibStream + ?Sized, F: DepthFamily, G: DepthFamily>
    PartialOrd<PixelCursor<'_, T, G>> for PixelCursor<'_, S, F>
{
    fn partial_cmp(&self, other: &PixelCursor<'_, T, G>) -> Option<Ordering> {
        Some(self.current.cmp(&other.current))
    }
}

impl<S: DibStream + ?Sized, F: DepthFamily> fmt::Debug for PixelCursor<'_, S, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PixelCursor")
            .field("offset", &self.offset)
            .field("geometry", &self.geometry)
            .field("current", &self.current)
            .field("value", &self.value)
            .finish()
    }
}
