use core::fmt;
use core::marker::PhantomData;

use super::check_depth;
use crate::error::DibError;
use crate::geometry::{Geometry, ImageSize};
use crate::pixel::{BitDepth, DepthFamily, PixelData, RgbDepths};
use crate::stream::DibStream;

/// Forward-only writer that fills a pixel array in disk order.
///
/// Each row's padding is zeroed as soon as its last pixel is written, so a
/// full pass of `while writer.has_value() { writer.write(..)? }` produces a
/// complete, padded pixel array without buffering rows.
pub struct PixelWriter<'s, S: DibStream + ?Sized, F: DepthFamily = RgbDepths> {
    stream: &'s mut S,
    offset: u64,
    geometry: Geometry,
    current: i64,
    /// Pixels of a partially filled byte (1- and 4-bit depths).
    pending: u8,
    _family: PhantomData<F>,
}

impl<'s, S: DibStream + ?Sized, F: DepthFamily> PixelWriter<'s, S, F> {
    /// Fails with `InvalidArgument` if `depth` is not part of the family `F`.
    pub fn new(
        stream: &'s mut S,
        offset: u64,
        depth: BitDepth,
        size: ImageSize,
    ) -> Result<Self, DibError> {
        F::check(depth)?;
        Ok(Self {
            stream,
            offset,
            geometry: Geometry::new(depth, size)?,
            current: 0,
            pending: 0,
            _family: PhantomData,
        })
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    pub fn position(&self) -> i64 {
        self.current
    }

    pub fn has_value(&self) -> bool {
        self.current >= 0 && self.current < self.geometry.len()
    }

    pub fn reset(&mut self) {
        self.current = 0;
        self.pending = 0;
    }

    /// Write `value` at the current position and advance by one.
    ///
    /// Past the last pixel this fails with `OutOfRange`; a value of another
    /// depth fails with `InvalidOperation`.
    pub fn write(&mut self, value: PixelData) -> Result<(), DibError> {
        check_depth(&self.geometry, &value)?;
        let at = self.offset + self.geometry.byte_offset_of_index(self.current)?;
        let row_end = self.geometry.ends_row(self.current);

        if self.geometry.depth().is_indexed() {
            let col = (self.current as u64 % u64::from(self.geometry.size().width())) as u32;
            let shift = self.geometry.bit_shift_of(col);
            self.pending |= (value.raw() as u8) << shift;
            if shift == 0 || row_end {
                self.stream.write_at(&[self.pending], at)?;
                self.pending = 0;
            }
        } else {
            self.stream.write_at(value.as_bytes(), at)?;
        }

        if row_end {
            self.write_padding()?;
        }
        self.current += 1;
        Ok(())
    }

    fn write_padding(&mut self) -> Result<(), DibError> {
        let disk_row = self.current as u64 / u64::from(self.geometry.size().width());
        let packed = self.geometry.packed_row_bytes();
        let pad = (self.geometry.stride_bytes() - packed) as usize;
        if pad == 0 {
            return Ok(());
        }
        let at = self.offset + self.geometry.stride_bytes() * disk_row + packed;
        self.stream.write_at(&[0u8; 3][..pad], at)
    }
}

impl<S: DibStream + ?Sized, F: DepthFamily> fmt::Debug for PixelWriter<'_, S, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PixelWriter")
            .field("offset", &self.offset)
            .field("geometry", &self.geometry)
            .field("current", &self.current)
            .finish()
    }
}
