//! Sequential and random access over a stream's pixel array.
//!
//! [`PixelCursor`] reads (and overwrites in place) with bidirectional
//! traversal; [`PixelWriter`] fills a fresh pixel array front to back and
//! emits row padding as it goes. Both address pixels in disk order through
//! the same [`Geometry`](crate::Geometry), so a value written at index `i`
//! is the value read back at index `i`.

mod cursor;
mod writer;

pub use cursor::PixelCursor;
pub use writer::PixelWriter;

use crate::error::DibError;
use crate::geometry::Geometry;
use crate::pixel::PixelData;
use crate::stream::DibStream;

/// Where [`PixelCursor::reset`] places the cursor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Origin {
    /// Linear index 0: the left pixel of the bottom visual row.
    Begin,
    /// Linear index `len - 1`: the right pixel of the top visual row.
    End,
}

/// Read the packed value at a valid linear index with one stream read.
fn read_pixel<S: DibStream + ?Sized>(
    stream: &mut S,
    base: u64,
    geometry: &Geometry,
    index: i64,
) -> Result<PixelData, DibError> {
    let at = base + geometry.byte_offset_of_index(index)?;
    let len = geometry.pixel_byte_length();
    let mut buf = [0u8; 4];
    stream.read_at(&mut buf[..len], at)?;
    let depth = geometry.depth();
    if depth.is_indexed() {
        let col = (index as u64 % u64::from(geometry.size().width())) as u32;
        buf[0] >>= geometry.bit_shift_of(col);
    }
    Ok(PixelData::from_le_bytes(depth, buf))
}

fn check_depth(geometry: &Geometry, value: &PixelData) -> Result<(), DibError> {
    if value.depth() != geometry.depth() {
        return Err(DibError::InvalidOperation(alloc::format!(
            "{} value written to a {} pixel array",
            value.depth(),
            geometry.depth()
        )));
    }
    Ok(())
}
