//! Header-generation façades over a loaded DIB stream.
//!
//! [`DibBitmap`] selects palette and compression handling from its header
//! type and routes all pixel access through the scan cursor. The four
//! generations are exposed as [`CoreBitmap`], [`InfoBitmap`], [`V4Bitmap`],
//! and [`V5Bitmap`].

use alloc::format;
use alloc::vec;
use alloc::vec::Vec;

use enough::Stop;
use imgref::{ImgRef, ImgVec};
use rgb::RGB8;

use crate::error::DibError;
use crate::geometry::{Geometry, ImageSize, Point, Rect};
use crate::headers::{
    ColorMask, Compression, CoreHeader, DibHeader, FileHeader, HEADER_OFFSET, HEADER_SIZE_OFFSET,
    InfoHeader, V4Header, V5Header, parse_palette,
};
use crate::loader::DibLoader;
use crate::pixel::{BitDepth, DepthFamily, PixelData};
use crate::scan::{PixelCursor, PixelWriter};
use crate::stream::DibStream;

pub type CoreBitmap<S> = DibBitmap<S, CoreHeader>;
pub type InfoBitmap<S> = DibBitmap<S, InfoHeader>;
pub type V4Bitmap<S> = DibBitmap<S, V4Header>;
pub type V5Bitmap<S> = DibBitmap<S, V5Header>;

/// A DIB image addressed through header generation `H`.
#[derive(Debug)]
pub struct DibBitmap<S: DibStream, H: DibHeader> {
    loader: DibLoader<S>,
    header: H,
    size: ImageSize,
    depth: BitDepth,
    palette: Vec<RGB8>,
    color_mask: Option<ColorMask>,
}

/// Raw value <-> color translation for one bitmap.
struct ColorCodec<'a> {
    depth: BitDepth,
    compression: Compression,
    mask: Option<ColorMask>,
    palette: &'a [RGB8],
}

impl ColorCodec<'_> {
    fn decode(&self, value: PixelData) -> Result<RGB8, DibError> {
        match (self.compression, self.mask) {
            (Compression::Rgb, _) => value.to_rgb_with_palette(self.palette),
            (Compression::Bitfields | Compression::AlphaBitfields, Some(mask)) => {
                Ok(mask.decode(value.raw()))
            }
            (c, _) => Err(not_readable(c)),
        }
    }

    fn encode(&self, color: RGB8) -> Result<PixelData, DibError> {
        match (self.compression, self.mask) {
            (Compression::Rgb, _) => PixelData::from_rgb(self.depth, color),
            (Compression::Bitfields | Compression::AlphaBitfields, Some(mask)) => {
                Ok(PixelData::from_raw(self.depth, mask.encode(color)))
            }
            (c, _) => Err(not_writable(c)),
        }
    }
}

fn not_readable(c: Compression) -> DibError {
    DibError::NotImplemented(format!("reading {c:?} compressed pixel data"))
}

fn not_writable(c: Compression) -> DibError {
    DibError::InvalidOperation(format!("writing {c:?} compressed pixel data"))
}

impl<S: DibStream, H: DibHeader> DibBitmap<S, H> {
    /// Take ownership of a loader and parse its header as generation `H`.
    ///
    /// A loader whose stream is not ready or lacks the `"BM"` signature is
    /// `InvalidOperation`; a stored header shorter than `H` is `InvalidFormat`.
    pub fn new(mut loader: DibLoader<S>) -> Result<Self, DibError> {
        if !loader.is_enabled() {
            return Err(DibError::InvalidOperation(
                "loader is not ready or has no BM signature".into(),
            ));
        }
        let header: H = loader.read_header()?;
        let size = header.image_size()?;
        let depth = header.bit_depth()?;
        let compression = header.compression();
        Geometry::new(depth, size)?;

        let color_mask = if compression.has_masks() {
            if !matches!(depth, BitDepth::Bit16 | BitDepth::Bit32) {
                return Err(DibError::InvalidFormat(format!(
                    "{compression:?} requires 16- or 32-bit pixels, got {depth}"
                )));
            }
            Some(match header.color_mask() {
                Some(mask) => mask,
                None => read_trailing_mask(&mut loader, compression)?,
            })
        } else {
            None
        };

        let palette = if compression == Compression::Rgb && depth.is_indexed() {
            read_palette::<S, H>(&mut loader, &header, depth)?
        } else {
            Vec::new()
        };

        Ok(Self {
            loader,
            header,
            size,
            depth,
            palette,
            color_mask,
        })
    }

    /// Open a stream and parse it as generation `H`.
    pub fn open(stream: S) -> Result<Self, DibError> {
        Self::new(DibLoader::open(stream)?)
    }

    pub fn header(&self) -> &H {
        &self.header
    }

    pub fn size(&self) -> ImageSize {
        self.size
    }

    pub fn bit_depth(&self) -> BitDepth {
        self.depth
    }

    pub fn compression(&self) -> Compression {
        self.header.compression()
    }

    /// Palette for indexed depths, `None` for direct color.
    pub fn palette(&self) -> Option<&[RGB8]> {
        if self.palette.is_empty() {
            None
        } else {
            Some(&self.palette)
        }
    }

    /// Channel masks for bit-field compressed data.
    pub fn color_mask(&self) -> Option<ColorMask> {
        self.color_mask
    }

    /// Absolute offset of the pixel array.
    pub fn pixel_offset(&self) -> u64 {
        u64::from(self.loader.file_header().pixel_offset)
    }

    pub fn loader(&self) -> &DibLoader<S> {
        &self.loader
    }

    pub fn into_loader(self) -> DibLoader<S> {
        self.loader
    }

    fn check_raw_readable(&self) -> Result<(), DibError> {
        let c = self.compression();
        if c.is_uncompressed() {
            Ok(())
        } else {
            Err(not_readable(c))
        }
    }

    fn check_raw_writable(&self) -> Result<(), DibError> {
        let c = self.compression();
        if c.is_uncompressed() {
            Ok(())
        } else {
            Err(not_writable(c))
        }
    }

    /// A cursor over the pixel array plus the color codec, borrowing
    /// disjoint parts of the bitmap.
    fn cursor(&mut self) -> Result<(PixelCursor<'_, S, H::Depths>, ColorCodec<'_>), DibError> {
        let offset = u64::from(self.loader.file_header().pixel_offset);
        let codec = ColorCodec {
            depth: self.depth,
            compression: self.header.compression(),
            mask: self.color_mask,
            palette: &self.palette,
        };
        let cursor = PixelCursor::new(self.loader.stream_mut(), offset, self.depth, self.size)?;
        Ok((cursor, codec))
    }

    /// Check that `count` pixels starting at `pos` stay inside the image.
    fn check_run(&self, pos: Point, count: usize) -> Result<(), DibError> {
        let geometry = Geometry::new(self.depth, self.size)?;
        let start = geometry.index_of(pos)?;
        let end = u64::try_from(count)
            .ok()
            .and_then(|c| (start as u64).checked_add(c));
        match end {
            Some(end) if end <= geometry.len() as u64 => Ok(()),
            _ => Err(DibError::OutOfRange(format!(
                "{count} pixels from index {start} run past {} pixels",
                geometry.len()
            ))),
        }
    }

    // ── Color access ────────────────────────────────────────────────

    pub fn get_pixel(&mut self, pos: Point) -> Result<RGB8, DibError> {
        self.check_raw_readable()?;
        let (mut cursor, codec) = self.cursor()?;
        cursor.jump_to(pos)?;
        codec.decode(cursor.current()?)
    }

    /// `count` consecutive pixels in disk order starting at `pos`.
    ///
    /// Disk order runs left to right and then up one row.
    pub fn get_pixels(&mut self, pos: Point, count: usize) -> Result<Vec<RGB8>, DibError> {
        self.check_raw_readable()?;
        self.check_run(pos, count)?;
        let (mut cursor, codec) = self.cursor()?;
        let mut out = Vec::with_capacity(count);
        if count == 0 {
            return Ok(out);
        }
        cursor.jump_to(pos)?;
        out.push(codec.decode(cursor.current()?)?);
        for _ in 1..count {
            cursor.next()?;
            out.push(codec.decode(cursor.current()?)?);
        }
        Ok(out)
    }

    pub fn set_pixel(&mut self, pos: Point, color: RGB8) -> Result<(), DibError> {
        self.check_raw_writable()?;
        let (mut cursor, codec) = self.cursor()?;
        let value = codec.encode(color)?;
        cursor.jump_to(pos)?;
        cursor.write(value)
    }

    /// Write `colors` consecutively in disk order starting at `pos`.
    pub fn set_pixels(&mut self, pos: Point, colors: &[RGB8]) -> Result<(), DibError> {
        self.check_raw_writable()?;
        self.check_run(pos, colors.len())?;
        let (mut cursor, codec) = self.cursor()?;
        let values = colors
            .iter()
            .map(|&c| codec.encode(c))
            .collect::<Result<Vec<_>, _>>()?;
        write_run(&mut cursor, pos, &values)
    }

    // ── Raw access ──────────────────────────────────────────────────

    pub fn get_pixel_raw(&mut self, pos: Point) -> Result<PixelData, DibError> {
        self.check_raw_readable()?;
        let (mut cursor, _) = self.cursor()?;
        cursor.jump_to(pos)?;
        cursor.current()
    }

    pub fn get_pixels_raw(&mut self, pos: Point, count: usize) -> Result<Vec<PixelData>, DibError> {
        self.check_raw_readable()?;
        self.check_run(pos, count)?;
        let (mut cursor, _) = self.cursor()?;
        let mut out = Vec::with_capacity(count);
        if count == 0 {
            return Ok(out);
        }
        cursor.jump_to(pos)?;
        out.push(cursor.current()?);
        for _ in 1..count {
            cursor.next()?;
            out.push(cursor.current()?);
        }
        Ok(out)
    }

    pub fn set_pixel_raw(&mut self, pos: Point, value: PixelData) -> Result<(), DibError> {
        self.check_raw_writable()?;
        let (mut cursor, _) = self.cursor()?;
        cursor.jump_to(pos)?;
        cursor.write(value)
    }

    pub fn set_pixels_raw(&mut self, pos: Point, values: &[PixelData]) -> Result<(), DibError> {
        self.check_raw_writable()?;
        self.check_run(pos, values.len())?;
        let (mut cursor, _) = self.cursor()?;
        write_run(&mut cursor, pos, values)
    }

    // ── Bulk copies ─────────────────────────────────────────────────

    /// Decode `area` row by row, top to bottom, calling `put` per pixel.
    fn read_area(
        &mut self,
        area: Rect,
        stop: &dyn Stop,
        mut put: impl FnMut(u32, u32, RGB8),
    ) -> Result<(), DibError> {
        self.check_raw_readable()?;
        area.check_within(self.size)?;
        let (mut cursor, codec) = self.cursor()?;
        for row in 0..area.height {
            if row % 16 == 0 {
                stop.check()?;
            }
            cursor.jump_to(Point::new(area.x, area.y + row as i32))?;
            for col in 0..area.width {
                if col > 0 {
                    cursor.next()?;
                }
                put(col, row, codec.decode(cursor.current()?)?);
            }
        }
        Ok(())
    }

    /// Decode the whole image into `dest`, which must have the same size.
    pub fn copy_to(&mut self, dest: &mut ImgVec<RGB8>, stop: &dyn Stop) -> Result<(), DibError> {
        let (width, height) = (self.size.width() as usize, self.size.height() as usize);
        if dest.width() != width || dest.height() != height {
            return Err(DibError::InvalidArgument(format!(
                "destination is {}x{}, bitmap is {}x{}",
                dest.width(),
                dest.height(),
                self.size.width(),
                self.size.height()
            )));
        }
        let area = Rect::of(self.size);
        self.copy_area_to(dest, area, Point::new(0, 0), stop)
    }

    /// Decode `area` into `dest` with its top-left corner at `dest_origin`.
    pub fn copy_area_to(
        &mut self,
        dest: &mut ImgVec<RGB8>,
        area: Rect,
        dest_origin: Point,
        stop: &dyn Stop,
    ) -> Result<(), DibError> {
        let dest_size = ImageSize::new(dest.width() as u32, dest.height() as u32)?;
        Rect::new(dest_origin.x, dest_origin.y, area.width, area.height).check_within(dest_size)?;
        let stride = dest.stride();
        let (ox, oy) = (dest_origin.x as usize, dest_origin.y as usize);
        let buf = dest.buf_mut();
        self.read_area(area, stop, |col, row, color| {
            buf[(oy + row as usize) * stride + ox + col as usize] = color;
        })
    }

    /// Decode the whole image.
    pub fn to_imgvec(&mut self, stop: &dyn Stop) -> Result<ImgVec<RGB8>, DibError> {
        self.to_imgvec_area(Rect::of(self.size), stop)
    }

    /// Decode `area` into a new image of the area's size.
    pub fn to_imgvec_area(
        &mut self,
        area: Rect,
        stop: &dyn Stop,
    ) -> Result<ImgVec<RGB8>, DibError> {
        area.check_within(self.size)?;
        let (w, h) = (area.width as usize, area.height as usize);
        let len = w
            .checked_mul(h)
            .filter(|&n| {
                n.checked_mul(core::mem::size_of::<RGB8>())
                    .is_some_and(|bytes| bytes <= isize::MAX as usize)
            })
            .ok_or(DibError::DimensionsTooLarge {
                width: area.width,
                height: area.height,
            })?;
        let mut buf = vec![RGB8::default(); len];
        self.read_area(area, stop, |col, row, color| {
            buf[row as usize * w + col as usize] = color;
        })?;
        Ok(ImgVec::new(buf, w, h))
    }

    // ── Generation ──────────────────────────────────────────────────

    /// Write `image` to `stream` as a complete DIB described by `header`,
    /// then reopen the result.
    ///
    /// Argument problems surface as errors before anything is written:
    /// compressed or indexed output is `NotImplemented`, a size mismatch or
    /// a depth outside `H`'s family is `InvalidArgument`. Once the pixel
    /// array is written, any failure to reopen and validate the stream is
    /// reported as `Ok(None)`.
    pub fn generate(
        mut stream: S,
        mut header: H,
        image: ImgRef<'_, RGB8>,
        stop: &dyn Stop,
    ) -> Result<Option<Self>, DibError> {
        let compression = header.compression();
        if compression != Compression::Rgb {
            return Err(DibError::NotImplemented(format!(
                "generating {compression:?} bitmaps"
            )));
        }
        let depth = BitDepth::try_from(header.bit_count())?;
        <H::Depths as DepthFamily>::check(depth)?;
        if depth.is_indexed() {
            return Err(DibError::NotImplemented(format!(
                "generating {depth} indexed bitmaps"
            )));
        }
        let size = header.image_size()?;
        if image.width() != size.width() as usize || image.height() != size.height() as usize {
            return Err(DibError::InvalidArgument(format!(
                "image is {}x{}, header says {}x{}",
                image.width(),
                image.height(),
                size.width(),
                size.height()
            )));
        }

        let geometry = Geometry::new(depth, size)?;
        let too_large = DibError::DimensionsTooLarge {
            width: size.width(),
            height: size.height(),
        };
        let image_len = u32::try_from(geometry.image_byte_length()).map_err(|_| too_large)?;
        let pixel_offset = FileHeader::SIZE as u32 + H::SIZE;
        let file_size = pixel_offset
            .checked_add(image_len)
            .ok_or(DibError::DimensionsTooLarge {
                width: size.width(),
                height: size.height(),
            })?;
        header.set_image_byte_length(image_len);

        let mut head = Vec::with_capacity(pixel_offset as usize);
        head.extend_from_slice(&FileHeader::new(file_size, pixel_offset).to_bytes());
        head.extend_from_slice(&H::SIZE.to_le_bytes());
        header.write_to(&mut head);
        debug_assert_eq!(head.len() as u64, HEADER_OFFSET + u64::from(H::SIZE) - 4);
        stream.write_at(&head, 0)?;

        {
            let mut writer: PixelWriter<'_, S, H::Depths> =
                PixelWriter::new(&mut stream, u64::from(pixel_offset), depth, size)?;
            let (w, h, stride) = (image.width(), image.height(), image.stride());
            let buf = image.buf();
            for disk_row in 0..h {
                if disk_row % 16 == 0 {
                    stop.check()?;
                }
                let y = h - 1 - disk_row;
                for &color in &buf[y * stride..][..w] {
                    writer.write(PixelData::from_rgb(depth, color)?)?;
                }
            }
        }

        Ok(Self::reopen(stream).ok())
    }

    fn reopen(mut stream: S) -> Result<Self, DibError> {
        stream.sync()?;
        let mut loader = DibLoader::open(stream)?;
        loader.sync()?;
        Self::new(loader)
    }
}

fn write_run<S: DibStream + ?Sized, F: DepthFamily>(
    cursor: &mut PixelCursor<'_, S, F>,
    pos: Point,
    values: &[PixelData],
) -> Result<(), DibError> {
    let Some((first, rest)) = values.split_first() else {
        return Ok(());
    };
    cursor.jump_to(pos)?;
    cursor.write(*first)?;
    for value in rest {
        cursor.next()?;
        cursor.write(*value)?;
    }
    Ok(())
}

/// Masks stored after a 40-byte info header.
fn read_trailing_mask<S: DibStream>(
    loader: &mut DibLoader<S>,
    compression: Compression,
) -> Result<ColorMask, DibError> {
    let count = if compression == Compression::AlphaBitfields {
        4
    } else {
        3
    };
    let mut buf = [0u8; 16];
    loader.read_at(
        &mut buf[..count * 4],
        HEADER_SIZE_OFFSET + u64::from(InfoHeader::SIZE),
    )?;
    let word = |i: usize| {
        u32::from_le_bytes([buf[i * 4], buf[i * 4 + 1], buf[i * 4 + 2], buf[i * 4 + 3]])
    };
    Ok(ColorMask {
        red: word(0),
        green: word(1),
        blue: word(2),
        alpha: word(3),
    })
}

fn read_palette<S: DibStream, H: DibHeader>(
    loader: &mut DibLoader<S>,
    header: &H,
    depth: BitDepth,
) -> Result<Vec<RGB8>, DibError> {
    let capacity = depth.palette_capacity();
    let count = match header.colors_used() {
        0 => capacity,
        n => n as usize,
    };
    if count > capacity {
        return Err(DibError::InvalidFormat(format!(
            "{count} palette entries declared for {depth} pixels"
        )));
    }
    let mut bytes = vec![0u8; count * H::PALETTE_ENTRY_SIZE];
    let at = HEADER_SIZE_OFFSET + u64::from(loader.header_size());
    loader.read_at(&mut bytes, at)?;
    Ok(parse_palette(&bytes, H::PALETTE_ENTRY_SIZE))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::MemoryStream;
    use enough::Unstoppable;

    fn gradient(w: usize, h: usize) -> ImgVec<RGB8> {
        let buf = (0..w * h)
            .map(|i| RGB8::new((i * 7) as u8, (i * 13) as u8, (255 - i) as u8))
            .collect();
        ImgVec::new(buf, w, h)
    }

    fn generated<H: DibHeader>(w: usize, h: usize, depth: BitDepth) -> DibBitmap<MemoryStream, H> {
        let size = ImageSize::new(w as u32, h as u32).unwrap();
        let header = H::for_image(size, depth).unwrap();
        let img = gradient(w, h);
        DibBitmap::generate(MemoryStream::new(), header, img.as_ref(), &Unstoppable)
            .unwrap()
            .unwrap()
    }

    /// Hand-built 8-bit info bitmap, 3x2, palette of `colors`.
    fn indexed_info(colors_used: u32, colors: &[RGB8], indices: [[u8; 3]; 2]) -> MemoryStream {
        let size = ImageSize::new(3, 2).unwrap();
        let mut info = InfoHeader::for_image(size, BitDepth::Bit8).unwrap();
        info.colors_used = colors_used;
        let entries = if colors_used == 0 { 256 } else { colors_used as usize };
        let offset = 14 + 40 + entries as u32 * 4;
        let mut out = Vec::new();
        out.extend_from_slice(&FileHeader::new(offset + 8, offset).to_bytes());
        out.extend_from_slice(&40u32.to_le_bytes());
        info.write_to(&mut out);
        for i in 0..entries {
            let c = colors.get(i).copied().unwrap_or_default();
            out.extend_from_slice(&[c.b, c.g, c.r, 0]);
        }
        // disk row 0 is the bottom row
        for row in [indices[1], indices[0]] {
            out.extend_from_slice(&row);
            out.push(0);
        }
        MemoryStream::from_vec(out)
    }

    #[test]
    fn generate_then_read_back() {
        let mut bmp = generated::<InfoHeader>(5, 3, BitDepth::Bit24);
        let src = gradient(5, 3);
        let img = bmp.to_imgvec(&Unstoppable).unwrap();
        assert_eq!(img.buf(), src.buf());
        assert_eq!(bmp.header().image_size, 16 * 3);
        assert_eq!(bmp.pixel_offset(), 54);
        assert!(bmp.palette().is_none());
    }

    #[test]
    fn get_and_set_pixel() {
        let mut bmp = generated::<V5Header>(3, 3, BitDepth::Bit32);
        assert_eq!(bmp.get_pixel(Point::new(1, 0)).unwrap(), gradient(3, 3).buf()[1]);
        bmp.set_pixel(Point::new(2, 2), RGB8::new(9, 8, 7)).unwrap();
        assert_eq!(bmp.get_pixel(Point::new(2, 2)).unwrap(), RGB8::new(9, 8, 7));
        assert_eq!(bmp.get_pixel_raw(Point::new(2, 2)).unwrap().raw(), 0x0009_0807);
        assert!(matches!(
            bmp.get_pixel(Point::new(3, 0)),
            Err(DibError::OutOfRange(_))
        ));
    }

    #[test]
    fn runs_follow_disk_order() {
        let mut bmp = generated::<InfoHeader>(2, 2, BitDepth::Bit24);
        let src = gradient(2, 2);
        // bottom-left, bottom-right, then top-left
        let run = bmp.get_pixels(Point::new(0, 1), 3).unwrap();
        assert_eq!(run, vec![src.buf()[2], src.buf()[3], src.buf()[0]]);
        assert!(matches!(
            bmp.get_pixels(Point::new(0, 1), 5),
            Err(DibError::OutOfRange(_))
        ));

        let colors = [RGB8::new(1, 1, 1), RGB8::new(2, 2, 2)];
        bmp.set_pixels(Point::new(1, 1), &colors).unwrap();
        assert_eq!(bmp.get_pixel(Point::new(1, 1)).unwrap(), colors[0]);
        assert_eq!(bmp.get_pixel(Point::new(0, 0)).unwrap(), colors[1]);

        let raws = bmp.get_pixels_raw(Point::new(1, 1), 2).unwrap();
        assert_eq!(raws[0].raw(), 0x010101);
        bmp.set_pixels_raw(
            Point::new(0, 0),
            &[
                PixelData::from_raw(BitDepth::Bit24, 0xFF0000),
                PixelData::from_raw(BitDepth::Bit24, 0x00FF00),
            ],
        )
        .unwrap();
        assert_eq!(bmp.get_pixel(Point::new(1, 0)).unwrap(), RGB8::new(0, 255, 0));
    }

    #[test]
    fn area_copies() {
        let mut bmp = generated::<V4Header>(4, 3, BitDepth::Bit16);
        let full = bmp.to_imgvec(&Unstoppable).unwrap();
        let area = bmp.to_imgvec_area(Rect::new(1, 1, 2, 2), &Unstoppable).unwrap();
        assert_eq!(area.width(), 2);
        assert_eq!(area.buf()[0], full.buf()[4 + 1]);
        assert_eq!(area.buf()[3], full.buf()[2 * 4 + 2]);

        let mut dest = ImgVec::new(vec![RGB8::default(); 9], 3, 3);
        bmp.copy_area_to(&mut dest, Rect::new(2, 0, 2, 2), Point::new(1, 1), &Unstoppable)
            .unwrap();
        assert_eq!(dest.buf()[4], full.buf()[2]);
        assert_eq!(dest.buf()[8], full.buf()[4 + 3]);
        assert_eq!(dest.buf()[0], RGB8::default());

        assert!(matches!(
            bmp.copy_area_to(&mut dest, Rect::new(0, 0, 3, 3), Point::new(1, 0), &Unstoppable),
            Err(DibError::OutOfRange(_))
        ));
        assert!(matches!(
            bmp.to_imgvec_area(Rect::new(3, 0, 2, 1), &Unstoppable),
            Err(DibError::OutOfRange(_))
        ));
        let mut wrong = ImgVec::new(vec![RGB8::default(); 4], 2, 2);
        assert!(matches!(
            bmp.copy_to(&mut wrong, &Unstoppable),
            Err(DibError::InvalidArgument(_))
        ));
    }

    #[test]
    fn palette_honors_colors_used() {
        let colors = [RGB8::new(10, 0, 0), RGB8::new(0, 20, 0), RGB8::new(0, 0, 30)];
        let stream = indexed_info(3, &colors, [[0, 1, 2], [2, 2, 0]]);
        let mut bmp = InfoBitmap::open(stream).unwrap();
        assert_eq!(bmp.palette().unwrap(), &colors);
        assert_eq!(bmp.get_pixel(Point::new(1, 0)).unwrap(), colors[1]);
        assert_eq!(bmp.get_pixel(Point::new(0, 1)).unwrap(), colors[2]);
        assert_eq!(bmp.get_pixel_raw(Point::new(2, 0)).unwrap().raw(), 2);
        // indexed writes go through raw values only
        assert!(matches!(
            bmp.set_pixel(Point::new(0, 0), RGB8::new(0, 0, 0)),
            Err(DibError::NotImplemented(_))
        ));
        bmp.set_pixel_raw(Point::new(0, 0), PixelData::from_raw(BitDepth::Bit8, 7))
            .unwrap();
        assert!(matches!(
            bmp.get_pixel(Point::new(0, 0)),
            Err(DibError::OutOfRange(_))
        ));
    }

    #[test]
    fn palette_defaults_to_full_size() {
        let stream = indexed_info(0, &[RGB8::new(1, 2, 3)], [[0; 3], [0; 3]]);
        let bmp = InfoBitmap::open(stream).unwrap();
        assert_eq!(bmp.palette().unwrap().len(), 256);
        assert_eq!(bmp.palette().unwrap()[0], RGB8::new(1, 2, 3));
    }

    #[test]
    fn core_palette_uses_triples() {
        let mut out = Vec::new();
        let offset = 14 + 12 + 2 * 3;
        out.extend_from_slice(&FileHeader::new(offset + 4, offset).to_bytes());
        out.extend_from_slice(&12u32.to_le_bytes());
        CoreHeader {
            width: 3,
            height: 1,
            planes: 1,
            bit_count: 1,
        }
        .write_to(&mut out);
        out.extend_from_slice(&[0, 0, 0, 255, 255, 255]);
        out.extend_from_slice(&[0b0100_0000, 0, 0, 0]);
        let mut bmp = CoreBitmap::open(MemoryStream::from_vec(out)).unwrap();
        assert_eq!(bmp.palette().unwrap(), &[RGB8::new(0, 0, 0), RGB8::new(255, 255, 255)]);
        let row = bmp.get_pixels(Point::new(0, 0), 3).unwrap();
        assert_eq!(row, vec![RGB8::new(0, 0, 0), RGB8::new(255, 255, 255), RGB8::new(0, 0, 0)]);
    }

    #[test]
    fn bitfields_decode_through_masks() {
        let size = ImageSize::new(2, 1).unwrap();
        let mut info = InfoHeader::for_image(size, BitDepth::Bit16).unwrap();
        info.compression = Compression::Bitfields;
        let offset = 14 + 40 + 12;
        let mut out = Vec::new();
        out.extend_from_slice(&FileHeader::new(offset + 4, offset).to_bytes());
        out.extend_from_slice(&40u32.to_le_bytes());
        info.write_to(&mut out);
        for m in [0xF800u32, 0x07E0, 0x001F] {
            out.extend_from_slice(&m.to_le_bytes());
        }
        out.extend_from_slice(&0xF800u16.to_le_bytes());
        out.extend_from_slice(&0x07E0u16.to_le_bytes());

        let mut bmp = InfoBitmap::open(MemoryStream::from_vec(out)).unwrap();
        assert_eq!(bmp.color_mask().unwrap().green, 0x07E0);
        assert_eq!(bmp.get_pixel(Point::new(0, 0)).unwrap(), RGB8::new(255, 0, 0));
        assert_eq!(bmp.get_pixel(Point::new(1, 0)).unwrap(), RGB8::new(0, 255, 0));
        bmp.set_pixel(Point::new(1, 0), RGB8::new(0, 0, 255)).unwrap();
        assert_eq!(bmp.get_pixel_raw(Point::new(1, 0)).unwrap().raw(), 0x001F);
    }

    #[test]
    fn compressed_payloads_are_refused() {
        let size = ImageSize::new(2, 2).unwrap();
        let mut info = InfoHeader::for_image(size, BitDepth::Bit8).unwrap();
        info.compression = Compression::Rle8;
        let mut out = Vec::new();
        out.extend_from_slice(&FileHeader::new(60, 54).to_bytes());
        out.extend_from_slice(&40u32.to_le_bytes());
        info.write_to(&mut out);
        out.extend_from_slice(&[0; 6]);
        let mut bmp = InfoBitmap::open(MemoryStream::from_vec(out)).unwrap();
        assert!(bmp.palette().is_none());
        assert!(matches!(
            bmp.get_pixel(Point::new(0, 0)),
            Err(DibError::NotImplemented(_))
        ));
        assert!(matches!(
            bmp.get_pixel_raw(Point::new(0, 0)),
            Err(DibError::NotImplemented(_))
        ));
        assert!(matches!(
            bmp.set_pixel(Point::new(0, 0), RGB8::new(0, 0, 0)),
            Err(DibError::InvalidOperation(_))
        ));
        assert!(matches!(
            bmp.set_pixel_raw(Point::new(0, 0), PixelData::from_raw(BitDepth::Bit8, 0)),
            Err(DibError::InvalidOperation(_))
        ));
        assert!(matches!(
            bmp.to_imgvec(&Unstoppable),
            Err(DibError::NotImplemented(_))
        ));
    }

    #[test]
    fn new_rejects_disabled_loader_and_short_header() {
        let mut bytes = generated::<CoreHeader>(1, 1, BitDepth::Bit24)
            .into_loader()
            .into_stream()
            .into_inner();
        assert!(matches!(
            InfoBitmap::open(MemoryStream::from_vec(bytes.clone())),
            Err(DibError::InvalidFormat(_))
        ));
        bytes[1] = b'A';
        assert!(matches!(
            CoreBitmap::open(MemoryStream::from_vec(bytes)),
            Err(DibError::InvalidOperation(_))
        ));
    }

    #[test]
    fn generate_validates_before_writing() {
        let size = ImageSize::new(2, 2).unwrap();
        let img = gradient(2, 2);

        let header = InfoHeader::for_image(size, BitDepth::Bit8).unwrap();
        let r = InfoBitmap::generate(MemoryStream::new(), header, img.as_ref(), &Unstoppable);
        assert!(matches!(r, Err(DibError::NotImplemented(_))));

        let mut header = InfoHeader::for_image(size, BitDepth::Bit24).unwrap();
        header.compression = Compression::Rle8;
        let r = InfoBitmap::generate(MemoryStream::new(), header, img.as_ref(), &Unstoppable);
        assert!(matches!(r, Err(DibError::NotImplemented(_))));

        let header = InfoHeader::for_image(ImageSize::new(3, 2).unwrap(), BitDepth::Bit24).unwrap();
        let r = InfoBitmap::generate(MemoryStream::new(), header, img.as_ref(), &Unstoppable);
        assert!(matches!(r, Err(DibError::InvalidArgument(_))));

        let header = CoreHeader {
            width: 2,
            height: 2,
            planes: 1,
            bit_count: 16,
        };
        let r = CoreBitmap::generate(MemoryStream::new(), header, img.as_ref(), &Unstoppable);
        assert!(matches!(r, Err(DibError::InvalidArgument(_))));
    }

    /// Accepts writes, then reports itself unusable.
    struct FadingStream {
        inner: MemoryStream,
    }

    impl DibStream for FadingStream {
        fn is_ready(&self) -> bool {
            false
        }

        fn read_at(&mut self, buf: &mut [u8], offset: u64) -> Result<(), DibError> {
            self.inner.read_at(buf, offset)
        }

        fn write_at(&mut self, buf: &[u8], offset: u64) -> Result<(), DibError> {
            self.inner.write_at(buf, offset)
        }
    }

    #[test]
    fn generate_reports_failed_reopen_as_none() {
        let size = ImageSize::new(2, 2).unwrap();
        let img = gradient(2, 2);
        let header = InfoHeader::for_image(size, BitDepth::Bit24).unwrap();
        let stream = FadingStream {
            inner: MemoryStream::new(),
        };
        let r = InfoBitmap::generate(stream, header, img.as_ref(), &Unstoppable).unwrap();
        assert!(r.is_none());
    }

    struct Cancelled;

    impl Stop for Cancelled {
        fn check(&self) -> Result<(), enough::StopReason> {
            Err(enough::StopReason::Cancelled)
        }
    }

    #[test]
    fn cancellation_stops_bulk_work() {
        let size = ImageSize::new(2, 2).unwrap();
        let img = gradient(2, 2);
        let header = InfoHeader::for_image(size, BitDepth::Bit24).unwrap();
        let r = InfoBitmap::generate(MemoryStream::new(), header, img.as_ref(), &Cancelled);
        assert!(matches!(r, Err(DibError::Cancelled(_))));

        let mut bmp = generated::<InfoHeader>(2, 2, BitDepth::Bit24);
        assert!(matches!(
            bmp.to_imgvec(&Cancelled),
            Err(DibError::Cancelled(_))
        ));
    }
}
