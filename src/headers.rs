//! On-disk header structures for the four DIB header generations.
//!
//! Layout, all little-endian:
//!
//! ```text
//! 0   file header (14 bytes): "BM", file size, reserved, pixel offset
//! 14  header size (u32): 12 Core, 40 Info, 108 V4, 124 V5
//! 18  header fields (header size - 4 bytes)
//! ..  optional bit masks (Info + BI_BITFIELDS), palette
//! ..  pixel array at the file header's pixel offset
//! ```
//!
//! Header structs hold the fields after the size field; the size itself is a
//! property of the type ([`DibHeader::SIZE`]).

use alloc::format;
use alloc::vec::Vec;
use core::fmt;

use rgb::RGB8;

use crate::error::DibError;
use crate::geometry::ImageSize;
use crate::pixel::{BitDepth, CoreDepths, DepthFamily, RgbDepths, scale_channel};

/// Offset of the header-size field, right after the file header.
pub const HEADER_SIZE_OFFSET: u64 = FileHeader::SIZE as u64;
/// Offset of the first header field.
pub const HEADER_OFFSET: u64 = HEADER_SIZE_OFFSET + 4;

// ── Byte reader ─────────────────────────────────────────────────────

/// Little-endian field reader over a header's bytes.
pub(crate) struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub(crate) fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn read_fixed_bytes<const N: usize>(&mut self) -> Result<[u8; N], DibError> {
        let end = self.pos.checked_add(N).ok_or(DibError::UnexpectedEof)?;
        let src = self.data.get(self.pos..end).ok_or(DibError::UnexpectedEof)?;
        let mut out = [0u8; N];
        out.copy_from_slice(src);
        self.pos = end;
        Ok(out)
    }

    pub(crate) fn get_u16_le(&mut self) -> Result<u16, DibError> {
        self.read_fixed_bytes().map(u16::from_le_bytes)
    }

    pub(crate) fn get_u32_le(&mut self) -> Result<u32, DibError> {
        self.read_fixed_bytes().map(u32::from_le_bytes)
    }

    pub(crate) fn get_i32_le(&mut self) -> Result<i32, DibError> {
        self.read_fixed_bytes().map(i32::from_le_bytes)
    }
}

fn put_u16(out: &mut Vec<u8>, v: u16) {
    out.extend_from_slice(&v.to_le_bytes());
}

fn put_u32(out: &mut Vec<u8>, v: u32) {
    out.extend_from_slice(&v.to_le_bytes());
}

fn put_i32(out: &mut Vec<u8>, v: i32) {
    out.extend_from_slice(&v.to_le_bytes());
}

// ── File header ─────────────────────────────────────────────────────

/// The 14-byte `BITMAPFILEHEADER`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FileHeader {
    pub signature: [u8; 2],
    pub file_size: u32,
    pub reserved: [u8; 4],
    /// Absolute offset of the pixel array.
    pub pixel_offset: u32,
}

impl FileHeader {
    pub const SIZE: usize = 14;
    pub const SIGNATURE: [u8; 2] = *b"BM";

    pub fn new(file_size: u32, pixel_offset: u32) -> Self {
        Self {
            signature: Self::SIGNATURE,
            file_size,
            reserved: [0; 4],
            pixel_offset,
        }
    }

    pub fn parse(bytes: &[u8]) -> Result<Self, DibError> {
        let mut r = ByteReader::new(bytes);
        Ok(Self {
            signature: r.read_fixed_bytes()?,
            file_size: r.get_u32_le()?,
            reserved: r.read_fixed_bytes()?,
            pixel_offset: r.get_u32_le()?,
        })
    }

    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut out = [0u8; Self::SIZE];
        out[0..2].copy_from_slice(&self.signature);
        out[2..6].copy_from_slice(&self.file_size.to_le_bytes());
        out[6..10].copy_from_slice(&self.reserved);
        out[10..14].copy_from_slice(&self.pixel_offset.to_le_bytes());
        out
    }

    /// Whether the signature is `"BM"`.
    pub fn is_valid(&self) -> bool {
        self.signature == Self::SIGNATURE
    }
}

// ── Enumerations ────────────────────────────────────────────────────

/// Header generation, selected by the header-size field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HeaderVariant {
    Core,
    Info,
    V4,
    V5,
}

impl HeaderVariant {
    pub fn from_size(size: u32) -> Option<Self> {
        match size {
            12 => Some(Self::Core),
            40 => Some(Self::Info),
            108 => Some(Self::V4),
            124 => Some(Self::V5),
            _ => None,
        }
    }

    /// Header size in bytes, including the size field.
    pub fn size(self) -> u32 {
        match self {
            Self::Core => CoreHeader::SIZE,
            Self::Info => InfoHeader::SIZE,
            Self::V4 => V4Header::SIZE,
            Self::V5 => V5Header::SIZE,
        }
    }
}

/// `biCompression`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum Compression {
    Rgb = 0,
    Rle8 = 1,
    Rle4 = 2,
    Bitfields = 3,
    Jpeg = 4,
    Png = 5,
    AlphaBitfields = 6,
}

impl Compression {
    pub fn from_u32(code: u32) -> Result<Self, DibError> {
        match code {
            0 => Ok(Self::Rgb),
            1 => Ok(Self::Rle8),
            2 => Ok(Self::Rle4),
            3 => Ok(Self::Bitfields),
            4 => Ok(Self::Jpeg),
            5 => Ok(Self::Png),
            6 => Ok(Self::AlphaBitfields),
            _ => Err(DibError::InvalidFormat(format!(
                "unknown compression method {code}"
            ))),
        }
    }

    pub fn as_u32(self) -> u32 {
        self as u32
    }

    /// Pixel values are stored uncompressed, one per addressable pixel.
    pub fn is_uncompressed(self) -> bool {
        matches!(self, Self::Rgb | Self::Bitfields | Self::AlphaBitfields)
    }

    pub fn has_masks(self) -> bool {
        matches!(self, Self::Bitfields | Self::AlphaBitfields)
    }
}

/// `bV4CSType`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ColorSpaceType {
    /// Endpoints and gammas in the header are authoritative.
    Calibrated,
    Srgb,
    Windows,
    Linked,
    Embedded,
    Unknown(u32),
}

impl ColorSpaceType {
    pub fn from_u32(code: u32) -> Self {
        match code {
            0 => Self::Calibrated,
            0x7352_4742 => Self::Srgb,
            0x5769_6E20 => Self::Windows,
            0x4C49_4E4B => Self::Linked,
            0x4D42_4544 => Self::Embedded,
            other => Self::Unknown(other),
        }
    }

    pub fn as_u32(self) -> u32 {
        match self {
            Self::Calibrated => 0,
            Self::Srgb => 0x7352_4742,
            Self::Windows => 0x5769_6E20,
            Self::Linked => 0x4C49_4E4B,
            Self::Embedded => 0x4D42_4544,
            Self::Unknown(code) => code,
        }
    }
}

// ── Masks and color space ───────────────────────────────────────────

/// Channel bit masks for `BI_BITFIELDS` / `BI_ALPHABITFIELDS` pixel data.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct ColorMask {
    pub red: u32,
    pub green: u32,
    pub blue: u32,
    pub alpha: u32,
}

impl ColorMask {
    pub const fn rgb(red: u32, green: u32, blue: u32) -> Self {
        Self {
            red,
            green,
            blue,
            alpha: 0,
        }
    }

    /// The implicit masks of uncompressed 16- and 32-bit data.
    pub fn default_for(depth: BitDepth) -> Option<Self> {
        match depth {
            BitDepth::Bit16 => Some(Self::rgb(0x7C00, 0x03E0, 0x001F)),
            BitDepth::Bit24 | BitDepth::Bit32 => {
                Some(Self::rgb(0x00FF_0000, 0x0000_FF00, 0x0000_00FF))
            }
            _ => None,
        }
    }

    /// Extract a color, scaling each channel from its mask width to 8 bits.
    pub fn decode(&self, raw: u32) -> RGB8 {
        RGB8::new(
            extract(raw, self.red),
            extract(raw, self.green),
            extract(raw, self.blue),
        )
    }

    /// Pack a color; the alpha channel, if any, is written fully opaque.
    pub fn encode(&self, color: RGB8) -> u32 {
        insert(color.r, self.red)
            | insert(color.g, self.green)
            | insert(color.b, self.blue)
            | self.alpha
    }
}

fn extract(raw: u32, mask: u32) -> u8 {
    if mask == 0 {
        return 0;
    }
    let shift = mask.trailing_zeros();
    scale_channel((raw & mask) >> shift, mask >> shift, 0xFF) as u8
}

fn insert(channel: u8, mask: u32) -> u32 {
    if mask == 0 {
        return 0;
    }
    let shift = mask.trailing_zeros();
    (scale_channel(u32::from(channel), 0xFF, mask >> shift) << shift) & mask
}

/// `CIEXYZ`, each component a 2.30 fixed-point value.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct CieXyz {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct CieXyzTriple {
    pub red: CieXyz,
    pub green: CieXyz,
    pub blue: CieXyz,
}

/// Color space fields shared by V4 and V5 headers. Passed through untouched.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ColorSpace {
    pub cs_type: ColorSpaceType,
    pub endpoints: CieXyzTriple,
    /// 16.16 fixed-point gammas.
    pub gamma_red: u32,
    pub gamma_green: u32,
    pub gamma_blue: u32,
}

impl Default for ColorSpace {
    fn default() -> Self {
        Self {
            cs_type: ColorSpaceType::Srgb,
            endpoints: CieXyzTriple::default(),
            gamma_red: 0,
            gamma_green: 0,
            gamma_blue: 0,
        }
    }
}

fn parse_mask(r: &mut ByteReader<'_>) -> Result<ColorMask, DibError> {
    Ok(ColorMask {
        red: r.get_u32_le()?,
        green: r.get_u32_le()?,
        blue: r.get_u32_le()?,
        alpha: r.get_u32_le()?,
    })
}

fn write_mask(m: &ColorMask, out: &mut Vec<u8>) {
    put_u32(out, m.red);
    put_u32(out, m.green);
    put_u32(out, m.blue);
    put_u32(out, m.alpha);
}

fn parse_xyz(r: &mut ByteReader<'_>) -> Result<CieXyz, DibError> {
    Ok(CieXyz {
        x: r.get_i32_le()?,
        y: r.get_i32_le()?,
        z: r.get_i32_le()?,
    })
}

fn parse_color_space(r: &mut ByteReader<'_>) -> Result<ColorSpace, DibError> {
    Ok(ColorSpace {
        cs_type: ColorSpaceType::from_u32(r.get_u32_le()?),
        endpoints: CieXyzTriple {
            red: parse_xyz(r)?,
            green: parse_xyz(r)?,
            blue: parse_xyz(r)?,
        },
        gamma_red: r.get_u32_le()?,
        gamma_green: r.get_u32_le()?,
        gamma_blue: r.get_u32_le()?,
    })
}

fn write_color_space(cs: &ColorSpace, out: &mut Vec<u8>) {
    put_u32(out, cs.cs_type.as_u32());
    for xyz in [cs.endpoints.red, cs.endpoints.green, cs.endpoints.blue] {
        put_i32(out, xyz.x);
        put_i32(out, xyz.y);
        put_i32(out, xyz.z);
    }
    put_u32(out, cs.gamma_red);
    put_u32(out, cs.gamma_green);
    put_u32(out, cs.gamma_blue);
}

/// Decode palette entries stored as B, G, R (and a reserved byte when
/// `entry_size` is 4).
pub(crate) fn parse_palette(bytes: &[u8], entry_size: usize) -> Vec<RGB8> {
    bytes
        .chunks_exact(entry_size)
        .map(|e| RGB8::new(e[2], e[1], e[0]))
        .collect()
}

// ── Header trait ────────────────────────────────────────────────────

/// Behavior shared by the four header generations.
pub trait DibHeader: Clone + fmt::Debug + Sized {
    /// Header size in bytes, including the 4-byte size field.
    const SIZE: u32;
    const VARIANT: HeaderVariant;
    /// 3 for Core (`RGBTRIPLE`), 4 otherwise (`RGBQUAD`).
    const PALETTE_ENTRY_SIZE: usize;
    /// Bit depths this header generation can describe.
    type Depths: DepthFamily;

    /// Parse the `SIZE - 4` bytes that follow the size field.
    fn parse(bytes: &[u8]) -> Result<Self, DibError>;

    /// Append the fields that follow the size field.
    fn write_to(&self, out: &mut Vec<u8>);

    /// A header describing an uncompressed image of `size` at `depth`.
    fn for_image(size: ImageSize, depth: BitDepth) -> Result<Self, DibError>;

    /// Raw signed width and height fields.
    fn dimensions(&self) -> (i32, i32);

    fn bit_count(&self) -> u16;

    fn compression(&self) -> Compression {
        Compression::Rgb
    }

    /// Palette length override; 0 means `2^bits`.
    fn colors_used(&self) -> u32 {
        0
    }

    /// Masks carried inside the header itself.
    fn color_mask(&self) -> Option<ColorMask> {
        None
    }

    /// Record the pixel array length, for headers that have the field.
    fn set_image_byte_length(&mut self, _len: u32) {}

    /// Validated dimensions.
    ///
    /// Top-down images (negative height) are `NotImplemented`.
    fn image_size(&self) -> Result<ImageSize, DibError> {
        let (w, h) = self.dimensions();
        if h < 0 {
            return Err(DibError::NotImplemented(format!(
                "top-down bitmaps (height {h})"
            )));
        }
        if w <= 0 || h == 0 {
            return Err(DibError::InvalidFormat(format!(
                "invalid bitmap dimensions {w}x{h}"
            )));
        }
        ImageSize::new(w as u32, h as u32)
    }

    /// Validated bit depth for this header generation.
    fn bit_depth(&self) -> Result<BitDepth, DibError> {
        let bits = self.bit_count();
        BitDepth::from_bits(bits)
            .filter(|&d| <Self::Depths as DepthFamily>::supports(d))
            .ok_or_else(|| {
                DibError::InvalidFormat(format!(
                    "bit count {bits} is not valid for {:?} headers",
                    Self::VARIANT
                ))
            })
    }
}

// ── Core ────────────────────────────────────────────────────────────

/// `BITMAPCOREHEADER`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CoreHeader {
    pub width: u16,
    pub height: u16,
    pub planes: u16,
    pub bit_count: u16,
}

impl DibHeader for CoreHeader {
    const SIZE: u32 = 12;
    const VARIANT: HeaderVariant = HeaderVariant::Core;
    const PALETTE_ENTRY_SIZE: usize = 3;
    type Depths = CoreDepths;

    fn parse(bytes: &[u8]) -> Result<Self, DibError> {
        let mut r = ByteReader::new(bytes);
        Ok(Self {
            width: r.get_u16_le()?,
            height: r.get_u16_le()?,
            planes: r.get_u16_le()?,
            bit_count: r.get_u16_le()?,
        })
    }

    fn write_to(&self, out: &mut Vec<u8>) {
        put_u16(out, self.width);
        put_u16(out, self.height);
        put_u16(out, self.planes);
        put_u16(out, self.bit_count);
    }

    fn for_image(size: ImageSize, depth: BitDepth) -> Result<Self, DibError> {
        CoreDepths::check(depth)?;
        let narrow = |v: u32| {
            u16::try_from(v).map_err(|_| {
                DibError::InvalidArgument(format!(
                    "core headers hold dimensions up to {}, got {v}",
                    u16::MAX
                ))
            })
        };
        Ok(Self {
            width: narrow(size.width())?,
            height: narrow(size.height())?,
            planes: 1,
            bit_count: depth.bits(),
        })
    }

    fn dimensions(&self) -> (i32, i32) {
        (i32::from(self.width), i32::from(self.height))
    }

    fn bit_count(&self) -> u16 {
        self.bit_count
    }
}

// ── Info ────────────────────────────────────────────────────────────

/// `BITMAPINFOHEADER`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InfoHeader {
    pub width: i32,
    /// Positive for bottom-up storage.
    pub height: i32,
    pub planes: u16,
    pub bit_count: u16,
    pub compression: Compression,
    /// Pixel array length; may be 0 for uncompressed data.
    pub image_size: u32,
    pub x_pixels_per_meter: i32,
    pub y_pixels_per_meter: i32,
    pub colors_used: u32,
    pub colors_important: u32,
}

impl InfoHeader {
    fn read(r: &mut ByteReader<'_>) -> Result<Self, DibError> {
        Ok(Self {
            width: r.get_i32_le()?,
            height: r.get_i32_le()?,
            planes: r.get_u16_le()?,
            bit_count: r.get_u16_le()?,
            compression: Compression::from_u32(r.get_u32_le()?)?,
            image_size: r.get_u32_le()?,
            x_pixels_per_meter: r.get_i32_le()?,
            y_pixels_per_meter: r.get_i32_le()?,
            colors_used: r.get_u32_le()?,
            colors_important: r.get_u32_le()?,
        })
    }

    fn write(&self, out: &mut Vec<u8>) {
        put_i32(out, self.width);
        put_i32(out, self.height);
        put_u16(out, self.planes);
        put_u16(out, self.bit_count);
        put_u32(out, self.compression.as_u32());
        put_u32(out, self.image_size);
        put_i32(out, self.x_pixels_per_meter);
        put_i32(out, self.y_pixels_per_meter);
        put_u32(out, self.colors_used);
        put_u32(out, self.colors_important);
    }

    fn new(size: ImageSize, depth: BitDepth) -> Result<Self, DibError> {
        RgbDepths::check(depth)?;
        Ok(Self {
            width: size.width() as i32,
            height: size.height() as i32,
            planes: 1,
            bit_count: depth.bits(),
            compression: Compression::Rgb,
            image_size: 0,
            x_pixels_per_meter: 0,
            y_pixels_per_meter: 0,
            colors_used: 0,
            colors_important: 0,
        })
    }
}

impl DibHeader for InfoHeader {
    const SIZE: u32 = 40;
    const VARIANT: HeaderVariant = HeaderVariant::Info;
    const PALETTE_ENTRY_SIZE: usize = 4;
    type Depths = RgbDepths;

    fn parse(bytes: &[u8]) -> Result<Self, DibError> {
        Self::read(&mut ByteReader::new(bytes))
    }

    fn write_to(&self, out: &mut Vec<u8>) {
        self.write(out);
    }

    fn for_image(size: ImageSize, depth: BitDepth) -> Result<Self, DibError> {
        Self::new(size, depth)
    }

    fn dimensions(&self) -> (i32, i32) {
        (self.width, self.height)
    }

    fn bit_count(&self) -> u16 {
        self.bit_count
    }

    fn compression(&self) -> Compression {
        self.compression
    }

    fn colors_used(&self) -> u32 {
        self.colors_used
    }

    fn set_image_byte_length(&mut self, len: u32) {
        self.image_size = len;
    }
}

// ── V4 / V5 ─────────────────────────────────────────────────────────

/// `BITMAPV4HEADER`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct V4Header {
    pub info: InfoHeader,
    pub color_mask: ColorMask,
    pub color_space: ColorSpace,
}

impl DibHeader for V4Header {
    const SIZE: u32 = 108;
    const VARIANT: HeaderVariant = HeaderVariant::V4;
    const PALETTE_ENTRY_SIZE: usize = 4;
    type Depths = RgbDepths;

    fn parse(bytes: &[u8]) -> Result<Self, DibError> {
        let mut r = ByteReader::new(bytes);
        Ok(Self {
            info: InfoHeader::read(&mut r)?,
            color_mask: parse_mask(&mut r)?,
            color_space: parse_color_space(&mut r)?,
        })
    }

    fn write_to(&self, out: &mut Vec<u8>) {
        self.info.write(out);
        write_mask(&self.color_mask, out);
        write_color_space(&self.color_space, out);
    }

    fn for_image(size: ImageSize, depth: BitDepth) -> Result<Self, DibError> {
        Ok(Self {
            info: InfoHeader::new(size, depth)?,
            color_mask: ColorMask::default_for(depth).unwrap_or_default(),
            color_space: ColorSpace::default(),
        })
    }

    fn dimensions(&self) -> (i32, i32) {
        (self.info.width, self.info.height)
    }

    fn bit_count(&self) -> u16 {
        self.info.bit_count
    }

    fn compression(&self) -> Compression {
        self.info.compression
    }

    fn colors_used(&self) -> u32 {
        self.info.colors_used
    }

    fn color_mask(&self) -> Option<ColorMask> {
        Some(self.color_mask)
    }

    fn set_image_byte_length(&mut self, len: u32) {
        self.info.image_size = len;
    }
}

/// `BITMAPV5HEADER`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct V5Header {
    pub info: InfoHeader,
    pub color_mask: ColorMask,
    pub color_space: ColorSpace,
    /// Rendering intent (`LCS_GM_*`).
    pub intent: u32,
    /// Offset of the ICC profile from the start of this header.
    pub profile_data: u32,
    pub profile_size: u32,
    pub reserved: u32,
}

impl DibHeader for V5Header {
    const SIZE: u32 = 124;
    const VARIANT: HeaderVariant = HeaderVariant::V5;
    const PALETTE_ENTRY_SIZE: usize = 4;
    type Depths = RgbDepths;

    fn parse(bytes: &[u8]) -> Result<Self, DibError> {
        let mut r = ByteReader::new(bytes);
        Ok(Self {
            info: InfoHeader::read(&mut r)?,
            color_mask: parse_mask(&mut r)?,
            color_space: parse_color_space(&mut r)?,
            intent: r.get_u32_le()?,
            profile_data: r.get_u32_le()?,
            profile_size: r.get_u32_le()?,
            reserved: r.get_u32_le()?,
        })
    }

    fn write_to(&self, out: &mut Vec<u8>) {
        self.info.write(out);
        write_mask(&self.color_mask, out);
        write_color_space(&self.color_space, out);
        put_u32(out, self.intent);
        put_u32(out, self.profile_data);
        put_u32(out, self.profile_size);
        put_u32(out, self.reserved);
    }

    fn for_image(size: ImageSize, depth: BitDepth) -> Result<Self, DibError> {
        Ok(Self {
            info: InfoHeader::new(size, depth)?,
            color_mask: ColorMask::default_for(depth).unwrap_or_default(),
            color_space: ColorSpace::default(),
            // LCS_GM_IMAGES
            intent: 4,
            profile_data: 0,
            profile_size: 0,
            reserved: 0,
        })
    }

    fn dimensions(&self) -> (i32, i32) {
        (self.info.width, self.info.height)
    }

    fn bit_count(&self) -> u16 {
        self.info.bit_count
    }

    fn compression(&self) -> Compression {
        self.info.compression
    }

    fn colors_used(&self) -> u32 {
        self.info.colors_used
    }

    fn color_mask(&self) -> Option<ColorMask> {
        Some(self.color_mask)
    }

    fn set_image_byte_length(&mut self, len: u32) {
        self.info.image_size = len;
    }
}
