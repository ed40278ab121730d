//! Packed pixel values and per-depth color conversion.

use alloc::format;
use core::fmt;

use rgb::RGB8;

use crate::error::DibError;

/// Bits per pixel of a DIB pixel array.
#[non_exhaustive]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u16)]
pub enum BitDepth {
    /// 2-color indexed.
    Bit1 = 1,
    /// 16-color indexed.
    Bit4 = 4,
    /// 256-color indexed.
    Bit8 = 8,
    /// Direct color, 5 bits per channel.
    Bit16 = 16,
    /// Direct color, 8 bits per channel.
    Bit24 = 24,
    /// Direct color, 8 bits per channel plus an unused byte.
    Bit32 = 32,
}

impl BitDepth {
    /// Parse the header's bit count field.
    pub fn from_bits(bits: u16) -> Option<Self> {
        match bits {
            1 => Some(Self::Bit1),
            4 => Some(Self::Bit4),
            8 => Some(Self::Bit8),
            16 => Some(Self::Bit16),
            24 => Some(Self::Bit24),
            32 => Some(Self::Bit32),
            _ => None,
        }
    }

    pub const fn bits(self) -> u16 {
        self as u16
    }

    /// Bytes occupied by one packed value: `ceil(bits / 8)`.
    pub const fn byte_length(self) -> usize {
        (self as usize).div_ceil(8)
    }

    /// Whether raw values are palette indices rather than colors.
    pub const fn is_indexed(self) -> bool {
        (self as u16) <= 8
    }

    /// Default palette size for indexed depths (`2^bits`), 0 otherwise.
    pub const fn palette_capacity(self) -> usize {
        if self.is_indexed() {
            1usize << (self as u16)
        } else {
            0
        }
    }

    /// Mask of the bits that a raw value of this depth can occupy.
    pub(crate) const fn value_mask(self) -> u32 {
        match self {
            Self::Bit32 => u32::MAX,
            _ => (1u32 << (self as u16)) - 1,
        }
    }
}

impl TryFrom<u16> for BitDepth {
    type Error = DibError;

    fn try_from(bits: u16) -> Result<Self, DibError> {
        Self::from_bits(bits)
            .ok_or_else(|| DibError::InvalidArgument(format!("unrecognized bit depth {bits}")))
    }
}

impl fmt::Display for BitDepth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-bit", self.bits())
    }
}

/// A set of bit depths that a header generation can carry.
///
/// The scan cursor and writer are generic over the family so that one engine
/// serves both the Core header (1/4/8/24) and the Info/V4/V5 headers.
pub trait DepthFamily {
    /// Human-readable family name for error messages.
    const NAME: &'static str;
    const DEPTHS: &'static [BitDepth];

    fn supports(depth: BitDepth) -> bool {
        Self::DEPTHS.contains(&depth)
    }

    /// Reject depths outside the family with `InvalidArgument`.
    fn check(depth: BitDepth) -> Result<(), DibError> {
        if Self::supports(depth) {
            Ok(())
        } else {
            Err(DibError::InvalidArgument(format!(
                "{depth} is not supported by {} bitmaps",
                Self::NAME
            )))
        }
    }
}

/// Depths valid with the 12-byte Core header.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CoreDepths;

impl DepthFamily for CoreDepths {
    const NAME: &'static str = "core";
    const DEPTHS: &'static [BitDepth] = &[
        BitDepth::Bit1,
        BitDepth::Bit4,
        BitDepth::Bit8,
        BitDepth::Bit24,
    ];
}

/// Depths valid with the Info, V4, and V5 headers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RgbDepths;

impl DepthFamily for RgbDepths {
    const NAME: &'static str = "info";
    const DEPTHS: &'static [BitDepth] = &[
        BitDepth::Bit1,
        BitDepth::Bit4,
        BitDepth::Bit8,
        BitDepth::Bit16,
        BitDepth::Bit24,
        BitDepth::Bit32,
    ];
}

/// One packed pixel value, stored little-endian in its on-disk width.
///
/// Sub-byte depths hold the unpacked index in the low bits of their byte;
/// the scan cursor and writer take care of bit placement within the row.
/// Higher bits in that byte are ignored.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PixelData {
    Bit1([u8; 1]),
    Bit4([u8; 1]),
    Bit8([u8; 1]),
    Bit16([u8; 2]),
    Bit24([u8; 3]),
    Bit32([u8; 4]),
}

impl PixelData {
    /// Build a value from a raw integer, discarding bits the depth cannot hold.
    pub fn from_raw(depth: BitDepth, raw: u32) -> Self {
        let v = raw & depth.value_mask();
        let b = v.to_le_bytes();
        match depth {
            BitDepth::Bit1 => Self::Bit1([b[0]]),
            BitDepth::Bit4 => Self::Bit4([b[0]]),
            BitDepth::Bit8 => Self::Bit8([b[0]]),
            BitDepth::Bit16 => Self::Bit16([b[0], b[1]]),
            BitDepth::Bit24 => Self::Bit24([b[0], b[1], b[2]]),
            BitDepth::Bit32 => Self::Bit32(b),
        }
    }

    /// Build a value from the first `depth.byte_length()` bytes of `bytes`.
    pub(crate) fn from_le_bytes(depth: BitDepth, bytes: [u8; 4]) -> Self {
        Self::from_raw(depth, u32::from_le_bytes(bytes))
    }

    /// The raw value widened to 32 bits, without bits the depth cannot hold.
    pub fn raw(&self) -> u32 {
        let mut b = [0u8; 4];
        let src = self.as_bytes();
        b[..src.len()].copy_from_slice(src);
        u32::from_le_bytes(b) & self.depth().value_mask()
    }

    pub fn depth(&self) -> BitDepth {
        match self {
            Self::Bit1(_) => BitDepth::Bit1,
            Self::Bit4(_) => BitDepth::Bit4,
            Self::Bit8(_) => BitDepth::Bit8,
            Self::Bit16(_) => BitDepth::Bit16,
            Self::Bit24(_) => BitDepth::Bit24,
            Self::Bit32(_) => BitDepth::Bit32,
        }
    }

    /// Little-endian bytes in the on-disk width of the depth.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Bit1(b) | Self::Bit4(b) | Self::Bit8(b) => b,
            Self::Bit16(b) => b,
            Self::Bit24(b) => b,
            Self::Bit32(b) => b,
        }
    }

    /// Decode a direct-color value.
    ///
    /// Indexed values need a palette; use [`PixelData::to_rgb_with_palette`].
    pub fn to_rgb(&self) -> Result<RGB8, DibError> {
        let raw = self.raw();
        match self {
            Self::Bit1(_) | Self::Bit4(_) | Self::Bit8(_) => Err(DibError::InvalidOperation(
                format!("{} values are palette indices", self.depth()),
            )),
            Self::Bit16(_) => Ok(RGB8::new(
                scale_channel((raw >> 10) & 0x1F, 0x1F, 0xFF) as u8,
                scale_channel((raw >> 5) & 0x1F, 0x1F, 0xFF) as u8,
                scale_channel(raw & 0x1F, 0x1F, 0xFF) as u8,
            )),
            Self::Bit24(_) | Self::Bit32(_) => Ok(RGB8::new(
                (raw >> 16) as u8,
                (raw >> 8) as u8,
                raw as u8,
            )),
        }
    }

    /// Decode any value, resolving indexed depths through `palette`.
    pub fn to_rgb_with_palette(&self, palette: &[RGB8]) -> Result<RGB8, DibError> {
        if !self.depth().is_indexed() {
            return self.to_rgb();
        }
        let idx = self.raw() as usize;
        palette.get(idx).copied().ok_or_else(|| {
            DibError::OutOfRange(format!(
                "palette index {idx} out of range (palette has {} entries)",
                palette.len()
            ))
        })
    }

    /// Encode a color at a direct-color depth.
    ///
    /// Indexed depths fail with `NotImplemented`: choosing a palette index
    /// for an arbitrary color is not supported.
    pub fn from_rgb(depth: BitDepth, color: RGB8) -> Result<Self, DibError> {
        let (r, g, b) = (u32::from(color.r), u32::from(color.g), u32::from(color.b));
        match depth {
            BitDepth::Bit1 | BitDepth::Bit4 | BitDepth::Bit8 => Err(DibError::NotImplemented(
                format!("encoding colors as {depth} palette indices"),
            )),
            BitDepth::Bit16 => Ok(Self::from_raw(
                depth,
                (scale_channel(r, 0xFF, 0x1F) << 10)
                    | (scale_channel(g, 0xFF, 0x1F) << 5)
                    | scale_channel(b, 0xFF, 0x1F),
            )),
            BitDepth::Bit24 | BitDepth::Bit32 => {
                Ok(Self::from_raw(depth, (r << 16) | (g << 8) | b))
            }
        }
    }
}

/// Rescale `value` from `[0, from_max]` to `[0, to_max]`, rounding to nearest.
pub(crate) fn scale_channel(value: u32, from_max: u32, to_max: u32) -> u32 {
    if from_max == 0 {
        return 0;
    }
    let from = u64::from(from_max);
    ((u64::from(value.min(from_max)) * u64::from(to_max) + from / 2) / from) as u32
}
