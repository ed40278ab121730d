//! Hand-built files covering the layouts the encoder never produces.

use enough::Unstoppable;
use rgb::RGB8;
use zendib::*;

const BLACK: RGB8 = RGB8::new(0, 0, 0);
const WHITE: RGB8 = RGB8::new(255, 255, 255);
const RED: RGB8 = RGB8::new(255, 0, 0);
const GREEN: RGB8 = RGB8::new(0, 255, 0);
const BLUE: RGB8 = RGB8::new(0, 0, 255);

/// File header + size field + `fields` (zero-padded to the header size) +
/// `extra` (masks, palette), then pixels.
fn bmp(header_size: u32, fields: &[u8], extra: &[u8], pixels: &[u8]) -> Vec<u8> {
    let offset = 14 + header_size as usize + extra.len();
    let total = offset + pixels.len();
    let mut out = Vec::with_capacity(total);
    out.extend_from_slice(b"BM");
    out.extend_from_slice(&(total as u32).to_le_bytes());
    out.extend_from_slice(&[0; 4]);
    out.extend_from_slice(&(offset as u32).to_le_bytes());
    out.extend_from_slice(&header_size.to_le_bytes());
    out.extend_from_slice(fields);
    out.resize(14 + header_size as usize, 0);
    out.extend_from_slice(extra);
    out.extend_from_slice(pixels);
    out
}

fn info_fields(w: i32, h: i32, bits: u16, compression: u32, colors_used: u32) -> Vec<u8> {
    let mut f = Vec::with_capacity(36);
    f.extend_from_slice(&w.to_le_bytes());
    f.extend_from_slice(&h.to_le_bytes());
    f.extend_from_slice(&1u16.to_le_bytes());
    f.extend_from_slice(&bits.to_le_bytes());
    f.extend_from_slice(&compression.to_le_bytes());
    f.extend_from_slice(&[0; 12]); // image size, resolution
    f.extend_from_slice(&colors_used.to_le_bytes());
    f.extend_from_slice(&[0; 4]);
    f
}

fn quads(colors: &[RGB8]) -> Vec<u8> {
    colors.iter().flat_map(|c| [c.b, c.g, c.r, 0]).collect()
}

fn words(values: &[u32]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_le_bytes()).collect()
}

fn decode(data: &[u8]) -> Result<DecodeOutput, DibError> {
    DecodeRequest::new(data).decode(Unstoppable)
}

// ── Indexed ─────────────────────────────────────────────────────────

#[test]
fn info_8bit_palette() {
    let palette = quads(&[BLACK, RED, GREEN, BLUE]);
    #[rustfmt::skip]
    let pixels = [
        1, 2, 3, 0, // bottom row
        3, 0, 1, 0, // top row
    ];
    let data = bmp(40, &info_fields(3, 2, 8, 0, 4), &palette, &pixels);

    let out = decode(&data).unwrap();
    assert_eq!(out.info.bit_depth, BitDepth::Bit8);
    assert_eq!(out.info.pixel_offset, 14 + 40 + 16);
    assert_eq!(out.image.buf(), &[BLUE, BLACK, RED, RED, GREEN, BLUE]);

    let mut bmp = InfoBitmap::open(SliceStream::new(&data)).unwrap();
    assert_eq!(bmp.palette().map(<[RGB8]>::len), Some(4));
    assert_eq!(bmp.get_pixel_raw(Point::new(2, 0)).unwrap().raw(), 1);
    assert!(matches!(
        bmp.set_pixel(Point::new(0, 0), RED),
        Err(DibError::NotImplemented(_))
    ));
}

#[test]
fn info_4bit_full_palette() {
    let mut colors = vec![BLACK; 16];
    colors[1] = RED;
    colors[2] = GREEN;
    colors[3] = BLUE;
    let data = bmp(
        40,
        &info_fields(3, 1, 4, 0, 0),
        &quads(&colors),
        &[0x12, 0x30, 0, 0],
    );
    let out = decode(&data).unwrap();
    assert_eq!(out.image.buf(), &[RED, GREEN, BLUE]);
}

#[test]
fn core_1bit_uses_triples_and_msb_first() {
    let mut fields = Vec::new();
    fields.extend_from_slice(&10u16.to_le_bytes());
    fields.extend_from_slice(&2u16.to_le_bytes());
    fields.extend_from_slice(&1u16.to_le_bytes());
    fields.extend_from_slice(&1u16.to_le_bytes());
    let palette = [0, 0, 0, 255, 255, 255];
    #[rustfmt::skip]
    let pixels = [
        0b1010_1010, 0b1000_0000, 0, 0, // bottom row
        0b1111_1111, 0b1100_0000, 0, 0, // top row
    ];
    let data = bmp(12, &fields, &palette, &pixels);

    let out = decode(&data).unwrap();
    assert_eq!(out.info.variant, HeaderVariant::Core);
    let top = &out.image.buf()[..10];
    assert!(top.iter().all(|&c| c == WHITE));
    let bottom = &out.image.buf()[10..];
    for (x, &c) in bottom.iter().enumerate() {
        assert_eq!(c, if x % 2 == 0 { WHITE } else { BLACK }, "x = {x}");
    }

    let mut bmp = CoreBitmap::open(SliceStream::new(&data)).unwrap();
    assert_eq!(bmp.get_pixel_raw(Point::new(1, 1)).unwrap().raw(), 0);
    assert_eq!(bmp.get_pixel_raw(Point::new(9, 0)).unwrap().raw(), 1);
}

#[test]
fn palette_index_past_colors_used() {
    let data = bmp(
        40,
        &info_fields(1, 1, 8, 0, 2),
        &quads(&[BLACK, WHITE]),
        &[5, 0, 0, 0],
    );
    assert!(matches!(decode(&data), Err(DibError::OutOfRange(_))));
}

#[test]
fn oversized_palette_is_invalid() {
    let data = bmp(
        40,
        &info_fields(1, 1, 1, 0, 3),
        &quads(&[BLACK, WHITE, RED]),
        &[0, 0, 0, 0],
    );
    assert!(matches!(decode(&data), Err(DibError::InvalidFormat(_))));
}

// ── Bit fields ──────────────────────────────────────────────────────

#[test]
fn info_16bit_565_bitfields() {
    let masks = words(&[0xF800, 0x07E0, 0x001F]);
    let data = bmp(
        40,
        &info_fields(2, 1, 16, 3, 0),
        &masks,
        &[0x00, 0xF8, 0xE0, 0x07],
    );
    let out = decode(&data).unwrap();
    assert_eq!(out.info.compression, Compression::Bitfields);
    assert_eq!(out.image.buf(), &[RED, GREEN]);
}

#[test]
fn v4_32bit_masks_in_header() {
    let mut fields = info_fields(1, 1, 32, 3, 0);
    fields.extend(words(&[0x00FF_0000, 0x0000_FF00, 0x0000_00FF, 0xFF00_0000]));
    let data = bmp(108, &fields, &[], &[0x30, 0x20, 0x10, 0x80]);

    let out = decode(&data).unwrap();
    assert_eq!(out.info.variant, HeaderVariant::V4);
    assert_eq!(out.image.buf(), &[RGB8::new(0x10, 0x20, 0x30)]);

    let bmp = V4Bitmap::open(SliceStream::new(&data)).unwrap();
    assert_eq!(bmp.color_mask().map(|m| m.alpha), Some(0xFF00_0000));
}

#[test]
fn info_32bit_alpha_bitfields() {
    let masks = words(&[0x00FF_0000, 0x0000_FF00, 0x0000_00FF, 0xFF00_0000]);
    let data = bmp(
        40,
        &info_fields(2, 1, 32, 6, 0),
        &masks,
        &[0x30, 0x20, 0x10, 0x00, 0xFF, 0xFF, 0xFF, 0x80],
    );
    let out = decode(&data).unwrap();
    assert_eq!(out.info.compression, Compression::AlphaBitfields);
    assert_eq!(out.info.pixel_offset, 14 + 40 + 16);
    assert_eq!(out.image.buf(), &[RGB8::new(0x10, 0x20, 0x30), WHITE]);

    let mut bmp = InfoBitmap::open(MemoryStream::from_vec(data)).unwrap();
    let mask = bmp.color_mask().unwrap();
    assert_eq!(mask.alpha, 0xFF00_0000);
    assert_eq!(mask.red, 0x00FF_0000);
    bmp.set_pixel(Point::new(1, 0), RED).unwrap();
    assert_eq!(bmp.get_pixel(Point::new(1, 0)).unwrap(), RED);
    let bytes = bmp.into_loader().into_stream().into_inner();
    assert_eq!(&bytes[74..78], &[0x00, 0x00, 0xFF, 0xFF]);
}

#[test]
fn bitfields_need_16_or_32_bits() {
    let masks = words(&[0xFF_0000, 0xFF00, 0xFF]);
    let data = bmp(40, &info_fields(1, 1, 24, 3, 0), &masks, &[0; 4]);
    assert!(matches!(decode(&data), Err(DibError::InvalidFormat(_))));
}

// ── Header variants ─────────────────────────────────────────────────

#[test]
fn extended_info_header_parses_as_info() {
    // 56-byte header: info fields plus four masks
    let data = bmp(56, &info_fields(1, 1, 24, 0, 0), &[], &[1, 2, 3, 0]);
    let info = ImageInfo::from_bytes(&data).unwrap();
    assert_eq!(info.variant, HeaderVariant::Info);
    assert_eq!(info.pixel_offset, 14 + 56);
    assert_eq!(decode(&data).unwrap().image.buf(), &[RGB8::new(3, 2, 1)]);
}

#[test]
fn probe_reads_headers_only() {
    let data = bmp(124, &info_fields(640, 480, 32, 0, 0), &[], &[]);
    let info = ImageInfo::from_bytes(&data).unwrap();
    assert_eq!((info.width, info.height), (640, 480));
    assert_eq!(info.variant, HeaderVariant::V5);
    assert_eq!(info.bit_depth, BitDepth::Bit32);
    assert!(matches!(decode(&data), Err(DibError::UnexpectedEof)));
}

// ── Rejections ──────────────────────────────────────────────────────

#[test]
fn top_down_is_not_implemented() {
    let data = bmp(40, &info_fields(1, -1, 24, 0, 0), &[], &[0; 4]);
    assert!(matches!(decode(&data), Err(DibError::NotImplemented(_))));
}

#[test]
fn rle_payloads_are_not_implemented() {
    let data = bmp(
        40,
        &info_fields(2, 1, 8, 1, 2),
        &quads(&[BLACK, WHITE]),
        &[2, 1, 0, 1],
    );
    assert_eq!(ImageInfo::from_bytes(&data).unwrap().compression, Compression::Rle8);
    assert!(matches!(decode(&data), Err(DibError::NotImplemented(_))));
}

#[test]
fn malformed_headers() {
    let good = bmp(40, &info_fields(1, 1, 24, 0, 0), &[], &[0; 4]);

    let mut bad_sig = good.clone();
    bad_sig[..2].copy_from_slice(b"PK");
    assert!(matches!(
        ImageInfo::from_bytes(&bad_sig),
        Err(DibError::InvalidFormat(_))
    ));
    assert!(matches!(decode(&bad_sig), Err(DibError::InvalidFormat(_))));

    assert!(matches!(decode(&good[..10]), Err(DibError::InvalidFormat(_))));
    assert!(matches!(decode(&[]), Err(DibError::InvalidFormat(_))));

    let odd_size = bmp(20, &info_fields(1, 1, 24, 0, 0)[..16], &[], &[0; 4]);
    assert!(matches!(decode(&odd_size), Err(DibError::InvalidFormat(_))));

    let bad_bits = bmp(40, &info_fields(1, 1, 2, 0, 0), &[], &[0; 4]);
    assert!(matches!(decode(&bad_bits), Err(DibError::InvalidFormat(_))));

    let bad_compression = bmp(40, &info_fields(1, 1, 24, 9, 0), &[], &[0; 4]);
    assert!(matches!(
        decode(&bad_compression),
        Err(DibError::InvalidFormat(_))
    ));

    let zero_width = bmp(40, &info_fields(0, 1, 24, 0, 0), &[], &[0; 4]);
    assert!(matches!(decode(&zero_width), Err(DibError::InvalidFormat(_))));
}

#[test]
fn core_header_rejects_direct_16bit() {
    let mut fields = Vec::new();
    fields.extend_from_slice(&1u16.to_le_bytes());
    fields.extend_from_slice(&1u16.to_le_bytes());
    fields.extend_from_slice(&1u16.to_le_bytes());
    fields.extend_from_slice(&16u16.to_le_bytes());
    let data = bmp(12, &fields, &[], &[0; 4]);
    assert!(matches!(decode(&data), Err(DibError::InvalidFormat(_))));
}

#[test]
fn truncated_pixel_array() {
    let full = bmp(40, &info_fields(2, 2, 24, 0, 0), &[], &[0x11; 16]);
    assert!(decode(&full).is_ok());
    assert!(matches!(
        decode(&full[..full.len() - 8]),
        Err(DibError::UnexpectedEof)
    ));
}

#[test]
fn huge_dimensions_fail_before_allocating() {
    let data = bmp(40, &info_fields(i32::MAX, i32::MAX, 24, 0, 0), &[], &[0; 8]);
    assert_eq!(data.len(), 62);
    assert!(matches!(decode(&data), Err(DibError::UnexpectedEof)));

    let mut bmp = InfoBitmap::open(SliceStream::new(&data)).unwrap();
    assert!(matches!(
        bmp.to_imgvec(&Unstoppable),
        Err(DibError::DimensionsTooLarge { .. })
    ));
}

#[cfg(feature = "std")]
#[test]
fn file_stream_edit() {
    let img = imgref::ImgVec::new(vec![GREEN; 6], 3, 2);
    let encoded = EncodeRequest::new(HeaderVariant::V5, BitDepth::Bit24)
        .encode(img.as_ref(), Unstoppable)
        .unwrap();
    let path = std::env::temp_dir().join(format!("zendib-corpus-{}.bmp", std::process::id()));
    std::fs::write(&path, &encoded).unwrap();

    {
        let mut bmp = V5Bitmap::open(FileStream::open(&path).unwrap()).unwrap();
        assert_eq!(bmp.get_pixel(Point::new(2, 1)).unwrap(), GREEN);
        bmp.set_pixel(Point::new(2, 1), RED).unwrap();
    }
    let back = std::fs::read(&path).unwrap();
    std::fs::remove_file(&path).unwrap();

    let out = decode(&back).unwrap();
    assert_eq!(out.image.buf(), &[GREEN, GREEN, GREEN, GREEN, GREEN, RED]);
}
