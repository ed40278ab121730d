#!/usr/bin/env -S cargo +nightly -Zscript
//! Generate seed corpus files for fuzzing.
//! Run: cargo +nightly -Zscript fuzz/generate_seeds.rs

fn header(
    header_size: u32,
    width: i32,
    height: i32,
    bits: u16,
    compression: u32,
    extra: usize,
    pixels: usize,
) -> Vec<u8> {
    let offset = 14 + header_size as usize + extra;
    let total = offset + pixels;
    let mut bmp = vec![0u8; total];
    bmp[0] = b'B'; bmp[1] = b'M';
    bmp[2..6].copy_from_slice(&(total as u32).to_le_bytes()); // file size
    bmp[10..14].copy_from_slice(&(offset as u32).to_le_bytes()); // pixel offset
    bmp[14..18].copy_from_slice(&header_size.to_le_bytes());
    if header_size == 12 {
        bmp[18..20].copy_from_slice(&(width as u16).to_le_bytes());
        bmp[20..22].copy_from_slice(&(height as u16).to_le_bytes());
        bmp[22..24].copy_from_slice(&1u16.to_le_bytes()); // planes
        bmp[24..26].copy_from_slice(&bits.to_le_bytes());
    } else {
        bmp[18..22].copy_from_slice(&width.to_le_bytes());
        bmp[22..26].copy_from_slice(&height.to_le_bytes());
        bmp[26..28].copy_from_slice(&1u16.to_le_bytes()); // planes
        bmp[28..30].copy_from_slice(&bits.to_le_bytes());
        bmp[30..34].copy_from_slice(&compression.to_le_bytes());
    }
    bmp
}

fn main() {
    use std::fs;
    let dir = "fuzz/corpus/fuzz_decode";
    fs::create_dir_all(dir).unwrap();

    // Info 24-bit 1x1
    let mut bmp = header(40, 1, 1, 24, 0, 0, 4);
    bmp[54] = 0xff; // BGR
    fs::write(format!("{dir}/info_24_1x1.bmp"), bmp).unwrap();

    // Info 8-bit 3x2, two palette entries
    let mut bmp = header(40, 3, 2, 8, 0, 8, 8);
    bmp[46..50].copy_from_slice(&2u32.to_le_bytes()); // colors used
    bmp[58..62].copy_from_slice(&[0xff, 0xff, 0xff, 0]);
    bmp[62..65].copy_from_slice(&[1, 0, 1]);
    fs::write(format!("{dir}/info_8_3x2.bmp"), bmp).unwrap();

    // Core 1-bit 9x1, palette triples
    let mut bmp = header(12, 9, 1, 1, 0, 6, 4);
    bmp[29..32].copy_from_slice(&[0xff, 0xff, 0xff]);
    bmp[32] = 0b1010_1010; bmp[33] = 0b1000_0000;
    fs::write(format!("{dir}/core_1_9x1.bmp"), bmp).unwrap();

    // Info 16-bit 565 bitfields 2x1
    let mut bmp = header(40, 2, 1, 16, 3, 12, 4);
    bmp[54..58].copy_from_slice(&0xF800u32.to_le_bytes());
    bmp[58..62].copy_from_slice(&0x07E0u32.to_le_bytes());
    bmp[62..66].copy_from_slice(&0x001Fu32.to_le_bytes());
    bmp[66..70].copy_from_slice(&[0x00, 0xF8, 0xE0, 0x07]);
    fs::write(format!("{dir}/info_565_2x1.bmp"), bmp).unwrap();

    // V5 32-bit 2x2
    let bmp = header(124, 2, 2, 32, 0, 0, 16);
    fs::write(format!("{dir}/v5_32_2x2.bmp"), bmp).unwrap();

    // Truncated/malformed seeds for edge coverage
    fs::write(format!("{dir}/empty.bin"), b"").unwrap();
    fs::write(format!("{dir}/bm_short.bin"), b"BM\x00\x00").unwrap();
    fs::write(format!("{dir}/top_down.bmp"), header(40, 1, -1, 24, 0, 0, 4)).unwrap();
    fs::write(format!("{dir}/rle8.bmp"), header(40, 2, 1, 8, 1, 0, 4)).unwrap();

    println!("Generated seed corpus in {dir}/");
}
