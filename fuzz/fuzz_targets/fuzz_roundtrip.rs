#![no_main]
use libfuzzer_sys::fuzz_target;
use zendib::*;

fuzz_target!(|data: &[u8]| {
    let limits = Limits {
        max_pixels: Some(1 << 20),
        max_memory_bytes: Some(16 << 20),
        ..Default::default()
    };
    // If we can decode it, re-encoding at 24 bits and decoding again must
    // produce identical pixels
    let Ok(decoded) = DecodeRequest::new(data)
        .with_limits(&limits)
        .decode(enough::Unstoppable)
    else {
        return;
    };

    let Ok(reencoded) = EncodeRequest::new(HeaderVariant::Info, BitDepth::Bit24)
        .encode(decoded.image.as_ref(), enough::Unstoppable)
    else {
        return;
    };
    let Ok(decoded2) = DecodeRequest::new(&reencoded).decode(enough::Unstoppable) else {
        panic!("re-encoded data failed to decode");
    };

    assert_eq!(decoded.image.buf(), decoded2.image.buf(), "roundtrip pixel mismatch");
    assert_eq!(decoded.width(), decoded2.width());
    assert_eq!(decoded.height(), decoded2.height());
});
