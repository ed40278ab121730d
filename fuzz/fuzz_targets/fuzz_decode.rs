#![no_main]
use libfuzzer_sys::fuzz_target;
use zendib::{DecodeRequest, ImageInfo, InfoBitmap, Limits, Point, SliceStream};

fuzz_target!(|data: &[u8]| {
    let limits = Limits {
        max_pixels: Some(1 << 20),
        max_memory_bytes: Some(16 << 20),
        ..Default::default()
    };

    // Probe and decode must never panic
    let _ = ImageInfo::from_bytes(data);
    let _ = DecodeRequest::new(data).decode(enough::Unstoppable);
    let _ = DecodeRequest::new(data)
        .with_limits(&limits)
        .decode(enough::Unstoppable);

    // Random access on whatever parses as an info header
    if let Ok(mut bmp) = InfoBitmap::open(SliceStream::new(data)) {
        let size = bmp.size();
        let last = Point::new(size.width() as i32 - 1, size.height() as i32 - 1);
        let _ = bmp.get_pixel(Point::new(0, 0));
        let _ = bmp.get_pixel(last);
        let _ = bmp.get_pixels_raw(Point::new(0, 0), 64);
    }
});
