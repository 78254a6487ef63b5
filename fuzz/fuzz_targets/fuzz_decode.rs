#![no_main]

use libfuzzer_sys::fuzz_target;
use tinyimg::{DecodeRequest, Limits};

fuzz_target!(|data: &[u8]| {
    let limits = Limits {
        max_width: Some(4096),
        max_height: Some(4096),
        max_pixels: Some(4 * 1024 * 1024),
        max_memory_bytes: Some(64 * 1024 * 1024),
    };
    if let Ok(image) = DecodeRequest::new(data).with_limits(&limits).decode() {
        let (w, h) = image.dimensions();
        assert!(w > 0 && h > 0);
        assert!(w <= 4096 && h <= 4096);
    }
});
