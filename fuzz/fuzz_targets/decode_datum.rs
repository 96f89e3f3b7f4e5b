#![no_main]

//! Arbitrary bytes stored as an encoded Datum, then normalized to raw form.
//! Decoding may fail; it must never panic, and a raw result must be consistent.

use image_datum::engine::ensure_dimensions_safe;
use image_datum::{DatumEngine, Datum, DecodeMode};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.is_empty() {
        return;
    }
    // Reject inputs that would exceed fuzz decode budget
    if ensure_dimensions_safe(data).is_err() {
        return;
    }

    let engine = DatumEngine::new();
    let mode = match data[0] % 3 {
        0 => DecodeMode::Native,
        1 => DecodeMode::Color,
        _ => DecodeMode::Grayscale,
    };
    let mut datum = Datum::encoded(0, data.to_vec());
    if let Ok(true) = engine.decode_datum_in_place(&mut datum, mode) {
        let (c, h, w) = (
            datum.channels().unwrap_or(0) as usize,
            datum.height().unwrap_or(0) as usize,
            datum.width().unwrap_or(0) as usize,
        );
        assert_eq!(datum.data().len(), c * h * w);
    }
});
