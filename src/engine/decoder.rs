// src/engine/decoder.rs
//
// Decoder operations: bytes -> DynamicImage through the image crate, with the
// channel mode forced as requested and dimensions checked against the
// decompression-bomb limits.

use crate::engine::common::run_with_panic_policy;
use crate::engine::{MAX_DIMENSION, MAX_PIXELS};
use crate::error::DatumError;
use crate::ops::DecodeMode;
use image::{DynamicImage, ImageFormat, ImageReader};
use std::io::Cursor;

// Type alias for Result - always use DatumError to preserve error taxonomy
type DecoderResult<T> = std::result::Result<T, DatumError>;

/// Detect input format using magic bytes. Returns None if unknown.
pub fn detect_format(bytes: &[u8]) -> Option<ImageFormat> {
    image::guess_format(bytes).ok()
}

/// Decode `bytes` and convert to the pixel layout `mode` asks for.
///
/// - `Native` keeps the stream's own channel count and sample depth
/// - `Color` yields 8-bit RGB
/// - `Grayscale` yields 8-bit luma
pub fn decode_image(bytes: &[u8], mode: DecodeMode) -> DecoderResult<DynamicImage> {
    run_with_panic_policy("decode:image", || {
        if bytes.is_empty() {
            return Err(DatumError::decode_failed("empty input"));
        }
        ensure_dimensions_safe(bytes)?;

        let img = image::load_from_memory(bytes)
            .map_err(|e| DatumError::decode_failed(format!("decode failed: {e}")))?;
        check_dimensions(img.width(), img.height())?;
        if img.width() == 0 || img.height() == 0 {
            return Err(DatumError::decode_failed("decoded image has no pixels"));
        }

        Ok(apply_decode_mode(img, mode))
    })
}

/// Force the channel layout of an already decoded image.
pub fn apply_decode_mode(img: DynamicImage, mode: DecodeMode) -> DynamicImage {
    match mode {
        DecodeMode::Native => img,
        DecodeMode::Color => match img {
            DynamicImage::ImageRgb8(_) => img,
            other => DynamicImage::ImageRgb8(other.to_rgb8()),
        },
        DecodeMode::Grayscale => match img {
            DynamicImage::ImageLuma8(_) => img,
            other => DynamicImage::ImageLuma8(other.to_luma8()),
        },
    }
}

/// Check if image dimensions are within safe limits.
/// Returns an error if the image is too large (potential decompression bomb).
pub fn check_dimensions(width: u32, height: u32) -> DecoderResult<()> {
    if width > MAX_DIMENSION || height > MAX_DIMENSION {
        return Err(DatumError::dimension_exceeds_limit(
            width.max(height),
            MAX_DIMENSION,
        ));
    }
    let pixels = width as u64 * height as u64;
    if pixels > MAX_PIXELS {
        return Err(DatumError::pixel_count_exceeds_limit(pixels, MAX_PIXELS));
    }
    Ok(())
}

/// Inspect encoded bytes and ensure the image dimensions are safe before decoding.
/// Unreadable headers are left for the decoder to report.
pub fn ensure_dimensions_safe(bytes: &[u8]) -> DecoderResult<()> {
    let cursor = Cursor::new(bytes);
    if let Ok(reader) = ImageReader::new(cursor).with_guessed_format() {
        if let Ok((width, height)) = reader.into_dimensions() {
            return check_dimensions(width, height);
        }
    }
    Ok(())
}
