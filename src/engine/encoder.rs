// src/engine/encoder.rs
//
// Encoder operations: DynamicImage -> compressed bytes (JPEG, PNG, WebP, BMP)

use crate::engine::common::run_with_panic_policy;
use crate::error::DatumError;
use crate::ops::Encoding;
use image::codecs::jpeg::JpegEncoder;
use image::{ColorType, DynamicImage, ImageFormat};
use std::borrow::Cow;
use std::io::Cursor;

// Type alias for Result - always use DatumError to preserve error taxonomy
type EncoderResult<T> = std::result::Result<T, DatumError>;

/// Encode `img` in the requested format.
pub fn encode_image(img: &DynamicImage, encoding: &Encoding) -> EncoderResult<Vec<u8>> {
    run_with_panic_policy("encode:image", || {
        if img.width() == 0 || img.height() == 0 {
            return Err(DatumError::encode_failed(
                encoding.name(),
                "invalid image dimensions: width or height is zero",
            ));
        }
        match *encoding {
            Encoding::Jpeg { quality } => encode_jpeg(img, quality),
            Encoding::Png | Encoding::WebP | Encoding::Bmp => {
                let eight_bit = to_eight_bit(img);
                let input = match encoding {
                    // lossless WebP has no grayscale mode
                    Encoding::WebP => strip_to_rgb(eight_bit),
                    _ => eight_bit,
                };
                encode_with_format(input.as_ref(), encoding.image_format(), encoding.name())
            }
        }
    })
}

/// JPEG: 8-bit luma stays gray, everything else is flattened to RGB (alpha dropped).
pub fn encode_jpeg(img: &DynamicImage, quality: u8) -> EncoderResult<Vec<u8>> {
    let input: Cow<'_, DynamicImage> = match img {
        DynamicImage::ImageLuma8(_) | DynamicImage::ImageRgb8(_) => Cow::Borrowed(img),
        DynamicImage::ImageLumaA8(_) | DynamicImage::ImageLuma16(_) | DynamicImage::ImageLumaA16(_) => {
            Cow::Owned(DynamicImage::ImageLuma8(img.to_luma8()))
        }
        _ => Cow::Owned(DynamicImage::ImageRgb8(img.to_rgb8())),
    };

    let mut buf = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut buf, quality.clamp(1, 100));
    input
        .write_with_encoder(encoder)
        .map_err(|e| DatumError::encode_failed("jpeg", e.to_string()))?;
    Ok(buf)
}

fn encode_with_format(
    img: &DynamicImage,
    format: ImageFormat,
    name: &'static str,
) -> EncoderResult<Vec<u8>> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), format)
        .map_err(|e| DatumError::encode_failed(name, e.to_string()))?;
    Ok(buf)
}

/// Reduce 16-bit and float images to their 8-bit counterparts.
fn to_eight_bit(img: &DynamicImage) -> Cow<'_, DynamicImage> {
    match img {
        DynamicImage::ImageLuma8(_)
        | DynamicImage::ImageLumaA8(_)
        | DynamicImage::ImageRgb8(_)
        | DynamicImage::ImageRgba8(_) => Cow::Borrowed(img),
        DynamicImage::ImageLuma16(_) => Cow::Owned(DynamicImage::ImageLuma8(img.to_luma8())),
        DynamicImage::ImageLumaA16(_) => {
            Cow::Owned(DynamicImage::ImageLumaA8(img.to_luma_alpha8()))
        }
        other if other.color().has_alpha() => {
            Cow::Owned(DynamicImage::ImageRgba8(other.to_rgba8()))
        }
        other => Cow::Owned(DynamicImage::ImageRgb8(other.to_rgb8())),
    }
}

fn strip_to_rgb(img: Cow<'_, DynamicImage>) -> Cow<'_, DynamicImage> {
    match img.color() {
        ColorType::L8 => Cow::Owned(DynamicImage::ImageRgb8(img.to_rgb8())),
        ColorType::La8 => Cow::Owned(DynamicImage::ImageRgba8(img.to_rgba8())),
        _ => img,
    }
}
