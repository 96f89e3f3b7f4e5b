// src/engine/pipeline.rs
//
// Pixel transformer: apply a resolved Geometry (crop, then exact resize) to a
// decoded image, plus the fast_image_resize-backed resize primitive used by
// the default codec.

use crate::engine::codec::ImageCodec;
use crate::engine::decoder::check_dimensions;
use crate::engine::geometry::Geometry;
use crate::error::DatumError;
use fast_image_resize::{self as fir, MulDiv, PixelType, ResizeOptions};
use image::{
    imageops::FilterType, DynamicImage, GrayAlphaImage, GrayImage, RgbImage, RgbaImage,
};
use std::borrow::Cow;
use tracing::{debug, warn};

// Type alias for Result - always use DatumError to preserve error taxonomy
type PipelineResult<T> = std::result::Result<T, DatumError>;

#[derive(Debug)]
pub struct ResizeError {
    pub source_dims: (u32, u32),
    pub target_dims: (u32, u32),
    pub reason: String,
}

impl ResizeError {
    pub fn new(
        source_dims: (u32, u32),
        target_dims: (u32, u32),
        reason: impl Into<String>,
    ) -> Self {
        Self {
            source_dims,
            target_dims,
            reason: reason.into(),
        }
    }

    pub fn into_datum_error(self) -> DatumError {
        DatumError::resize_failed(self.source_dims, self.target_dims, self.reason)
    }
}

/// Apply crop and resize with Copy-on-Write semantics.
///
/// An identity geometry (or a crop covering the whole image with no resize)
/// returns the input untouched, borrowed or owned as it came in. Pixel data is
/// only copied once a real crop or resize is needed.
pub fn apply_geometry<'a, C>(
    img: Cow<'a, DynamicImage>,
    geometry: &Geometry,
    codec: &C,
) -> PipelineResult<Cow<'a, DynamicImage>>
where
    C: ImageCodec + ?Sized,
{
    let (img_w, img_h) = (img.width(), img.height());
    let crop = geometry.crop.filter(|rect| !rect.is_full(img_w, img_h));

    let cropped = match crop {
        Some(rect) => {
            debug!(
                target: "image_datum::cow",
                stage = "crop", width = rect.width, height = rect.height,
                "copy-on-write"
            );
            Cow::Owned(img.crop_imm(rect.x, rect.y, rect.width, rect.height))
        }
        None => img,
    };

    match geometry.target {
        Some((width, height)) => {
            validate_resize_dimensions(width, height)?;
            if (width, height) == (cropped.width(), cropped.height()) {
                return Ok(cropped);
            }
            debug!(
                target: "image_datum::cow",
                stage = "resize", width, height,
                "copy-on-write"
            );
            codec.resize(cropped.as_ref(), width, height).map(Cow::Owned)
        }
        None => Ok(cropped),
    }
}

/// A resize target must be non-empty and stay within the same limits as
/// decoded images.
pub(crate) fn validate_resize_dimensions(width: u32, height: u32) -> PipelineResult<()> {
    if width == 0 || height == 0 {
        return Err(DatumError::invalid_resize_dimensions(width, height));
    }
    check_dimensions(width, height)
}

fn default_resize_options() -> ResizeOptions {
    ResizeOptions::new().resize_alg(fir::ResizeAlg::Convolution(fir::FilterType::Bilinear))
}

/// Resize to exactly `dst_width` x `dst_height`, keeping the channel layout.
///
/// 8-bit images go through fast_image_resize (bilinear); anything else, or a
/// fast_image_resize failure, goes through the image crate so the sample
/// depth is preserved.
pub fn fast_resize(
    img: &DynamicImage,
    dst_width: u32,
    dst_height: u32,
) -> std::result::Result<DynamicImage, ResizeError> {
    let src_dims = (img.width(), img.height());
    if src_dims.0 == 0 || src_dims.1 == 0 || dst_width == 0 || dst_height == 0 {
        return Err(ResizeError::new(
            src_dims,
            (dst_width, dst_height),
            "invalid dimensions for resize",
        ));
    }

    let Some(pixel_type) = eight_bit_pixel_type(img) else {
        return Ok(img.resize_exact(dst_width, dst_height, FilterType::Triangle));
    };

    match resize_eight_bit(img, pixel_type, dst_width, dst_height) {
        Ok(resized) => Ok(resized),
        Err(reason) => {
            warn!(
                target: "image_datum::resize",
                %reason, width = dst_width, height = dst_height,
                "fast_image_resize failed, using image crate"
            );
            Ok(img.resize_exact(dst_width, dst_height, FilterType::Triangle))
        }
    }
}

fn eight_bit_pixel_type(img: &DynamicImage) -> Option<PixelType> {
    match img {
        DynamicImage::ImageLuma8(_) => Some(PixelType::U8),
        DynamicImage::ImageLumaA8(_) => Some(PixelType::U8x2),
        DynamicImage::ImageRgb8(_) => Some(PixelType::U8x3),
        DynamicImage::ImageRgba8(_) => Some(PixelType::U8x4),
        _ => None,
    }
}

/// Any alpha sample below 255. Opaque images skip premultiplication.
fn has_translucency(pixels: &[u8], pixel_type: PixelType) -> bool {
    let stride = match pixel_type {
        PixelType::U8x2 => 2,
        PixelType::U8x4 => 4,
        _ => return false,
    };
    pixels
        .chunks_exact(stride)
        .any(|pixel| pixel[stride - 1] != u8::MAX)
}

fn resize_eight_bit(
    img: &DynamicImage,
    pixel_type: PixelType,
    dst_width: u32,
    dst_height: u32,
) -> std::result::Result<DynamicImage, String> {
    let pixels = img.as_bytes();
    let src = fir::images::ImageRef::new(img.width(), img.height(), pixels, pixel_type)
        .map_err(|e| format!("fir source image error: {e:?}"))?;
    let mut dst = fir::images::Image::new(dst_width, dst_height, pixel_type);
    let options = default_resize_options();
    let mut resizer = fir::Resizer::new();

    if has_translucency(pixels, pixel_type) {
        let mul_div = MulDiv::default();
        let mut premultiplied = fir::images::Image::new(img.width(), img.height(), pixel_type);
        mul_div
            .multiply_alpha(&src, &mut premultiplied)
            .map_err(|e| format!("failed to premultiply alpha: {e}"))?;
        resizer
            .resize(&premultiplied, &mut dst, &options)
            .map_err(|e| format!("fir resize error: {e:?}"))?;
        mul_div
            .divide_alpha_inplace(&mut dst)
            .map_err(|e| format!("failed to unpremultiply alpha: {e}"))?;
    } else {
        resizer
            .resize(&src, &mut dst, &options)
            .map_err(|e| format!("fir resize error: {e:?}"))?;
    }

    build_dynamic_image(pixel_type, dst_width, dst_height, dst.into_vec())
}

fn build_dynamic_image(
    pixel_type: PixelType,
    width: u32,
    height: u32,
    pixels: Vec<u8>,
) -> std::result::Result<DynamicImage, String> {
    let built = match pixel_type {
        PixelType::U8 => GrayImage::from_raw(width, height, pixels).map(DynamicImage::ImageLuma8),
        PixelType::U8x2 => {
            GrayAlphaImage::from_raw(width, height, pixels).map(DynamicImage::ImageLumaA8)
        }
        PixelType::U8x3 => RgbImage::from_raw(width, height, pixels).map(DynamicImage::ImageRgb8),
        PixelType::U8x4 => {
            RgbaImage::from_raw(width, height, pixels).map(DynamicImage::ImageRgba8)
        }
        _ => return Err(format!("unsupported pixel type {pixel_type:?}")),
    };
    built.ok_or_else(|| format!("failed to build {pixel_type:?} image from {width}x{height} buffer"))
}
