// src/engine/codec.rs
//
// The codec capability consumed by the engine: decode, encode and exact resize.
// Kept behind a trait so the engine can run against a deterministic fake.

use crate::engine::common::run_with_panic_policy;
use crate::engine::{decoder, encoder, pipeline};
use crate::error::Result;
use crate::ops::{DecodeMode, Encoding};
use image::DynamicImage;

/// Black-box image codec.
///
/// Implementations must be reentrant: one codec value is shared by every
/// thread of a batch conversion.
pub trait ImageCodec: Send + Sync {
    /// Decode `bytes` into a pixel grid laid out as `mode` requests.
    fn decode(&self, bytes: &[u8], mode: DecodeMode) -> Result<DynamicImage>;

    /// Compress `img` in the given format.
    fn encode(&self, img: &DynamicImage, encoding: &Encoding) -> Result<Vec<u8>>;

    /// Resize `img` to exactly `width` x `height`, keeping its channel layout.
    fn resize(&self, img: &DynamicImage, width: u32, height: u32) -> Result<DynamicImage>;
}

/// image crate decode/encode plus fast_image_resize bilinear resize.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultCodec;

impl ImageCodec for DefaultCodec {
    fn decode(&self, bytes: &[u8], mode: DecodeMode) -> Result<DynamicImage> {
        decoder::decode_image(bytes, mode)
    }

    fn encode(&self, img: &DynamicImage, encoding: &Encoding) -> Result<Vec<u8>> {
        encoder::encode_image(img, encoding)
    }

    fn resize(&self, img: &DynamicImage, width: u32, height: u32) -> Result<DynamicImage> {
        pipeline::validate_resize_dimensions(width, height)?;
        run_with_panic_policy("resize", || {
            pipeline::fast_resize(img, width, height).map_err(|err| err.into_datum_error())
        })
    }
}

impl<C: ImageCodec + ?Sized> ImageCodec for &C {
    fn decode(&self, bytes: &[u8], mode: DecodeMode) -> Result<DynamicImage> {
        (**self).decode(bytes, mode)
    }

    fn encode(&self, img: &DynamicImage, encoding: &Encoding) -> Result<Vec<u8>> {
        (**self).encode(img, encoding)
    }

    fn resize(&self, img: &DynamicImage, width: u32, height: u32) -> Result<DynamicImage> {
        (**self).resize(img, width, height)
    }
}
