// src/engine.rs
//
// The image -> Datum conversion engine:
// 1. Reads and decodes a file in the requested color mode
// 2. Resolves crop, context padding and resize against the real image size
// 3. Stores the result raw (planar) or encoded, reusing the original bytes
//    when nothing changed
//
// This file is a facade over the modules in engine/

// =============================================================================
// SECURITY LIMITS
// =============================================================================

/// Maximum allowed image dimension (width or height).
/// Larger images are rejected before decoding to prevent decompression bombs.
pub const MAX_DIMENSION: u32 = 32768;

/// Maximum allowed total pixels (width * height).
/// 100 megapixels = 400MB uncompressed RGBA. Beyond this is likely malicious.
pub const MAX_PIXELS: u64 = 100_000_000;

// =============================================================================
// MODULE DECOMPOSITION
// =============================================================================

mod api;
mod codec;
mod common;
mod datum;
mod decoder;
mod encoder;
mod geometry;
mod io;
mod pipeline;

pub use api::{DatumEngine, ImageEntry};
pub use codec::{DefaultCodec, ImageCodec};
pub use common::run_with_panic_policy;
pub use datum::{image_to_planar, planar_to_image, Datum, Payload, RawImage};
pub use decoder::{
    apply_decode_mode, check_dimensions, decode_image, detect_format, ensure_dimensions_safe,
};
pub use encoder::{encode_image, encode_jpeg};
pub use geometry::{resolve_crop, resolve_geometry, short_side_dimensions, CropRect, Geometry};
pub use io::{read_file, read_file_to_datum};
pub use pipeline::{apply_geometry, fast_resize, ResizeError};
