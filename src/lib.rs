// lib.rs
//
// image-datum: turns image files into labelled training records ("Datums")
//
// - Crop with context padding, exact or short-side resize
// - Raw planar storage or compressed storage
// - Original file bytes reused when re-encoding would change nothing

pub mod engine;
pub mod error;
pub mod ops;

pub use engine::{DatumEngine, Datum, DefaultCodec, ImageCodec, ImageEntry, Payload, RawImage};
pub use error::{DatumError, ErrorCategory, Result};
pub use ops::{
    ColorMode, ContextPad, CropRequest, DecodeMode, Encoding, ResizeTarget, TransformOptions,
};
