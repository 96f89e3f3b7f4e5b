// src/ops.rs
//
// Transformation options for turning an image file into a Datum.
// These are cheap to create and copy - the expensive work happens in the engine.

use crate::error::{DatumError, Result};
use image::ImageFormat;
use std::path::Path;
use std::str::FromStr;

/// Requested crop rectangle in source pixel coordinates.
///
/// Signed on purpose: callers pass `-1` offsets and non-positive sizes to mean
/// "no crop", and out-of-range rectangles are tolerated (they degrade to the
/// full image instead of failing).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CropRequest {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl CropRequest {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// A crop only applies when both sizes are positive.
    pub fn is_active(&self) -> bool {
        self.width > 0 && self.height > 0
    }
}

/// Context padding (total extra margin per axis) added around a crop.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ContextPad {
    pub height: u32,
    pub width: u32,
}

impl ContextPad {
    pub fn new(height: u32, width: u32) -> Self {
        Self { height, width }
    }

    pub fn is_active(&self) -> bool {
        self.height > 0 || self.width > 0
    }
}

/// Post-crop resize target.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ResizeTarget {
    /// Keep the (cropped) size
    #[default]
    None,
    /// Resize to exactly `width` x `height`; only applies when both are positive
    Exact { width: u32, height: u32 },
    /// Pin the shorter side to this value, scale the other proportionally
    ShortSide(u32),
}

impl ResizeTarget {
    pub fn is_active(&self) -> bool {
        match *self {
            ResizeTarget::None => false,
            ResizeTarget::Exact { width, height } => width > 0 && height > 0,
            ResizeTarget::ShortSide(side) => side > 0,
        }
    }
}

/// Channel mode used when reading an image file.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ColorMode {
    /// 3-channel, 8-bit
    #[default]
    Color,
    /// 1-channel, 8-bit
    Grayscale,
}

impl ColorMode {
    pub fn is_color(&self) -> bool {
        matches!(self, ColorMode::Color)
    }
}

/// How the codec should pick the pixel format of decoded bytes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DecodeMode {
    /// Keep whatever the byte stream describes (channels and depth)
    #[default]
    Native,
    /// Force 3-channel, 8-bit
    Color,
    /// Force 1-channel, 8-bit
    Grayscale,
}

impl From<ColorMode> for DecodeMode {
    fn from(mode: ColorMode) -> Self {
        match mode {
            ColorMode::Color => DecodeMode::Color,
            ColorMode::Grayscale => DecodeMode::Grayscale,
        }
    }
}

/// Compressed format stored in an encoded Datum.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Encoding {
    Jpeg { quality: u8 },
    Png,
    WebP,
    Bmp,
}

impl Encoding {
    /// Quality used when a JPEG encoding is requested by name only.
    pub const DEFAULT_JPEG_QUALITY: u8 = 95;

    /// Parse a short format name ("jpg", "JPEG", ".png", ...).
    /// `quality` only affects JPEG and is clamped to 1..=100.
    pub fn from_name(name: &str, quality: Option<u8>) -> Result<Self> {
        let q = quality.unwrap_or(Self::DEFAULT_JPEG_QUALITY).clamp(1, 100);
        let trimmed = name.trim().trim_start_matches('.');
        match trimmed.to_ascii_lowercase().as_str() {
            "jpeg" | "jpg" => Ok(Self::Jpeg { quality: q }),
            "png" => Ok(Self::Png),
            "webp" => Ok(Self::WebP),
            "bmp" => Ok(Self::Bmp),
            _ => Err(DatumError::unsupported_format(name.to_string())),
        }
    }

    /// Canonical short name
    pub fn name(&self) -> &'static str {
        match self {
            Encoding::Jpeg { .. } => "jpeg",
            Encoding::Png => "png",
            Encoding::WebP => "webp",
            Encoding::Bmp => "bmp",
        }
    }

    pub fn image_format(&self) -> ImageFormat {
        match self {
            Encoding::Jpeg { .. } => ImageFormat::Jpeg,
            Encoding::Png => ImageFormat::Png,
            Encoding::WebP => ImageFormat::WebP,
            Encoding::Bmp => ImageFormat::Bmp,
        }
    }

    /// Same container format, ignoring quality.
    pub fn same_format(&self, other: &Encoding) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }

    /// Does the file extension of `path` name this format?
    /// Case-insensitive; "jpg" and "jpeg" are interchangeable.
    pub fn matches_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(|ext| Encoding::from_name(ext, None).ok())
            .map(|ext_format| self.same_format(&ext_format))
            .unwrap_or(false)
    }
}

impl FromStr for Encoding {
    type Err = DatumError;

    fn from_str(s: &str) -> Result<Self> {
        Encoding::from_name(s, None)
    }
}

/// Everything that controls how one image becomes one Datum.
///
/// Replaces a chain of defaulted parameters with a single explicit value.
/// The default reads the full image in color and stores it raw.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TransformOptions {
    pub crop: Option<CropRequest>,
    pub context_pad: ContextPad,
    pub resize: ResizeTarget,
    pub color: ColorMode,
    pub encoding: Option<Encoding>,
}

impl TransformOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn crop(mut self, x: i32, y: i32, width: i32, height: i32) -> Self {
        self.crop = Some(CropRequest::new(x, y, width, height));
        self
    }

    pub fn context_pad(mut self, height: u32, width: u32) -> Self {
        self.context_pad = ContextPad::new(height, width);
        self
    }

    pub fn resize(mut self, width: u32, height: u32) -> Self {
        self.resize = ResizeTarget::Exact { width, height };
        self
    }

    pub fn short_side(mut self, side: u32) -> Self {
        self.resize = ResizeTarget::ShortSide(side);
        self
    }

    pub fn color(mut self, color: ColorMode) -> Self {
        self.color = color;
        self
    }

    pub fn grayscale(self) -> Self {
        self.color(ColorMode::Grayscale)
    }

    pub fn encoding(mut self, encoding: Encoding) -> Self {
        self.encoding = Some(encoding);
        self
    }

    /// True when any crop, padding or resize was asked for, regardless of
    /// whether it ends up applying to a particular image.
    pub fn requests_geometry(&self) -> bool {
        self.crop.map(|c| c.is_active()).unwrap_or(false)
            || self.context_pad.is_active()
            || self.resize.is_active()
    }
}
