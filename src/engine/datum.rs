// src/engine/datum.rs
//
// The Datum record and the planar pixel-layout conversion.
//
// A raw Datum stores pixels channel-major: the byte at
// `(c * height + h) * width + w` is channel `c` of the pixel at row `h`,
// column `w`. Decoded images are interleaved (`(h * width + w) * channels + c`),
// so every raw conversion is a transpose between those two layouts.

use crate::error::{DatumError, Result};
use image::{ColorType, DynamicImage, GrayAlphaImage, GrayImage, RgbImage, RgbaImage};

/// Planar pixel buffer with its shape.
///
/// Fields are private so `data.len() == channels * height * width` always holds.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawImage {
    channels: u32,
    height: u32,
    width: u32,
    data: Vec<u8>,
}

impl RawImage {
    pub fn new(channels: u32, height: u32, width: u32, data: Vec<u8>) -> Result<Self> {
        let expected = planar_len(channels, height, width)?;
        if data.len() != expected {
            return Err(DatumError::invalid_datum(format!(
                "planar buffer holds {} bytes, {channels}x{height}x{width} needs {expected}",
                data.len()
            )));
        }
        Ok(Self {
            channels,
            height,
            width,
            data,
        })
    }

    pub fn channels(&self) -> u32 {
        self.channels
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    /// Sample at channel `c`, row `h`, column `w`.
    pub fn sample(&self, c: u32, h: u32, w: u32) -> Option<u8> {
        if c >= self.channels || h >= self.height || w >= self.width {
            return None;
        }
        let index = ((c as usize * self.height as usize) + h as usize) * self.width as usize
            + w as usize;
        self.data.get(index).copied()
    }
}

fn planar_len(channels: u32, height: u32, width: u32) -> Result<usize> {
    (channels as usize)
        .checked_mul(height as usize)
        .and_then(|n| n.checked_mul(width as usize))
        .ok_or_else(|| {
            DatumError::invalid_datum(format!("{channels}x{height}x{width} overflows usize"))
        })
}

/// What a Datum carries. Exactly one form exists at a time.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Payload {
    /// Compressed byte stream; shape is only known after decoding
    Encoded(Vec<u8>),
    /// Planar 8-bit samples with explicit shape
    Raw(RawImage),
}

/// One labelled image, ready to be serialized into a training set.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Datum {
    pub label: i32,
    payload: Payload,
}

impl Datum {
    pub fn encoded(label: i32, bytes: Vec<u8>) -> Self {
        Self {
            label,
            payload: Payload::Encoded(bytes),
        }
    }

    pub fn raw(label: i32, raw: RawImage) -> Self {
        Self {
            label,
            payload: Payload::Raw(raw),
        }
    }

    /// Build a raw Datum from an 8-bit image.
    pub fn from_image(img: &DynamicImage, label: i32) -> Result<Self> {
        Ok(Self::raw(label, image_to_planar(img)?))
    }

    pub fn is_encoded(&self) -> bool {
        matches!(self.payload, Payload::Encoded(_))
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    pub fn into_payload(self) -> Payload {
        self.payload
    }

    /// Compressed bytes for encoded records, planar samples for raw ones.
    pub fn data(&self) -> &[u8] {
        match &self.payload {
            Payload::Encoded(bytes) => bytes,
            Payload::Raw(raw) => raw.data(),
        }
    }

    pub fn raw_image(&self) -> Option<&RawImage> {
        match &self.payload {
            Payload::Raw(raw) => Some(raw),
            Payload::Encoded(_) => None,
        }
    }

    /// Shape fields; `None` for encoded records, whose shape is not authoritative.
    pub fn channels(&self) -> Option<u32> {
        self.raw_image().map(RawImage::channels)
    }

    pub fn height(&self) -> Option<u32> {
        self.raw_image().map(RawImage::height)
    }

    pub fn width(&self) -> Option<u32> {
        self.raw_image().map(RawImage::width)
    }

    /// Rebuild the interleaved image from a raw record.
    /// Encoded records need a codec; see `DatumEngine::decode_datum`.
    pub fn to_image(&self) -> Result<DynamicImage> {
        match &self.payload {
            Payload::Raw(raw) => planar_to_image(raw),
            Payload::Encoded(_) => Err(DatumError::invalid_datum(
                "encoded datum must be decoded with a codec",
            )),
        }
    }
}

/// Interleaved 8-bit image -> planar buffer.
///
/// Any sample depth other than 8-bit unsigned is a precondition violation.
pub fn image_to_planar(img: &DynamicImage) -> Result<RawImage> {
    let color = img.color();
    if !matches!(
        color,
        ColorType::L8 | ColorType::La8 | ColorType::Rgb8 | ColorType::Rgba8
    ) {
        return Err(DatumError::unsupported_sample_depth(format!("{color:?}")));
    }

    let channels = color.channel_count() as usize;
    let (width, height) = (img.width(), img.height());
    let plane = width as usize * height as usize;
    let interleaved = img.as_bytes();

    let mut planar = vec![0u8; plane * channels];
    for (i, pixel) in interleaved.chunks_exact(channels).enumerate() {
        for (c, &sample) in pixel.iter().enumerate() {
            planar[c * plane + i] = sample;
        }
    }

    RawImage::new(channels as u32, height, width, planar)
}

/// Planar buffer -> interleaved image (1, 2, 3 or 4 channels).
pub fn planar_to_image(raw: &RawImage) -> Result<DynamicImage> {
    let channels = raw.channels as usize;
    let (width, height) = (raw.width, raw.height);
    let plane = width as usize * height as usize;

    let mut interleaved = vec![0u8; plane * channels];
    for (c, channel_plane) in raw.data.chunks_exact(plane.max(1)).enumerate().take(channels) {
        for (i, &sample) in channel_plane.iter().enumerate() {
            interleaved[i * channels + c] = sample;
        }
    }

    let built = match channels {
        1 => GrayImage::from_raw(width, height, interleaved).map(DynamicImage::ImageLuma8),
        2 => GrayAlphaImage::from_raw(width, height, interleaved).map(DynamicImage::ImageLumaA8),
        3 => RgbImage::from_raw(width, height, interleaved).map(DynamicImage::ImageRgb8),
        4 => RgbaImage::from_raw(width, height, interleaved).map(DynamicImage::ImageRgba8),
        n => {
            return Err(DatumError::invalid_datum(format!(
                "cannot build an image with {n} channels"
            )))
        }
    };
    built.ok_or_else(|| DatumError::invalid_datum("planar buffer does not match its shape"))
}
