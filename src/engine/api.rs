// src/engine/api.rs
//
// DatumEngine: the public entry point tying file reads, decoding, geometry,
// and the record codec together.
//
// Typical use:
//
//     let engine = DatumEngine::new();
//     let opts = TransformOptions::new().resize(256, 256).encoding(Encoding::Png);
//     let datum = engine.read_image_to_datum("cat.jpg", 3, &opts)?;

use crate::engine::codec::{DefaultCodec, ImageCodec};
use crate::engine::datum::{Datum, Payload};
use crate::engine::geometry::resolve_geometry;
use crate::engine::io;
use crate::engine::pipeline::apply_geometry;
use crate::error::{DatumError, Result};
use crate::ops::{DecodeMode, Encoding, TransformOptions};
use image::DynamicImage;
use rayon::prelude::*;
use std::borrow::Cow;
use std::path::{Path, PathBuf};
use tracing::{debug, error};

/// One input of a batch conversion.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageEntry {
    pub path: PathBuf,
    pub label: i32,
}

impl ImageEntry {
    pub fn new(path: impl Into<PathBuf>, label: i32) -> Self {
        Self {
            path: path.into(),
            label,
        }
    }
}

/// Converts image files into Datums and back.
///
/// Stateless apart from the codec; one engine can serve any number of
/// threads as long as the codec is reentrant (enforced by `ImageCodec: Sync`).
#[derive(Clone, Debug, Default)]
pub struct DatumEngine<C: ImageCodec = DefaultCodec> {
    codec: C,
}

impl DatumEngine<DefaultCodec> {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<C: ImageCodec> DatumEngine<C> {
    /// Engine backed by a custom codec.
    pub fn with_codec(codec: C) -> Self {
        Self { codec }
    }

    pub fn codec(&self) -> &C {
        &self.codec
    }

    // =========================================================================
    // PIXEL GRID
    // =========================================================================

    /// Read, decode and transform one file into a pixel grid.
    ///
    /// The grid is decoded in the requested color mode, then cropped (with
    /// context padding) and resized. An out-of-range crop degrades to the
    /// full image rather than failing.
    pub fn read_image(
        &self,
        path: impl AsRef<Path>,
        options: &TransformOptions,
    ) -> Result<DynamicImage> {
        let path = path.as_ref();
        let bytes = io::read_file(path)?;
        let decoded = self.decode_file_bytes(path, &bytes, options.color.into())?;
        self.transform_image(decoded, options)
    }

    /// Apply the crop/pad/resize part of `options` to an already decoded grid.
    /// Color mode and encoding are ignored here.
    pub fn transform_image(
        &self,
        img: DynamicImage,
        options: &TransformOptions,
    ) -> Result<DynamicImage> {
        let geometry = resolve_geometry(img.width(), img.height(), options);
        if geometry.is_identity() {
            return Ok(img);
        }
        apply_geometry(Cow::Owned(img), &geometry, &self.codec).map(Cow::into_owned)
    }

    fn decode_file_bytes(
        &self,
        path: &Path,
        bytes: &[u8],
        mode: DecodeMode,
    ) -> Result<DynamicImage> {
        self.codec
            .decode(bytes, mode)
            .inspect_err(|e| {
                error!(
                    target: "image_datum::decoder",
                    path = %path.display(), error = %e,
                    "could not decode file"
                );
            })
    }

    // =========================================================================
    // ENCODE PATH
    // =========================================================================

    /// Read one file and turn it into a Datum.
    ///
    /// Without an encoding the transformed grid is stored raw (planar). With
    /// one, the original file bytes are stored verbatim when nothing about
    /// the image would change: the decoded grid's channel count matches the
    /// color mode, no crop/pad/resize was requested, and the file extension
    /// names the requested format. Otherwise the transformed grid is
    /// re-encoded.
    pub fn read_image_to_datum(
        &self,
        path: impl AsRef<Path>,
        label: i32,
        options: &TransformOptions,
    ) -> Result<Datum> {
        let path = path.as_ref();
        let bytes = io::read_file(path)?;
        let decoded = self.decode_file_bytes(path, &bytes, options.color.into())?;

        let Some(encoding) = options.encoding else {
            let img = self.transform_image(decoded, options)?;
            return self.image_to_datum(&img, label);
        };

        let channels_match = (decoded.color().channel_count() == 3) == options.color.is_color();
        if channels_match && !options.requests_geometry() && encoding.matches_extension(path) {
            debug!(
                target: "image_datum::codec",
                path = %path.display(), format = encoding.name(),
                "storing original file bytes"
            );
            return Ok(Datum::encoded(label, bytes));
        }

        let img = self.transform_image(decoded, options)?;
        self.encode_image_to_datum(&img, label, &encoding)
    }

    /// Raw file passthrough: the file bytes become an encoded Datum without
    /// being decoded.
    pub fn read_file_to_datum(&self, path: impl AsRef<Path>, label: i32) -> Result<Datum> {
        io::read_file_to_datum(path.as_ref(), label)
    }

    /// Store `img` as a raw planar Datum. Requires 8-bit samples.
    pub fn image_to_datum(&self, img: &DynamicImage, label: i32) -> Result<Datum> {
        Datum::from_image(img, label)
    }

    /// Compress `img` with the codec and store the bytes as an encoded Datum.
    pub fn encode_image_to_datum(
        &self,
        img: &DynamicImage,
        label: i32,
        encoding: &Encoding,
    ) -> Result<Datum> {
        let bytes = self.codec.encode(img, encoding)?;
        Ok(Datum::encoded(label, bytes))
    }

    // =========================================================================
    // DECODE PATH
    // =========================================================================

    /// Decode an encoded Datum into a pixel grid.
    ///
    /// A raw Datum is a caller error (`DatumNotEncoded`); use
    /// `Datum::to_image` for those.
    pub fn decode_datum(&self, datum: &Datum, mode: DecodeMode) -> Result<DynamicImage> {
        match datum.payload() {
            Payload::Encoded(bytes) => self.codec.decode(bytes, mode).inspect_err(|e| {
                error!(
                    target: "image_datum::decoder",
                    label = datum.label, error = %e,
                    "could not decode datum"
                );
            }),
            Payload::Raw(_) => Err(DatumError::datum_not_encoded()),
        }
    }

    /// Rewrite an encoded Datum as a raw one, keeping its label.
    ///
    /// Returns `Ok(false)` when the Datum is already raw. On error the Datum
    /// is left as it was.
    pub fn decode_datum_in_place(&self, datum: &mut Datum, mode: DecodeMode) -> Result<bool> {
        if !datum.is_encoded() {
            return Ok(false);
        }
        let img = self.decode_datum(datum, mode)?;
        *datum = Datum::from_image(&img, datum.label)?;
        Ok(true)
    }

    // =========================================================================
    // BATCH
    // =========================================================================

    /// Convert many independent files in parallel on the global rayon pool.
    ///
    /// Results come back in input order; one failing entry does not affect
    /// the others.
    pub fn read_images_to_datums(
        &self,
        entries: &[ImageEntry],
        options: &TransformOptions,
    ) -> Vec<Result<Datum>> {
        entries
            .par_iter()
            .map(|entry| self.read_image_to_datum(&entry.path, entry.label, options))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::decoder::apply_decode_mode;
    use crate::ops::ColorMode;
    use image::{GenericImageView, GrayImage, Luma, Rgb, RgbImage};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn create_test_image(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x % 256) as u8, (y % 256) as u8, 128])
        }))
    }

    /// Decodes every input to a fixed grid (gray when the bytes start with
    /// "gray", RGB otherwise) and counts encoder calls.
    #[derive(Default)]
    struct FakeCodec {
        encodes: AtomicUsize,
    }

    impl ImageCodec for FakeCodec {
        fn decode(&self, bytes: &[u8], mode: DecodeMode) -> Result<DynamicImage> {
            if bytes.starts_with(b"bad") {
                return Err(DatumError::decode_failed("fake decode failure"));
            }
            let img = create_test_image(8, 6);
            let native = if bytes.starts_with(b"gray") {
                DynamicImage::ImageLuma8(img.to_luma8())
            } else {
                img
            };
            Ok(apply_decode_mode(native, mode))
        }

        fn encode(&self, img: &DynamicImage, encoding: &Encoding) -> Result<Vec<u8>> {
            self.encodes.fetch_add(1, Ordering::SeqCst);
            Ok(format!("{}:{}x{}", encoding.name(), img.width(), img.height()).into_bytes())
        }

        fn resize(&self, img: &DynamicImage, width: u32, height: u32) -> Result<DynamicImage> {
            Ok(img.resize_exact(width, height, image::imageops::FilterType::Nearest))
        }
    }

    fn write_file(dir: &tempfile::TempDir, name: &str, bytes: &[u8]) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, bytes).unwrap();
        path
    }

    #[test]
    fn fast_path_keeps_original_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "a.JPG", b"original jpeg bytes");
        let engine = DatumEngine::with_codec(FakeCodec::default());
        let opts = TransformOptions::new().encoding(Encoding::Jpeg { quality: 90 });

        let datum = engine.read_image_to_datum(&path, 4, &opts).unwrap();
        assert!(datum.is_encoded());
        assert_eq!(datum.label, 4);
        assert_eq!(datum.data(), b"original jpeg bytes");
        assert_eq!(engine.codec().encodes.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn requested_geometry_forces_reencode() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "a.png", b"png bytes");
        let engine = DatumEngine::with_codec(FakeCodec::default());
        let opts = TransformOptions::new().resize(4, 3).encoding(Encoding::Png);

        let datum = engine.read_image_to_datum(&path, 0, &opts).unwrap();
        assert_eq!(datum.data(), b"png:4x3");
        assert_eq!(engine.codec().encodes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn extension_mismatch_forces_reencode() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "a.png", b"png bytes");
        let engine = DatumEngine::with_codec(FakeCodec::default());
        let opts = TransformOptions::new().encoding(Encoding::Jpeg { quality: 95 });

        let datum = engine.read_image_to_datum(&path, 0, &opts).unwrap();
        assert_eq!(datum.data(), b"jpeg:8x6");
    }

    #[test]
    fn fast_path_checks_forced_grid() {
        let dir = tempfile::tempdir().unwrap();
        let color = write_file(&dir, "c.png", b"color png");
        let gray = write_file(&dir, "g.png", b"gray png");
        let engine = DatumEngine::with_codec(FakeCodec::default());

        // forced to gray, so the gray request matches even for a color file
        let opts = TransformOptions::new().grayscale().encoding(Encoding::Png);
        let datum = engine.read_image_to_datum(&color, 0, &opts).unwrap();
        assert_eq!(datum.data(), b"color png");

        // forced to RGB, so a gray file matches a color request
        let opts = TransformOptions::new().encoding(Encoding::Png);
        let datum = engine.read_image_to_datum(&gray, 0, &opts).unwrap();
        assert_eq!(datum.data(), b"gray png");
        assert_eq!(engine.codec().encodes.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn raw_datum_without_encoding() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "a.png", b"whatever");
        let engine = DatumEngine::with_codec(FakeCodec::default());

        let datum = engine
            .read_image_to_datum(&path, 2, &TransformOptions::new().crop(1, 1, 4, 3))
            .unwrap();
        assert!(!datum.is_encoded());
        assert_eq!(
            (datum.channels(), datum.height(), datum.width()),
            (Some(3), Some(3), Some(4))
        );
        // channel 0 of (row 0, col 0) is x = 1
        assert_eq!(datum.data()[0], 1);
    }

    #[test]
    fn decode_failure_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "bad.jpg", b"bad bytes");
        let engine = DatumEngine::with_codec(FakeCodec::default());
        let err = engine
            .read_image_to_datum(&path, 0, &TransformOptions::new())
            .unwrap_err();
        assert!(matches!(err, DatumError::DecodeFailed { .. }));
        assert!(engine.read_image(&path, &TransformOptions::new()).is_err());
    }

    #[test]
    fn decode_datum_requires_encoded() {
        let engine = DatumEngine::new();
        let raw = engine.image_to_datum(&create_test_image(2, 2), 1).unwrap();
        let err = engine.decode_datum(&raw, DecodeMode::Native).unwrap_err();
        assert!(matches!(err, DatumError::DatumNotEncoded));
    }

    #[test]
    fn decode_in_place_rewrites_and_keeps_label() {
        let engine = DatumEngine::new();
        let img = create_test_image(5, 4);
        let mut datum = engine
            .encode_image_to_datum(&img, 9, &Encoding::Png)
            .unwrap();

        assert!(engine
            .decode_datum_in_place(&mut datum, DecodeMode::Color)
            .unwrap());
        assert!(!datum.is_encoded());
        assert_eq!(datum.label, 9);
        assert_eq!(datum.to_image().unwrap(), img);

        // already raw: nothing to do
        assert!(!engine
            .decode_datum_in_place(&mut datum, DecodeMode::Color)
            .unwrap());
    }

    #[test]
    fn decode_in_place_failure_leaves_datum() {
        let engine = DatumEngine::new();
        let mut datum = Datum::encoded(1, b"garbage".to_vec());
        assert!(engine
            .decode_datum_in_place(&mut datum, DecodeMode::Native)
            .is_err());
        assert_eq!(datum, Datum::encoded(1, b"garbage".to_vec()));
    }

    #[test]
    fn transform_image_identity_returns_input() {
        let engine = DatumEngine::new();
        let img = DynamicImage::ImageLuma8(GrayImage::from_pixel(3, 3, Luma([5])));
        let out = engine
            .transform_image(img.clone(), &TransformOptions::new().color(ColorMode::Grayscale))
            .unwrap();
        assert_eq!(out, img);
    }

    #[test]
    fn transform_image_short_side() {
        let engine = DatumEngine::new();
        let out = engine
            .transform_image(create_test_image(100, 50), &TransformOptions::new().short_side(25))
            .unwrap();
        assert_eq!(out.dimensions(), (50, 25));
    }

    #[test]
    fn batch_keeps_order_and_isolates_failures() {
        let dir = tempfile::tempdir().unwrap();
        let good = write_file(&dir, "a.png", b"good");
        let bad = write_file(&dir, "b.png", b"bad");
        let engine = DatumEngine::with_codec(FakeCodec::default());
        let entries = vec![
            ImageEntry::new(&good, 0),
            ImageEntry::new(&bad, 1),
            ImageEntry::new(dir.path().join("missing.png"), 2),
            ImageEntry::new(&good, 3),
        ];

        let results = engine.read_images_to_datums(&entries, &TransformOptions::new());
        assert_eq!(results.len(), 4);
        assert_eq!(results[0].as_ref().unwrap().label, 0);
        assert!(matches!(results[1], Err(DatumError::DecodeFailed { .. })));
        assert!(matches!(results[2], Err(DatumError::FileNotFound { .. })));
        assert_eq!(results[3].as_ref().unwrap().label, 3);
    }
}
