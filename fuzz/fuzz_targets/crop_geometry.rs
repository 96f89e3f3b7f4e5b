#![no_main]

//! Arbitrary crop, padding and resize requests against a small image.
//! The resolved rectangle must stay inside the image and the transform
//! must produce exactly the resolved output size.

use arbitrary::Arbitrary;
use image::{DynamicImage, RgbImage};
use image_datum::engine::resolve_geometry;
use image_datum::{DatumEngine, TransformOptions};
use libfuzzer_sys::fuzz_target;

#[derive(Arbitrary, Debug)]
struct Input {
    img_w: u8,
    img_h: u8,
    crop: (i32, i32, i32, i32),
    pad: (u8, u8),
    resize: (u8, u8),
    short_side: Option<u8>,
}

fuzz_target!(|input: Input| {
    let img_w = input.img_w as u32 % 64 + 1;
    let img_h = input.img_h as u32 % 64 + 1;

    let (x, y, w, h) = input.crop;
    let mut opts = TransformOptions::new()
        .crop(x, y, w, h)
        .context_pad(input.pad.0 as u32, input.pad.1 as u32);
    opts = match input.short_side {
        Some(side) => opts.short_side(side as u32 % 128 + 1),
        None => opts.resize(input.resize.0 as u32, input.resize.1 as u32),
    };

    let geometry = resolve_geometry(img_w, img_h, &opts);
    if let Some(rect) = geometry.crop {
        assert!(rect.x + rect.width <= img_w);
        assert!(rect.y + rect.height <= img_h);
    }

    let img = DynamicImage::ImageRgb8(RgbImage::new(img_w, img_h));
    if let Ok(out) = DatumEngine::new().transform_image(img, &opts) {
        assert_eq!(
            (out.width(), out.height()),
            geometry.output_dimensions(img_w, img_h)
        );
    }
});
