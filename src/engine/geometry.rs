// src/engine/geometry.rs
//
// Geometry resolution: crop rectangle (with context padding) and resize target,
// computed from the caller's options and the decoded image's real dimensions.
// Pure arithmetic - no pixels are touched here.

use crate::ops::{ContextPad, CropRequest, ResizeTarget, TransformOptions};
use tracing::{info, warn};

/// A crop rectangle that is guaranteed to lie inside the source image.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CropRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl CropRect {
    /// True when the rectangle covers the whole `img_w` x `img_h` image.
    pub fn is_full(&self, img_w: u32, img_h: u32) -> bool {
        self.x == 0 && self.y == 0 && self.width == img_w && self.height == img_h
    }
}

impl From<CropRect> for CropRequest {
    fn from(rect: CropRect) -> Self {
        CropRequest::new(
            rect.x as i32,
            rect.y as i32,
            rect.width as i32,
            rect.height as i32,
        )
    }
}

/// Resolved geometry for one image.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Geometry {
    /// Rectangle to extract; `None` means the full image.
    pub crop: Option<CropRect>,
    /// Final (width, height); `None` means keep the cropped size.
    pub target: Option<(u32, u32)>,
}

impl Geometry {
    /// No crop and no resize: the decoded image is used as-is.
    pub fn is_identity(&self) -> bool {
        self.crop.is_none() && self.target.is_none()
    }

    /// Size of the image after cropping, before any resize.
    pub fn cropped_dimensions(&self, img_w: u32, img_h: u32) -> (u32, u32) {
        self.crop
            .map(|rect| (rect.width, rect.height))
            .unwrap_or((img_w, img_h))
    }

    /// Size of the image after the whole transform.
    pub fn output_dimensions(&self, img_w: u32, img_h: u32) -> (u32, u32) {
        self.target
            .unwrap_or_else(|| self.cropped_dimensions(img_w, img_h))
    }
}

/// Resolve crop and resize target for an image of `img_w` x `img_h`.
///
/// Exact resizes feed the output size into the padding computation; the
/// short-side variant ignores context padding entirely and derives its target
/// from the cropped size.
pub fn resolve_geometry(img_w: u32, img_h: u32, options: &TransformOptions) -> Geometry {
    match options.resize {
        ResizeTarget::ShortSide(side) => {
            let crop = resolve_crop(img_w, img_h, options.crop, ContextPad::default(), None);
            let target = if side > 0 {
                let (w, h) = crop
                    .map(|rect| (rect.width, rect.height))
                    .unwrap_or((img_w, img_h));
                Some(short_side_dimensions(w, h, side))
            } else {
                None
            };
            Geometry { crop, target }
        }
        ResizeTarget::Exact { width, height } if width > 0 && height > 0 => Geometry {
            crop: resolve_crop(
                img_w,
                img_h,
                options.crop,
                options.context_pad,
                Some((width, height)),
            ),
            target: Some((width, height)),
        },
        _ => Geometry {
            crop: resolve_crop(img_w, img_h, options.crop, options.context_pad, None),
            target: None,
        },
    }
}

/// Validate a requested crop against the image bounds and apply context padding.
///
/// `output` is the final (width, height) when an exact resize follows; padding
/// is then scaled to the share it will occupy after resizing.
///
/// Returns `None` when no crop was requested or when the request lies outside
/// the image (logged, not an error).
pub fn resolve_crop(
    img_w: u32,
    img_h: u32,
    request: Option<CropRequest>,
    pad: ContextPad,
    output: Option<(u32, u32)>,
) -> Option<CropRect> {
    let request = request.filter(|r| r.is_active())?;

    let img_w = img_w as i64;
    let img_h = img_h as i64;
    let (x, y) = (request.x as i64, request.y as i64);
    let (crop_w, crop_h) = (request.width as i64, request.height as i64);

    if x < 0 || y < 0 || x + crop_w > img_w || y + crop_h > img_h {
        info!(
            target: "image_datum::geometry",
            x, y, width = crop_w, height = crop_h, img_width = img_w, img_height = img_h,
            "bbox out of range, using full image"
        );
        return None;
    }

    let (mut x, mut y, mut w, mut h) = (x, y, crop_w, crop_h);
    if pad.is_active() {
        let (out_w, out_h) = match output {
            Some((ow, oh)) if ow > 0 && oh > 0 => (Some(ow), Some(oh)),
            _ => (None, None),
        };
        let pad_w = half_padding("width", pad.width, crop_w, out_w);
        let pad_h = half_padding("height", pad.height, crop_h, out_h);

        // Shrink padding that would leave the image, keeping both sides equal.
        let pad_w = pad_w.min(x).min(img_w - x - crop_w);
        let pad_h = pad_h.min(y).min(img_h - y - crop_h);

        x -= pad_w;
        y -= pad_h;
        w += 2 * pad_w;
        h += 2 * pad_h;
    }

    Some(CropRect {
        x: x as u32,
        y: y as u32,
        width: w as u32,
        height: h as u32,
    })
}

/// Padding for one side of one axis.
///
/// Without an output size this is half the requested total. With one, the
/// padding is scaled so it keeps its share after the crop is resized to `out`:
/// `pad * crop * 0.5 / (out - pad)`, truncated toward zero. An output that is
/// not larger than the padding would divide by zero (or flip sign), so that
/// axis gets no padding.
fn half_padding(axis: &'static str, pad: u32, crop: i64, out: Option<u32>) -> i64 {
    if pad == 0 {
        return 0;
    }
    match out {
        None => (pad / 2) as i64,
        Some(out) if out > pad => {
            (pad as f64 * crop as f64 * 0.5 / (out - pad) as f64) as i64
        }
        Some(out) => {
            warn!(
                target: "image_datum::geometry",
                %axis, pad, out,
                "context padding is not smaller than the output size, ignoring padding"
            );
            0
        }
    }
}

/// Aspect-preserving size that pins the shorter side to `short_side`.
///
/// The longer side is `floor(short_side * long / short + 0.5)`. Square inputs
/// take the "width is not shorter" branch, which yields a square output.
pub fn short_side_dimensions(width: u32, height: u32, short_side: u32) -> (u32, u32) {
    if width == 0 || height == 0 {
        return (width, height);
    }
    let side = short_side as f64;
    if width < height {
        let scaled = (side * (height as f64 / width as f64) + 0.5) as u32;
        (short_side, scaled)
    } else {
        let scaled = (side * (width as f64 / height as f64) + 0.5) as u32;
        (scaled, short_side)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn req(x: i32, y: i32, w: i32, h: i32) -> Option<CropRequest> {
        Some(CropRequest::new(x, y, w, h))
    }

    #[test]
    fn no_request_means_no_crop() {
        assert_eq!(resolve_crop(100, 50, None, ContextPad::default(), None), None);
        assert_eq!(
            resolve_crop(100, 50, req(-1, -1, 0, 0), ContextPad::default(), None),
            None
        );
        assert_eq!(
            resolve_crop(100, 50, req(10, 10, 0, 20), ContextPad::default(), None),
            None
        );
    }

    #[test]
    fn valid_crop_without_padding_is_unchanged() {
        let rect = resolve_crop(100, 50, req(10, 10, 60, 30), ContextPad::default(), None);
        assert_eq!(
            rect,
            Some(CropRect {
                x: 10,
                y: 10,
                width: 60,
                height: 30
            })
        );
    }

    #[test]
    fn out_of_range_crop_degrades_to_full_image() {
        let pad = ContextPad::default();
        assert_eq!(resolve_crop(100, 50, req(-1, 0, 10, 10), pad, None), None);
        assert_eq!(resolve_crop(100, 50, req(0, -3, 10, 10), pad, None), None);
        assert_eq!(resolve_crop(100, 50, req(95, 0, 10, 10), pad, None), None);
        assert_eq!(resolve_crop(100, 50, req(0, 45, 10, 10), pad, None), None);
    }

    #[test]
    fn crop_touching_the_border_is_valid() {
        let rect = resolve_crop(100, 50, req(40, 20, 60, 30), ContextPad::default(), None);
        assert_eq!(
            rect,
            Some(CropRect {
                x: 40,
                y: 20,
                width: 60,
                height: 30
            })
        );
    }

    #[test]
    fn padding_defaults_to_half_of_total() {
        // pad 8x6 -> 4 per side vertically, 3 per side horizontally
        let rect = resolve_crop(100, 100, req(20, 20, 40, 40), ContextPad::new(8, 6), None);
        assert_eq!(
            rect,
            Some(CropRect {
                x: 17,
                y: 16,
                width: 46,
                height: 48
            })
        );
    }

    #[test]
    fn odd_padding_rounds_down() {
        let rect = resolve_crop(100, 100, req(20, 20, 40, 40), ContextPad::new(5, 5), None);
        assert_eq!(
            rect,
            Some(CropRect {
                x: 18,
                y: 18,
                width: 44,
                height: 44
            })
        );
    }

    #[test]
    fn padding_is_scaled_to_output_size() {
        // pad_h = 16 * 40 * 0.5 / (227 - 16) = 1.516.. -> 1
        // pad_w = 16 * 80 * 0.5 / (227 - 16) = 3.033.. -> 3
        let rect = resolve_crop(
            200,
            200,
            req(50, 50, 80, 40),
            ContextPad::new(16, 16),
            Some((227, 227)),
        );
        assert_eq!(
            rect,
            Some(CropRect {
                x: 47,
                y: 49,
                width: 86,
                height: 42
            })
        );
    }

    #[test]
    fn padding_is_clamped_symmetrically_at_borders() {
        // 3 pixels available on the left, 10 requested per side
        let rect = resolve_crop(100, 100, req(3, 50, 20, 20), ContextPad::new(0, 20), None);
        assert_eq!(
            rect,
            Some(CropRect {
                x: 0,
                y: 50,
                width: 26,
                height: 20
            })
        );

        // 2 pixels available at the bottom
        let rect = resolve_crop(100, 100, req(10, 48, 20, 50), ContextPad::new(20, 0), None);
        assert_eq!(
            rect,
            Some(CropRect {
                x: 10,
                y: 46,
                width: 20,
                height: 54
            })
        );
    }

    #[test]
    fn padding_equal_to_output_size_is_ignored() {
        let rect = resolve_crop(
            100,
            100,
            req(20, 20, 40, 40),
            ContextPad::new(10, 10),
            Some((10, 10)),
        );
        assert_eq!(
            rect,
            Some(CropRect {
                x: 20,
                y: 20,
                width: 40,
                height: 40
            })
        );
    }

    #[test]
    fn padding_larger_than_output_is_ignored_per_axis() {
        // width axis is fine (out 100 > pad 10), height axis is degenerate
        let rect = resolve_crop(
            200,
            200,
            req(50, 50, 90, 40),
            ContextPad::new(30, 10),
            Some((100, 20)),
        );
        // pad_w = 10 * 90 * 0.5 / 90 = 5
        assert_eq!(
            rect,
            Some(CropRect {
                x: 45,
                y: 50,
                width: 100,
                height: 40
            })
        );
    }

    #[test]
    fn short_side_pins_smaller_dimension() {
        assert_eq!(short_side_dimensions(100, 50, 25), (50, 25));
        assert_eq!(short_side_dimensions(50, 100, 25), (25, 50));
        assert_eq!(short_side_dimensions(64, 64, 32), (32, 32));
        // 256 * 500 / 333 = 384.38.. -> 384
        assert_eq!(short_side_dimensions(333, 500, 256), (256, 384));
        assert_eq!(short_side_dimensions(500, 333, 256), (384, 256));
        // 10 * 1.5 + 0.5 = 15.5 -> 15
        assert_eq!(short_side_dimensions(10, 15, 10), (10, 15));
        // 3 * 2.5 + 0.5 = 8.0 -> 8
        assert_eq!(short_side_dimensions(2, 5, 3), (3, 8));
    }

    #[test]
    fn short_side_ignores_padding() {
        let opts = TransformOptions::new()
            .crop(10, 10, 60, 30)
            .context_pad(8, 8)
            .short_side(15);
        let geometry = resolve_geometry(100, 50, &opts);
        assert_eq!(
            geometry.crop,
            Some(CropRect {
                x: 10,
                y: 10,
                width: 60,
                height: 30
            })
        );
        assert_eq!(geometry.target, Some((30, 15)));
    }

    #[test]
    fn short_side_uses_full_image_when_crop_out_of_range() {
        let opts = TransformOptions::new().crop(90, 0, 60, 30).short_side(25);
        let geometry = resolve_geometry(100, 50, &opts);
        assert_eq!(geometry.crop, None);
        assert_eq!(geometry.target, Some((50, 25)));
    }

    #[test]
    fn exact_resize_requires_both_dimensions() {
        let geometry = resolve_geometry(100, 50, &TransformOptions::new().resize(32, 0));
        assert!(geometry.is_identity());
        let geometry = resolve_geometry(100, 50, &TransformOptions::new().resize(32, 16));
        assert_eq!(geometry.target, Some((32, 16)));
        assert_eq!(geometry.output_dimensions(100, 50), (32, 16));
    }

    #[test]
    fn resolution_is_idempotent_for_in_bounds_rect() {
        let opts = TransformOptions::new().crop(10, 10, 60, 30);
        let first = resolve_geometry(100, 50, &opts).crop.unwrap();
        let again = TransformOptions::new().crop(
            first.x as i32,
            first.y as i32,
            first.width as i32,
            first.height as i32,
        );
        assert_eq!(resolve_geometry(100, 50, &again).crop, Some(first));
        assert_eq!(CropRequest::from(first), CropRequest::new(10, 10, 60, 30));
    }

    #[test]
    fn full_rect_detection() {
        let rect = CropRect {
            x: 0,
            y: 0,
            width: 10,
            height: 5,
        };
        assert!(rect.is_full(10, 5));
        assert!(!rect.is_full(11, 5));
    }
}
