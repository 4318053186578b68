//! Component G: the visual differ.
//!
//! Decodes PNGs with the `image` crate - no Cargo.toml in the teacher's own
//! repos declares an image-decoding crate, so this dependency is sourced
//! from `other_examples/` (the blog-cms image-processor function), which
//! confirms `image::{DynamicImage, GenericImageView}` as the idiomatic
//! choice for this domain in the wider corpus.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use image::{DynamicImage, GenericImageView, ImageReader, Rgba, RgbaImage};
use serde::Serialize;
use std::io::Cursor;

use crate::config::{MaskRect, VisualDiffConfig};

#[derive(Debug, Clone, Serialize)]
pub struct VisualDiffResult {
    pub passed: bool,
    pub dimensions_match: bool,
    pub width: u32,
    pub height: u32,
    pub diff_pixels: u64,
    pub total_pixels: u64,
    pub diff_percentage: f64,
    #[serde(skip)]
    pub diff_image: Option<RgbaImage>,
}

fn decode(input: &[u8]) -> Option<DynamicImage> {
    ImageReader::new(Cursor::new(input)).with_guessed_format().ok()?.decode().ok()
}

/// Accepts either raw PNG bytes or a `data:image/png;base64,...` URI.
pub fn decode_input(input: &[u8]) -> Option<DynamicImage> {
    if let Ok(text) = std::str::from_utf8(input) {
        if let Some(idx) = text.find("base64,") {
            if let Ok(decoded) = STANDARD.decode(&text[idx + 7..]) {
                return decode(&decoded);
            }
        }
    }
    decode(input)
}

fn apply_masks(img: &mut RgbaImage, masks: &[MaskRect]) {
    let neutral = Rgba([128, 128, 128, 255]);
    for mask in masks {
        for y in mask.y..(mask.y + mask.height).min(img.height()) {
            for x in mask.x..(mask.x + mask.width).min(img.width()) {
                img.put_pixel(x, y, neutral);
            }
        }
    }
}

fn pad_to(img: &RgbaImage, width: u32, height: u32) -> RgbaImage {
    if img.width() == width && img.height() == height {
        return img.clone();
    }
    let mut padded = RgbaImage::from_pixel(width, height, Rgba([0, 0, 0, 0]));
    for y in 0..img.height() {
        for x in 0..img.width() {
            padded.put_pixel(x, y, *img.get_pixel(x, y));
        }
    }
    padded
}

fn channel_distance(a: &Rgba<u8>, b: &Rgba<u8>) -> f64 {
    let da = (a[0] as f64 - b[0] as f64).powi(2)
        + (a[1] as f64 - b[1] as f64).powi(2)
        + (a[2] as f64 - b[2] as f64).powi(2)
        + (a[3] as f64 - b[3] as f64).powi(2);
    (da / (4.0 * 255.0 * 255.0)).sqrt()
}

/// `compareScreenshots` - Section 4.G. `include_anti_alias` is accepted for
/// config-surface compatibility; this implementation always treats
/// near-threshold pixels uniformly (no separate anti-alias detector).
pub fn compare_screenshots(baseline: &[u8], actual: &[u8], config: &VisualDiffConfig) -> VisualDiffResult {
    let (lhs, rhs) = match (decode_input(baseline), decode_input(actual)) {
        (Some(l), Some(r)) => (l, r),
        _ => {
            return VisualDiffResult {
                passed: false,
                dimensions_match: false,
                width: 0,
                height: 0,
                diff_pixels: 0,
                total_pixels: 0,
                diff_percentage: 100.0,
                diff_image: None,
            }
        }
    };

    let dimensions_match = lhs.dimensions() == rhs.dimensions();
    let mut lhs_img = lhs.to_rgba8();
    let mut rhs_img = rhs.to_rgba8();

    apply_masks(&mut lhs_img, &config.ignore_masks);
    apply_masks(&mut rhs_img, &config.ignore_masks);

    let width = lhs_img.width().max(rhs_img.width());
    let height = lhs_img.height().max(rhs_img.height());
    let lhs_img = pad_to(&lhs_img, width, height);
    let rhs_img = pad_to(&rhs_img, width, height);

    let mut diff_image = RgbaImage::new(width, height);
    let mut diff_pixels: u64 = 0;
    let diff_color = Rgba([config.diff_color.0, config.diff_color.1, config.diff_color.2, 255]);

    for y in 0..height {
        for x in 0..width {
            let lp = lhs_img.get_pixel(x, y);
            let rp = rhs_img.get_pixel(x, y);
            let distance = channel_distance(lp, rp);
            if distance > config.threshold {
                diff_pixels += 1;
                diff_image.put_pixel(x, y, diff_color);
            } else {
                diff_image.put_pixel(x, y, *lp);
            }
        }
    }

    let total_pixels = (width as u64) * (height as u64);
    let diff_percentage = if total_pixels == 0 {
        0.0
    } else {
        ((diff_pixels as f64 / total_pixels as f64) * 100.0 * 100.0).round() / 100.0
    };
    let passed = diff_percentage <= config.diff_threshold;

    VisualDiffResult {
        passed,
        dimensions_match,
        width,
        height,
        diff_pixels,
        total_pixels,
        diff_percentage,
        diff_image: if diff_pixels > 0 { Some(diff_image) } else { None },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, RgbaImage};

    fn png_bytes(img: &RgbaImage) -> Vec<u8> {
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, ImageFormat::Png).unwrap();
        buf.into_inner()
    }

    #[test]
    fn identical_images_have_zero_diff() {
        let img = RgbaImage::from_pixel(4, 4, Rgba([10, 20, 30, 255]));
        let bytes = png_bytes(&img);
        let result = compare_screenshots(&bytes, &bytes, &VisualDiffConfig::default());
        assert!(result.passed);
        assert_eq!(result.diff_pixels, 0);
        assert!(result.dimensions_match);
    }

    #[test]
    fn fully_different_images_fail() {
        let a = RgbaImage::from_pixel(4, 4, Rgba([0, 0, 0, 255]));
        let b = RgbaImage::from_pixel(4, 4, Rgba([255, 255, 255, 255]));
        let result = compare_screenshots(&png_bytes(&a), &png_bytes(&b), &VisualDiffConfig::default());
        assert!(!result.passed);
        assert_eq!(result.diff_pixels, 16);
        assert_eq!(result.diff_percentage, 100.0);
    }

    #[test]
    fn mismatched_dimensions_are_padded_not_cropped() {
        let a = RgbaImage::from_pixel(2, 2, Rgba([1, 1, 1, 255]));
        let b = RgbaImage::from_pixel(4, 4, Rgba([1, 1, 1, 255]));
        let result = compare_screenshots(&png_bytes(&a), &png_bytes(&b), &VisualDiffConfig::default());
        assert!(!result.dimensions_match);
        assert_eq!(result.width, 4);
        assert_eq!(result.height, 4);
    }

    #[test]
    fn undecodable_input_is_a_non_passing_result() {
        let result = compare_screenshots(b"not a png", b"also not a png", &VisualDiffConfig::default());
        assert!(!result.passed);
        assert_eq!(result.diff_percentage, 100.0);
        assert!(!result.dimensions_match);
    }
}
