//! Color heuristic: corrosion coverage via HSV thresholding
//!
//! A deterministic fallback signal next to the learned detector. Pixels
//! whose hue falls in the brown/orange band (with enough saturation and
//! brightness) are counted as rust; the result is the rust fraction of the
//! image as a percentage.

use image::DynamicImage;

use crate::model::CorrosionThresholds;

/// Percentage of pixels classified as rust-colored, in [0, 100]
///
/// Rounded to 2 decimal places. Pure function of the decoded image; an
/// image that cannot be decoded never reaches this function (the caller
/// treats decode failure as zero corrosion).
pub fn corrosion_percentage(image: &DynamicImage, thresholds: &CorrosionThresholds) -> f64 {
    let rgb = image.to_rgb8();
    let total = (rgb.width() as u64) * (rgb.height() as u64);
    if total == 0 {
        return 0.0;
    }

    let masked = rgb
        .pixels()
        .filter(|pixel| {
            let (h, s, v) = rgb_to_hsv(pixel.0);
            h >= thresholds.hue_min
                && h <= thresholds.hue_max
                && s >= thresholds.saturation_min
                && v >= thresholds.value_min
        })
        .count() as u64;

    let percentage = (masked as f64 / total as f64) * 100.0;
    (percentage * 100.0).round() / 100.0
}

/// RGB -> HSV with every channel scaled to 0-255
fn rgb_to_hsv([r, g, b]: [u8; 3]) -> (u8, u8, u8) {
    let r = r as f64 / 255.0;
    let g = g as f64 / 255.0;
    let b = b as f64 / 255.0;

    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;

    let hue_deg = if delta == 0.0 {
        0.0
    } else if max == r {
        60.0 * ((g - b) / delta).rem_euclid(6.0)
    } else if max == g {
        60.0 * ((b - r) / delta + 2.0)
    } else {
        60.0 * ((r - g) / delta + 4.0)
    };

    let h = (hue_deg / 360.0 * 255.0).round() as u8;
    let s = if max == 0.0 {
        0
    } else {
        (delta / max * 255.0).round() as u8
    };
    let v = (max * 255.0).round() as u8;

    (h, s, v)
}
