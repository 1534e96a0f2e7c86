//! Color space derivation
//!
//! The primary buffer is BGR. Two renderings are derived from it on every
//! successful frame: an HSV image and an RGB image. Both are independent
//! allocations; nothing is shared with the primary buffer.
//!
//! HSV follows the 8-bit convention used by common imaging libraries:
//! hue is degrees / 2 so it fits 0..180, saturation and value span 0..=255.

use std::sync::Arc;

use crate::types::{DerivedBuffers, Pixel, StripBuffer};

/// Convert one BGR pixel to 8-bit HSV (`[h, s, v]`, `h` in 0..180).
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn bgr_to_hsv(bgr: Pixel) -> Pixel {
    let [b, g, r] = bgr;
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = f32::from(max - min);

    let val = max;

    let sat = if max == 0 { 0 } else { (255.0 * delta / f32::from(max)).round() as u8 };

    let hue = if delta == 0.0 {
        0
    } else {
        let (r, g, b) = (f32::from(r), f32::from(g), f32::from(b));
        let mut degrees = if max == bgr[2] {
            60.0 * (g - b) / delta
        } else if max == bgr[1] {
            120.0 + 60.0 * (b - r) / delta
        } else {
            240.0 + 60.0 * (r - g) / delta
        };
        if degrees < 0.0 {
            degrees += 360.0;
        }
        // 359.x degrees rounds up to 180, which is the same hue as 0
        let half = (degrees / 2.0).round() as u8;
        if half >= 180 { 0 } else { half }
    };

    [hue, sat, val]
}

/// Swap BGR to RGB.
pub fn bgr_to_rgb(bgr: Pixel) -> Pixel {
    [bgr[2], bgr[1], bgr[0]]
}

/// Derive the HSV and RGB renderings of a BGR buffer.
pub fn derive(primary: &StripBuffer) -> DerivedBuffers {
    DerivedBuffers {
        hsv: Arc::new(primary.map_pixels(bgr_to_hsv)),
        rgb: Arc::new(primary.map_pixels(bgr_to_rgb)),
    }
}
