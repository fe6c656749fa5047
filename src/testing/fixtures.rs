//! Synthetic frames for classifier, capture and monitor tests.
//!
//! The colors sit comfortably inside (or outside) the pixel predicates so a
//! fixture never lands on a threshold edge by accident.

use image::{Rgba, RgbaImage};

/// Light blue that passes the left-half test.
pub const BLUE: [u8; 3] = [90, 220, 240];

/// Purple that passes the right-half test.
pub const PURPLE: [u8; 3] = [170, 40, 190];

/// Neutral gray that passes neither test.
pub const GRAY: [u8; 3] = [128, 128, 128];

/// Opaque pixel from an RGB triple.
#[must_use]
pub fn pixel([r, g, b]: [u8; 3]) -> Rgba<u8> {
    Rgba([r, g, b, 255])
}

/// A `width`x`height` raster whose columns left of `width / 2` are `left`
/// and the rest `right`.
#[must_use]
pub fn solid_halves(width: u32, height: u32, left: [u8; 3], right: [u8; 3]) -> RgbaImage {
    let half = width / 2;
    RgbaImage::from_fn(width, height, |x, _| {
        if x < half {
            pixel(left)
        } else {
            pixel(right)
        }
    })
}

/// A frame that classifies as Alpha at any sensitivity.
#[must_use]
pub fn alpha_frame(width: u32, height: u32) -> RgbaImage {
    solid_halves(width, height, BLUE, GRAY)
}

/// A frame that classifies as Omega at any sensitivity.
#[must_use]
pub fn omega_frame(width: u32, height: u32) -> RgbaImage {
    solid_halves(width, height, GRAY, PURPLE)
}

/// A frame that classifies as nothing.
#[must_use]
pub fn blank_frame(width: u32, height: u32) -> RgbaImage {
    solid_halves(width, height, GRAY, GRAY)
}

/// A frame whose left half is blue on its top `percent` rows only.
///
/// Useful for checking how sensitivity changes the decision.
#[must_use]
pub fn partial_alpha_frame(width: u32, height: u32, percent: u32) -> RgbaImage {
    let half = width / 2;
    let blue_rows = height * percent.min(100) / 100;
    RgbaImage::from_fn(width, height, |x, y| {
        if x < half && y < blue_rows {
            pixel(BLUE)
        } else {
            pixel(GRAY)
        }
    })
}
