//! Split-region color dominance.
//!
//! A captured raster is cut into two equal-width halves. Every pixel of the
//! left half is tested against a fixed light-blue predicate and every pixel
//! of the right half against a fixed purple predicate. The dominance of a
//! half is its share of matching pixels. Alpha channels are ignored.

use super::{CaptureRegion, ClassificationSample};
use crate::error::{Result, TwotoneError};
use image::{GenericImageView, Rgba};

/// Light-blue test used on the left half.
///
/// blue > 180, green > 200, red < 150, green - red > 50, blue - red > 30.
#[must_use]
pub fn is_target_blue([r, g, b]: [u8; 3]) -> bool {
    let (r, g, b) = (i32::from(r), i32::from(g), i32::from(b));
    b > 180 && g > 200 && r < 150 && g - r > 50 && b - r > 30
}

/// Purple test used on the right half.
///
/// red > 120, blue > 120, green < 100, |red - blue| < 60, red and blue both
/// above green.
#[must_use]
pub fn is_target_purple([r, g, b]: [u8; 3]) -> bool {
    let (r, g, b) = (i32::from(r), i32::from(g), i32::from(b));
    r > 120 && b > 120 && g < 100 && (r - b).abs() < 60 && r > g && b > g
}

/// Computes per-half dominance fractions.
#[derive(Debug, Clone, Copy, Default)]
pub struct RegionClassifier;

impl RegionClassifier {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Classifies a raster already clipped to the capture region.
    ///
    /// With an odd width the last column is left out so both halves have
    /// the same pixel count. A raster narrower than two pixels yields zero
    /// dominance on both sides.
    #[must_use]
    pub fn classify<I>(&self, raster: &I) -> ClassificationSample
    where
        I: GenericImageView<Pixel = Rgba<u8>>,
    {
        let (width, height) = raster.dimensions();
        self.classify_area(raster, 0, 0, width, height)
    }

    /// Classifies `region` of a full frame without copying it.
    ///
    /// # Errors
    ///
    /// Returns [`TwotoneError::FrameRead`] if the region does not fit the frame.
    pub fn classify_within<I>(&self, frame: &I, region: CaptureRegion) -> Result<ClassificationSample>
    where
        I: GenericImageView<Pixel = Rgba<u8>>,
    {
        let (width, height) = frame.dimensions();
        if !region.fits_within(width, height) {
            return Err(TwotoneError::frame(format!(
                "region {} exceeds frame {}x{}",
                region, width, height
            )));
        }

        Ok(self.classify_area(frame, region.x, region.y, region.width, region.height))
    }

    fn classify_area<I>(&self, image: &I, x0: u32, y0: u32, width: u32, height: u32) -> ClassificationSample
    where
        I: GenericImageView<Pixel = Rgba<u8>>,
    {
        let half = width / 2;
        let total = u64::from(half) * u64::from(height);
        if total == 0 {
            return ClassificationSample {
                left_blue: 0.0,
                right_purple: 0.0,
            };
        }

        let mut blue = 0u64;
        let mut purple = 0u64;
        for y in y0..y0 + height {
            for x in x0..x0 + half {
                if is_target_blue(rgb(image.get_pixel(x, y))) {
                    blue += 1;
                }
                if is_target_purple(rgb(image.get_pixel(x + half, y))) {
                    purple += 1;
                }
            }
        }

        ClassificationSample {
            left_blue: blue as f64 / total as f64,
            right_purple: purple as f64 / total as f64,
        }
    }
}

fn rgb(pixel: Rgba<u8>) -> [u8; 3] {
    let [r, g, b, _] = pixel.0;
    [r, g, b]
}
