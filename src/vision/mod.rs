//! Region geometry, color dominance samples and the detection rule.
//!
//! # Modules
//!
//! - [`classifier`] - Per-half pixel classification
//!
//! # Decision
//!
//! | Condition | Detected |
//! |-----------|----------|
//! | left blue > right purple and left blue > threshold | Alpha |
//! | right purple > left blue and right purple > threshold | Omega |
//! | otherwise | nothing |

pub mod classifier;

pub use classifier::{is_target_blue, is_target_purple, RegionClassifier};

use crate::config::{Sensitivity, MIN_REGION_SIDE};
use crate::error::{Result, TwotoneError};
use crate::history::Outcome;
use serde::{Deserialize, Serialize};

/// Rectangle in source-image pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CaptureRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl CaptureRegion {
    /// Builds a region, rejecting anything 50 pixels or smaller on a side.
    ///
    /// # Errors
    ///
    /// Returns [`TwotoneError::InvalidRegion`] for undersized regions.
    ///
    /// # Example
    ///
    /// ```rust
    /// use twotone::vision::CaptureRegion;
    ///
    /// assert!(CaptureRegion::new(0, 0, 51, 51).is_ok());
    /// assert!(CaptureRegion::new(0, 0, 50, 400).is_err());
    /// ```
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Result<Self> {
        let region = Self {
            x,
            y,
            width,
            height,
        };
        region.validate()?;
        Ok(region)
    }

    /// Checks the minimum-size invariant.
    ///
    /// # Errors
    ///
    /// Returns [`TwotoneError::InvalidRegion`] for undersized regions.
    pub fn validate(&self) -> Result<()> {
        if self.width <= MIN_REGION_SIDE || self.height <= MIN_REGION_SIDE {
            return Err(TwotoneError::InvalidRegion {
                width: self.width,
                height: self.height,
                min: MIN_REGION_SIDE,
            });
        }
        Ok(())
    }

    /// Width of each half; an odd trailing column belongs to neither.
    #[must_use]
    pub fn half_width(&self) -> u32 {
        self.width / 2
    }

    /// Returns true if the region lies entirely inside a `width`x`height` image.
    #[must_use]
    pub fn fits_within(&self, width: u32, height: u32) -> bool {
        let right = u64::from(self.x) + u64::from(self.width);
        let bottom = u64::from(self.y) + u64::from(self.height);
        right <= u64::from(width) && bottom <= u64::from(height)
    }
}

impl std::fmt::Display for CaptureRegion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}x{}+{}+{}",
            self.width, self.height, self.x, self.y
        )
    }
}

impl std::str::FromStr for CaptureRegion {
    type Err = TwotoneError;

    /// Parses `"x,y,width,height"`.
    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        let invalid = || {
            TwotoneError::invalid_config("region", format!("expected x,y,width,height, got '{}'", s))
        };

        if parts.len() != 4 {
            return Err(invalid());
        }

        let mut values = [0u32; 4];
        for (slot, part) in values.iter_mut().zip(&parts) {
            *slot = part.parse().map_err(|_| invalid())?;
        }

        Self::new(values[0], values[1], values[2], values[3])
    }
}

/// Fractions of matching pixels in each half, both in `[0, 1]`.
///
/// Produced once per tick and discarded after the decision.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassificationSample {
    /// Share of left-half pixels passing the blue test.
    pub left_blue: f64,
    /// Share of right-half pixels passing the purple test.
    pub right_purple: f64,
}

impl ClassificationSample {
    /// Applies the detection rule at `sensitivity`.
    #[must_use]
    pub fn decide(&self, sensitivity: Sensitivity) -> Option<Outcome> {
        let threshold = sensitivity.threshold();
        if self.left_blue > self.right_purple && self.left_blue > threshold {
            Some(Outcome::Alpha)
        } else if self.right_purple > self.left_blue && self.right_purple > threshold {
            Some(Outcome::Omega)
        } else {
            None
        }
    }
}
