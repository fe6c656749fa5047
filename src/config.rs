//! Configuration management for twotone.
//!
//! Timing constants are fixed; only the sensitivity, the default capture
//! region and capture plumbing are user-configurable.

use crate::error::{IntoTwotoneError, Result, TwotoneError};
use crate::vision::CaptureRegion;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Period between sampling ticks while monitoring.
pub const SAMPLING_INTERVAL_MS: u64 = 30_000;

/// Minimum spacing between two recorded outcomes.
pub const DEBOUNCE_MS: i64 = 5_000;

/// Both sides of a capture region must be strictly larger than this.
pub const MIN_REGION_SIDE: u32 = 50;

/// Lowest accepted sensitivity (percent).
pub const SENSITIVITY_MIN: u32 = 10;

/// Highest accepted sensitivity (percent).
pub const SENSITIVITY_MAX: u32 = 50;

/// Sensitivity granularity (percent).
pub const SENSITIVITY_STEP: u32 = 5;

/// Sensitivity used when nothing else is configured.
pub const DEFAULT_SENSITIVITY: u32 = 30;

/// Default bound on a single capture read.
pub const DEFAULT_CAPTURE_TIMEOUT_MS: u64 = 10_000;

/// Detection sensitivity in percent.
///
/// Always within `[SENSITIVITY_MIN, SENSITIVITY_MAX]` and a multiple of
/// `SENSITIVITY_STEP`; the only way to build one is [`Sensitivity::new`].
///
/// # Example
///
/// ```rust
/// use twotone::config::Sensitivity;
///
/// let s = Sensitivity::new(30).unwrap();
/// assert_eq!(s.threshold(), 0.30);
/// assert!(Sensitivity::new(12).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct Sensitivity(u32);

impl Sensitivity {
    /// Validates and wraps a percentage.
    ///
    /// # Errors
    ///
    /// Returns [`TwotoneError::InvalidSensitivity`] when the value is out of
    /// range or not on a step boundary.
    pub fn new(value: u32) -> Result<Self> {
        let in_range = (SENSITIVITY_MIN..=SENSITIVITY_MAX).contains(&value);
        if !in_range || value % SENSITIVITY_STEP != 0 {
            return Err(TwotoneError::InvalidSensitivity {
                value,
                min: SENSITIVITY_MIN,
                max: SENSITIVITY_MAX,
                step: SENSITIVITY_STEP,
            });
        }
        Ok(Self(value))
    }

    /// The raw percentage.
    #[must_use]
    pub fn percent(&self) -> u32 {
        self.0
    }

    /// The dominance fraction a half must exceed to count as a detection.
    #[must_use]
    pub fn threshold(&self) -> f64 {
        f64::from(self.0) / 100.0
    }
}

impl Default for Sensitivity {
    fn default() -> Self {
        Self(DEFAULT_SENSITIVITY)
    }
}

impl TryFrom<u32> for Sensitivity {
    type Error = TwotoneError;

    fn try_from(value: u32) -> Result<Self> {
        Self::new(value)
    }
}

impl From<Sensitivity> for u32 {
    fn from(value: Sensitivity) -> Self {
        value.0
    }
}

impl std::fmt::Display for Sensitivity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}%", self.0)
    }
}

/// User settings loaded from `settings.json`.
///
/// # Example settings.json
///
/// ```json
/// {
///   "sensitivity": 35,
///   "region": { "x": 100, "y": 40, "width": 320, "height": 180 },
///   "captureTimeoutMs": 5000,
///   "framePath": "/tmp/screen.png"
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    /// Raw sensitivity; validated by [`Settings::validate`].
    #[serde(default = "default_sensitivity")]
    pub sensitivity: u32,

    /// Capture region used when none is given on the command line.
    #[serde(default)]
    pub region: Option<CaptureRegion>,

    /// Upper bound on a single capture read (default: 10000).
    #[serde(default = "default_capture_timeout_ms")]
    pub capture_timeout_ms: u64,

    /// Image file the file-backed capture source reads from.
    #[serde(default)]
    pub frame_path: Option<PathBuf>,
}

fn default_sensitivity() -> u32 {
    DEFAULT_SENSITIVITY
}

fn default_capture_timeout_ms() -> u64 {
    DEFAULT_CAPTURE_TIMEOUT_MS
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            sensitivity: default_sensitivity(),
            region: None,
            capture_timeout_ms: default_capture_timeout_ms(),
            frame_path: None,
        }
    }
}

impl Settings {
    /// Load settings from a file, falling back to defaults when it is absent.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the file exists but cannot be read
    /// or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| TwotoneError::config_with_path(e.to_string(), path.to_path_buf()))?;
        let settings: Settings = serde_json::from_str(&content)
            .map_err(|e| TwotoneError::config_with_path(e.to_string(), path.to_path_buf()))?;
        Ok(settings)
    }

    /// Write settings as pretty JSON, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or file cannot be written.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Default settings location: `<config_dir>/twotone/settings.json`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when the platform has no config directory.
    pub fn default_path() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|dir| dir.join("twotone").join("settings.json"))
            .ok_or_else(|| anyhow::anyhow!("no platform configuration directory"))
            .into_config_error()
    }

    /// The validated sensitivity.
    ///
    /// # Errors
    ///
    /// Returns [`TwotoneError::InvalidSensitivity`] for out-of-range values.
    pub fn sensitivity(&self) -> Result<Sensitivity> {
        Sensitivity::new(self.sensitivity)
    }

    /// Capture timeout as a duration.
    #[must_use]
    pub fn capture_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.capture_timeout_ms)
    }

    /// Validates the settings.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The sensitivity is out of range or off-step
    /// - The region is 50 pixels or smaller on either side
    /// - The capture timeout is zero
    pub fn validate(&self) -> std::result::Result<(), String> {
        self.sensitivity().map_err(|e| e.to_string())?;

        if let Some(region) = &self.region {
            region.validate().map_err(|e| e.to_string())?;
        }

        if self.capture_timeout_ms == 0 {
            return Err("captureTimeoutMs must be greater than zero".to_string());
        }

        Ok(())
    }
}
