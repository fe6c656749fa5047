//! Custom error types for twotone.
//!
//! Nothing in the tracking core is fatal: the worst a sampling tick can do
//! is record nothing. The variants here surface at the edges instead, when
//! a region is confirmed, when a capture stream is acquired, or when
//! settings are loaded.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for twotone operations
#[derive(Error, Debug)]
pub enum TwotoneError {
    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Failed to load configuration
    #[error("Configuration error: {message}")]
    Config {
        message: String,
        path: Option<PathBuf>,
    },

    /// Invalid configuration value
    #[error("Invalid configuration: {field} - {reason}")]
    InvalidConfig { field: String, reason: String },

    // =========================================================================
    // Validation Errors
    // =========================================================================
    /// Capture region too small
    #[error("Invalid capture region {width}x{height}: both sides must exceed {min} pixels")]
    InvalidRegion { width: u32, height: u32, min: u32 },

    /// Sensitivity outside the allowed range or off-step
    #[error("Invalid sensitivity {value}: must be {min}-{max} in steps of {step}")]
    InvalidSensitivity {
        value: u32,
        min: u32,
        max: u32,
        step: u32,
    },

    /// Unparseable outcome symbol
    #[error("Unknown outcome '{input}': expected alpha/a or omega/o")]
    UnknownOutcome { input: String },

    // =========================================================================
    // Capture Errors
    // =========================================================================
    /// Capture stream could not be acquired
    #[error("Capture unavailable: {message}")]
    CaptureUnavailable { message: String },

    /// A single frame could not be read or classified
    #[error("Frame read failed: {message}")]
    FrameRead { message: String },

    // =========================================================================
    // Monitoring Errors
    // =========================================================================
    /// Monitoring already running
    #[error("Monitoring already active (session {session_id})")]
    MonitoringActive { session_id: String },

    /// Engine task is gone
    #[error("Monitor engine is no longer running")]
    EngineStopped,

    // =========================================================================
    // Wrapped Errors
    // =========================================================================
    /// IO error wrapper
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON error wrapper
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// Image decoding error wrapper
    #[error(transparent)]
    Image(#[from] image::ImageError),

    /// Generic error wrapper
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl TwotoneError {
    // =========================================================================
    // Constructor helpers
    // =========================================================================

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            path: None,
        }
    }

    /// Create a configuration error with path
    pub fn config_with_path(message: impl Into<String>, path: PathBuf) -> Self {
        Self::Config {
            message: message.into(),
            path: Some(path),
        }
    }

    /// Create an invalid configuration error
    pub fn invalid_config(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Create a capture acquisition error
    pub fn capture_unavailable(message: impl Into<String>) -> Self {
        Self::CaptureUnavailable {
            message: message.into(),
        }
    }

    /// Create a transient frame error
    pub fn frame(message: impl Into<String>) -> Self {
        Self::FrameRead {
            message: message.into(),
        }
    }

    // =========================================================================
    // Classification helpers
    // =========================================================================

    /// Check if this error only affects a single sampling tick
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::FrameRead { .. } | Self::Image(_))
    }

    /// Check if this error was caused by user input that can be corrected
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::InvalidRegion { .. }
                | Self::InvalidSensitivity { .. }
                | Self::UnknownOutcome { .. }
                | Self::InvalidConfig { .. }
        )
    }

    /// Get error code for exit status
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::InvalidRegion { .. }
            | Self::InvalidSensitivity { .. }
            | Self::UnknownOutcome { .. } => 2,
            Self::CaptureUnavailable { .. } => 3,
            Self::MonitoringActive { .. } | Self::EngineStopped => 4,
            Self::Config { .. } | Self::InvalidConfig { .. } => 7,
            _ => 1,
        }
    }
}

/// Type alias for twotone results
pub type Result<T> = std::result::Result<T, TwotoneError>;

/// Extension trait for converting foreign errors to TwotoneError
pub trait IntoTwotoneError<T> {
    fn into_config_error(self) -> Result<T>;
    fn into_capture_error(self) -> Result<T>;
    fn into_frame_error(self) -> Result<T>;
}

impl<T, E: Into<anyhow::Error>> IntoTwotoneError<T> for std::result::Result<T, E> {
    fn into_config_error(self) -> Result<T> {
        self.map_err(|e| TwotoneError::config(e.into().to_string()))
    }

    fn into_capture_error(self) -> Result<T> {
        self.map_err(|e| TwotoneError::capture_unavailable(e.into().to_string()))
    }

    fn into_frame_error(self) -> Result<T> {
        self.map_err(|e| TwotoneError::frame(e.into().to_string()))
    }
}
