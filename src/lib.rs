//! Twotone - binary outcome tracker
//!
//! Records a stream of two-valued outcomes (alpha / omega), scores four
//! heuristic predictors against the growing history, and can derive outcomes
//! by periodically sampling a screen region and testing the color dominance
//! of its two halves.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`history`] - Outcomes and the append-only outcome log
//! - [`ensemble`] - Prediction strategies, accuracy counters and best-method selection
//! - [`tracker`] - History and ensemble behind one debounced dispatch point
//! - [`vision`] - Capture regions, per-half color classification and the decision rule
//! - [`capture`] - Capture stream capability and the file-backed source
//! - [`monitor`] - Monitoring sessions, the sampling loop and the engine task
//! - [`clock`] - Wall-clock sources
//! - [`config`] - Constants, sensitivity and persisted settings
//! - [`error`] - Custom error types and handling
//! - [`testing`] - Testing infrastructure (mocks, fixtures)
//!
//! # Example
//!
//! ```rust
//! use chrono::{Duration, Utc};
//! use twotone::{Outcome, Tracker};
//!
//! let mut tracker = Tracker::new();
//! let start = Utc::now();
//! for (i, outcome) in Outcome::parse_sequence("AAOAO").unwrap().into_iter().enumerate() {
//!     tracker.dispatch(outcome, start + Duration::seconds(10 * i as i64));
//! }
//!
//! assert_eq!(tracker.methods()[0].predictions, 4);
//! assert_eq!(tracker.best_method_name(), "Recent Window");
//! ```

pub mod capture;
pub mod clock;
pub mod config;
pub mod ensemble;
pub mod error;
pub mod history;
pub mod monitor;
pub mod testing;
pub mod tracker;
pub mod vision;

// Re-export commonly used types
pub use error::{IntoTwotoneError, Result, TwotoneError};

// Re-export config types
pub use config::{
    Sensitivity, Settings, DEBOUNCE_MS, MIN_REGION_SIDE, SAMPLING_INTERVAL_MS, SENSITIVITY_MAX,
    SENSITIVITY_MIN, SENSITIVITY_STEP,
};

// Re-export the outcome model
pub use ensemble::{MethodForecast, MethodSnapshot, PredictionMethod, PredictorEnsemble, Strategy};
pub use history::{HistoryStats, Outcome, OutcomeEntry, OutcomeHistory};
pub use tracker::{Dispatch, Tracker, TrackerSnapshot};

// Re-export sampling types
pub use capture::{CaptureSource, CaptureStream, FileCaptureSource};
pub use clock::{Clock, ManualClock, TokioClock};
pub use monitor::{
    run_monitor, spawn_monitor, Engine, EngineCommand, MonitorEvent, MonitorHandle,
    MonitoringSession, SampleOutcome,
};
pub use vision::{CaptureRegion, ClassificationSample, RegionClassifier};
