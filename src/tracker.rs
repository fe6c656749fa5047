//! The single dispatch point for outcomes.
//!
//! [`Tracker`] owns the history and the ensemble together so that reading
//! the prefix, scoring every method and appending the new entry happen in
//! one `&mut self` call. Manual entries and detected outcomes both go
//! through [`Tracker::dispatch`] and share the same debounce window.

use crate::config::DEBOUNCE_MS;
use crate::ensemble::{MethodForecast, MethodSnapshot, PredictionMethod, PredictorEnsemble};
use crate::history::{HistoryStats, Outcome, OutcomeEntry, OutcomeHistory};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info};

/// Result of offering an outcome to the tracker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// The outcome was appended and the ensemble updated.
    Recorded(OutcomeEntry),
    /// Dropped because the previous entry is too recent.
    Debounced {
        /// Milliseconds since the previous entry.
        since_last_ms: i64,
    },
}

impl Dispatch {
    /// Returns true if the outcome made it into the history.
    #[must_use]
    pub fn is_recorded(&self) -> bool {
        matches!(self, Self::Recorded(_))
    }
}

/// Serializable view of the whole tracker.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackerSnapshot {
    pub history: Vec<OutcomeEntry>,
    pub methods: Vec<MethodSnapshot>,
    pub best_method: String,
    /// What the best method expects next.
    pub best_forecast: Outcome,
    pub stats: HistoryStats,
    pub forecasts: Vec<MethodForecast>,
}

/// Outcome history plus predictor ensemble, updated atomically.
#[derive(Debug, Clone, Default)]
pub struct Tracker {
    history: OutcomeHistory,
    ensemble: PredictorEnsemble,
}

impl Tracker {
    /// Creates an empty tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Offers `result` observed at `now`.
    ///
    /// Dropped silently if the newest entry is less than five seconds older
    /// than `now`. Otherwise every method is scored against the existing
    /// history (unless it is empty) before the entry is appended.
    pub fn dispatch(&mut self, result: Outcome, now: DateTime<Utc>) -> Dispatch {
        if let Some(last) = self.history.last() {
            let since_last_ms = (now - last.observed_at).num_milliseconds();
            if since_last_ms < DEBOUNCE_MS {
                debug!(outcome = %result, since_last_ms, "Outcome debounced");
                return Dispatch::Debounced { since_last_ms };
            }
        }

        if !self.history.is_empty() {
            let prefix = self.history.outcomes();
            self.ensemble.score(&prefix, result);
        }

        let entry = self.history.append(result, now).clone();
        info!(
            id = entry.id,
            outcome = %result,
            best = self.best_method_name(),
            "Outcome recorded"
        );
        Dispatch::Recorded(entry)
    }

    /// Empties the history and zeroes every counter.
    pub fn clear(&mut self) {
        self.history.clear();
        self.ensemble.reset();
        info!("Tracker cleared");
    }

    /// Recorded entries, oldest first.
    #[must_use]
    pub fn history(&self) -> &[OutcomeEntry] {
        self.history.entries()
    }

    /// Methods in declaration order.
    #[must_use]
    pub fn methods(&self) -> &[PredictionMethod] {
        self.ensemble.methods()
    }

    /// The current best method.
    #[must_use]
    pub fn best_method(&self) -> &PredictionMethod {
        self.ensemble.best_method()
    }

    /// Name of the current best method.
    #[must_use]
    pub fn best_method_name(&self) -> &'static str {
        self.best_method().name()
    }

    /// The best method's forecast for the next outcome.
    #[must_use]
    pub fn best_forecast(&self) -> Outcome {
        self.best_method().strategy.predict(&self.history.outcomes())
    }

    /// Counts and current streak.
    #[must_use]
    pub fn stats(&self) -> HistoryStats {
        self.history.stats()
    }

    /// Everything a UI or exporter needs, in one serializable value.
    #[must_use]
    pub fn snapshot(&self) -> TrackerSnapshot {
        TrackerSnapshot {
            history: self.history.entries().to_vec(),
            methods: self.ensemble.snapshots(),
            best_method: self.best_method_name().to_string(),
            best_forecast: self.best_forecast(),
            stats: self.history.stats(),
            forecasts: self.ensemble.forecasts(&self.history.outcomes()),
        }
    }
}
