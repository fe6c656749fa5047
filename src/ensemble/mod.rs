//! Prediction ensemble with online accuracy accounting.
//!
//! # Modules
//!
//! - [`strategy`] - The closed set of forecasting heuristics
//!
//! # Scoring
//!
//! ```text
//! new outcome r ──┐
//!                 v
//!   prefix (history without r) ──> Strategy::predict ──> p
//!                                                        │
//!   predictions += 1, correct += (p == r) <──────────────┘
//! ```
//!
//! The best method is derived from the counters on every read and never
//! stored alongside them.
//!
//! # Example
//!
//! ```rust
//! use twotone::ensemble::PredictorEnsemble;
//! use twotone::Outcome;
//!
//! let mut ensemble = PredictorEnsemble::new();
//! ensemble.score(&[Outcome::Alpha], Outcome::Alpha);
//!
//! let best = ensemble.best_method();
//! assert_eq!(best.predictions, 1);
//! ```

pub mod strategy;

pub use strategy::Strategy;

use crate::history::Outcome;
use serde::{Deserialize, Serialize};

/// A strategy paired with its running accuracy counters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PredictionMethod {
    /// The forecasting rule.
    pub strategy: Strategy,
    /// Number of scored predictions.
    pub predictions: u64,
    /// Number of scored predictions that matched. Never exceeds `predictions`.
    pub correct: u64,
}

impl PredictionMethod {
    /// Creates a method with zeroed counters.
    #[must_use]
    pub fn new(strategy: Strategy) -> Self {
        Self {
            strategy,
            predictions: 0,
            correct: 0,
        }
    }

    /// Unique display name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.strategy.name()
    }

    /// Accuracy in percent, 0 when nothing has been scored yet.
    #[must_use]
    pub fn accuracy_percent(&self) -> f64 {
        if self.predictions == 0 {
            return 0.0;
        }
        self.correct as f64 / self.predictions as f64 * 100.0
    }

    /// Scores this method's forecast for `prefix` against `actual`.
    ///
    /// Returns the forecast that was scored.
    pub fn score(&mut self, prefix: &[Outcome], actual: Outcome) -> Outcome {
        let predicted = self.strategy.predict(prefix);
        self.predictions += 1;
        if predicted == actual {
            self.correct += 1;
        }
        predicted
    }

    fn reset(&mut self) {
        self.predictions = 0;
        self.correct = 0;
    }

    /// Read-only, serializable view with derived accuracy.
    #[must_use]
    pub fn snapshot(&self) -> MethodSnapshot {
        MethodSnapshot {
            name: self.name().to_string(),
            strategy: self.strategy,
            predictions: self.predictions,
            correct: self.correct,
            accuracy_percent: self.accuracy_percent(),
        }
    }
}

/// Serializable copy of a method's counters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MethodSnapshot {
    pub name: String,
    pub strategy: Strategy,
    pub predictions: u64,
    pub correct: u64,
    pub accuracy_percent: f64,
}

/// A method's forecast for the next, not yet observed outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MethodForecast {
    pub name: String,
    pub forecast: Outcome,
    pub accuracy_percent: f64,
}

/// Fixed, ordered set of prediction methods.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PredictorEnsemble {
    methods: Vec<PredictionMethod>,
}

impl Default for PredictorEnsemble {
    fn default() -> Self {
        Self {
            methods: Strategy::ALL.into_iter().map(PredictionMethod::new).collect(),
        }
    }
}

impl PredictorEnsemble {
    /// Creates the four built-in methods with zeroed counters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Methods in declaration order.
    #[must_use]
    pub fn methods(&self) -> &[PredictionMethod] {
        &self.methods
    }

    /// Looks a method up by its strategy.
    #[must_use]
    pub fn method(&self, strategy: Strategy) -> Option<&PredictionMethod> {
        self.methods.iter().find(|m| m.strategy == strategy)
    }

    /// Scores every method against `actual` using `prefix`, which must not
    /// contain `actual`.
    ///
    /// Returns each method's scored forecast in declaration order.
    pub fn score(&mut self, prefix: &[Outcome], actual: Outcome) -> Vec<Outcome> {
        self.methods
            .iter_mut()
            .map(|method| method.score(prefix, actual))
            .collect()
    }

    /// Zeroes every counter.
    pub fn reset(&mut self) {
        self.methods.iter_mut().for_each(PredictionMethod::reset);
    }

    /// The method with the highest accuracy.
    ///
    /// Ties go to the method declared first.
    #[must_use]
    pub fn best_method(&self) -> &PredictionMethod {
        let mut best = &self.methods[0];
        for method in &self.methods[1..] {
            if method.accuracy_percent() > best.accuracy_percent() {
                best = method;
            }
        }
        best
    }

    /// Every method's forecast for the outcome following `history`.
    #[must_use]
    pub fn forecasts(&self, history: &[Outcome]) -> Vec<MethodForecast> {
        self.methods
            .iter()
            .map(|method| MethodForecast {
                name: method.name().to_string(),
                forecast: method.strategy.predict(history),
                accuracy_percent: method.accuracy_percent(),
            })
            .collect()
    }

    /// Serializable snapshots in declaration order.
    #[must_use]
    pub fn snapshots(&self) -> Vec<MethodSnapshot> {
        self.methods.iter().map(PredictionMethod::snapshot).collect()
    }
}
