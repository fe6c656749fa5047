//! The four built-in forecasting heuristics.
//!
//! Every strategy is a pure function of a history prefix. The prefix handed
//! in never contains the outcome being scored.

use crate::history::Outcome;
use serde::{Deserialize, Serialize};

/// Number of trailing entries the recent-window vote looks at.
pub const RECENT_WINDOW: usize = 5;

/// Alpha count in the recent window above which the vote flips to Omega.
pub const RECENT_ALPHA_LIMIT: usize = 2;

/// Number of trailing entries the short-pattern heuristic inspects.
pub const PATTERN_LENGTH: usize = 3;

/// Closed set of forecasting strategies.
///
/// Declaration order is significant: it is the ensemble order and the
/// tie-break order when selecting the best method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Predicts the majority symbol of the whole prefix; Omega on a tie.
    FrequencyMajority,
    /// Votes over the last five entries; more than two Alphas predicts Omega.
    RecentWindow,
    /// Breaks runs of three, otherwise alternates from the newest entry.
    ShortPattern,
    /// First-order Markov transition counts rooted at the newest entry.
    TransitionModel,
}

impl Strategy {
    /// All strategies in declaration order.
    pub const ALL: [Strategy; 4] = [
        Strategy::FrequencyMajority,
        Strategy::RecentWindow,
        Strategy::ShortPattern,
        Strategy::TransitionModel,
    ];

    /// Display name, unique across the ensemble.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::FrequencyMajority => "Frequency Majority",
            Self::RecentWindow => "Recent Window",
            Self::ShortPattern => "Short Pattern",
            Self::TransitionModel => "Transition Model",
        }
    }

    /// Forecast the outcome that follows `prefix`.
    #[must_use]
    pub fn predict(&self, prefix: &[Outcome]) -> Outcome {
        match self {
            Self::FrequencyMajority => frequency_majority(prefix),
            Self::RecentWindow => recent_window(prefix),
            Self::ShortPattern => short_pattern(prefix),
            Self::TransitionModel => transition_model(prefix),
        }
    }
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

fn count_alpha(outcomes: &[Outcome]) -> usize {
    outcomes.iter().filter(|o| **o == Outcome::Alpha).count()
}

fn frequency_majority(prefix: &[Outcome]) -> Outcome {
    let alpha = count_alpha(prefix);
    let omega = prefix.len() - alpha;
    if omega >= alpha {
        Outcome::Omega
    } else {
        Outcome::Alpha
    }
}

fn recent_window(prefix: &[Outcome]) -> Outcome {
    let start = prefix.len().saturating_sub(RECENT_WINDOW);
    if count_alpha(&prefix[start..]) > RECENT_ALPHA_LIMIT {
        Outcome::Omega
    } else {
        Outcome::Alpha
    }
}

fn short_pattern(prefix: &[Outcome]) -> Outcome {
    if prefix.len() < PATTERN_LENGTH {
        return Outcome::Alpha;
    }

    // Runs of three break and mixed tails alternate, so both cases flip the
    // newest entry.
    prefix[prefix.len() - 1].opposite()
}

/// Transition counts `[from][to]`, indexed Alpha = 0, Omega = 1.
fn transition_counts(prefix: &[Outcome]) -> [[u32; 2]; 2] {
    let index = |o: Outcome| match o {
        Outcome::Alpha => 0,
        Outcome::Omega => 1,
    };

    let mut counts = [[0u32; 2]; 2];
    for pair in prefix.windows(2) {
        counts[index(pair[0])][index(pair[1])] += 1;
    }
    counts
}

fn transition_model(prefix: &[Outcome]) -> Outcome {
    if prefix.len() < 2 {
        return Outcome::Alpha;
    }

    let last = prefix[prefix.len() - 1];
    let counts = transition_counts(prefix);
    let (stay, switch) = match last {
        Outcome::Alpha => (counts[0][0], counts[0][1]),
        Outcome::Omega => (counts[1][1], counts[1][0]),
    };

    if switch > stay {
        last.opposite()
    } else {
        last
    }
}
