//! Append-only outcome log.
//!
//! Entries are never reordered, edited or removed individually. The only
//! way to shrink the log is [`OutcomeHistory::clear`], which the tracker
//! always pairs with an ensemble reset.

use crate::error::{Result, TwotoneError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One of the two symbolic classes being observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Alpha,
    Omega,
}

impl Outcome {
    /// The other symbol.
    #[must_use]
    pub fn opposite(&self) -> Self {
        match self {
            Self::Alpha => Self::Omega,
            Self::Omega => Self::Alpha,
        }
    }

    /// Single-letter form used in compact sequences.
    #[must_use]
    pub fn short(&self) -> char {
        match self {
            Self::Alpha => 'A',
            Self::Omega => 'O',
        }
    }

    /// Parses a sequence of symbols.
    ///
    /// Tokens are separated by commas or whitespace. A token is either a
    /// full symbol (`alpha`, `o`, ...) or a compact run such as `AAOAO`.
    ///
    /// # Errors
    ///
    /// Returns [`TwotoneError::UnknownOutcome`] for the first token that is
    /// neither.
    ///
    /// # Example
    ///
    /// ```rust
    /// use twotone::Outcome;
    ///
    /// let seq = Outcome::parse_sequence("AAO").unwrap();
    /// assert_eq!(seq, vec![Outcome::Alpha, Outcome::Alpha, Outcome::Omega]);
    /// assert_eq!(Outcome::parse_sequence("alpha omega").unwrap().len(), 2);
    /// ```
    pub fn parse_sequence(input: &str) -> Result<Vec<Self>> {
        let mut sequence = Vec::new();
        let tokens = input
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|token| !token.is_empty());

        for token in tokens {
            if let Ok(outcome) = token.parse::<Outcome>() {
                sequence.push(outcome);
                continue;
            }
            for c in token.chars() {
                let outcome = c.to_string().parse::<Outcome>().map_err(|_| TwotoneError::UnknownOutcome {
                    input: token.to_string(),
                })?;
                sequence.push(outcome);
            }
        }

        Ok(sequence)
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Alpha => write!(f, "alpha"),
            Self::Omega => write!(f, "omega"),
        }
    }
}

impl std::str::FromStr for Outcome {
    type Err = TwotoneError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "alpha" | "a" => Ok(Self::Alpha),
            "omega" | "o" => Ok(Self::Omega),
            _ => Err(TwotoneError::UnknownOutcome {
                input: s.to_string(),
            }),
        }
    }
}

/// A recorded observation. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutcomeEntry {
    /// Strictly increasing within a process, also across clears.
    pub id: u64,
    /// The observed symbol.
    pub result: Outcome,
    /// When the outcome was accepted.
    pub observed_at: DateTime<Utc>,
}

/// Derived counts over the whole log.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryStats {
    pub total: usize,
    pub alpha: usize,
    pub omega: usize,
    /// Symbol and length of the run ending at the newest entry.
    pub current_streak: Option<(Outcome, usize)>,
}

/// Ordered log of observed outcomes.
#[derive(Debug, Clone, Default)]
pub struct OutcomeHistory {
    entries: Vec<OutcomeEntry>,
    next_id: u64,
}

impl OutcomeHistory {
    /// Creates an empty history.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an outcome stamped with `observed_at` and returns the new entry.
    pub fn append(&mut self, result: Outcome, observed_at: DateTime<Utc>) -> &OutcomeEntry {
        self.next_id += 1;
        self.entries.push(OutcomeEntry {
            id: self.next_id,
            result,
            observed_at,
        });
        &self.entries[self.entries.len() - 1]
    }

    /// Empties the log. Identifiers keep increasing afterwards.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// All entries, oldest first.
    #[must_use]
    pub fn entries(&self) -> &[OutcomeEntry] {
        &self.entries
    }

    /// The newest entry, if any.
    #[must_use]
    pub fn last(&self) -> Option<&OutcomeEntry> {
        self.entries.last()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The bare symbol sequence, oldest first.
    #[must_use]
    pub fn outcomes(&self) -> Vec<Outcome> {
        self.entries.iter().map(|e| e.result).collect()
    }

    /// Counts and current streak.
    #[must_use]
    pub fn stats(&self) -> HistoryStats {
        let alpha = self
            .entries
            .iter()
            .filter(|e| e.result == Outcome::Alpha)
            .count();

        let current_streak = self.last().map(|last| {
            let len = self
                .entries
                .iter()
                .rev()
                .take_while(|e| e.result == last.result)
                .count();
            (last.result, len)
        });

        HistoryStats {
            total: self.entries.len(),
            alpha,
            omega: self.entries.len() - alpha,
            current_streak,
        }
    }
}
