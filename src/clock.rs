//! Wall-clock sources for outcome timestamps.
//!
//! The debounce guard compares wall-clock timestamps, so whatever drives the
//! tracker decides what "now" means. The monitor loop uses [`TokioClock`] so
//! that paused-time tests move the debounce window along with the sampling
//! interval.

use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex};

/// Source of the current time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall time anchored once and advanced by the tokio clock.
///
/// Under `tokio::time::pause` the reported time only moves when the runtime
/// clock does.
#[derive(Debug, Clone, Copy)]
pub struct TokioClock {
    anchor_wall: DateTime<Utc>,
    anchor_instant: tokio::time::Instant,
}

impl TokioClock {
    /// Anchors to the current wall time and tokio instant.
    #[must_use]
    pub fn new() -> Self {
        Self::anchored_at(Utc::now())
    }

    /// Anchors to a fixed wall time.
    #[must_use]
    pub fn anchored_at(anchor_wall: DateTime<Utc>) -> Self {
        Self {
            anchor_wall,
            anchor_instant: tokio::time::Instant::now(),
        }
    }
}

impl Default for TokioClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for TokioClock {
    fn now(&self) -> DateTime<Utc> {
        let elapsed = self.anchor_instant.elapsed();
        chrono::Duration::from_std(elapsed)
            .map(|delta| self.anchor_wall + delta)
            .unwrap_or(self.anchor_wall)
    }
}

/// Manually advanced clock. Clones share the same time.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl ManualClock {
    /// Creates a clock frozen at `start`.
    #[must_use]
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(Mutex::new(start)),
        }
    }

    /// Moves the clock forward by `millis` milliseconds.
    pub fn advance_ms(&self, millis: i64) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += chrono::Duration::milliseconds(millis);
    }

    /// Sets the clock to `at`.
    pub fn set(&self, at: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(|e| e.into_inner()) = at;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t0() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-03-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn test_manual_clock_shared_between_clones() {
        let clock = ManualClock::new(t0());
        let other = clock.clone();
        clock.advance_ms(1_500);
        assert_eq!(other.now(), t0() + chrono::Duration::milliseconds(1_500));

        other.set(t0());
        assert_eq!(clock.now(), t0());
    }

    #[tokio::test(start_paused = true)]
    async fn test_tokio_clock_follows_paused_time() {
        let clock = TokioClock::anchored_at(t0());
        assert_eq!(clock.now(), t0());

        tokio::time::advance(std::time::Duration::from_secs(30)).await;
        assert_eq!(clock.now(), t0() + chrono::Duration::seconds(30));
    }
}
