//! Testing infrastructure for twotone.
//!
//! This module provides mocks and fixtures for exercising the classifier and
//! the monitoring engine without a real display stream.
//!
//! # Architecture
//!
//! - **Mocks**: [`MockCaptureSource`] with scripted reads and call counters
//! - **Fixtures**: synthetic frames in colors the pixel predicates accept
//!
//! # Example
//!
//! ```rust
//! use twotone::testing::{alpha_frame, MockCaptureSource};
//!
//! let source = MockCaptureSource::new()
//!     .with_frame(alpha_frame(120, 80))
//!     .then_fail("dropped frame");
//! assert_eq!(source.acquired_count(), 0);
//! ```

pub mod fixtures;
pub mod mocks;

pub use fixtures::*;
pub use mocks::*;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::CaptureSource;
    use crate::error::TwotoneError;
    use crate::vision::CaptureRegion;
    use std::time::Duration;

    fn region() -> CaptureRegion {
        CaptureRegion::new(0, 0, 120, 80).unwrap()
    }

    // =========================================================================
    // Mock Capture Source Tests
    // =========================================================================

    #[tokio::test]
    async fn test_mock_serves_script_then_fallback() {
        let source = MockCaptureSource::new()
            .with_frame(blank_frame(120, 80))
            .then_frame(alpha_frame(120, 80))
            .then_fail("boom");

        let stream = source.acquire().await.unwrap();
        let first = stream.read_region(region()).await.unwrap();
        assert_eq!(first.get_pixel(0, 0).0[..3], BLUE);

        let err = stream.read_region(region()).await.unwrap_err();
        assert!(err.is_transient());

        let third = stream.read_region(region()).await.unwrap();
        assert_eq!(third.get_pixel(0, 0).0[..3], GRAY);
        assert_eq!(source.read_count(), 3);
    }

    #[tokio::test]
    async fn test_mock_crops_larger_frames() {
        let source = MockCaptureSource::new().with_frame(omega_frame(400, 300));
        let stream = source.acquire().await.unwrap();

        let raster = stream
            .read_region(CaptureRegion::new(300, 0, 100, 100).unwrap())
            .await
            .unwrap();
        assert_eq!(raster.dimensions(), (100, 100));
        assert_eq!(raster.get_pixel(0, 0).0[..3], PURPLE);
    }

    #[tokio::test]
    async fn test_mock_release_counted_once() {
        let source = MockCaptureSource::new();
        let mut stream = source.acquire().await.unwrap();
        stream.release();
        stream.release();
        drop(stream);

        assert_eq!(source.acquired_count(), 1);
        assert_eq!(source.released_count(), 1);
    }

    #[tokio::test]
    async fn test_mock_drop_releases() {
        let source = MockCaptureSource::new();
        drop(source.acquire().await.unwrap());
        assert_eq!(source.released_count(), 1);
    }

    #[tokio::test]
    async fn test_mock_failing_acquire() {
        let source = MockCaptureSource::new().failing_acquire("no display");
        let err = source.acquire().await.err().unwrap();
        assert!(matches!(err, TwotoneError::CaptureUnavailable { .. }));
        assert_eq!(source.acquired_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_mock_hang_never_completes() {
        let source = MockCaptureSource::new().then_hang();
        let stream = source.acquire().await.unwrap();
        let read = tokio::time::timeout(Duration::from_secs(60), stream.read_region(region())).await;
        assert!(read.is_err());
    }

    // =========================================================================
    // Fixture Tests
    // =========================================================================

    #[test]
    fn test_partial_alpha_frame_coverage() {
        let frame = partial_alpha_frame(100, 100, 40);
        assert_eq!(frame.get_pixel(0, 39).0[..3], BLUE);
        assert_eq!(frame.get_pixel(0, 40).0[..3], GRAY);
        assert_eq!(frame.get_pixel(50, 0).0[..3], GRAY);
    }
}
