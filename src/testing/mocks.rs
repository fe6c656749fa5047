//! Mock capture source with scripted frames and call counters.
//!
//! Clones share their script and counters, so a test can hand one clone to
//! the engine and keep another to inspect what the engine did with it.

use crate::capture::{CaptureSource, CaptureStream};
use crate::error::{Result, TwotoneError};
use crate::vision::CaptureRegion;
use async_trait::async_trait;
use image::RgbaImage;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// One scripted reply to `read_region`.
#[derive(Debug, Clone)]
pub enum ScriptedRead {
    /// Return this frame, cropped to the region.
    Frame(RgbaImage),
    /// Fail this read with a transient error.
    Fail(String),
    /// Never complete.
    Hang,
}

#[derive(Debug, Default)]
struct MockState {
    script: Mutex<VecDeque<ScriptedRead>>,
    fallback: Mutex<Option<RgbaImage>>,
    acquired: AtomicU32,
    reads: AtomicU32,
    released: AtomicU32,
}

/// Mock implementation of [`CaptureSource`].
///
/// # Example
///
/// ```rust,ignore
/// let source = MockCaptureSource::new()
///     .with_frame(alpha_frame(120, 80))
///     .then_fail("decoder hiccup");
///
/// let engine = Engine::new(source.clone());
/// // ...
/// assert_eq!(source.released_count(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MockCaptureSource {
    state: Arc<MockState>,
    acquire_error: Option<String>,
    read_delay: Option<Duration>,
}

impl MockCaptureSource {
    /// Create a source that serves blank reads until told otherwise.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Frame returned whenever the script is empty.
    #[must_use]
    pub fn with_frame(self, frame: RgbaImage) -> Self {
        *lock(&self.state.fallback) = Some(frame);
        self
    }

    /// Queue a frame for the next unscripted read.
    #[must_use]
    pub fn then_frame(self, frame: RgbaImage) -> Self {
        self.push(ScriptedRead::Frame(frame));
        self
    }

    /// Queue a failing read.
    #[must_use]
    pub fn then_fail(self, message: &str) -> Self {
        self.push(ScriptedRead::Fail(message.to_string()));
        self
    }

    /// Queue a read that never completes.
    #[must_use]
    pub fn then_hang(self) -> Self {
        self.push(ScriptedRead::Hang);
        self
    }

    /// Make every `acquire` fail with `message`.
    #[must_use]
    pub fn failing_acquire(mut self, message: &str) -> Self {
        self.acquire_error = Some(message.to_string());
        self
    }

    /// Delay every read by `delay`.
    #[must_use]
    pub fn with_read_delay(mut self, delay: Duration) -> Self {
        self.read_delay = Some(delay);
        self
    }

    /// Queue a reply after construction. Visible to every clone.
    pub fn push(&self, read: ScriptedRead) {
        lock(&self.state.script).push_back(read);
    }

    /// Number of successful `acquire` calls.
    #[must_use]
    pub fn acquired_count(&self) -> u32 {
        self.state.acquired.load(Ordering::SeqCst)
    }

    /// Number of `read_region` calls, including failed ones.
    #[must_use]
    pub fn read_count(&self) -> u32 {
        self.state.reads.load(Ordering::SeqCst)
    }

    /// Number of streams released.
    #[must_use]
    pub fn released_count(&self) -> u32 {
        self.state.released.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CaptureSource for MockCaptureSource {
    async fn acquire(&self) -> Result<Box<dyn CaptureStream>> {
        if let Some(message) = &self.acquire_error {
            return Err(TwotoneError::capture_unavailable(message.clone()));
        }

        self.state.acquired.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockCaptureStream {
            state: Arc::clone(&self.state),
            read_delay: self.read_delay,
            released: false,
        }))
    }
}

/// Stream handed out by [`MockCaptureSource`].
#[derive(Debug)]
pub struct MockCaptureStream {
    state: Arc<MockState>,
    read_delay: Option<Duration>,
    released: bool,
}

impl MockCaptureStream {
    fn fallback(&self, region: CaptureRegion) -> RgbaImage {
        lock(&self.state.fallback)
            .clone()
            .unwrap_or_else(|| RgbaImage::new(region.width, region.height))
    }
}

#[async_trait]
impl CaptureStream for MockCaptureStream {
    async fn read_region(&self, region: CaptureRegion) -> Result<RgbaImage> {
        self.state.reads.fetch_add(1, Ordering::SeqCst);

        let next = lock(&self.state.script).pop_front();
        if let Some(delay) = self.read_delay {
            tokio::time::sleep(delay).await;
        }

        let frame = match next {
            Some(ScriptedRead::Frame(frame)) => frame,
            Some(ScriptedRead::Fail(message)) => return Err(TwotoneError::frame(message)),
            Some(ScriptedRead::Hang) => std::future::pending().await,
            None => self.fallback(region),
        };

        let (width, height) = frame.dimensions();
        if region.fits_within(width, height) {
            Ok(image::imageops::crop_imm(&frame, region.x, region.y, region.width, region.height).to_image())
        } else {
            // small test frames stand in for the region itself
            Ok(frame)
        }
    }

    fn release(&mut self) {
        if !self.released {
            self.released = true;
            self.state.released.fetch_add(1, Ordering::SeqCst);
        }
    }
}

impl Drop for MockCaptureStream {
    fn drop(&mut self) {
        self.release();
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}
