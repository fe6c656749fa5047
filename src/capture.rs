//! Capture capability consumed by the sampling loop.
//!
//! Acquiring the underlying video or display stream is not this crate's
//! job; it only needs two operations from whoever provides it:
//!
//! - [`CaptureSource::acquire`] - open the stream once per monitoring session
//! - [`CaptureStream::read_region`] - read the pixels of a region, once per tick
//!
//! [`FileCaptureSource`] is the provider used by the CLI. It treats an image
//! file that an external screenshot tool keeps overwriting as the stream.

use crate::error::{IntoTwotoneError, Result, TwotoneError};
use crate::vision::CaptureRegion;
use async_trait::async_trait;
use image::RgbaImage;
use std::path::PathBuf;
use tracing::debug;

/// Something that can open a capture stream.
#[async_trait]
pub trait CaptureSource: Send + Sync {
    /// Opens the stream.
    ///
    /// # Errors
    ///
    /// Returns [`TwotoneError::CaptureUnavailable`] if no stream can be opened.
    async fn acquire(&self) -> Result<Box<dyn CaptureStream>>;
}

/// An open capture stream. Read-only from the sampler's point of view.
#[async_trait]
pub trait CaptureStream: Send + Sync {
    /// Reads the current pixels inside `region`, clipped to it.
    ///
    /// # Errors
    ///
    /// Returns a transient error if this particular frame cannot be read.
    async fn read_region(&self, region: CaptureRegion) -> Result<RgbaImage>;

    /// Releases the underlying resource. Called exactly once per stream.
    fn release(&mut self);
}

/// Uses an image file on disk as the display stream.
#[derive(Debug, Clone)]
pub struct FileCaptureSource {
    path: PathBuf,
}

impl FileCaptureSource {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl CaptureSource for FileCaptureSource {
    async fn acquire(&self) -> Result<Box<dyn CaptureStream>> {
        if !self.path.exists() {
            return Err(TwotoneError::capture_unavailable(format!(
                "frame file not found: {}",
                self.path.display()
            )));
        }

        // one decode up front so a file that is not an image fails here,
        // not on every tick
        let (width, height) = decode(self.path.clone())
            .await
            .map(|frame| frame.dimensions())
            .into_capture_error()?;
        debug!(path = %self.path.display(), width, height, "Capture stream acquired");

        Ok(Box::new(FileCaptureStream {
            path: self.path.clone(),
            released: false,
        }))
    }
}

/// Stream handle returned by [`FileCaptureSource`].
#[derive(Debug)]
pub struct FileCaptureStream {
    path: PathBuf,
    released: bool,
}

#[async_trait]
impl CaptureStream for FileCaptureStream {
    async fn read_region(&self, region: CaptureRegion) -> Result<RgbaImage> {
        if self.released {
            return Err(TwotoneError::frame("capture stream already released"));
        }

        let frame = decode(self.path.clone()).await.into_frame_error()?;
        let (width, height) = frame.dimensions();
        if !region.fits_within(width, height) {
            return Err(TwotoneError::frame(format!(
                "region {} exceeds frame {}x{}",
                region, width, height
            )));
        }

        Ok(image::imageops::crop_imm(&frame, region.x, region.y, region.width, region.height).to_image())
    }

    fn release(&mut self) {
        if !self.released {
            self.released = true;
            debug!(path = %self.path.display(), "Capture stream released");
        }
    }
}

impl Drop for FileCaptureStream {
    fn drop(&mut self) {
        self.release();
    }
}

/// Decodes an image file off the async runtime.
async fn decode(path: PathBuf) -> anyhow::Result<RgbaImage> {
    let frame = tokio::task::spawn_blocking(move || image::open(&path))
        .await
        .map_err(|e| anyhow::anyhow!("decode task failed: {}", e))??;
    Ok(frame.to_rgba8())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixtures::{solid_halves, BLUE, PURPLE};
    use tempfile::TempDir;

    fn write_frame(dir: &TempDir, name: &str, frame: &RgbaImage) -> PathBuf {
        let path = dir.path().join(name);
        frame.save(&path).expect("write frame");
        path
    }

    #[tokio::test]
    async fn test_acquire_missing_file_is_unavailable() {
        let temp = TempDir::new().unwrap();
        let source = FileCaptureSource::new(temp.path().join("nope.png"));
        let err = source.acquire().await.err().expect("should fail");
        assert!(matches!(err, TwotoneError::CaptureUnavailable { .. }));
    }

    #[tokio::test]
    async fn test_acquire_rejects_non_image() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("frame.png");
        std::fs::write(&path, b"definitely not a png").unwrap();

        let err = FileCaptureSource::new(&path).acquire().await.err().unwrap();
        assert!(matches!(err, TwotoneError::CaptureUnavailable { .. }));
    }

    #[tokio::test]
    async fn test_read_region_crops() {
        let temp = TempDir::new().unwrap();
        let path = write_frame(&temp, "frame.png", &solid_halves(200, 100, BLUE, PURPLE));

        let stream = FileCaptureSource::new(&path).acquire().await.unwrap();
        let region = CaptureRegion::new(60, 10, 80, 60).unwrap();
        let raster = stream.read_region(region).await.unwrap();

        assert_eq!(raster.dimensions(), (80, 60));
        assert_eq!(raster.get_pixel(0, 0).0[..3], BLUE);
        assert_eq!(raster.get_pixel(79, 59).0[..3], PURPLE);
    }

    #[tokio::test]
    async fn test_read_picks_up_rewritten_file() {
        let temp = TempDir::new().unwrap();
        let path = write_frame(&temp, "frame.png", &solid_halves(120, 80, BLUE, BLUE));
        let stream = FileCaptureSource::new(&path).acquire().await.unwrap();
        let region = CaptureRegion::new(0, 0, 120, 80).unwrap();

        write_frame(&temp, "frame.png", &solid_halves(120, 80, PURPLE, PURPLE));
        let raster = stream.read_region(region).await.unwrap();
        assert_eq!(raster.get_pixel(0, 0).0[..3], PURPLE);
    }

    #[tokio::test]
    async fn test_read_region_out_of_bounds_is_transient() {
        let temp = TempDir::new().unwrap();
        let path = write_frame(&temp, "frame.png", &solid_halves(100, 100, BLUE, BLUE));
        let stream = FileCaptureSource::new(&path).acquire().await.unwrap();

        let err = stream
            .read_region(CaptureRegion::new(80, 0, 60, 60).unwrap())
            .await
            .unwrap_err();
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn test_read_after_release_fails() {
        let temp = TempDir::new().unwrap();
        let path = write_frame(&temp, "frame.png", &solid_halves(100, 100, BLUE, BLUE));
        let mut stream = FileCaptureSource::new(&path).acquire().await.unwrap();
        stream.release();

        let err = stream
            .read_region(CaptureRegion::new(0, 0, 60, 60).unwrap())
            .await
            .unwrap_err();
        assert!(err.is_transient());
    }
}
