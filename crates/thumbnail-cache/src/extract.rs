//! Video frame extraction
//!
//! Decoding video is delegated to a [`FrameExtractor`]. The default implementation
//! shells out to ffmpeg, grabs a single frame scaled to the thumbnail width and pipes it
//! back as PNG. Every invocation runs under a hard deadline; a hung ffmpeg process is
//! killed when the deadline passes.

use crate::error::{Result, ThumbnailError};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

/// Source of a single representative frame for a video asset
#[async_trait]
pub trait FrameExtractor: Send + Sync {
    /// Extract one frame at `offset` (or the first frame if the video is shorter),
    /// scaled to `target_width` with proportional height. Returns encoded image bytes
    /// in any format the `image` crate can decode.
    async fn extract_frame(&self, source: &Path, offset: Duration, target_width: u32) -> Result<Vec<u8>>;
}

/// [`FrameExtractor`] backed by an ffmpeg subprocess
#[derive(Debug, Clone)]
pub struct FfmpegExtractor {
    ffmpeg_path: PathBuf,
    timeout: Duration,
}

impl FfmpegExtractor {
    pub fn new(ffmpeg_path: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            ffmpeg_path: ffmpeg_path.into(),
            timeout,
        }
    }

    async fn run(&self, source: &Path, offset: Option<Duration>, target_width: u32) -> Result<Vec<u8>> {
        let mut cmd = Command::new(&self.ffmpeg_path);
        cmd.arg("-hide_banner")
            .arg("-loglevel")
            .arg("error")
            .arg("-nostdin");
        if let Some(offset) = offset {
            cmd.arg("-ss").arg(format!("{:.3}", offset.as_secs_f64()));
        }
        cmd.arg("-i")
            .arg(source)
            .arg("-frames:v")
            .arg("1")
            .arg("-vf")
            .arg(format!("scale={target_width}:-1"))
            .arg("-f")
            .arg("image2pipe")
            .arg("-c:v")
            .arg("png")
            .arg("-")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = tokio::time::timeout(self.timeout, cmd.output())
            .await
            .map_err(|_| self.failure(source, format!("ffmpeg timed out after {:?}", self.timeout)))?
            .map_err(|e| {
                self.failure(
                    source,
                    format!("failed to run {}: {e}", self.ffmpeg_path.display()),
                )
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(self.failure(
                source,
                format!("ffmpeg exited with {}: {}", output.status, stderr.trim()),
            ));
        }

        Ok(output.stdout)
    }

    fn failure(&self, source: &Path, reason: String) -> ThumbnailError {
        ThumbnailError::Extraction {
            path: source.to_path_buf(),
            reason,
        }
    }
}

#[async_trait]
impl FrameExtractor for FfmpegExtractor {
    async fn extract_frame(&self, source: &Path, offset: Duration, target_width: u32) -> Result<Vec<u8>> {
        let mut frame = self.run(source, Some(offset).filter(|o| !o.is_zero()), target_width).await?;

        // Seeking past the end of a short clip succeeds with no output
        if frame.is_empty() && !offset.is_zero() {
            debug!(path = %source.display(), "no frame at offset, retrying from start");
            frame = self.run(source, None, target_width).await?;
        }

        if frame.is_empty() {
            return Err(self.failure(source, "ffmpeg produced no frame".to_string()));
        }
        Ok(frame)
    }
}
