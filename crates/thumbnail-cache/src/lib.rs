//! Lazy thumbnail generation and disk caching for a media gallery
//!
//! This crate guarantees that a WebP thumbnail exists on disk for any image or video
//! under a media root. Thumbnails are produced either on the request path when a visitor
//! asks for one that is missing, or ahead of time by background pre-warming after a
//! directory listing.
//!
//! # Features
//!
//! - **Mirrored layout**: the thumbnail tree mirrors the media tree, `a/b.jpg` -> `a/b.webp`
//! - **Deduplicated work**: a per-artifact lock plus a re-check under the lock means each
//!   thumbnail is rendered at most once, however many callers race for it
//! - **Bounded background load**: pre-warming runs behind a fixed-size semaphore, while
//!   request-path generation bypasses it
//! - **Video support**: a single frame is pulled through a pluggable [`FrameExtractor`],
//!   ffmpeg by default, under a hard deadline
//! - **Atomic writes**: artifacts are persisted from a temp file, so a failed generation
//!   never leaves a partial thumbnail behind

pub mod admission;
pub mod cache;
pub mod error;
pub mod extract;
pub mod generate;
pub mod locks;
pub mod paths;

pub use admission::AdmissionController;
pub use cache::{CacheStats, GenerationStatus, ThumbnailCache};
pub use error::{Result, ThumbnailError};
pub use extract::{FfmpegExtractor, FrameExtractor};
pub use generate::{generate_image_thumbnail, thumbnail_dimensions};
pub use locks::LockRegistry;
pub use paths::{safe_path, MediaKind, THUMBNAIL_CONTENT_TYPE, THUMBNAIL_EXTENSION};

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Configuration for thumbnail generation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThumbnailConfig {
    /// Root of the source tree
    pub media_root: PathBuf,
    /// Root of the thumbnail tree
    pub thumb_root: PathBuf,
    pub target_width: u32,
    pub image_quality: u8,
    pub video_quality: u8,
    /// Number of background generations allowed to run at once
    pub background_workers: usize,
    /// Where in a video to grab the frame from
    pub frame_offset_secs: f64,
    pub extract_timeout_secs: u64,
    pub ffmpeg_path: PathBuf,
}

impl Default for ThumbnailConfig {
    fn default() -> Self {
        Self {
            media_root: PathBuf::from("./images"),
            thumb_root: PathBuf::from("./thumbs"),
            target_width: 300,
            image_quality: 80,
            video_quality: 75,
            background_workers: 4,
            frame_offset_secs: 1.0,
            extract_timeout_secs: 30,
            ffmpeg_path: PathBuf::from("ffmpeg"),
        }
    }
}

impl ThumbnailConfig {
    /// Config rooted at the given media and thumbnail directories, defaults elsewhere
    pub fn with_roots(media_root: impl Into<PathBuf>, thumb_root: impl Into<PathBuf>) -> Self {
        Self {
            media_root: media_root.into(),
            thumb_root: thumb_root.into(),
            ..Self::default()
        }
    }

    pub fn frame_offset(&self) -> Duration {
        Duration::try_from_secs_f64(self.frame_offset_secs).unwrap_or(Duration::ZERO)
    }

    pub fn extract_timeout(&self) -> Duration {
        Duration::from_secs(self.extract_timeout_secs.max(1))
    }
}
