//! Error taxonomy for thumbnail resolution and generation

use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ThumbnailError>;

#[derive(Debug, Error)]
pub enum ThumbnailError {
    /// Caller-supplied path was absolute or escaped its root.
    #[error("invalid path {path:?}: {reason}")]
    InvalidPath { path: String, reason: &'static str },

    #[error("no source asset found for thumbnail {}", .0.display())]
    SourceNotFound(PathBuf),

    #[error("not an image or video: {}", .0.display())]
    UnsupportedMedia(PathBuf),

    #[error("failed to decode {}: {reason}", path.display())]
    Decode { path: PathBuf, reason: String },

    #[error("source image {} has zero width", .0.display())]
    DegenerateImage(PathBuf),

    #[error("frame extraction failed for {}: {reason}", path.display())]
    Extraction { path: PathBuf, reason: String },

    #[error("failed to encode thumbnail for {}: {reason}", path.display())]
    Encode { path: PathBuf, reason: String },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl ThumbnailError {
    pub(crate) fn invalid_path(path: &str, reason: &'static str) -> Self {
        ThumbnailError::InvalidPath {
            path: path.to_string(),
            reason,
        }
    }

    pub(crate) fn io(path: &Path, source: io::Error) -> Self {
        ThumbnailError::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    /// True for failures caused by the caller's input rather than by the asset or the host.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ThumbnailError::InvalidPath { .. } | ThumbnailError::SourceNotFound(_)
        )
    }
}
