use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use std::io;
use std::path::PathBuf;
use thiserror::Error;
use thumbnail_cache::ThumbnailError;

/// Errors surfaced to HTTP clients
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Thumbnail(#[from] ThumbnailError),

    #[error("empty path")]
    EmptyPath,

    #[error("directory not found: {}", .0.display())]
    DirectoryNotFound(PathBuf),

    #[error("failed to read directory {}: {source}", path.display())]
    ReadDirectory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Thumbnail(ThumbnailError::InvalidPath { .. }) | ApiError::EmptyPath => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Thumbnail(ThumbnailError::SourceNotFound(_)) | ApiError::DirectoryNotFound(_) => {
                StatusCode::NOT_FOUND
            }
            ApiError::Thumbnail(_) | ApiError::ReadDirectory { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Client-facing message; internal details stay in the logs
    fn message(&self) -> &'static str {
        match self {
            ApiError::Thumbnail(ThumbnailError::InvalidPath { .. }) | ApiError::EmptyPath => {
                "invalid path"
            }
            ApiError::Thumbnail(ThumbnailError::SourceNotFound(_)) => "source file not found",
            ApiError::Thumbnail(_) => "thumbnail generation failed",
            ApiError::DirectoryNotFound(_) => "directory not found",
            ApiError::ReadDirectory { .. } => "failed to read directory",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), self.message()).into_response()
    }
}
