//! Path validation and the mapping between source assets and thumbnail artifacts
//!
//! Source assets live under the media root and thumbnails under the thumbnail root.
//! The thumbnail tree mirrors the source tree path-for-path, with each file renamed to
//! the `.webp` extension. Reversing that mapping requires probing the media root for
//! every known extension in a fixed priority order.

use crate::error::{Result, ThumbnailError};
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::path::{Component, Path, PathBuf};

/// Image extensions in probe priority order
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp"];

/// Video extensions in probe priority order, probed after all image extensions
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mov", "mkv", "webm"];

pub const THUMBNAIL_EXTENSION: &str = "webp";

pub const THUMBNAIL_CONTENT_TYPE: &str = "image/webp";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    /// Classify a file by its extension, ignoring case
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
            Some(MediaKind::Image)
        } else if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
            Some(MediaKind::Video)
        } else {
            None
        }
    }
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MediaKind::Image => write!(f, "image"),
            MediaKind::Video => write!(f, "video"),
        }
    }
}

/// Validate a caller-supplied relative path and normalize it lexically.
///
/// Absolute paths are rejected, `.` components are dropped and `..` components pop
/// the previous component. A `..` that would climb above the root is rejected. The
/// empty string (or anything normalizing to it) is the root itself, returned as an
/// empty path. No filesystem access happens here.
pub fn safe_path(rel: &str) -> Result<PathBuf> {
    if rel.contains('\0') {
        return Err(ThumbnailError::invalid_path(rel, "embedded NUL byte"));
    }

    let mut cleaned = PathBuf::new();
    for component in Path::new(rel).components() {
        match component {
            Component::Prefix(_) | Component::RootDir => {
                return Err(ThumbnailError::invalid_path(rel, "absolute paths not allowed"));
            }
            Component::CurDir => {}
            Component::ParentDir => {
                if !cleaned.pop() {
                    return Err(ThumbnailError::invalid_path(rel, "path traversal not allowed"));
                }
            }
            Component::Normal(part) => cleaned.push(part),
        }
    }

    Ok(cleaned)
}

/// Reject paths that are not plain relative paths below a root
pub(crate) fn ensure_relative(path: &Path) -> Result<()> {
    let plain = path
        .components()
        .all(|component| matches!(component, Component::Normal(_)));
    if plain && path.file_name().is_some() {
        Ok(())
    } else {
        Err(ThumbnailError::invalid_path(
            &path.to_string_lossy(),
            "expected a relative file path",
        ))
    }
}

/// Relative thumbnail path for a relative source path: `a/b/photo.JPG` -> `a/b/photo.webp`
pub fn artifact_path_for(source_rel: &Path) -> PathBuf {
    source_rel.with_extension(THUMBNAIL_EXTENSION)
}

/// Recover the source asset a thumbnail was derived from.
///
/// Every image extension is tried before any video extension, and for each extension
/// the lower-case spelling is tried before the upper-case one. The first candidate that
/// exists as a file under `media_root` wins, so a directory holding both `photo.jpg` and
/// `photo.png` always resolves `photo.webp` to `photo.jpg`.
pub async fn resolve_source(media_root: &Path, thumb_rel: &Path) -> Result<PathBuf> {
    if !is_thumbnail_name(thumb_rel) {
        return Err(ThumbnailError::SourceNotFound(thumb_rel.to_path_buf()));
    }

    let base = thumb_rel.with_extension("");
    for ext in IMAGE_EXTENSIONS.iter().chain(VIDEO_EXTENSIONS) {
        for spelling in [ext.to_string(), ext.to_ascii_uppercase()] {
            let candidate = with_appended_extension(&base, &spelling);
            match tokio::fs::metadata(media_root.join(&candidate)).await {
                Ok(meta) if meta.is_file() => return Ok(candidate),
                _ => continue,
            }
        }
    }

    Err(ThumbnailError::SourceNotFound(thumb_rel.to_path_buf()))
}

/// True for `.webp` paths with no hidden component. Temp files from in-flight writes
/// (`.thumb-*.tmp`) never qualify.
pub(crate) fn is_thumbnail_name(path: &Path) -> bool {
    let visible = path.components().all(|component| match component {
        Component::Normal(part) => !part.to_string_lossy().starts_with('.'),
        _ => true,
    });
    visible
        && path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case(THUMBNAIL_EXTENSION))
}

/// Appends `.ext` without touching any dot already in the file name.
fn with_appended_extension(base: &Path, ext: &str) -> PathBuf {
    let mut name = OsString::from(base.as_os_str());
    name.push(".");
    name.push(ext);
    PathBuf::from(name)
}
