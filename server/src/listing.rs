//! One-level directory listing of the media tree

use crate::error::ApiError;
use serde::Serialize;
use std::io;
use std::path::{Path, PathBuf};
use thumbnail_cache::MediaKind;
use tracing::{debug, warn};

/// JSON body of `GET /api/list`
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct Listing {
    pub directories: Vec<String>,
    pub images: Vec<String>,
    pub videos: Vec<String>,
}

/// A listing plus the relative paths of the assets in it, for pre-warming
#[derive(Debug, Default)]
pub struct Scan {
    pub listing: Listing,
    pub assets: Vec<PathBuf>,
}

/// List the entries of `media_root/rel`. Dot-prefixed entries and files that are
/// neither images nor videos are skipped. Names are sorted.
pub async fn scan_directory(media_root: &Path, rel: &Path) -> Result<Scan, ApiError> {
    let dir = media_root.join(rel);
    let read_error = |source: io::Error| ApiError::ReadDirectory {
        path: dir.clone(),
        source,
    };

    match tokio::fs::metadata(&dir).await {
        Ok(meta) if meta.is_dir() => {}
        Ok(_) => return Err(ApiError::DirectoryNotFound(rel.to_path_buf())),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(ApiError::DirectoryNotFound(rel.to_path_buf()))
        }
        Err(e) => return Err(read_error(e)),
    }

    let mut entries = tokio::fs::read_dir(&dir).await.map_err(read_error)?;
    let mut scan = Scan::default();

    while let Some(entry) = entries.next_entry().await.map_err(read_error)? {
        let file_name = entry.file_name();
        let Some(name) = file_name.to_str() else {
            debug!(entry = ?file_name, "skipping non UTF-8 entry");
            continue;
        };
        if name.starts_with('.') {
            continue;
        }

        let file_type = match entry.file_type().await {
            Ok(file_type) => file_type,
            Err(e) => {
                warn!(entry = %entry.path().display(), error = %e, "failed to stat entry");
                continue;
            }
        };
        if file_type.is_dir() {
            scan.listing.directories.push(name.to_string());
            continue;
        }

        match MediaKind::from_path(Path::new(name)) {
            Some(MediaKind::Image) => scan.listing.images.push(name.to_string()),
            Some(MediaKind::Video) => scan.listing.videos.push(name.to_string()),
            None => continue,
        }
        scan.assets.push(rel.join(name));
    }

    scan.listing.directories.sort();
    scan.listing.images.sort();
    scan.listing.videos.sort();
    scan.assets.sort();
    Ok(scan)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_scan_classifies_entries() -> anyhow::Result<()> {
        let root = tempdir()?;
        fs::write(root.path().join("a.jpg"), b"x")?;
        fs::write(root.path().join("Clip.MP4"), b"x")?;
        fs::write(root.path().join("notes.txt"), b"x")?;
        fs::write(root.path().join(".hidden.png"), b"x")?;
        fs::create_dir(root.path().join("b"))?;
        fs::create_dir(root.path().join(".cache"))?;

        let scan = scan_directory(root.path(), Path::new("")).await?;
        assert_eq!(
            scan.listing,
            Listing {
                directories: vec!["b".to_string()],
                images: vec!["a.jpg".to_string()],
                videos: vec!["Clip.MP4".to_string()],
            }
        );
        // Directories are never scheduled for generation
        assert_eq!(scan.assets, vec![PathBuf::from("Clip.MP4"), PathBuf::from("a.jpg")]);
        Ok(())
    }

    #[tokio::test]
    async fn test_scan_nested_paths_are_relative() -> anyhow::Result<()> {
        let root = tempdir()?;
        fs::create_dir_all(root.path().join("2024/summer"))?;
        fs::write(root.path().join("2024/summer/lake.png"), b"x")?;

        let scan = scan_directory(root.path(), Path::new("2024/summer")).await?;
        assert_eq!(scan.assets, vec![PathBuf::from("2024/summer/lake.png")]);
        Ok(())
    }

    #[tokio::test]
    async fn test_scan_missing_or_file() -> anyhow::Result<()> {
        let root = tempdir()?;
        fs::write(root.path().join("a.jpg"), b"x")?;

        let missing = scan_directory(root.path(), Path::new("nope")).await.unwrap_err();
        assert!(matches!(missing, ApiError::DirectoryNotFound(_)));
        let file = scan_directory(root.path(), Path::new("a.jpg")).await.unwrap_err();
        assert!(matches!(file, ApiError::DirectoryNotFound(_)));
        Ok(())
    }

    #[tokio::test]
    async fn test_empty_directory_has_empty_arrays() -> anyhow::Result<()> {
        let root = tempdir()?;
        let scan = scan_directory(root.path(), Path::new("")).await?;
        let json = serde_json::to_value(&scan.listing)?;
        assert_eq!(json, serde_json::json!({"directories": [], "images": [], "videos": []}));
        Ok(())
    }
}
