//! Cache manager that guarantees thumbnails exist on disk
//!
//! [`ThumbnailCache::ensure`] is the single entry point for generation. It checks for
//! the artifact, takes the per-artifact lock, checks again and only then runs the
//! pipeline. Request handlers call it directly; directory listings hand their entries to
//! [`ThumbnailCache::prewarm`], which runs the same path in detached tasks behind the
//! admission gate.

use crate::admission::AdmissionController;
use crate::error::{Result, ThumbnailError};
use crate::extract::{FfmpegExtractor, FrameExtractor};
use crate::generate::{generate_image_thumbnail, thumbnail_from_frame};
use crate::locks::LockRegistry;
use crate::paths::{artifact_path_for, ensure_relative, is_thumbnail_name, resolve_source, MediaKind};
use crate::ThumbnailConfig;
use serde::Serialize;
use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, instrument, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationStatus {
    /// This call rendered and wrote the thumbnail
    Generated,
    /// The thumbnail was already on disk
    AlreadyPresent,
}

/// Main thumbnail cache manager
pub struct ThumbnailCache {
    config: ThumbnailConfig,
    extractor: Arc<dyn FrameExtractor>,
    locks: LockRegistry,
    admission: AdmissionController,
    generated: AtomicU64,
    skipped: AtomicU64,
    failed: AtomicU64,
}

impl ThumbnailCache {
    /// Create a cache that extracts video frames with ffmpeg
    pub fn new(config: ThumbnailConfig) -> Result<Self> {
        let extractor = FfmpegExtractor::new(config.ffmpeg_path.clone(), config.extract_timeout());
        Self::with_extractor(config, Arc::new(extractor))
    }

    /// Create a cache with a custom frame extractor
    pub fn with_extractor(config: ThumbnailConfig, extractor: Arc<dyn FrameExtractor>) -> Result<Self> {
        std::fs::create_dir_all(&config.thumb_root)
            .map_err(|e| ThumbnailError::io(&config.thumb_root, e))?;

        Ok(Self {
            admission: AdmissionController::new(config.background_workers),
            config,
            extractor,
            locks: LockRegistry::new(),
            generated: AtomicU64::new(0),
            skipped: AtomicU64::new(0),
            failed: AtomicU64::new(0),
        })
    }

    pub fn config(&self) -> &ThumbnailConfig {
        &self.config
    }

    /// Absolute path of the thumbnail for a relative source path
    pub fn artifact_path(&self, source_rel: &Path) -> PathBuf {
        self.config.thumb_root.join(artifact_path_for(source_rel))
    }

    /// Make sure the thumbnail for `source_rel` exists on disk, generating it if needed.
    ///
    /// Concurrent calls for the same source collapse: the first caller through the lock
    /// renders, the rest find the finished file on the re-check. Failures are not
    /// remembered, so the next call makes a fresh attempt.
    #[instrument(skip(self, source_rel), fields(source = %source_rel.display()))]
    pub async fn ensure(&self, source_rel: &Path) -> Result<GenerationStatus> {
        ensure_relative(source_rel)?;
        let kind = MediaKind::from_path(source_rel)
            .ok_or_else(|| ThumbnailError::UnsupportedMedia(source_rel.to_path_buf()))?;
        let artifact = self.artifact_path(source_rel);

        if is_file(&artifact).await {
            self.skipped.fetch_add(1, Ordering::Relaxed);
            return Ok(GenerationStatus::AlreadyPresent);
        }

        let _guard = self.locks.acquire(&artifact).await;

        if is_file(&artifact).await {
            debug!("thumbnail appeared while waiting for lock");
            self.skipped.fetch_add(1, Ordering::Relaxed);
            return Ok(GenerationStatus::AlreadyPresent);
        }

        let started = Instant::now();
        match self.generate(source_rel, kind, &artifact).await {
            Ok(()) => {
                self.generated.fetch_add(1, Ordering::Relaxed);
                info!(
                    thumb = %artifact.display(),
                    %kind,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "generated thumbnail"
                );
                Ok(GenerationStatus::Generated)
            }
            Err(e) => {
                self.failed.fetch_add(1, Ordering::Relaxed);
                Err(e)
            }
        }
    }

    /// Resolve a requested thumbnail path to a file on disk, generating it on a miss.
    ///
    /// This is the request path: it never waits on the background admission gate.
    pub async fn thumbnail_for(&self, thumb_rel: &Path) -> Result<PathBuf> {
        ensure_relative(thumb_rel)?;
        if !is_thumbnail_name(thumb_rel) {
            return Err(ThumbnailError::SourceNotFound(thumb_rel.to_path_buf()));
        }
        let cached = self.config.thumb_root.join(thumb_rel);
        if is_file(&cached).await {
            return Ok(cached);
        }

        let source_rel = resolve_source(&self.config.media_root, thumb_rel).await?;
        if let Err(e) = self.ensure(&source_rel).await {
            error!(source = %source_rel.display(), error = %e, "thumbnail generation failed");
            return Err(e);
        }
        Ok(self.artifact_path(&source_rel))
    }

    /// Queue background generation for each relative source path.
    ///
    /// Each source gets its own detached task, so one failure or panic cannot affect
    /// the others or the caller. Returns immediately with the number of tasks spawned.
    /// Must be called from within a tokio runtime.
    pub fn prewarm<I>(self: &Arc<Self>, sources: I) -> usize
    where
        I: IntoIterator<Item = PathBuf>,
    {
        let mut scheduled = 0;
        for source_rel in sources {
            let cache = Arc::clone(self);
            tokio::spawn(async move { cache.prewarm_one(&source_rel).await });
            scheduled += 1;
        }
        scheduled
    }

    async fn prewarm_one(&self, source_rel: &Path) {
        // Cached assets should not occupy an admission slot
        if is_file(&self.artifact_path(source_rel)).await {
            self.skipped.fetch_add(1, Ordering::Relaxed);
            return;
        }

        let _permit = self.admission.admit().await;
        if let Err(e) = self.ensure(source_rel).await {
            warn!(source = %source_rel.display(), error = %e, "background thumbnail generation failed");
        }
    }

    async fn generate(&self, source_rel: &Path, kind: MediaKind, artifact: &Path) -> Result<()> {
        if let Some(parent) = artifact.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| ThumbnailError::io(parent, e))?;
        }

        let source = self.config.media_root.join(source_rel);
        let width = self.config.target_width;

        let bytes = match kind {
            MediaKind::Image => {
                let quality = self.config.image_quality;
                let task_source = source.clone();
                tokio::task::spawn_blocking(move || {
                    generate_image_thumbnail(&task_source, width, quality)
                })
                .await
                .map_err(|e| task_failed(&source, e))??
            }
            MediaKind::Video => {
                let frame = self
                    .extractor
                    .extract_frame(&source, self.config.frame_offset(), width)
                    .await?;
                let quality = self.config.video_quality;
                let task_source = source.clone();
                tokio::task::spawn_blocking(move || {
                    thumbnail_from_frame(&frame, &task_source, width, quality)
                })
                .await
                .map_err(|e| task_failed(&source, e))??
            }
        };

        let target = artifact.to_path_buf();
        tokio::task::spawn_blocking(move || write_artifact(&target, &bytes))
            .await
            .map_err(|e| task_failed(&source, e))?
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            generated: self.generated.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            lock_entries: self.locks.len(),
            background_capacity: self.admission.capacity(),
            background_available: self.admission.available(),
        }
    }
}

impl fmt::Debug for ThumbnailCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThumbnailCache")
            .field("config", &self.config)
            .field("stats", &self.stats())
            .finish()
    }
}

/// Generation counters for monitoring and debugging
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub generated: u64,
    pub skipped: u64,
    pub failed: u64,
    pub lock_entries: usize,
    pub background_capacity: usize,
    pub background_available: usize,
}

async fn is_file(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|meta| meta.is_file())
        .unwrap_or(false)
}

/// Write through a temp file in the target directory and rename into place.
/// On any failure the temp file is removed when it drops.
fn write_artifact(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut tmp = tempfile::Builder::new()
        .prefix(".thumb-")
        .suffix(".tmp")
        .tempfile_in(dir)
        .map_err(|e| ThumbnailError::io(dir, e))?;

    tmp.write_all(bytes).map_err(|e| ThumbnailError::io(tmp.path(), e))?;
    tmp.persist(path)
        .map_err(|e| ThumbnailError::io(path, e.error))?;
    Ok(())
}

fn task_failed(source: &Path, e: tokio::task::JoinError) -> ThumbnailError {
    ThumbnailError::Encode {
        path: source.to_path_buf(),
        reason: format!("thumbnail task failed: {e}"),
    }
}
