//! Server configuration: defaults, then an optional TOML file, then flags and env vars

use anyhow::{Context, Result};
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use thumbnail_cache::ThumbnailConfig;

#[derive(Debug, Parser)]
#[command(name = "gallery-server", version, about = "Serve a directory of images and videos with cached thumbnails")]
pub struct Args {
    /// TOML configuration file
    #[arg(long, env = "GALLERY_CONFIG")]
    pub config: Option<PathBuf>,

    /// Address to listen on
    #[arg(long, env = "GALLERY_LISTEN")]
    pub listen: Option<SocketAddr>,

    /// Directory holding the source images and videos
    #[arg(long, env = "GALLERY_MEDIA_ROOT")]
    pub media_root: Option<PathBuf>,

    /// Directory where thumbnails are cached
    #[arg(long, env = "GALLERY_THUMB_ROOT")]
    pub thumb_root: Option<PathBuf>,

    /// Directory holding the frontend bundle
    #[arg(long, env = "GALLERY_STATIC_DIR")]
    pub static_dir: Option<PathBuf>,

    /// Maximum concurrent background thumbnail generations
    #[arg(long, env = "GALLERY_WORKERS")]
    pub workers: Option<usize>,

    #[arg(long, env = "GALLERY_FFMPEG")]
    pub ffmpeg: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen: SocketAddr,
    pub static_dir: PathBuf,
    pub thumbnails: ThumbnailConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: SocketAddr::from(([0, 0, 0, 0], 9000)),
            static_dir: PathBuf::from("./static"),
            thumbnails: ThumbnailConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn load(args: &Args) -> Result<Self> {
        let mut config = match &args.config {
            Some(path) => {
                let text = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read config file: {}", path.display()))?;
                Self::from_toml(&text)
                    .with_context(|| format!("Invalid config file: {}", path.display()))?
            }
            None => Self::default(),
        };
        config.apply_args(args);
        Ok(config)
    }

    fn from_toml(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    fn apply_args(&mut self, args: &Args) {
        if let Some(listen) = args.listen {
            self.listen = listen;
        }
        if let Some(static_dir) = &args.static_dir {
            self.static_dir = static_dir.clone();
        }
        if let Some(media_root) = &args.media_root {
            self.thumbnails.media_root = media_root.clone();
        }
        if let Some(thumb_root) = &args.thumb_root {
            self.thumbnails.thumb_root = thumb_root.clone();
        }
        if let Some(workers) = args.workers {
            self.thumbnails.background_workers = workers;
        }
        if let Some(ffmpeg) = &args.ffmpeg {
            self.thumbnails.ffmpeg_path = ffmpeg.clone();
        }
    }
}
