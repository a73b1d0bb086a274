mod config;
mod error;
mod listing;
mod routes;

use anyhow::{Context, Result};
use clap::Parser;
use config::{Args, ServerConfig};
use routes::AppState;
use std::sync::Arc;
use thumbnail_cache::ThumbnailCache;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServerConfig::load(&args).context("Failed to load configuration")?;
    let thumbs = &config.thumbnails;
    info!(
        media_root = %thumbs.media_root.display(),
        thumb_root = %thumbs.thumb_root.display(),
        static_dir = %config.static_dir.display(),
        target_width = thumbs.target_width,
        background_workers = thumbs.background_workers,
        "configuration in effect"
    );

    let cache = ThumbnailCache::new(thumbs.clone()).with_context(|| {
        format!("Failed to prepare thumbnail directory: {}", thumbs.thumb_root.display())
    })?;
    let app = routes::router(AppState { cache: Arc::new(cache) }, &config.static_dir);

    let listener = tokio::net::TcpListener::bind(config.listen)
        .await
        .with_context(|| format!("Failed to bind {}", config.listen))?;
    info!(addr = %config.listen, "gallery server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("gallery server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
