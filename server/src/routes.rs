//! HTTP routes
//!
//! - `GET /api/list?path=` lists one directory and pre-warms thumbnails for its assets
//! - `GET /api/stats` reports thumbnail generation counters
//! - `GET /thumbs/*` serves a thumbnail, generating it on a miss
//! - `GET /images/*` serves an original asset
//! - anything else is served from the frontend bundle, falling back to `index.html`

use crate::error::ApiError;
use crate::listing::{scan_directory, Listing};
use axum::extract::{Path as UrlPath, Query, Request, State};
use axum::http::{header, HeaderValue, Method};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use std::convert::Infallible;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thumbnail_cache::{safe_path, CacheStats, ThumbnailCache, THUMBNAIL_CONTENT_TYPE};
use tower::ServiceExt;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;
use tracing::debug;

const IMMUTABLE: &str = "public, max-age=31536000, immutable";

#[derive(Clone)]
pub struct AppState {
    pub cache: Arc<ThumbnailCache>,
}

pub fn router(state: AppState, static_dir: &Path) -> Router {
    let frontend = ServeDir::new(static_dir).fallback(ServeFile::new(static_dir.join("index.html")));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/api/list", get(list))
        .route("/api/stats", get(stats))
        .route("/thumbs/", get(empty_path))
        .route("/thumbs/{*path}", get(thumbnail))
        .route("/images/", get(empty_path))
        .route("/images/{*path}", get(original))
        .fallback_service(frontend)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct ListQuery {
    #[serde(default)]
    path: String,
}

async fn list(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Listing>, ApiError> {
    let rel = safe_path(&query.path)?;
    let scan = scan_directory(&state.cache.config().media_root, &rel).await?;

    let scheduled = state.cache.prewarm(scan.assets);
    debug!(dir = %rel.display(), scheduled, "queued thumbnail pre-warm");

    Ok(Json(scan.listing))
}

async fn stats(State(state): State<AppState>) -> Json<CacheStats> {
    Json(state.cache.stats())
}

async fn empty_path() -> ApiError {
    ApiError::EmptyPath
}

async fn thumbnail(
    State(state): State<AppState>,
    UrlPath(path): UrlPath<String>,
    request: Request,
) -> Result<Response, ApiError> {
    let rel = non_empty(&path)?;
    let file = state.cache.thumbnail_for(&rel).await?;

    let mut response = serve_immutable(file, request).await;
    if response.status().is_success() {
        response
            .headers_mut()
            .insert(header::CONTENT_TYPE, HeaderValue::from_static(THUMBNAIL_CONTENT_TYPE));
    }
    Ok(response)
}

async fn original(
    State(state): State<AppState>,
    UrlPath(path): UrlPath<String>,
    request: Request,
) -> Result<Response, ApiError> {
    let rel = non_empty(&path)?;
    let file = state.cache.config().media_root.join(rel);
    Ok(serve_immutable(file, request).await)
}

fn non_empty(path: &str) -> Result<PathBuf, ApiError> {
    let rel = safe_path(path)?;
    if rel.as_os_str().is_empty() {
        return Err(ApiError::EmptyPath);
    }
    Ok(rel)
}

/// Serve a file with far-future caching; range and conditional requests are handled by `ServeFile`
async fn serve_immutable(file: PathBuf, request: Request) -> Response {
    let result: Result<_, Infallible> = ServeFile::new(file).oneshot(request).await;
    let mut response = match result {
        Ok(response) => response.into_response(),
        Err(never) => match never {},
    };
    if response.status().is_success() {
        response
            .headers_mut()
            .insert(header::CACHE_CONTROL, HeaderValue::from_static(IMMUTABLE));
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::StatusCode;
    use image::{GenericImageView, ImageFormat, Rgb, RgbImage};
    use std::fs;
    use std::time::Duration;
    use tempfile::{tempdir, TempDir};
    use thumbnail_cache::ThumbnailConfig;

    struct TestApp {
        dir: TempDir,
        app: Router,
        cache: Arc<ThumbnailCache>,
    }

    impl TestApp {
        fn new() -> anyhow::Result<Self> {
            let dir = tempdir()?;
            let media = dir.path().join("images");
            let static_dir = dir.path().join("static");
            fs::create_dir_all(&media)?;
            fs::create_dir_all(&static_dir)?;
            fs::write(static_dir.join("index.html"), "<html>gallery</html>")?;

            let config = ThumbnailConfig {
                ffmpeg_path: PathBuf::from("/nonexistent/bin/ffmpeg"),
                ..ThumbnailConfig::with_roots(&media, dir.path().join("thumbs"))
            };
            let cache = Arc::new(ThumbnailCache::new(config)?);
            let app = router(AppState { cache: Arc::clone(&cache) }, &static_dir);
            Ok(Self { dir, app, cache })
        }

        fn media(&self, rel: &str) -> PathBuf {
            self.dir.path().join("images").join(rel)
        }

        fn thumb(&self, rel: &str) -> PathBuf {
            self.dir.path().join("thumbs").join(rel)
        }

        fn write_image(&self, rel: &str, width: u32, height: u32) -> anyhow::Result<()> {
            let path = self.media(rel);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            RgbImage::from_pixel(width, height, Rgb([200, 100, 50]))
                .save_with_format(path, ImageFormat::Jpeg)?;
            Ok(())
        }

        async fn get(&self, uri: &str) -> anyhow::Result<Response> {
            let request = axum::http::Request::builder()
                .uri(uri)
                .header(header::ORIGIN, "http://localhost:5173")
                .body(Body::empty())?;
            Ok(self.app.clone().oneshot(request).await?)
        }
    }

    async fn body_bytes(response: Response) -> anyhow::Result<Vec<u8>> {
        Ok(to_bytes(response.into_body(), usize::MAX).await?.to_vec())
    }

    #[tokio::test]
    async fn test_list_directory_and_prewarm() -> anyhow::Result<()> {
        let app = TestApp::new()?;
        app.write_image("a.jpg", 600, 300)?;
        fs::create_dir_all(app.media("b"))?;
        fs::write(app.media(".secret.jpg"), b"x")?;

        let response = app.get("/api/list").await?;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "*"
        );
        let json: serde_json::Value = serde_json::from_slice(&body_bytes(response).await?)?;
        assert_eq!(
            json,
            serde_json::json!({"directories": ["b"], "images": ["a.jpg"], "videos": []})
        );

        // Background generation lands a.webp without any thumbnail request
        let mut ready = false;
        for _ in 0..200 {
            if app.thumb("a.webp").is_file() {
                ready = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(25)).await;
        }
        assert!(ready);
        assert!(!app.thumb("b.webp").exists());
        Ok(())
    }

    #[tokio::test]
    async fn test_list_errors() -> anyhow::Result<()> {
        let app = TestApp::new()?;

        let response = app.get("/api/list?path=../../etc").await?;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = app.get("/api/list?path=/etc").await?;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = app.get("/api/list?path=missing").await?;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        Ok(())
    }

    #[tokio::test]
    async fn test_thumbnail_generated_on_miss() -> anyhow::Result<()> {
        let app = TestApp::new()?;
        app.write_image("trip/photo.JPG", 1200, 800)?;

        let response = app.get("/thumbs/trip/photo.webp").await?;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers().get(header::CONTENT_TYPE).unwrap(), "image/webp");
        assert_eq!(response.headers().get(header::CACHE_CONTROL).unwrap(), IMMUTABLE);

        let thumb = image::load_from_memory(&body_bytes(response).await?)?;
        assert_eq!(thumb.dimensions(), (300, 200));

        // Served from disk the second time
        let response = app.get("/thumbs/trip/photo.webp").await?;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(app.cache.stats().generated, 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_thumbnail_errors() -> anyhow::Result<()> {
        let app = TestApp::new()?;
        fs::write(app.media("broken.png"), b"not a png")?;
        fs::write(app.media("clip.mp4"), b"not a video")?;

        let response = app.get("/thumbs/ghost.webp").await?;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = app.get("/thumbs/%2e%2e/%2e%2e/etc/passwd.webp").await?;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = app.get("/thumbs/").await?;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = app.get("/thumbs/broken.webp").await?;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!app.thumb("broken.webp").exists());

        // No ffmpeg available: typed extraction failure, not a crash
        let response = app.get("/thumbs/clip.webp").await?;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        Ok(())
    }

    #[tokio::test]
    async fn test_original_served_immutable() -> anyhow::Result<()> {
        let app = TestApp::new()?;
        app.write_image("a.jpg", 10, 10)?;

        let response = app.get("/images/a.jpg").await?;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers().get(header::CACHE_CONTROL).unwrap(), IMMUTABLE);
        assert_eq!(body_bytes(response).await?, fs::read(app.media("a.jpg"))?);

        let response = app.get("/images/missing.jpg").await?;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(response.headers().get(header::CACHE_CONTROL).is_none());

        let response = app.get("/images/").await?;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        Ok(())
    }

    #[tokio::test]
    async fn test_frontend_fallback() -> anyhow::Result<()> {
        let app = TestApp::new()?;

        let response = app.get("/albums/2024").await?;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_bytes(response).await?, b"<html>gallery</html>");
        Ok(())
    }

    #[tokio::test]
    async fn test_stats_endpoint() -> anyhow::Result<()> {
        let app = TestApp::new()?;

        let response = app.get("/api/stats").await?;
        assert_eq!(response.status(), StatusCode::OK);
        let json: serde_json::Value = serde_json::from_slice(&body_bytes(response).await?)?;
        assert_eq!(json["generated"], 0);
        assert_eq!(json["background_capacity"], 4);
        Ok(())
    }
}
