//! Thumbnail rendering pipeline
//!
//! Pure functions that turn a decoded picture into thumbnail bytes: decode, scale to a
//! fixed width with proportional height using Catmull-Rom resampling, then encode as
//! lossy WebP. Still images are decoded from disk; video frames arrive as encoded bytes
//! from a [`FrameExtractor`](crate::extract::FrameExtractor).

use crate::error::{Result, ThumbnailError};
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, ImageReader};
use std::io::Cursor;
use std::path::Path;

/// Compute the thumbnail size for a `width` x `height` source scaled to `target_width`.
///
/// Height is `round(height * target_width / width)`, never less than one pixel.
/// Returns `None` for a zero-width source.
pub fn thumbnail_dimensions(width: u32, height: u32, target_width: u32) -> Option<(u32, u32)> {
    if width == 0 {
        return None;
    }
    let (w, h, t) = (width as u64, height as u64, target_width as u64);
    let scaled = ((h * t + w / 2) / w).clamp(1, u32::MAX as u64);
    Some((target_width, scaled as u32))
}

/// Decode the still image at `source` and render its thumbnail
pub fn generate_image_thumbnail(source: &Path, target_width: u32, quality: u8) -> Result<Vec<u8>> {
    let img = ImageReader::open(source)
        .map_err(|e| ThumbnailError::io(source, e))?
        .with_guessed_format()
        .map_err(|e| ThumbnailError::io(source, e))?
        .decode()
        .map_err(|e| ThumbnailError::Decode {
            path: source.to_path_buf(),
            reason: e.to_string(),
        })?;

    render_thumbnail(&img, source, target_width, quality)
}

/// Render a thumbnail from an encoded video frame produced by a frame extractor
pub fn thumbnail_from_frame(
    frame: &[u8],
    source: &Path,
    target_width: u32,
    quality: u8,
) -> Result<Vec<u8>> {
    let img = ImageReader::new(Cursor::new(frame))
        .with_guessed_format()
        .map_err(|e| ThumbnailError::io(source, e))?
        .decode()
        .map_err(|e| ThumbnailError::Extraction {
            path: source.to_path_buf(),
            reason: format!("extracted frame is not a decodable image: {e}"),
        })?;

    render_thumbnail(&img, source, target_width, quality)
}

/// Scale `img` to `target_width` and encode it as WebP
pub fn render_thumbnail(
    img: &DynamicImage,
    source: &Path,
    target_width: u32,
    quality: u8,
) -> Result<Vec<u8>> {
    let (width, height) = img.dimensions();
    let (dst_w, dst_h) = thumbnail_dimensions(width, height, target_width)
        .ok_or_else(|| ThumbnailError::DegenerateImage(source.to_path_buf()))?;

    let resized = img.resize_exact(dst_w, dst_h, FilterType::CatmullRom);

    encode_webp(&resized, quality).map_err(|reason| ThumbnailError::Encode {
        path: source.to_path_buf(),
        reason,
    })
}

/// Encode as lossy WebP at `quality` (0-100)
fn encode_webp(img: &DynamicImage, quality: u8) -> std::result::Result<Vec<u8>, String> {
    // The encoder only accepts 8-bit RGB and RGBA buffers
    let converted;
    let img = match img {
        DynamicImage::ImageRgb8(_) | DynamicImage::ImageRgba8(_) => img,
        other if other.color().has_alpha() => {
            converted = DynamicImage::ImageRgba8(other.to_rgba8());
            &converted
        }
        other => {
            converted = DynamicImage::ImageRgb8(other.to_rgb8());
            &converted
        }
    };

    let encoder = webp::Encoder::from_image(img).map_err(|e| e.to_string())?;
    let memory = encoder
        .encode_simple(false, quality.min(100) as f32)
        .map_err(|e| format!("{e:?}"))?;

    if memory.is_empty() {
        return Err("encoder produced no data".to_string());
    }
    Ok(memory.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgb, RgbImage};
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_dimensions_preserve_aspect() {
        assert_eq!(thumbnail_dimensions(1000, 800, 300), Some((300, 240)));
        assert_eq!(thumbnail_dimensions(4000, 3000, 300), Some((300, 225)));
        // 1080 * 300 / 1920 = 168.75
        assert_eq!(thumbnail_dimensions(1920, 1080, 300), Some((300, 169)));
        // Smaller sources are scaled up to the target width
        assert_eq!(thumbnail_dimensions(100, 50, 300), Some((300, 150)));
    }

    #[test]
    fn test_dimensions_round_half_up() {
        // 3 * 300 / 200 = 4.5
        assert_eq!(thumbnail_dimensions(200, 3, 300), Some((300, 5)));
        // 1 * 300 / 700 = 0.43, floored at one pixel
        assert_eq!(thumbnail_dimensions(700, 1, 300), Some((300, 1)));
        assert_eq!(thumbnail_dimensions(10_000, 1, 300), Some((300, 1)));
        assert_eq!(thumbnail_dimensions(10, 0, 300), Some((300, 1)));
    }

    #[test]
    fn test_dimensions_zero_width() {
        assert_eq!(thumbnail_dimensions(0, 100, 300), None);
    }

    #[test]
    fn test_image_thumbnail_is_webp_at_target_size() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let source = dir.path().join("gradient.png");
        let img = RgbImage::from_fn(640, 427, |x, y| Rgb([(x % 256) as u8, (y % 256) as u8, 90]));
        img.save_with_format(&source, ImageFormat::Png)?;

        let bytes = generate_image_thumbnail(&source, 300, 80)?;
        assert_eq!(image::guess_format(&bytes)?, ImageFormat::WebP);

        let thumb = image::load_from_memory(&bytes)?;
        // 427 * 300 / 640 = 200.16
        assert_eq!(thumb.dimensions(), (300, 200));
        Ok(())
    }

    #[test]
    fn test_grayscale_source_is_converted() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let source = dir.path().join("gray.jpg");
        DynamicImage::new_luma8(60, 30).save_with_format(&source, ImageFormat::Jpeg)?;

        let thumb = image::load_from_memory(&generate_image_thumbnail(&source, 300, 80)?)?;
        assert_eq!(thumb.dimensions(), (300, 150));
        Ok(())
    }

    #[test]
    fn test_corrupt_image_is_decode_error() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let source = dir.path().join("broken.jpg");
        fs::write(&source, b"definitely not a jpeg")?;

        let err = generate_image_thumbnail(&source, 300, 80).unwrap_err();
        assert!(matches!(err, ThumbnailError::Decode { .. }), "got {err:?}");
        Ok(())
    }

    #[test]
    fn test_zero_width_is_degenerate() {
        let img = DynamicImage::new_rgb8(0, 10);
        let err = render_thumbnail(&img, Path::new("empty.png"), 300, 80).unwrap_err();
        assert!(matches!(err, ThumbnailError::DegenerateImage(_)));
    }

    #[test]
    fn test_garbage_frame_is_extraction_error() {
        let err = thumbnail_from_frame(b"\x00\x01\x02", Path::new("clip.mp4"), 300, 75).unwrap_err();
        assert!(matches!(err, ThumbnailError::Extraction { .. }));
    }
}
