//! Saving framebuffers to image files.

use std::path::Path;

use image::{DynamicImage, ImageFormat, RgbaImage};

/// Saves an image, choosing the format from the file extension.
///
/// Supports `.png`, `.jpg` and `.jpeg`. JPEG output drops the alpha channel.
pub fn save_image(path: impl AsRef<Path>, image: &RgbaImage) -> Result<(), ScreenshotError> {
    let path = path.as_ref();
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();

    match extension.as_str() {
        "png" => image.save_with_format(path, ImageFormat::Png)?,
        "jpg" | "jpeg" => {
            let rgb = DynamicImage::ImageRgba8(image.clone()).to_rgb8();
            rgb.save_with_format(path, ImageFormat::Jpeg)?;
        }
        _ => return Err(ScreenshotError::UnsupportedFormat(extension)),
    }
    log::info!("saved {}", path.display());
    Ok(())
}

/// Encodes an image as PNG in memory.
pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>, ScreenshotError> {
    if image.width() == 0 || image.height() == 0 {
        return Err(ScreenshotError::InvalidImageData);
    }
    let mut buffer = std::io::Cursor::new(Vec::new());
    image.write_to(&mut buffer, ImageFormat::Png)?;
    Ok(buffer.into_inner())
}

/// Error type for screenshot operations.
#[derive(Debug, thiserror::Error)]
pub enum ScreenshotError {
    #[error("Failed to save image: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Image encoding error: {0}")]
    ImageError(#[from] image::ImageError),

    #[error("Unsupported image format: {0}")]
    UnsupportedFormat(String),

    #[error("Invalid image data")]
    InvalidImageData,
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn test_encode_png_signature() {
        let image = RgbaImage::from_pixel(3, 2, Rgba([1, 2, 3, 255]));
        let bytes = encode_png(&image).unwrap();
        assert_eq!(&bytes[..8], b"\x89PNG\r\n\x1a\n");
    }

    #[test]
    fn test_unsupported_extension() {
        let image = RgbaImage::new(1, 1);
        let path = std::env::temp_dir().join("volscope_snapshot.bmpx");
        assert!(matches!(
            save_image(&path, &image),
            Err(ScreenshotError::UnsupportedFormat(ext)) if ext == "bmpx"
        ));
    }

    #[test]
    fn test_save_png_round_trip() {
        let image = RgbaImage::from_pixel(4, 4, Rgba([10, 20, 30, 255]));
        let path = std::env::temp_dir().join(format!("volscope_{}.png", std::process::id()));
        save_image(&path, &image).unwrap();
        let loaded = image::open(&path).unwrap().to_rgba8();
        assert_eq!(loaded, image);
        let _ = std::fs::remove_file(&path);
    }
}
