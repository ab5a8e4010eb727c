//! Utility functions for loading and saving images.

use crate::core::{RectifyError, RectifyResult};
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, RgbImage};
use std::path::Path;

/// JPEG quality used for corrected images.
pub const JPEG_QUALITY: u8 = 95;

/// Converts a DynamicImage to an RgbImage.
pub fn dynamic_to_rgb(img: DynamicImage) -> RgbImage {
    img.to_rgb8()
}

/// Loads an image from a file path and converts it to RgbImage.
///
/// # Errors
///
/// Returns [`RectifyError::ImageDecode`] if the file cannot be opened or
/// decoded as an image.
pub fn load_image(path: &Path) -> RectifyResult<RgbImage> {
    let img = image::open(path).map_err(|e| RectifyError::image_decode(path, e))?;
    Ok(dynamic_to_rgb(img))
}

/// Encodes an image as JPEG with the given quality into memory.
pub fn encode_jpeg(image: &RgbImage, quality: u8) -> RectifyResult<Vec<u8>> {
    let mut buffer = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut buffer, quality);
    encoder.encode_image(image)?;
    Ok(buffer)
}

/// Saves an image as JPEG without ever leaving a partial file at `path`.
///
/// The image is encoded in memory, written to a hidden sibling file and then
/// renamed over the destination.
pub fn save_jpeg(image: &RgbImage, path: &Path, quality: u8) -> RectifyResult<()> {
    let bytes = encode_jpeg(image, quality)?;

    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| {
            RectifyError::invalid_input(format!("invalid output path: {}", path.display()))
        })?;
    let staging = path.with_file_name(format!(".{file_name}.partial"));

    if let Err(e) = std::fs::write(&staging, &bytes) {
        let _ = std::fs::remove_file(&staging);
        return Err(e.into());
    }
    if let Err(e) = std::fs::rename(&staging, path) {
        let _ = std::fs::remove_file(&staging);
        return Err(e.into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_load_image_reports_decode_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.jpg");
        std::fs::write(&path, b"not an image").unwrap();

        let err = load_image(&path).unwrap_err();
        assert!(matches!(err, RectifyError::ImageDecode { .. }));
    }

    #[test]
    fn test_save_jpeg_writes_only_destination() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.jpg");
        let img = RgbImage::from_pixel(8, 6, Rgb([10, 200, 30]));

        save_jpeg(&img, &path, JPEG_QUALITY).unwrap();

        let entries: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(entries.len(), 1);
        assert_eq!(image::guess_format(&std::fs::read(&path).unwrap()).unwrap(), image::ImageFormat::Jpeg);
        assert_eq!(load_image(&path).unwrap().dimensions(), (8, 6));
    }

    #[test]
    fn test_save_jpeg_into_missing_directory_fails_cleanly() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("out.jpg");
        let img = RgbImage::new(2, 2);

        assert!(save_jpeg(&img, &path, JPEG_QUALITY).is_err());
        assert!(!path.exists());
    }

    #[test]
    fn test_quality_changes_encoded_size() {
        let img = RgbImage::from_fn(32, 32, |x, y| Rgb([(x * 8) as u8, (y * 8) as u8, 77]));
        let low = encode_jpeg(&img, 10).unwrap();
        let high = encode_jpeg(&img, JPEG_QUALITY).unwrap();
        assert!(high.len() > low.len());
    }
}
