//! Image preprocessing into the views consumed by pipeline stages.

use crate::core::{RectifyResult, Tensor2D, TensorD};
use crate::processors::NormalizeImage;
use crate::utils::load_image;
use image::imageops::{self, FilterType};
use image::RgbImage;
use ndarray::Array2;
use std::path::Path;

/// A decoded image together with the two views stages are fed.
#[derive(Debug, Clone)]
pub struct ImageBundle {
    /// Decoded RGB pixels at original resolution.
    pub image: RgbImage,
    /// Raw HWC pixel values, `1 x (H * W * 3)`, in 0..=255.
    pub vector: Tensor2D,
    /// Resized, `[0, 1]` scaled `1 x 3 x H' x W'` tensor.
    pub tensor: TensorD,
    /// Original `(width, height)`.
    pub original_size: (u32, u32),
}

impl ImageBundle {
    /// Builds both views of an already decoded image.
    pub fn from_image(image: RgbImage, tensor_size: (u32, u32)) -> RectifyResult<Self> {
        let original_size = image.dimensions();

        let raw: Vec<f32> = image.as_raw().iter().map(|&v| v as f32).collect();
        let vector = Array2::from_shape_vec((1, raw.len()), raw)?;

        let (w, h) = tensor_size;
        let tensor = if original_size == tensor_size {
            NormalizeImage::unit_range().normalize_to(&image)
        } else {
            let resized = imageops::resize(&image, w, h, FilterType::Triangle);
            NormalizeImage::unit_range().normalize_to(&resized)
        };

        Ok(Self {
            image,
            vector,
            tensor: tensor.into_dyn(),
            original_size,
        })
    }
}

/// Decodes the image at `path` and builds its [`ImageBundle`].
///
/// # Errors
///
/// Returns [`RectifyError::ImageDecode`](crate::core::RectifyError::ImageDecode)
/// if the file is not a decodable image.
pub fn preprocess(path: &Path, tensor_size: (u32, u32)) -> RectifyResult<ImageBundle> {
    let image = load_image(path)?;
    ImageBundle::from_image(image, tensor_size)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::RectifyError;
    use image::Rgb;

    #[test]
    fn test_tensor_view_is_resized_and_unit_scaled() {
        let img = RgbImage::from_fn(640, 480, |x, y| Rgb([(x % 256) as u8, (y % 256) as u8, 255]));
        let bundle = ImageBundle::from_image(img, (256, 256)).unwrap();

        assert_eq!(bundle.tensor.shape(), &[1, 3, 256, 256]);
        assert!(bundle.tensor.iter().all(|&v| (0.0..=1.0).contains(&v)));
        assert_eq!(bundle.original_size, (640, 480));
    }

    #[test]
    fn test_vector_view_keeps_raw_hwc_order() {
        let mut img = RgbImage::new(2, 1);
        img.put_pixel(0, 0, Rgb([1, 2, 3]));
        img.put_pixel(1, 0, Rgb([4, 5, 6]));
        let bundle = ImageBundle::from_image(img, (256, 256)).unwrap();

        assert_eq!(bundle.vector.dim(), (1, 6));
        assert_eq!(bundle.vector.row(0).to_vec(), vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn test_preprocess_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("in.png");
        RgbImage::from_pixel(30, 20, Rgb([9, 9, 9])).save(&path).unwrap();

        let bundle = preprocess(&path, (256, 256)).unwrap();
        assert_eq!(bundle.original_size, (30, 20));
        assert_eq!(bundle.vector.ncols(), 30 * 20 * 3);
    }

    #[test]
    fn test_preprocess_rejects_non_images() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("in.jpg");
        std::fs::write(&path, b"plain text").unwrap();

        let err = preprocess(&path, (256, 256)).unwrap_err();
        assert!(matches!(err, RectifyError::ImageDecode { .. }));
    }
}
