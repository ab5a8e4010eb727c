//! Image normalization into NCHW tensors.
//!
//! Each channel value `v` is mapped to `v * alpha[c] + beta[c]`, where
//! `alpha = scale / std` and `beta = -mean / std`.

use crate::core::{RectifyError, Tensor4D};
use image::RgbImage;
use serde::{Deserialize, Serialize};

/// ImageNet channel means (RGB order).
pub const IMAGENET_MEAN: [f32; 3] = [0.485, 0.456, 0.406];

/// ImageNet channel standard deviations (RGB order).
pub const IMAGENET_STD: [f32; 3] = [0.229, 0.224, 0.225];

/// Normalizes RGB images into a `1 x 3 x H x W` tensor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizeImage {
    /// Scaling factors for each channel (alpha = scale / std)
    pub alpha: [f32; 3],
    /// Offset values for each channel (beta = -mean / std)
    pub beta: [f32; 3],
}

impl NormalizeImage {
    /// Creates a new NormalizeImage instance with the specified parameters.
    ///
    /// # Errors
    ///
    /// Returns an error if the scale or any standard deviation is not
    /// strictly positive and finite.
    pub fn new(scale: f32, mean: [f32; 3], std: [f32; 3]) -> Result<Self, RectifyError> {
        if !(scale.is_finite() && scale > 0.0) {
            return Err(RectifyError::config_error(format!(
                "Scale must be greater than 0, got {scale}"
            )));
        }
        for (i, &s) in std.iter().enumerate() {
            if !(s.is_finite() && s > 0.0) {
                return Err(RectifyError::config_error(format!(
                    "Standard deviation at index {i} must be greater than 0, got {s}"
                )));
            }
        }

        let alpha = [scale / std[0], scale / std[1], scale / std[2]];
        let beta = [-mean[0] / std[0], -mean[1] / std[1], -mean[2] / std[2]];
        Ok(Self { alpha, beta })
    }

    /// Scales 8-bit values into [0, 1] without a mean shift.
    pub fn unit_range() -> Self {
        Self {
            alpha: [1.0 / 255.0; 3],
            beta: [0.0; 3],
        }
    }

    /// Scales into [0, 1] then applies ImageNet mean/std normalization.
    pub fn imagenet() -> Self {
        let alpha = [
            1.0 / (255.0 * IMAGENET_STD[0]),
            1.0 / (255.0 * IMAGENET_STD[1]),
            1.0 / (255.0 * IMAGENET_STD[2]),
        ];
        let beta = [
            -IMAGENET_MEAN[0] / IMAGENET_STD[0],
            -IMAGENET_MEAN[1] / IMAGENET_STD[1],
            -IMAGENET_MEAN[2] / IMAGENET_STD[2],
        ];
        Self { alpha, beta }
    }

    /// Normalizes a single image and returns it as a 4D tensor with a batch
    /// dimension of one.
    pub fn normalize_to(&self, img: &RgbImage) -> Tensor4D {
        let (width, height) = img.dimensions();
        Tensor4D::from_shape_fn(
            (1, 3, height as usize, width as usize),
            |(_, c, y, x)| {
                let value = img.get_pixel(x as u32, y as u32)[c] as f32;
                value * self.alpha[c] + self.beta[c]
            },
        )
    }
}

impl Default for NormalizeImage {
    fn default() -> Self {
        Self::unit_range()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_unit_range_maps_to_zero_one() {
        let mut img = RgbImage::new(2, 1);
        img.put_pixel(0, 0, Rgb([0, 128, 255]));
        img.put_pixel(1, 0, Rgb([255, 255, 255]));

        let tensor = NormalizeImage::unit_range().normalize_to(&img);
        assert_eq!(tensor.shape(), &[1, 3, 1, 2]);
        assert_eq!(tensor[[0, 0, 0, 0]], 0.0);
        assert!((tensor[[0, 1, 0, 0]] - 128.0 / 255.0).abs() < 1e-6);
        assert!((tensor[[0, 2, 0, 0]] - 1.0).abs() < 1e-6);
        assert!(tensor.iter().all(|&v| (0.0..=1.0).contains(&v)));
    }

    #[test]
    fn test_imagenet_matches_explicit_constructor() {
        let explicit = NormalizeImage::new(1.0 / 255.0, IMAGENET_MEAN, IMAGENET_STD).unwrap();
        let preset = NormalizeImage::imagenet();
        for c in 0..3 {
            assert!((explicit.alpha[c] - preset.alpha[c]).abs() < 1e-6);
            assert!((explicit.beta[c] - preset.beta[c]).abs() < 1e-6);
        }
    }

    #[test]
    fn test_rejects_invalid_parameters() {
        assert!(NormalizeImage::new(0.0, [0.0; 3], [1.0; 3]).is_err());
        assert!(NormalizeImage::new(1.0, [0.0; 3], [1.0, 0.0, 1.0]).is_err());
    }
}
