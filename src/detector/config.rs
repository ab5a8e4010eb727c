//! Configuration for the distortion detector.

use crate::core::{ComputeTarget, OrtSessionConfig, RectifyResult};
use crate::processors::{IMAGENET_MEAN, IMAGENET_STD, NormalizeImage};
use serde::{Deserialize, Serialize};

/// Settings of a [`DistortionDetector`](super::DistortionDetector).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Feature encoder model file name.
    pub encoder_file: String,
    /// Distortion classifier model file name.
    pub classifier_file: String,
    /// Parameter encoder model file name. Loaded only if present.
    pub param_file: Option<String>,
    /// Network input `(width, height)`.
    pub input_size: (u32, u32),
    /// Per-channel mean applied after scaling to `[0, 1]`.
    pub mean: [f32; 3],
    /// Per-channel standard deviation applied after scaling to `[0, 1]`.
    pub std: [f32; 3],
    /// Compute target for the ONNX sessions.
    pub target: ComputeTarget,
    /// ONNX Runtime session settings.
    pub ort_session: OrtSessionConfig,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            encoder_file: "model_en.onnx".to_string(),
            classifier_file: "model_class.onnx".to_string(),
            param_file: Some("model_param.onnx".to_string()),
            input_size: (256, 256),
            mean: IMAGENET_MEAN,
            std: IMAGENET_STD,
            target: ComputeTarget::Auto,
            ort_session: OrtSessionConfig::default(),
        }
    }
}

impl DetectorConfig {
    /// Creates the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the compute target.
    pub fn with_target(mut self, target: ComputeTarget) -> Self {
        self.target = target;
        self
    }

    /// Sets the network input size.
    pub fn with_input_size(mut self, width: u32, height: u32) -> Self {
        self.input_size = (width, height);
        self
    }

    /// Sets or clears the parameter encoder file name.
    pub fn with_param_file(mut self, file: Option<String>) -> Self {
        self.param_file = file;
        self
    }

    /// Sets the ONNX Runtime session configuration.
    pub fn with_ort_session(mut self, config: OrtSessionConfig) -> Self {
        self.ort_session = config;
        self
    }

    /// Builds the image normalizer for this configuration.
    pub fn normalizer(&self) -> RectifyResult<NormalizeImage> {
        NormalizeImage::new(1.0 / 255.0, self.mean, self.std)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_normalizer_is_imagenet() {
        let normalizer = DetectorConfig::default().normalizer().unwrap();
        let imagenet = NormalizeImage::imagenet();
        for c in 0..3 {
            assert!((normalizer.alpha[c] - imagenet.alpha[c]).abs() < 1e-6);
            assert!((normalizer.beta[c] - imagenet.beta[c]).abs() < 1e-6);
        }
    }

    #[test]
    fn test_zero_std_is_rejected() {
        let config = DetectorConfig {
            std: [0.2, 0.0, 0.2],
            ..DetectorConfig::default()
        };
        assert!(config.normalizer().is_err());
    }
}
