//! Configuration for the distortion correction pipeline.

use crate::artifacts::ArtifactFiles;
use crate::core::{ComputeTarget, OrtSessionConfig, RectifyError, RectifyResult};
use crate::utils::JPEG_QUALITY;
use serde::{Deserialize, Serialize};

/// Settings of a [`DistortionCorrector`](super::DistortionCorrector).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorrectorConfig {
    /// Artifact file names inside the model directory.
    pub files: ArtifactFiles,
    /// Width and height of the tensor view fed to forward-style artifacts.
    pub tensor_size: (u32, u32),
    /// Compute target artifacts are placed on.
    pub target: ComputeTarget,
    /// ONNX Runtime session settings for module artifacts.
    pub ort_session: OrtSessionConfig,
    /// JPEG quality of the corrected image.
    pub jpeg_quality: u8,
}

impl Default for CorrectorConfig {
    fn default() -> Self {
        Self {
            files: ArtifactFiles::default(),
            tensor_size: (256, 256),
            target: ComputeTarget::default(),
            ort_session: OrtSessionConfig::default(),
            jpeg_quality: JPEG_QUALITY,
        }
    }
}

impl CorrectorConfig {
    /// Creates the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the artifact file names.
    pub fn with_files(mut self, files: ArtifactFiles) -> Self {
        self.files = files;
        self
    }

    /// Sets the tensor view size.
    pub fn with_tensor_size(mut self, width: u32, height: u32) -> Self {
        self.tensor_size = (width, height);
        self
    }

    /// Sets the compute target.
    pub fn with_target(mut self, target: ComputeTarget) -> Self {
        self.target = target;
        self
    }

    /// Sets the ONNX Runtime session configuration.
    pub fn with_ort_session(mut self, config: OrtSessionConfig) -> Self {
        self.ort_session = config;
        self
    }

    /// Sets the JPEG quality.
    pub fn with_jpeg_quality(mut self, quality: u8) -> Self {
        self.jpeg_quality = quality;
        self
    }

    /// Checks that sizes and quality are usable.
    pub fn validate(&self) -> RectifyResult<()> {
        let (w, h) = self.tensor_size;
        if w == 0 || h == 0 {
            return Err(RectifyError::config_error(format!(
                "tensor size must be non-zero, got {w}x{h}"
            )));
        }
        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(RectifyError::config_error(format!(
                "JPEG quality must be within 1..=100, got {}",
                self.jpeg_quality
            )));
        }
        Ok(())
    }
}
