//! Distortion type detection.
//!
//! [`DistortionDetector`] classifies an image into one of six geometric
//! distortion categories with a fixed encoder/classifier pair of ONNX models,
//! and optionally estimates a scalar distortion parameter with a third model.

pub mod config;
pub mod types;

pub use config::DetectorConfig;
pub use types::{BatchDetectionEntry, DetectionResult, DistortionType};

use crate::core::{InferenceEngine, OrtInfer, RectifyError, RectifyResult, SimpleError, TensorD};
use crate::processors::NormalizeImage;
use crate::utils::{argmax, load_image, softmax};
use image::imageops::{self, FilterType};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Six-way geometric distortion classifier.
#[derive(Debug)]
pub struct DistortionDetector {
    encoder: Box<dyn InferenceEngine>,
    classifier: Box<dyn InferenceEngine>,
    param_encoder: Option<Box<dyn InferenceEngine>>,
    normalizer: NormalizeImage,
    input_size: (u32, u32),
}

impl DistortionDetector {
    /// Assembles a detector from already constructed engines.
    pub fn new(
        encoder: Box<dyn InferenceEngine>,
        classifier: Box<dyn InferenceEngine>,
        param_encoder: Option<Box<dyn InferenceEngine>>,
        config: &DetectorConfig,
    ) -> RectifyResult<Self> {
        let (w, h) = config.input_size;
        if w == 0 || h == 0 {
            return Err(RectifyError::config_error(format!(
                "input size must be non-zero, got {w}x{h}"
            )));
        }
        Ok(Self {
            encoder,
            classifier,
            param_encoder,
            normalizer: config.normalizer()?,
            input_size: config.input_size,
        })
    }

    /// Loads the encoder, classifier and (if present) parameter encoder from
    /// `model_dir`.
    ///
    /// # Errors
    ///
    /// Returns [`RectifyError::ArtifactNotFound`] if the encoder or classifier
    /// file is missing.
    pub fn from_dir(model_dir: impl AsRef<Path>, config: &DetectorConfig) -> RectifyResult<Self> {
        let dir = model_dir.as_ref();
        let target = config.target.resolve();
        let load = |file: &str| -> RectifyResult<OrtInfer> {
            let path = dir.join(file);
            if !path.is_file() {
                return Err(RectifyError::artifact_not_found(path));
            }
            OrtInfer::from_file(&path, &config.ort_session, target)
        };

        let encoder = load(&config.encoder_file)?;
        let classifier = load(&config.classifier_file)?;
        let param_encoder = match &config.param_file {
            Some(file) if dir.join(file).is_file() => Some(load(file)?),
            Some(file) => {
                warn!(file = %dir.join(file).display(), "parameter encoder not found, parameter estimation disabled");
                None
            }
            None => None,
        };

        info!(
            encoder = %encoder.engine_info(),
            classifier = %classifier.engine_info(),
            param_encoder = param_encoder.is_some(),
            "loaded distortion detector"
        );

        Self::new(
            Box::new(encoder),
            Box::new(classifier),
            param_encoder.map(|e| Box::new(e) as Box<dyn InferenceEngine>),
            config,
        )
    }

    /// Whether [`estimate_parameters`](Self::estimate_parameters) is available.
    pub fn has_param_encoder(&self) -> bool {
        self.param_encoder.is_some()
    }

    fn preprocess(&self, image_path: &Path) -> RectifyResult<TensorD> {
        let image = load_image(image_path)?;
        let (w, h) = self.input_size;
        let resized = imageops::resize(&image, w, h, FilterType::Triangle);
        Ok(self.normalizer.normalize_to(&resized).into_dyn())
    }

    /// Classifies the distortion in the image at `image_path`.
    ///
    /// With `return_probabilities`, the probability of every category is
    /// included in the result.
    pub fn detect_distortion(
        &self,
        image_path: impl AsRef<Path>,
        return_probabilities: bool,
    ) -> RectifyResult<DetectionResult> {
        let x = self.preprocess(image_path.as_ref())?;
        let features = self.encoder.infer(&[&x])?;
        let logits = self.classifier.infer(&[&features])?;

        if logits.len() != DistortionType::ALL.len() {
            return Err(RectifyError::inference(
                "classifier",
                "classify distortion",
                SimpleError::new(format!(
                    "expected {} logits, got shape {:?}",
                    DistortionType::ALL.len(),
                    logits.shape()
                )),
            ));
        }

        let logits: Vec<f32> = logits.iter().copied().collect();
        let probabilities = softmax(&logits);
        let index = argmax(&probabilities).unwrap_or(0);
        let distortion_type = DistortionType::from_index(index).unwrap_or(DistortionType::Barrel);
        let confidence = probabilities[index];
        debug!(%distortion_type, confidence, "classified distortion");

        Ok(DetectionResult {
            distortion_type,
            confidence,
            predicted_class_index: index,
            all_probabilities: return_probabilities.then(|| {
                DistortionType::ALL
                    .into_iter()
                    .zip(probabilities.iter().copied())
                    .collect()
            }),
        })
    }

    /// Estimates the scalar distortion parameter of the image.
    ///
    /// The parameter encoder does not condition on `distortion_type`; it is
    /// accepted so callers can pass the detected category through.
    pub fn estimate_parameters(
        &self,
        image_path: impl AsRef<Path>,
        distortion_type: DistortionType,
    ) -> RectifyResult<f32> {
        let engine = self.param_encoder.as_ref().ok_or_else(|| {
            RectifyError::config_error("no parameter encoder loaded")
        })?;
        let x = self.preprocess(image_path.as_ref())?;
        let output = engine.infer(&[&x])?;

        match output.iter().next() {
            Some(&value) if output.len() == 1 => {
                debug!(%distortion_type, value, "estimated distortion parameter");
                Ok(value)
            }
            _ => Err(RectifyError::inference(
                "param_encoder",
                "estimate parameters",
                SimpleError::new(format!(
                    "expected a single value, got shape {:?}",
                    output.shape()
                )),
            )),
        }
    }

    /// Runs [`detect_distortion`](Self::detect_distortion) on every path.
    ///
    /// Failures are recorded per entry and never stop the batch.
    pub fn batch_detect<P: AsRef<Path>>(
        &self,
        image_paths: &[P],
        return_probabilities: bool,
    ) -> Vec<BatchDetectionEntry> {
        image_paths
            .iter()
            .map(|path| {
                let path = path.as_ref();
                let outcome = self.detect_distortion(path, return_probabilities);
                if let Err(e) = &outcome {
                    warn!(image = %path.display(), error = %e, "detection failed");
                }
                BatchDetectionEntry {
                    image_path: PathBuf::from(path),
                    outcome,
                }
            })
            .collect()
    }
}
