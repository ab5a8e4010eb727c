//! End-to-end distortion correction.

use super::bundle::preprocess;
use super::config::CorrectorConfig;
use super::postprocess::postprocess;
use super::stage::{StageInput, StageValue, run_stage};
use crate::artifacts::{ArtifactLoader, ArtifactSet};
use crate::core::{RectifyResult, Stage};
use crate::utils::save_jpeg;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};

/// Kind and shape of one stage's output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageSummary {
    /// Stage that produced the output.
    pub stage: Stage,
    /// `"array"` or `"tensor"`.
    pub kind: &'static str,
    /// Output shape.
    pub shape: Vec<usize>,
}

impl StageSummary {
    fn of(stage: Stage, value: &StageValue) -> Self {
        Self {
            stage,
            kind: value.kind_name(),
            shape: value.shape().to_vec(),
        }
    }
}

/// Outcome of a successful correction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorrectionReport {
    /// Where the corrected image was written.
    pub output_path: PathBuf,
    /// Size of the input and output image.
    pub original_size: (u32, u32),
    /// Encoder, classifier and decoder outputs, in that order.
    pub stages: Vec<StageSummary>,
}

/// Three-stage blind distortion corrector.
#[derive(Debug)]
pub struct DistortionCorrector {
    artifacts: ArtifactSet,
    config: CorrectorConfig,
}

impl DistortionCorrector {
    /// Loads the encoder, decoder and classifier artifacts from `model_dir`.
    pub fn new(model_dir: impl AsRef<Path>, config: CorrectorConfig) -> RectifyResult<Self> {
        config.validate()?;
        let target = config.target.resolve();
        let loader = ArtifactLoader::new(config.ort_session.clone(), target);
        info!(dir = %model_dir.as_ref().display(), %target, "loading artifacts");
        let artifacts = ArtifactSet::load_from_dir(model_dir, &config.files, &loader, &target)?;
        Ok(Self { artifacts, config })
    }

    /// Builds a corrector around artifacts that are already loaded.
    pub fn from_artifacts(artifacts: ArtifactSet, config: CorrectorConfig) -> RectifyResult<Self> {
        config.validate()?;
        Ok(Self { artifacts, config })
    }

    /// The loaded artifacts.
    pub fn artifacts(&self) -> &ArtifactSet {
        &self.artifacts
    }

    /// The active configuration.
    pub fn config(&self) -> &CorrectorConfig {
        &self.config
    }

    /// Corrects the image at `input_path` and writes a JPEG to `output_path`.
    ///
    /// Nothing is written unless every step succeeds.
    pub fn try_correct_distortion(
        &self,
        input_path: impl AsRef<Path>,
        output_path: impl AsRef<Path>,
    ) -> RectifyResult<CorrectionReport> {
        let input_path = input_path.as_ref();
        let output_path = output_path.as_ref();

        let bundle = preprocess(input_path, self.config.tensor_size)?;
        debug!(
            size = ?bundle.original_size,
            vector = ?bundle.vector.dim(),
            tensor = ?bundle.tensor.shape(),
            "preprocessed image"
        );

        let features = run_stage(Stage::Encode, &self.artifacts.encoder, StageInput::Image(&bundle))?;
        info!(kind = features.kind_name(), shape = ?features.shape(), "encoded features");

        let params = run_stage(
            Stage::Classify,
            &self.artifacts.classifier,
            StageInput::Value(&features),
        )?;
        info!(kind = params.kind_name(), shape = ?params.shape(), "classified distortion");

        let corrected = run_stage(
            Stage::Decode,
            &self.artifacts.decoder,
            StageInput::Decode {
                features: &features,
                params: &params,
            },
        )?;
        info!(kind = corrected.kind_name(), shape = ?corrected.shape(), "decoded image");

        let image = postprocess(&corrected, bundle.original_size);
        save_jpeg(&image, output_path, self.config.jpeg_quality)?;
        info!(output = %output_path.display(), "saved corrected image");

        Ok(CorrectionReport {
            output_path: output_path.to_path_buf(),
            original_size: bundle.original_size,
            stages: vec![
                StageSummary::of(Stage::Encode, &features),
                StageSummary::of(Stage::Classify, &params),
                StageSummary::of(Stage::Decode, &corrected),
            ],
        })
    }

    /// Corrects an image, logging any failure instead of returning it.
    ///
    /// Returns `None` when no output was written.
    pub fn correct_distortion(
        &self,
        input_path: impl AsRef<Path>,
        output_path: impl AsRef<Path>,
    ) -> Option<CorrectionReport> {
        let input_path = input_path.as_ref();
        match self.try_correct_distortion(input_path, output_path) {
            Ok(report) => Some(report),
            Err(e) => {
                error!(input = %input_path.display(), error = %e.chain(), "distortion correction failed");
                None
            }
        }
    }
}
