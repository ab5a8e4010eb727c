//! Model artifacts of the correction pipeline.
//!
//! Each artifact is loaded once into an [`Artifact`], a closed set of calling
//! conventions chosen by format probing:
//!
//! - [`Artifact::Estimator`]: predict-style, `(samples, features)` in, array out
//! - [`Artifact::Module`]: forward-style, tensor in, tensor out
//! - [`Artifact::Opaque`]: a best-effort callable

pub mod estimator;
pub mod loader;
pub mod module;
pub mod opaque;

pub use estimator::{EstimatorArtifact, EstimatorMode, EstimatorSpec};
pub use loader::{ArtifactFormat, ArtifactLoader, probe_format};
pub use module::ModuleArtifact;
pub use opaque::{CallableArtifact, FnCallable, UnsupportedPayload};

use crate::core::{ComputeTarget, RectifyResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use tracing::{debug, info};

/// Calling convention of a loaded artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    /// Predict-style estimator.
    Estimator,
    /// Forward-style network.
    Module,
    /// Plain callable.
    Opaque,
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArtifactKind::Estimator => write!(f, "estimator"),
            ArtifactKind::Module => write!(f, "module"),
            ArtifactKind::Opaque => write!(f, "opaque"),
        }
    }
}

/// A loaded model artifact.
#[derive(Debug)]
pub enum Artifact {
    /// Predict-style estimator.
    Estimator(EstimatorArtifact),
    /// Forward-style network.
    Module(ModuleArtifact),
    /// Plain callable.
    Opaque(Box<dyn CallableArtifact>),
}

/// Capabilities that were applied when preparing an artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Preparation {
    /// The artifact is in evaluation mode.
    pub eval: bool,
    /// The artifact now runs on the requested compute target.
    pub migrated: bool,
}

impl Artifact {
    /// Returns the calling convention of this artifact.
    pub fn kind(&self) -> ArtifactKind {
        match self {
            Artifact::Estimator(_) => ArtifactKind::Estimator,
            Artifact::Module(_) => ArtifactKind::Module,
            Artifact::Opaque(_) => ArtifactKind::Opaque,
        }
    }

    /// Short description for logs.
    pub fn describe(&self) -> String {
        match self {
            Artifact::Estimator(e) => format!("estimator:{}", e.name()),
            Artifact::Module(m) => m.describe(),
            Artifact::Opaque(c) => c.describe(),
        }
    }

    /// Puts the artifact into evaluation mode and moves it onto `target`,
    /// for whichever of those capabilities it supports.
    pub fn prepare(&mut self, target: &ComputeTarget) -> RectifyResult<Preparation> {
        let prep = match self {
            Artifact::Estimator(_) => Preparation::default(),
            Artifact::Module(m) => Preparation {
                eval: true,
                migrated: m.migrate(target)?,
            },
            Artifact::Opaque(c) => Preparation {
                eval: c.eval(),
                migrated: c.migrate(target)?,
            },
        };
        if !prep.eval {
            debug!(artifact = %self.describe(), "no evaluation mode, skipping");
        }
        if !prep.migrated {
            debug!(artifact = %self.describe(), %target, "no device placement, skipping");
        }
        Ok(prep)
    }
}

/// File names of the three pipeline artifacts inside a model directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArtifactFiles {
    /// Encoder file name.
    pub encoder: String,
    /// Decoder file name.
    pub decoder: String,
    /// Classifier file name.
    pub classifier: String,
}

impl Default for ArtifactFiles {
    fn default() -> Self {
        Self {
            encoder: "model_en.pkl".to_string(),
            decoder: "model_de.pkl".to_string(),
            classifier: "model_class.pkl".to_string(),
        }
    }
}

/// The encoder, classifier and decoder of a correction pipeline.
#[derive(Debug)]
pub struct ArtifactSet {
    /// Feature extractor.
    pub encoder: Artifact,
    /// Distortion classifier.
    pub classifier: Artifact,
    /// Image reconstructor.
    pub decoder: Artifact,
}

impl ArtifactSet {
    /// Loads and prepares all three artifacts from `dir`.
    ///
    /// Files are loaded in the order encoder, decoder, classifier; the first
    /// missing or unreadable file aborts the load.
    pub fn load_from_dir(
        dir: impl AsRef<Path>,
        files: &ArtifactFiles,
        loader: &ArtifactLoader,
        target: &ComputeTarget,
    ) -> RectifyResult<Self> {
        let dir = dir.as_ref();
        let mut encoder = loader.load(&dir.join(&files.encoder))?;
        let mut decoder = loader.load(&dir.join(&files.decoder))?;
        let mut classifier = loader.load(&dir.join(&files.classifier))?;

        for (role, artifact) in [
            ("encoder", &mut encoder),
            ("decoder", &mut decoder),
            ("classifier", &mut classifier),
        ] {
            artifact.prepare(target)?;
            info!(role, kind = %artifact.kind(), artifact = %artifact.describe(), "loaded artifact");
        }

        Ok(Self {
            encoder,
            classifier,
            decoder,
        })
    }

    /// Assembles a set from already loaded artifacts.
    pub fn new(encoder: Artifact, classifier: Artifact, decoder: Artifact) -> Self {
        Self {
            encoder,
            classifier,
            decoder,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::RectifyError;

    const REGRESSOR: &[u8] = br#"{"estimator": "linear_regression", "coef": [[1.0]]}"#;

    fn write_all(dir: &Path, files: &ArtifactFiles, skip: Option<&str>) {
        for name in [&files.encoder, &files.decoder, &files.classifier] {
            if Some(name.as_str()) != skip {
                std::fs::write(dir.join(name), REGRESSOR).unwrap();
            }
        }
    }

    #[test]
    fn test_load_from_dir_reports_missing_classifier() {
        let dir = tempfile::tempdir().unwrap();
        let files = ArtifactFiles::default();
        write_all(dir.path(), &files, Some("model_class.pkl"));

        let err = ArtifactSet::load_from_dir(
            dir.path(),
            &files,
            &ArtifactLoader::default(),
            &ComputeTarget::Cpu,
        )
        .unwrap_err();
        match err {
            RectifyError::ArtifactNotFound { path } => {
                assert_eq!(path.file_name().unwrap(), "model_class.pkl")
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_load_from_dir_with_custom_names() {
        let dir = tempfile::tempdir().unwrap();
        let files = ArtifactFiles {
            encoder: "enc.json".into(),
            decoder: "dec.json".into(),
            classifier: "cls.json".into(),
        };
        write_all(dir.path(), &files, None);

        let set = ArtifactSet::load_from_dir(
            dir.path(),
            &files,
            &ArtifactLoader::default(),
            &ComputeTarget::Cpu,
        )
        .unwrap();
        assert_eq!(set.encoder.kind(), ArtifactKind::Estimator);
        assert_eq!(set.decoder.kind(), ArtifactKind::Estimator);
        assert_eq!(set.classifier.kind(), ArtifactKind::Estimator);
    }

    #[derive(Debug)]
    struct Placeable;

    impl CallableArtifact for Placeable {
        fn call(&self, input: &crate::core::TensorD) -> RectifyResult<crate::core::TensorD> {
            Ok(input.clone())
        }

        fn describe(&self) -> String {
            "placeable".into()
        }

        fn migrate(&mut self, _target: &ComputeTarget) -> RectifyResult<bool> {
            Ok(true)
        }
    }

    #[test]
    fn test_prepare_applies_only_supported_capabilities() {
        let mut opaque = Artifact::Opaque(Box::new(Placeable));
        let prep = opaque.prepare(&ComputeTarget::Cuda { device_id: 1 }).unwrap();
        assert_eq!(
            prep,
            Preparation {
                eval: false,
                migrated: true
            }
        );

        let mut estimator =
            Artifact::Estimator(EstimatorArtifact::from_json("e", REGRESSOR).unwrap());
        assert_eq!(
            estimator.prepare(&ComputeTarget::Cpu).unwrap(),
            Preparation::default()
        );
    }
}
