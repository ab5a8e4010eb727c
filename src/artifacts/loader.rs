//! Artifact loading and format probing.
//!
//! The calling convention of an artifact is decided once, here, by looking at
//! the leading bytes of the file. After that the pipeline dispatches on the
//! [`Artifact`] variant and never probes again.

use super::estimator::EstimatorArtifact;
use super::module::ModuleArtifact;
use super::opaque::UnsupportedPayload;
use super::Artifact;
use crate::core::{ComputeTarget, OrtInfer, OrtSessionConfig, RectifyError, RectifyResult};
use std::fmt;
use std::path::Path;
use tracing::debug;

/// ONNX `ModelProto` starts with field 1 (`ir_version`) as a varint.
const ONNX_LEADING_TAG: u8 = 0x08;
/// Python pickle protocol 2+ opcode.
const PICKLE_PROTO: u8 = 0x80;
/// Local file header of a zip archive, used by TorchScript and `torch.save`.
const ZIP_MAGIC: &[u8] = b"PK\x03\x04";

/// Storage format detected from an artifact's leading bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactFormat {
    /// Zero-length file.
    Empty,
    /// JSON estimator definition.
    EstimatorJson,
    /// ONNX protobuf graph.
    Onnx,
    /// Python pickle stream.
    Pickle,
    /// Zip archive (TorchScript or a zipped pickle).
    TorchArchive,
    /// Anything else.
    Unknown,
}

impl fmt::Display for ArtifactFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ArtifactFormat::Empty => "empty",
            ArtifactFormat::EstimatorJson => "estimator json",
            ArtifactFormat::Onnx => "onnx",
            ArtifactFormat::Pickle => "pickle",
            ArtifactFormat::TorchArchive => "torch archive",
            ArtifactFormat::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// Detects the storage format of an artifact from its bytes.
pub fn probe_format(bytes: &[u8]) -> ArtifactFormat {
    if bytes.is_empty() {
        return ArtifactFormat::Empty;
    }
    if bytes.starts_with(ZIP_MAGIC) {
        return ArtifactFormat::TorchArchive;
    }
    match bytes[0] {
        ONNX_LEADING_TAG => return ArtifactFormat::Onnx,
        PICKLE_PROTO => return ArtifactFormat::Pickle,
        _ => {}
    }
    match bytes.iter().find(|b| !b.is_ascii_whitespace()) {
        Some(b'{') => ArtifactFormat::EstimatorJson,
        _ => ArtifactFormat::Unknown,
    }
}

/// Loads artifacts for a fixed compute target and session configuration.
#[derive(Debug, Clone, Default)]
pub struct ArtifactLoader {
    session_config: OrtSessionConfig,
    target: ComputeTarget,
}

impl ArtifactLoader {
    /// Creates a loader that commits ONNX sessions on `target`.
    pub fn new(session_config: OrtSessionConfig, target: ComputeTarget) -> Self {
        Self {
            session_config,
            target,
        }
    }

    /// Loads a single artifact.
    ///
    /// # Errors
    ///
    /// * [`RectifyError::ArtifactNotFound`] if `path` does not exist
    /// * [`RectifyError::ArtifactLoad`] if the file cannot be read, is empty,
    ///   or holds a malformed estimator or ONNX graph
    pub fn load(&self, path: &Path) -> RectifyResult<Artifact> {
        if !path.exists() {
            return Err(RectifyError::artifact_not_found(path));
        }
        if !path.is_file() {
            return Err(RectifyError::artifact_rejected(path, "not a regular file"));
        }

        let bytes = std::fs::read(path)
            .map_err(|e| RectifyError::artifact_load(path, "failed to read artifact", e))?;
        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("artifact")
            .to_string();

        let format = probe_format(&bytes);
        debug!(path = %path.display(), %format, size = bytes.len(), "probed artifact");

        match format {
            ArtifactFormat::Empty => Err(RectifyError::artifact_rejected(
                path,
                "artifact file is empty",
            )),
            ArtifactFormat::EstimatorJson => EstimatorArtifact::from_json(name, &bytes)
                .map(Artifact::Estimator)
                .map_err(|e| RectifyError::artifact_load(path, "invalid estimator definition", e)),
            ArtifactFormat::Onnx => {
                let engine = OrtInfer::from_file(path, &self.session_config, self.target)?;
                Ok(Artifact::Module(ModuleArtifact::new(name, Box::new(engine))))
            }
            ArtifactFormat::Pickle | ArtifactFormat::TorchArchive | ArtifactFormat::Unknown => Ok(
                Artifact::Opaque(Box::new(UnsupportedPayload::new(path, format, bytes.len()))),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::ArtifactKind;

    #[test]
    fn test_probe_format() {
        assert_eq!(probe_format(b""), ArtifactFormat::Empty);
        assert_eq!(probe_format(b"\x08\x07\x12"), ArtifactFormat::Onnx);
        assert_eq!(probe_format(b"\x80\x04\x95"), ArtifactFormat::Pickle);
        assert_eq!(probe_format(b"PK\x03\x04rest"), ArtifactFormat::TorchArchive);
        assert_eq!(probe_format(b"  \n{\"estimator\": 1}"), ArtifactFormat::EstimatorJson);
        assert_eq!(probe_format(b"GIF89a"), ArtifactFormat::Unknown);
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model_class.pkl");
        let err = ArtifactLoader::default().load(&path).unwrap_err();
        match err {
            RectifyError::ArtifactNotFound { path } => {
                assert!(path.ends_with("model_class.pkl"))
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_empty_file_is_load_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model_en.pkl");
        std::fs::write(&path, b"").unwrap();
        let err = ArtifactLoader::default().load(&path).unwrap_err();
        assert!(matches!(err, RectifyError::ArtifactLoad { .. }));
    }

    #[test]
    fn test_json_without_estimator_tag_is_load_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model_en.pkl");
        std::fs::write(&path, br#"{"coef": [[1.0]]}"#).unwrap();
        let err = ArtifactLoader::default().load(&path).unwrap_err();
        assert!(matches!(err, RectifyError::ArtifactLoad { .. }));
    }

    #[test]
    fn test_pickle_loads_as_opaque() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model_de.pkl");
        std::fs::write(&path, b"\x80\x04\x95\x00\x00").unwrap();
        let artifact = ArtifactLoader::default().load(&path).unwrap();
        assert_eq!(artifact.kind(), ArtifactKind::Opaque);
    }

    #[test]
    fn test_estimator_json_loads_as_estimator() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model_class.pkl");
        std::fs::write(
            &path,
            br#"{"estimator": "linear_regression", "coef": [[1.0, 1.0]]}"#,
        )
        .unwrap();
        let artifact = ArtifactLoader::default().load(&path).unwrap();
        assert_eq!(artifact.kind(), ArtifactKind::Estimator);
    }
}
