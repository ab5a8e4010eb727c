//! Error types for the rectification pipeline.
//!
//! This module defines the error taxonomy shared by artifact loading, image
//! decoding, stage dispatch, postprocessing and the distortion detector,
//! together with helper constructors that attach context to each error.

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Stage of the correction pipeline an error or log record refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Feature extraction with the encoder artifact.
    Encode,
    /// Distortion classification with the classifier artifact.
    Classify,
    /// Image reconstruction with the decoder artifact.
    Decode,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Encode => write!(f, "encode"),
            Stage::Classify => write!(f, "classify"),
            Stage::Decode => write!(f, "decode"),
        }
    }
}

/// Errors that can occur while loading artifacts or running inference.
#[derive(Error, Debug)]
pub enum RectifyError {
    /// A required artifact file does not exist.
    #[error("artifact not found: {}", .path.display())]
    ArtifactNotFound {
        /// Path that was expected to hold the artifact.
        path: PathBuf,
    },

    /// An artifact exists but could not be deserialized.
    #[error("failed to load artifact {}: {reason}", .path.display())]
    ArtifactLoad {
        /// Path of the artifact.
        path: PathBuf,
        /// Description of what went wrong.
        reason: String,
        /// The underlying error, if any.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The input file could not be decoded as an image.
    #[error("failed to decode image {}", .path.display())]
    ImageDecode {
        /// Path of the input image.
        path: PathBuf,
        /// The underlying decoder error.
        #[source]
        source: image::ImageError,
    },

    /// No usable calling convention was found for an artifact.
    ///
    /// The pipeline recovers from this by passing the stage input through unchanged.
    #[error("{stage} stage dispatch failed: {message}")]
    StageDispatch {
        /// Stage being dispatched.
        stage: Stage,
        /// A message describing the failure.
        message: String,
    },

    /// Model output could not be turned into an image.
    ///
    /// The pipeline recovers from this by producing a neutral placeholder image.
    #[error("post-processing failed: {message}")]
    Postprocess {
        /// A message describing the failure.
        message: String,
    },

    /// A model call failed.
    #[error("inference failed for model '{model_name}': {context}")]
    Inference {
        /// Name of the model that failed.
        model_name: String,
        /// Additional context about the failure.
        context: String,
        /// The underlying error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Error indicating invalid input.
    #[error("invalid input: {message}")]
    InvalidInput {
        /// A message describing the invalid input.
        message: String,
    },

    /// Error indicating a configuration problem.
    #[error("configuration: {message}")]
    Config {
        /// A message describing the configuration error.
        message: String,
    },

    /// Error from the ONNX Runtime session.
    #[error(transparent)]
    Session(#[from] ort::Error),

    /// Error from tensor reshaping.
    #[error("tensor operation")]
    Tensor(#[from] ndarray::ShapeError),

    /// Error from image encoding.
    #[error("image encoding")]
    Image(#[from] image::ImageError),

    /// IO error.
    #[error("io")]
    Io(#[from] std::io::Error),
}

/// Convenient result alias for rectification operations.
pub type RectifyResult<T> = Result<T, RectifyError>;

/// Lightweight error carrying only a message, used as a `source` when no
/// richer error exists.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct SimpleError(String);

impl SimpleError {
    /// Creates a new simple error from a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

impl RectifyError {
    /// Creates an `ArtifactNotFound` error for the given path.
    pub fn artifact_not_found(path: impl AsRef<Path>) -> Self {
        Self::ArtifactNotFound {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Creates an `ArtifactLoad` error wrapping the underlying cause.
    pub fn artifact_load(
        path: impl AsRef<Path>,
        reason: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::ArtifactLoad {
            path: path.as_ref().to_path_buf(),
            reason: reason.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Creates an `ArtifactLoad` error that has no underlying cause.
    pub fn artifact_rejected(path: impl AsRef<Path>, reason: impl Into<String>) -> Self {
        Self::ArtifactLoad {
            path: path.as_ref().to_path_buf(),
            reason: reason.into(),
            source: None,
        }
    }

    /// Creates an `ImageDecode` error.
    pub fn image_decode(path: impl AsRef<Path>, source: image::ImageError) -> Self {
        Self::ImageDecode {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Creates a `StageDispatch` error.
    pub fn stage_dispatch(stage: Stage, message: impl Into<String>) -> Self {
        Self::StageDispatch {
            stage,
            message: message.into(),
        }
    }

    /// Creates a `Postprocess` error.
    pub fn postprocess(message: impl Into<String>) -> Self {
        Self::Postprocess {
            message: message.into(),
        }
    }

    /// Creates an `Inference` error for the named model.
    pub fn inference(
        model_name: &str,
        context: impl Into<String>,
        error: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Inference {
            model_name: model_name.to_string(),
            context: context.into(),
            source: Box::new(error),
        }
    }

    /// Creates an `InvalidInput` error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Creates a `Config` error.
    pub fn config_error(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Renders this error and every error in its source chain as one line,
    /// outermost first.
    pub fn chain(&self) -> String {
        let mut rendered = self.to_string();
        let mut current = std::error::Error::source(self);
        while let Some(cause) = current {
            rendered.push_str(": ");
            rendered.push_str(&cause.to_string());
            current = cause.source();
        }
        rendered
    }
}
