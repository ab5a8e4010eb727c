//! The core module of the rectification pipeline.
//!
//! This module contains the fundamental components shared by the correction
//! pipeline and the distortion detector:
//! - Configuration (compute target, ONNX Runtime sessions)
//! - Error handling
//! - Inference engine integration
//! - Traits defining the inference seam
//! - Tensor type aliases

pub mod config;
pub mod errors;
pub mod inference;
pub mod traits;

pub use config::{ComputeTarget, OrtExecutionProvider, OrtSessionConfig};
pub use errors::{RectifyError, RectifyResult, SimpleError, Stage};
pub use inference::OrtInfer;
pub use traits::InferenceEngine;

/// A 2-dimensional tensor represented as a 2D array of f32 values.
pub type Tensor2D = ndarray::Array2<f32>;

/// A 4-dimensional tensor represented as a 4D array of f32 values.
pub type Tensor4D = ndarray::Array4<f32>;

/// A tensor of arbitrary rank.
pub type TensorD = ndarray::ArrayD<f32>;
