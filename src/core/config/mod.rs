//! Configuration shared by the correction pipeline and the detector.
//!
//! This module provides the compute target selection and the ONNX Runtime
//! session settings used when building inference engines.

pub mod device;
pub mod onnx;

pub use device::ComputeTarget;
pub use onnx::{OrtExecutionProvider, OrtGraphOptimizationLevel, OrtSessionConfig};
