//! Core ONNX Runtime inference engine.

use crate::core::config::{ComputeTarget, OrtSessionConfig};
use ort::session::Session;
use std::path::PathBuf;
use std::sync::Mutex;

#[path = "ort_infer_builders.rs"]
mod ort_infer_builders;
#[path = "ort_infer_execution.rs"]
mod ort_infer_execution;
#[cfg(test)]
#[path = "ort_infer_tests.rs"]
mod ort_infer_tests;

/// ONNX Runtime backed [`InferenceEngine`](crate::core::traits::InferenceEngine).
///
/// The session is guarded by a mutex because running an ORT session requires
/// exclusive access; the engine itself is shared read-only.
pub struct OrtInfer {
    pub(super) session: Mutex<Session>,
    pub(super) input_names: Vec<String>,
    pub(super) output_name: String,
    pub(super) model_path: PathBuf,
    pub(super) model_name: String,
    pub(super) session_config: OrtSessionConfig,
    pub(super) target: ComputeTarget,
}

impl std::fmt::Debug for OrtInfer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrtInfer")
            .field("input_names", &self.input_names)
            .field("output_name", &self.output_name)
            .field("model_path", &self.model_path)
            .field("model_name", &self.model_name)
            .field("target", &self.target)
            .finish()
    }
}

impl OrtInfer {
    /// Returns the model path associated with this inference engine.
    pub fn model_path(&self) -> &std::path::Path {
        &self.model_path
    }

    /// Returns the model name associated with this inference engine.
    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    /// Returns the compute target the session was committed on.
    pub fn target(&self) -> ComputeTarget {
        self.target
    }

    /// Returns the declared input tensor names.
    pub fn input_names(&self) -> &[String] {
        &self.input_names
    }
}
