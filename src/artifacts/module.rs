//! Forward-style module artifacts.

use crate::core::{ComputeTarget, InferenceEngine, RectifyResult, TensorD};

/// A tensor-in/tensor-out network driven through an [`InferenceEngine`].
///
/// Modules are inference-only, so entering evaluation mode is always
/// satisfied.
#[derive(Debug)]
pub struct ModuleArtifact {
    name: String,
    engine: Box<dyn InferenceEngine>,
}

impl ModuleArtifact {
    /// Wraps an engine under the given name.
    pub fn new(name: impl Into<String>, engine: Box<dyn InferenceEngine>) -> Self {
        Self {
            name: name.into(),
            engine,
        }
    }

    /// Name of the module, usually the artifact file stem.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of inputs the underlying graph declares.
    pub fn input_count(&self) -> usize {
        self.engine.input_count()
    }

    /// Runs a forward pass.
    pub fn forward(&self, inputs: &[&TensorD]) -> RectifyResult<TensorD> {
        self.engine.infer(inputs)
    }

    /// Moves the module onto a compute target.
    pub fn migrate(&mut self, target: &ComputeTarget) -> RectifyResult<bool> {
        self.engine.migrate(target)
    }

    /// Describes the backing engine.
    pub fn describe(&self) -> String {
        self.engine.engine_info()
    }
}
