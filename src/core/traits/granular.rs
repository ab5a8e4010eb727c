//! Granular traits for composable inference components.
//!
//! Model artifacts and the detector networks are driven through the
//! [`InferenceEngine`] trait, which keeps the dispatch logic independent of
//! the backend that actually evaluates the model.
//!
//! # Examples
//!
//! ```rust
//! use blind_rectify::core::traits::InferenceEngine;
//! use blind_rectify::core::RectifyResult;
//! use ndarray::ArrayD;
//!
//! #[derive(Debug)]
//! struct Doubler;
//!
//! impl InferenceEngine for Doubler {
//!     fn infer(&self, inputs: &[&ArrayD<f32>]) -> RectifyResult<ArrayD<f32>> {
//!         Ok(inputs[0].mapv(|v| v * 2.0))
//!     }
//!
//!     fn engine_info(&self) -> String {
//!         "doubler".to_string()
//!     }
//! }
//!
//! let x = ArrayD::from_elem(vec![1, 2], 1.5f32);
//! let y = Doubler.infer(&[&x]).unwrap();
//! assert_eq!(y[[0, 1]], 3.0);
//! ```

use crate::core::config::ComputeTarget;
use crate::core::errors::RectifyResult;
use ndarray::ArrayD;
use std::fmt::Debug;

/// Trait for inference engine operations.
///
/// This trait handles running the actual model inference, whether through
/// ONNX Runtime or another backend. Engines are inference-only: they never
/// track gradients.
pub trait InferenceEngine: Send + Sync + Debug {
    /// Perform inference on one or more input tensors.
    ///
    /// # Arguments
    ///
    /// * `inputs` - Input tensors, in the order the model declares its inputs
    ///
    /// # Returns
    ///
    /// The primary output tensor or an error
    fn infer(&self, inputs: &[&ArrayD<f32>]) -> RectifyResult<ArrayD<f32>>;

    /// Number of inputs the model declares.
    fn input_count(&self) -> usize {
        1
    }

    /// Get information about the inference engine.
    ///
    /// # Returns
    ///
    /// String describing the inference engine (model name, backend, etc.)
    fn engine_info(&self) -> String;

    /// Moves the engine onto the given compute target.
    ///
    /// Returns `Ok(true)` if the engine supports migration and now runs on the
    /// target, `Ok(false)` if the engine has no notion of a compute target.
    fn migrate(&mut self, target: &ComputeTarget) -> RectifyResult<bool> {
        let _ = target;
        Ok(false)
    }
}
