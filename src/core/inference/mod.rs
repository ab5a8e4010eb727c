//! Structures and helpers for ONNX Runtime inference.
//!
//! This module holds the low level inference engine that backs module
//! artifacts and the detector networks.

pub mod ort_infer;

pub use ort_infer::OrtInfer;
