//! Traits shared across the pipeline.

pub mod granular;

pub use granular::InferenceEngine;
