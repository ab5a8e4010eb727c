//! The adaptive inference pipeline.
//!
//! An input image is preprocessed into an [`ImageBundle`], driven through the
//! encoder, classifier and decoder artifacts with [`run_stage`], and turned
//! back into an image of the original size by [`postprocess`].

pub mod bundle;
pub mod config;
pub mod corrector;
pub mod postprocess;
pub mod stage;

pub use bundle::{ImageBundle, preprocess};
pub use config::CorrectorConfig;
pub use corrector::{CorrectionReport, DistortionCorrector, StageSummary};
pub use postprocess::{PLACEHOLDER_COLOR, postprocess, try_postprocess};
pub use stage::{StageInput, StageValue, run_stage};
