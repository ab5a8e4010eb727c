//! # Blind Rectify
//!
//! Blind geometric distortion correction for photographs, plus a detector for
//! the kind of distortion an image suffers from.
//!
//! ## Features
//!
//! - Three-stage correction pipeline (encode, classify, decode)
//! - Artifacts of heterogeneous calling conventions, resolved once at load time
//! - ONNX Runtime integration with CPU or CUDA execution providers
//! - Six-way distortion classification with optional parameter estimation
//!
//! ## Modules
//!
//! * [`core`] - Error handling, configuration, inference engines
//! * [`artifacts`] - Loading and probing of pipeline artifacts
//! * [`pipeline`] - Preprocessing, stage dispatch, postprocessing, correction
//! * [`detector`] - Distortion type detection
//! * [`processors`] - Image normalization
//! * [`utils`] - Image I/O, tensor helpers and logging setup
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use blind_rectify::prelude::*;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = CorrectorConfig::new().with_target(ComputeTarget::Auto);
//! let corrector = DistortionCorrector::new("models", config)?;
//! let report = corrector.try_correct_distortion("distorted.jpg", "corrected.jpg")?;
//! println!("{:?}", report.stages);
//! # Ok(())
//! # }
//! ```
//!
//! ### Detecting distortion
//!
//! ```rust,no_run
//! use blind_rectify::prelude::*;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let detector = DistortionDetector::from_dir("geoProjModels", &DetectorConfig::default())?;
//! let result = detector.detect_distortion("photo.jpg", true)?;
//! println!("{} ({:.2})", result.distortion_type, result.confidence);
//! # Ok(())
//! # }
//! ```

pub mod artifacts;
pub mod core;
pub mod detector;
pub mod pipeline;
pub mod processors;
pub mod utils;

/// Prelude module for convenient imports.
///
/// ```rust
/// use blind_rectify::prelude::*;
/// ```
pub mod prelude {
    pub use crate::core::{ComputeTarget, RectifyError, RectifyResult};
    pub use crate::detector::{DetectionResult, DetectorConfig, DistortionDetector, DistortionType};
    pub use crate::pipeline::{CorrectionReport, CorrectorConfig, DistortionCorrector};
    pub use crate::utils::load_image;
}
