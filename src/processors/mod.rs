//! Image processing utilities shared by the pipeline and the detector.

pub mod normalization;

pub use normalization::{IMAGENET_MEAN, IMAGENET_STD, NormalizeImage};
