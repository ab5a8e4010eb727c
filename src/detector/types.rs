//! Result types of the distortion detector.

use crate::core::RectifyError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Geometric distortion categories, in classifier output order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistortionType {
    /// Lines bow outward from the center.
    Barrel,
    /// Lines bow inward toward the center.
    Pincushion,
    /// In-plane rotation.
    Rotation,
    /// Affine shear.
    Shear,
    /// Perspective warp.
    Projective,
    /// Sinusoidal ripple.
    Wave,
}

impl DistortionType {
    /// All categories, indexed like the classifier logits.
    pub const ALL: [DistortionType; 6] = [
        DistortionType::Barrel,
        DistortionType::Pincushion,
        DistortionType::Rotation,
        DistortionType::Shear,
        DistortionType::Projective,
        DistortionType::Wave,
    ];

    /// Category for a classifier output index.
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Classifier output index of this category.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Lowercase name.
    pub fn as_str(self) -> &'static str {
        match self {
            DistortionType::Barrel => "barrel",
            DistortionType::Pincushion => "pincushion",
            DistortionType::Rotation => "rotation",
            DistortionType::Shear => "shear",
            DistortionType::Projective => "projective",
            DistortionType::Wave => "wave",
        }
    }
}

impl fmt::Display for DistortionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DistortionType {
    type Err = RectifyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == name)
            .ok_or_else(|| RectifyError::invalid_input(format!("unknown distortion type: {s}")))
    }
}

/// Outcome of classifying one image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionResult {
    /// Most likely category.
    pub distortion_type: DistortionType,
    /// Softmax probability of `distortion_type`.
    pub confidence: f32,
    /// Index of `distortion_type` in [`DistortionType::ALL`].
    pub predicted_class_index: usize,
    /// Probability of every category, when requested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub all_probabilities: Option<Vec<(DistortionType, f32)>>,
}

/// One entry of a batch detection.
#[derive(Debug)]
pub struct BatchDetectionEntry {
    /// The input path, as given.
    pub image_path: PathBuf,
    /// Detection result, or the error that prevented it.
    pub outcome: Result<DetectionResult, RectifyError>,
}

impl BatchDetectionEntry {
    /// Detection result if the image was processed.
    pub fn result(&self) -> Option<&DetectionResult> {
        self.outcome.as_ref().ok()
    }

    /// Error message if the image could not be processed.
    pub fn error(&self) -> Option<String> {
        self.outcome.as_ref().err().map(RectifyError::chain)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_order_is_fixed() {
        let names: Vec<_> = DistortionType::ALL.iter().map(|t| t.to_string()).collect();
        assert_eq!(
            names,
            ["barrel", "pincushion", "rotation", "shear", "projective", "wave"]
        );
        for (i, t) in DistortionType::ALL.iter().enumerate() {
            assert_eq!(t.index(), i);
            assert_eq!(DistortionType::from_index(i), Some(*t));
        }
        assert_eq!(DistortionType::from_index(6), None);
    }

    #[test]
    fn test_parse() {
        assert_eq!("Wave".parse::<DistortionType>().unwrap(), DistortionType::Wave);
        assert!("fisheye".parse::<DistortionType>().is_err());
    }

    #[test]
    fn test_serde_uses_lowercase_names() {
        let result = DetectionResult {
            distortion_type: DistortionType::Shear,
            confidence: 0.75,
            predicted_class_index: 3,
            all_probabilities: None,
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["distortion_type"], "shear");
        assert!(json.get("all_probabilities").is_none());
    }
}
