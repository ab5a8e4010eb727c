//! Compute target selection.
//!
//! The compute target is chosen once at startup and threaded explicitly into
//! every component that builds an inference session.

use super::onnx::OrtExecutionProvider;
use crate::core::errors::RectifyError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::warn;

/// Processing unit used for inference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComputeTarget {
    /// General-purpose processor.
    #[default]
    Cpu,
    /// CUDA accelerator with the given device ordinal.
    Cuda {
        /// CUDA device ID.
        device_id: i32,
    },
    /// Accelerator when one is compiled in, CPU otherwise.
    Auto,
}

impl ComputeTarget {
    /// Returns true if this target can use an accelerator in the current build.
    pub fn accelerator_available() -> bool {
        cfg!(feature = "cuda")
    }

    /// Resolves `Auto` into a concrete target for the current build.
    pub fn resolve(self) -> ComputeTarget {
        match self {
            ComputeTarget::Auto if Self::accelerator_available() => {
                ComputeTarget::Cuda { device_id: 0 }
            }
            ComputeTarget::Auto => ComputeTarget::Cpu,
            other => other,
        }
    }

    /// Returns the ONNX Runtime execution providers for this target, in order
    /// of preference.
    ///
    /// Accelerator targets keep CPU as a fallback provider. Requesting CUDA in
    /// a build without the `cuda` feature logs a warning and yields CPU only.
    pub fn execution_providers(&self) -> Vec<OrtExecutionProvider> {
        match self.resolve() {
            ComputeTarget::Cuda { device_id } => {
                if Self::accelerator_available() {
                    vec![
                        OrtExecutionProvider::CUDA {
                            device_id: Some(device_id),
                        },
                        OrtExecutionProvider::CPU,
                    ]
                } else {
                    warn!("CUDA requested but cuda feature not enabled. Falling back to CPU.");
                    vec![OrtExecutionProvider::CPU]
                }
            }
            _ => vec![OrtExecutionProvider::CPU],
        }
    }
}

impl fmt::Display for ComputeTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComputeTarget::Cpu => write!(f, "cpu"),
            ComputeTarget::Cuda { device_id } => write!(f, "cuda:{device_id}"),
            ComputeTarget::Auto => write!(f, "auto"),
        }
    }
}

impl FromStr for ComputeTarget {
    type Err = RectifyError;

    /// Parses `cpu`, `cuda`, `gpu`, `cuda:N` or `auto` (case-insensitive).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let device = s.trim().to_lowercase();
        match device.as_str() {
            "cpu" => Ok(ComputeTarget::Cpu),
            "cuda" | "gpu" => Ok(ComputeTarget::Cuda { device_id: 0 }),
            "auto" => Ok(ComputeTarget::Auto),
            d => match d.strip_prefix("cuda:") {
                Some(ordinal) => {
                    let device_id = ordinal.parse::<i32>().map_err(|_| {
                        RectifyError::config_error(format!("invalid CUDA device ordinal: {s}"))
                    })?;
                    if device_id < 0 {
                        return Err(RectifyError::config_error(format!(
                            "invalid CUDA device ordinal: {s}"
                        )));
                    }
                    Ok(ComputeTarget::Cuda { device_id })
                }
                None => Err(RectifyError::config_error(format!(
                    "unsupported device: {s}. Supported devices: cpu, cuda, cuda:N, auto"
                ))),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_devices() {
        assert_eq!("cpu".parse::<ComputeTarget>().unwrap(), ComputeTarget::Cpu);
        assert_eq!(
            "CUDA".parse::<ComputeTarget>().unwrap(),
            ComputeTarget::Cuda { device_id: 0 }
        );
        assert_eq!(
            "cuda:2".parse::<ComputeTarget>().unwrap(),
            ComputeTarget::Cuda { device_id: 2 }
        );
        assert_eq!("auto".parse::<ComputeTarget>().unwrap(), ComputeTarget::Auto);
    }

    #[test]
    fn test_parse_rejects_unknown_devices() {
        assert!("tpu".parse::<ComputeTarget>().is_err());
        assert!("cuda:x".parse::<ComputeTarget>().is_err());
        assert!("cuda:-1".parse::<ComputeTarget>().is_err());
    }

    #[test]
    fn test_cpu_uses_cpu_provider_only() {
        assert_eq!(
            ComputeTarget::Cpu.execution_providers(),
            vec![OrtExecutionProvider::CPU]
        );
    }

    #[test]
    fn test_auto_resolves_for_build() {
        let resolved = ComputeTarget::Auto.resolve();
        if ComputeTarget::accelerator_available() {
            assert_eq!(resolved, ComputeTarget::Cuda { device_id: 0 });
        } else {
            assert_eq!(resolved, ComputeTarget::Cpu);
        }
    }

    #[test]
    fn test_cuda_providers_keep_cpu_fallback() {
        let providers = ComputeTarget::Cuda { device_id: 1 }.execution_providers();
        assert_eq!(providers.last(), Some(&OrtExecutionProvider::CPU));
    }

    #[test]
    fn test_display_round_trips() {
        for target in [
            ComputeTarget::Cpu,
            ComputeTarget::Cuda { device_id: 3 },
            ComputeTarget::Auto,
        ] {
            assert_eq!(target.to_string().parse::<ComputeTarget>().unwrap(), target);
        }
    }
}
