use super::*;
use crate::core::config::{OrtExecutionProvider, OrtGraphOptimizationLevel};
use crate::core::errors::{RectifyError, RectifyResult};
use ort::execution_providers::ExecutionProviderDispatch;
use ort::logging::LogLevel;
use ort::session::builder::{GraphOptimizationLevel, SessionBuilder};
use std::path::Path;
use tracing::debug;

impl OrtInfer {
    /// Creates a new OrtInfer by committing the model at `model_path` on the
    /// execution providers of `target`.
    ///
    /// Providers listed explicitly in `session_config` take precedence over the
    /// ones derived from the target.
    pub fn from_file(
        model_path: impl AsRef<Path>,
        session_config: &OrtSessionConfig,
        target: ComputeTarget,
    ) -> RectifyResult<Self> {
        let path = model_path.as_ref();
        let session = Self::build_session(path, session_config, target)?;

        let input_names: Vec<String> = session.inputs.iter().map(|i| i.name.clone()).collect();
        let output_name = session
            .outputs
            .first()
            .map(|o| o.name.clone())
            .ok_or_else(|| {
                RectifyError::artifact_rejected(path, "model declares no outputs")
            })?;
        if input_names.is_empty() {
            return Err(RectifyError::artifact_rejected(
                path,
                "model declares no inputs",
            ));
        }

        let model_name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("unknown_model")
            .to_string();

        debug!(
            model = %model_name,
            inputs = ?input_names,
            output = %output_name,
            target = %target,
            "committed ONNX session"
        );

        Ok(OrtInfer {
            session: Mutex::new(session),
            input_names,
            output_name,
            model_path: path.to_path_buf(),
            model_name,
            session_config: session_config.clone(),
            target,
        })
    }

    /// Recommits the session on a new compute target.
    pub(super) fn recommit(&mut self, target: ComputeTarget) -> RectifyResult<()> {
        let session = Self::build_session(&self.model_path, &self.session_config, target)?;
        self.session = Mutex::new(session);
        self.target = target;
        Ok(())
    }

    fn build_session(
        path: &Path,
        session_config: &OrtSessionConfig,
        target: ComputeTarget,
    ) -> RectifyResult<Session> {
        let builder = Session::builder()
            .and_then(|b| b.with_log_level(LogLevel::Error))
            .and_then(|b| Self::apply_ort_config(b, session_config, target))
            .map_err(|e| {
                RectifyError::artifact_load(path, "failed to configure ONNX session", e)
            })?;
        builder.commit_from_file(path).map_err(|e| {
            RectifyError::artifact_load(
                path,
                "failed to create ONNX session; check device/EP configuration and model file",
                e,
            )
        })
    }

    fn apply_ort_config(
        mut builder: SessionBuilder,
        cfg: &OrtSessionConfig,
        target: ComputeTarget,
    ) -> Result<SessionBuilder, ort::Error> {
        if let Some(intra) = cfg.intra_threads {
            builder = builder.with_intra_threads(intra)?;
        }
        if let Some(inter) = cfg.inter_threads {
            builder = builder.with_inter_threads(inter)?;
        }
        let level = match cfg.get_optimization_level() {
            OrtGraphOptimizationLevel::DisableAll => GraphOptimizationLevel::Disable,
            OrtGraphOptimizationLevel::Level1 => GraphOptimizationLevel::Level1,
            OrtGraphOptimizationLevel::Level2 => GraphOptimizationLevel::Level2,
            OrtGraphOptimizationLevel::Level3 => GraphOptimizationLevel::Level3,
        };
        builder = builder.with_optimization_level(level)?;

        let eps = cfg
            .execution_providers
            .clone()
            .unwrap_or_else(|| target.execution_providers());
        let providers = Self::build_execution_providers(&eps)?;
        if !providers.is_empty() {
            builder = builder.with_execution_providers(providers)?;
        }
        Ok(builder)
    }

    /// Builds execution providers from configuration
    fn build_execution_providers(
        eps: &[OrtExecutionProvider],
    ) -> Result<Vec<ExecutionProviderDispatch>, ort::Error> {
        let mut providers = Vec::with_capacity(eps.len());
        for ep in eps {
            match ep {
                OrtExecutionProvider::CPU => {
                    providers
                        .push(ort::execution_providers::CPUExecutionProvider::default().build());
                }
                #[cfg(feature = "cuda")]
                OrtExecutionProvider::CUDA { device_id } => {
                    let mut cuda_provider =
                        ort::execution_providers::CUDAExecutionProvider::default();
                    if let Some(id) = device_id {
                        cuda_provider = cuda_provider.with_device_id(*id);
                    }
                    providers.push(cuda_provider.build());
                }
                #[cfg(not(feature = "cuda"))]
                OrtExecutionProvider::CUDA { .. } => {
                    return Err(ort::Error::new(
                        "CUDA execution provider requested but cuda feature is not enabled",
                    ));
                }
            }
        }
        Ok(providers)
    }
}
