//! Stage dispatch.
//!
//! [`run_stage`] feeds a stage input to an artifact according to the
//! artifact's calling convention:
//!
//! - estimators get the `(samples, features)` vector view and yield
//!   [`StageValue::Array`]
//! - modules get the tensor view and yield [`StageValue::Tensor`]
//! - opaque callables get the tensor view; when the call fails the input is
//!   returned unchanged

use super::bundle::ImageBundle;
use crate::artifacts::Artifact;
use crate::core::{RectifyError, RectifyResult, Stage, Tensor2D, TensorD};
use crate::utils::flatten_to_2d;
use std::borrow::Cow;
use tracing::{debug, warn};

/// Output of a pipeline stage.
#[derive(Debug, Clone, PartialEq)]
pub enum StageValue {
    /// Plain array produced by a predict-style call.
    Array(TensorD),
    /// Tensor produced by a forward-style or callable call.
    Tensor(TensorD),
}

impl StageValue {
    /// Underlying values, regardless of kind.
    pub fn data(&self) -> &TensorD {
        match self {
            StageValue::Array(a) | StageValue::Tensor(a) => a,
        }
    }

    /// Consumes the value, returning the underlying array.
    pub fn into_data(self) -> TensorD {
        match self {
            StageValue::Array(a) | StageValue::Tensor(a) => a,
        }
    }

    /// Shape of the underlying values.
    pub fn shape(&self) -> &[usize] {
        self.data().shape()
    }

    /// `"array"` or `"tensor"`.
    pub fn kind_name(&self) -> &'static str {
        match self {
            StageValue::Array(_) => "array",
            StageValue::Tensor(_) => "tensor",
        }
    }
}

/// What a stage is fed.
#[derive(Debug, Clone, Copy)]
pub enum StageInput<'a> {
    /// The preprocessed input image.
    Image(&'a ImageBundle),
    /// The output of the previous stage.
    Value(&'a StageValue),
    /// Encoded features together with the classifier output.
    Decode {
        /// Encoder output.
        features: &'a StageValue,
        /// Classifier output.
        params: &'a StageValue,
    },
}

impl<'a> StageInput<'a> {
    fn vector_view(&self) -> RectifyResult<Cow<'a, Tensor2D>> {
        match *self {
            StageInput::Image(bundle) => Ok(Cow::Borrowed(&bundle.vector)),
            StageInput::Value(value) | StageInput::Decode { features: value, .. } => {
                Ok(Cow::Owned(flatten_to_2d(value.data())?))
            }
        }
    }

    fn tensor_view(&self) -> &'a TensorD {
        match *self {
            StageInput::Image(bundle) => &bundle.tensor,
            StageInput::Value(value) | StageInput::Decode { features: value, .. } => value.data(),
        }
    }

    fn passthrough(&self) -> StageValue {
        match *self {
            StageInput::Image(bundle) => StageValue::Tensor(bundle.tensor.clone()),
            StageInput::Value(value) | StageInput::Decode { features: value, .. } => value.clone(),
        }
    }
}

/// Runs one pipeline stage.
///
/// # Errors
///
/// Estimator and module failures are returned as errors. Opaque callable
/// failures are logged and recovered by passing the input through.
pub fn run_stage(stage: Stage, artifact: &Artifact, input: StageInput<'_>) -> RectifyResult<StageValue> {
    match artifact {
        Artifact::Estimator(estimator) => {
            let x = input.vector_view()?;
            debug!(%stage, shape = ?x.dim(), "predict");
            estimator.predict(&x).map(StageValue::Array)
        }
        Artifact::Module(module) => {
            let x = input.tensor_view();
            let output = match input {
                StageInput::Decode { params, .. } if module.input_count() >= 2 => {
                    debug!(%stage, features = ?x.shape(), params = ?params.shape(), "forward");
                    module.forward(&[x, params.data()])
                }
                _ => {
                    debug!(%stage, shape = ?x.shape(), "forward");
                    module.forward(&[x])
                }
            };
            output.map(StageValue::Tensor).map_err(|e| {
                RectifyError::inference(module.name(), format!("{stage} stage forward pass"), e)
            })
        }
        Artifact::Opaque(callable) => match callable.call(input.tensor_view()) {
            Ok(output) => Ok(StageValue::Tensor(output)),
            Err(e) => {
                let err = RectifyError::stage_dispatch(stage, e.to_string());
                warn!(%stage, artifact = %callable.describe(), error = %err, "passing stage input through unchanged");
                Ok(input.passthrough())
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::{EstimatorArtifact, FnCallable, ModuleArtifact};
    use crate::core::{InferenceEngine, SimpleError};
    use image::{Rgb, RgbImage};
    use ndarray::{ArrayD, IxDyn};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug)]
    struct Recorder {
        inputs: usize,
        calls: Arc<AtomicUsize>,
        fail: bool,
    }

    impl InferenceEngine for Recorder {
        fn infer(&self, inputs: &[&ArrayD<f32>]) -> RectifyResult<ArrayD<f32>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(RectifyError::invalid_input("boom"));
            }
            let total: f32 = inputs.iter().map(|x| x.sum()).sum();
            Ok(ArrayD::from_elem(IxDyn(&[1, inputs.len()]), total))
        }

        fn input_count(&self) -> usize {
            self.inputs
        }

        fn engine_info(&self) -> String {
            "recorder".into()
        }
    }

    fn module(inputs: usize, fail: bool) -> (Artifact, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let engine = Recorder {
            inputs,
            calls: calls.clone(),
            fail,
        };
        (
            Artifact::Module(ModuleArtifact::new("m", Box::new(engine))),
            calls,
        )
    }

    fn bundle() -> ImageBundle {
        ImageBundle::from_image(RgbImage::from_pixel(4, 4, Rgb([255, 0, 0])), (8, 8)).unwrap()
    }

    fn sum_estimator(n_features: usize) -> Artifact {
        let coef = vec![vec![1.0f32; n_features]];
        let spec = crate::artifacts::EstimatorSpec::LinearRegression {
            coef,
            intercept: vec![],
        };
        Artifact::Estimator(EstimatorArtifact::from_spec("sum", spec).unwrap())
    }

    #[test]
    fn test_estimator_gets_vector_view_and_yields_array() {
        let bundle = bundle();
        let out = run_stage(Stage::Encode, &sum_estimator(48), StageInput::Image(&bundle)).unwrap();
        assert_eq!(out.kind_name(), "array");
        assert_eq!(out.data().iter().copied().collect::<Vec<_>>(), vec![255.0 * 16.0]);
    }

    #[test]
    fn test_estimator_flattens_higher_rank_features() {
        let features = StageValue::Tensor(ArrayD::from_elem(IxDyn(&[1, 2, 3]), 1.0));
        let out = run_stage(Stage::Classify, &sum_estimator(6), StageInput::Value(&features)).unwrap();
        assert_eq!(out, StageValue::Array(ArrayD::from_elem(IxDyn(&[1]), 6.0)));
    }

    #[test]
    fn test_estimator_pipeline_never_touches_forward_path() {
        let bundle = bundle();
        let (_unused, calls) = module(1, false);
        let features = run_stage(Stage::Encode, &sum_estimator(48), StageInput::Image(&bundle)).unwrap();
        let params = run_stage(Stage::Classify, &sum_estimator(1), StageInput::Value(&features)).unwrap();
        let decoded = run_stage(
            Stage::Decode,
            &sum_estimator(1),
            StageInput::Decode {
                features: &features,
                params: &params,
            },
        )
        .unwrap();
        assert_eq!(decoded.kind_name(), "array");
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_module_gets_tensor_view() {
        let bundle = bundle();
        let (artifact, calls) = module(1, false);
        let out = run_stage(Stage::Encode, &artifact, StageInput::Image(&bundle)).unwrap();
        assert_eq!(out.kind_name(), "tensor");
        // 8x8 red image: only the first channel is 1.0
        assert_eq!(out.data()[[0, 0]], 64.0);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_two_input_decoder_receives_params() {
        let features = StageValue::Tensor(ArrayD::from_elem(IxDyn(&[1, 2]), 1.0));
        let params = StageValue::Array(ArrayD::from_elem(IxDyn(&[1]), 5.0));
        let input = StageInput::Decode {
            features: &features,
            params: &params,
        };

        let (two, _) = module(2, false);
        let out = run_stage(Stage::Decode, &two, input).unwrap();
        assert_eq!(out.shape(), &[1, 2]);
        assert_eq!(out.data()[[0, 0]], 7.0);

        let (one, _) = module(1, false);
        let out = run_stage(Stage::Decode, &one, input).unwrap();
        assert_eq!(out.shape(), &[1, 1]);
        assert_eq!(out.data()[[0, 0]], 2.0);
    }

    #[test]
    fn test_module_failure_is_hard_error() {
        let bundle = bundle();
        let (artifact, _) = module(1, true);
        let err = run_stage(Stage::Encode, &artifact, StageInput::Image(&bundle)).unwrap_err();
        assert!(matches!(err, RectifyError::Inference { .. }));
    }

    #[test]
    fn test_failing_opaque_is_identity() {
        let failing = Artifact::Opaque(Box::new(FnCallable::new("nope", |_: &TensorD| {
            Err(RectifyError::inference("nope", "call", SimpleError::new("unsupported")))
        })));

        let value = StageValue::Array(ArrayD::from_elem(IxDyn(&[1, 3]), 2.5));
        let out = run_stage(Stage::Classify, &failing, StageInput::Value(&value)).unwrap();
        assert_eq!(out, value);

        let bundle = bundle();
        let out = run_stage(Stage::Encode, &failing, StageInput::Image(&bundle)).unwrap();
        assert_eq!(out, StageValue::Tensor(bundle.tensor.clone()));
    }

    #[test]
    fn test_opaque_success_yields_tensor() {
        let halve = Artifact::Opaque(Box::new(FnCallable::new("halve", |x: &TensorD| {
            Ok(x.mapv(|v| v / 2.0))
        })));
        let value = StageValue::Array(ArrayD::from_elem(IxDyn(&[2]), 4.0));
        let out = run_stage(Stage::Decode, &halve, StageInput::Value(&value)).unwrap();
        assert_eq!(out, StageValue::Tensor(ArrayD::from_elem(IxDyn(&[2]), 2.0)));
    }
}
