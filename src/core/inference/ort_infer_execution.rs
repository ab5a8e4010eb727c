use super::*;
use crate::core::errors::{RectifyError, RectifyResult, SimpleError};
use crate::core::traits::InferenceEngine;
use ndarray::{ArrayD, CowArray, IxDyn};
use ort::session::SessionInputValue;
use ort::value::TensorRef;

impl InferenceEngine for OrtInfer {
    fn infer(&self, inputs: &[&ArrayD<f32>]) -> RectifyResult<ArrayD<f32>> {
        if inputs.len() != self.input_names.len() {
            return Err(RectifyError::invalid_input(format!(
                "model '{}' expects {} input(s), got {}",
                self.model_name,
                self.input_names.len(),
                inputs.len()
            )));
        }

        // ORT needs contiguous buffers; keep them alive until the run completes.
        let contiguous: Vec<CowArray<'_, f32, IxDyn>> =
            inputs.iter().map(|x| x.as_standard_layout()).collect();

        let mut feeds: Vec<(String, SessionInputValue<'_>)> = Vec::with_capacity(inputs.len());
        for (name, x) in self.input_names.iter().zip(&contiguous) {
            let tensor = TensorRef::from_array_view(x.view()).map_err(|e| {
                RectifyError::inference(
                    &self.model_name,
                    format!("failed to convert input '{}' with shape {:?}", name, x.shape()),
                    e,
                )
            })?;
            feeds.push((name.clone(), tensor.into()));
        }

        let mut session = self.session.lock().map_err(|_| {
            RectifyError::inference(
                &self.model_name,
                "failed to acquire session lock",
                SimpleError::new("session lock poisoned"),
            )
        })?;

        let outputs = session.run(feeds).map_err(|e| {
            RectifyError::inference(
                &self.model_name,
                format!(
                    "ONNX Runtime inference failed with inputs {:?} -> output '{}'",
                    self.input_names, self.output_name
                ),
                e,
            )
        })?;

        let (shape, data) = outputs[self.output_name.as_str()]
            .try_extract_tensor::<f32>()
            .map_err(|e| {
                RectifyError::inference(
                    &self.model_name,
                    format!("failed to extract output tensor '{}' as f32", self.output_name),
                    e,
                )
            })?;

        let dims: Vec<usize> = shape.iter().map(|&d| d.max(0) as usize).collect();
        let output = ArrayD::from_shape_vec(IxDyn(&dims), data.to_vec())?;
        Ok(output)
    }

    fn input_count(&self) -> usize {
        self.input_names.len()
    }

    fn engine_info(&self) -> String {
        format!("onnx:{} on {}", self.model_name, self.target)
    }

    fn migrate(&mut self, target: &ComputeTarget) -> RectifyResult<bool> {
        if self.target != *target {
            self.recommit(*target)?;
        }
        Ok(true)
    }
}
