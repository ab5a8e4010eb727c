//! Tensor helpers for shape normalization between pipeline stages.

use crate::core::{RectifyError, Tensor2D, TensorD};
use ndarray::Array2;

/// Flattens an array into the `(samples, features)` layout expected by
/// predict-style estimators.
///
/// - rank 0 becomes a single `1 x 1` row
/// - rank 1 becomes a single row
/// - rank 2 is kept as is
/// - higher ranks keep the leading axis and flatten the rest
pub fn flatten_to_2d(tensor: &TensorD) -> Result<Tensor2D, RectifyError> {
    let shape = tensor.shape();
    let (rows, cols) = match shape.len() {
        0 => (1, 1),
        1 => (1, shape[0]),
        _ => (shape[0], shape[1..].iter().product()),
    };
    // `iter` walks in logical order, so this works for any memory layout.
    let data: Vec<f32> = tensor.iter().copied().collect();
    Ok(Array2::from_shape_vec((rows, cols), data)?)
}

/// Applies softmax to a vector of logits.
///
/// The maximum logit is subtracted first for numerical stability.
pub fn softmax(logits: &[f32]) -> Vec<f32> {
    if logits.is_empty() {
        return Vec::new();
    }
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|&l| (l - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}

/// Returns the index of the largest value, or `None` for an empty slice.
///
/// Ties resolve to the first index, and NaN values are never selected unless
/// every value is NaN.
pub fn argmax(values: &[f32]) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (i, &v) in values.iter().enumerate() {
        match best {
            None => best = Some((i, v)),
            Some((_, b)) if v > b || (b.is_nan() && !v.is_nan()) => best = Some((i, v)),
            _ => {}
        }
    }
    best.map(|(i, _)| i)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{ArrayD, IxDyn};

    #[test]
    fn test_flatten_keeps_leading_axis() {
        let t = ArrayD::from_shape_fn(IxDyn(&[2, 3, 4]), |ix| (ix[0] * 12 + ix[1] * 4 + ix[2]) as f32);
        let flat = flatten_to_2d(&t).unwrap();
        assert_eq!(flat.dim(), (2, 12));
        assert_eq!(flat[[1, 0]], 12.0);
        assert_eq!(flat[[1, 11]], 23.0);
    }

    #[test]
    fn test_flatten_promotes_vectors() {
        let t = ArrayD::from_shape_vec(IxDyn(&[5]), vec![1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();
        assert_eq!(flatten_to_2d(&t).unwrap().dim(), (1, 5));

        let scalar = ArrayD::from_elem(IxDyn(&[]), 7.0f32);
        assert_eq!(flatten_to_2d(&scalar).unwrap().dim(), (1, 1));
    }

    #[test]
    fn test_flatten_respects_logical_order_of_transposed_views() {
        let t = ArrayD::from_shape_vec(IxDyn(&[2, 3]), vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0])
            .unwrap()
            .reversed_axes();
        let flat = flatten_to_2d(&t).unwrap();
        assert_eq!(flat.dim(), (3, 2));
        assert_eq!(flat.row(0).to_vec(), vec![1.0, 4.0]);
    }

    #[test]
    fn test_softmax_sums_to_one() {
        let probs = softmax(&[2.0, 1.0, 0.1, -3.0, 0.0, 5.0]);
        let sum: f32 = probs.iter().sum();
        assert!((sum - 1.0).abs() < 1e-5);
        assert_eq!(argmax(&probs), Some(5));
    }

    #[test]
    fn test_softmax_is_stable_for_large_logits() {
        let probs = softmax(&[1000.0, 1000.0]);
        assert!((probs[0] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_argmax_edge_cases() {
        assert_eq!(argmax(&[]), None);
        assert_eq!(argmax(&[1.0, 3.0, 3.0]), Some(1));
        assert_eq!(argmax(&[f32::NAN, 0.5]), Some(1));
    }
}
