//! Predict-style estimator artifacts.
//!
//! Estimators are stored as JSON documents tagged with an `"estimator"` key:
//!
//! ```json
//! {
//!   "estimator": "linear_classifier",
//!   "coef": [[0.5, -0.25], [0.1, 0.9]],
//!   "intercept": [0.0, 0.1],
//!   "classes": [0, 1]
//! }
//! ```
//!
//! `predict` takes a `(samples, features)` matrix, like a scikit-learn estimator.

use crate::core::{RectifyError, RectifyResult, SimpleError, Tensor2D, TensorD};
use crate::utils::argmax;
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

/// Serialized form of an estimator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "estimator", rename_all = "snake_case")]
pub enum EstimatorSpec {
    /// Affine regressor: `x · coefᵀ + intercept`.
    LinearRegression {
        /// Weight matrix, one row per output.
        coef: Vec<Vec<f32>>,
        /// Bias per output. Empty means zero bias.
        #[serde(default)]
        intercept: Vec<f32>,
    },
    /// Linear classifier returning class labels.
    LinearClassifier {
        /// Weight matrix, one row per class (or a single row for binary decisions).
        coef: Vec<Vec<f32>>,
        /// Bias per row of `coef`. Empty means zero bias.
        #[serde(default)]
        intercept: Vec<f32>,
        /// Label per class index. Defaults to the class index itself.
        #[serde(default)]
        classes: Option<Vec<f32>>,
    },
}

/// What an estimator returns from `predict`.
#[derive(Debug, Clone, PartialEq)]
pub enum EstimatorMode {
    /// Continuous outputs.
    Regressor,
    /// Discrete labels.
    Classifier {
        /// Label per class index.
        classes: Vec<f32>,
    },
}

/// A loaded predict-style estimator.
#[derive(Debug, Clone)]
pub struct EstimatorArtifact {
    name: String,
    coef: Tensor2D,
    intercept: Array1<f32>,
    mode: EstimatorMode,
}

impl EstimatorArtifact {
    /// Parses an estimator from its JSON definition.
    pub fn from_json(name: impl Into<String>, bytes: &[u8]) -> RectifyResult<Self> {
        let spec: EstimatorSpec = serde_json::from_slice(bytes).map_err(|e| {
            RectifyError::invalid_input(format!("invalid estimator definition: {e}"))
        })?;
        Self::from_spec(name, spec)
    }

    /// Builds an estimator from its serialized form, validating shapes.
    pub fn from_spec(name: impl Into<String>, spec: EstimatorSpec) -> RectifyResult<Self> {
        let name = name.into();
        let (coef, intercept, classes) = match spec {
            EstimatorSpec::LinearRegression { coef, intercept } => (coef, intercept, None),
            EstimatorSpec::LinearClassifier {
                coef,
                intercept,
                classes,
            } => (coef, intercept, Some(classes)),
        };

        let rows = coef.len();
        let cols = coef.first().map(Vec::len).unwrap_or(0);
        if rows == 0 || cols == 0 {
            return Err(RectifyError::invalid_input(format!(
                "estimator '{name}' has an empty coefficient matrix"
            )));
        }
        if let Some(bad) = coef.iter().position(|row| row.len() != cols) {
            return Err(RectifyError::invalid_input(format!(
                "estimator '{name}' coefficient row {bad} has {} values, expected {cols}",
                coef[bad].len()
            )));
        }
        let intercept = if intercept.is_empty() {
            Array1::zeros(rows)
        } else if intercept.len() == rows {
            Array1::from(intercept)
        } else {
            return Err(RectifyError::invalid_input(format!(
                "estimator '{name}' has {} intercepts for {rows} coefficient rows",
                intercept.len()
            )));
        };

        let mode = match classes {
            None => EstimatorMode::Regressor,
            Some(classes) => {
                let expected = if rows == 1 { 2 } else { rows };
                let classes = classes.unwrap_or_else(|| (0..expected).map(|i| i as f32).collect());
                if classes.len() != expected {
                    return Err(RectifyError::invalid_input(format!(
                        "estimator '{name}' declares {} classes, expected {expected}",
                        classes.len()
                    )));
                }
                EstimatorMode::Classifier { classes }
            }
        };

        let flat: Vec<f32> = coef.into_iter().flatten().collect();
        let coef = Array2::from_shape_vec((rows, cols), flat)?;
        Ok(Self {
            name,
            coef,
            intercept,
            mode,
        })
    }

    /// Name of the estimator, usually the artifact file stem.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of features each sample must have.
    pub fn n_features(&self) -> usize {
        self.coef.ncols()
    }

    /// Returns whether this estimator regresses or classifies.
    pub fn mode(&self) -> &EstimatorMode {
        &self.mode
    }

    /// Runs the estimator on a `(samples, features)` matrix.
    ///
    /// Regressors with a single output and classifiers return one value per
    /// sample (a rank-1 array); multi-output regressors return
    /// `(samples, outputs)`.
    pub fn predict(&self, x: &Tensor2D) -> RectifyResult<TensorD> {
        if x.ncols() != self.n_features() {
            return Err(RectifyError::inference(
                &self.name,
                "predict",
                SimpleError::new(format!(
                    "X has {} features, but estimator is expecting {} features as input",
                    x.ncols(),
                    self.n_features()
                )),
            ));
        }

        let scores = x.dot(&self.coef.t()) + &self.intercept;

        let output = match &self.mode {
            EstimatorMode::Regressor if scores.ncols() == 1 => {
                scores.index_axis(Axis(1), 0).to_owned().into_dyn()
            }
            EstimatorMode::Regressor => scores.into_dyn(),
            EstimatorMode::Classifier { classes } if scores.ncols() == 1 => scores
                .column(0)
                .mapv(|s| if s > 0.0 { classes[1] } else { classes[0] })
                .into_dyn(),
            EstimatorMode::Classifier { classes } => scores
                .outer_iter()
                .map(|row| {
                    let scores = row.to_vec();
                    argmax(&scores).map(|i| classes[i]).unwrap_or(classes[0])
                })
                .collect::<Array1<f32>>()
                .into_dyn(),
        };
        Ok(output)
    }
}
