//! Opaque callables.
//!
//! An opaque artifact is anything that is neither an estimator definition nor
//! an ONNX graph. It is driven through [`CallableArtifact::call`] on a best
//! effort basis; the pipeline passes the stage input through unchanged when the
//! call fails.

use super::loader::ArtifactFormat;
use crate::core::{ComputeTarget, RectifyError, RectifyResult, TensorD};
use std::fmt;
use std::path::{Path, PathBuf};

/// A model object that can only be invoked as a plain function.
pub trait CallableArtifact: Send + Sync + fmt::Debug {
    /// Invokes the artifact on a tensor.
    fn call(&self, input: &TensorD) -> RectifyResult<TensorD>;

    /// Short human readable description, used in logs.
    fn describe(&self) -> String;

    /// Switches the artifact into evaluation mode.
    ///
    /// Returns `false` when the artifact has no such mode.
    fn eval(&mut self) -> bool {
        false
    }

    /// Moves the artifact onto a compute target.
    ///
    /// Returns `Ok(false)` when the artifact has no notion of a compute target.
    fn migrate(&mut self, target: &ComputeTarget) -> RectifyResult<bool> {
        let _ = target;
        Ok(false)
    }
}

/// Wraps a closure as a [`CallableArtifact`].
pub struct FnCallable<F> {
    name: String,
    func: F,
}

impl<F> FnCallable<F>
where
    F: Fn(&TensorD) -> RectifyResult<TensorD> + Send + Sync,
{
    /// Creates a named callable from a closure.
    pub fn new(name: impl Into<String>, func: F) -> Self {
        Self {
            name: name.into(),
            func,
        }
    }
}

impl<F> fmt::Debug for FnCallable<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnCallable")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl<F> CallableArtifact for FnCallable<F>
where
    F: Fn(&TensorD) -> RectifyResult<TensorD> + Send + Sync,
{
    fn call(&self, input: &TensorD) -> RectifyResult<TensorD> {
        (self.func)(input)
    }

    fn describe(&self) -> String {
        format!("fn:{}", self.name)
    }
}

/// A serialized object in a format this crate cannot execute, such as a
/// Python pickle or a TorchScript archive.
///
/// Loading succeeds so the pipeline can still run, but every call fails.
#[derive(Debug, Clone)]
pub struct UnsupportedPayload {
    path: PathBuf,
    format: ArtifactFormat,
    size: usize,
}

impl UnsupportedPayload {
    pub(crate) fn new(path: &Path, format: ArtifactFormat, size: usize) -> Self {
        Self {
            path: path.to_path_buf(),
            format,
            size,
        }
    }

    /// Detected payload format.
    pub fn format(&self) -> ArtifactFormat {
        self.format
    }

    /// Path the payload was read from.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CallableArtifact for UnsupportedPayload {
    fn call(&self, _input: &TensorD) -> RectifyResult<TensorD> {
        Err(RectifyError::invalid_input(format!(
            "{} payload {} ({} bytes) cannot be invoked natively",
            self.format,
            self.path.display(),
            self.size
        )))
    }

    fn describe(&self) -> String {
        format!("{} payload ({} bytes)", self.format, self.size)
    }
}
