//! Optimizer capability interface

use thiserror::Error;

use crate::Tensor;

/// Errors raised by optimizer construction and stepping
#[derive(Debug, Error)]
pub enum OptimError {
    #[error("Invalid hyperparameter '{name}': {reason}")]
    InvalidHyperparameter { name: &'static str, reason: String },

    #[error("Sparse gradient on parameter {index}: this optimizer requires dense gradients")]
    UnsupportedGradientLayout { index: usize },
}

/// Result alias for optimizer operations
pub type Result<T> = std::result::Result<T, OptimError>;

/// Trait for optimization algorithms
///
/// This is the full surface the wrapper relies on; anything an engine offers
/// beyond it (moment accessors, step counters) lives on the concrete type.
pub trait Optimizer {
    /// Perform a single optimization step over the parameter slice
    ///
    /// Parameters without a gradient are skipped. A sparse gradient anywhere
    /// in the slice fails with [`OptimError::UnsupportedGradientLayout`]
    /// before any parameter or state buffer is mutated.
    fn step(&mut self, params: &mut [Tensor]) -> Result<()>;

    /// Zero out all gradients
    fn zero_grad(&mut self, params: &mut [Tensor]) {
        for param in params {
            param.zero_grad();
        }
    }

    /// Drop all accumulated per-parameter state and the step counter
    fn reset(&mut self);

    /// Get learning rate
    fn lr(&self) -> f32;

    /// Set learning rate
    fn set_lr(&mut self, lr: f32);
}

/// Fail-fast gradient layout check shared by the dense-only engines
///
/// Runs before any state allocation or parameter mutation, so a failing step
/// leaves every parameter and buffer untouched.
pub(crate) fn reject_sparse_gradients(params: &[Tensor]) -> Result<()> {
    for (index, param) in params.iter().enumerate() {
        if param.has_sparse_grad() {
            return Err(OptimError::UnsupportedGradientLayout { index });
        }
    }
    Ok(())
}
