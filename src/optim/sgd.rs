//! Stochastic Gradient Descent optimizer

use ndarray::Array1;

use super::optimizer::{reject_sparse_gradients, OptimError, Optimizer, Result};
use crate::config::{self, ParamMap};
use crate::Tensor;

/// SGD optimizer with optional momentum
pub struct SGD {
    lr: f32,
    momentum: f32,
    velocities: Vec<Option<Array1<f32>>>,
}

impl SGD {
    /// Create a new SGD optimizer
    pub fn new(lr: f32, momentum: f32) -> Self {
        Self { lr, momentum, velocities: Vec::new() }
    }

    /// Create an SGD optimizer from a merged parameter map
    pub fn from_params(params: &ParamMap, explicit_lr: Option<f32>) -> Result<Self> {
        let lr = explicit_lr.unwrap_or_else(|| config::get_f32(params, "lr", 1e-2));
        let momentum = config::get_f32(params, "momentum", 0.0);
        if lr <= 0.0 {
            return Err(OptimError::InvalidHyperparameter {
                name: "lr",
                reason: format!("must be positive, got {lr}"),
            });
        }
        Ok(Self::new(lr, momentum))
    }

    /// Initialize velocities if needed
    fn ensure_velocities(&mut self, params: &[Tensor]) {
        if self.velocities.len() < params.len() {
            self.velocities.resize(params.len(), None);
        }
    }
}

impl Optimizer for SGD {
    fn step(&mut self, params: &mut [Tensor]) -> Result<()> {
        reject_sparse_gradients(params)?;
        self.ensure_velocities(params);

        for (i, param) in params.iter_mut().enumerate() {
            if let Some(grad) = param.grad() {
                if self.momentum > 0.0 {
                    // v = momentum * v - lr * grad
                    let velocity = if let Some(v) = &self.velocities[i] {
                        v * self.momentum - &grad * self.lr
                    } else {
                        &grad * (-self.lr)
                    };

                    *param.data_mut() = param.data() + &velocity;
                    self.velocities[i] = Some(velocity);
                } else {
                    // Simple SGD: param -= lr * grad
                    *param.data_mut() = param.data() - &(&grad * self.lr);
                }
            }
        }

        Ok(())
    }

    fn reset(&mut self) {
        for v in &mut self.velocities {
            *v = None;
        }
    }

    fn lr(&self) -> f32 {
        self.lr
    }

    fn set_lr(&mut self, lr: f32) {
        self.lr = lr;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::arr1;
    use serde_json::json;

    #[test]
    fn test_from_params_reads_momentum() {
        let params: ParamMap = [("momentum".to_string(), json!(0.9))].into_iter().collect();
        let opt = SGD::from_params(&params, Some(0.01)).unwrap();
        assert_eq!(opt.momentum, 0.9);
        assert_eq!(opt.lr(), 0.01);
    }

    #[test]
    fn test_plain_step() {
        let mut opt = SGD::new(0.1, 0.0);
        let mut params = vec![Tensor::from_vec(vec![1.0, 2.0])];
        params[0].set_grad(arr1(&[1.0, 1.0]));
        opt.step(&mut params).unwrap();

        assert_abs_diff_eq!(params[0].data()[0], 0.9, epsilon = 1e-6);
        assert_abs_diff_eq!(params[0].data()[1], 1.9, epsilon = 1e-6);
    }

    #[test]
    fn test_momentum_accumulates() {
        let mut opt = SGD::new(0.1, 0.9);
        let mut params = vec![Tensor::from_vec(vec![0.0])];
        for _ in 0..2 {
            params[0].set_grad(arr1(&[1.0]));
            opt.step(&mut params).unwrap();
        }
        // Step 1: v = -0.1; step 2: v = -0.19; total -0.29.
        assert_abs_diff_eq!(params[0].data()[0], -0.29, epsilon = 1e-6);
    }

    #[test]
    fn test_sparse_gradient_rejected() {
        let mut opt = SGD::new(0.1, 0.0);
        let mut params = vec![Tensor::from_vec(vec![1.0])];
        params[0].set_sparse_grad(arr1(&[1.0]));
        assert!(opt.step(&mut params).is_err());
        assert_eq!(params[0].data()[0], 1.0);
    }

    #[test]
    fn test_reset_clears_velocities() {
        let mut opt = SGD::new(0.1, 0.9);
        let mut params = vec![Tensor::from_vec(vec![0.0])];
        params[0].set_grad(arr1(&[1.0]));
        opt.step(&mut params).unwrap();
        assert!(opt.velocities[0].is_some());

        opt.reset();
        assert!(opt.velocities[0].is_none());
    }
}
