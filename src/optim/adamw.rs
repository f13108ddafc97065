//! AdamW optimizer (Adam with decoupled Weight decay)

use ndarray::Array1;

use super::optimizer::{reject_sparse_gradients, OptimError, Optimizer, Result};
use crate::config::{self, ParamMap};
use crate::Tensor;

/// AdamW optimizer
///
/// AdamW decouples weight decay from the gradient-based update. Instead of
/// adding weight decay to the gradient, it applies weight decay directly to
/// the parameters:
///
/// θ_t = (1 - lr * λ) * θ_{t-1} - lr_t * m_t / (√v_t + ε)
pub struct AdamW {
    lr: f32,
    beta1: f32,
    beta2: f32,
    epsilon: f32,
    weight_decay: f32,
    t: u64,
    m: Vec<Option<Array1<f32>>>, // First moment
    v: Vec<Option<Array1<f32>>>, // Second moment
}

impl AdamW {
    /// Create a new AdamW optimizer
    pub fn new(lr: f32, beta1: f32, beta2: f32, epsilon: f32, weight_decay: f32) -> Self {
        Self { lr, beta1, beta2, epsilon, weight_decay, t: 0, m: Vec::new(), v: Vec::new() }
    }

    /// Create an AdamW optimizer from a merged parameter map
    pub fn from_params(params: &ParamMap, explicit_lr: Option<f32>) -> Result<Self> {
        let lr = explicit_lr.unwrap_or_else(|| config::get_f32(params, "lr", 1e-3));
        let (beta1, beta2) = config::get_betas(params, (0.9, 0.999));
        let epsilon = config::get_f32(params, "eps", 1e-8);
        let weight_decay = config::get_f32(params, "weight_decay", 0.01);
        if lr <= 0.0 {
            return Err(OptimError::InvalidHyperparameter {
                name: "lr",
                reason: format!("must be positive, got {lr}"),
            });
        }
        Ok(Self::new(lr, beta1, beta2, epsilon, weight_decay))
    }

    /// Optimizer step counter
    #[must_use]
    pub fn step_count(&self) -> u64 {
        self.t
    }

    /// Initialize moments if needed
    fn ensure_moments(&mut self, params: &[Tensor]) {
        if self.m.len() < params.len() {
            self.m.resize(params.len(), None);
            self.v.resize(params.len(), None);
        }
    }
}

impl Optimizer for AdamW {
    fn step(&mut self, params: &mut [Tensor]) -> Result<()> {
        reject_sparse_gradients(params)?;
        self.ensure_moments(params);
        self.t += 1;

        // Bias correction factors
        let lr_t = self.lr
            * ((1.0 - self.beta2.powi(self.t as i32)).sqrt()
                / (1.0 - self.beta1.powi(self.t as i32)));

        for (i, param) in params.iter_mut().enumerate() {
            if let Some(grad) = param.grad() {
                // m_t = β1 * m_{t-1} + (1 - β1) * g
                let m_t = if let Some(m) = &self.m[i] {
                    m * self.beta1 + &grad * (1.0 - self.beta1)
                } else {
                    &grad * (1.0 - self.beta1)
                };

                // v_t = β2 * v_{t-1} + (1 - β2) * g²
                let grad_sq = &grad * &grad;
                let v_t = if let Some(v) = &self.v[i] {
                    v * self.beta2 + &grad_sq * (1.0 - self.beta2)
                } else {
                    &grad_sq * (1.0 - self.beta2)
                };

                let adaptive_update = &m_t / &(v_t.mapv(f32::sqrt) + self.epsilon) * lr_t;

                // Apply weight decay directly to parameters (decoupled)
                let weight_decay_factor = 1.0 - self.lr * self.weight_decay;
                *param.data_mut() = param.data() * weight_decay_factor - &adaptive_update;

                self.m[i] = Some(m_t);
                self.v[i] = Some(v_t);
            }
        }

        Ok(())
    }

    fn reset(&mut self) {
        self.t = 0;
        for m in &mut self.m {
            *m = None;
        }
        for v in &mut self.v {
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
    use ndarray::arr1;
    use serde_json::json;

    #[test]
    fn test_from_params_defaults() {
        let opt = AdamW::from_params(&ParamMap::new(), Some(0.001)).unwrap();
        assert_eq!(opt.lr(), 0.001);
        assert_eq!(opt.weight_decay, 0.01);
    }

    #[test]
    fn test_from_params_rejects_bad_lr() {
        let params: ParamMap = [("lr".to_string(), json!(-0.1))].into_iter().collect();
        assert!(AdamW::from_params(&params, None).is_err());
    }

    #[test]
    fn test_step_moves_against_gradient() {
        let mut opt = AdamW::new(0.1, 0.9, 0.999, 1e-8, 0.0);
        let mut params = vec![Tensor::from_vec(vec![1.0, -1.0])];
        params[0].set_grad(arr1(&[1.0, -1.0]));
        opt.step(&mut params).unwrap();

        assert!(params[0].data()[0] < 1.0);
        assert!(params[0].data()[1] > -1.0);
        assert_eq!(opt.step_count(), 1);
    }

    #[test]
    fn test_weight_decay_shrinks_params() {
        let mut opt = AdamW::new(0.1, 0.9, 0.999, 1e-8, 0.5);
        let mut params = vec![Tensor::from_vec(vec![10.0])];
        params[0].set_grad(arr1(&[0.0]));
        opt.step(&mut params).unwrap();
        // Zero gradient: the only movement is the decoupled decay.
        assert!(params[0].data()[0] < 10.0);
    }

    #[test]
    fn test_sparse_gradient_rejected() {
        let mut opt = AdamW::new(0.1, 0.9, 0.999, 1e-8, 0.0);
        let mut params = vec![Tensor::from_vec(vec![1.0])];
        params[0].set_sparse_grad(arr1(&[1.0]));
        assert!(opt.step(&mut params).is_err());
        assert_eq!(params[0].data()[0], 1.0);
    }

    #[test]
    fn test_reset_clears_moments() {
        let mut opt = AdamW::new(0.1, 0.9, 0.999, 1e-8, 0.0);
        let mut params = vec![Tensor::from_vec(vec![1.0])];
        params[0].set_grad(arr1(&[1.0]));
        opt.step(&mut params).unwrap();
        assert!(opt.m[0].is_some());

        opt.reset();
        assert_eq!(opt.step_count(), 0);
        assert!(opt.m[0].is_none());
        assert!(opt.v[0].is_none());
    }

    #[test]
    fn test_quadratic_convergence() {
        let mut opt = AdamW::new(0.1, 0.9, 0.999, 1e-8, 0.0);
        let mut params = vec![Tensor::from_vec(vec![3.0, -2.0])];
        for _ in 0..500 {
            let grad = params[0].data().mapv(|x| 2.0 * x);
            params[0].set_grad(grad);
            opt.step(&mut params).unwrap();
        }
        for &x in params[0].data() {
            assert!(x.abs() < 0.15, "did not converge: {x}");
        }
    }
}
