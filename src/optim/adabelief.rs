//! AdaBelief optimizer
//!
//! Adam-family optimizer that adapts the step size to the "belief" in the
//! gradient: the second moment tracks the variance of the gradient around its
//! running mean rather than the raw squared gradient. With the residual
//! `s = g - m` the update is
//!
//! `θ_t = θ_{t-1} - lr * m_t / (√v_t + ε)` where `v_t = β2*v_{t-1} + (1-β2)*s²+ε`
//!
//! Optional behaviors, all preset-driven: decoupled or coupled weight decay
//! (with a fixed-decay variant), RAdam-style rectification with SGD
//! degeneration below the SMA threshold, AMS-bound denominators, AdaNorm
//! gradient normalization, and Adam debiasing of the step size.

use ndarray::Array1;

use super::optimizer::{reject_sparse_gradients, OptimError, Optimizer, Result};
use crate::config::{self, ParamMap};
use crate::Tensor;

/// Hyperparameters for [`AdaBelief`]
#[derive(Debug, Clone, PartialEq)]
pub struct AdaBeliefConfig {
    pub lr: f32,
    pub betas: (f32, f32),
    pub weight_decay: f32,
    pub weight_decouple: bool,
    pub fixed_decay: bool,
    pub rectify: bool,
    pub n_sma_threshold: u32,
    pub degenerated_to_sgd: bool,
    pub ams_bound: bool,
    pub r: f32,
    pub adanorm: bool,
    pub adam_debias: bool,
    pub eps: f32,
}

impl Default for AdaBeliefConfig {
    fn default() -> Self {
        Self {
            lr: 1e-3,
            betas: (0.9, 0.999),
            weight_decay: 0.0,
            weight_decouple: true,
            fixed_decay: false,
            rectify: false,
            n_sma_threshold: 5,
            degenerated_to_sgd: true,
            ams_bound: false,
            r: 0.95,
            adanorm: false,
            adam_debias: false,
            eps: 1e-16,
        }
    }
}

impl AdaBeliefConfig {
    /// Parse a merged configuration, with `explicit_lr` taking priority
    /// over any `lr` entry in the map
    pub fn from_params(params: &ParamMap, explicit_lr: Option<f32>) -> Result<Self> {
        let defaults = Self::default();
        let cfg = Self {
            lr: explicit_lr.unwrap_or_else(|| config::get_f32(params, "lr", defaults.lr)),
            betas: config::get_betas(params, defaults.betas),
            weight_decay: config::get_f32(params, "weight_decay", defaults.weight_decay),
            weight_decouple: config::get_bool(params, "weight_decouple", defaults.weight_decouple),
            fixed_decay: config::get_bool(params, "fixed_decay", defaults.fixed_decay),
            rectify: config::get_bool(params, "rectify", defaults.rectify),
            n_sma_threshold: config::get_u32(params, "n_sma_threshold", defaults.n_sma_threshold),
            degenerated_to_sgd: config::get_bool(
                params,
                "degenerated_to_sgd",
                defaults.degenerated_to_sgd,
            ),
            ams_bound: config::get_bool(params, "ams_bound", defaults.ams_bound),
            r: config::get_f32(params, "r", defaults.r),
            adanorm: config::get_bool(params, "adanorm", defaults.adanorm),
            adam_debias: config::get_bool(params, "adam_debias", defaults.adam_debias),
            eps: config::get_f32(params, "eps", defaults.eps),
        };
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> Result<()> {
        if self.lr <= 0.0 {
            return Err(OptimError::InvalidHyperparameter {
                name: "lr",
                reason: format!("must be positive, got {}", self.lr),
            });
        }
        for (name, beta) in [("betas[0]", self.betas.0), ("betas[1]", self.betas.1)] {
            if !(0.0..1.0).contains(&beta) {
                return Err(OptimError::InvalidHyperparameter {
                    name,
                    reason: format!("must be in [0, 1), got {beta}"),
                });
            }
        }
        if self.weight_decay < 0.0 {
            return Err(OptimError::InvalidHyperparameter {
                name: "weight_decay",
                reason: format!("must be non-negative, got {}", self.weight_decay),
            });
        }
        if self.eps < 0.0 {
            return Err(OptimError::InvalidHyperparameter {
                name: "eps",
                reason: format!("must be non-negative, got {}", self.eps),
            });
        }
        Ok(())
    }
}

/// Per-parameter moment buffers, allocated lazily on first step
///
/// The optional buffers are allocated together with the mandatory ones when
/// the corresponding feature is enabled, so a state record is always complete
/// for its configuration, never partial.
#[derive(Debug, Clone)]
struct ParamState {
    exp_avg: Array1<f32>,
    exp_avg_var: Array1<f32>,
    /// EMA of gradient norms, present iff adanorm is on
    exp_grad_norm: Option<f32>,
    /// Running element-wise max of `exp_avg_var`, present iff ams_bound is on
    max_exp_avg_var: Option<Array1<f32>>,
}

impl ParamState {
    fn zeros(len: usize, cfg: &AdaBeliefConfig) -> Self {
        Self {
            exp_avg: Array1::zeros(len),
            exp_avg_var: Array1::zeros(len),
            exp_grad_norm: cfg.adanorm.then_some(0.0),
            max_exp_avg_var: cfg.ams_bound.then(|| Array1::zeros(len)),
        }
    }
}

/// AdaBelief optimizer
#[derive(Debug)]
pub struct AdaBelief {
    cfg: AdaBeliefConfig,
    t: u64,
    state: Vec<Option<ParamState>>,
}

impl AdaBelief {
    /// Create an AdaBelief optimizer from a full configuration
    pub fn new(cfg: AdaBeliefConfig) -> Self {
        Self { cfg, t: 0, state: Vec::new() }
    }

    /// Create an AdaBelief optimizer from a merged parameter map
    pub fn from_params(params: &ParamMap, explicit_lr: Option<f32>) -> Result<Self> {
        Ok(Self::new(AdaBeliefConfig::from_params(params, explicit_lr)?))
    }

    /// Hyperparameters in effect
    pub fn config(&self) -> &AdaBeliefConfig {
        &self.cfg
    }

    /// Optimizer step counter
    #[must_use]
    pub fn step_count(&self) -> u64 {
        self.t
    }

    /// First moment buffer for parameter `idx`, if it has been stepped
    #[must_use]
    pub fn first_moment(&self, idx: usize) -> Option<&Array1<f32>> {
        self.state.get(idx)?.as_ref().map(|s| &s.exp_avg)
    }

    /// Second moment (variance) buffer for parameter `idx`
    #[must_use]
    pub fn second_moment(&self, idx: usize) -> Option<&Array1<f32>> {
        self.state.get(idx)?.as_ref().map(|s| &s.exp_avg_var)
    }

    /// Running max of the second moment for parameter `idx` (AMS-bound only)
    #[must_use]
    pub fn max_second_moment(&self, idx: usize) -> Option<&Array1<f32>> {
        self.state.get(idx)?.as_ref().and_then(|s| s.max_exp_avg_var.as_ref())
    }

    fn ensure_state_slots(&mut self, params: &[Tensor]) {
        if self.state.len() < params.len() {
            self.state.resize_with(params.len(), || None);
        }
    }

    /// Effective step size and SMA length for the current step
    ///
    /// Without rectification the step size is just the learning rate. With
    /// rectification the step size follows the RAdam schedule: below the SMA
    /// threshold it degenerates to a plain SGD step (or to a skipped update
    /// when `degenerated_to_sgd` is off), at or above it the rectified
    /// multiplier applies.
    fn rectified_step_size(&self) -> (f32, f32) {
        if !self.cfg.rectify {
            return (self.cfg.lr, 0.0);
        }

        let beta2 = self.cfg.betas.1;
        let beta2_t = beta2.powi(self.t as i32);
        let n_sma_max = 2.0 / (1.0 - beta2) - 1.0;
        let n_sma = n_sma_max - 2.0 * self.t as f32 * beta2_t / (1.0 - beta2_t);

        let rt = if n_sma >= self.cfg.n_sma_threshold as f32 {
            ((1.0 - beta2_t) * (n_sma - 4.0) / (n_sma_max - 4.0) * (n_sma - 2.0) / n_sma
                * n_sma_max
                / (n_sma_max - 2.0))
                .sqrt()
        } else if self.cfg.degenerated_to_sgd {
            1.0
        } else {
            -1.0
        };

        (self.cfg.lr * rt, n_sma)
    }
}

impl Optimizer for AdaBelief {
    fn step(&mut self, params: &mut [Tensor]) -> Result<()> {
        reject_sparse_gradients(params)?;
        self.ensure_state_slots(params);
        self.t += 1;

        let (beta1, beta2) = self.cfg.betas;
        let bias_correction1 = 1.0 - beta1.powi(self.t as i32);
        let bias_correction2_sq = (1.0 - beta2.powi(self.t as i32)).sqrt();

        let (mut step_size, n_sma) = self.rectified_step_size();
        if !self.cfg.adam_debias {
            step_size /= bias_correction1;
        }
        log::trace!(
            "adabelief step {}: step_size={step_size}, n_sma={n_sma}, bc1={bias_correction1}, bc2_sq={bias_correction2_sq}",
            self.t
        );

        for (i, param) in params.iter_mut().enumerate() {
            let Some(mut grad) = param.grad() else {
                continue;
            };

            if self.state[i].is_none() {
                self.state[i] = Some(ParamState::zeros(param.len(), &self.cfg));
            }
            let state = self.state[i].as_mut().expect("state initialized above");

            // Weight decay: decoupled scales the parameter out-of-place,
            // coupled folds the decay term into the gradient.
            if self.cfg.weight_decay > 0.0 {
                if self.cfg.weight_decouple {
                    let decay = if self.cfg.fixed_decay { 1.0 } else { self.cfg.lr };
                    *param.data_mut() = param.data() * (1.0 - self.cfg.weight_decay * decay);
                } else {
                    grad = &grad + &(param.data() * self.cfg.weight_decay);
                }
            }

            // AdaNorm scales the gradient up to the EMA of gradient norms
            // when the current norm falls below it.
            let s_grad = if self.cfg.adanorm {
                let exp_grad_norm =
                    state.exp_grad_norm.as_mut().expect("adanorm state allocated with buffers");
                let norm = grad.mapv(|g| g * g).sum().sqrt();
                *exp_grad_norm = self.cfg.r * *exp_grad_norm + (1.0 - self.cfg.r) * norm;
                if *exp_grad_norm > norm && norm > 0.0 {
                    &grad * (*exp_grad_norm / norm)
                } else {
                    grad.clone()
                }
            } else {
                grad.clone()
            };

            // m_t = β1 * m_{t-1} + (1 - β1) * g
            state.exp_avg *= beta1;
            state.exp_avg.scaled_add(1.0 - beta1, &s_grad);

            // v_t = β2 * v_{t-1} + (1 - β2) * (g - m_t)² + ε
            // The residual is taken against the raw gradient, and ε lands in
            // the accumulator itself, which floors the denominator even under
            // the AMS running max.
            let residual = &grad - &state.exp_avg;
            state.exp_avg_var *= beta2;
            state.exp_avg_var.scaled_add(1.0 - beta2, &(&residual * &residual));
            state.exp_avg_var += self.cfg.eps;

            let mut de_nom: Array1<f32> = if self.cfg.ams_bound {
                let max_var = state
                    .max_exp_avg_var
                    .as_mut()
                    .expect("ams_bound state allocated with buffers");
                max_var.zip_mut_with(&state.exp_avg_var, |m, &v| *m = m.max(v));
                max_var.mapv(|v| (v + self.cfg.eps).sqrt() + self.cfg.eps)
            } else {
                state.exp_avg_var.mapv(|v| (v + self.cfg.eps).sqrt() + self.cfg.eps)
            };

            if !self.cfg.rectify {
                de_nom /= bias_correction2_sq;
                *param.data_mut() -= &(&state.exp_avg / &de_nom * step_size);
            } else if n_sma >= self.cfg.n_sma_threshold as f32 {
                *param.data_mut() -= &(&state.exp_avg / &de_nom * step_size);
            } else if step_size > 0.0 {
                *param.data_mut() -= &(&state.exp_avg * step_size);
            }
        }

        Ok(())
    }

    fn reset(&mut self) {
        self.t = 0;
        for slot in &mut self.state {
            *slot = None;
        }
    }

    fn lr(&self) -> f32 {
        self.cfg.lr
    }

    fn set_lr(&mut self, lr: f32) {
        self.cfg.lr = lr;
    }
}
