//! Optimizer wrapper
//!
//! Composes the configuration resolver and the implementation registry into
//! one construction path: resolve the preset, overlay overrides, pick the
//! enhanced or standard engine, and build it with the explicit learning rate
//! when the engine accepts one. Construction records a usage event to the
//! history backend (best-effort) and logs a human-readable summary.
//!
//! The wrapper drives the engine through the [`Optimizer`] trait only; there
//! is no pass-through to implementation-specific surface.

use serde_json::json;
use thiserror::Error;

use crate::config::{self, ConfigError, ParamMap, PresetSource, PresetStore, PresetTable};
use crate::history::{HistoryBackend, HistoryEntry};
use crate::optim::{OptimError, Optimizer};
use crate::registry::{OptimizerRegistry, RegistryError};
use crate::Tensor;

/// Default preset label when the caller names none
pub const DEFAULT_PRESET: &str = "consumer";

/// Default explicit learning rate
pub const DEFAULT_LR: f32 = 1e-3;

/// Wrapper construction and stepping errors
#[derive(Debug, Error)]
pub enum WrapperError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("Failed to initialize optimizer '{optimizer_id}': {source}")]
    OptimizerInit {
        optimizer_id: String,
        #[source]
        source: OptimError,
    },
}

/// Result alias for wrapper operations
pub type Result<T> = std::result::Result<T, WrapperError>;

/// Builder for [`OptimizerWrapper`]
pub struct WrapperBuilder<'a> {
    optimizer_id: String,
    preset_label: String,
    lr: f32,
    overrides: ParamMap,
    inline_presets: Option<&'a PresetTable>,
    history: Option<&'a dyn HistoryBackend>,
}

impl<'a> WrapperBuilder<'a> {
    /// Start building a wrapper for the given optimizer id
    pub fn new(optimizer_id: &str) -> Self {
        Self {
            optimizer_id: optimizer_id.to_string(),
            preset_label: DEFAULT_PRESET.to_string(),
            lr: DEFAULT_LR,
            overrides: ParamMap::new(),
            inline_presets: None,
            history: None,
        }
    }

    /// Use a preset label other than `consumer`
    pub fn preset(mut self, label: &str) -> Self {
        self.preset_label = label.to_string();
        self
    }

    /// Explicit learning rate (defaults to 1e-3)
    pub fn lr(mut self, lr: f32) -> Self {
        self.lr = lr;
        self
    }

    /// Override one configuration option; overrides win over the preset
    pub fn override_param(mut self, key: &str, value: serde_json::Value) -> Self {
        self.overrides.insert(key.to_string(), value);
        self
    }

    /// Use a caller-supplied preset table instead of the named store lookup
    pub fn inline_presets(mut self, table: &'a PresetTable) -> Self {
        self.inline_presets = Some(table);
        self
    }

    /// Record construction to this history backend (best-effort)
    pub fn history(mut self, backend: &'a dyn HistoryBackend) -> Self {
        self.history = Some(backend);
        self
    }

    /// Resolve configuration and implementation, then construct the engine
    pub fn build(
        self,
        registry: &OptimizerRegistry,
        store: &PresetStore,
    ) -> Result<OptimizerWrapper> {
        log::debug!(
            "loading configuration for optimizer '{}' with preset '{}'",
            self.optimizer_id,
            self.preset_label
        );

        let source = match self.inline_presets {
            Some(table) => PresetSource::Inline(table),
            None => PresetSource::Named(&self.optimizer_id),
        };
        let merged =
            config::resolve_config(store, source, &self.preset_label, &self.overrides, Some(self.lr))?;

        // An lr placed in the overrides is deliberate and wins over the
        // builder's explicit value.
        let effective_lr = config::get_f32(&merged, "lr", self.lr);

        let (entry, is_enhanced) = registry.resolve_implementation(&self.optimizer_id)?;
        let lr_arg = entry.accepts_lr.then_some(effective_lr);

        let inner = (entry.factory)(&merged, lr_arg).map_err(|source| {
            log::error!("failed to initialize optimizer '{}': {source}", self.optimizer_id);
            WrapperError::OptimizerInit { optimizer_id: self.optimizer_id.clone(), source }
        })?;

        let wrapper = OptimizerWrapper {
            optimizer_id: self.optimizer_id,
            preset_label: self.preset_label,
            effective_lr: entry.accepts_lr.then_some(effective_lr),
            is_enhanced,
            params: merged,
            inner,
        };

        wrapper.log_details();
        log::info!(
            "optimizer '{}' initialized with preset '{}'",
            wrapper.optimizer_id,
            wrapper.preset_label
        );
        if let Some(backend) = self.history {
            wrapper.record_history(backend);
        }

        Ok(wrapper)
    }
}

/// A constructed optimizer with its resolved configuration
pub struct OptimizerWrapper {
    optimizer_id: String,
    preset_label: String,
    /// The learning rate passed to the engine, `None` when it takes none
    effective_lr: Option<f32>,
    is_enhanced: bool,
    params: ParamMap,
    inner: Box<dyn Optimizer>,
}

impl std::fmt::Debug for OptimizerWrapper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OptimizerWrapper")
            .field("optimizer_id", &self.optimizer_id)
            .field("preset_label", &self.preset_label)
            .field("effective_lr", &self.effective_lr)
            .field("is_enhanced", &self.is_enhanced)
            .finish_non_exhaustive()
    }
}

impl OptimizerWrapper {
    /// Shorthand for `WrapperBuilder::new`
    pub fn builder<'a>(optimizer_id: &str) -> WrapperBuilder<'a> {
        WrapperBuilder::new(optimizer_id)
    }

    /// Perform one optimization step
    pub fn step(&mut self, params: &mut [Tensor]) -> std::result::Result<(), OptimError> {
        self.inner.step(params)
    }

    /// Perform one step after recomputing the loss through `closure`
    ///
    /// The closure runs synchronously before the update and its value is
    /// returned as the step result.
    pub fn step_with<F>(
        &mut self,
        params: &mut [Tensor],
        mut closure: F,
    ) -> std::result::Result<f32, OptimError>
    where
        F: FnMut() -> f32,
    {
        let loss = closure();
        self.inner.step(params)?;
        Ok(loss)
    }

    /// Zero the gradients of all parameters
    pub fn zero_grad(&mut self, params: &mut [Tensor]) {
        self.inner.zero_grad(params);
    }

    /// Drop all accumulated optimizer state
    pub fn reset(&mut self) {
        self.inner.reset();
    }

    /// Current learning rate of the engine
    pub fn lr(&self) -> f32 {
        self.inner.lr()
    }

    /// Change the engine's learning rate
    pub fn set_lr(&mut self, lr: f32) {
        self.inner.set_lr(lr);
    }

    /// Whether the enhanced variant was selected
    pub fn is_enhanced(&self) -> bool {
        self.is_enhanced
    }

    /// The optimizer id this wrapper was constructed for
    pub fn optimizer_id(&self) -> &str {
        &self.optimizer_id
    }

    /// The preset label in effect
    pub fn preset_label(&self) -> &str {
        &self.preset_label
    }

    /// The merged configuration the engine was built with
    pub fn params(&self) -> &ParamMap {
        &self.params
    }

    fn log_details(&self) {
        let name = if self.is_enhanced {
            format!("{} (enhanced)", self.optimizer_id)
        } else {
            self.optimizer_id.clone()
        };
        let lr = self
            .effective_lr
            .map_or_else(|| "N/A".to_string(), |lr| lr.to_string());
        log::info!("{}", "=".repeat(50));
        log::info!("optimizer: {name}");
        log::info!("preset: {}", self.preset_label);
        log::info!("learning rate: {lr}");
        log::info!("parameters: {:?}", self.params);
        log::info!("{}", "=".repeat(50));
    }

    /// Fire-and-forget usage record; a failing backend is logged, never
    /// propagated.
    fn record_history(&self, backend: &dyn HistoryBackend) {
        let mut params = self.params.clone();
        if let Some(lr) = self.effective_lr {
            params.insert("lr".to_string(), json!(lr));
        }
        let entry = HistoryEntry::new(&self.optimizer_id, &self.preset_label, params);
        if let Err(e) = backend.record(&entry) {
            log::warn!("failed to record optimizer history: {e}");
        }
    }
}
