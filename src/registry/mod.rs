//! Two-tier optimizer registry
//!
//! Resolution first derives the canonical enhanced name (lowercased id plus
//! the `_plus` suffix) and looks it up in the enhanced registry, where
//! deployers install locally vetted, instrumented variants. On a miss it
//! falls back to the standard registry with the id as given; the standard
//! tier normalizes case internally, matching the external registries it
//! stands in for. A missing enhanced entry is the expected common case. An
//! enhanced name that is claimed but has no constructor is a configuration
//! error and never falls back silently.
//!
//! Each entry carries its constructor and an `accepts_lr` capability flag
//! fixed at registration time, so the wrapper never has to inspect
//! constructor signatures.

use std::collections::HashMap;

use thiserror::Error;

use crate::config::ParamMap;
use crate::optim::{AdaBelief, AdamW, OptimError, Optimizer, SGD};

/// Suffix appended to a lowercased optimizer id to form its enhanced name
pub const ENHANCED_SUFFIX: &str = "_plus";

/// Registry resolution errors
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Optimizer '{0}' not found in either the enhanced or the standard registry")]
    OptimizerNotFound(String),

    #[error("Enhanced optimizer '{name}' is registered but not constructible: {reason}")]
    InvalidOptimizerDefinition { name: String, reason: String },
}

/// Result alias for registry operations
pub type Result<T> = std::result::Result<T, RegistryError>;

/// Constructor for a registered engine
///
/// Receives the merged configuration and, when the entry accepts one, the
/// explicit learning rate.
pub type OptimizerFactory =
    fn(&ParamMap, Option<f32>) -> std::result::Result<Box<dyn Optimizer>, OptimError>;

/// A constructible registry entry
#[derive(Debug, Clone, Copy)]
pub struct OptimizerEntry {
    pub factory: OptimizerFactory,
    /// Whether the constructor takes an explicit learning-rate argument
    pub accepts_lr: bool,
}

/// An enhanced-tier registration: either a working constructor or a name
/// claimed by a variant that cannot be constructed (failed plugin load,
/// placeholder registration)
enum Registration {
    Constructible(OptimizerEntry),
    Reserved { reason: String },
}

/// Registry of optimizer implementations, consulted enhanced-tier first
pub struct OptimizerRegistry {
    enhanced: HashMap<String, Registration>,
    standard: HashMap<String, OptimizerEntry>,
}

impl OptimizerRegistry {
    /// Empty registry
    pub fn empty() -> Self {
        Self { enhanced: HashMap::new(), standard: HashMap::new() }
    }

    /// Registry pre-populated with the shipped engines
    ///
    /// Standard tier: `adabelief`, `adamw`, `sgd`. Enhanced tier:
    /// `adabelief_plus`, so the id `AdaBelief` resolves to the enhanced
    /// variant while `AdamW` and `SGD` resolve to the standard tier.
    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        registry.register_standard(
            "adabelief",
            OptimizerEntry { factory: adabelief_factory, accepts_lr: true },
        );
        registry.register_standard(
            "adamw",
            OptimizerEntry { factory: adamw_factory, accepts_lr: true },
        );
        registry
            .register_standard("sgd", OptimizerEntry { factory: sgd_factory, accepts_lr: true });
        registry.register_enhanced(
            "adabelief_plus",
            OptimizerEntry { factory: adabelief_factory, accepts_lr: true },
        );
        registry
    }

    /// Canonical enhanced name for an optimizer id
    pub fn enhanced_name(optimizer_id: &str) -> String {
        format!("{}{ENHANCED_SUFFIX}", optimizer_id.to_lowercase())
    }

    /// Install a standard-tier implementation
    pub fn register_standard(&mut self, name: &str, entry: OptimizerEntry) {
        self.standard.insert(name.to_lowercase(), entry);
    }

    /// Install an enhanced-tier implementation under its full enhanced name
    pub fn register_enhanced(&mut self, name: &str, entry: OptimizerEntry) {
        self.enhanced.insert(name.to_lowercase(), Registration::Constructible(entry));
    }

    /// Claim an enhanced name without a constructor
    ///
    /// Resolution against the claimed name fails with
    /// [`RegistryError::InvalidOptimizerDefinition`] instead of falling back.
    pub fn reserve_enhanced(&mut self, name: &str, reason: &str) {
        self.enhanced
            .insert(name.to_lowercase(), Registration::Reserved { reason: reason.to_string() });
    }

    /// Standard-tier ids, sorted
    pub fn standard_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.standard.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    /// Enhanced-tier names, sorted
    pub fn enhanced_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.enhanced.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Resolve an optimizer id to an implementation entry
    ///
    /// Returns the entry together with `is_enhanced`. Resolution happens on
    /// every call; nothing is cached across constructions.
    pub fn resolve_implementation(&self, optimizer_id: &str) -> Result<(OptimizerEntry, bool)> {
        let enhanced = Self::enhanced_name(optimizer_id);
        match self.enhanced.get(&enhanced) {
            Some(Registration::Constructible(entry)) => {
                log::debug!("resolved '{optimizer_id}' to enhanced variant '{enhanced}'");
                Ok((*entry, true))
            }
            Some(Registration::Reserved { reason }) => {
                Err(RegistryError::InvalidOptimizerDefinition {
                    name: enhanced,
                    reason: reason.clone(),
                })
            }
            None => {
                // No enhanced override: the common case, not an error.
                log::debug!("no enhanced variant '{enhanced}', trying the standard registry");
                self.standard
                    .get(&optimizer_id.to_lowercase())
                    .map(|entry| (*entry, false))
                    .ok_or_else(|| RegistryError::OptimizerNotFound(optimizer_id.to_string()))
            }
        }
    }
}

impl Default for OptimizerRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

fn adabelief_factory(
    params: &ParamMap,
    lr: Option<f32>,
) -> std::result::Result<Box<dyn Optimizer>, OptimError> {
    Ok(Box::new(AdaBelief::from_params(params, lr)?))
}

fn adamw_factory(
    params: &ParamMap,
    lr: Option<f32>,
) -> std::result::Result<Box<dyn Optimizer>, OptimError> {
    Ok(Box::new(AdamW::from_params(params, lr)?))
}

fn sgd_factory(
    params: &ParamMap,
    lr: Option<f32>,
) -> std::result::Result<Box<dyn Optimizer>, OptimError> {
    Ok(Box::new(SGD::from_params(params, lr)?))
}
