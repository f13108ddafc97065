//! Preset configuration store and resolver
//!
//! Every optimizer ships a table of named presets keyed by use-case label
//! (`low_memory`, `consumer`, `high_memory`). Resolution looks the preset up,
//! overlays caller overrides (override wins per key), and strips the preset's
//! own `lr` entry whenever the caller supplies an explicit learning rate, so
//! the explicit value is the one the engine sees.
//!
//! Preset values are untyped `serde_json::Value`s; the typed accessors at the
//! bottom of this module are what the engines parse them with.

mod presets;

use std::collections::HashMap;

use serde_json::Value;
use thiserror::Error;

/// A preset or merged configuration: option name to JSON value
pub type ParamMap = HashMap<String, Value>;

/// All presets of one optimizer, keyed by use-case label
pub type PresetTable = HashMap<String, ParamMap>;

/// Configuration resolution errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("No preset store found for optimizer '{0}'")]
    ConfigNotFound(String),

    #[error("Preset '{label}' not found for optimizer '{optimizer}'")]
    PresetNotFound { optimizer: String, label: String },
}

/// Result alias for configuration resolution
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Where the preset table for one resolution comes from
pub enum PresetSource<'a> {
    /// Look the optimizer id up in the store
    Named(&'a str),
    /// Caller-supplied table, bypassing the named lookup entirely
    Inline(&'a PresetTable),
}

/// Read-only store of preset tables per optimizer id
///
/// Lookup normalizes the optimizer id to lowercase, so `"AdaBelief"` and
/// `"adabelief"` address the same table.
pub struct PresetStore {
    tables: HashMap<String, PresetTable>,
}

impl PresetStore {
    /// Empty store
    pub fn empty() -> Self {
        Self { tables: HashMap::new() }
    }

    /// Store pre-populated with the built-in tables for every shipped engine
    pub fn builtin() -> Self {
        Self { tables: presets::builtin_tables() }
    }

    /// Add or replace the table for one optimizer
    pub fn insert_table(&mut self, optimizer: &str, table: PresetTable) {
        self.tables.insert(optimizer.to_lowercase(), table);
    }

    /// Optimizer ids that have a preset table, sorted
    pub fn optimizer_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.tables.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    /// Full preset table for one optimizer
    pub fn table(&self, optimizer: &str) -> Result<&PresetTable> {
        self.tables
            .get(&optimizer.to_lowercase())
            .ok_or_else(|| ConfigError::ConfigNotFound(optimizer.to_string()))
    }

    /// Single preset for one optimizer
    pub fn lookup(&self, optimizer: &str, label: &str) -> Result<&ParamMap> {
        self.table(optimizer)?.get(label).ok_or_else(|| ConfigError::PresetNotFound {
            optimizer: optimizer.to_string(),
            label: label.to_string(),
        })
    }
}

impl Default for PresetStore {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Resolve a merged configuration from a preset and caller overrides
///
/// Overrides are applied after the preset lookup, last writer wins per key.
/// When `explicit_lr` is given and the overrides do not themselves carry an
/// `lr`, the preset's `lr` entry is removed from the result: the explicit
/// value takes effect instead of the preset's.
pub fn resolve_config(
    store: &PresetStore,
    source: PresetSource<'_>,
    label: &str,
    overrides: &ParamMap,
    explicit_lr: Option<f32>,
) -> Result<ParamMap> {
    let preset = match source {
        PresetSource::Named(optimizer) => store.lookup(optimizer, label)?,
        PresetSource::Inline(table) => {
            table.get(label).ok_or_else(|| ConfigError::PresetNotFound {
                optimizer: "<inline>".to_string(),
                label: label.to_string(),
            })?
        }
    };

    let mut merged = preset.clone();
    for (key, value) in overrides {
        merged.insert(key.clone(), value.clone());
    }

    if explicit_lr.is_some() && !overrides.contains_key("lr") {
        merged.remove("lr");
    }

    Ok(merged)
}

// ── Typed accessors over ParamMap ──────────────────────────────────────

/// Read a float option, falling back to a default
pub fn get_f32(params: &ParamMap, key: &str, default: f32) -> f32 {
    params.get(key).and_then(Value::as_f64).map_or(default, |v| v as f32)
}

/// Read a boolean option, falling back to a default
pub fn get_bool(params: &ParamMap, key: &str, default: bool) -> bool {
    params.get(key).and_then(Value::as_bool).unwrap_or(default)
}

/// Read an integer option, falling back to a default
pub fn get_u32(params: &ParamMap, key: &str, default: u32) -> u32 {
    params.get(key).and_then(Value::as_u64).map_or(default, |v| v as u32)
}

/// Read the `betas` pair, falling back to a default
///
/// Accepts a two-element JSON array; anything else yields the default.
pub fn get_betas(params: &ParamMap, default: (f32, f32)) -> (f32, f32) {
    match params.get("betas").and_then(Value::as_array) {
        Some(pair) if pair.len() == 2 => {
            let b1 = pair[0].as_f64().map_or(default.0, |v| v as f32);
            let b2 = pair[1].as_f64().map_or(default.1, |v| v as f32);
            (b1, b2)
        }
        _ => default,
    }
}
