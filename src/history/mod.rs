//! Optimizer usage history
//!
//! Append-only record of wrapper constructions: which optimizer, which
//! preset, and the final parameter set. Backed by pluggable storage via the
//! [`HistoryBackend`] trait; retention (TTL pruning) is the backend's
//! responsibility, never the optimization core's. The wrapper treats all
//! history writes as best-effort.

pub mod storage;

pub use storage::{InMemoryHistory, JsonFileHistory};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::ParamMap;

/// Errors from history storage operations
#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result alias for history operations
pub type Result<T> = std::result::Result<T, HistoryError>;

/// One recorded wrapper construction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub timestamp: DateTime<Utc>,
    pub optimizer_id: String,
    pub preset_label: String,
    pub params: ParamMap,
}

impl HistoryEntry {
    /// New entry stamped with the current UTC time
    pub fn new(optimizer_id: &str, preset_label: &str, params: ParamMap) -> Self {
        Self {
            timestamp: Utc::now(),
            optimizer_id: optimizer_id.to_string(),
            preset_label: preset_label.to_string(),
            params,
        }
    }
}

/// Pluggable persistence for usage history
///
/// Methods take `&self` so a shared backend can serve fire-and-forget writes
/// from the wrapper; implementations handle their own interior mutability.
pub trait HistoryBackend {
    /// Append an entry to the given optimizer's history
    fn record(&self, entry: &HistoryEntry) -> Result<()>;

    /// All entries recorded for an optimizer, oldest first
    fn load(&self, optimizer_id: &str) -> Result<Vec<HistoryEntry>>;

    /// Drop every entry for an optimizer
    fn clear(&self, optimizer_id: &str) -> Result<()>;

    /// Drop entries older than `ttl`, returning how many were removed
    fn prune_older_than(&self, optimizer_id: &str, ttl: Duration) -> Result<usize>;
}
