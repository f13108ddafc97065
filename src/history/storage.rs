//! History storage backends
//!
//! `JsonFileHistory` keeps one `<optimizer>_history.json` file per optimizer
//! under a directory; `InMemoryHistory` backs tests and embedded use.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{Duration, Utc};

use super::{HistoryBackend, HistoryEntry, Result};

/// JSON-file-backed history, one file per optimizer id
pub struct JsonFileHistory {
    dir: PathBuf,
}

impl JsonFileHistory {
    /// Create a backend rooted at `dir`, creating the directory if needed
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn file_for(&self, optimizer_id: &str) -> PathBuf {
        self.dir.join(format!("{}_history.json", optimizer_id.to_lowercase()))
    }

    fn read_entries(&self, optimizer_id: &str) -> Result<Vec<HistoryEntry>> {
        let path = self.file_for(optimizer_id);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let text = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    fn write_entries(&self, optimizer_id: &str, entries: &[HistoryEntry]) -> Result<()> {
        let text = serde_json::to_string_pretty(entries)?;
        fs::write(self.file_for(optimizer_id), text)?;
        Ok(())
    }
}

impl HistoryBackend for JsonFileHistory {
    fn record(&self, entry: &HistoryEntry) -> Result<()> {
        let mut entries = self.read_entries(&entry.optimizer_id)?;
        entries.push(entry.clone());
        self.write_entries(&entry.optimizer_id, &entries)
    }

    fn load(&self, optimizer_id: &str) -> Result<Vec<HistoryEntry>> {
        self.read_entries(optimizer_id)
    }

    fn clear(&self, optimizer_id: &str) -> Result<()> {
        let path = self.file_for(optimizer_id);
        if path.exists() {
            fs::remove_file(path)?;
        }
        Ok(())
    }

    fn prune_older_than(&self, optimizer_id: &str, ttl: Duration) -> Result<usize> {
        let entries = self.read_entries(optimizer_id)?;
        let cutoff = Utc::now() - ttl;
        let kept: Vec<HistoryEntry> =
            entries.iter().filter(|e| e.timestamp >= cutoff).cloned().collect();
        let removed = entries.len() - kept.len();
        if removed > 0 {
            self.write_entries(optimizer_id, &kept)?;
        }
        Ok(removed)
    }
}

/// In-memory history backend
pub struct InMemoryHistory {
    entries: Mutex<HashMap<String, Vec<HistoryEntry>>>,
}

impl InMemoryHistory {
    /// Empty backend
    pub fn new() -> Self {
        Self { entries: Mutex::new(HashMap::new()) }
    }

    fn with_entries<T>(&self, f: impl FnOnce(&mut HashMap<String, Vec<HistoryEntry>>) -> T) -> T {
        let mut guard = self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut guard)
    }
}

impl Default for InMemoryHistory {
    fn default() -> Self {
        Self::new()
    }
}

impl HistoryBackend for InMemoryHistory {
    fn record(&self, entry: &HistoryEntry) -> Result<()> {
        self.with_entries(|map| {
            map.entry(entry.optimizer_id.to_lowercase()).or_default().push(entry.clone());
        });
        Ok(())
    }

    fn load(&self, optimizer_id: &str) -> Result<Vec<HistoryEntry>> {
        Ok(self
            .with_entries(|map| map.get(&optimizer_id.to_lowercase()).cloned())
            .unwrap_or_default())
    }

    fn clear(&self, optimizer_id: &str) -> Result<()> {
        self.with_entries(|map| {
            map.remove(&optimizer_id.to_lowercase());
        });
        Ok(())
    }

    fn prune_older_than(&self, optimizer_id: &str, ttl: Duration) -> Result<usize> {
        let cutoff = Utc::now() - ttl;
        Ok(self.with_entries(|map| {
            let Some(entries) = map.get_mut(&optimizer_id.to_lowercase()) else {
                return 0;
            };
            let before = entries.len();
            entries.retain(|e| e.timestamp >= cutoff);
            before - entries.len()
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ParamMap;
    use serde_json::json;
    use tempfile::TempDir;

    fn entry(optimizer: &str) -> HistoryEntry {
        let params: ParamMap = [("lr".to_string(), json!(0.001))].into_iter().collect();
        HistoryEntry::new(optimizer, "consumer", params)
    }

    #[test]
    fn test_json_record_and_load() {
        let dir = TempDir::new().unwrap();
        let backend = JsonFileHistory::new(dir.path()).unwrap();

        backend.record(&entry("AdaBelief")).unwrap();
        backend.record(&entry("AdaBelief")).unwrap();

        // File name is lowercased; lookup is case-insensitive.
        assert!(dir.path().join("adabelief_history.json").exists());
        let loaded = backend.load("adabelief").unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].preset_label, "consumer");
    }

    #[test]
    fn test_json_load_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let backend = JsonFileHistory::new(dir.path()).unwrap();
        assert!(backend.load("sgd").unwrap().is_empty());
    }

    #[test]
    fn test_json_clear_removes_file() {
        let dir = TempDir::new().unwrap();
        let backend = JsonFileHistory::new(dir.path()).unwrap();
        backend.record(&entry("sgd")).unwrap();
        backend.clear("sgd").unwrap();
        assert!(!dir.path().join("sgd_history.json").exists());
        assert!(backend.load("sgd").unwrap().is_empty());
    }

    #[test]
    fn test_json_prune_by_ttl() {
        let dir = TempDir::new().unwrap();
        let backend = JsonFileHistory::new(dir.path()).unwrap();

        let mut old = entry("adamw");
        old.timestamp = Utc::now() - Duration::days(60);
        backend.record(&old).unwrap();
        backend.record(&entry("adamw")).unwrap();

        let removed = backend.prune_older_than("adamw", Duration::days(30)).unwrap();
        assert_eq!(removed, 1);
        assert_eq!(backend.load("adamw").unwrap().len(), 1);
    }

    #[test]
    fn test_memory_record_load_clear() {
        let backend = InMemoryHistory::new();
        backend.record(&entry("AdaBelief")).unwrap();
        assert_eq!(backend.load("adabelief").unwrap().len(), 1);

        backend.clear("AdaBelief").unwrap();
        assert!(backend.load("adabelief").unwrap().is_empty());
    }

    #[test]
    fn test_memory_prune_by_ttl() {
        let backend = InMemoryHistory::new();
        let mut old = entry("sgd");
        old.timestamp = Utc::now() - Duration::days(45);
        backend.record(&old).unwrap();
        backend.record(&entry("sgd")).unwrap();

        let removed = backend.prune_older_than("sgd", Duration::days(30)).unwrap();
        assert_eq!(removed, 1);
        assert_eq!(backend.load("sgd").unwrap().len(), 1);
        assert_eq!(backend.prune_older_than("adamw", Duration::days(30)).unwrap(), 0);
    }
}
