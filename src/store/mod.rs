// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Persisted key-value settings stores

pub mod json;
pub mod sqlite;

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use crate::config::{StoreBackend, StoreConfig};
use crate::value::Value;
use crate::Result;

pub use json::JsonFileStore;
pub use sqlite::SqliteStore;

/// Outcome of the most recent store access
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StoreStatus {
    #[default]
    Ok,
    /// The backing file or database could not be read or written
    AccessError,
    /// The backing data could not be parsed
    FormatError,
}

impl StoreStatus {
    /// Stable numeric code for diagnostics
    pub fn code(&self) -> i32 {
        match self {
            StoreStatus::Ok => 0,
            StoreStatus::AccessError => 1,
            StoreStatus::FormatError => 2,
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, StoreStatus::Ok)
    }
}

impl fmt::Display for StoreStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreStatus::Ok => write!(f, "ok"),
            StoreStatus::AccessError => write!(f, "access error"),
            StoreStatus::FormatError => write!(f, "format error"),
        }
    }
}

/// A persisted key-value settings backend.
///
/// Writes never fail loudly: a failed write leaves the store reporting a
/// non-ok [`StoreStatus`] and callers decide whether to log it.
pub trait SettingsStore {
    fn contains(&self, key: &str) -> bool;

    /// Stored value, `Value::Invalid` when absent
    fn value(&self, key: &str) -> Value;

    fn set_value(&mut self, key: &str, value: Value);

    fn remove(&mut self, key: &str);

    /// All stored keys, sorted
    fn keys(&self) -> Vec<String>;

    fn status(&self) -> StoreStatus;

    /// Flush pending writes to the backing medium
    fn sync(&mut self) -> Result<()> {
        Ok(())
    }

    /// Re-read the backing medium, picking up external edits
    fn reload(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Shared handle to an injected store
pub type SharedStore = Rc<RefCell<dyn SettingsStore>>;

/// Volatile store, mainly for tests and the `memory` backend
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    values: BTreeMap<String, Value>,
    status: StoreStatus,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_shared(self) -> Rc<RefCell<Self>> {
        Rc::new(RefCell::new(self))
    }

    /// Force the reported status, e.g. to simulate a failing backend
    pub fn set_status(&mut self, status: StoreStatus) {
        self.status = status;
    }
}

impl SettingsStore for MemoryStore {
    fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    fn value(&self, key: &str) -> Value {
        self.values.get(key).cloned().unwrap_or_default()
    }

    fn set_value(&mut self, key: &str, value: Value) {
        self.values.insert(key.to_string(), value);
    }

    fn remove(&mut self, key: &str) {
        self.values.remove(key);
    }

    fn keys(&self) -> Vec<String> {
        self.values.keys().cloned().collect()
    }

    fn status(&self) -> StoreStatus {
        self.status
    }
}

/// Open the store described by the configuration
pub fn open_store(config: &StoreConfig) -> Result<SharedStore> {
    let store: SharedStore = match config.backend {
        StoreBackend::Memory => Rc::new(RefCell::new(MemoryStore::new())),
        StoreBackend::Json => Rc::new(RefCell::new(JsonFileStore::open(&config.path)?)),
        StoreBackend::Sqlite => Rc::new(RefCell::new(SqliteStore::open(&config.path)?)),
    };
    tracing::debug!("Opened {:?} settings store at {}", config.backend, config.path);
    Ok(store)
}

/// Snapshot every stored key and value
pub fn export(store: &dyn SettingsStore) -> BTreeMap<String, Value> {
    store
        .keys()
        .into_iter()
        .map(|key| {
            let value = store.value(&key);
            (key, value)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_basics() {
        let mut store = MemoryStore::new();
        assert!(!store.contains("a"));
        assert_eq!(store.value("a"), Value::Invalid);

        store.set_value("b", Value::Int(2));
        store.set_value("a", Value::Bool(true));
        assert_eq!(store.keys(), vec!["a".to_string(), "b".to_string()]);
        assert_eq!(store.value("b"), Value::Int(2));

        store.remove("a");
        assert!(!store.contains("a"));
        assert!(store.status().is_ok());
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(StoreStatus::Ok.code(), 0);
        assert_eq!(StoreStatus::AccessError.code(), 1);
        assert_eq!(StoreStatus::FormatError.code(), 2);
    }

    #[test]
    fn test_open_memory_backend_and_export() {
        let config = StoreConfig {
            backend: StoreBackend::Memory,
            path: String::new(),
        };
        let store = open_store(&config).unwrap();
        store.borrow_mut().set_value("k", Value::from("v"));

        let snapshot = export(&*store.borrow());
        assert_eq!(snapshot.get("k"), Some(&Value::from("v")));
    }
}
