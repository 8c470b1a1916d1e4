// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! JSON file settings store

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use super::{SettingsStore, StoreStatus};
use crate::value::Value;
use crate::Result;

/// Settings kept in a single JSON object on disk, written through on every
/// change.
///
/// An unparsable file is never overwritten by write-through: the store keeps
/// reporting `FormatError` until a successful `reload`, or until an explicit
/// `sync` moves the bad file aside and writes the in-memory values.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    values: BTreeMap<String, Value>,
    status: StoreStatus,
}

impl JsonFileStore {
    /// Open a store file. A missing file is an empty store; a malformed one
    /// is an empty store reporting `FormatError`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut store = Self {
            path: path.as_ref().to_path_buf(),
            values: BTreeMap::new(),
            status: StoreStatus::Ok,
        };
        store.load()?;
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Where an unparsable settings file is moved by `sync`
    pub fn backup_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".bak");
        self.path.with_file_name(name)
    }

    fn load(&mut self) -> Result<()> {
        if !self.path.exists() {
            debug!("Settings file {:?} not found, starting empty", self.path);
            self.values.clear();
            self.status = StoreStatus::Ok;
            return Ok(());
        }

        let content = std::fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            self.values.clear();
            self.status = StoreStatus::Ok;
            return Ok(());
        }

        match serde_json::from_str(&content) {
            Ok(values) => {
                self.values = values;
                self.status = StoreStatus::Ok;
            }
            // In-memory values are kept; the file is left alone until sync
            Err(e) => {
                warn!("Failed to parse settings file {:?}: {}", self.path, e);
                self.status = StoreStatus::FormatError;
            }
        }
        Ok(())
    }

    fn write(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let content = serde_json::to_string_pretty(&self.values)?;
        std::fs::write(&self.path, content)?;
        Ok(())
    }

    fn write_through(&mut self) {
        if self.status == StoreStatus::FormatError {
            debug!("Not overwriting unparsable settings file {:?}", self.path);
            return;
        }
        self.status = match self.write() {
            Ok(()) => StoreStatus::Ok,
            Err(e) => {
                debug!("Failed to write settings file {:?}: {}", self.path, e);
                StoreStatus::AccessError
            }
        };
    }
}

impl SettingsStore for JsonFileStore {
    fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    fn value(&self, key: &str) -> Value {
        self.values.get(key).cloned().unwrap_or_default()
    }

    fn set_value(&mut self, key: &str, value: Value) {
        self.values.insert(key.to_string(), value);
        self.write_through();
    }

    fn remove(&mut self, key: &str) {
        if self.values.remove(key).is_some() {
            self.write_through();
        }
    }

    fn keys(&self) -> Vec<String> {
        self.values.keys().cloned().collect()
    }

    fn status(&self) -> StoreStatus {
        self.status
    }

    fn sync(&mut self) -> Result<()> {
        if self.status == StoreStatus::FormatError && self.path.exists() {
            let backup = self.backup_path();
            std::fs::rename(&self.path, &backup)?;
            warn!("Moved unparsable settings file to {:?}", backup);
        }
        self.write()?;
        self.status = StoreStatus::Ok;
        Ok(())
    }

    fn reload(&mut self) -> Result<()> {
        self.load()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileStore::open(dir.path().join("settings.json")).unwrap();
        assert!(store.keys().is_empty());
        assert!(store.status().is_ok());
    }

    #[test]
    fn test_write_through_and_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("settings.json");

        let mut store = JsonFileStore::open(&path).unwrap();
        store.set_value("fontSize", Value::Int(14));
        store.set_value("recent", Value::StringList(vec!["/tmp".into()]));
        assert!(store.status().is_ok());

        let reopened = JsonFileStore::open(&path).unwrap();
        assert_eq!(reopened.value("fontSize"), Value::Int(14));
        assert_eq!(
            reopened.value("recent"),
            Value::StringList(vec!["/tmp".into()])
        );
    }

    #[test]
    fn test_malformed_file_reports_format_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{ not json").unwrap();

        let store = JsonFileStore::open(&path).unwrap();
        assert_eq!(store.status(), StoreStatus::FormatError);
        assert!(store.keys().is_empty());
    }

    #[test]
    fn test_malformed_file_survives_writes() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        let original = r#"{"fontSize":{"type":"int","value":20},"theme":{"type":"string","value":"dark"},}"#;
        std::fs::write(&path, original).unwrap();

        let mut store = JsonFileStore::open(&path).unwrap();
        store.set_value("fontSize", Value::Int(12));
        store.remove("fontSize");
        store.set_value("theme", Value::from("light"));
        assert_eq!(store.status(), StoreStatus::FormatError);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), original);
    }

    #[test]
    fn test_sync_backs_up_malformed_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{ not json").unwrap();

        let mut store = JsonFileStore::open(&path).unwrap();
        store.set_value("fontSize", Value::Int(14));
        store.sync().unwrap();

        assert!(store.status().is_ok());
        assert_eq!(
            std::fs::read_to_string(store.backup_path()).unwrap(),
            "{ not json"
        );
        let reopened = JsonFileStore::open(&path).unwrap();
        assert_eq!(reopened.value("fontSize"), Value::Int(14));
    }

    #[test]
    fn test_reload_after_fix_clears_format_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{ not json").unwrap();
        let mut store = JsonFileStore::open(&path).unwrap();

        std::fs::write(&path, r#"{"theme": {"type": "string", "value": "dark"}}"#).unwrap();
        store.reload().unwrap();
        assert!(store.status().is_ok());
        assert_eq!(store.value("theme"), Value::from("dark"));
    }

    #[test]
    fn test_unwritable_path_reports_access_error() {
        let dir = TempDir::new().unwrap();
        // A directory where the file should be
        let path = dir.path().join("settings.json");
        std::fs::create_dir(&path).unwrap();

        let mut store = JsonFileStore {
            path,
            values: BTreeMap::new(),
            status: StoreStatus::Ok,
        };
        store.set_value("k", Value::Bool(true));
        assert_eq!(store.status(), StoreStatus::AccessError);
        // The in-memory value is kept regardless
        assert_eq!(store.value("k"), Value::Bool(true));
    }

    #[test]
    fn test_reload_picks_up_external_edit() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        let mut store = JsonFileStore::open(&path).unwrap();
        store.set_value("theme", Value::from("light"));

        std::fs::write(&path, r#"{"theme": {"type": "string", "value": "dark"}}"#).unwrap();
        store.reload().unwrap();
        assert_eq!(store.value("theme"), Value::from("dark"));
    }
}
