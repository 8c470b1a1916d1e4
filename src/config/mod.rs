// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Configuration management for settingsync

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

use crate::value::{Value, ValueKind};
use crate::SettingsError;

/// Main application configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    /// Where settings are persisted
    #[serde(default)]
    pub store: StoreConfig,

    /// Change journal used by `history`
    #[serde(default)]
    pub journal: JournalConfig,

    /// Command-line module search path sources
    #[serde(default)]
    pub modules: ModulePathConfig,

    /// Declared settings
    #[serde(default = "default_settings")]
    pub settings: Vec<SettingSpec>,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Json,
    Sqlite,
    Memory,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct StoreConfig {
    #[serde(default = "default_backend")]
    pub backend: StoreBackend,
    #[serde(default = "default_store_path")]
    pub path: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct JournalConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_journal_path")]
    pub path: String,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct ModulePathConfig {
    #[serde(default)]
    pub load_path_env: bool,
    #[serde(default)]
    pub home_dir: bool,
    #[serde(default)]
    pub current_dir: bool,
    #[serde(default)]
    pub application_dir: bool,
}

/// One declared setting: a typed property with a default and a label
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SettingSpec {
    pub key: String,
    /// Property name on the live object, defaults to the key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub property: Option<String>,
    #[serde(default)]
    pub label: String,
    pub kind: ValueKind,
    /// Plain JSON default (`12`, `"dark"`, `["a", "b"]`)
    #[serde(default)]
    pub default: serde_json::Value,
    #[serde(default)]
    pub require_restart: bool,
}

// Default value functions
fn default_true() -> bool { true }
fn default_backend() -> StoreBackend { StoreBackend::Json }
fn default_store_path() -> String { "settings.json".to_string() }
fn default_journal_path() -> String { "settingsync_journal.jsonl".to_string() }

fn default_settings() -> Vec<SettingSpec> {
    vec![
        SettingSpec {
            key: "fontSize".to_string(),
            property: None,
            label: "Font size".to_string(),
            kind: ValueKind::Int,
            default: serde_json::json!(12),
            require_restart: false,
        },
        SettingSpec {
            key: "theme".to_string(),
            property: None,
            label: "Color theme".to_string(),
            kind: ValueKind::String,
            default: serde_json::json!("light"),
            require_restart: true,
        },
        SettingSpec {
            key: "autoSave".to_string(),
            property: None,
            label: "Save documents automatically".to_string(),
            kind: ValueKind::Bool,
            default: serde_json::json!(true),
            require_restart: false,
        },
        SettingSpec {
            key: "recentDirectories".to_string(),
            property: None,
            label: "Recent directories".to_string(),
            kind: ValueKind::StringList,
            default: serde_json::Value::Null,
            require_restart: false,
        },
    ]
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            store: StoreConfig::default(),
            journal: JournalConfig::default(),
            modules: ModulePathConfig::default(),
            settings: default_settings(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            path: default_store_path(),
        }
    }
}

impl Default for JournalConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: default_journal_path(),
        }
    }
}

impl SettingSpec {
    pub fn property_name(&self) -> &str {
        self.property.as_deref().unwrap_or(&self.key)
    }

    /// Typed default. `null` means unset.
    pub fn default_value(&self) -> crate::Result<Value> {
        let invalid = || SettingsError::Config(format!(
            "default for \"{}\" is not a valid {}: {}",
            self.key, self.kind, self.default
        ));

        let value = match (&self.default, self.kind) {
            (serde_json::Value::Null, _) => Value::Invalid,
            (serde_json::Value::Bool(b), ValueKind::Bool) => Value::Bool(*b),
            (serde_json::Value::Number(n), ValueKind::Int) => {
                Value::Int(n.as_i64().ok_or_else(invalid)?)
            }
            (serde_json::Value::Number(n), ValueKind::Double) => {
                Value::Double(n.as_f64().ok_or_else(invalid)?)
            }
            (serde_json::Value::String(s), ValueKind::String) => Value::String(s.clone()),
            (serde_json::Value::Array(items), ValueKind::StringList) => Value::StringList(
                items
                    .iter()
                    .map(|item| item.as_str().map(String::from).ok_or_else(invalid))
                    .collect::<crate::Result<Vec<_>>>()?,
            ),
            _ => return Err(invalid()),
        };
        Ok(value)
    }
}

impl AppConfig {
    /// Load configuration from a JSON file
    pub fn load(path: &Path) -> crate::Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Self = serde_json::from_str(&content)
                .map_err(|e| SettingsError::Config(format!("Failed to parse config: {}", e)))?;
            config.validate()?;
            Ok(config)
        } else {
            tracing::info!("Config file not found at {:?}, using defaults", path);
            Ok(Self::default())
        }
    }

    /// Save configuration to a JSON file
    pub fn save(&self, path: &Path) -> crate::Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Check declared settings: unique keys, well-typed defaults
    pub fn validate(&self) -> crate::Result<()> {
        let mut seen = HashSet::new();
        for spec in &self.settings {
            if spec.key.is_empty() {
                return Err(SettingsError::Config("setting with empty key".to_string()));
            }
            if !seen.insert(spec.key.as_str()) {
                return Err(SettingsError::Config(format!(
                    "setting \"{}\" declared twice",
                    spec.key
                )));
            }
            spec.default_value()?;
        }
        if self.store.backend != StoreBackend::Memory && self.store.path.is_empty() {
            return Err(SettingsError::Config("store path is empty".to_string()));
        }
        Ok(())
    }

    pub fn setting(&self, key: &str) -> Option<&SettingSpec> {
        self.settings.iter().find(|s| s.key == key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config_is_valid() {
        let config = AppConfig::default();
        config.validate().unwrap();
        assert_eq!(config.store.backend, StoreBackend::Json);
        assert_eq!(
            config.setting("fontSize").unwrap().default_value().unwrap(),
            Value::Int(12)
        );
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let config = AppConfig::load(&dir.path().join("nope.json")).unwrap();
        assert_eq!(config.settings.len(), 4);
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        let mut config = AppConfig::default();
        config.store.backend = StoreBackend::Sqlite;
        config.store.path = "prefs.db".to_string();
        config.save(&path).unwrap();

        let loaded = AppConfig::load(&path).unwrap();
        assert_eq!(loaded.store.backend, StoreBackend::Sqlite);
        assert_eq!(loaded.store.path, "prefs.db");
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let config: AppConfig = serde_json::from_str(
            r#"{"settings": [{"key": "zoom", "kind": "double", "default": 1}]}"#,
        )
        .unwrap();
        assert_eq!(config.store.path, "settings.json");
        assert!(config.journal.enabled);
        assert_eq!(config.settings[0].default_value().unwrap(), Value::Double(1.0));
        assert_eq!(config.settings[0].property_name(), "zoom");
    }

    #[test]
    fn test_rejects_duplicate_keys_and_bad_defaults() {
        let mut config = AppConfig::default();
        config.settings.push(config.settings[0].clone());
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.settings[0].default = serde_json::json!("twelve");
        assert!(config.validate().is_err());
    }
}
