// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! SQLite settings store

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::cell::Cell;
use std::path::Path;
use tracing::warn;

use super::{SettingsStore, StoreStatus};
use crate::value::Value;
use crate::Result;

/// Settings kept in a `settings` table, one row per key, values as JSON
pub struct SqliteStore {
    conn: Connection,
    status: Cell<StoreStatus>,
}

/// A stored row with its modification time
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredSetting {
    pub key: String,
    pub value: Value,
    pub updated_at: DateTime<Utc>,
}

impl SqliteStore {
    /// Open or create the database
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn,
            status: Cell::new(StoreStatus::Ok),
        };
        store.initialize()?;
        Ok(store)
    }

    /// Open an in-memory database (for testing)
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn,
            status: Cell::new(StoreStatus::Ok),
        };
        store.initialize()?;
        Ok(store)
    }

    fn initialize(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS settings (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
        "#,
        )?;
        Ok(())
    }

    /// Record the outcome of an access, logging failures
    fn track<T>(&self, what: &str, key: &str, result: Result<T>) -> Option<T> {
        match result {
            Ok(v) => {
                self.status.set(StoreStatus::Ok);
                Some(v)
            }
            Err(crate::SettingsError::Json(e)) => {
                warn!("Malformed stored value for \"{}\" during {}: {}", key, what, e);
                self.status.set(StoreStatus::FormatError);
                None
            }
            Err(e) => {
                warn!("Settings database {} failed for \"{}\": {}", what, key, e);
                self.status.set(StoreStatus::AccessError);
                None
            }
        }
    }

    fn try_value(&self, key: &str) -> Result<Option<Value>> {
        let raw: Option<String> = self
            .conn
            .query_row(
                "SELECT value FROM settings WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        match raw {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    fn try_set(&self, key: &str, value: &Value) -> Result<()> {
        let json = serde_json::to_string(value)?;
        self.conn.execute(
            r#"INSERT OR REPLACE INTO settings (key, value, updated_at)
               VALUES (?1, ?2, ?3)"#,
            params![key, json, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    /// All rows, most recently updated first
    pub fn entries(&self) -> Result<Vec<StoredSetting>> {
        let mut stmt = self
            .conn
            .prepare("SELECT key, value, updated_at FROM settings ORDER BY updated_at DESC, key")?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut entries = Vec::with_capacity(rows.len());
        for (key, value, updated) in rows {
            entries.push(StoredSetting {
                key,
                value: serde_json::from_str(&value)?,
                updated_at: DateTime::parse_from_rfc3339(&updated)
                    .map(|dt| dt.with_timezone(&Utc))
                    .unwrap_or_else(|_| Utc::now()),
            });
        }
        Ok(entries)
    }
}

impl SettingsStore for SqliteStore {
    fn contains(&self, key: &str) -> bool {
        let result = self
            .conn
            .query_row(
                "SELECT 1 FROM settings WHERE key = ?1",
                params![key],
                |_| Ok(()),
            )
            .optional()
            .map_err(Into::into);
        self.track("lookup", key, result).flatten().is_some()
    }

    fn value(&self, key: &str) -> Value {
        self.track("read", key, self.try_value(key))
            .flatten()
            .unwrap_or_default()
    }

    fn set_value(&mut self, key: &str, value: Value) {
        let result = self.try_set(key, &value);
        self.track("write", key, result);
    }

    fn remove(&mut self, key: &str) {
        let result = self
            .conn
            .execute("DELETE FROM settings WHERE key = ?1", params![key])
            .map_err(Into::into);
        self.track("delete", key, result);
    }

    fn keys(&self) -> Vec<String> {
        let result = (|| -> Result<Vec<String>> {
            let mut stmt = self.conn.prepare("SELECT key FROM settings ORDER BY key")?;
            let keys = stmt
                .query_map([], |row| row.get(0))?
                .collect::<rusqlite::Result<Vec<String>>>()?;
            Ok(keys)
        })();
        self.track("listing", "*", result).unwrap_or_default()
    }

    fn status(&self) -> StoreStatus {
        self.status.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_set_and_read_back() {
        let mut store = SqliteStore::in_memory().unwrap();
        assert!(!store.contains("fontSize"));

        store.set_value("fontSize", Value::Int(12));
        store.set_value("fontSize", Value::Int(14));
        assert!(store.contains("fontSize"));
        assert_eq!(store.value("fontSize"), Value::Int(14));
        assert!(store.status().is_ok());
        assert_eq!(store.keys(), vec!["fontSize".to_string()]);
    }

    #[test]
    fn test_remove() {
        let mut store = SqliteStore::in_memory().unwrap();
        store.set_value("a", Value::Bool(false));
        store.remove("a");
        assert!(!store.contains("a"));
        assert_eq!(store.value("a"), Value::Invalid);
    }

    #[test]
    fn test_malformed_row_reports_format_error() {
        let store = SqliteStore::in_memory().unwrap();
        store
            .conn
            .execute(
                "INSERT INTO settings (key, value, updated_at) VALUES ('bad', 'nope', '')",
                [],
            )
            .unwrap();

        assert_eq!(store.value("bad"), Value::Invalid);
        assert_eq!(store.status(), StoreStatus::FormatError);
    }

    #[test]
    fn test_persists_across_connections() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.db");
        {
            let mut store = SqliteStore::open(&path).unwrap();
            store.set_value("theme", Value::from("dark"));
        }
        let store = SqliteStore::open(&path).unwrap();
        assert_eq!(store.value("theme"), Value::from("dark"));

        let entries = store.entries().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].key, "theme");
    }
}
