// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Journal of committed setting changes, for listing and undo

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use uuid::Uuid;

use crate::panel::{SettingChanged, SettingsPanel};
use crate::signal::ConnectionId;
use crate::value::Value;
use crate::Result;

/// A single committed change
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalEntry {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub key: String,
    pub old_value: Value,
    pub new_value: Value,
    #[serde(default)]
    pub undone: bool,
}

impl JournalEntry {
    pub fn from_change(change: &SettingChanged) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            key: change.key.clone(),
            old_value: change.old_value.clone(),
            new_value: change.value.clone(),
            undone: false,
        }
    }
}

/// JSON-lines journal file
#[derive(Debug, Clone)]
pub struct Journal {
    path: PathBuf,
}

impl Journal {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Append an entry to the journal
    pub fn append(&self, entry: &JournalEntry) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        let json = serde_json::to_string(entry)?;
        writeln!(file, "{}", json)?;

        Ok(())
    }

    /// Record every change the panel commits from now on
    pub fn attach(self: &Rc<Self>, panel: &SettingsPanel) -> ConnectionId {
        let journal = Rc::clone(self);
        panel.setting_changed().connect(move |change: &SettingChanged| {
            if let Err(e) = journal.append(&JournalEntry::from_change(change)) {
                tracing::warn!("Failed to journal change of \"{}\": {}", change.key, e);
            }
        })
    }

    /// Read all journal entries, oldest first
    pub fn read_all(&self) -> Result<Vec<JournalEntry>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let file = File::open(&self.path)?;
        let reader = BufReader::new(file);

        let mut entries = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str(&line) {
                Ok(entry) => entries.push(entry),
                Err(e) => {
                    tracing::warn!("Failed to parse journal entry: {}", e);
                }
            }
        }

        Ok(entries)
    }

    /// Get the most recent N entries (newest first)
    pub fn recent(&self, count: usize) -> Result<Vec<JournalEntry>> {
        let mut entries = self.read_all()?;
        entries.reverse();
        entries.truncate(count);
        Ok(entries)
    }

    /// Mark an entry as undone
    pub fn mark_undone(&self, id: &str) -> Result<()> {
        let entries = self.read_all()?;

        let file = File::create(&self.path)?;
        let mut writer = std::io::BufWriter::new(file);

        for mut entry in entries {
            if entry.id == id {
                entry.undone = true;
            }
            let json = serde_json::to_string(&entry)?;
            writeln!(writer, "{}", json)?;
        }
        writer.flush()?;

        Ok(())
    }

    /// Entries not yet undone, oldest first
    pub fn undoable(&self) -> Result<Vec<JournalEntry>> {
        let entries = self.read_all()?;
        Ok(entries.into_iter().filter(|e| !e.undone).collect())
    }

    pub fn clear(&self) -> Result<()> {
        if self.path.exists() {
            fs::remove_file(&self.path)?;
        }
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::panel::SettingOptions;
    use crate::property::PropertyBag;
    use crate::store::MemoryStore;
    use crate::value::ValueKind;
    use tempfile::TempDir;

    fn change(key: &str, old: i64, new: i64) -> SettingChanged {
        SettingChanged {
            key: key.to_string(),
            value: Value::Int(new),
            old_value: Value::Int(old),
        }
    }

    #[test]
    fn test_append_and_recent() {
        let dir = TempDir::new().unwrap();
        let journal = Journal::new(dir.path().join("journal.jsonl"));
        journal.append(&JournalEntry::from_change(&change("a", 1, 2))).unwrap();
        journal.append(&JournalEntry::from_change(&change("b", 3, 4))).unwrap();

        let recent = journal.recent(1).unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].key, "b");
        assert_eq!(recent[0].old_value, Value::Int(3));
    }

    #[test]
    fn test_mark_undone() {
        let dir = TempDir::new().unwrap();
        let journal = Journal::new(dir.path().join("journal.jsonl"));
        let entry = JournalEntry::from_change(&change("a", 1, 2));
        journal.append(&entry).unwrap();
        journal.append(&JournalEntry::from_change(&change("a", 2, 3))).unwrap();

        journal.mark_undone(&entry.id).unwrap();
        let undoable = journal.undoable().unwrap();
        assert_eq!(undoable.len(), 1);
        assert_eq!(undoable[0].new_value, Value::Int(3));
    }

    #[test]
    fn test_skips_malformed_lines() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("journal.jsonl");
        let journal = Journal::new(path.clone());
        journal.append(&JournalEntry::from_change(&change("a", 1, 2))).unwrap();
        let mut file = OpenOptions::new().append(true).open(&path).unwrap();
        writeln!(file, "garbage").unwrap();

        assert_eq!(journal.read_all().unwrap().len(), 1);
        journal.clear().unwrap();
        assert!(journal.read_all().unwrap().is_empty());
    }

    #[test]
    fn test_attach_records_panel_changes() {
        let dir = TempDir::new().unwrap();
        let journal = Rc::new(Journal::new(dir.path().join("journal.jsonl")));

        let bag = PropertyBag::new("app")
            .with_property("fontSize", ValueKind::Int, 12)
            .unwrap()
            .into_shared();
        let source = bag.borrow().changed("fontSize").unwrap();
        let panel = SettingsPanel::with_store(MemoryStore::new().into_shared());
        panel
            .register_property("fontSize", &bag, "fontSize", &source, "", SettingOptions::NONE)
            .unwrap();
        journal.attach(&panel);

        panel.set_setting("fontSize", 14);
        let entries = journal.read_all().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].old_value, Value::Int(12));
        assert_eq!(entries[0].new_value, Value::Int(14));
    }
}
