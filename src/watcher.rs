// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Watches a settings file for edits made outside this process

use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver};
use tracing::{debug, info};

use crate::{Result, SettingsError};

/// Events emitted by the watcher
#[derive(Debug, Clone, PartialEq)]
pub enum WatchEvent {
    /// The settings file was created or written
    Modified(PathBuf),
    /// The settings file was deleted
    Removed(PathBuf),
    /// Watcher error
    Error(String),
}

/// Watches the directory holding a settings file and reports events for
/// that file only. Editors often replace files instead of writing them in
/// place, so the parent directory is watched rather than the file.
pub struct StoreWatcher {
    _watcher: RecommendedWatcher,
    file: PathBuf,
    event_rx: UnboundedReceiver<notify::Result<Event>>,
}

impl StoreWatcher {
    pub fn new(file: &Path) -> Result<Self> {
        let (tx, rx) = unbounded_channel();

        let config = Config::default().with_poll_interval(Duration::from_secs(2));
        let mut watcher = RecommendedWatcher::new(
            move |event: notify::Result<Event>| {
                // Receiver gone means the watcher is shutting down
                let _ = tx.send(event);
            },
            config,
        )?;

        let name = file
            .file_name()
            .ok_or_else(|| SettingsError::Config(format!("{:?} does not name a file", file)))?;
        let dir = match file.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        };
        if !dir.exists() {
            std::fs::create_dir_all(&dir)?;
            info!("Created settings directory: {:?}", dir);
        }
        // Events carry canonical paths
        let dir = std::fs::canonicalize(&dir)?;
        let file = dir.join(name);
        watcher.watch(&dir, RecursiveMode::NonRecursive)?;
        info!("Watching: {:?}", file);

        Ok(Self {
            _watcher: watcher,
            file,
            event_rx: rx,
        })
    }

    pub fn file(&self) -> &Path {
        &self.file
    }

    /// Next event concerning the watched file; `None` once the watcher
    /// has shut down
    pub async fn next_event(&mut self) -> Option<WatchEvent> {
        loop {
            let event = match self.event_rx.recv().await? {
                Ok(event) => event,
                Err(e) => return Some(WatchEvent::Error(e.to_string())),
            };
            if let Some(converted) = convert_event(&self.file, event) {
                return Some(converted);
            }
        }
    }
}

/// Convert notify event to our event type
fn convert_event(file: &Path, event: Event) -> Option<WatchEvent> {
    if !event.paths.iter().any(|p| p == file) {
        return None;
    }
    debug!("Settings file event: {:?}", event.kind);
    match event.kind {
        EventKind::Create(_) | EventKind::Modify(_) => Some(WatchEvent::Modified(file.to_path_buf())),
        EventKind::Remove(_) => Some(WatchEvent::Removed(file.to_path_buf())),
        _ => None,
    }
}
