// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Error types for settingsync

use thiserror::Error;

/// Result type alias for settingsync operations
pub type Result<T> = std::result::Result<T, SettingsError>;

/// settingsync error types
#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("File system error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Watch error: {0}")]
    Watch(#[from] notify::Error),

    #[error("Invalid binding for \"{key}\": {reason}")]
    InvalidBinding { key: String, reason: String },

    #[error("Unknown setting: {0}")]
    UnknownKey(String),

    #[error("Invalid value for {kind}: {input:?}")]
    InvalidValue { kind: String, input: String },
}
