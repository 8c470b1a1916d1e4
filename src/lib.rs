// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! settingsync: live properties bound to persisted settings
//!
//! A [`SettingsPanel`] keeps properties of live objects and a persisted
//! key-value store in sync, tracks default and previously committed values
//! for revert, and notifies observers of every committed change.

pub mod config;
pub mod error;
pub mod journal;
pub mod module_paths;
pub mod panel;
pub mod property;
pub mod session;
pub mod signal;
pub mod store;
pub mod value;
pub mod watcher;

pub use config::AppConfig;
pub use error::{Result, SettingsError};
pub use panel::{SettingChanged, SettingOptions, SettingsPanel};
pub use property::{PropertyBag, PropertyObject};
pub use signal::Signal;
pub use store::{SettingsStore, SharedStore, StoreStatus};
pub use value::{Value, ValueKind};
