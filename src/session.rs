// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Wiring of declared settings, a store and a panel

use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;
use tracing::debug;

use crate::config::AppConfig;
use crate::journal::Journal;
use crate::panel::{SettingOptions, SettingsPanel};
use crate::property::PropertyBag;
use crate::store::{open_store, SharedStore};
use crate::value::Value;
use crate::{Result, SettingsError};

/// Every declared setting bound through one panel.
///
/// The declared defaults live on a [`PropertyBag`]; on open the bag is
/// registered property by property, so stored values win over defaults.
pub struct Session {
    // Dropped first so the final apply still sees the live object
    pub panel: SettingsPanel,
    pub journal: Option<Rc<Journal>>,
    pub object: Rc<RefCell<PropertyBag>>,
    pub store: SharedStore,
    pub config: AppConfig,
}

impl Session {
    pub fn open(config: AppConfig) -> Result<Self> {
        let store = open_store(&config.store)?;
        Self::with_store(config, store)
    }

    pub fn with_store(config: AppConfig, store: SharedStore) -> Result<Self> {
        config.validate()?;

        let mut bag = PropertyBag::new("settings");
        for spec in &config.settings {
            bag.declare(spec.property_name(), spec.kind, spec.default_value()?)?;
        }
        let object = bag.into_shared();

        let panel = SettingsPanel::with_store(store.clone());
        for spec in &config.settings {
            let source = object
                .borrow()
                .changed(spec.property_name())
                .ok_or_else(|| SettingsError::UnknownKey(spec.key.clone()))?;
            let options = if spec.require_restart {
                SettingOptions::REQUIRE_RESTART
            } else {
                SettingOptions::NONE
            };
            panel.register_property(
                &spec.key,
                &object,
                spec.property_name(),
                &source,
                &spec.label,
                options,
            )?;
        }
        debug!("Bound {} settings", config.settings.len());

        let journal = config.journal.enabled.then(|| {
            let journal = Rc::new(Journal::new(PathBuf::from(&config.journal.path)));
            journal.attach(&panel);
            journal
        });

        Ok(Self {
            panel,
            journal,
            object,
            store,
            config,
        })
    }

    /// Parse text for a declared setting and commit it
    pub fn set_from_str(&self, key: &str, input: &str) -> Result<Value> {
        let spec = self
            .config
            .setting(key)
            .ok_or_else(|| SettingsError::UnknownKey(key.to_string()))?;
        let value = spec.kind.parse_value(input)?;
        self.panel.set_setting(key, value.clone());
        Ok(value)
    }

    /// Flush the store
    pub fn sync(&self) -> Result<()> {
        self.store.borrow_mut().sync()
    }
}
