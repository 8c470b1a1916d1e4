// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Property/settings synchronization
//!
//! A [`SettingsPanel`] binds properties of live objects to keys of a
//! persisted [`SettingsStore`]. For every bound key it remembers the value
//! the property had when it was registered (the default) and the value last
//! committed (the previous value), so a host can tell which settings were
//! edited, revert them, or restore defaults.
//!
//! Everything runs on the calling thread. Change sources registered with a
//! property call back into the panel synchronously; `setting_changed`
//! observers run after the panel has released its internal state and may
//! call back into it.

use bitflags::bitflags;
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::{Rc, Weak};
use tracing::{debug, warn};

use crate::property::PropertyObject;
use crate::signal::Signal;
use crate::store::SharedStore;
use crate::value::{Value, ValueKind};
use crate::{Result, SettingsError};

bitflags! {
    /// Per-setting behavior flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct SettingOptions: u32 {
        /// The host must restart before the new value takes effect
        const REQUIRE_RESTART = 1 << 0;
    }
}

impl SettingOptions {
    pub const NONE: Self = Self::empty();
}

/// Emitted for every committed write that changed the stored value
#[derive(Debug, Clone, PartialEq)]
pub struct SettingChanged {
    pub key: String,
    pub value: Value,
    /// Stored value before the write
    pub old_value: Value,
}

struct TrackedProperty {
    object: Weak<RefCell<dyn PropertyObject>>,
    property: String,
    default_value: Value,
    previous_value: Value,
    label: String,
    options: SettingOptions,
    disconnect: Option<Box<dyn FnOnce()>>,
}

impl TrackedProperty {
    fn value(&self) -> Value {
        match self.object.upgrade() {
            Some(object) => object.borrow().property(&self.property),
            None => Value::Invalid,
        }
    }

    fn kind(&self) -> Option<ValueKind> {
        self.object
            .upgrade()
            .and_then(|object| object.borrow().property_kind(&self.property))
    }

    fn set_value(&self, value: Value) -> bool {
        let Some(object) = self.object.upgrade() else {
            warn!("Object behind property \"{}\" no longer exists", self.property);
            return false;
        };
        let mut object = object.borrow_mut();
        let value = value.normalized_for(object.property_kind(&self.property));
        let success = object.set_property(&self.property, value);
        debug_assert!(success, "failed to set property \"{}\"", self.property);
        if !success {
            warn!("Failed to set property \"{}\"", self.property);
        }
        success
    }
}

impl Drop for TrackedProperty {
    fn drop(&mut self) {
        if let Some(disconnect) = self.disconnect.take() {
            disconnect();
        }
    }
}

struct PanelState {
    store: Option<SharedStore>,
    properties: BTreeMap<String, TrackedProperty>,
    save_on_register: bool,
}

struct Inner {
    state: RefCell<PanelState>,
    setting_changed: Signal<SettingChanged>,
    busy: Cell<bool>,
}

/// Marks the panel as mid-operation; restores the previous mark on drop
struct Busy<'a> {
    flag: &'a Cell<bool>,
    was: bool,
}

impl<'a> Busy<'a> {
    fn enter(flag: &'a Cell<bool>) -> Self {
        let was = flag.replace(true);
        Self { flag, was }
    }
}

impl Drop for Busy<'_> {
    fn drop(&mut self) {
        self.flag.set(self.was);
    }
}

/// The stored value under `key`, if there is one a property of `kind` can
/// take. An unset value only fits string lists.
fn stored_value(store: &SharedStore, key: &str, kind: Option<ValueKind>) -> Option<Value> {
    let store = store.borrow();
    if !store.contains(key) {
        return None;
    }
    let value = store.value(key);
    let fits = match (kind, value.kind()) {
        (None, _) | (Some(ValueKind::StringList), None) => true,
        (Some(expected), Some(actual)) => expected == actual,
        (Some(_), None) => false,
    };
    if !fits {
        warn!(
            "Ignoring stored value {} for setting \"{}\": expected {}",
            value,
            key,
            kind.map(|k| k.name()).unwrap_or_default()
        );
        return None;
    }
    Some(value)
}

impl Inner {
    fn store(&self) -> Option<SharedStore> {
        self.state.borrow().store.clone()
    }

    fn keys(&self) -> Vec<String> {
        self.state.borrow().properties.keys().cloned().collect()
    }

    fn live_value(&self, key: &str) -> Option<Value> {
        self.state.borrow().properties.get(key).map(TrackedProperty::value)
    }

    fn update_setting(&self, key: &str) {
        if self.store().is_none() {
            return;
        }
        let Some(value) = self.live_value(key) else {
            warn!("update requested for unregistered setting \"{}\"", key);
            return;
        };
        self.set_setting(key, value);
    }

    fn set_setting(&self, key: &str, new_value: Value) {
        let Some(store) = self.store() else {
            return;
        };
        if !self.state.borrow().properties.contains_key(key) {
            warn!("Ignoring write to unregistered setting \"{}\"", key);
            return;
        }

        let (old_value, status) = {
            let _busy = Busy::enter(&self.busy);
            let old_value = store.borrow().value(key);
            store.borrow_mut().set_value(key, new_value.clone());

            let state = self.state.borrow();
            if let Some(prop) = state.properties.get(key) {
                prop.set_value(new_value.clone());
            }
            drop(state);

            let mut state = self.state.borrow_mut();
            if let Some(prop) = state.properties.get_mut(key) {
                prop.previous_value = prop.value();
            }
            (old_value, store.borrow().status())
        };

        if !status.is_ok() {
            warn!("Error #{} while writing setting \"{}\"", status.code(), key);
        }
        if old_value != new_value {
            debug!("Setting \"{}\" changed: {} -> {}", key, old_value, new_value);
            self.setting_changed.emit(SettingChanged {
                key: key.to_string(),
                value: new_value,
                old_value,
            });
        }
    }

    /// Write `value` back onto a property and commit it. Goes through the
    /// store when one is attached; otherwise only the live object and the
    /// previous value change.
    fn revert(&self, key: &str, value: Value) {
        if self.store().is_some() {
            self.set_setting(key, value);
            return;
        }
        let _busy = Busy::enter(&self.busy);
        let mut state = self.state.borrow_mut();
        if let Some(prop) = state.properties.get_mut(key) {
            prop.set_value(value);
            prop.previous_value = prop.value();
        }
    }

    fn update_properties(&self) {
        let Some(store) = self.store() else {
            return;
        };
        let _busy = Busy::enter(&self.busy);

        for key in self.keys() {
            let kind = self
                .state
                .borrow()
                .properties
                .get(&key)
                .and_then(TrackedProperty::kind);
            match stored_value(&store, &key, kind) {
                Some(value) => {
                    let mut state = self.state.borrow_mut();
                    if let Some(prop) = state.properties.get_mut(&key) {
                        prop.set_value(value.clone());
                        prop.previous_value = value.normalized_for(kind);
                    }
                }
                None => self.update_setting(&key),
            }
        }
    }
}

/// Keeps registered object properties and a settings store in sync
pub struct SettingsPanel {
    inner: Rc<Inner>,
}

impl SettingsPanel {
    /// A panel without a store; store-backed operations are no-ops until
    /// one is attached
    pub fn new() -> Self {
        Self {
            inner: Rc::new(Inner {
                state: RefCell::new(PanelState {
                    store: None,
                    properties: BTreeMap::new(),
                    save_on_register: true,
                }),
                setting_changed: Signal::new(),
                busy: Cell::new(false),
            }),
        }
    }

    pub fn with_store(store: SharedStore) -> Self {
        let panel = Self::new();
        panel.inner.state.borrow_mut().store = Some(store);
        panel
    }

    pub fn store(&self) -> Option<SharedStore> {
        self.inner.store()
    }

    /// Attach a store and pull its values onto the registered properties.
    /// Attaching the store already in use does nothing.
    pub fn set_store(&self, store: SharedStore) {
        if let Some(current) = self.inner.store() {
            if same_store(&current, &store) {
                return;
            }
        }
        self.inner.state.borrow_mut().store = Some(store);
        self.update_properties();
    }

    pub fn clear_store(&self) {
        self.inner.state.borrow_mut().store = None;
    }

    /// Whether `register_property` immediately writes the bound value to
    /// the store (on by default)
    pub fn save_to_store_on_register(&self) -> bool {
        self.inner.state.borrow().save_on_register
    }

    pub fn set_save_to_store_on_register(&self, save: bool) {
        self.inner.state.borrow_mut().save_on_register = save;
    }

    /// Observers of committed, value-changing writes
    pub fn setting_changed(&self) -> &Signal<SettingChanged> {
        &self.inner.setting_changed
    }

    /// Bind `property` of `object` to `key`.
    ///
    /// The live value becomes the default and previous value. A value
    /// already stored under `key` wins: it is written onto the object and
    /// becomes the previous value. Every emission of `change_source` pushes
    /// the live value to the store. Registering a key again replaces the
    /// earlier binding.
    ///
    /// The panel holds only weak references to `object` and
    /// `change_source`.
    pub fn register_property<O, S>(
        &self,
        key: &str,
        object: &Rc<RefCell<O>>,
        property: &str,
        change_source: &Rc<Signal<S>>,
        label: &str,
        options: SettingOptions,
    ) -> Result<()>
    where
        O: PropertyObject + 'static,
        S: 'static,
    {
        let invalid = |reason: &str| SettingsError::InvalidBinding {
            key: key.to_string(),
            reason: reason.to_string(),
        };
        if key.is_empty() {
            return Err(invalid("empty key"));
        }
        if property.is_empty() {
            return Err(invalid("empty property name"));
        }
        if object.borrow().property_kind(property).is_none() {
            return Err(invalid(&format!("object has no property \"{}\"", property)));
        }

        let shared: Rc<RefCell<dyn PropertyObject>> = object.clone();
        let live = shared.borrow().property(property);
        let mut prop = TrackedProperty {
            object: Rc::downgrade(&shared),
            property: property.to_string(),
            default_value: live.clone(),
            previous_value: live,
            label: label.to_string(),
            options,
            disconnect: None,
        };

        if let Some(store) = self.inner.store() {
            let kind = prop.kind();
            if let Some(value) = stored_value(&store, key, kind) {
                let _busy = Busy::enter(&self.inner.busy);
                prop.set_value(value.clone());
                prop.previous_value = value.normalized_for(kind);
            }
        }

        // One slot per registration, tagged with its key, so several
        // sources can feed the same panel
        let panel = Rc::downgrade(&self.inner);
        let slot_key = key.to_string();
        let id = change_source.connect(move |_| {
            if let Some(inner) = panel.upgrade() {
                // Echo of the panel's own write
                if inner.busy.get() {
                    return;
                }
                inner.update_setting(&slot_key);
            }
        });
        let source = Rc::downgrade(change_source);
        prop.disconnect = Some(Box::new(move || {
            if let Some(source) = source.upgrade() {
                source.disconnect(id);
            }
        }));

        let replaced = self
            .inner
            .state
            .borrow_mut()
            .properties
            .insert(key.to_string(), prop);
        debug!("Registered setting \"{}\" -> {}", key, property);
        // Disconnect the old binding outside the state borrow
        drop(replaced);

        if self.save_to_store_on_register() {
            self.update_setting(key);
        }
        Ok(())
    }

    /// Push the live value of `key` to the store. No-op without a store.
    pub fn update_setting(&self, key: &str) {
        self.inner.update_setting(key);
    }

    /// Write `value` to the store and to the live property, and commit it
    /// as the previous value. Observers are notified when the stored value
    /// changed. No-op without a store or for unregistered keys.
    pub fn set_setting(&self, key: &str, value: impl Into<Value>) {
        self.inner.set_setting(key, value.into());
    }

    /// Pull stored values onto every property; keys missing from the store
    /// are filled from the live values. No-op without a store.
    pub fn update_properties(&self) {
        self.inner.update_properties();
    }

    /// Keys whose live value differs from the previous value
    pub fn changed_settings(&self) -> Vec<String> {
        let state = self.inner.state.borrow();
        state
            .properties
            .iter()
            .filter(|(_, prop)| prop.previous_value != prop.value())
            .map(|(key, _)| key.clone())
            .collect()
    }

    /// Commit live values as the previous values without touching the store
    pub fn apply_settings(&self) {
        let mut state = self.inner.state.borrow_mut();
        for prop in state.properties.values_mut() {
            prop.previous_value = prop.value();
        }
    }

    /// Write every previous value back through [`SettingsPanel::set_setting`].
    /// Without a store only the live properties are reverted.
    pub fn reset_settings(&self) {
        for key in self.inner.keys() {
            let previous = self.previous_property_value(&key);
            self.inner.revert(&key, previous);
        }
    }

    /// Write every default value back through [`SettingsPanel::set_setting`].
    /// Without a store only the live properties are restored.
    pub fn restore_default_settings(&self) {
        for key in self.inner.keys() {
            let default = self.default_property_value(&key);
            self.inner.revert(&key, default);
        }
    }

    pub fn default_property_value(&self, key: &str) -> Value {
        self.inner
            .state
            .borrow()
            .properties
            .get(key)
            .map(|p| p.default_value.clone())
            .unwrap_or_default()
    }

    pub fn previous_property_value(&self, key: &str) -> Value {
        self.inner
            .state
            .borrow()
            .properties
            .get(key)
            .map(|p| p.previous_value.clone())
            .unwrap_or_default()
    }

    pub fn property_value(&self, key: &str) -> Value {
        self.inner.live_value(key).unwrap_or_default()
    }

    pub fn setting_label(&self, key: &str) -> String {
        self.inner
            .state
            .borrow()
            .properties
            .get(key)
            .map(|p| p.label.clone())
            .unwrap_or_default()
    }

    pub fn setting_options(&self, key: &str) -> SettingOptions {
        self.inner
            .state
            .borrow()
            .properties
            .get(key)
            .map(|p| p.options)
            .unwrap_or_default()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.inner.state.borrow().properties.contains_key(key)
    }

    /// Registered keys, sorted
    pub fn keys(&self) -> Vec<String> {
        self.inner.keys()
    }
}

impl Default for SettingsPanel {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for SettingsPanel {
    fn drop(&mut self) {
        self.apply_settings();
        let properties = std::mem::take(&mut self.inner.state.borrow_mut().properties);
        drop(properties);
    }
}

fn same_store(a: &SharedStore, b: &SharedStore) -> bool {
    std::ptr::eq(Rc::as_ptr(a) as *const (), Rc::as_ptr(b) as *const ())
}
