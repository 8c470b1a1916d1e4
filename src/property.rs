// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Live objects with named, typed properties

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;
use tracing::debug;

use crate::signal::Signal;
use crate::value::{Value, ValueKind};
use crate::{Result, SettingsError};

/// Get/set-by-name access to an object's properties.
///
/// Implement this for any type whose state should be bound to a settings
/// store. `set_property` returning false means the caller broke the
/// object's contract (unknown property, wrong type).
pub trait PropertyObject {
    /// Current value, `Value::Invalid` for unknown properties
    fn property(&self, name: &str) -> Value;

    fn set_property(&mut self, name: &str, value: Value) -> bool;

    /// Declared type, `None` for unknown properties
    fn property_kind(&self, name: &str) -> Option<ValueKind>;
}

/// Shared handle to a live object
pub type SharedObject = Rc<RefCell<dyn PropertyObject>>;

#[derive(Debug)]
struct BagProperty {
    kind: ValueKind,
    value: Value,
    changed: Rc<Signal<Value>>,
}

/// A dynamic object: a named set of typed properties, each with its own
/// change signal.
#[derive(Debug)]
pub struct PropertyBag {
    name: String,
    properties: BTreeMap<String, BagProperty>,
}

impl PropertyBag {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            properties: BTreeMap::new(),
        }
    }

    /// Builder form of [`PropertyBag::declare`]
    pub fn with_property(
        mut self,
        name: &str,
        kind: ValueKind,
        initial: impl Into<Value>,
    ) -> Result<Self> {
        self.declare(name, kind, initial)?;
        Ok(self)
    }

    /// Declare a property. Redeclaring replaces the old one and its signal.
    pub fn declare(&mut self, name: &str, kind: ValueKind, initial: impl Into<Value>) -> Result<()> {
        let initial = coerce(kind, initial.into().normalized_for(Some(kind))).ok_or_else(|| {
            SettingsError::InvalidValue {
                kind: kind.to_string(),
                input: name.to_string(),
            }
        })?;

        self.properties.insert(
            name.to_string(),
            BagProperty {
                kind,
                value: initial,
                changed: Rc::new(Signal::new()),
            },
        );
        Ok(())
    }

    pub fn into_shared(self) -> Rc<RefCell<Self>> {
        Rc::new(RefCell::new(self))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Change signal of a property; emits the new value
    pub fn changed(&self, name: &str) -> Option<Rc<Signal<Value>>> {
        self.properties.get(name).map(|p| Rc::clone(&p.changed))
    }

    /// Set a property as a user edit would: write it, then notify observers
    /// once the object is no longer borrowed.
    ///
    /// Returns false if the property is unknown or the value has the wrong
    /// type. Observers are only notified when the value actually changed.
    pub fn set(this: &Rc<RefCell<Self>>, name: &str, value: impl Into<Value>) -> bool {
        let notify = {
            let mut bag = this.borrow_mut();
            let before = bag.property(name);
            if !bag.set_property(name, value.into()) {
                return false;
            }
            let after = bag.property(name);
            if before == after {
                None
            } else {
                bag.changed(name).map(|signal| (signal, after))
            }
        };

        if let Some((signal, value)) = notify {
            signal.emit(value);
        }
        true
    }
}

impl PropertyObject for PropertyBag {
    fn property(&self, name: &str) -> Value {
        self.properties
            .get(name)
            .map(|p| p.value.clone())
            .unwrap_or_default()
    }

    fn set_property(&mut self, name: &str, value: Value) -> bool {
        let Some(prop) = self.properties.get_mut(name) else {
            debug!("{}: no property named {:?}", self.name, name);
            return false;
        };

        match coerce(prop.kind, value) {
            Some(value) => {
                prop.value = value;
                true
            }
            None => {
                debug!("{}.{}: rejected value of the wrong type", self.name, name);
                false
            }
        }
    }

    fn property_kind(&self, name: &str) -> Option<ValueKind> {
        self.properties.get(name).map(|p| p.kind)
    }
}

/// Accept a value for a property of `kind`, widening integers to doubles
fn coerce(kind: ValueKind, value: Value) -> Option<Value> {
    match (kind, value) {
        (ValueKind::Double, Value::Int(i)) => Some(Value::Double(i as f64)),
        (kind, value) if kind.accepts(&value) => Some(value),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn bag() -> Rc<RefCell<PropertyBag>> {
        PropertyBag::new("editor")
            .with_property("fontSize", ValueKind::Int, 12)
            .unwrap()
            .with_property("zoom", ValueKind::Double, 1.0)
            .unwrap()
            .with_property("recent", ValueKind::StringList, Value::Invalid)
            .unwrap()
            .into_shared()
    }

    #[test]
    fn test_declare_normalizes_unset_string_list() {
        let bag = bag();
        assert_eq!(bag.borrow().property("recent"), Value::StringList(vec![]));
    }

    #[test]
    fn test_set_property_checks_kind() {
        let bag = bag();
        let mut b = bag.borrow_mut();
        assert!(b.set_property("fontSize", Value::Int(14)));
        assert!(!b.set_property("fontSize", Value::from("big")));
        assert!(!b.set_property("missing", Value::Int(1)));
        assert!(b.set_property("zoom", Value::Int(2)));
        assert_eq!(b.property("zoom"), Value::Double(2.0));
        assert_eq!(b.property("missing"), Value::Invalid);
        assert_eq!(b.property_kind("recent"), Some(ValueKind::StringList));
    }

    #[test]
    fn test_set_notifies_only_on_change() {
        let bag = bag();
        let hits = Rc::new(Cell::new(0));
        let h = hits.clone();
        bag.borrow()
            .changed("fontSize")
            .unwrap()
            .connect(move |_| h.set(h.get() + 1));

        assert!(PropertyBag::set(&bag, "fontSize", 13));
        assert!(PropertyBag::set(&bag, "fontSize", 13));
        assert!(!PropertyBag::set(&bag, "fontSize", "nope"));
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn test_observer_may_read_object_during_notification() {
        let bag = bag();
        let seen = Rc::new(RefCell::new(Value::Invalid));
        let (weak, s) = (Rc::downgrade(&bag), seen.clone());
        bag.borrow().changed("fontSize").unwrap().connect(move |_| {
            if let Some(bag) = weak.upgrade() {
                *s.borrow_mut() = bag.borrow().property("fontSize");
            }
        });

        PropertyBag::set(&bag, "fontSize", 20);
        assert_eq!(*seen.borrow(), Value::Int(20));
    }
}
