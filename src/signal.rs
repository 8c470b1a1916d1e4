// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Single-threaded observer registry
//!
//! A [`Signal`] holds an ordered list of slots. [`Signal::emit`] calls every
//! slot synchronously, in connection order, on the calling thread. Slots may
//! connect or disconnect (themselves included) while an emission is running;
//! such changes take effect on the next emission.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

/// Identifies one connection on a signal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

type Slot<T> = Rc<dyn Fn(&T)>;

pub struct Signal<T> {
    slots: RefCell<Vec<(ConnectionId, Slot<T>)>>,
    next_id: Cell<u64>,
}

impl<T> Signal<T> {
    pub fn new() -> Self {
        Self {
            slots: RefCell::new(Vec::new()),
            next_id: Cell::new(0),
        }
    }

    /// Connect a slot; it runs after every slot connected before it
    pub fn connect<F>(&self, slot: F) -> ConnectionId
    where
        F: Fn(&T) + 'static,
    {
        let id = ConnectionId(self.next_id.get());
        self.next_id.set(id.0 + 1);
        self.slots.borrow_mut().push((id, Rc::new(slot)));
        id
    }

    /// Remove a slot. Returns false if it was not connected.
    pub fn disconnect(&self, id: ConnectionId) -> bool {
        let mut slots = self.slots.borrow_mut();
        let before = slots.len();
        slots.retain(|(slot_id, _)| *slot_id != id);
        slots.len() != before
    }

    pub fn emit(&self, value: T) {
        // Snapshot so slots can touch the connection list
        let slots: Vec<Slot<T>> = self
            .slots
            .borrow()
            .iter()
            .map(|(_, slot)| Rc::clone(slot))
            .collect();

        for slot in slots {
            slot(&value);
        }
    }

    pub fn connection_count(&self) -> usize {
        self.slots.borrow().len()
    }
}

impl<T> Default for Signal<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for Signal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signal")
            .field("connections", &self.connection_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emit_in_connection_order() {
        let signal = Signal::<i32>::new();
        let seen = Rc::new(RefCell::new(Vec::new()));

        let s = seen.clone();
        signal.connect(move |v| s.borrow_mut().push(("first", *v)));
        let s = seen.clone();
        signal.connect(move |v| s.borrow_mut().push(("second", *v)));

        signal.emit(7);
        assert_eq!(*seen.borrow(), vec![("first", 7), ("second", 7)]);
    }

    #[test]
    fn test_disconnect() {
        let signal = Signal::<()>::new();
        let hits = Rc::new(Cell::new(0));

        let h = hits.clone();
        let id = signal.connect(move |_| h.set(h.get() + 1));
        signal.emit(());
        assert!(signal.disconnect(id));
        assert!(!signal.disconnect(id));
        signal.emit(());

        assert_eq!(hits.get(), 1);
        assert_eq!(signal.connection_count(), 0);
    }

    #[test]
    fn test_slot_can_disconnect_during_emit() {
        let signal = Rc::new(Signal::<()>::new());
        let hits = Rc::new(Cell::new(0));
        let own_id = Rc::new(Cell::new(None));

        let (sig, h, id_cell) = (Rc::downgrade(&signal), hits.clone(), own_id.clone());
        let id = signal.connect(move |_| {
            h.set(h.get() + 1);
            if let (Some(sig), Some(id)) = (sig.upgrade(), id_cell.get()) {
                sig.disconnect(id);
            }
        });
        own_id.set(Some(id));

        signal.emit(());
        signal.emit(());
        assert_eq!(hits.get(), 1);
    }
}
