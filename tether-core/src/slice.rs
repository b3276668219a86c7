//! Versioned Slice
//!
//! A slice answers one question for a group of snapshot derivations: has
//! anything changed since I last looked? It is a version counter plus a set
//! of listeners.
//!
//! # Guarantees
//!
//! - `version` starts at 0 and grows by exactly one per [`Slice::update`].
//! - Two reads with no `update` in between observe the same version.
//! - A listener registered twice is stored once and notified once.
//! - `update` may be called from inside a listener. Each call notifies the
//!   listeners that were registered when it started; listeners removed
//!   before their turn are skipped, listeners added during delivery wait for
//!   the next `update`.

use std::cell::{Cell, RefCell};
use std::fmt::Debug;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use indexmap::IndexMap;

use crate::deps::DepKey;
use crate::host::batch;
use crate::listener::{Listener, Unsubscribe};

/// Counter for generating unique slice IDs.
static SLICE_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

fn next_slice_id() -> u64 {
    SLICE_ID_COUNTER.fetch_add(1, Ordering::Relaxed)
}

struct SliceInner {
    id: u64,
    version: Cell<u64>,
    listeners: RefCell<IndexMap<usize, Listener>>,
}

/// A version counter with change listeners.
///
/// Clones share state.
#[derive(Clone)]
pub struct Slice {
    inner: Rc<SliceInner>,
}

impl Slice {
    /// Create a slice at version 0 with no listeners.
    pub fn new() -> Self {
        Self {
            inner: Rc::new(SliceInner {
                id: next_slice_id(),
                version: Cell::new(0),
                listeners: RefCell::new(IndexMap::new()),
            }),
        }
    }

    /// Get the slice's unique ID.
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    /// The current version.
    pub fn version(&self) -> u64 {
        self.inner.version.get()
    }

    /// Identity key for dependency lists.
    pub fn key(&self) -> DepKey {
        DepKey::identity(&self.inner)
    }

    /// Record a change and notify every registered listener.
    ///
    /// Delivery runs inside a [`batch`], so roots re-render once after every
    /// listener has seen the change.
    pub fn update(&self) {
        let version = self.inner.version.get() + 1;
        self.inner.version.set(version);

        // Deliver to a copy so listeners can (un)register while we iterate.
        let listeners: Vec<Listener> = self.inner.listeners.borrow().values().cloned().collect();
        tracing::trace!(slice = self.inner.id, version, listeners = listeners.len(), "slice updated");

        batch(|| {
            for listener in listeners {
                let still_registered = self.inner.listeners.borrow().contains_key(&listener.key());
                if still_registered {
                    listener.notify();
                }
            }
        });
    }

    /// Register `listener`. Registering the same listener again is a no-op.
    ///
    /// The returned [`Unsubscribe`] removes exactly this listener.
    pub fn subscribe(&self, listener: Listener) -> Unsubscribe {
        let key = listener.key();
        self.inner
            .listeners
            .borrow_mut()
            .entry(key)
            .or_insert(listener);

        let weak: Weak<SliceInner> = Rc::downgrade(&self.inner);
        Unsubscribe::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner.listeners.borrow_mut().shift_remove(&key);
            }
        })
    }

    /// A listener that calls [`Slice::update`] on this slice.
    ///
    /// Holds the slice weakly, so handing it to a source does not keep the
    /// slice alive.
    pub fn notifier(&self) -> Listener {
        let weak = Rc::downgrade(&self.inner);
        Listener::new(move || {
            if let Some(inner) = weak.upgrade() {
                Slice { inner }.update();
            }
        })
    }

    /// Number of registered listeners.
    pub fn listener_count(&self) -> usize {
        self.inner.listeners.borrow().len()
    }
}

impl Default for Slice {
    fn default() -> Self {
        Self::new()
    }
}

impl Debug for Slice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Slice")
            .field("id", &self.inner.id)
            .field("version", &self.version())
            .field("listener_count", &self.listener_count())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn counting_listener() -> (Listener, Rc<Cell<u32>>) {
        let calls = Rc::new(Cell::new(0));
        let calls_clone = calls.clone();
        let listener = Listener::new(move || calls_clone.set(calls_clone.get() + 1));
        (listener, calls)
    }

    #[test]
    fn version_increments_once_per_update() {
        let slice = Slice::new();
        assert_eq!(slice.version(), 0);

        for expected in 1..=5 {
            slice.update();
            assert_eq!(slice.version(), expected);
            // Reading again without an update is stable.
            assert_eq!(slice.version(), expected);
        }
    }

    #[test]
    fn update_notifies_listeners() {
        let slice = Slice::new();
        let (listener, calls) = counting_listener();
        let _unsubscribe = slice.subscribe(listener);

        slice.update();
        assert_eq!(calls.get(), 1);

        slice.update();
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn duplicate_listener_is_coalesced() {
        let slice = Slice::new();
        let (listener, calls) = counting_listener();

        let _first = slice.subscribe(listener.clone());
        let _second = slice.subscribe(listener);
        assert_eq!(slice.listener_count(), 1);

        slice.update();
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn unsubscribe_removes_listener_once() {
        let slice = Slice::new();
        let (listener, calls) = counting_listener();
        let (other, other_calls) = counting_listener();

        let unsubscribe = slice.subscribe(listener);
        let _keep = slice.subscribe(other);

        unsubscribe.unsubscribe();
        unsubscribe.unsubscribe();
        assert_eq!(slice.listener_count(), 1);

        slice.update();
        assert_eq!(calls.get(), 0);
        assert_eq!(other_calls.get(), 1);
    }

    #[test]
    fn reentrant_update_from_listener() {
        let slice = Slice::new();
        let seen = Rc::new(RefCell::new(Vec::new()));

        let inner_slice = slice.clone();
        let seen_clone = seen.clone();
        let listener = Listener::new(move || {
            let version = inner_slice.version();
            seen_clone.borrow_mut().push(version);
            if version < 3 {
                inner_slice.update();
            }
        });
        let _unsubscribe = slice.subscribe(listener);

        slice.update();

        assert_eq!(slice.version(), 3);
        assert_eq!(*seen.borrow(), vec![1, 2, 3]);
    }

    #[test]
    fn listener_removed_during_delivery_is_skipped() {
        let slice = Slice::new();
        let (victim, victim_calls) = counting_listener();
        let victim_unsubscribe = Rc::new(RefCell::new(None::<Unsubscribe>));

        let remover_handle = victim_unsubscribe.clone();
        let remover = Listener::new(move || {
            if let Some(unsubscribe) = remover_handle.borrow().as_ref() {
                unsubscribe.unsubscribe();
            }
        });

        let _remover = slice.subscribe(remover);
        *victim_unsubscribe.borrow_mut() = Some(slice.subscribe(victim));

        slice.update();
        assert_eq!(victim_calls.get(), 0);
        assert_eq!(slice.listener_count(), 1);
    }

    #[test]
    fn listener_added_during_delivery_waits() {
        let slice = Slice::new();
        let (late, late_calls) = counting_listener();
        let registrations = Rc::new(RefCell::new(Vec::new()));

        let adder_slice = slice.clone();
        let adder_registrations = registrations.clone();
        let adder = Listener::new(move || {
            adder_registrations
                .borrow_mut()
                .push(adder_slice.subscribe(late.clone()));
        });
        let _adder = slice.subscribe(adder);

        slice.update();
        assert_eq!(late_calls.get(), 0);

        slice.update();
        assert_eq!(late_calls.get(), 1);
    }

    #[test]
    fn notifier_updates_slice() {
        let slice = Slice::new();
        let notifier = slice.notifier();

        notifier.notify();
        notifier.notify();
        assert_eq!(slice.version(), 2);

        drop(slice);
        // A dangling notifier is harmless.
        notifier.notify();
    }
}
