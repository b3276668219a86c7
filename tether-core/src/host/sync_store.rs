//! Synchronized External Values
//!
//! [`Cx::use_sync_external_store`] is the one primitive the snapshot layer
//! needs from the host. Its contract:
//!
//! - `get_snapshot` is called during render and must return SameValue-equal
//!   results between notifications.
//! - `subscribe` is called from a passive effect and re-called whenever its
//!   identity changes; the returned [`Unsubscribe`] runs before the next
//!   subscription and on unmount.
//! - After render, after commit and after every notification the host calls
//!   `get_snapshot` again and re-renders if the value moved. This is the
//!   self-correction step: a change the component missed is caught the next
//!   time the host compares.
//! - In the static environment `get_server_snapshot` is read instead and
//!   nothing is subscribed.

use std::cell::RefCell;
use std::rc::Rc;

use super::cx::Cx;
use crate::deps;
use crate::deps::DepKey;
use crate::diagnostics::{self, Misuse};
use crate::equality::SameValue;
use crate::listener::{Listener, Unsubscribe};

/// Subscribe callback handed to the host.
pub type SubscribeFn = Rc<dyn Fn(Listener) -> Unsubscribe>;

/// Snapshot getter handed to the host.
pub type SnapshotFn<T> = Rc<dyn Fn() -> T>;

struct StoreInstance<T> {
    value: RefCell<T>,
    get_snapshot: RefCell<SnapshotFn<T>>,
}

impl<T: SameValue> StoreInstance<T> {
    fn changed(&self) -> bool {
        let get_snapshot = Rc::clone(&self.get_snapshot.borrow());
        let latest = get_snapshot();
        !self.value.borrow().same_value(&latest)
    }
}

impl Cx {
    /// Read an external value and re-render whenever it changes.
    pub fn use_sync_external_store<T>(
        &mut self,
        subscribe: SubscribeFn,
        get_snapshot: SnapshotFn<T>,
        get_server_snapshot: SnapshotFn<T>,
    ) -> T
    where
        T: Clone + SameValue + 'static,
    {
        let interactive = self.environment().runs_effects();
        let value = if interactive {
            get_snapshot()
        } else {
            get_server_snapshot()
        };

        if diagnostics::ENABLED && interactive {
            let again = get_snapshot();
            if !value.same_value(&again) {
                diagnostics::warn_once(Misuse::UncachedSnapshot);
            }
        }

        let (_, force) = self.use_state(|| 0_u64);
        let instance = self.use_ref(|| StoreInstance {
            value: RefCell::new(value.clone()),
            get_snapshot: RefCell::new(Rc::clone(&get_snapshot)),
        });

        {
            let instance = Rc::clone(&instance);
            let force = force.clone();
            let value = value.clone();
            self.use_layout_effect(None, move || {
                *instance.value.borrow_mut() = value;
                *instance.get_snapshot.borrow_mut() = get_snapshot;
                if instance.changed() {
                    force.update(|n| n + 1);
                }
                None
            });
        }

        let subscription_deps = deps![DepKey::identity(&subscribe)];
        self.use_effect(Some(subscription_deps), move || {
            let listener_instance = Rc::clone(&instance);
            let listener_force = force.clone();
            let unsubscribe = subscribe(Listener::new(move || {
                if listener_instance.changed() {
                    listener_force.update(|n| n + 1);
                }
            }));

            // Catch anything that moved between render and subscription.
            if instance.changed() {
                force.update(|n| n + 1);
            }
            Some(Box::new(move || unsubscribe.unsubscribe()))
        });

        value
    }
}
