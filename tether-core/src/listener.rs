//! Listener types.
//!
//! A [`Listener`] is a change callback with a stable identity: clones of the
//! same listener are the same listener, so registries can coalesce
//! duplicates. An [`Unsubscribe`] removes a registration and is safe to call
//! any number of times.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// A change callback invoked with no argument.
#[derive(Clone)]
pub struct Listener {
    notify: Rc<dyn Fn()>,
}

impl Listener {
    /// Wrap a callback.
    pub fn new<F>(notify: F) -> Self
    where
        F: Fn() + 'static,
    {
        Self {
            notify: Rc::new(notify),
        }
    }

    /// Invoke the callback.
    pub fn notify(&self) {
        (self.notify)();
    }

    /// Identity of this listener; equal for clones.
    pub fn key(&self) -> usize {
        Rc::as_ptr(&self.notify) as *const () as usize
    }

    /// Whether `self` and `other` are the same listener.
    pub fn ptr_eq(&self, other: &Listener) -> bool {
        self.key() == other.key()
    }
}

impl fmt::Debug for Listener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Listener").field(&self.key()).finish()
    }
}

/// Removes a registration. Only the first call has an effect.
pub struct Unsubscribe {
    remove: RefCell<Option<Box<dyn FnOnce()>>>,
}

impl Unsubscribe {
    /// Wrap the removal step.
    pub fn new<F>(remove: F) -> Self
    where
        F: FnOnce() + 'static,
    {
        Self {
            remove: RefCell::new(Some(Box::new(remove))),
        }
    }

    /// An unsubscribe that does nothing.
    pub fn noop() -> Self {
        Self {
            remove: RefCell::new(None),
        }
    }

    /// Remove the registration. Later calls are no-ops.
    pub fn unsubscribe(&self) {
        // Release the borrow before running the removal, which may re-enter.
        let remove = self.remove.borrow_mut().take();
        if let Some(remove) = remove {
            remove();
        }
    }

    /// Whether the registration is still in place.
    pub fn is_active(&self) -> bool {
        self.remove.borrow().is_some()
    }
}

impl fmt::Debug for Unsubscribe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Unsubscribe")
            .field("active", &self.is_active())
            .finish()
    }
}
