//! Notification Batching
//!
//! One change to a source can reach a component along several paths, for
//! example two snapshot reads of the same source that each track their own
//! slice. Rendering as soon as the first path reports would commit the
//! second read's old snapshot next to the first read's new one.
//!
//! While a batch is open, an update scheduled on an idle root only marks it
//! dirty and queues it here. When the outermost batch closes, every queued
//! root is flushed once. [`Slice::update`](crate::Slice::update) delivers
//! inside a batch; a source that notifies its own listeners can wrap its
//! delivery loop in [`batch`] for the same effect.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use super::root::Scheduler;

thread_local! {
    static DEPTH: Cell<usize> = const { Cell::new(0) };
    static PENDING: RefCell<Vec<Rc<Scheduler>>> = const { RefCell::new(Vec::new()) };
}

/// Run `f` with re-renders deferred until the outermost batch ends.
///
/// # Example
///
/// ```ignore
/// batch(|| {
///     for listener in &listeners {
///         listener.notify();
///     }
/// });
/// ```
pub fn batch<T>(f: impl FnOnce() -> T) -> T {
    DEPTH.with(|depth| depth.set(depth.get() + 1));
    let _guard = BatchGuard;
    f()
}

/// Whether a batch is open on this thread.
pub fn is_batching() -> bool {
    DEPTH.with(|depth| depth.get() > 0)
}

/// Queue `scheduler` for the end of the outermost batch.
pub(crate) fn defer(scheduler: &Rc<Scheduler>) {
    PENDING.with(|pending| {
        let mut pending = pending.borrow_mut();
        if !pending.iter().any(|queued| Rc::ptr_eq(queued, scheduler)) {
            pending.push(Rc::clone(scheduler));
        }
    });
}

struct BatchGuard;

impl Drop for BatchGuard {
    fn drop(&mut self) {
        let depth = DEPTH.with(|depth| {
            let next = depth.get().saturating_sub(1);
            depth.set(next);
            next
        });
        if depth > 0 {
            return;
        }

        let pending = PENDING.with(|pending| std::mem::take(&mut *pending.borrow_mut()));
        if std::thread::panicking() {
            // Queued roots stay dirty and render on their next flush.
            return;
        }
        for scheduler in pending {
            scheduler.flush_now();
        }
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
