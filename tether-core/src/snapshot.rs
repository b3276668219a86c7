//! Snapshot Accessors
//!
//! Shared machinery behind both subscription families. An accessor turns a
//! caller's `get_snapshot(source, previous)` into the cheap, idempotent
//! getter the host's synchronization primitive expects.
//!
//! # Memoization
//!
//! The getter re-derives only when its stamp moves. The stamp is the
//! tracking slice's version plus whether the source exists, so a getter
//! called twice with no change in between returns the cached snapshot, and
//! the first read after the source is created always re-derives.
//!
//! With diagnostics enabled every fresh derivation calls `get_snapshot` a
//! second time with the same arguments. A result that is not SameValue-equal
//! to the first means the caller builds a new value per call, which the host
//! would otherwise see as a change on every notification.
//!
//! The same getter is handed to the host as the client and the server
//! snapshot: a source is derived locally, so the result does not depend on
//! where rendering happens.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::deps;
use crate::deps::{chain, DepKey, Deps};
use crate::diagnostics::{self, Misuse};
use crate::equality::SameValue;
use crate::host::{Cx, SnapshotFn, SubscribeFn};
use crate::lazy::LazyInit;
use crate::slice::Slice;

/// Where an accessor finds its source.
pub(crate) enum SourceHandle<S> {
    /// Created on first use, possibly absent.
    Lazy(LazyInit<S>),
    /// Created during render, always present.
    Pure(Rc<S>),
}

impl<S> Clone for SourceHandle<S> {
    fn clone(&self) -> Self {
        match self {
            SourceHandle::Lazy(lazy) => SourceHandle::Lazy(lazy.clone()),
            SourceHandle::Pure(source) => SourceHandle::Pure(Rc::clone(source)),
        }
    }
}

impl<S: Clone + 'static> SourceHandle<S> {
    /// The source if it exists.
    pub(crate) fn current(&self) -> Option<S> {
        match self {
            SourceHandle::Lazy(lazy) => lazy.current(),
            SourceHandle::Pure(source) => Some(S::clone(source)),
        }
    }

    /// The source, creating it if needed.
    pub(crate) fn realize(&self) -> S {
        match self {
            SourceHandle::Lazy(lazy) => lazy.get(),
            SourceHandle::Pure(source) => S::clone(source),
        }
    }

    /// Identity of the source's epoch.
    pub(crate) fn key(&self) -> DepKey {
        match self {
            SourceHandle::Lazy(lazy) => lazy.key(),
            SourceHandle::Pure(source) => DepKey::identity(source),
        }
    }

    fn is_lazy(&self) -> bool {
        matches!(self, SourceHandle::Lazy(_))
    }
}

struct Accessor<S, T> {
    source: SourceHandle<S>,
    slice: Slice,
    get_snapshot: Box<dyn Fn(Option<&S>, Option<&T>) -> T>,
    stamp: Cell<Option<(u64, bool)>>,
    cached: RefCell<Option<T>>,
    fallback_checked: Cell<bool>,
}

impl<S, T> Accessor<S, T>
where
    S: Clone + 'static,
    T: Clone + SameValue + 'static,
{
    fn read(&self) -> T {
        let source = self.source.current();
        let stamp = (self.slice.version(), source.is_some());

        if self.stamp.get() == Some(stamp) {
            if let Some(cached) = self.cached.borrow().as_ref() {
                return cached.clone();
            }
        }

        let previous = self.cached.borrow_mut().take();
        let next = (self.get_snapshot)(source.as_ref(), previous.as_ref());

        if diagnostics::ENABLED {
            self.check(source.as_ref(), previous.as_ref(), &next);
        }

        *self.cached.borrow_mut() = Some(next.clone());
        self.stamp.set(Some(stamp));
        next
    }

    /// Development checks on a fresh derivation.
    fn check(&self, source: Option<&S>, previous: Option<&T>, next: &T) {
        let again = (self.get_snapshot)(source, previous);
        if !again.same_value(next) {
            diagnostics::warn_once(Misuse::UncachedSnapshot);
        }

        if source.is_some() && self.source.is_lazy() && !self.fallback_checked.replace(true) {
            let fallback = (self.get_snapshot)(None, None);
            if !fallback.same_value(next) {
                diagnostics::warn_once(Misuse::SnapshotMismatch);
            }
        }
    }
}

/// Memoized getter over `source`, tracked by `slice`.
///
/// Without `snapshot_deps` the first `get_snapshot` of the source's epoch is
/// kept; with them, a new list builds a new getter.
pub(crate) fn use_getter<S, T, G>(
    cx: &mut Cx,
    source: &SourceHandle<S>,
    slice: &Slice,
    get_snapshot: G,
    snapshot_deps: Option<&Deps>,
) -> SnapshotFn<T>
where
    S: Clone + 'static,
    T: Clone + SameValue + 'static,
    G: Fn(Option<&S>, Option<&T>) -> T + 'static,
{
    let deps = chain(deps![source.key(), slice.key()], snapshot_deps);
    cx.use_memo(deps, || {
        let accessor = Accessor {
            source: source.clone(),
            slice: slice.clone(),
            get_snapshot: Box::new(get_snapshot),
            stamp: Cell::new(None),
            cached: RefCell::new(None),
            fallback_checked: Cell::new(false),
        };
        Rc::new(move || accessor.read()) as SnapshotFn<T>
    })
}

/// Read `getter` through the host, using it for both environments.
pub(crate) fn use_synced<T>(cx: &mut Cx, subscribe: SubscribeFn, getter: SnapshotFn<T>) -> T
where
    T: Clone + SameValue + 'static,
{
    cx.use_sync_external_store(subscribe, Rc::clone(&getter), getter)
}
