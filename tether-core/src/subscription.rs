//! Ad-hoc Subscriptions
//!
//! The caller owns the subscription: every snapshot read names the source's
//! own subscribe function, and the crate routes its notifications into a
//! per-read [`Slice`] that drives re-derivation.
//!
//! # General form
//!
//! [`use_source`] (or [`use_pure_source`]) returns a [`SnapshotHook`] plus the
//! source accessor. Each [`SnapshotHook::use_snapshot`] call then:
//!
//! 1. keeps one slice and one subscribe function per source epoch, replaced
//!    when `subscribe_deps` changes;
//! 2. memoizes a getter over `get_snapshot` (see the snapshot accessors);
//! 3. hands the host a subscribe step that registers the host's listener on
//!    the slice, realizes the source, subscribes to it with the slice's
//!    notifier, and forces one re-derivation so a change that landed before
//!    the subscription existed is still picked up.
//!
//! Unsubscribing removes the caller's subscription first and the host's
//! listener second; both happen before the source is destroyed.
//!
//! # Atomic form
//!
//! [`use_atomic_source`] takes init, subscribe and get_snapshot in one call.
//! It keeps the snapshot in component state and writes a fresh one on every
//! notification, unconditionally. A layout-phase reconciliation step writes
//! one more if a notification arrived, or the source did not yet exist, when
//! the committed render read its snapshot.

use std::cell::Cell;
use std::rc::Rc;

use crate::deps;
use crate::deps::{chain, Deps};
use crate::equality::SameValue;
use crate::host::{Cleanup, Cx, SubscribeFn};
use crate::lazy::{self, Created, LazyInit};
use crate::listener::{Listener, Unsubscribe};
use crate::slice::Slice;
use crate::snapshot::{self, SourceHandle};

type SourceSubscribe<S> = Rc<dyn Fn(&S, Listener) -> Option<Unsubscribe>>;

/// Snapshot reader bound to one source.
///
/// Cheap to clone; clones read the same source.
pub struct SnapshotHook<S> {
    source: SourceHandle<S>,
}

impl<S> Clone for SnapshotHook<S> {
    fn clone(&self) -> Self {
        Self {
            source: self.source.clone(),
        }
    }
}

impl<S: Clone + 'static> SnapshotHook<S> {
    /// Read a snapshot of the source and re-render when it changes.
    ///
    /// `get_snapshot` receives the source (`None` until it exists) and the
    /// previous snapshot, and must return SameValue-equal results for
    /// unchanged state. `subscribe` registers a listener on the source and
    /// returns how to remove it.
    ///
    /// Without `snapshot_deps` the first `get_snapshot` of the source's
    /// epoch is used for the component's lifetime, and likewise for
    /// `subscribe` without `subscribe_deps`.
    pub fn use_snapshot<T, G, U>(
        &self,
        cx: &mut Cx,
        get_snapshot: G,
        snapshot_deps: Option<Deps>,
        subscribe: U,
        subscribe_deps: Option<Deps>,
    ) -> T
    where
        T: Clone + SameValue + 'static,
        G: Fn(Option<&S>, Option<&T>) -> T + 'static,
        U: Fn(&S, Listener) -> Option<Unsubscribe> + 'static,
    {
        let (slice, subscribe) = cx.use_memo(
            chain(deps![self.source.key()], subscribe_deps.as_ref()),
            move || (Slice::new(), Rc::new(subscribe) as SourceSubscribe<S>),
        );

        let getter = snapshot::use_getter(cx, &self.source, &slice, get_snapshot, snapshot_deps.as_ref());

        let host_subscribe = cx.use_memo(deps![self.source.key(), slice.key()], || {
            let source = self.source.clone();
            Rc::new(move |on_change: Listener| {
                let host = slice.subscribe(on_change);
                let realized = source.realize();
                let caller = subscribe(&realized, slice.notifier());
                slice.update();

                Unsubscribe::new(move || {
                    if let Some(caller) = caller {
                        caller.unsubscribe();
                    }
                    host.unsubscribe();
                })
            }) as SubscribeFn
        });

        snapshot::use_synced(cx, host_subscribe, getter)
    }
}

/// Side-effecting source read through caller-supplied subscriptions.
///
/// The source is created lazily (see [`lazy::use_lazy`]), at the latest when
/// the component commits, and destroyed when `deps` changes or the component
/// unmounts.
pub fn use_source<S, I>(cx: &mut Cx, init: I, deps: Deps) -> (SnapshotHook<S>, LazyInit<S>)
where
    S: Clone + 'static,
    I: Fn() -> Created<S> + 'static,
{
    let lazy = lazy::use_lazy(cx, init, deps);
    let hook = SnapshotHook {
        source: SourceHandle::Lazy(lazy.clone()),
    };
    (hook, lazy)
}

/// Side-effect-free source read through caller-supplied subscriptions.
///
/// `init` runs during render whenever `deps` changes.
pub fn use_pure_source<S, I>(cx: &mut Cx, init: I, deps: Deps) -> (SnapshotHook<S>, S)
where
    S: Clone + 'static,
    I: FnOnce() -> S,
{
    let source = lazy::use_pure_rc(cx, init, deps);
    let value = S::clone(&source);
    let hook = SnapshotHook {
        source: SourceHandle::Pure(source),
    };
    (hook, value)
}

/// Single-snapshot source with its subscription bundled in.
///
/// `subscribe` and `get_snapshot` are taken from the first render; the
/// source lives for the component's lifetime.
pub fn use_atomic_source<S, T, I, U, G>(
    cx: &mut Cx,
    init: I,
    subscribe: U,
    get_snapshot: G,
) -> (T, LazyInit<S>)
where
    S: Clone + 'static,
    T: Clone + 'static,
    I: Fn() -> Created<S> + 'static,
    U: Fn(&S, Listener) -> Option<Unsubscribe> + 'static,
    G: Fn(Option<&S>) -> T + 'static,
{
    let lazy = lazy::use_lazy(cx, init, deps![]);
    let subscribe = cx.use_ref(move || subscribe);
    let get_snapshot = cx.use_ref(move || get_snapshot);
    let notifications = cx.use_ref(|| Cell::new(0_u64));

    let (snapshot, set_snapshot) = cx.use_state(|| get_snapshot(lazy.current().as_ref()));
    let rendered = (notifications.get(), lazy.is_realized());

    let source = lazy.clone();
    cx.use_layout_effect(Some(deps![lazy.key()]), move || {
        let source = source.get();

        let listener = {
            let source = source.clone();
            let get_snapshot = Rc::clone(&get_snapshot);
            let notifications = Rc::clone(&notifications);
            let set_snapshot = set_snapshot.clone();
            Listener::new(move || {
                notifications.set(notifications.get() + 1);
                set_snapshot.set(get_snapshot(Some(&source)));
            })
        };
        let unsubscribe = subscribe(&source, listener);

        if (notifications.get(), true) != rendered {
            set_snapshot.set(get_snapshot(Some(&source)));
        }

        unsubscribe.map(|unsubscribe| Box::new(move || unsubscribe.unsubscribe()) as Cleanup)
    });

    (snapshot, lazy)
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
