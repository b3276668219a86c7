//! Contract Subscriptions
//!
//! The source owns the subscription: a single contract, supplied with the
//! source, wires the source's own change events to one shared [`Slice`].
//! Every snapshot read of that source then subscribes to the slice instead
//! of to the source.
//!
//! # Registration
//!
//! For a lazily created source the contract runs right after `init`, inside
//! the same [`LazyInit::get`] call, so no change can slip in between
//! creation and the contract taking effect. Whatever the contract returns is
//! undone when the source's epoch ends, before `destroy`.
//!
//! A pure source has its contract called once, during the render that
//! created it, and is never torn down; its subscriptions go away with the
//! source itself.
//!
//! # Atomic form
//!
//! [`use_atomic_source`] keeps a single snapshot in component state. Its
//! layout-phase subscription to the slice writes a fresh snapshot on every
//! update, and writes one more straight away if the slice moved, or the
//! source did not yet exist, when the committed render read its snapshot.

use std::rc::Rc;

use crate::deps;
use crate::deps::Deps;
use crate::equality::SameValue;
use crate::host::{Cleanup, Cx, SubscribeFn};
use crate::lazy::{self, Attach, Created, LazyInit, SourceRef};
use crate::listener::{Listener, Unsubscribe};
use crate::slice::Slice;
use crate::snapshot::{self, SourceHandle};

/// Snapshot reader for a source with a contract attached.
pub struct ContractSnapshots<S> {
    source: SourceHandle<S>,
    slice: Slice,
}

impl<S> Clone for ContractSnapshots<S> {
    fn clone(&self) -> Self {
        Self {
            source: self.source.clone(),
            slice: self.slice.clone(),
        }
    }
}

impl<S: Clone + 'static> ContractSnapshots<S> {
    /// Read a snapshot of the source and re-render when the contract
    /// reports a change.
    ///
    /// Without `snapshot_deps` the first `get_snapshot` of the source's
    /// epoch is used for the component's lifetime.
    pub fn use_snapshot<T, G>(&self, cx: &mut Cx, get_snapshot: G, snapshot_deps: Option<Deps>) -> T
    where
        T: Clone + SameValue + 'static,
        G: Fn(Option<&S>, Option<&T>) -> T + 'static,
    {
        let getter = snapshot::use_getter(cx, &self.source, &self.slice, get_snapshot, snapshot_deps.as_ref());
        let subscribe = cx.use_memo(deps![self.slice.key()], || {
            let slice = self.slice.clone();
            Rc::new(move |listener: Listener| slice.subscribe(listener)) as SubscribeFn
        });
        snapshot::use_synced(cx, subscribe, getter)
    }

    /// The slice the contract updates.
    pub fn slice(&self) -> &Slice {
        &self.slice
    }
}

/// Side-effecting source whose `contract` reports its changes.
///
/// `contract` receives the freshly created source and a listener to call on
/// every change, and returns how to stop. The contract from the first
/// render is used for the component's lifetime.
pub fn use_source<S, I, C>(cx: &mut Cx, init: I, deps: Deps, contract: C) -> (ContractSnapshots<S>, LazyInit<S>)
where
    S: Clone + 'static,
    I: Fn() -> Created<S> + 'static,
    C: Fn(&S, Listener) -> Option<Unsubscribe> + 'static,
{
    let contract = cx.use_ref(move || contract);
    let (lazy, slice) = lazy::use_lazy_scope(cx, deps, move || {
        let slice = Slice::new();
        let notify = slice.notifier();
        let attach: Attach<S> = Rc::new(move |source: &S| contract(source, notify.clone()));
        (SourceRef::new(init).with_attach(attach), slice)
    });

    let snapshots = ContractSnapshots {
        source: SourceHandle::Lazy(lazy.clone()),
        slice,
    };
    (snapshots, lazy)
}

/// Side-effect-free source whose `contract` reports its changes.
///
/// `init` and then `contract` run during render whenever `deps` changes.
pub fn use_pure_source<S, I, C>(cx: &mut Cx, init: I, deps: Deps, contract: C) -> (ContractSnapshots<S>, S)
where
    S: Clone + 'static,
    I: FnOnce() -> S,
    C: Fn(&S, Listener) + 'static,
{
    let contract = cx.use_ref(move || contract);
    let (source, slice) = cx.use_memo(deps, move || {
        let source = init();
        let slice = Slice::new();
        contract(&source, slice.notifier());
        (Rc::new(source), slice)
    });

    let value = S::clone(&source);
    let snapshots = ContractSnapshots {
        source: SourceHandle::Pure(source),
        slice,
    };
    (snapshots, value)
}

/// Single-snapshot source with its contract bundled in.
///
/// `contract` and `get_snapshot` are taken from the first render; the
/// source lives for the component's lifetime.
pub fn use_atomic_source<S, T, I, C, G>(cx: &mut Cx, init: I, contract: C, get_snapshot: G) -> (T, LazyInit<S>)
where
    S: Clone + 'static,
    T: Clone + 'static,
    I: Fn() -> Created<S> + 'static,
    C: Fn(&S, Listener) -> Option<Unsubscribe> + 'static,
    G: Fn(Option<&S>) -> T + 'static,
{
    let (snapshots, lazy) = use_source(cx, init, deps![], contract);
    let get_snapshot = cx.use_ref(move || get_snapshot);

    let (snapshot, set_snapshot) = cx.use_state(|| get_snapshot(lazy.current().as_ref()));
    let rendered = (snapshots.slice.version(), lazy.is_realized());

    let source = lazy.clone();
    let slice = snapshots.slice;
    cx.use_layout_effect(Some(deps![lazy.key()]), move || {
        let source = source.get();

        let listener = {
            let source = source.clone();
            let get_snapshot = Rc::clone(&get_snapshot);
            let set_snapshot = set_snapshot.clone();
            Listener::new(move || set_snapshot.set(get_snapshot(Some(&source))))
        };
        let unsubscribe = slice.subscribe(listener);

        if (slice.version(), true) != rendered {
            set_snapshot.set(get_snapshot(Some(&source)));
        }

        Some(Box::new(move || unsubscribe.unsubscribe()) as Cleanup)
    });

    (snapshot, lazy)
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
