//! Lazy Source Factory
//!
//! A source is created at most once per scope epoch. An epoch is the span
//! during which the scope's dependency list stays unchanged; a new list
//! starts a new epoch with a fresh [`SourceRef`].
//!
//! # Lifecycle
//!
//! 1. The render records the epoch's `init` in a [`SourceRef`] and hands out a
//!    [`LazyInit`] accessor. Nothing is created yet.
//! 2. The first [`LazyInit::get`] runs `init`, stores the source and its
//!    optional destroy callback, and returns the source. Later calls return
//!    the stored source.
//! 3. When the scope commits, a layout effect calls `get` once, so the source
//!    exists before any subscription effect of the same scope runs, even if
//!    nobody asked for it.
//! 4. When the epoch ends (dependency change or unmount) the same effect's
//!    cleanup detaches any contract subscription, calls `destroy`, and
//!    resets the reference to empty.
//!
//! Realizing a side-effecting source while a component renders is a misuse:
//! it still works, but it is reported once through [`diagnostics`].
//!
//! [`use_pure`] is the side-effect-free form: plain memoization with no
//! destroy step, since a pure source is reclaimed when the last handle to it
//! is dropped.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::deps;
use crate::deps::{DepKey, Deps};
use crate::diagnostics::{self, Misuse};
use crate::host::{self, Cx};
use crate::listener::Unsubscribe;

/// Counter for generating unique source IDs.
static SOURCE_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

fn next_source_id() -> u64 {
    SOURCE_ID_COUNTER.fetch_add(1, Ordering::Relaxed)
}

/// Tear-down callback for a created source.
pub type Destroy<S> = Box<dyn FnOnce(&S)>;

/// Step run right after a source is created; its result is undone before
/// the source is destroyed.
pub(crate) type Attach<S> = Rc<dyn Fn(&S) -> Option<Unsubscribe>>;

/// What `init` returns: the source and, optionally, how to destroy it.
pub struct Created<S> {
    source: S,
    destroy: Option<Destroy<S>>,
}

impl<S> Created<S> {
    /// A source that needs no tear-down.
    pub fn new(source: S) -> Self {
        Self {
            source,
            destroy: None,
        }
    }

    /// Attach a tear-down callback.
    pub fn with_destroy<F>(mut self, destroy: F) -> Self
    where
        F: FnOnce(&S) + 'static,
    {
        self.destroy = Some(Box::new(destroy));
        self
    }
}

impl<S> From<S> for Created<S> {
    fn from(source: S) -> Self {
        Created::new(source)
    }
}

/// Ownership record for one scope epoch's source.
pub struct SourceRef<S> {
    id: u64,
    init: Rc<dyn Fn() -> Created<S>>,
    current: RefCell<Option<S>>,
    destroy: RefCell<Option<Destroy<S>>>,
    attach: Option<Attach<S>>,
    detach: RefCell<Option<Unsubscribe>>,
    retired: Cell<bool>,
}

impl<S> SourceRef<S> {
    /// An empty reference that creates its source with `init`.
    pub fn new<I>(init: I) -> Self
    where
        I: Fn() -> Created<S> + 'static,
    {
        Self {
            id: next_source_id(),
            init: Rc::new(init),
            current: RefCell::new(None),
            destroy: RefCell::new(None),
            attach: None,
            detach: RefCell::new(None),
            retired: Cell::new(false),
        }
    }

    pub(crate) fn with_attach(mut self, attach: Attach<S>) -> Self {
        self.attach = Some(attach);
        self
    }

    /// Get the source's unique ID.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Whether the source currently exists.
    pub fn is_realized(&self) -> bool {
        self.current.borrow().is_some()
    }

    /// Whether the epoch was torn down at least once.
    pub fn is_retired(&self) -> bool {
        self.retired.get()
    }
}

impl<S: Clone> SourceRef<S> {
    /// The source, if it exists.
    pub fn current(&self) -> Option<S> {
        self.current.borrow().clone()
    }
}

impl<S> fmt::Debug for SourceRef<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceRef")
            .field("id", &self.id)
            .field("realized", &self.is_realized())
            .field("has_destroy", &self.destroy.borrow().is_some())
            .finish()
    }
}

/// Accessor that creates the source on first use.
///
/// Clones share the same [`SourceRef`]; the accessor's identity (see
/// [`LazyInit::key`]) is stable for the whole epoch, so it can itself be
/// listed as a dependency of another source or effect.
pub struct LazyInit<S> {
    source_ref: Rc<SourceRef<S>>,
}

impl<S> Clone for LazyInit<S> {
    fn clone(&self) -> Self {
        Self {
            source_ref: Rc::clone(&self.source_ref),
        }
    }
}

impl<S: Clone + 'static> LazyInit<S> {
    /// Wrap a reference.
    pub fn new(source_ref: SourceRef<S>) -> Self {
        Self {
            source_ref: Rc::new(source_ref),
        }
    }

    /// The source, creating it if needed.
    ///
    /// Once the epoch was torn down no scope owns the reference any more.
    /// Calling `get` on it still creates a source, but destroying that
    /// source is up to the caller, by calling [`LazyInit::teardown`] again.
    pub fn get(&self) -> S {
        if let Some(source) = self.source_ref.current() {
            return source;
        }

        if diagnostics::ENABLED && host::is_rendering() {
            diagnostics::warn_once(Misuse::RenderPhaseAccess);
        }
        if self.source_ref.is_retired() {
            tracing::warn!(
                source = self.source_ref.id,
                "source recreated after its epoch ended; the caller owns its teardown"
            );
        }

        let Created { source, destroy } = (self.source_ref.init)();
        *self.source_ref.current.borrow_mut() = Some(source.clone());
        *self.source_ref.destroy.borrow_mut() = destroy;
        tracing::debug!(source = self.source_ref.id, "source created");

        if let Some(attach) = &self.source_ref.attach {
            let detach = attach(&source);
            *self.source_ref.detach.borrow_mut() = detach;
        }

        source
    }

    /// The source if it exists, without creating it.
    pub fn current(&self) -> Option<S> {
        self.source_ref.current()
    }

    /// Whether the source exists.
    pub fn is_realized(&self) -> bool {
        self.source_ref.is_realized()
    }

    /// Whether the epoch has ended.
    pub fn is_retired(&self) -> bool {
        self.source_ref.is_retired()
    }

    /// The underlying reference.
    pub fn source_ref(&self) -> &Rc<SourceRef<S>> {
        &self.source_ref
    }

    /// Identity key for dependency lists.
    pub fn key(&self) -> DepKey {
        DepKey::identity(&self.source_ref)
    }

    /// End the epoch: detach, destroy, reset to empty.
    ///
    /// Safe on a reference that was never realized.
    pub fn teardown(&self) {
        self.source_ref.retired.set(true);

        let detach = self.source_ref.detach.borrow_mut().take();
        if let Some(detach) = detach {
            detach.unsubscribe();
        }

        let Some(source) = self.source_ref.current() else {
            return;
        };
        let destroy = self.source_ref.destroy.borrow_mut().take();
        if let Some(destroy) = destroy {
            destroy(&source);
        }
        *self.source_ref.current.borrow_mut() = None;
        tracing::debug!(source = self.source_ref.id, "source destroyed");
    }
}

impl<S> fmt::Debug for LazyInit<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("LazyInit").field(&self.source_ref).finish()
    }
}

/// Scope-local lazy source keyed by `deps`.
pub fn use_lazy<S, I>(cx: &mut Cx, init: I, deps: Deps) -> LazyInit<S>
where
    S: Clone + 'static,
    I: Fn() -> Created<S> + 'static,
{
    use_lazy_scope(cx, deps, move || (SourceRef::new(init), ())).0
}

/// [`use_lazy`] with extra per-epoch state built alongside the reference.
pub(crate) fn use_lazy_scope<S, X, M>(cx: &mut Cx, deps: Deps, make: M) -> (LazyInit<S>, X)
where
    S: Clone + 'static,
    X: Clone + 'static,
    M: FnOnce() -> (SourceRef<S>, X),
{
    let (lazy, extra) = cx.use_memo(deps, move || {
        let (source_ref, extra) = make();
        (LazyInit::new(source_ref), extra)
    });

    let eager = lazy.clone();
    cx.use_layout_effect(Some(deps![lazy.key()]), move || {
        eager.get();
        Some(Box::new(move || eager.teardown()))
    });

    (lazy, extra)
}

/// Scope-local side-effect-free source, recomputed exactly when `deps`
/// changes.
pub fn use_pure<S, I>(cx: &mut Cx, init: I, deps: Deps) -> S
where
    S: Clone + 'static,
    I: FnOnce() -> S,
{
    cx.use_memo(deps, init)
}

/// [`use_pure`] returning a shared handle whose identity marks the epoch.
pub(crate) fn use_pure_rc<S, I>(cx: &mut Cx, init: I, deps: Deps) -> Rc<S>
where
    S: 'static,
    I: FnOnce() -> S,
{
    cx.use_memo(deps, move || Rc::new(init()))
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
