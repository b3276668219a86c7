//! Render Root
//!
//! A [`Root`] owns one mounted component and drives it through render and
//! commit.
//!
//! # Scheduling
//!
//! An update scheduled while the root is idle is flushed synchronously,
//! before the call that scheduled it returns. An update scheduled while the
//! root is rendering or committing marks it dirty, and the root renders
//! again right after the current commit. If that loop does not settle within
//! `max_update_depth` renders, the flush fails with
//! [`RenderError::UpdateDepthExceeded`]. An update scheduled inside a
//! [`batch`](super::batch) waits for the batch to close.
//!
//! A panic raised by a component or an effect propagates out of the call
//! that flushed. The root stays usable: its hook slots are kept (a failed
//! mount starts over) and the next render proceeds normally.
//!
//! # Commit order
//!
//! 1. Cleanups of the effects about to re-run: passive ones in reverse
//!    declaration order, then layout ones in reverse declaration order.
//! 2. Layout effect setups, in declaration order.
//! 3. Passive effect setups, in declaration order.
//!
//! Unmounting runs every passive cleanup (reverse order) and then every
//! layout cleanup (reverse order).
//!
//! # Strict mode
//!
//! In strict mode each render invokes the component twice. On mount the
//! first invocation runs against fresh slots that are thrown away; on update
//! both invocations share the live slots. Only the last invocation's effects
//! are committed.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;

use super::batch;
use super::cx::{Cx, EffectJob, EffectKind, EffectSlot};
use super::environment::Environment;
use super::phase::{Phase, PhaseGuard};
use super::RootId;
use crate::error::RenderError;

/// Default bound on consecutive renders within one flush.
pub const DEFAULT_MAX_UPDATE_DEPTH: usize = 50;

/// Root configuration.
#[derive(Debug, Clone, Copy)]
pub struct RootConfig {
    /// Invoke every render twice.
    pub strict: bool,
    /// Renders allowed within one flush before giving up.
    pub max_update_depth: usize,
    /// Rendering strategy, [`Environment::current`] unless overridden.
    pub environment: Environment,
}

impl Default for RootConfig {
    fn default() -> Self {
        Self {
            strict: false,
            max_update_depth: DEFAULT_MAX_UPDATE_DEPTH,
            environment: Environment::current(),
        }
    }
}

impl RootConfig {
    /// Enable or disable strict double rendering.
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Set the render loop bound.
    pub fn max_update_depth(mut self, depth: usize) -> Self {
        self.max_update_depth = depth;
        self
    }

    /// Override the process-wide rendering strategy for this root.
    ///
    /// This is a test hook for exercising both strategies in one process.
    /// Applications leave it alone so every root follows the strategy
    /// selected once through [`Environment::install`] or
    /// [`ENVIRONMENT_VAR`](super::ENVIRONMENT_VAR).
    pub fn environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }
}

/// Update scheduling shared by a root and its state setters.
pub(crate) struct Scheduler {
    dirty: Cell<bool>,
    busy: Cell<bool>,
    flush: RefCell<Option<Rc<dyn Fn()>>>,
}

impl Scheduler {
    fn new() -> Self {
        Self {
            dirty: Cell::new(false),
            busy: Cell::new(false),
            flush: RefCell::new(None),
        }
    }

    /// Request a re-render.
    pub(crate) fn schedule(self: &Rc<Self>) {
        self.dirty.set(true);
        if self.busy.get() {
            return;
        }
        if batch::is_batching() {
            batch::defer(self);
            return;
        }
        self.flush_now();
    }

    /// Flush the owning root if it is still alive.
    pub(crate) fn flush_now(&self) {
        let flush = self.flush.borrow().clone();
        if let Some(flush) = flush {
            flush();
        }
    }
}

/// Clears the busy flag when a flush ends, even by unwinding.
struct BusyGuard<'a> {
    busy: &'a Cell<bool>,
}

impl<'a> BusyGuard<'a> {
    /// Mark `busy`, or return `None` if it already was.
    fn acquire(busy: &'a Cell<bool>) -> Option<Self> {
        if busy.replace(true) {
            return None;
        }
        Some(Self { busy })
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.busy.set(false);
    }
}

type Component<O> = Rc<dyn Fn(&mut Cx) -> O>;

struct RootInner<O> {
    id: RootId,
    config: RootConfig,
    scheduler: Rc<Scheduler>,
    component: RefCell<Option<Component<O>>>,
    /// `None` until mounted and while a render holds the slots.
    slots: RefCell<Option<Vec<Box<dyn Any>>>>,
    committed: RefCell<Option<O>>,
    renders: Cell<usize>,
    commits: Cell<usize>,
    error: RefCell<Option<RenderError>>,
}

/// A mounted component.
///
/// Dropping the root unmounts it.
pub struct Root<O: Clone + 'static> {
    inner: Rc<RootInner<O>>,
}

impl<O: Clone + 'static> Root<O> {
    /// Create an empty root.
    pub fn new(config: RootConfig) -> Self {
        let inner = Rc::new(RootInner {
            id: RootId::new(),
            config,
            scheduler: Rc::new(Scheduler::new()),
            component: RefCell::new(None),
            slots: RefCell::new(None),
            committed: RefCell::new(None),
            renders: Cell::new(0),
            commits: Cell::new(0),
            error: RefCell::new(None),
        });

        let weak = Rc::downgrade(&inner);
        *inner.scheduler.flush.borrow_mut() = Some(Rc::new(move || {
            if let Some(inner) = weak.upgrade() {
                if let Err(err) = inner.flush() {
                    tracing::error!(root = ?inner.id, error = %err, "scheduled update failed");
                    *inner.error.borrow_mut() = Some(err);
                }
            }
        }));

        Self { inner }
    }

    /// Get the root's unique ID.
    pub fn id(&self) -> RootId {
        self.inner.id
    }

    /// Render `component`, mounting it on first use.
    ///
    /// Hook state is kept across calls, so passing a new closure is how a
    /// test changes the component's props.
    pub fn render<F>(&self, component: F) -> Result<(), RenderError>
    where
        F: Fn(&mut Cx) -> O + 'static,
    {
        *self.inner.component.borrow_mut() = Some(Rc::new(component));
        self.inner.scheduler.dirty.set(true);
        self.inner.flush()
    }

    /// Render the current component again.
    pub fn rerender(&self) -> Result<(), RenderError> {
        self.inner.scheduler.dirty.set(true);
        self.inner.flush()
    }

    /// Run every cleanup and forget the component.
    pub fn unmount(&self) {
        self.inner.unmount();
    }

    /// Output of the last committed render.
    pub fn output(&self) -> Option<O> {
        self.inner.committed.borrow().clone()
    }

    /// Number of component invocations so far.
    pub fn render_count(&self) -> usize {
        self.inner.renders.get()
    }

    /// Number of commits so far.
    pub fn commit_count(&self) -> usize {
        self.inner.commits.get()
    }

    /// Whether a component is mounted.
    pub fn is_mounted(&self) -> bool {
        self.inner.component.borrow().is_some()
    }

    /// Error raised by an update that was flushed outside of [`Root::render`].
    pub fn take_error(&self) -> Option<RenderError> {
        self.inner.error.borrow_mut().take()
    }
}

impl<O: Clone + 'static> Drop for Root<O> {
    fn drop(&mut self) {
        self.inner.unmount();
    }
}

impl<O: Clone + 'static> RootInner<O> {
    fn flush(&self) -> Result<(), RenderError> {
        let Some(_busy) = BusyGuard::acquire(&self.scheduler.busy) else {
            return Ok(());
        };

        let mut depth = 0;
        loop {
            if !self.scheduler.dirty.replace(false) {
                break Ok(());
            }
            if self.component.borrow().is_none() {
                break Ok(());
            }
            depth += 1;
            if depth > self.config.max_update_depth {
                break Err(RenderError::UpdateDepthExceeded {
                    limit: self.config.max_update_depth,
                });
            }
            self.render_and_commit();
        }
    }

    fn render_and_commit(&self) {
        let Some(component) = self.component.borrow().clone() else {
            return;
        };

        let stored = self.slots.borrow_mut().take();
        let mounting = stored.is_none();
        let mut slots = stored.unwrap_or_default();
        let passes = if self.config.strict { 2 } else { 1 };
        let mut rendered = None;

        for pass in 0..passes {
            let last = pass + 1 == passes;
            let discard = mounting && !last;
            let base = if discard { Vec::new() } else { std::mem::take(&mut slots) };

            let mut cx = Cx::new(
                self.id,
                self.config.environment,
                Rc::clone(&self.scheduler),
                base,
            );
            let output = {
                let _phase = PhaseGuard::enter(self.id, Phase::Render);
                panic::catch_unwind(AssertUnwindSafe(|| component(&mut cx)))
            };
            self.renders.set(self.renders.get() + 1);
            let output = match output {
                Ok(output) => output,
                Err(payload) => {
                    if !mounting {
                        *self.slots.borrow_mut() = Some(cx.finish().slots);
                    }
                    tracing::debug!(root = ?self.id, pass, mounting, "component panicked");
                    panic::resume_unwind(payload);
                }
            };
            tracing::trace!(root = ?self.id, pass, mounting, "component rendered");

            let frame = cx.finish();
            if !discard {
                slots = frame.slots;
            }
            if last {
                rendered = Some((output, frame.layout, frame.passive));
            }
        }

        *self.slots.borrow_mut() = Some(slots);

        let Some((output, layout, passive)) = rendered else {
            return;
        };
        *self.committed.borrow_mut() = Some(output);
        self.commits.set(self.commits.get() + 1);

        if self.config.environment.runs_effects() {
            self.commit(layout, passive);
        }
    }

    fn commit(&self, layout: Vec<EffectJob>, passive: Vec<EffectJob>) {
        let _phase = PhaseGuard::enter(self.id, Phase::Commit);
        tracing::trace!(
            root = ?self.id,
            layout = layout.len(),
            passive = passive.len(),
            "committing effects"
        );

        for job in passive.iter().rev() {
            job.run_cleanup();
        }
        for job in layout.iter().rev() {
            job.run_cleanup();
        }
        for job in layout {
            job.run_setup();
        }
        for job in passive {
            job.run_setup();
        }
    }

    fn unmount(&self) {
        self.component.borrow_mut().take();
        let Some(slots) = self.slots.borrow_mut().take() else {
            return;
        };

        let _phase = PhaseGuard::enter(self.id, Phase::Commit);
        tracing::debug!(root = ?self.id, "unmounting");

        let effects: Vec<&EffectSlot> = slots
            .iter()
            .filter_map(|slot| slot.downcast_ref::<EffectSlot>())
            .collect();
        for kind in [EffectKind::Passive, EffectKind::Layout] {
            for effect in effects.iter().rev().filter(|effect| effect.kind == kind) {
                effect.state.run_cleanup();
            }
        }
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
