//! Render Context
//!
//! [`Cx`] is what a component receives while it renders. Hooks are
//! order-based: the Nth hook call of a render always refers to the Nth
//! stored slot, so a component must call the same hooks in the same order on
//! every render.
//!
//! Every dependency-list cache in the crate goes through [`Cx::use_memo`]:
//! a slot stores the list it was computed for and is recomputed exactly when
//! [`deps_changed`] says the new list differs.
//!
//! Effects are not run here. The render records which effects are due and
//! the root runs them when it commits.

use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;

use super::environment::Environment;
use super::root::Scheduler;
use super::RootId;
use crate::deps::{deps_changed, Deps};

/// Work to run when an effect is torn down.
pub type Cleanup = Box<dyn FnOnce()>;

/// When an effect runs relative to the rest of the commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum EffectKind {
    /// Runs first, before any passive effect is set up.
    Layout,
    /// Runs after every layout effect.
    Passive,
}

/// Committed state of one effect hook.
#[derive(Default)]
pub(crate) struct EffectState {
    /// `None` until the effect first runs; then the list it ran with.
    committed: RefCell<Option<Option<Deps>>>,
    cleanup: RefCell<Option<Cleanup>>,
}

impl EffectState {
    pub(crate) fn run_cleanup(&self) {
        let cleanup = self.cleanup.borrow_mut().take();
        if let Some(cleanup) = cleanup {
            cleanup();
        }
    }

    fn is_due(&self, next: Option<&Deps>) -> bool {
        match &*self.committed.borrow() {
            None | Some(None) => true,
            Some(Some(previous)) => next.map_or(true, |next| deps_changed(previous, next)),
        }
    }
}

/// Slot stored for an effect hook.
pub(crate) struct EffectSlot {
    pub(crate) kind: EffectKind,
    pub(crate) state: Rc<EffectState>,
}

/// An effect that is due in the upcoming commit.
pub(crate) struct EffectJob {
    state: Rc<EffectState>,
    deps: Option<Deps>,
    setup: Box<dyn FnOnce() -> Option<Cleanup>>,
}

impl EffectJob {
    pub(crate) fn run_cleanup(&self) {
        self.state.run_cleanup();
    }

    pub(crate) fn run_setup(self) {
        let cleanup = (self.setup)();
        *self.state.cleanup.borrow_mut() = cleanup;
        *self.state.committed.borrow_mut() = Some(self.deps);
    }
}

struct MemoSlot<T> {
    deps: Deps,
    value: T,
}

/// What one component invocation produced besides its output.
pub(crate) struct Frame {
    pub(crate) slots: Vec<Box<dyn Any>>,
    pub(crate) layout: Vec<EffectJob>,
    pub(crate) passive: Vec<EffectJob>,
}

/// Render context handed to a component.
pub struct Cx {
    root: RootId,
    environment: Environment,
    scheduler: Rc<Scheduler>,
    slots: Vec<Box<dyn Any>>,
    cursor: usize,
    layout: Vec<EffectJob>,
    passive: Vec<EffectJob>,
}

impl Cx {
    pub(crate) fn new(
        root: RootId,
        environment: Environment,
        scheduler: Rc<Scheduler>,
        slots: Vec<Box<dyn Any>>,
    ) -> Self {
        Self {
            root,
            environment,
            scheduler,
            slots,
            cursor: 0,
            layout: Vec::new(),
            passive: Vec::new(),
        }
    }

    pub(crate) fn finish(self) -> Frame {
        Frame {
            slots: self.slots,
            layout: self.layout,
            passive: self.passive,
        }
    }

    /// The root being rendered.
    pub fn root(&self) -> RootId {
        self.root
    }

    /// The rendering strategy of the root.
    pub fn environment(&self) -> Environment {
        self.environment
    }

    fn slot<T: 'static>(&mut self, init: impl FnOnce() -> T) -> &mut T {
        let index = self.cursor;
        self.cursor += 1;
        if index == self.slots.len() {
            self.slots.push(Box::new(init()));
        }
        self.slots[index]
            .downcast_mut::<T>()
            .expect("hook order changed between renders")
    }

    /// A value created on the first render and shared by every later one.
    pub fn use_ref<T: 'static>(&mut self, init: impl FnOnce() -> T) -> Rc<T> {
        Rc::clone(self.slot(|| Rc::new(init())))
    }

    /// `compute()` cached for as long as `deps` is unchanged.
    pub fn use_memo<T: Clone + 'static>(&mut self, deps: Deps, compute: impl FnOnce() -> T) -> T {
        let slot = self.slot(|| None::<MemoSlot<T>>);
        if let Some(memo) = slot.as_ref() {
            if !deps_changed(&memo.deps, &deps) {
                return memo.value.clone();
            }
        }

        let value = compute();
        *slot = Some(MemoSlot {
            deps,
            value: value.clone(),
        });
        value
    }

    /// Component state. Setting it always schedules a re-render.
    pub fn use_state<T: Clone + 'static>(&mut self, init: impl FnOnce() -> T) -> (T, StateSetter<T>) {
        let scheduler = Rc::clone(&self.scheduler);
        let cell = Rc::clone(self.slot(|| Rc::new(RefCell::new(init()))));
        let value = cell.borrow().clone();
        (value, StateSetter { cell, scheduler })
    }

    /// Passive effect: runs after layout effects when `deps` changed.
    ///
    /// `None` deps run the effect on every commit.
    pub fn use_effect<F>(&mut self, deps: Option<Deps>, setup: F)
    where
        F: FnOnce() -> Option<Cleanup> + 'static,
    {
        self.push_effect(EffectKind::Passive, deps, Box::new(setup));
    }

    /// Layout effect: runs before any passive effect of the same commit.
    pub fn use_layout_effect<F>(&mut self, deps: Option<Deps>, setup: F)
    where
        F: FnOnce() -> Option<Cleanup> + 'static,
    {
        self.push_effect(EffectKind::Layout, deps, Box::new(setup));
    }

    fn push_effect(
        &mut self,
        kind: EffectKind,
        deps: Option<Deps>,
        setup: Box<dyn FnOnce() -> Option<Cleanup>>,
    ) {
        let state = Rc::clone(
            &self
                .slot(|| EffectSlot {
                    kind,
                    state: Rc::new(EffectState::default()),
                })
                .state,
        );

        if !state.is_due(deps.as_ref()) {
            return;
        }

        let job = EffectJob { state, deps, setup };
        match kind {
            EffectKind::Layout => self.layout.push(job),
            EffectKind::Passive => self.passive.push(job),
        }
    }
}

/// Handle that replaces a [`Cx::use_state`] value.
pub struct StateSetter<T> {
    cell: Rc<RefCell<T>>,
    scheduler: Rc<Scheduler>,
}

impl<T> StateSetter<T> {
    /// Store `value` and schedule a re-render.
    pub fn set(&self, value: T) {
        *self.cell.borrow_mut() = value;
        self.scheduler.schedule();
    }

    /// Replace the value with `f(current)` and schedule a re-render.
    pub fn update(&self, f: impl FnOnce(&T) -> T) {
        let next = f(&self.cell.borrow());
        self.set(next);
    }
}

impl<T> Clone for StateSetter<T> {
    fn clone(&self) -> Self {
        Self {
            cell: Rc::clone(&self.cell),
            scheduler: Rc::clone(&self.scheduler),
        }
    }
}
