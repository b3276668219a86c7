//! Phase Tracking
//!
//! The phase stack records what the host is currently doing: rendering a
//! root or committing it. Code that must not run during render (realizing a
//! side-effecting source) asks [`is_rendering`].
//!
//! # Implementation
//!
//! We use a thread-local stack. Entering a phase pushes an entry; the
//! returned guard pops it on drop, even if the render panics. Nested entries
//! happen when an effect mounts another root.

use std::cell::RefCell;

use super::RootId;

/// What the host is doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Invoking a component function.
    Render,
    /// Running effect cleanups and setups.
    Commit,
}

thread_local! {
    static PHASE_STACK: RefCell<Vec<PhaseEntry>> = const { RefCell::new(Vec::new()) };
}

#[derive(Debug, Clone, Copy)]
struct PhaseEntry {
    root: RootId,
    phase: Phase,
}

/// Guard that pops the phase when dropped.
pub struct PhaseGuard {
    root: RootId,
}

impl PhaseGuard {
    /// Enter `phase` on behalf of `root`.
    pub fn enter(root: RootId, phase: Phase) -> Self {
        PHASE_STACK.with(|stack| stack.borrow_mut().push(PhaseEntry { root, phase }));
        Self { root }
    }
}

impl Drop for PhaseGuard {
    fn drop(&mut self) {
        PHASE_STACK.with(|stack| {
            let popped = stack.borrow_mut().pop();
            if let Some(entry) = popped {
                debug_assert_eq!(
                    entry.root, self.root,
                    "phase mismatch: expected {:?}, got {:?}",
                    self.root, entry.root
                );
            }
        });
    }
}

/// The innermost active phase, if any.
pub fn current_phase() -> Option<Phase> {
    PHASE_STACK.with(|stack| stack.borrow().last().map(|entry| entry.phase))
}

/// Whether a component function is executing right now.
pub fn is_rendering() -> bool {
    current_phase() == Some(Phase::Render)
}
