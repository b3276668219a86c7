//! Host Rendering Runtime
//!
//! The snapshot layer sits on top of a host that renders components and
//! commits their effects. This module is a small, deterministic host with
//! exactly the behavior the snapshot layer relies on:
//!
//! - order-based hook slots ([`Cx`]) with dependency-list memoization,
//!   state, layout effects and passive effects;
//! - a synchronized external value primitive
//!   ([`Cx::use_sync_external_store`]);
//! - a phase stack answering "is a component rendering right now?"
//!   ([`is_rendering`]);
//! - a root that flushes updates synchronously and can double-invoke renders
//!   ([`Root`], [`RootConfig::strict`]);
//! - notification batching, so one change renders each root once
//!   ([`batch`]);
//! - an environment strategy picked once per process ([`Environment`]).
//!
//! Everything here is single-threaded: roots, state and effects are bound
//! to the thread that created them.

use std::sync::atomic::{AtomicU64, Ordering};

mod batch;
mod cx;
mod environment;
mod phase;
mod root;
mod sync_store;

pub use batch::{batch, is_batching};
pub use cx::{Cleanup, Cx, StateSetter};
pub use environment::{Environment, ENVIRONMENT_VAR};
pub use phase::{current_phase, is_rendering, Phase, PhaseGuard};
pub use root::{Root, RootConfig, DEFAULT_MAX_UPDATE_DEPTH};
pub use sync_store::{SnapshotFn, SubscribeFn};

/// Unique identifier for a root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RootId(u64);

impl RootId {
    /// Generate a new unique root ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for RootId {
    fn default() -> Self {
        Self::new()
    }
}
