//! Misuse Diagnostics
//!
//! Development-time warnings for caller mistakes that do not break the
//! protocol but cost extra renders or hint at a loop.
//!
//! # Delivery
//!
//! Each distinct message is delivered at most once per process. The set of
//! delivered messages is process-wide state: it starts empty and is only
//! cleared by [`reset`]. Delivery goes through `tracing::error!` on the
//! `tether::diagnostics` target.
//!
//! # Cost
//!
//! With the `diagnostics` feature disabled, [`ENABLED`] is `false` at compile
//! time and every detection branch guarded by it is removed.

use std::sync::OnceLock;

use indexmap::IndexSet;
use parking_lot::Mutex;
use thiserror::Error;

/// Whether misuse detection is compiled in.
pub const ENABLED: bool = cfg!(feature = "diagnostics");

/// A detectable caller mistake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum Misuse {
    /// A side-effecting source was realized while the host was rendering.
    #[error(
        "A side-effecting source was realized during render. Read it from an effect or an \
         event handler, or create it with `use_pure_source` if creating it has no side effects."
    )]
    RenderPhaseAccess,

    /// The snapshot derived before the source existed differs from the first
    /// snapshot derived after it was created.
    #[error(
        "The snapshot derived before the source was created differs from the first snapshot \
         derived from the created source. This forces an extra render; make `get_snapshot` \
         return the same value when the source is absent."
    )]
    SnapshotMismatch,

    /// `get_snapshot` returned different values on back-to-back calls.
    #[error("The result of `get_snapshot` should be cached to avoid an infinite loop.")]
    UncachedSnapshot,
}

fn registry() -> &'static Mutex<IndexSet<String>> {
    static EMITTED: OnceLock<Mutex<IndexSet<String>>> = OnceLock::new();
    EMITTED.get_or_init(|| Mutex::new(IndexSet::new()))
}

/// Deliver `misuse` unless the same message was already delivered.
///
/// Returns `true` when this call delivered it.
pub fn warn_once(misuse: Misuse) -> bool {
    if !ENABLED {
        return false;
    }

    let message = misuse.to_string();
    let fresh = registry().lock().insert(message.clone());
    if fresh {
        tracing::error!(target: "tether::diagnostics", kind = ?misuse, "{message}");
    }
    fresh
}

/// Messages delivered so far, in delivery order.
pub fn emitted() -> Vec<String> {
    registry().lock().iter().cloned().collect()
}

/// Whether `misuse` has been delivered since the last [`reset`].
pub fn was_emitted(misuse: Misuse) -> bool {
    registry().lock().contains(&misuse.to_string())
}

/// Forget every delivered message. Intended for tests.
pub fn reset() {
    registry().lock().clear();
}
