//! Tether Core
//!
//! Tear-free snapshots of external mutable sources for declarative UI trees.
//!
//! A component declares a *source* (any long-lived mutable object: a store,
//! a cache, a connection) and reads *snapshots* of it. The crate keeps three
//! promises:
//!
//! - a source is created at most once per dependency epoch, lazily, and is
//!   destroyed only after everything subscribed to it has unsubscribed;
//! - a snapshot is re-derived only when the source reported a change;
//! - every change reported after a component subscribed reaches it exactly
//!   once, including changes that raced the subscription itself.
//!
//! # Architecture
//!
//! - `equality`: SameValue and shallow record equality
//! - `deps`: dependency keys and the [`deps!`] macro
//! - `listener`, `slice`: change callbacks and versioned notification hubs
//! - `lazy`: the create-once source factory
//! - `subscription`: the ad-hoc family, where each read names its subscribe
//! - `contract`: the contract family, where the source brings its own
//! - `diagnostics`: one-time misuse warnings
//! - `host`: the deterministic rendering runtime everything above runs on
//!
//! # Composing sources
//!
//! - A source may depend on a source declared earlier in the same
//!   component: its `init` calls the earlier accessor's `get`. Creation is
//!   ordered by declaration, so the earlier source exists first.
//! - A [`LazyInit`] may itself appear in another dependency list through
//!   [`LazyInit::key`]. Its identity is stable for as long as its own
//!   dependencies are.
//! - A pure source's `init` must not mutate another source. The mutation
//!   would happen during render, where subscribed components cannot observe
//!   it consistently.
//! - A `get_snapshot` that closes over changing values must list them in
//!   `snapshot_deps`; otherwise the first closure keeps being used.
//!
//! # Example
//!
//! ```rust,ignore
//! use tether_core::{deps, subscription, Created, Environment, Root, RootConfig};
//!
//! let root = Root::new(RootConfig::default().environment(Environment::Interactive));
//! root.render(|cx| {
//!     let (hook, _store) = subscription::use_source(cx, || Created::new(Store::new()), deps![]);
//!     hook.use_snapshot(cx, |store, _| store.map_or(0, Store::count), None, Store::listen, None)
//! })?;
//! ```

pub mod contract;
pub mod deps;
pub mod diagnostics;
pub mod equality;
pub mod error;
pub mod host;
pub mod lazy;
pub mod listener;
pub mod slice;
mod snapshot;
pub mod subscription;

pub use contract::ContractSnapshots;
pub use deps::{DepKey, Deps};
pub use diagnostics::Misuse;
pub use equality::{same_value, shallow_equal, SameValue, Shallow};
pub use error::{ConfigError, RenderError};
pub use host::{batch, Cx, Environment, Root, RootConfig};
pub use lazy::{use_lazy, use_pure, Created, LazyInit, SourceRef};
pub use listener::{Listener, Unsubscribe};
pub use slice::Slice;
pub use subscription::SnapshotHook;
