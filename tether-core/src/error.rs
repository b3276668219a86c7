//! Error types.
//!
//! Normal operation of the snapshot protocol never fails. Errors only come
//! from the host runtime (a render loop that never settles) and from
//! process-level configuration.

use thiserror::Error;

/// Failure reported by a [`Root`](crate::host::Root) while flushing updates.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    /// Re-renders kept scheduling further re-renders without settling.
    ///
    /// This is the observable symptom of a `get_snapshot` that returns a
    /// different value every time it is called.
    #[error("maximum update depth exceeded: {limit} nested renders without settling")]
    UpdateDepthExceeded {
        /// The configured limit that was hit.
        limit: usize,
    },
}

/// Failure while selecting process-wide configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// An environment strategy was already selected for this process.
    #[error("environment already installed as {current:?}")]
    EnvironmentAlreadyInstalled {
        /// The strategy that is in effect.
        current: crate::host::Environment,
    },

    /// The environment variable named an unknown strategy.
    #[error("unknown environment {0:?}, expected \"interactive\" or \"static\"")]
    UnknownEnvironment(String),
}
