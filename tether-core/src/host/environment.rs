//! Environment Strategy
//!
//! A process renders either interactively (effects run, sources are
//! realized, snapshots follow changes) or statically (one pass, no effects,
//! the server snapshot is used). The strategy is chosen once per process and
//! never re-examined per call.
//!
//! Selection order: an explicit [`Environment::install`], otherwise the
//! `TETHER_ENVIRONMENT` variable, otherwise [`Environment::Interactive`].

use std::sync::OnceLock;

use crate::error::ConfigError;

/// Name of the variable consulted when no strategy was installed.
pub const ENVIRONMENT_VAR: &str = "TETHER_ENVIRONMENT";

/// Rendering strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    /// Effects run and snapshots stay synchronized with their sources.
    #[default]
    Interactive,
    /// One-shot rendering with server snapshots and no effects.
    Static,
}

static ENVIRONMENT: OnceLock<Environment> = OnceLock::new();

impl Environment {
    /// Select the strategy for this process.
    ///
    /// Fails if a strategy was already installed or already read.
    pub fn install(self) -> Result<(), ConfigError> {
        ENVIRONMENT.set(self).map_err(|_| ConfigError::EnvironmentAlreadyInstalled {
            current: Environment::current(),
        })?;
        tracing::debug!(environment = ?self, "environment installed");
        Ok(())
    }

    /// The strategy in effect, detecting it on first use.
    pub fn current() -> Environment {
        *ENVIRONMENT.get_or_init(|| match Environment::from_env() {
            Ok(environment) => environment,
            Err(err) => {
                tracing::warn!(error = %err, "falling back to interactive environment");
                Environment::Interactive
            }
        })
    }

    /// Read the strategy from [`ENVIRONMENT_VAR`].
    pub fn from_env() -> Result<Environment, ConfigError> {
        match std::env::var(ENVIRONMENT_VAR) {
            Ok(value) => value.parse(),
            Err(_) => Ok(Environment::Interactive),
        }
    }

    /// Whether effects run under this strategy.
    pub fn runs_effects(self) -> bool {
        matches!(self, Environment::Interactive)
    }
}

impl std::str::FromStr for Environment {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "interactive" | "" => Ok(Environment::Interactive),
            "static" => Ok(Environment::Static),
            _ => Err(ConfigError::UnknownEnvironment(value.to_string())),
        }
    }
}
