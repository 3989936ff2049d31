//! # concord-config
//!
//! Layered configuration loading for Concord using figment.
//!
//! Configuration sources (in priority order, highest wins):
//! 1. Environment variables (`CONCORD_*` prefix, `__` as separator)
//! 2. Project-level `.concord/config.toml`
//! 3. User-level `~/.config/concord/config.toml`
//! 4. Built-in defaults
//!
//! Figment maps `CONCORD_COORDINATOR__TRANSACTION_TIMEOUT_MS` to
//! `coordinator.transaction_timeout_ms` and
//! `CONCORD_COORDINATOR__RETRY__MAX_ATTEMPTS` to
//! `coordinator.retry.max_attempts`.
//!
//! ```no_run
//! use concord_config::ConcordConfig;
//!
//! let config = ConcordConfig::load_with_dotenv().expect("config");
//! println!("journal: {}", config.storage.journal_path().display());
//! ```

mod coordinator;
mod error;
mod health;
mod reconcile;
mod storage;

pub use coordinator::{CoordinatorConfig, RetrySettings};
pub use error::ConfigError;
pub use health::HealthConfig;
pub use reconcile::ReconcileConfig;
pub use storage::StorageConfig;

use std::path::PathBuf;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ConcordConfig {
    #[serde(default)]
    pub coordinator: CoordinatorConfig,
    #[serde(default)]
    pub reconcile: ReconcileConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub health: HealthConfig,
}

impl ConcordConfig {
    /// Load configuration from all sources and validate it.
    ///
    /// Does not read `.env`; use [`Self::load_with_dotenv`] for that.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Figment`] if a source cannot be parsed and
    /// [`ConfigError::InvalidValue`] if a value is out of range.
    pub fn load() -> Result<Self, ConfigError> {
        let config: Self = Self::figment().extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Load `.env` from the current directory, then [`Self::load`].
    ///
    /// # Errors
    ///
    /// Same as [`Self::load`].
    pub fn load_with_dotenv() -> Result<Self, ConfigError> {
        // A missing .env file is not an error.
        let _ = dotenvy::dotenv();
        Self::load()
    }

    /// Build the figment provider chain.
    ///
    /// Public so tests and the CLI can layer further providers on top.
    #[must_use]
    pub fn figment() -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Some(global_path) = Self::global_config_path() {
            if global_path.exists() {
                figment = figment.merge(Toml::file(global_path));
            }
        }

        let local_path = PathBuf::from(".concord/config.toml");
        if local_path.exists() {
            figment = figment.merge(Toml::file(local_path));
        }

        figment.merge(Env::prefixed("CONCORD_").split("__"))
    }

    /// Reject values that would make the coordinator or engine inert.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            (
                "coordinator.transaction_timeout_ms",
                self.coordinator.transaction_timeout_ms,
            ),
            (
                "coordinator.compensation_timeout_ms",
                self.coordinator.compensation_timeout_ms,
            ),
            (
                "coordinator.retry.max_attempts",
                u64::from(self.coordinator.retry.max_attempts),
            ),
            ("health.timeout_ms", self.health.timeout_ms),
        ];
        for (field, value) in positive {
            if value == 0 {
                return Err(invalid(field, "must be greater than zero"));
            }
        }

        if self.coordinator.retry.max_delay_ms < self.coordinator.retry.base_delay_ms {
            return Err(invalid(
                "coordinator.retry.max_delay_ms",
                "must not be smaller than base_delay_ms",
            ));
        }

        if self.storage.data_dir.trim().is_empty() {
            return Err(invalid("storage.data_dir", "must not be empty"));
        }

        if self
            .reconcile
            .required_fields
            .iter()
            .any(|field| field.trim().is_empty())
        {
            return Err(invalid(
                "reconcile.required_fields",
                "entries must not be empty",
            ));
        }

        Ok(())
    }

    fn global_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("concord").join("config.toml"))
    }
}

fn invalid(field: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        reason: reason.to_string(),
    }
}
