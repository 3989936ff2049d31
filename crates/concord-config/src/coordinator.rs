//! SAGA coordinator configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default wall-clock budget for one transaction, in milliseconds.
const fn default_transaction_timeout_ms() -> u64 {
    30_000
}

/// Default bound on a single compensator, in milliseconds.
const fn default_compensation_timeout_ms() -> u64 {
    10_000
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CoordinatorConfig {
    /// Budget from `begin` to the end of the forward pass. Lock waits count
    /// against it; exceeding it triggers compensation.
    #[serde(default = "default_transaction_timeout_ms")]
    pub transaction_timeout_ms: u64,

    /// Upper bound for each compensating action.
    #[serde(default = "default_compensation_timeout_ms")]
    pub compensation_timeout_ms: u64,

    /// Step-level retry of unavailable backends.
    #[serde(default)]
    pub retry: RetrySettings,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            transaction_timeout_ms: default_transaction_timeout_ms(),
            compensation_timeout_ms: default_compensation_timeout_ms(),
            retry: RetrySettings::default(),
        }
    }
}

impl CoordinatorConfig {
    #[must_use]
    pub const fn transaction_timeout(&self) -> Duration {
        Duration::from_millis(self.transaction_timeout_ms)
    }

    #[must_use]
    pub const fn compensation_timeout(&self) -> Duration {
        Duration::from_millis(self.compensation_timeout_ms)
    }
}

const fn default_max_attempts() -> u32 {
    3
}

const fn default_base_delay_ms() -> u64 {
    100
}

const fn default_max_delay_ms() -> u64 {
    2_000
}

/// Exponential backoff parameters.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RetrySettings {
    /// Attempts including the first one.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    /// Backoff is capped here.
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}
