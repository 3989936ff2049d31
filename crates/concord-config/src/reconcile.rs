//! Gap detection and auto-fix configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

const fn default_max_retries() -> u32 {
    2
}

const fn default_retry_delay_ms() -> u64 {
    200
}

const fn default_require_confirmation() -> bool {
    true
}

fn default_required_fields() -> Vec<String> {
    ["name", "elements", "connections"]
        .into_iter()
        .map(String::from)
        .collect()
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ReconcileConfig {
    /// Engine-level retries after the first attempt of a fix.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Delay before the first engine-level retry; doubles per retry.
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    /// Refuse mutating strategies that were not confirmed.
    #[serde(default = "default_require_confirmation")]
    pub require_confirmation: bool,

    /// Plan only; never touch a backend.
    #[serde(default)]
    pub dry_run: bool,

    /// Payload fields a derived record must carry to count as migrated.
    #[serde(default = "default_required_fields")]
    pub required_fields: Vec<String>,

    /// Directory where fix reports are written. Empty disables persistence.
    #[serde(default)]
    pub report_dir: String,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            retry_delay_ms: default_retry_delay_ms(),
            require_confirmation: default_require_confirmation(),
            dry_run: false,
            required_fields: default_required_fields(),
            report_dir: String::new(),
        }
    }
}

impl ReconcileConfig {
    #[must_use]
    pub const fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    #[must_use]
    pub fn persists_reports(&self) -> bool {
        !self.report_dir.is_empty()
    }
}
