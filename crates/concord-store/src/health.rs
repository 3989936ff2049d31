//! Reachability probe for backend adapters.

use std::time::{Duration, Instant};

use chrono::Utc;
use concord_core::responses::BackendHealth;

use crate::adapter::SharedAdapter;

pub struct HealthProbe {
    timeout: Duration,
}

impl HealthProbe {
    #[must_use]
    pub const fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Ping every adapter, reporting in input order.
    pub async fn check(&self, adapters: &[SharedAdapter]) -> Vec<BackendHealth> {
        let mut results = Vec::with_capacity(adapters.len());
        for adapter in adapters {
            results.push(self.check_one(adapter).await);
        }
        results
    }

    pub async fn check_one(&self, adapter: &SharedAdapter) -> BackendHealth {
        let started = Instant::now();
        let outcome = tokio::time::timeout(self.timeout, adapter.ping()).await;
        let latency_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        let error = match outcome {
            Ok(Ok(())) => None,
            Ok(Err(e)) => Some(e.to_string()),
            Err(_) => Some(format!("no answer within {} ms", self.timeout.as_millis())),
        };
        if let Some(error) = &error {
            tracing::warn!(backend = %adapter.name(), error = %error, "backend unreachable");
        }

        BackendHealth {
            backend: adapter.name().to_string(),
            kind: adapter.kind(),
            reachable: error.is_none(),
            latency_ms,
            error,
            checked_at: Utc::now(),
        }
    }
}
