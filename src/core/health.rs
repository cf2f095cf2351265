//! Provider health tracking
//!
//! Each provider carries one [`HealthRecord`]: a consecutive-failure counter
//! fed by real request outcomes and by the background prober. A provider is
//! unhealthy once the counter reaches its threshold and becomes healthy again
//! on the next success, with no half-open state in between. The record sits
//! on the lookup hot path, so it is atomics all the way down.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rand::Rng;
use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::core::directory::ProviderDirectory;

/// Consecutive failures before a provider is skipped at lookup
pub const DEFAULT_FAILURE_THRESHOLD: u32 = 5;

/// Mutable health state of one provider
#[derive(Debug)]
pub struct HealthRecord {
    provider: String,
    threshold: u32,
    consecutive_failures: AtomicU32,
    last_error: Mutex<Option<String>>,
    last_healthy: Mutex<Option<DateTime<Utc>>>,
}

impl HealthRecord {
    pub fn new(provider: impl Into<String>, threshold: u32) -> Self {
        Self {
            provider: provider.into(),
            threshold: threshold.max(1),
            consecutive_failures: AtomicU32::new(0),
            last_error: Mutex::new(None),
            last_healthy: Mutex::new(Some(Utc::now())),
        }
    }

    /// Reset the failure counter; recovery is implicit
    pub fn record_success(&self) {
        let failures = self.consecutive_failures.swap(0, Ordering::Relaxed);
        if failures >= self.threshold {
            info!(provider = %self.provider, "provider recovered");
        }
        *self.last_healthy.lock() = Some(Utc::now());
    }

    /// Count one failure and remember its message
    pub fn record_failure(&self, error: &str) {
        let failures = self.consecutive_failures.fetch_add(1, Ordering::Relaxed) + 1;
        *self.last_error.lock() = Some(error.to_string());
        if failures == self.threshold {
            warn!(
                provider = %self.provider,
                failures,
                "provider marked unhealthy"
            );
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.consecutive_failures.load(Ordering::Relaxed) < self.threshold
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> HealthSnapshot {
        HealthSnapshot {
            healthy: self.is_healthy(),
            consecutive_failures: self.consecutive_failures(),
            last_error: self.last_error.lock().clone(),
            last_healthy: *self.last_healthy.lock(),
        }
    }
}

/// Point-in-time view of a [`HealthRecord`], safe to serialize
#[derive(Debug, Clone, Serialize)]
pub struct HealthSnapshot {
    pub healthy: bool,
    pub consecutive_failures: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_healthy: Option<DateTime<Utc>>,
}

/// Background loop that probes every registered provider on an interval.
///
/// Reads the directory snapshot on each tick, so providers added or removed
/// by a reload are picked up without restarting the prober.
pub struct HealthProber {
    directory: Arc<ProviderDirectory>,
    interval: Duration,
}

impl HealthProber {
    pub fn new(directory: Arc<ProviderDirectory>, interval: Duration) -> Self {
        Self {
            directory,
            interval,
        }
    }

    pub fn spawn(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move { self.run().await })
    }

    async fn run(self) {
        info!(interval_secs = self.interval.as_secs(), "health prober started");
        loop {
            tokio::time::sleep(self.jittered_interval()).await;
            for client in self.directory.all_providers() {
                let ok = client.probe_health().await;
                debug!(provider = %client.id(), healthy = ok, "health probe finished");
            }
        }
    }

    /// Interval with +/-10% jitter so probes do not align across replicas
    fn jittered_interval(&self) -> Duration {
        let base = self.interval.as_millis().max(1) as u64;
        let jitter = base / 10;
        let millis = rand::thread_rng().gen_range(base.saturating_sub(jitter)..=base + jitter);
        Duration::from_millis(millis)
    }
}
