//! Usage accounting
//!
//! Every forwarded request produces exactly one [`UsageEvent`], success or
//! failure. Where those events go is someone else's business: the relay only
//! knows the [`UsageSink`] trait. Recording is strictly best effort; a sink
//! failure is logged and swallowed, never surfaced to the caller.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::core::types::TokenUsage;
use crate::utils::error::Result;

/// Number of raw events the in-memory sink keeps around
const RECENT_EVENTS_CAP: usize = 256;

/// One accounting record per forwarded request
#[derive(Debug, Clone, Serialize)]
pub struct UsageEvent {
    /// Model the caller asked for
    pub model: String,
    /// Provider that served (or failed) the request
    pub provider: String,
    /// Whether the request ran to completion
    pub success: bool,
    /// Wall-clock time from forward to terminal state
    pub duration_ms: u64,
    /// Prompt-side tokens, zero when unreported
    pub tokens_in: u32,
    /// Completion-side tokens, zero when unreported
    pub tokens_out: u32,
    /// Terminal error message for failed requests
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// When the event was produced
    pub timestamp: DateTime<Utc>,
}

impl UsageEvent {
    /// Event for a request that ran to completion
    pub fn success(
        model: impl Into<String>,
        provider: impl Into<String>,
        duration_ms: u64,
        usage: &TokenUsage,
    ) -> Self {
        Self {
            model: model.into(),
            provider: provider.into(),
            success: true,
            duration_ms,
            tokens_in: usage.tokens_in(),
            tokens_out: usage.tokens_out(),
            error: None,
            timestamp: Utc::now(),
        }
    }

    /// Event for a request that ended in a terminal failure
    pub fn failure(
        model: impl Into<String>,
        provider: impl Into<String>,
        duration_ms: u64,
        usage: &TokenUsage,
        error: impl Into<String>,
    ) -> Self {
        Self {
            model: model.into(),
            provider: provider.into(),
            success: false,
            duration_ms,
            tokens_in: usage.tokens_in(),
            tokens_out: usage.tokens_out(),
            error: Some(error.into()),
            timestamp: Utc::now(),
        }
    }
}

/// Destination for usage events.
///
/// Implementations are the seam to whatever statistics store the deployment
/// uses; the relay ships a tracing-based sink and an in-memory one.
#[async_trait]
pub trait UsageSink: Send + Sync {
    async fn record(&self, event: UsageEvent) -> Result<()>;
}

/// Record an event, logging and swallowing sink failures
pub async fn record_event(sink: &Arc<dyn UsageSink>, event: UsageEvent) {
    let model = event.model.clone();
    if let Err(err) = sink.record(event).await {
        warn!(model = %model, error = %err, "usage sink rejected event");
    }
}

/// Sink that writes structured log lines under the `usage` target
#[derive(Debug, Default)]
pub struct LogUsageSink;

#[async_trait]
impl UsageSink for LogUsageSink {
    async fn record(&self, event: UsageEvent) -> Result<()> {
        debug!(
            target: "usage",
            model = %event.model,
            provider = %event.provider,
            success = event.success,
            duration_ms = event.duration_ms,
            tokens_in = event.tokens_in,
            tokens_out = event.tokens_out,
            error = event.error.as_deref(),
            "usage event"
        );
        Ok(())
    }
}

/// Per-model aggregate kept by [`MemoryUsageSink`]
#[derive(Debug, Clone, Default, Serialize)]
pub struct ModelUsage {
    pub requests: u64,
    pub failures: u64,
    pub tokens_in: u64,
    pub tokens_out: u64,
}

/// In-memory sink: per-model aggregates plus a bounded ring of raw events.
///
/// Used by the test suite and handy as a default when no external store is
/// wired up.
#[derive(Debug, Default)]
pub struct MemoryUsageSink {
    aggregates: DashMap<String, ModelUsage>,
    recent: Mutex<VecDeque<UsageEvent>>,
}

impl MemoryUsageSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Aggregate counters for one model
    pub fn model_usage(&self, model: &str) -> Option<ModelUsage> {
        self.aggregates.get(model).map(|entry| entry.clone())
    }

    /// All retained raw events, oldest first
    pub fn events(&self) -> Vec<UsageEvent> {
        self.recent.lock().iter().cloned().collect()
    }

    pub fn event_count(&self) -> usize {
        self.recent.lock().len()
    }
}

#[async_trait]
impl UsageSink for MemoryUsageSink {
    async fn record(&self, event: UsageEvent) -> Result<()> {
        let mut aggregate = self.aggregates.entry(event.model.clone()).or_default();
        aggregate.requests += 1;
        if !event.success {
            aggregate.failures += 1;
        }
        aggregate.tokens_in += u64::from(event.tokens_in);
        aggregate.tokens_out += u64::from(event.tokens_out);
        drop(aggregate);

        let mut recent = self.recent.lock();
        if recent.len() == RECENT_EVENTS_CAP {
            recent.pop_front();
        }
        recent.push_back(event);
        Ok(())
    }
}
