//! Relay between one upstream SSE stream and one caller
//!
//! A relay session moves through Opening, Relaying, and exactly one terminal
//! state: Completed, Failed, TimedOut, or Aborted. Whatever the path, the
//! session records exactly one usage event. The generator owns both the
//! upstream handle and the deadline timer, so every terminal transition
//! releases them by plain ownership.

use async_stream::stream;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;
use tokio::time;
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::core::providers::ProviderClient;
use crate::core::streaming::sse::{SseScanner, data_frame, done_frame};
use crate::core::types::{ChatCompletionRequest, TokenUsage};
use crate::core::usage::{UsageEvent, UsageSink, record_event};
use crate::utils::error::{GatewayError, Result};

/// Byte stream handed to the HTTP layer as the response body
pub type RelayBody = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>;

/// Builds relay sessions and owns the sink they report to
pub struct StreamProxy {
    sink: Arc<dyn UsageSink>,
}

impl StreamProxy {
    pub fn new(sink: Arc<dyn UsageSink>) -> Self {
        Self { sink }
    }

    /// Open an upstream stream and return the relay body.
    ///
    /// An opening failure comes back as a classified error before any byte
    /// reaches the caller, so the HTTP layer can still answer with a proper
    /// status. The failure event is recorded here either way.
    pub async fn open(
        &self,
        client: Arc<dyn ProviderClient>,
        request: &ChatCompletionRequest,
    ) -> Result<RelayBody> {
        let deadline_after = client.call_timeout();
        // One deadline instant for the whole session: opening and relaying
        // share it, nothing re-arms it per chunk
        let deadline_at = time::Instant::now() + deadline_after;
        let mut session = SessionGuard::new(
            request.model.clone(),
            client.id().to_string(),
            Arc::clone(&self.sink),
        );

        debug!(
            session = %session.id,
            model = %session.model,
            provider = %session.provider,
            "opening stream relay"
        );
        let mut upstream = match time::timeout_at(deadline_at, client.open_stream(request)).await {
            Ok(Ok(upstream)) => upstream,
            Ok(Err(err)) => {
                warn!(
                    session = %session.id,
                    model = %session.model,
                    provider = %session.provider,
                    error = %err,
                    "stream relay failed to open"
                );
                session.finish_failure(&err).await;
                return Err(err);
            }
            Err(_) => {
                let err = GatewayError::timeout(
                    &session.provider,
                    format!("stream did not open within the {deadline_after:?} session deadline"),
                );
                warn!(
                    session = %session.id,
                    model = %session.model,
                    provider = %session.provider,
                    "stream relay timed out while opening"
                );
                session.finish_failure(&err).await;
                return Err(err);
            }
        };

        let relay = stream! {
            let mut scanner = SseScanner::new();
            let mut flushed = false;
            let deadline = time::sleep_until(deadline_at);
            tokio::pin!(deadline);

            loop {
                tokio::select! {
                    biased;
                    () = &mut deadline => {
                        let err = GatewayError::timeout(
                            &session.provider,
                            format!("stream exceeded the {deadline_after:?} session deadline"),
                        );
                        warn!(
                            session = %session.id,
                            model = %session.model,
                            provider = %session.provider,
                            "stream relay timed out"
                        );
                        if !flushed {
                            yield Ok(data_frame(&err.to_body().to_string()));
                        }
                        session.finish_failure(&err).await;
                        return;
                    }
                    item = upstream.next() => {
                        match item {
                            Some(Ok(chunk)) => {
                                scanner.observe(&chunk);
                                session.observe_usage(scanner.usage());
                                flushed = true;
                                yield Ok(chunk);
                                // The sentinel ends the session even when the
                                // upstream holds its connection open
                                if scanner.saw_done() {
                                    debug!(
                                        session = %session.id,
                                        model = %session.model,
                                        provider = %session.provider,
                                        tokens_in = session.usage.tokens_in(),
                                        tokens_out = session.usage.tokens_out(),
                                        "stream relay completed"
                                    );
                                    session.finish_success().await;
                                    return;
                                }
                            }
                            Some(Err(err)) => {
                                error!(
                                    session = %session.id,
                                    model = %session.model,
                                    provider = %session.provider,
                                    error = %err,
                                    "upstream failed mid-relay"
                                );
                                if !flushed {
                                    yield Ok(data_frame(&err.to_body().to_string()));
                                }
                                session.finish_failure(&err).await;
                                return;
                            }
                            None => {
                                if !scanner.saw_done() {
                                    yield Ok(done_frame());
                                }
                                session.observe_usage(scanner.usage());
                                debug!(
                                    session = %session.id,
                                    model = %session.model,
                                    provider = %session.provider,
                                    tokens_in = session.usage.tokens_in(),
                                    tokens_out = session.usage.tokens_out(),
                                    "stream relay completed"
                                );
                                session.finish_success().await;
                                return;
                            }
                        }
                    }
                }
            }
        };

        Ok(Box::pin(relay))
    }
}

/// Accounting guard for one relay session.
///
/// The terminal paths settle it explicitly; if the caller walks away and the
/// generator is dropped mid-relay, `Drop` settles it as an abort. Either way
/// exactly one event reaches the sink.
struct SessionGuard {
    id: Uuid,
    model: String,
    provider: String,
    sink: Arc<dyn UsageSink>,
    started: Instant,
    usage: TokenUsage,
    settled: bool,
}

impl SessionGuard {
    fn new(model: String, provider: String, sink: Arc<dyn UsageSink>) -> Self {
        Self {
            id: Uuid::new_v4(),
            model,
            provider,
            sink,
            started: Instant::now(),
            usage: TokenUsage::default(),
            settled: false,
        }
    }

    fn observe_usage(&mut self, usage: Option<&TokenUsage>) {
        if let Some(usage) = usage {
            self.usage = usage.clone();
        }
    }

    fn elapsed_ms(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }

    async fn finish_success(&mut self) {
        if self.settled {
            return;
        }
        self.settled = true;
        let event = UsageEvent::success(
            self.model.as_str(),
            self.provider.as_str(),
            self.elapsed_ms(),
            &self.usage,
        );
        record_event(&self.sink, event).await;
    }

    async fn finish_failure(&mut self, error: &GatewayError) {
        if self.settled {
            return;
        }
        self.settled = true;
        let event = UsageEvent::failure(
            self.model.as_str(),
            self.provider.as_str(),
            self.elapsed_ms(),
            &self.usage,
            error.to_string(),
        );
        record_event(&self.sink, event).await;
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        self.settled = true;
        debug!(
            session = %self.id,
            model = %self.model,
            provider = %self.provider,
            "stream relay aborted by caller"
        );
        let event = UsageEvent::failure(
            self.model.as_str(),
            self.provider.as_str(),
            self.elapsed_ms(),
            &self.usage,
            "stream aborted by caller",
        );
        let sink = Arc::clone(&self.sink);
        // Drop must not block; hand the event to the runtime if one is alive
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            handle.spawn(async move { record_event(&sink, event).await });
        }
    }
}
