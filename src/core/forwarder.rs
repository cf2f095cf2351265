//! Request forwarding
//!
//! One forwarder handles both delivery modes. The sync path owns its usage
//! accounting: exactly one event per request that reached a provider, none
//! for requests rejected by validation or lookup. The streaming path hands
//! accounting to the stream proxy along with the session.

use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

use crate::core::directory::ProviderDirectory;
use crate::core::streaming::{RelayBody, StreamProxy};
use crate::core::types::{ChatCompletionRequest, TokenUsage};
use crate::core::usage::{UsageEvent, UsageSink, record_event};
use crate::utils::error::{GatewayError, Result};

/// Reply from [`RequestForwarder::forward`]
pub enum ForwardReply {
    /// Complete upstream body, verbatim
    Full(Value),
    /// Live SSE relay body
    Stream(RelayBody),
}

impl fmt::Debug for ForwardReply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Full(body) => f.debug_tuple("Full").field(body).finish(),
            Self::Stream(_) => f.debug_tuple("Stream").finish_non_exhaustive(),
        }
    }
}

/// Routes a chat completion to its provider and accounts for the outcome
pub struct RequestForwarder {
    directory: Arc<ProviderDirectory>,
    proxy: StreamProxy,
    sink: Arc<dyn UsageSink>,
}

impl RequestForwarder {
    pub fn new(directory: Arc<ProviderDirectory>, sink: Arc<dyn UsageSink>) -> Self {
        Self {
            directory,
            proxy: StreamProxy::new(Arc::clone(&sink)),
            sink,
        }
    }

    /// Validate, resolve, and deliver one request.
    ///
    /// Validation and lookup failures propagate unchanged and leave no trace
    /// in the usage stream; those requests never reached a provider.
    pub async fn forward(&self, request: ChatCompletionRequest) -> Result<ForwardReply> {
        validate(&request)?;
        let client = self.directory.lookup(&request.model)?;

        if request.is_stream() {
            let body = self.proxy.open(client, &request).await?;
            return Ok(ForwardReply::Stream(body));
        }

        let started = Instant::now();
        match client.complete(&request).await {
            Ok(body) => {
                let duration_ms = started.elapsed().as_millis() as u64;
                let usage = TokenUsage::from_response(&body);
                debug!(
                    model = %request.model,
                    provider = client.id(),
                    duration_ms,
                    tokens = usage.effective_total(),
                    "completion forwarded"
                );
                let event =
                    UsageEvent::success(request.model.as_str(), client.id(), duration_ms, &usage);
                record_event(&self.sink, event).await;
                Ok(ForwardReply::Full(body))
            }
            Err(err) => {
                let duration_ms = started.elapsed().as_millis() as u64;
                warn!(
                    model = %request.model,
                    provider = client.id(),
                    duration_ms,
                    error = %err,
                    "completion failed"
                );
                let event = UsageEvent::failure(
                    request.model.as_str(),
                    client.id(),
                    duration_ms,
                    &TokenUsage::default(),
                    err.to_string(),
                );
                record_event(&self.sink, event).await;
                Err(err)
            }
        }
    }
}

fn validate(request: &ChatCompletionRequest) -> Result<()> {
    if request.model.trim().is_empty() {
        return Err(GatewayError::validation("the 'model' field must not be empty"));
    }
    if request.messages.is_empty() {
        return Err(GatewayError::validation(
            "the 'messages' field must not be empty",
        ));
    }
    Ok(())
}
