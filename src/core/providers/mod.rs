//! Provider abstraction
//!
//! [`ProviderClient`] is the seam between the relay core and any upstream
//! vendor. The directory hands out `Arc<dyn ProviderClient>`, the forwarder
//! and stream proxy call through it, and nothing above this trait knows what
//! protocol sits behind it. The shipped implementation is
//! [`HttpProviderClient`], an adapter for OpenAI-compatible HTTP APIs.

pub mod http;

pub use http::HttpProviderClient;

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use serde::Serialize;
use serde_json::Value;
use std::fmt::Debug;
use std::pin::Pin;
use std::time::Duration;

use crate::core::health::HealthSnapshot;
use crate::core::types::ChatCompletionRequest;
use crate::utils::error::Result;

/// Raw SSE byte stream handed from the adapter to the stream proxy
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>;

/// Identity and health of one provider, as reported by status endpoints
#[derive(Debug, Clone, Serialize)]
pub struct ProviderStatus {
    /// Stable identifier
    pub id: String,
    /// Human-readable name
    pub name: String,
    /// Models this provider serves
    pub models: Vec<String>,
    /// Retry budget surfaced for outer layers; unused inside the relay
    pub max_retries: u32,
    /// Whether the directory routes to this provider; a client on its own
    /// reports itself enabled
    pub enabled: bool,
    /// Current health snapshot
    pub health: HealthSnapshot,
}

/// Uniform capability interface over one upstream provider.
///
/// Implementations classify their own failures into the error taxonomy and
/// keep their health record current: any classified failure from actual
/// provider contact counts against health, any success resets it.
#[async_trait]
pub trait ProviderClient: Send + Sync + Debug {
    /// Stable identifier used in bindings, events, and logs
    fn id(&self) -> &str;

    /// Human-readable name for status output
    fn display_name(&self) -> &str;

    /// Per-call timeout; also the session deadline for streamed relays
    fn call_timeout(&self) -> Duration;

    /// Whether lookup should currently hand out this provider
    fn is_healthy(&self) -> bool;

    /// One-shot completion. The upstream body comes back verbatim as parsed
    /// JSON; non-2xx answers and transport failures arrive classified.
    async fn complete(&self, request: &ChatCompletionRequest) -> Result<Value>;

    /// Open an SSE stream for a completion. Classification covers the
    /// connection attempt; transport failures after that surface as `Stream`
    /// items inside the returned stream.
    async fn open_stream(&self, request: &ChatCompletionRequest) -> Result<ByteStream>;

    /// Send a minimal fixed test prompt with a short, independent timeout.
    /// Success resets the failure counter, failure increments it.
    async fn probe_health(&self) -> bool;

    /// Identity plus current health, for introspection
    fn status(&self) -> ProviderStatus;
}
