//! Error handling for the relay
//!
//! A single error taxonomy crosses every component boundary: the directory,
//! the provider adapters, the stream proxy, and the HTTP routes all speak
//! [`GatewayError`]. Classification of upstream failures happens once, in the
//! provider adapter; everything above passes the value through unchanged.

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde_json::{Value, json};
use thiserror::Error;

/// Result type alias for the relay
pub type Result<T> = std::result::Result<T, GatewayError>;

/// Main error type for the relay
#[derive(Error, Debug, Clone)]
pub enum GatewayError {
    /// No binding exists for the requested model
    #[error("model '{model}' is not mapped to any provider")]
    ModelNotFound { model: String },

    /// The bound provider is missing from the directory or disabled
    #[error("provider '{provider}' is unavailable: {message}")]
    ProviderUnavailable { provider: String, message: String },

    /// The bound provider tripped its consecutive-failure threshold
    #[error("provider '{provider}' is unhealthy: {message}")]
    ProviderUnhealthy { provider: String, message: String },

    /// Upstream answered 429
    #[error("rate limited by provider '{provider}': {message}")]
    RateLimit { provider: String, message: String },

    /// Upstream answered 401 or 403 (misconfigured credential)
    #[error("authentication with provider '{provider}' failed: {message}")]
    Authentication { provider: String, message: String },

    /// The upstream call exceeded the provider's timeout
    #[error("request to provider '{provider}' timed out: {message}")]
    Timeout { provider: String, message: String },

    /// Connection to the upstream could not be established
    #[error("network error reaching provider '{provider}': {message}")]
    Network { provider: String, message: String },

    /// Any other upstream failure, carrying the upstream status
    #[error("provider '{provider}' returned status {status}: {message}")]
    Provider {
        provider: String,
        status: u16,
        message: String,
    },

    /// Transport failure in the middle of an open stream
    #[error("stream error from provider '{provider}': {message}")]
    Stream { provider: String, message: String },

    /// Malformed inbound request
    #[error("invalid request: {message}")]
    Validation { message: String },

    /// Configuration loading or validation failure
    #[error("configuration error: {message}")]
    Config { message: String },

    /// Catch-all for bugs and unexpected states
    #[error("internal error: {message}")]
    Internal { message: String },
}

impl GatewayError {
    pub fn model_not_found(model: impl Into<String>) -> Self {
        Self::ModelNotFound {
            model: model.into(),
        }
    }

    pub fn provider_unavailable(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ProviderUnavailable {
            provider: provider.into(),
            message: message.into(),
        }
    }

    pub fn provider_unhealthy(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ProviderUnhealthy {
            provider: provider.into(),
            message: message.into(),
        }
    }

    pub fn rate_limit(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::RateLimit {
            provider: provider.into(),
            message: message.into(),
        }
    }

    pub fn authentication(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Authentication {
            provider: provider.into(),
            message: message.into(),
        }
    }

    pub fn timeout(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Timeout {
            provider: provider.into(),
            message: message.into(),
        }
    }

    pub fn network(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Network {
            provider: provider.into(),
            message: message.into(),
        }
    }

    pub fn provider_error(
        provider: impl Into<String>,
        status: u16,
        message: impl Into<String>,
    ) -> Self {
        Self::Provider {
            provider: provider.into(),
            status,
            message: message.into(),
        }
    }

    pub fn stream(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Stream {
            provider: provider.into(),
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Name of the provider this error originated from, if any
    pub fn provider(&self) -> Option<&str> {
        match self {
            Self::ProviderUnavailable { provider, .. }
            | Self::ProviderUnhealthy { provider, .. }
            | Self::RateLimit { provider, .. }
            | Self::Authentication { provider, .. }
            | Self::Timeout { provider, .. }
            | Self::Network { provider, .. }
            | Self::Provider { provider, .. }
            | Self::Stream { provider, .. } => Some(provider),
            Self::ModelNotFound { .. }
            | Self::Validation { .. }
            | Self::Config { .. }
            | Self::Internal { .. } => None,
        }
    }

    /// Stable machine code carried in the error body
    pub fn code(&self) -> &'static str {
        match self {
            Self::ModelNotFound { .. } => "MODEL_NOT_FOUND",
            Self::ProviderUnavailable { .. } => "PROVIDER_UNAVAILABLE",
            Self::ProviderUnhealthy { .. } => "PROVIDER_UNHEALTHY",
            Self::RateLimit { .. } => "RATE_LIMIT",
            Self::Authentication { .. } => "PROVIDER_AUTH_ERROR",
            Self::Timeout { .. } => "PROVIDER_TIMEOUT",
            Self::Network { .. } => "NETWORK_ERROR",
            Self::Provider { .. } => "PROVIDER_ERROR",
            Self::Stream { .. } => "STREAM_ERROR",
            Self::Validation { .. } => "VALIDATION_ERROR",
            Self::Config { .. } => "CONFIG_ERROR",
            Self::Internal { .. } => "INTERNAL_ERROR",
        }
    }

    /// Coarse error category in the OpenAI body's `type` field
    pub fn error_type(&self) -> &'static str {
        match self {
            Self::ModelNotFound { .. } | Self::Validation { .. } => "invalid_request_error",
            Self::RateLimit { .. } => "rate_limit_error",
            Self::ProviderUnavailable { .. }
            | Self::ProviderUnhealthy { .. }
            | Self::Provider { .. } => "provider_error",
            Self::Timeout { .. } | Self::Network { .. } => "upstream_error",
            Self::Authentication { .. }
            | Self::Stream { .. }
            | Self::Config { .. }
            | Self::Internal { .. } => "api_error",
        }
    }

    /// HTTP status this error maps to at the inbound surface.
    ///
    /// `Authentication` deliberately maps to 500 rather than 401: a bad
    /// upstream credential is an operator problem, and this gateway does not
    /// authenticate its own callers.
    pub fn http_status(&self) -> StatusCode {
        match self {
            Self::ModelNotFound { .. } | Self::Validation { .. } => StatusCode::BAD_REQUEST,
            Self::RateLimit { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::ProviderUnavailable { .. }
            | Self::ProviderUnhealthy { .. }
            | Self::Provider { .. } => StatusCode::SERVICE_UNAVAILABLE,
            Self::Timeout { .. } | Self::Network { .. } => StatusCode::GATEWAY_TIMEOUT,
            Self::Authentication { .. }
            | Self::Stream { .. }
            | Self::Config { .. }
            | Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// OpenAI-style error body, shared by the JSON path and the SSE error
    /// frame
    pub fn to_body(&self) -> Value {
        let mut detail = json!({
            "message": self.to_string(),
            "type": self.error_type(),
            "code": self.code(),
        });
        if let Some(provider) = self.provider() {
            detail["provider"] = json!(provider);
        }
        json!({ "error": detail })
    }
}

impl ResponseError for GatewayError {
    fn status_code(&self) -> StatusCode {
        self.http_status()
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.http_status()).json(self.to_body())
    }
}

impl From<std::io::Error> for GatewayError {
    fn from(err: std::io::Error) -> Self {
        Self::config(err.to_string())
    }
}

impl From<serde_yaml::Error> for GatewayError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::config(err.to_string())
    }
}

impl From<serde_json::Error> for GatewayError {
    fn from(err: serde_json::Error) -> Self {
        Self::internal(err.to_string())
    }
}
