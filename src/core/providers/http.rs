//! OpenAI-compatible HTTP provider adapter
//!
//! One adapter covers every vendor that speaks the OpenAI chat-completion
//! protocol; providers differ only in base URL, credential, and timeout.
//! Error classification happens here, once, and nowhere else: higher layers
//! see `GatewayError` kinds, never raw reqwest errors or status codes.

use async_trait::async_trait;
use futures_util::TryStreamExt;
use reqwest::StatusCode;
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;

use super::{ByteStream, ProviderClient, ProviderStatus};
use crate::config::ProviderConfig;
use crate::core::health::HealthRecord;
use crate::core::types::ChatCompletionRequest;
use crate::utils::error::{GatewayError, Result};

/// Connection establishment budget, separate from per-call timeouts
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Health probes use a short timeout independent of the per-call one
const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Upstream error bodies are truncated to this many bytes in messages
const ERROR_BODY_CAP: usize = 200;

/// Adapter for one OpenAI-compatible upstream
#[derive(Debug)]
pub struct HttpProviderClient {
    id: String,
    display_name: String,
    base_url: String,
    api_key: Option<String>,
    timeout: Duration,
    max_retries: u32,
    models: Vec<String>,
    client: reqwest::Client,
    health: Arc<HealthRecord>,
}

impl HttpProviderClient {
    pub fn new(config: &ProviderConfig, failure_threshold: u32) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|err| {
                GatewayError::config(format!(
                    "failed to build http client for '{}': {err}",
                    config.name
                ))
            })?;

        Ok(Self {
            id: config.name.clone(),
            display_name: config.display_name().to_string(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            timeout: config.timeout(),
            max_retries: config.max_retries,
            models: config.models.clone(),
            client,
            health: Arc::new(HealthRecord::new(&config.name, failure_threshold)),
        })
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    fn request(&self, url: &str) -> reqwest::RequestBuilder {
        let mut builder = self.client.post(url);
        if let Some(api_key) = &self.api_key {
            builder = builder.header(reqwest::header::AUTHORIZATION, format!("Bearer {api_key}"));
        }
        builder
    }

    /// Record the failure and hand the error back for propagation
    fn fail(&self, err: GatewayError) -> GatewayError {
        self.health.record_failure(&err.to_string());
        err
    }
}

#[async_trait]
impl ProviderClient for HttpProviderClient {
    fn id(&self) -> &str {
        &self.id
    }

    fn display_name(&self) -> &str {
        &self.display_name
    }

    fn call_timeout(&self) -> Duration {
        self.timeout
    }

    fn is_healthy(&self) -> bool {
        self.health.is_healthy()
    }

    async fn complete(&self, request: &ChatCompletionRequest) -> Result<Value> {
        let response = self
            .request(&self.completions_url())
            .timeout(self.timeout)
            .json(request)
            .send()
            .await
            .map_err(|err| self.fail(classify_transport(&self.id, &err)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(self.fail(classify_status(&self.id, status, &body)));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|err| self.fail(classify_transport(&self.id, &err)))?;
        self.health.record_success();
        Ok(body)
    }

    async fn open_stream(&self, request: &ChatCompletionRequest) -> Result<ByteStream> {
        // No request timeout here: the stream proxy owns the session deadline.
        let response = self
            .request(&self.completions_url())
            .json(request)
            .send()
            .await
            .map_err(|err| self.fail(classify_transport(&self.id, &err)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(self.fail(classify_status(&self.id, status, &body)));
        }
        self.health.record_success();

        let provider = self.id.clone();
        let health = Arc::clone(&self.health);
        let stream = response.bytes_stream().map_err(move |err| {
            let mapped = GatewayError::stream(provider.clone(), err.to_string());
            health.record_failure(&mapped.to_string());
            mapped
        });
        Ok(Box::pin(stream))
    }

    async fn probe_health(&self) -> bool {
        // Nothing bound to this provider means nothing to probe against
        let Some(model) = self.models.first() else {
            return self.health.is_healthy();
        };

        let probe = json!({
            "model": model,
            "messages": [{ "role": "user", "content": "ping" }],
            "max_tokens": 1,
        });

        let result = self
            .request(&self.completions_url())
            .timeout(PROBE_TIMEOUT)
            .json(&probe)
            .send()
            .await;

        match result {
            Ok(response) if response.status().is_success() => {
                self.health.record_success();
                true
            }
            Ok(response) => {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                self.fail(classify_status(&self.id, status, &body));
                false
            }
            Err(err) => {
                self.fail(classify_transport(&self.id, &err));
                false
            }
        }
    }

    fn status(&self) -> ProviderStatus {
        ProviderStatus {
            id: self.id.clone(),
            name: self.display_name.clone(),
            models: self.models.clone(),
            max_retries: self.max_retries,
            enabled: true,
            health: self.health.snapshot(),
        }
    }
}

/// Map a non-2xx upstream status onto the taxonomy
pub(crate) fn classify_status(provider: &str, status: StatusCode, body: &str) -> GatewayError {
    let message = error_message_from_body(body);
    match status {
        StatusCode::TOO_MANY_REQUESTS => GatewayError::rate_limit(provider, message),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            GatewayError::authentication(provider, message)
        }
        other => GatewayError::provider_error(provider, other.as_u16(), message),
    }
}

/// Map a reqwest transport failure onto the taxonomy
pub(crate) fn classify_transport(provider: &str, err: &reqwest::Error) -> GatewayError {
    if err.is_timeout() {
        GatewayError::timeout(provider, err.to_string())
    } else {
        GatewayError::network(provider, err.to_string())
    }
}

/// Pull `error.message` out of an OpenAI-style error body, falling back to
/// the truncated raw body
fn error_message_from_body(body: &str) -> String {
    if let Ok(parsed) = serde_json::from_str::<Value>(body) {
        if let Some(message) = parsed["error"]["message"].as_str() {
            return message.to_string();
        }
    }
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return "no response body".to_string();
    }
    let mut end = trimmed.len().min(ERROR_BODY_CAP);
    while !trimmed.is_char_boundary(end) {
        end -= 1;
    }
    trimmed[..end].to_string()
}
