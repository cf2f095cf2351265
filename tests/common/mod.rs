//! Shared test infrastructure

use actix_web::web;
use serde_json::{Value, json};
use std::sync::Arc;
use wiremock::MockServer;

use modelrelay::server::AppState;
use modelrelay::{Config, MemoryUsageSink, UsageSink};

/// Relay configuration with a single provider backed by the mock upstream
pub fn upstream_config(
    upstream: &MockServer,
    models: &[&str],
    timeout_secs: u64,
    failure_threshold: u32,
) -> Config {
    let model_list = models
        .iter()
        .map(|model| format!("      - {model}"))
        .collect::<Vec<_>>()
        .join("\n");
    let yaml = format!(
        r#"
gateway:
  failure_threshold: {failure_threshold}
providers:
  - name: acme
    base_url: {}/v1
    api_key: test-key
    timeout_secs: {timeout_secs}
    models:
{model_list}
"#,
        upstream.uri()
    );
    Config::from_yaml(&yaml).unwrap()
}

/// App state wired to an in-memory usage sink
pub fn relay_state(config: Config, sink: Arc<MemoryUsageSink>) -> web::Data<AppState> {
    web::Data::new(AppState::with_sink(config, sink as Arc<dyn UsageSink>).unwrap())
}

/// An OpenAI-shaped completion body. Carries a vendor-specific extra field
/// so tests can prove the relay returns bodies verbatim.
pub fn completion_body(model: &str, content: &str, prompt: u32, completion: u32) -> Value {
    json!({
        "id": "chatcmpl-test-1",
        "object": "chat.completion",
        "created": 1726000000,
        "model": model,
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": content},
            "finish_reason": "stop"
        }],
        "usage": {
            "prompt_tokens": prompt,
            "completion_tokens": completion,
            "total_tokens": prompt + completion
        },
        "acme_trace": {"shard": "eu-2"}
    })
}

/// Minimal chat completion request payload
pub fn chat_payload(model: &str, stream: bool) -> Value {
    json!({
        "model": model,
        "messages": [{"role": "user", "content": "hi"}],
        "stream": stream
    })
}
