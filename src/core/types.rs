//! OpenAI-compatible wire types
//!
//! Only the fields the relay itself reads are typed; everything else rides
//! along in flattened maps so request and response bodies survive the trip
//! to the upstream provider unchanged.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Chat completion request (OpenAI compatible)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatCompletionRequest {
    /// Model the caller asked for; routing key
    pub model: String,
    /// Conversation messages
    pub messages: Vec<ChatMessage>,
    /// Whether the caller wants an SSE stream
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream: Option<bool>,
    /// Everything else (sampling parameters, tools, stream_options, ...)
    /// passes through to the provider untouched
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

impl ChatCompletionRequest {
    pub fn is_stream(&self) -> bool {
        self.stream.unwrap_or(false)
    }
}

/// Chat message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Message role (system, user, assistant, tool)
    pub role: String,
    /// Message content; kept as raw JSON because content can be a string or
    /// an array of multimodal parts
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<Value>,
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

impl ChatMessage {
    /// Plain-text user message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: Some(Value::String(content.into())),
            extra: HashMap::new(),
        }
    }
}

/// Token usage reported by a provider.
///
/// All fields are optional on the wire: some providers omit the breakdown,
/// some omit usage entirely on streamed responses.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_tokens: Option<u32>,
}

impl TokenUsage {
    /// Prompt-side token count, zero when unreported
    pub fn tokens_in(&self) -> u32 {
        self.prompt_tokens.unwrap_or(0)
    }

    /// Completion-side token count, zero when unreported
    pub fn tokens_out(&self) -> u32 {
        self.completion_tokens.unwrap_or(0)
    }

    /// Total billed tokens: the prompt/completion sum when a breakdown is
    /// present, the provider's own total when only that is set, zero when
    /// nothing was reported
    pub fn effective_total(&self) -> u32 {
        match (self.prompt_tokens, self.completion_tokens) {
            (None, None) => self.total_tokens.unwrap_or(0),
            // Both counts are provider-controlled; their sum can exceed u32
            (prompt, completion) => prompt.unwrap_or(0).saturating_add(completion.unwrap_or(0)),
        }
    }

    /// Extract the `usage` object from a response body, if present
    pub fn from_response(body: &Value) -> Self {
        body.get("usage")
            .and_then(|usage| serde_json::from_value(usage.clone()).ok())
            .unwrap_or_default()
    }
}

/// Entry in the `/v1/models` listing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelInfo {
    /// Model identifier
    pub id: String,
    /// Object type (always "model")
    pub object: String,
    /// Unix timestamp of creation
    pub created: i64,
    /// Provider that serves this model
    pub owned_by: String,
}

impl ModelInfo {
    pub fn new(id: impl Into<String>, owned_by: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            object: "model".to_string(),
            created: chrono::Utc::now().timestamp(),
            owned_by: owned_by.into(),
        }
    }
}

/// Response shape of `/v1/models`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelList {
    /// Object type (always "list")
    pub object: String,
    /// Available models
    pub data: Vec<ModelInfo>,
}

impl ModelList {
    pub fn new(data: Vec<ModelInfo>) -> Self {
        Self {
            object: "list".to_string(),
            data,
        }
    }
}
