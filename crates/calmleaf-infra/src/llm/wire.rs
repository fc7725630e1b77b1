//! Wire types for the OpenAI-style chat completions protocol.
//!
//! Request: ordered `{role, content}` pairs plus model, token cap,
//! optional temperature, and a streaming flag. Non-streaming responses
//! expose `choices[0].message.content`; streaming deltas expose
//! `choices[0].delta.content` and optionally `.reasoning_content`.

use serde::{Deserialize, Serialize};

use calmleaf_types::llm::Message;

/// Request body for `/chat/completions`.
#[derive(Debug, Serialize)]
pub(crate) struct ChatCompletionPayload {
    pub model: String,
    pub messages: Vec<WireMessage>,
    pub max_tokens: u32,
    /// Omitted in extended-reasoning mode.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    pub stream: bool,
    /// Zhipu reasoning toggle; absent for backends that select a
    /// reasoning model variant instead.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thinking: Option<ThinkingConfig>,
}

#[derive(Debug, Serialize)]
pub(crate) struct WireMessage {
    pub role: String,
    pub content: String,
}

impl From<&Message> for WireMessage {
    fn from(message: &Message) -> Self {
        Self {
            role: message.role.to_string(),
            content: message.content.clone(),
        }
    }
}

pub(crate) fn wire_messages(messages: &[Message]) -> Vec<WireMessage> {
    messages.iter().map(WireMessage::from).collect()
}

#[derive(Debug, Serialize)]
pub(crate) struct ThinkingConfig {
    pub r#type: &'static str,
}

impl ThinkingConfig {
    pub(crate) fn enabled() -> Self {
        Self { r#type: "enabled" }
    }
}

/// Non-streaming response body.
#[derive(Debug, Deserialize)]
pub(crate) struct ChatCompletionResponse {
    #[serde(default)]
    pub choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CompletionChoice {
    pub message: ResponseMessage,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ResponseMessage {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub reasoning_content: Option<String>,
}

/// One decoded `data:` event of a streaming response.
#[derive(Debug, Deserialize)]
pub(crate) struct StreamChunk {
    #[serde(default)]
    pub choices: Vec<StreamChoice>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StreamChoice {
    #[serde(default)]
    pub delta: StreamDelta,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct StreamDelta {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub reasoning_content: Option<String>,
}
