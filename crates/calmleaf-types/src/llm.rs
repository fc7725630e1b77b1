//! LLM request/response types for Calmleaf.
//!
//! These types model the data shapes for provider interactions: chat
//! messages, non-streaming completions, streaming events, and the provider
//! error taxonomy.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Role of a message in an LLM conversation.
///
/// Also used for persisted conversation turns, where only `User` and
/// `Assistant` ever occur (`System` exists only inside assembled contexts).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageRole::System => write!(f, "system"),
            MessageRole::User => write!(f, "user"),
            MessageRole::Assistant => write!(f, "assistant"),
        }
    }
}

impl FromStr for MessageRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "system" => Ok(MessageRole::System),
            "user" => Ok(MessageRole::User),
            "assistant" => Ok(MessageRole::Assistant),
            other => Err(format!("invalid message role: '{other}'")),
        }
    }
}

/// A single message in an LLM conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
}

impl Message {
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// Response from a provider for a non-streaming completion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionResponse {
    /// Assistant content from the first choice.
    pub content: String,
    /// Reasoning trace, when the backend returns one. Never part of the
    /// assistant content; kept for telemetry only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning_content: Option<String>,
}

/// Events emitted during a streaming LLM response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// A fragment of assistant text content.
    TextDelta { text: String },

    /// A fragment of the reasoning trace. Discarded from final output.
    ReasoningDelta { text: String },

    /// The stream terminated naturally (`[DONE]` marker or closure).
    Done,
}

/// Errors from LLM provider operations.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("provider returned HTTP {status}: {body}")]
    Api { status: u16, body: String },

    #[error("deserialization error: {0}")]
    Deserialization(String),

    #[error("stream error: {0}")]
    Stream(String),
}

/// Which LLM backend a gateway instance is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    DeepSeek,
    Zhipu,
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderKind::DeepSeek => write!(f, "deepseek"),
            ProviderKind::Zhipu => write!(f, "zhipu"),
        }
    }
}

impl FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "deepseek" => Ok(ProviderKind::DeepSeek),
            "zhipu" => Ok(ProviderKind::Zhipu),
            other => Err(format!("unsupported LLM provider: '{other}'")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_role_roundtrip() {
        for role in [MessageRole::System, MessageRole::User, MessageRole::Assistant] {
            let s = role.to_string();
            let parsed: MessageRole = s.parse().unwrap();
            assert_eq!(role, parsed);
        }
    }

    #[test]
    fn test_message_role_serde() {
        let role = MessageRole::Assistant;
        let json = serde_json::to_string(&role).unwrap();
        assert_eq!(json, "\"assistant\"");
        let parsed: MessageRole = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, MessageRole::Assistant);
    }

    #[test]
    fn test_invalid_role_rejected() {
        let err = "tool".parse::<MessageRole>().unwrap_err();
        assert!(err.contains("tool"));
    }

    #[test]
    fn test_provider_kind_roundtrip() {
        for kind in [ProviderKind::DeepSeek, ProviderKind::Zhipu] {
            let s = kind.to_string();
            let parsed: ProviderKind = s.parse().unwrap();
            assert_eq!(kind, parsed);
        }
    }

    #[test]
    fn test_llm_error_display() {
        let err = LlmError::Api {
            status: 429,
            body: "rate limited".to_string(),
        };
        assert!(err.to_string().contains("429"));
        assert!(err.to_string().contains("rate limited"));
    }

    #[test]
    fn test_stream_event_serde() {
        let event = StreamEvent::TextDelta {
            text: "你好".to_string(),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("text_delta"));
        let parsed: StreamEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, event);
    }
}
