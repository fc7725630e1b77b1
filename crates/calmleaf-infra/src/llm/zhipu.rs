//! ZhipuProvider -- concrete [`LlmProvider`] implementation for Zhipu GLM.
//!
//! Speaks the OpenAI-style chat completions protocol. Extended reasoning
//! is requested with the `"thinking": {"type": "enabled"}` payload field
//! on the same model.

use std::pin::Pin;

use futures_util::Stream;
use secrecy::SecretString;

use calmleaf_core::llm::provider::LlmProvider;
use calmleaf_types::llm::{CompletionResponse, LlmError, Message, StreamEvent};

use super::client::{http_client, open_stream, post_completion};
use super::wire::{wire_messages, ChatCompletionPayload, ThinkingConfig};

/// Configuration for a [`ZhipuProvider`].
pub struct ZhipuConfig {
    pub api_key: SecretString,
    pub base_url: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f64,
}

/// Zhipu GLM LLM provider.
///
/// # API Key Security
///
/// Does NOT derive Debug: the key lives in a [`SecretString`] and is only
/// exposed while building request headers.
pub struct ZhipuProvider {
    client: reqwest::Client,
    api_key: SecretString,
    base_url: String,
    model: String,
    max_tokens: u32,
    temperature: f64,
}

impl ZhipuProvider {
    pub fn new(config: ZhipuConfig) -> Self {
        Self {
            client: http_client(),
            api_key: config.api_key,
            base_url: config.base_url,
            model: config.model,
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        }
    }

    fn url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    fn payload(
        &self,
        messages: &[Message],
        thinking_enabled: bool,
        stream: bool,
    ) -> ChatCompletionPayload {
        ChatCompletionPayload {
            model: self.model.clone(),
            messages: wire_messages(messages),
            max_tokens: self.max_tokens,
            temperature: (!thinking_enabled).then_some(self.temperature),
            stream,
            thinking: thinking_enabled.then(ThinkingConfig::enabled),
        }
    }
}

impl LlmProvider for ZhipuProvider {
    fn name(&self) -> &str {
        "zhipu"
    }

    async fn complete(
        &self,
        messages: &[Message],
        thinking_enabled: bool,
    ) -> Result<CompletionResponse, LlmError> {
        let payload = self.payload(messages, thinking_enabled, false);
        post_completion(&self.client, &self.url(), &self.api_key, &payload).await
    }

    fn stream(
        &self,
        messages: Vec<Message>,
        thinking_enabled: bool,
    ) -> Pin<Box<dyn Stream<Item = Result<StreamEvent, LlmError>> + Send + 'static>> {
        let payload = self.payload(&messages, thinking_enabled, true);
        open_stream(
            self.client.clone(),
            self.url(),
            self.api_key.clone(),
            payload,
        )
    }
}
