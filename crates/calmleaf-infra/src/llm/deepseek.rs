//! DeepSeekProvider -- concrete [`LlmProvider`] implementation for DeepSeek.
//!
//! Speaks the OpenAI-style chat completions protocol. Extended reasoning
//! is selected by swapping to the reasoner model variant; the reasoner
//! takes no temperature parameter.

use std::pin::Pin;

use futures_util::Stream;
use secrecy::SecretString;

use calmleaf_core::llm::provider::LlmProvider;
use calmleaf_types::llm::{CompletionResponse, LlmError, Message, StreamEvent};

use super::client::{http_client, open_stream, post_completion};
use super::wire::{wire_messages, ChatCompletionPayload};

/// Configuration for a [`DeepSeekProvider`].
pub struct DeepSeekConfig {
    pub api_key: SecretString,
    pub base_url: String,
    /// Model for normal turns (e.g., "deepseek-chat").
    pub chat_model: String,
    /// Model used when thinking is requested (e.g., "deepseek-reasoner").
    pub reasoner_model: String,
    pub max_tokens: u32,
    pub temperature: f64,
}

/// DeepSeek LLM provider.
///
/// # API Key Security
///
/// Does NOT derive Debug: the key lives in a [`SecretString`] and is only
/// exposed while building request headers.
pub struct DeepSeekProvider {
    client: reqwest::Client,
    api_key: SecretString,
    base_url: String,
    chat_model: String,
    reasoner_model: String,
    max_tokens: u32,
    temperature: f64,
}

impl DeepSeekProvider {
    pub fn new(config: DeepSeekConfig) -> Self {
        Self {
            client: http_client(),
            api_key: config.api_key,
            base_url: config.base_url,
            chat_model: config.chat_model,
            reasoner_model: config.reasoner_model,
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
        let model = if thinking_enabled {
            self.reasoner_model.clone()
        } else {
            self.chat_model.clone()
        };
        ChatCompletionPayload {
            model,
            messages: wire_messages(messages),
            max_tokens: self.max_tokens,
            temperature: (!thinking_enabled).then_some(self.temperature),
            stream,
            thinking: None,
        }
    }
}

impl LlmProvider for DeepSeekProvider {
    fn name(&self) -> &str {
        "deepseek"
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
