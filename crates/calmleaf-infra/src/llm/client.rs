//! Shared HTTP plumbing for chat completions backends.
//!
//! Both providers authenticate with a bearer token, POST JSON to a
//! `/chat/completions` endpoint, and map non-2xx statuses to typed
//! errors. The API key is wrapped in [`secrecy::SecretString`] and only
//! exposed while building request headers.

use std::pin::Pin;
use std::time::Duration;

use futures_util::{Stream, StreamExt};
use secrecy::{ExposeSecret, SecretString};

use calmleaf_types::llm::{CompletionResponse, LlmError, StreamEvent};

use super::sse::decode_sse;
use super::wire::{ChatCompletionPayload, ChatCompletionResponse};

/// Build the shared reqwest client. Long timeout: reasoning-model
/// generations can run for minutes.
pub(crate) fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(300))
        .build()
        .expect("failed to create reqwest client")
}

/// POST a non-streaming completion and decode the first choice.
pub(crate) async fn post_completion(
    client: &reqwest::Client,
    url: &str,
    api_key: &SecretString,
    payload: &ChatCompletionPayload,
) -> Result<CompletionResponse, LlmError> {
    let response = client
        .post(url)
        .bearer_auth(api_key.expose_secret())
        .json(payload)
        .send()
        .await
        .map_err(|e| LlmError::Transport(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(LlmError::Api {
            status: status.as_u16(),
            body,
        });
    }

    let decoded: ChatCompletionResponse = response
        .json()
        .await
        .map_err(|e| LlmError::Deserialization(format!("failed to parse response: {e}")))?;

    let choice = decoded.choices.into_iter().next();
    Ok(CompletionResponse {
        content: choice
            .as_ref()
            .and_then(|c| c.message.content.clone())
            .unwrap_or_default(),
        reasoning_content: choice.and_then(|c| c.message.reasoning_content),
    })
}

/// Open a streaming completion.
///
/// Connection and HTTP-status failures surface as the first (and only)
/// `Err` item of the returned stream; afterwards decoding is delegated to
/// [`decode_sse`].
pub(crate) fn open_stream(
    client: reqwest::Client,
    url: String,
    api_key: SecretString,
    payload: ChatCompletionPayload,
) -> Pin<Box<dyn Stream<Item = Result<StreamEvent, LlmError>> + Send + 'static>> {
    Box::pin(async_stream::try_stream! {
        let response = client
            .post(&url)
            .bearer_auth(api_key.expose_secret())
            .json(&payload)
            .send()
            .await
            .map_err(|e| LlmError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            Err(LlmError::Api {
                status: status.as_u16(),
                body,
            })?;
        } else {
            let inner = decode_sse(response.bytes_stream());
            let mut inner = std::pin::pin!(inner);
            while let Some(event) = inner.next().await {
                let event = event?;
                yield event;
            }
        }
    })
}
