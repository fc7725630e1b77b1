//! LlmProvider trait definition.
//!
//! This is the core abstraction that all LLM backends implement. Uses
//! RPITIT for `complete` and `Pin<Box<dyn Stream>>` for `stream` (streams
//! need to be object-safe for the BoxLlmProvider wrapper).

use std::pin::Pin;

use futures_util::Stream;

use calmleaf_types::llm::{CompletionResponse, LlmError, Message, StreamEvent};

/// Trait for LLM provider backends (DeepSeek, Zhipu, ...).
///
/// One instance is bound to one backend and one model configuration for
/// its lifetime; there is no ambient provider selection. The
/// `thinking_enabled` flag requests extended-reasoning mode -- backends map
/// it to a reasoning model variant or a provider-specific request toggle.
///
/// Implementations live in calmleaf-infra (e.g., `DeepSeekProvider`).
pub trait LlmProvider: Send + Sync {
    /// Human-readable backend name (e.g., "deepseek", "zhipu").
    fn name(&self) -> &str;

    /// Send a completion request and receive the full response.
    fn complete(
        &self,
        messages: &[Message],
        thinking_enabled: bool,
    ) -> impl std::future::Future<Output = Result<CompletionResponse, LlmError>> + Send;

    /// Open a streaming completion. The stream is finite and not
    /// restartable: it yields text/reasoning deltas in production order,
    /// ends with [`StreamEvent::Done`] on natural termination, and on
    /// transport failure yields exactly one `Err` item and then ends.
    ///
    /// Returns a boxed stream (not RPITIT) because streams need to be
    /// object-safe for the `BoxLlmProvider` wrapper.
    fn stream(
        &self,
        messages: Vec<Message>,
        thinking_enabled: bool,
    ) -> Pin<Box<dyn Stream<Item = Result<StreamEvent, LlmError>> + Send + 'static>>;
}
