//! BoxLlmProvider -- object-safe dynamic dispatch wrapper for LlmProvider.
//!
//! 1. Define an object-safe `LlmProviderDyn` trait with boxed futures
//! 2. Blanket-impl `LlmProviderDyn` for all `T: LlmProvider`
//! 3. `BoxLlmProvider` wraps `Box<dyn LlmProviderDyn>` and delegates

use std::future::Future;
use std::pin::Pin;

use futures_util::Stream;

use calmleaf_types::llm::{CompletionResponse, LlmError, Message, StreamEvent};

use super::provider::LlmProvider;

/// Object-safe version of [`LlmProvider`] with boxed futures.
///
/// This trait exists solely to enable dynamic dispatch (`dyn LlmProviderDyn`).
/// A blanket implementation is provided for all types implementing `LlmProvider`.
pub trait LlmProviderDyn: Send + Sync {
    fn name(&self) -> &str;

    fn complete_boxed<'a>(
        &'a self,
        messages: &'a [Message],
        thinking_enabled: bool,
    ) -> Pin<Box<dyn Future<Output = Result<CompletionResponse, LlmError>> + Send + 'a>>;

    fn stream_boxed(
        &self,
        messages: Vec<Message>,
        thinking_enabled: bool,
    ) -> Pin<Box<dyn Stream<Item = Result<StreamEvent, LlmError>> + Send + 'static>>;
}

/// Blanket implementation: any `LlmProvider` automatically implements `LlmProviderDyn`.
impl<T: LlmProvider> LlmProviderDyn for T {
    fn name(&self) -> &str {
        LlmProvider::name(self)
    }

    fn complete_boxed<'a>(
        &'a self,
        messages: &'a [Message],
        thinking_enabled: bool,
    ) -> Pin<Box<dyn Future<Output = Result<CompletionResponse, LlmError>> + Send + 'a>> {
        Box::pin(self.complete(messages, thinking_enabled))
    }

    fn stream_boxed(
        &self,
        messages: Vec<Message>,
        thinking_enabled: bool,
    ) -> Pin<Box<dyn Stream<Item = Result<StreamEvent, LlmError>> + Send + 'static>> {
        self.stream(messages, thinking_enabled)
    }
}

/// Type-erased LLM provider for runtime backend selection.
///
/// Since `LlmProvider` uses RPITIT, it cannot be used as a trait object
/// directly. `BoxLlmProvider` provides equivalent methods that delegate to
/// the inner `LlmProviderDyn` trait object.
pub struct BoxLlmProvider {
    inner: Box<dyn LlmProviderDyn + Send + Sync>,
}

impl BoxLlmProvider {
    /// Wrap a concrete `LlmProvider` in a type-erased box.
    pub fn new<T: LlmProvider + 'static>(provider: T) -> Self {
        Self {
            inner: Box::new(provider),
        }
    }

    /// Human-readable backend name.
    pub fn name(&self) -> &str {
        self.inner.name()
    }

    /// Send a completion request and receive the full response.
    pub async fn complete(
        &self,
        messages: &[Message],
        thinking_enabled: bool,
    ) -> Result<CompletionResponse, LlmError> {
        self.inner.complete_boxed(messages, thinking_enabled).await
    }

    /// Open a streaming completion.
    pub fn stream(
        &self,
        messages: Vec<Message>,
        thinking_enabled: bool,
    ) -> Pin<Box<dyn Stream<Item = Result<StreamEvent, LlmError>> + Send + 'static>> {
        self.inner.stream_boxed(messages, thinking_enabled)
    }
}
