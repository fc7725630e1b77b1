//! Chat turn orchestration.
//!
//! `ChatService` drives a single turn end-to-end. Per request the state
//! machine is `Received -> Persisted(user) -> Streaming -> Completed | Failed`:
//! persist the user turn (fatal on store error), assemble context, open a
//! provider stream, relay fragments in production order while accumulating,
//! then persist the assistant turn and submit a detached card regeneration.
//! A provider failure mid-stream is relayed in-band as a literal
//! `[ERROR] <message>` fragment; nothing is persisted for that turn.

use std::sync::Arc;

use futures_util::{Stream, StreamExt};
use tracing::{error, trace};

use calmleaf_types::chat::ChatMode;
use calmleaf_types::error::{ChatError, RepositoryError};
use calmleaf_types::llm::{Message, MessageRole, StreamEvent};

use crate::card::repository::CardCacheRepository;
use crate::card::service::CardService;
use crate::chat::context::ContextAssembler;
use crate::chat::repository::TurnRepository;
use crate::chat::sanitize::strip_suggestion_markers;
use crate::llm::box_provider::BoxLlmProvider;

/// How many recent turns feed the context window by default.
pub const DEFAULT_HISTORY_LIMIT: i64 = 20;

/// One incoming chat turn.
#[derive(Debug, Clone)]
pub struct ChatTurnRequest {
    pub user_id: String,
    pub content: String,
    pub mode: ChatMode,
    pub thinking_enabled: bool,
}

/// Orchestrates chat turns: persistence, context assembly, streaming
/// relay, and card regeneration scheduling.
pub struct ChatService<T: TurnRepository, C: CardCacheRepository> {
    turns: T,
    provider: Arc<BoxLlmProvider>,
    assembler: ContextAssembler,
    cards: Arc<CardService<T, C>>,
    history_limit: i64,
}

impl<T, C> ChatService<T, C>
where
    T: TurnRepository + 'static,
    C: CardCacheRepository + 'static,
{
    pub fn new(
        turns: T,
        provider: Arc<BoxLlmProvider>,
        assembler: ContextAssembler,
        cards: Arc<CardService<T, C>>,
        history_limit: i64,
    ) -> Self {
        Self {
            turns,
            provider,
            assembler,
            cards,
            history_limit,
        }
    }

    /// Persist the user turn and assemble the provider message list.
    ///
    /// The user turn is saved before the history fetch, so the assembler
    /// excludes it from the window by id.
    async fn prepare(&self, request: &ChatTurnRequest) -> Result<Vec<Message>, RepositoryError> {
        let user_turn = self
            .turns
            .save_turn(&request.user_id, MessageRole::User, &request.content)
            .await?;

        let history = self
            .turns
            .recent_turns(&request.user_id, self.history_limit)
            .await?;

        Ok(self.assembler.assemble(
            request.mode,
            &request.content,
            &history,
            Some(user_turn.id),
        ))
    }

    /// Drive a streaming turn.
    ///
    /// Returns the relay stream of raw text fragments. A store failure
    /// while persisting the incoming user turn is fatal and surfaces here;
    /// everything after that point is reported in-band on the stream.
    /// Dropping the stream before natural completion (caller disconnect)
    /// discards the accumulated text: no partial assistant turn is saved.
    pub async fn stream_turn(
        self: Arc<Self>,
        request: ChatTurnRequest,
    ) -> Result<impl Stream<Item = String> + Send + 'static, RepositoryError> {
        let messages = self.prepare(&request).await?;
        let llm_stream = self.provider.stream(messages, request.thinking_enabled);

        let service = self;
        Ok(async_stream::stream! {
            let mut full_text = String::new();
            let mut failed = false;
            let mut llm_stream = std::pin::pin!(llm_stream);

            while let Some(event) = llm_stream.next().await {
                match event {
                    Ok(StreamEvent::TextDelta { text }) => {
                        full_text.push_str(&text);
                        yield text;
                    }
                    Ok(StreamEvent::ReasoningDelta { text }) => {
                        // Telemetry only; never mixed into the reply.
                        trace!(fragment_len = text.len(), "discarding reasoning fragment");
                    }
                    Ok(StreamEvent::Done) => break,
                    Err(e) => {
                        error!(user_id = %request.user_id, error = %e, "provider stream failed");
                        yield format!("[ERROR] {e}");
                        failed = true;
                        break;
                    }
                }
            }

            // A turn with no assistant content is never persisted and
            // never schedules a card regeneration.
            if !failed && !full_text.is_empty() {
                service.finish_turn(&request.user_id, &full_text).await;
            }
        })
    }

    /// Drive a blocking turn: same pipeline, full response at once.
    pub async fn complete_turn(&self, request: ChatTurnRequest) -> Result<String, ChatError> {
        let messages = self.prepare(&request).await?;
        let response = self
            .provider
            .complete(&messages, request.thinking_enabled)
            .await?;

        if response.content.is_empty() {
            return Err(ChatError::EmptyResponse);
        }

        let content = strip_suggestion_markers(&response.content);
        self.turns
            .save_turn(&request.user_id, MessageRole::Assistant, &content)
            .await?;
        Arc::clone(&self.cards).spawn_regeneration(request.user_id);
        Ok(content)
    }

    /// Persist the accumulated assistant reply and schedule regeneration.
    ///
    /// Runs after the relay finished; the response has already been
    /// delivered, so a store failure here is only logged.
    async fn finish_turn(&self, user_id: &str, full_text: &str) {
        let content = strip_suggestion_markers(full_text);
        match self
            .turns
            .save_turn(user_id, MessageRole::Assistant, &content)
            .await
        {
            Ok(_) => Arc::clone(&self.cards).spawn_regeneration(user_id.to_string()),
            Err(e) => error!(user_id, error = %e, "failed to persist assistant turn"),
        }
    }
}
