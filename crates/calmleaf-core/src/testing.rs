//! In-memory test doubles shared across core service tests.

use std::collections::HashMap;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, Mutex};

use chrono::Utc;
use futures_util::Stream;

use calmleaf_types::card::CardCacheEntry;
use calmleaf_types::chat::{ConversationTurn, MessageRole};
use calmleaf_types::error::RepositoryError;
use calmleaf_types::llm::{CompletionResponse, LlmError, Message, StreamEvent};

use crate::card::repository::CardCacheRepository;
use crate::chat::repository::TurnRepository;
use crate::llm::provider::LlmProvider;

/// Turn log backed by a Vec. `fail_writes` turns every save into a store
/// error for fatal-path tests.
#[derive(Clone)]
pub(crate) struct InMemoryTurnRepository {
    turns: Arc<Mutex<Vec<ConversationTurn>>>,
    next_id: Arc<AtomicI64>,
    fail_writes: Arc<AtomicBool>,
}

impl InMemoryTurnRepository {
    pub(crate) fn new() -> Self {
        Self {
            turns: Arc::new(Mutex::new(Vec::new())),
            next_id: Arc::new(AtomicI64::new(1)),
            fail_writes: Arc::new(AtomicBool::new(false)),
        }
    }

    pub(crate) fn failing_writes() -> Self {
        let repo = Self::new();
        repo.fail_writes.store(true, Ordering::SeqCst);
        repo
    }

    /// Test helper: append a turn directly.
    pub(crate) async fn push_turn(
        &self,
        user_id: &str,
        role: MessageRole,
        content: &str,
    ) -> ConversationTurn {
        self.save_turn(user_id, role, content).await.unwrap()
    }

    /// Test helper: all turns for a user in insertion order.
    pub(crate) fn turns_for(&self, user_id: &str) -> Vec<ConversationTurn> {
        self.turns
            .lock()
            .unwrap()
            .iter()
            .filter(|t| t.user_id == user_id)
            .cloned()
            .collect()
    }
}

impl TurnRepository for InMemoryTurnRepository {
    async fn save_turn(
        &self,
        user_id: &str,
        role: MessageRole,
        content: &str,
    ) -> Result<ConversationTurn, RepositoryError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(RepositoryError::Query("write failed".to_string()));
        }
        let turn = ConversationTurn {
            id: self.next_id.fetch_add(1, Ordering::SeqCst),
            user_id: user_id.to_string(),
            role,
            content: content.to_string(),
            created_at: Utc::now(),
        };
        self.turns.lock().unwrap().push(turn.clone());
        Ok(turn)
    }

    async fn recent_turns(
        &self,
        user_id: &str,
        limit: i64,
    ) -> Result<Vec<ConversationTurn>, RepositoryError> {
        let mut turns: Vec<ConversationTurn> = self
            .turns
            .lock()
            .unwrap()
            .iter()
            .filter(|t| t.user_id == user_id)
            .cloned()
            .collect();
        // Newest first, ties broken by id, like the SQLite implementation.
        turns.sort_by(|a, b| {
            (b.created_at, b.id).cmp(&(a.created_at, a.id))
        });
        turns.truncate(limit.max(0) as usize);
        Ok(turns)
    }
}

/// Card cache backed by a HashMap.
#[derive(Clone)]
pub(crate) struct InMemoryCardCache {
    entries: Arc<Mutex<HashMap<String, CardCacheEntry>>>,
}

impl InMemoryCardCache {
    pub(crate) fn new() -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub(crate) async fn seed(&self, user_id: &str, card_json: &str) {
        self.upsert_card(user_id, card_json).await.unwrap();
    }

    pub(crate) async fn stored(&self, user_id: &str) -> Option<String> {
        self.entries
            .lock()
            .unwrap()
            .get(user_id)
            .map(|e| e.card_json.clone())
    }
}

impl CardCacheRepository for InMemoryCardCache {
    async fn upsert_card(&self, user_id: &str, card_json: &str) -> Result<(), RepositoryError> {
        self.entries.lock().unwrap().insert(
            user_id.to_string(),
            CardCacheEntry {
                user_id: user_id.to_string(),
                card_json: card_json.to_string(),
                updated_at: Utc::now(),
            },
        );
        Ok(())
    }

    async fn get_card(&self, user_id: &str) -> Result<Option<CardCacheEntry>, RepositoryError> {
        Ok(self.entries.lock().unwrap().get(user_id).cloned())
    }
}

/// Provider double with a scripted completion and/or stream.
///
/// Records the last request so tests can assert on assembled contexts and
/// the thinking flag.
pub(crate) struct ScriptedProvider {
    completion: Option<String>,
    stream_events: Mutex<Option<Vec<Result<StreamEvent, LlmError>>>>,
    fail_message: Option<String>,
    last_request: Arc<Mutex<Option<(Vec<Message>, bool)>>>,
}

impl ScriptedProvider {
    fn empty() -> Self {
        Self {
            completion: None,
            stream_events: Mutex::new(None),
            fail_message: None,
            last_request: Arc::new(Mutex::new(None)),
        }
    }

    /// `complete` returns this content.
    pub(crate) fn completing(content: &str) -> Self {
        Self {
            completion: Some(content.to_string()),
            ..Self::empty()
        }
    }

    /// `complete` always fails with a transport error carrying this
    /// error's message.
    pub(crate) fn failing(err: LlmError) -> Self {
        Self {
            fail_message: Some(err.to_string()),
            ..Self::empty()
        }
    }

    /// `stream` yields these events (consumed on first call).
    pub(crate) fn streaming(events: Vec<Result<StreamEvent, LlmError>>) -> Self {
        Self {
            stream_events: Mutex::new(Some(events)),
            ..Self::empty()
        }
    }

    /// Also script the non-streaming completion (e.g. the card call that
    /// follows a streamed turn).
    pub(crate) fn with_completion(mut self, content: &str) -> Self {
        self.completion = Some(content.to_string());
        self
    }

    pub(crate) fn request_recorder(&self) -> Arc<Mutex<Option<(Vec<Message>, bool)>>> {
        Arc::clone(&self.last_request)
    }
}

impl LlmProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(
        &self,
        messages: &[Message],
        thinking_enabled: bool,
    ) -> Result<CompletionResponse, LlmError> {
        *self.last_request.lock().unwrap() = Some((messages.to_vec(), thinking_enabled));
        if let Some(message) = &self.fail_message {
            return Err(LlmError::Transport(message.clone()));
        }
        Ok(CompletionResponse {
            content: self.completion.clone().unwrap_or_default(),
            reasoning_content: None,
        })
    }

    fn stream(
        &self,
        messages: Vec<Message>,
        thinking_enabled: bool,
    ) -> Pin<Box<dyn Stream<Item = Result<StreamEvent, LlmError>> + Send + 'static>> {
        *self.last_request.lock().unwrap() = Some((messages, thinking_enabled));
        let events = self
            .stream_events
            .lock()
            .unwrap()
            .take()
            .unwrap_or_default();
        Box::pin(futures_util::stream::iter(events))
    }
}
