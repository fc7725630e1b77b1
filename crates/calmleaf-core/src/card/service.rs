//! Card regeneration task and cache-aside retrieval.
//!
//! `CardService` reads recent conversation history, asks the provider for
//! a structured-JSON summary, validates it, and replaces the per-user
//! cache entry. A failed regeneration never touches the existing entry
//! (stale-but-valid policy).

use std::sync::Arc;

use calmleaf_types::error::CardError;
use calmleaf_types::llm::{Message, MessageRole};
use tracing::{debug, info, warn};

use crate::card::repository::CardCacheRepository;
use crate::chat::repository::TurnRepository;
use crate::llm::box_provider::BoxLlmProvider;

/// Prompt for the card completion. `{conversation_content}` is substituted
/// by literal text replacement, never a format operation, so brace
/// characters inside user content pass through untouched.
const CARD_PROMPT_TEMPLATE: &str = r#"请根据以下对话内容，为用户生成一张「安心卡片」。

对话内容：
{conversation_content}

严格输出一个 JSON 对象（不要输出任何其他文字，不要使用 Markdown 代码块），字段如下：
- "mood_tag": 概括用户当前情绪的词语（如：焦虑）
- "encouragement": 一段针对用户处境的鼓励话语
- "suggestions": 2 到 4 条具体可行的建议组成的数组
- "healing_quote": 一句治愈系短句
- "professional_analysis": 对用户情绪状态的简短专业分析"#;

/// How many recent turns feed a regeneration by default.
pub const DEFAULT_CARD_HISTORY_LIMIT: i64 = 50;

/// Regenerates and serves the per-user card artifact.
pub struct CardService<T: TurnRepository, C: CardCacheRepository> {
    turns: T,
    cache: C,
    provider: Arc<BoxLlmProvider>,
    history_limit: i64,
}

impl<T, C> CardService<T, C>
where
    T: TurnRepository + 'static,
    C: CardCacheRepository + 'static,
{
    pub fn new(turns: T, cache: C, provider: Arc<BoxLlmProvider>, history_limit: i64) -> Self {
        Self {
            turns,
            cache,
            provider,
            history_limit,
        }
    }

    /// Recompute the card from recent history and replace the cache entry.
    ///
    /// Returns `Ok(None)` when the user has no history (nothing to
    /// summarize -- not an error). On any failure the previous cache entry
    /// is left untouched.
    #[tracing::instrument(name = "regenerate_card", skip(self))]
    pub async fn regenerate(&self, user_id: &str) -> Result<Option<serde_json::Value>, CardError> {
        let history = self.turns.recent_turns(user_id, self.history_limit).await?;
        if history.is_empty() {
            return Ok(None);
        }

        // Oldest first, one "role: content" line per turn.
        let conversation_text = history
            .iter()
            .rev()
            .map(|turn| format!("{}: {}", turn.role, turn.content))
            .collect::<Vec<_>>()
            .join("\n");

        let prompt = CARD_PROMPT_TEMPLATE.replace("{conversation_content}", &conversation_text);
        let messages = vec![Message::new(MessageRole::User, prompt)];

        // Reasoning mode is disabled for card generation to keep the
        // output format strict.
        let response = self.provider.complete(&messages, false).await?;
        if response.content.trim().is_empty() {
            return Err(CardError::EmptyResponse);
        }

        let cleaned = strip_code_fences(&response.content);
        let value: serde_json::Value =
            serde_json::from_str(&cleaned).map_err(|e| CardError::Parse {
                detail: e.to_string(),
            })?;
        if !value.is_object() {
            return Err(CardError::Parse {
                detail: "card output is not a JSON object".to_string(),
            });
        }

        self.cache.upsert_card(user_id, &cleaned).await?;
        info!(user_id, "card cache updated");
        Ok(Some(value))
    }

    /// Cache-aside read with synchronous fallback regeneration.
    ///
    /// A present, parsing entry is returned immediately without touching
    /// the provider. An absent or corrupt entry triggers a synchronous
    /// regeneration; if that also fails the error propagates -- never a
    /// stale or partial object.
    pub async fn get_card(&self, user_id: &str) -> Result<serde_json::Value, CardError> {
        if let Some(entry) = self.cache.get_card(user_id).await? {
            match serde_json::from_str::<serde_json::Value>(&entry.card_json) {
                Ok(value) if value.is_object() => return Ok(value),
                Ok(_) | Err(_) => {
                    warn!(user_id, "cached card is corrupt, regenerating");
                }
            }
        }

        match self.regenerate(user_id).await? {
            Some(value) => Ok(value),
            None => Err(CardError::NoHistory),
        }
    }

    /// Submit a detached regeneration for this user.
    ///
    /// The task runs independently of, and may outlive, the request that
    /// triggered it; its outcome is confined to logs.
    pub fn spawn_regeneration(self: Arc<Self>, user_id: String) {
        tokio::spawn(async move {
            match self.regenerate(&user_id).await {
                Ok(Some(_)) => debug!(user_id, "background card regeneration finished"),
                Ok(None) => debug!(user_id, "no history to summarize, card regeneration skipped"),
                Err(e) => warn!(user_id, error = %e, "background card regeneration failed"),
            }
        });
    }
}

/// Remove surrounding markdown code-fence markers and trim.
///
/// Providers occasionally wrap JSON in ```` ```json ```` fences despite
/// instructions; literal removal matches the fenced and unfenced cases
/// alike.
pub fn strip_code_fences(content: &str) -> String {
    content.replace("```json", "").replace("```", "").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{InMemoryCardCache, InMemoryTurnRepository, ScriptedProvider};
    use calmleaf_types::llm::LlmError;

    fn service_with(
        provider: ScriptedProvider,
        turns: InMemoryTurnRepository,
        cache: InMemoryCardCache,
    ) -> CardService<InMemoryTurnRepository, InMemoryCardCache> {
        CardService::new(
            turns,
            cache,
            Arc::new(BoxLlmProvider::new(provider)),
            DEFAULT_CARD_HISTORY_LIMIT,
        )
    }

    async fn seed_history(turns: &InMemoryTurnRepository) {
        turns
            .push_turn("u-1", MessageRole::User, "我很焦虑")
            .await;
        turns
            .push_turn("u-1", MessageRole::Assistant, "深呼吸试试")
            .await;
    }

    #[test]
    fn test_strip_code_fences_with_json_tag() {
        let fenced = "```json\n{\"mood_tag\": \"焦虑\"}\n```";
        assert_eq!(strip_code_fences(fenced), "{\"mood_tag\": \"焦虑\"}");
    }

    #[test]
    fn test_strip_code_fences_bare() {
        let fenced = "```\n{\"a\": 1}\n```";
        assert_eq!(strip_code_fences(fenced), "{\"a\": 1}");
    }

    #[test]
    fn test_strip_code_fences_unfenced_untouched() {
        assert_eq!(strip_code_fences("{\"a\": 1}"), "{\"a\": 1}");
    }

    #[test]
    fn test_prompt_substitution_is_literal() {
        // Braces inside the conversation must survive the substitution.
        let rendered =
            CARD_PROMPT_TEMPLATE.replace("{conversation_content}", "user: {braces stay intact}");
        assert!(rendered.contains("user: {braces stay intact}"));
        assert!(!rendered.contains("{conversation_content}"));
    }

    #[tokio::test]
    async fn test_regenerate_caches_fenced_json() {
        let turns = InMemoryTurnRepository::new();
        seed_history(&turns).await;
        let cache = InMemoryCardCache::new();
        let provider = ScriptedProvider::completing(
            "```json\n{\"mood_tag\": \"焦虑\", \"suggestions\": [\"散步\"]}\n```",
        );
        let service = service_with(provider, turns, cache.clone());

        let value = service.regenerate("u-1").await.unwrap().unwrap();
        assert_eq!(value["mood_tag"], "焦虑");

        // The cache holds the stripped text, not the fenced original.
        let stored = cache.stored("u-1").await.unwrap();
        assert!(!stored.contains("```"));
        let parsed: serde_json::Value = serde_json::from_str(&stored).unwrap();
        assert!(parsed.is_object());
    }

    #[tokio::test]
    async fn test_regenerate_empty_history_is_noop() {
        let turns = InMemoryTurnRepository::new();
        let cache = InMemoryCardCache::new();
        let provider = ScriptedProvider::completing("{\"mood_tag\": \"平静\"}");
        let service = service_with(provider, turns, cache.clone());

        let outcome = service.regenerate("u-1").await.unwrap();
        assert!(outcome.is_none());
        assert!(cache.stored("u-1").await.is_none());
    }

    #[tokio::test]
    async fn test_parse_failure_keeps_previous_cache() {
        let turns = InMemoryTurnRepository::new();
        seed_history(&turns).await;
        let cache = InMemoryCardCache::new();
        cache.seed("u-1", "{\"mood_tag\": \"旧卡片\"}").await;
        let provider = ScriptedProvider::completing("抱歉，我无法生成卡片。");
        let service = service_with(provider, turns, cache.clone());

        let err = service.regenerate("u-1").await.unwrap_err();
        assert!(matches!(err, CardError::Parse { .. }));
        assert_eq!(
            cache.stored("u-1").await.unwrap(),
            "{\"mood_tag\": \"旧卡片\"}"
        );
    }

    #[tokio::test]
    async fn test_non_object_json_rejected() {
        let turns = InMemoryTurnRepository::new();
        seed_history(&turns).await;
        let cache = InMemoryCardCache::new();
        let provider = ScriptedProvider::completing("[1, 2, 3]");
        let service = service_with(provider, turns, cache.clone());

        let err = service.regenerate("u-1").await.unwrap_err();
        assert!(matches!(err, CardError::Parse { .. }));
        assert!(cache.stored("u-1").await.is_none());
    }

    #[tokio::test]
    async fn test_provider_error_keeps_previous_cache() {
        let turns = InMemoryTurnRepository::new();
        seed_history(&turns).await;
        let cache = InMemoryCardCache::new();
        cache.seed("u-1", "{\"mood_tag\": \"旧卡片\"}").await;
        let provider =
            ScriptedProvider::failing(LlmError::Transport("connection refused".to_string()));
        let service = service_with(provider, turns, cache.clone());

        let err = service.regenerate("u-1").await.unwrap_err();
        assert!(matches!(err, CardError::Provider(_)));
        assert_eq!(
            cache.stored("u-1").await.unwrap(),
            "{\"mood_tag\": \"旧卡片\"}"
        );
    }

    #[tokio::test]
    async fn test_empty_response_is_typed_failure() {
        let turns = InMemoryTurnRepository::new();
        seed_history(&turns).await;
        let cache = InMemoryCardCache::new();
        let provider = ScriptedProvider::completing("   ");
        let service = service_with(provider, turns, cache.clone());

        let err = service.regenerate("u-1").await.unwrap_err();
        assert!(matches!(err, CardError::EmptyResponse));
    }

    #[tokio::test]
    async fn test_get_card_cache_hit_skips_provider() {
        let turns = InMemoryTurnRepository::new();
        let cache = InMemoryCardCache::new();
        cache.seed("u-1", "{\"mood_tag\": \"平静\"}").await;
        // A provider that would fail if consulted.
        let provider = ScriptedProvider::failing(LlmError::Transport("unreachable".to_string()));
        let service = service_with(provider, turns, cache);

        let value = service.get_card("u-1").await.unwrap();
        assert_eq!(value["mood_tag"], "平静");
    }

    #[tokio::test]
    async fn test_get_card_idempotent_without_new_turns() {
        let turns = InMemoryTurnRepository::new();
        seed_history(&turns).await;
        let cache = InMemoryCardCache::new();
        cache.seed("u-1", "{\"mood_tag\": \"平静\"}").await;
        let provider = ScriptedProvider::failing(LlmError::Transport("unreachable".to_string()));
        let service = service_with(provider, turns, cache);

        let first = service.get_card("u-1").await.unwrap();
        let second = service.get_card("u-1").await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_get_card_corrupt_entry_regenerates() {
        let turns = InMemoryTurnRepository::new();
        seed_history(&turns).await;
        let cache = InMemoryCardCache::new();
        cache.seed("u-1", "not json at all").await;
        let provider = ScriptedProvider::completing("{\"mood_tag\": \"焦虑\"}");
        let service = service_with(provider, turns, cache.clone());

        let value = service.get_card("u-1").await.unwrap();
        assert_eq!(value["mood_tag"], "焦虑");
        assert_eq!(cache.stored("u-1").await.unwrap(), "{\"mood_tag\": \"焦虑\"}");
    }

    #[tokio::test]
    async fn test_get_card_no_history_is_error() {
        let turns = InMemoryTurnRepository::new();
        let cache = InMemoryCardCache::new();
        let provider = ScriptedProvider::completing("{\"mood_tag\": \"平静\"}");
        let service = service_with(provider, turns, cache);

        let err = service.get_card("u-1").await.unwrap_err();
        assert!(matches!(err, CardError::NoHistory));
    }
}
