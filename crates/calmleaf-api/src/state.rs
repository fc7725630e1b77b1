//! Application state wiring all services together.
//!
//! Services are generic over repository traits, but AppState pins them to
//! the concrete infra implementations.

use std::sync::Arc;

use calmleaf_core::card::service::CardService;
use calmleaf_core::chat::context::ContextAssembler;
use calmleaf_core::chat::knowledge::KnowledgeBase;
use calmleaf_core::chat::service::ChatService;
use calmleaf_infra::config::{build_provider, LlmSettings, ServiceSettings};
use calmleaf_infra::sqlite::card::SqliteCardCacheRepository;
use calmleaf_infra::sqlite::pool::{default_database_url, resolve_data_dir, DatabasePool};
use calmleaf_infra::sqlite::turn::SqliteTurnRepository;

/// Concrete type aliases for the service generics pinned to infra implementations.
pub type ConcreteCardService = CardService<SqliteTurnRepository, SqliteCardCacheRepository>;
pub type ConcreteChatService = ChatService<SqliteTurnRepository, SqliteCardCacheRepository>;

/// Shared application state holding all services.
#[derive(Clone)]
pub struct AppState {
    pub chat_service: Arc<ConcreteChatService>,
    pub card_service: Arc<ConcreteCardService>,
    pub db_pool: DatabasePool,
}

impl AppState {
    /// Initialize the application state: connect to DB, wire services.
    pub async fn init() -> anyhow::Result<Self> {
        let data_dir = resolve_data_dir();
        tokio::fs::create_dir_all(&data_dir).await?;

        let db_pool = DatabasePool::new(&default_database_url()).await?;

        // One provider instance bound to one backend for the process lifetime.
        let llm_settings = LlmSettings::from_env()?;
        tracing::info!(provider = %llm_settings.kind(), "LLM backend selected");
        let provider = Arc::new(build_provider(llm_settings));

        let service_settings = ServiceSettings::from_env();

        // The knowledge table is loaded once here and injected.
        let assembler = ContextAssembler::new(KnowledgeBase::default());

        let card_service = Arc::new(CardService::new(
            SqliteTurnRepository::new(db_pool.clone()),
            SqliteCardCacheRepository::new(db_pool.clone()),
            Arc::clone(&provider),
            service_settings.card_history_limit,
        ));

        let chat_service = Arc::new(ChatService::new(
            SqliteTurnRepository::new(db_pool.clone()),
            provider,
            assembler,
            Arc::clone(&card_service),
            service_settings.history_limit,
        ));

        Ok(Self {
            chat_service,
            card_service,
            db_pool,
        })
    }
}
