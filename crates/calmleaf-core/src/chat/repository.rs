//! TurnRepository trait definition.
//!
//! The conversation turn log is append-only: turns are never updated or
//! deleted by this service. Uses native async fn in traits (RPITIT);
//! implementations live in calmleaf-infra (e.g., `SqliteTurnRepository`).

use calmleaf_types::chat::{ConversationTurn, MessageRole};
use calmleaf_types::error::RepositoryError;

/// Repository trait for the per-user conversation log.
pub trait TurnRepository: Send + Sync {
    /// Append a turn and return it with its assigned id and timestamp.
    fn save_turn(
        &self,
        user_id: &str,
        role: MessageRole,
        content: &str,
    ) -> impl std::future::Future<Output = Result<ConversationTurn, RepositoryError>> + Send;

    /// The most recent turns for a user, newest first, ordered by
    /// `created_at DESC, id DESC`. Callers reverse for chronological order.
    fn recent_turns(
        &self,
        user_id: &str,
        limit: i64,
    ) -> impl std::future::Future<Output = Result<Vec<ConversationTurn>, RepositoryError>> + Send;
}
