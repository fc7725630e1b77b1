//! CardCacheRepository trait definition.
//!
//! At most one cache entry exists per user. `upsert_card` must replace the
//! prior value atomically: readers observe either the previous complete
//! value or the new complete value, never a half-written one.

use calmleaf_types::card::CardCacheEntry;
use calmleaf_types::error::RepositoryError;

/// Repository trait for the per-user card cache.
pub trait CardCacheRepository: Send + Sync {
    /// Replace (or create) the cached card for a user. Last writer wins.
    fn upsert_card(
        &self,
        user_id: &str,
        card_json: &str,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// The current cache entry for a user, if any.
    fn get_card(
        &self,
        user_id: &str,
    ) -> impl std::future::Future<Output = Result<Option<CardCacheEntry>, RepositoryError>> + Send;
}
