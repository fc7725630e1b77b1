//! SQLite card cache repository implementation.
//!
//! One row per user with upsert semantics. The upsert is a single
//! statement, so readers observe either the previous complete value or the
//! new complete value -- never a torn write.

use calmleaf_core::card::repository::CardCacheRepository;
use calmleaf_types::card::CardCacheEntry;
use calmleaf_types::error::RepositoryError;
use chrono::{DateTime, Utc};
use sqlx::Row;

use super::pool::DatabasePool;

/// SQLite-backed implementation of `CardCacheRepository`.
pub struct SqliteCardCacheRepository {
    pool: DatabasePool,
}

impl SqliteCardCacheRepository {
    /// Create a new repository backed by the given database pool.
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

fn parse_datetime(s: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Query(format!("invalid datetime: {e}")))
}

impl CardCacheRepository for SqliteCardCacheRepository {
    async fn upsert_card(&self, user_id: &str, card_json: &str) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"INSERT INTO card_cache (user_id, card_json, updated_at)
               VALUES (?, ?, ?)
               ON CONFLICT(user_id) DO UPDATE SET
                   card_json = excluded.card_json,
                   updated_at = excluded.updated_at"#,
        )
        .bind(user_id)
        .bind(card_json)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool.writer)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        Ok(())
    }

    async fn get_card(&self, user_id: &str) -> Result<Option<CardCacheEntry>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM card_cache WHERE user_id = ?")
            .bind(user_id)
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        match row {
            Some(row) => {
                let card_json: String = row
                    .try_get("card_json")
                    .map_err(|e| RepositoryError::Query(e.to_string()))?;
                let updated_at: String = row
                    .try_get("updated_at")
                    .map_err(|e| RepositoryError::Query(e.to_string()))?;
                Ok(Some(CardCacheEntry {
                    user_id: user_id.to_string(),
                    card_json,
                    updated_at: parse_datetime(&updated_at)?,
                }))
            }
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sqlite::pool::DatabasePool;

    async fn test_pool() -> DatabasePool {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let url = format!("sqlite://{}?mode=rwc", db_path.display());
        // Leak tempdir so it lives for the test
        std::mem::forget(dir);
        DatabasePool::new(&url).await.unwrap()
    }

    #[tokio::test]
    async fn test_get_absent_is_none() {
        let repo = SqliteCardCacheRepository::new(test_pool().await);
        assert!(repo.get_card("u-1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_upsert_then_get() {
        let repo = SqliteCardCacheRepository::new(test_pool().await);

        repo.upsert_card("u-1", r#"{"mood_tag":"焦虑"}"#)
            .await
            .unwrap();

        let entry = repo.get_card("u-1").await.unwrap().unwrap();
        assert_eq!(entry.user_id, "u-1");
        assert_eq!(entry.card_json, r#"{"mood_tag":"焦虑"}"#);
    }

    #[tokio::test]
    async fn test_upsert_replaces_existing_entry() {
        let repo = SqliteCardCacheRepository::new(test_pool().await);

        repo.upsert_card("u-1", r#"{"mood_tag":"焦虑"}"#)
            .await
            .unwrap();
        repo.upsert_card("u-1", r#"{"mood_tag":"平静"}"#)
            .await
            .unwrap();

        let entry = repo.get_card("u-1").await.unwrap().unwrap();
        assert_eq!(entry.card_json, r#"{"mood_tag":"平静"}"#);

        // Still exactly one row for the user.
        let count: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM card_cache WHERE user_id = ?")
                .bind("u-1")
                .fetch_one(&repo.pool.reader)
                .await
                .unwrap();
        assert_eq!(count.0, 1);
    }

    #[tokio::test]
    async fn test_entries_partitioned_by_user() {
        let repo = SqliteCardCacheRepository::new(test_pool().await);

        repo.upsert_card("u-1", r#"{"mood_tag":"甲"}"#).await.unwrap();
        repo.upsert_card("u-2", r#"{"mood_tag":"乙"}"#).await.unwrap();

        let one = repo.get_card("u-1").await.unwrap().unwrap();
        let two = repo.get_card("u-2").await.unwrap().unwrap();
        assert!(one.card_json.contains("甲"));
        assert!(two.card_json.contains("乙"));
    }
}
