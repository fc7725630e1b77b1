//! SQLite turn repository implementation.
//!
//! Implements `TurnRepository` from `calmleaf-core` using sqlx with split
//! read/write pools: raw queries, a private Row struct, reader for the
//! window query and writer for appends.

use calmleaf_core::chat::repository::TurnRepository;
use calmleaf_types::chat::{ConversationTurn, MessageRole};
use calmleaf_types::error::RepositoryError;
use chrono::{DateTime, Utc};
use sqlx::Row;

use super::pool::DatabasePool;

/// SQLite-backed implementation of `TurnRepository`.
pub struct SqliteTurnRepository {
    pool: DatabasePool,
}

impl SqliteTurnRepository {
    /// Create a new repository backed by the given database pool.
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

/// Internal row type for mapping SQLite rows to domain ConversationTurn.
struct TurnRow {
    id: i64,
    user_id: String,
    role: String,
    content: String,
    created_at: String,
}

impl TurnRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            role: row.try_get("role")?,
            content: row.try_get("content")?,
            created_at: row.try_get("created_at")?,
        })
    }

    fn into_turn(self) -> Result<ConversationTurn, RepositoryError> {
        let role: MessageRole = self
            .role
            .parse()
            .map_err(|e: String| RepositoryError::Query(e))?;
        let created_at = parse_datetime(&self.created_at)?;

        Ok(ConversationTurn {
            id: self.id,
            user_id: self.user_id,
            role,
            content: self.content,
            created_at,
        })
    }
}

fn parse_datetime(s: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Query(format!("invalid datetime: {e}")))
}

fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

impl TurnRepository for SqliteTurnRepository {
    async fn save_turn(
        &self,
        user_id: &str,
        role: MessageRole,
        content: &str,
    ) -> Result<ConversationTurn, RepositoryError> {
        let created_at = Utc::now();

        let result = sqlx::query(
            "INSERT INTO conversation_turns (user_id, role, content, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(user_id)
        .bind(role.to_string())
        .bind(content)
        .bind(format_datetime(&created_at))
        .execute(&self.pool.writer)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        Ok(ConversationTurn {
            id: result.last_insert_rowid(),
            user_id: user_id.to_string(),
            role,
            content: content.to_string(),
            created_at,
        })
    }

    async fn recent_turns(
        &self,
        user_id: &str,
        limit: i64,
    ) -> Result<Vec<ConversationTurn>, RepositoryError> {
        let rows = sqlx::query(
            r#"SELECT * FROM conversation_turns
               WHERE user_id = ?
               ORDER BY created_at DESC, id DESC
               LIMIT ?"#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool.reader)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        let mut turns = Vec::with_capacity(rows.len());
        for row in &rows {
            let turn_row =
                TurnRow::from_row(row).map_err(|e| RepositoryError::Query(e.to_string()))?;
            turns.push(turn_row.into_turn()?);
        }

        Ok(turns)
    }
}
