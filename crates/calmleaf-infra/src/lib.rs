//! Infrastructure implementations for Calmleaf.
//!
//! SQLite repositories (sqlx, WAL mode, split reader/writer pools), the
//! DeepSeek and Zhipu LLM provider clients, and env-driven settings.

pub mod config;
pub mod llm;
pub mod sqlite;
