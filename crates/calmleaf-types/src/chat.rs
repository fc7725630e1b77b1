//! Conversation turn and chat mode types for Calmleaf.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use std::fmt;

// Re-export MessageRole: it doubles as the persisted turn role.
pub use crate::llm::MessageRole;

/// One persisted message in a user's conversation.
///
/// Turns are append-only: content is immutable once written and turns are
/// never deleted. Per-user ordering is `(created_at, id)` with the
/// autoincrement `id` breaking timestamp ties.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub id: i64,
    pub user_id: String,
    pub role: MessageRole,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// System prompt flavor for a chat turn.
///
/// Exactly two modes are recognized; anything else falls back to
/// [`ChatMode::Standard`] rather than erroring.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatMode {
    #[default]
    Standard,
    Professional,
}

impl ChatMode {
    /// Parse a caller-supplied mode string, falling back to Standard for
    /// anything unrecognized (including absent).
    pub fn from_name(name: Option<&str>) -> Self {
        match name {
            Some("professional") => ChatMode::Professional,
            _ => ChatMode::Standard,
        }
    }
}

impl fmt::Display for ChatMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChatMode::Standard => write!(f, "standard"),
            ChatMode::Professional => write!(f, "professional"),
        }
    }
}
