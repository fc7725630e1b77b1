//! Card cache types for Calmleaf.
//!
//! A "card" is a derived JSON summary of a user's recent conversation
//! (mood tag, encouragement, suggestions, healing quote, professional
//! analysis). The cache holds at most one entry per user; each successful
//! regeneration replaces the prior value wholesale.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The cached card row for one user.
///
/// `card_json` always holds the stripped, validated JSON object text as
/// produced by the regeneration task; entries that fail validation are
/// never written.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CardCacheEntry {
    pub user_id: String,
    pub card_json: String,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_card_cache_entry_serialize() {
        let entry = CardCacheEntry {
            user_id: "u-1".to_string(),
            card_json: r#"{"mood_tag":"焦虑"}"#.to_string(),
            updated_at: Utc::now(),
        };
        let json = serde_json::to_string(&entry).unwrap();
        assert!(json.contains("card_json"));

        // The stored text itself parses back into a JSON object.
        let value: serde_json::Value = serde_json::from_str(&entry.card_json).unwrap();
        assert!(value.is_object());
    }
}
