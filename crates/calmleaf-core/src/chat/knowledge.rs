//! Static keyword knowledge base.
//!
//! A small, immutable keyword→text table consulted on every chat turn.
//! Matching is a case-sensitive substring check of each key against the
//! query; hits are rendered with their key and joined with newlines.
//! Constructed once at startup and injected, never mutated.

/// Built-in entries. Keys are matched as substrings of the user's message.
const BUILTIN_ENTRIES: &[(&str, &str)] = &[
    (
        "焦虑",
        "焦虑是一种常见的情绪反应，通常是对未来不确定性的担忧。适度的焦虑可以提高警觉性，但过度的焦虑会影响生活。",
    ),
    (
        "抑郁",
        "抑郁不仅仅是心情不好，而是一种持续的情绪低落状态，可能伴随兴趣丧失、睡眠障碍等。",
    ),
    (
        "压力",
        "压力是身体对挑战或需求的反应。学会压力管理技巧，如深呼吸、正念冥想，有助于缓解压力。",
    ),
    (
        "失眠",
        "失眠可能由压力、焦虑或不良睡眠习惯引起。建立规律的作息时间非常重要。",
    ),
];

/// Immutable keyword-matched knowledge table.
#[derive(Debug, Clone)]
pub struct KnowledgeBase {
    entries: Vec<(String, String)>,
}

impl Default for KnowledgeBase {
    fn default() -> Self {
        Self {
            entries: BUILTIN_ENTRIES
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }
}

impl KnowledgeBase {
    /// Build a knowledge base from explicit entries (used by tests).
    pub fn from_entries(entries: Vec<(String, String)>) -> Self {
        Self { entries }
    }

    /// Find every entry whose key occurs in `query`.
    ///
    /// Hits are rendered `【{key}知识】: {value}` in table order and joined
    /// with newlines. Returns `None` when nothing matches.
    pub fn search(&self, query: &str) -> Option<String> {
        let results: Vec<String> = self
            .entries
            .iter()
            .filter(|(key, _)| query.contains(key.as_str()))
            .map(|(key, value)| format!("【{key}知识】: {value}"))
            .collect();

        if results.is_empty() {
            None
        } else {
            Some(results.join("\n"))
        }
    }
}
