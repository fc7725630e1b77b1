//! Assistant reply sanitization.
//!
//! The reply protocol lets the model append quick-reply markers of the
//! form `|||SUGGESTIONS=["...", ...]|||` (singular `SUGGESTION` also
//! occurs). The live stream relays them raw for the client to parse;
//! persisted assistant turns have them removed.

use std::sync::OnceLock;

use regex::Regex;

static SUGGESTION_MARKER: OnceLock<Regex> = OnceLock::new();

fn suggestion_marker() -> &'static Regex {
    SUGGESTION_MARKER.get_or_init(|| {
        // (?s) so the marker body may span lines.
        Regex::new(r"(?s)\|\|\|SUGGESTIONS?=.*?\|\|\|").expect("suggestion marker regex")
    })
}

/// Remove suggestion markers from assistant content and trim the result.
pub fn strip_suggestion_markers(content: &str) -> String {
    suggestion_marker().replace_all(content, "").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_standard_suggestions() {
        let text = "Hello world.\n|||SUGGESTIONS=[\"Option 1\", \"Option 2\"]|||";
        assert_eq!(strip_suggestion_markers(text), "Hello world.");
    }

    #[test]
    fn test_strip_singular_suggestion() {
        let text = "Hello world.\n|||SUGGESTION=[\"Option 1\"]|||";
        assert_eq!(strip_suggestion_markers(text), "Hello world.");
    }

    #[test]
    fn test_strip_multiline_suggestions() {
        let text = "Hello world.\n|||SUGGESTIONS=[\n\"Option 1\",\n\"Option 2\"\n]|||";
        assert_eq!(strip_suggestion_markers(text), "Hello world.");
    }

    #[test]
    fn test_no_marker_untouched() {
        assert_eq!(strip_suggestion_markers("Just text."), "Just text.");
    }
}
