//! Four-phase narrative segmentation returned by the model.
//!
//! Responses are stored verbatim. Parsing here is only used to report
//! whether a response has the requested shape.

use serde::{Deserialize, Serialize};

/// A story split into four phases, each given as `"<first sentence>... <last sentence>"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NarrativeSegments {
    pub beginning: String,
    pub rising_action: String,
    pub climax: String,
    pub falling_action: String,
}

impl NarrativeSegments {
    /// Phases in story order, paired with their keys.
    pub fn phases(&self) -> [(&'static str, &str); 4] {
        [
            ("beginning", self.beginning.as_str()),
            ("rising_action", self.rising_action.as_str()),
            ("climax", self.climax.as_str()),
            ("falling_action", self.falling_action.as_str()),
        ]
    }

    /// Keys of phases whose text is blank.
    pub fn empty_phases(&self) -> Vec<&'static str> {
        self.phases()
            .into_iter()
            .filter(|(_, text)| text.trim().is_empty())
            .map(|(key, _)| key)
            .collect()
    }
}

/// Strip a surrounding Markdown code fence, if present.
fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop an info string such as "json" on the opening fence line.
    let body = match rest.find('\n') {
        Some(nl) => &rest[nl + 1..],
        None => rest,
    };
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

/// Parse a model response as [`NarrativeSegments`], tolerating a code fence.
pub fn parse_segments(raw: &str) -> Result<NarrativeSegments, serde_json::Error> {
    serde_json::from_str(strip_code_fence(raw))
}

#[cfg(test)]
mod tests {
    use super::*;

    const BARE: &str = r#"{
        "beginning": "It began... It went on.",
        "rising_action": "Then... more.",
        "climax": "At last... there.",
        "falling_action": "After... the end."
    }"#;

    #[test]
    fn test_parse_bare_json() {
        let segments = parse_segments(BARE).unwrap();
        assert_eq!(segments.climax, "At last... there.");
        assert_eq!(segments.phases()[3].0, "falling_action");
    }

    #[test]
    fn test_empty_phases() {
        assert!(parse_segments(BARE).unwrap().empty_phases().is_empty());

        let raw = r#"{"beginning": "a", "rising_action": " ", "climax": "c", "falling_action": ""}"#;
        assert_eq!(
            parse_segments(raw).unwrap().empty_phases(),
            vec!["rising_action", "falling_action"]
        );
    }

    #[test]
    fn test_parse_fenced_json() {
        let raw = format!("```json\n{BARE}\n```\n");
        assert_eq!(parse_segments(&raw).unwrap(), parse_segments(BARE).unwrap());

        let raw = format!("```\n{BARE}```");
        assert!(parse_segments(&raw).is_ok());
    }

    #[test]
    fn test_missing_phase_rejected() {
        let raw = r#"{"beginning": "a", "rising_action": "b", "climax": "c"}"#;
        assert!(parse_segments(raw).is_err());
    }

    #[test]
    fn test_prose_rejected() {
        assert!(parse_segments("Sorry, I can't help with that.").is_err());
    }
}
