//! Parsing of judgment provider answers.
//!
//! The provider is asked for `{"score": 0-5 | "N/A", "auditor_notes": "..."}`.
//! Code fences and text around the object are stripped; anything else that does
//! not fit that contract becomes score 0 with the raw answer embedded in the
//! notes, so a malformed answer never fails an audit.

use super::{MAX_SCORE, Score};
use serde_json::Value;
use tracing::warn;

/// Score and notes recovered from a provider answer.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedJudgment {
    pub score: Score,
    pub notes: String,
    /// True when the answer did not fit the contract and the fallback was used.
    pub malformed: bool,
}

impl ParsedJudgment {
    /// Fallback for an answer that could not be parsed.
    pub fn malformed(raw: &str) -> Self {
        Self {
            score: Score::Numeric(0),
            notes: format!("LLM response parsing failed. Response was: {}", raw),
            malformed: true,
        }
    }
}

/// True for the sentinels that mean "no score could be assigned".
pub fn is_not_available(value: &str) -> bool {
    let normalized = value.trim().to_ascii_lowercase();
    matches!(
        normalized.as_str(),
        "n/a" | "na" | "n.a." | "not available" | "not applicable"
    )
}

/// Parse a raw provider answer. Never fails.
pub fn parse_judgment(raw: &str) -> ParsedJudgment {
    match try_parse(raw) {
        Some(parsed) => parsed,
        None => {
            warn!(response = raw, "malformed judgment, falling back to score 0");
            ParsedJudgment::malformed(raw)
        }
    }
}

fn try_parse(raw: &str) -> Option<ParsedJudgment> {
    let json = extract_json(raw);
    let value: Value = serde_json::from_str(&json).ok()?;
    let object = value.as_object()?;

    let score = parse_score(object.get("score")?)?;
    let notes = object.get("auditor_notes")?.as_str()?.trim().to_string();

    Some(ParsedJudgment {
        score,
        notes,
        malformed: false,
    })
}

/// An integer in 0..=5 or a "not available" string. Nothing else.
fn parse_score(value: &Value) -> Option<Score> {
    match value {
        Value::Number(n) => {
            let score = n.as_u64().filter(|v| *v <= MAX_SCORE as u64)?;
            Some(Score::Numeric(score as u8))
        }
        Value::String(s) if is_not_available(s) => Some(Score::NotAvailable),
        _ => None,
    }
}

/// Extract JSON from a potentially markdown-wrapped response.
fn extract_json(response: &str) -> String {
    let response = response.trim();

    if response.starts_with("```") {
        let start = response.find('\n').map(|n| n + 1).unwrap_or(3);
        if let Some(end) = response.rfind("```") {
            if end > start {
                return response[start..end].trim().to_string();
            }
        }
    }

    if let Some(start) = response.find('{') {
        if let Some(end) = response.rfind('}') {
            if end > start {
                return response[start..=end].to_string();
            }
        }
    }

    response.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_json() {
        let parsed = parse_judgment(r#"{"score": 4, "auditor_notes": "Risk process documented."}"#);
        assert_eq!(parsed.score, Score::Numeric(4));
        assert_eq!(parsed.notes, "Risk process documented.");
        assert!(!parsed.malformed);
    }

    #[test]
    fn test_fenced_json() {
        let raw = "```json\n{\"score\": 2, \"auditor_notes\": \"Partial.\"}\n```";
        let parsed = parse_judgment(raw);
        assert_eq!(parsed.score, Score::Numeric(2));
        assert_eq!(parsed.notes, "Partial.");
    }

    #[test]
    fn test_json_with_surrounding_text() {
        let raw = "Here is my evaluation:\n{\"score\": 3, \"auditor_notes\": \"ok\"}\nThanks.";
        let parsed = parse_judgment(raw);
        assert_eq!(parsed.score, Score::Numeric(3));
        assert_eq!(parsed.notes, "ok");
    }

    #[test]
    fn test_not_available_sentinels() {
        for score in [r#""N/A""#, r#""na""#, r#""Not available""#] {
            let raw = format!(r#"{{"score": {}, "auditor_notes": "No evidence."}}"#, score);
            let parsed = parse_judgment(&raw);
            assert_eq!(parsed.score, Score::NotAvailable, "sentinel {}", score);
            assert!(!parsed.malformed);
        }
    }

    #[test]
    fn test_out_of_range_score_falls_back() {
        for raw in [
            r#"{"score": 9, "auditor_notes": "x"}"#,
            r#"{"score": -2, "auditor_notes": "x"}"#,
        ] {
            let parsed = parse_judgment(raw);
            assert!(parsed.malformed, "{}", raw);
            assert_eq!(parsed.score, Score::Numeric(0));
            assert!(parsed.notes.contains(raw));
        }
    }

    #[test]
    fn test_other_shapes_fall_back() {
        for raw in [
            r#"{"score": 3.5, "auditor_notes": "x"}"#,
            r#"{"score": 5.0, "auditor_notes": "x"}"#,
            r#"{"score": "3", "auditor_notes": "x"}"#,
            r#"{"score": null, "auditor_notes": "x"}"#,
            r#"{"Score": 3, "Auditor_Notes": "x"}"#,
            r#"{"score": 3, "notes": "x"}"#,
            r#"{"score": 3, "auditor_notes": 7}"#,
        ] {
            let parsed = parse_judgment(raw);
            assert!(parsed.malformed, "{}", raw);
            assert_eq!(parsed.score, Score::Numeric(0));
        }
    }

    #[test]
    fn test_unparseable_falls_back_with_raw_text() {
        let raw = "The document is mostly compliant, I'd say 4 out of 5.";
        let parsed = parse_judgment(raw);
        assert!(parsed.malformed);
        assert_eq!(parsed.score, Score::Numeric(0));
        assert!(parsed.notes.contains(raw));
    }

    #[test]
    fn test_missing_notes_is_malformed() {
        let parsed = parse_judgment(r#"{"score": 3}"#);
        assert!(parsed.malformed);
        assert!(parsed.notes.contains(r#"{"score": 3}"#));
    }

    #[test]
    fn test_extract_json_variants() {
        assert_eq!(extract_json(r#"{"a": 1}"#), r#"{"a": 1}"#);
        assert_eq!(extract_json("```\n{\"a\": 1}\n```"), r#"{"a": 1}"#);
        assert_eq!(extract_json("no json"), "no json");
    }
}
