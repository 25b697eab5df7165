//! Document auditing: one judged report row per catalog requirement.
//!
//! - [`judgment`] turns raw provider text into a score and notes, never failing
//! - [`evaluator`] builds prompts from cached retrieval and fans out judgments
//! - [`service`] owns the initialized context and the readiness check

pub mod evaluator;
pub mod judgment;
pub mod service;

pub use evaluator::{AuditEvaluator, EvaluatorOptions};
pub use judgment::{ParsedJudgment, parse_judgment};
pub use service::{AuditContext, AuditService, ServiceStatus};

use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// Highest compliance score.
pub const MAX_SCORE: u8 = 5;

/// Serialized form of [`Score::NotAvailable`].
pub const NOT_AVAILABLE: &str = "N/A";

/// Compliance score on the 0-5 scale, or an explicit "could not be assessed".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Score {
    Numeric(u8),
    NotAvailable,
}

impl Score {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Score::Numeric(v) => Some(*v as f64),
            Score::NotAvailable => None,
        }
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Score::Numeric(v) => f.pad(&v.to_string()),
            Score::NotAvailable => f.pad(NOT_AVAILABLE),
        }
    }
}

impl Serialize for Score {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Score::Numeric(v) => serializer.serialize_u8(*v),
            Score::NotAvailable => serializer.serialize_str(NOT_AVAILABLE),
        }
    }
}

impl<'de> Deserialize<'de> for Score {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ScoreVisitor;

        impl Visitor<'_> for ScoreVisitor {
            type Value = Score;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an integer from 0 to 5 or \"N/A\"")
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Score, E> {
                if v <= MAX_SCORE as u64 {
                    Ok(Score::Numeric(v as u8))
                } else {
                    Err(E::custom(format!("score {} out of range", v)))
                }
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Score, E> {
                if v < 0 {
                    return Err(E::custom(format!("score {} out of range", v)));
                }
                self.visit_u64(v as u64)
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Score, E> {
                if judgment::is_not_available(v) {
                    return Ok(Score::NotAvailable);
                }
                match v.trim().parse::<u64>() {
                    Ok(n) => self.visit_u64(n),
                    Err(_) => Err(E::invalid_value(de::Unexpected::Str(v), &self)),
                }
            }

            fn visit_unit<E: de::Error>(self) -> Result<Score, E> {
                Ok(Score::NotAvailable)
            }
        }

        deserializer.deserialize_any(ScoreVisitor)
    }
}

/// Result of judging one requirement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequirementReport {
    #[serde(alias = "Mapped_ID")]
    pub mapped_id: String,
    #[serde(alias = "Requirement_Name")]
    pub requirement_name: String,
    #[serde(alias = "Score")]
    pub score: Score,
    #[serde(alias = "Auditor_Notes")]
    pub auditor_notes: String,
}

/// Audit input.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRequest {
    pub document_text: String,
}

impl AuditRequest {
    pub fn new(document_text: impl Into<String>) -> Self {
        Self {
            document_text: document_text.into(),
        }
    }
}

/// Audit output: report rows in catalog order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuditResponse {
    pub requirements: Vec<RequirementReport>,
}

/// One audit run over one document.
pub type AuditReport = AuditResponse;

impl AuditResponse {
    /// Report row for a mapped id.
    pub fn find(&self, mapped_id: &str) -> Option<&RequirementReport> {
        self.requirements.iter().find(|r| r.mapped_id == mapped_id)
    }

    /// Mean of the numeric scores, if there are any.
    pub fn mean_score(&self) -> Option<f64> {
        let scores: Vec<f64> = self
            .requirements
            .iter()
            .filter_map(|r| r.score.as_f64())
            .collect();
        if scores.is_empty() {
            None
        } else {
            Some(scores.iter().sum::<f64>() / scores.len() as f64)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_score_serialization() {
        assert_eq!(serde_json::to_string(&Score::Numeric(4)).unwrap(), "4");
        assert_eq!(serde_json::to_string(&Score::NotAvailable).unwrap(), "\"N/A\"");
    }

    #[test]
    fn test_score_deserialization() {
        assert_eq!(serde_json::from_str::<Score>("3").unwrap(), Score::Numeric(3));
        assert_eq!(serde_json::from_str::<Score>("\"N/A\"").unwrap(), Score::NotAvailable);
        assert_eq!(serde_json::from_str::<Score>("\"2\"").unwrap(), Score::Numeric(2));
        assert_eq!(serde_json::from_str::<Score>("null").unwrap(), Score::NotAvailable);
        assert!(serde_json::from_str::<Score>("9").is_err());
        assert!(serde_json::from_str::<Score>("\"high\"").is_err());
    }

    #[test]
    fn test_report_accepts_legacy_field_names() {
        let json = r#"{"Mapped_ID": "REQ-01", "Requirement_Name": "Risk", "Score": "N/A", "Auditor_Notes": "none"}"#;
        let report: RequirementReport = serde_json::from_str(json).unwrap();
        assert_eq!(report.mapped_id, "REQ-01");
        assert_eq!(report.score, Score::NotAvailable);
    }

    #[test]
    fn test_mean_score_ignores_not_available() {
        let row = |id: &str, score| RequirementReport {
            mapped_id: id.into(),
            requirement_name: id.into(),
            score,
            auditor_notes: String::new(),
        };
        let response = AuditResponse {
            requirements: vec![
                row("a", Score::Numeric(2)),
                row("b", Score::NotAvailable),
                row("c", Score::Numeric(4)),
            ],
        };
        assert_eq!(response.mean_score(), Some(3.0));
        assert!(response.find("b").is_some());
        assert_eq!(AuditResponse::default().mean_score(), None);
    }
}
