//! Hand-labelled ground-truth reports.
//!
//! A ground-truth report is a CSV keyed by mapped id with a score column
//! (0-5 or "N/A") and a notes column. Files exported from spreadsheets are
//! common, so a UTF-8 BOM is stripped, non-UTF-8 bytes are read as Latin-1,
//! and several header spellings are accepted.

use crate::audit::judgment::is_not_available;
use crate::error::{AuditError, Result};
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

const ID_COLUMNS: [&str; 3] = ["Mapped_ID", "Mapped ID", "mapped_id"];
const SCORE_COLUMNS: [&str; 3] = ["Score (0-5)", "Score", "score"];
const NOTES_COLUMNS: [&str; 4] = ["Auditor_Notes", "Auditor Notes", "Notes", "auditor_notes"];

/// One labelled requirement.
#[derive(Debug, Clone, PartialEq)]
pub struct GroundTruthRow {
    pub mapped_id: String,
    /// `None` when the label is "N/A" or not a number.
    pub score: Option<f64>,
    pub notes: String,
}

/// All labelled rows of one report, in file order.
#[derive(Debug, Clone, Default)]
pub struct GroundTruth {
    rows: Vec<GroundTruthRow>,
}

impl GroundTruth {
    /// Load a ground-truth CSV file.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(AuditError::ArtifactNotFound(path.to_path_buf()));
        }
        let bytes = fs::read(path).map_err(|e| AuditError::io(path, e))?;
        Self::from_bytes(&bytes)
    }

    /// Parse CSV bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let text = decode(bytes);
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(text.as_bytes());

        let headers = reader.headers()?.clone();
        let column = |aliases: &[&str]| {
            headers
                .iter()
                .position(|h| aliases.iter().any(|a| a.eq_ignore_ascii_case(h)))
        };

        let id_col = column(&ID_COLUMNS).ok_or_else(|| {
            AuditError::GroundTruth(format!("missing id column (one of {:?})", ID_COLUMNS))
        })?;
        let score_col = column(&SCORE_COLUMNS).ok_or_else(|| {
            AuditError::GroundTruth(format!("missing score column (one of {:?})", SCORE_COLUMNS))
        })?;
        let notes_col = column(&NOTES_COLUMNS);

        let mut truth = Self::default();
        for record in reader.records() {
            let record = record?;
            let mapped_id = record.get(id_col).unwrap_or("").to_string();
            if mapped_id.is_empty() {
                debug!("skipping ground-truth row without id");
                continue;
            }

            let raw_score = record.get(score_col).unwrap_or("");
            let score = parse_label(raw_score);
            if score.is_none() && !raw_score.is_empty() && !is_not_available(raw_score) {
                warn!(mapped_id = %mapped_id, score = raw_score, "unreadable ground-truth score");
            }

            let notes = notes_col
                .and_then(|i| record.get(i))
                .unwrap_or("")
                .to_string();

            truth.insert(GroundTruthRow {
                mapped_id,
                score,
                notes,
            });
        }

        Ok(truth)
    }

    /// Add a row. A later row with the same id replaces the earlier one.
    pub fn insert(&mut self, row: GroundTruthRow) {
        match self.rows.iter_mut().find(|r| r.mapped_id == row.mapped_id) {
            Some(existing) => *existing = row,
            None => self.rows.push(row),
        }
    }

    pub fn get(&self, mapped_id: &str) -> Option<&GroundTruthRow> {
        self.rows.iter().find(|r| r.mapped_id == mapped_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &GroundTruthRow> {
        self.rows.iter()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// UTF-8 (BOM stripped) when valid, otherwise Latin-1.
fn decode(bytes: &[u8]) -> String {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => bytes.iter().map(|&b| b as char).collect(),
    }
}

fn parse_label(value: &str) -> Option<f64> {
    if is_not_available(value) {
        return None;
    }
    value.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_standard_headers() {
        let csv = "Mapped_ID,Requirement_Name,Score (0-5),Auditor_Notes\n\
                   REQ-01,Risk,4,\"Risk process, documented.\"\n\
                   REQ-02,Data,N/A,No data section.\n";
        let truth = GroundTruth::from_bytes(csv.as_bytes()).unwrap();

        assert_eq!(truth.len(), 2);
        let first = truth.get("REQ-01").unwrap();
        assert_eq!(first.score, Some(4.0));
        assert_eq!(first.notes, "Risk process, documented.");
        assert_eq!(truth.get("REQ-02").unwrap().score, None);
    }

    #[test]
    fn test_bom_and_alias_headers() {
        let mut bytes = b"\xEF\xBB\xBF".to_vec();
        bytes.extend_from_slice(b"Mapped ID,Score,Notes\nREQ-07,2,Partial\n");
        let truth = GroundTruth::from_bytes(&bytes).unwrap();

        assert_eq!(truth.get("REQ-07").unwrap().score, Some(2.0));
        assert_eq!(truth.get("REQ-07").unwrap().notes, "Partial");
    }

    #[test]
    fn test_latin1_fallback() {
        // "Conformità" with à encoded as a single Latin-1 byte.
        let bytes = b"Mapped_ID,Score,Notes\nREQ-01,3,Conformit\xE0\n";
        let truth = GroundTruth::from_bytes(bytes).unwrap();
        assert_eq!(truth.get("REQ-01").unwrap().notes, "Conformità");
    }

    #[test]
    fn test_rows_without_id_are_skipped() {
        let csv = "Mapped_ID,Score,Notes\n,3,orphan\nREQ-01,1,ok\n";
        let truth = GroundTruth::from_bytes(csv.as_bytes()).unwrap();
        assert_eq!(truth.len(), 1);
    }

    #[test]
    fn test_missing_score_column_is_error() {
        let csv = "Mapped_ID,Notes\nREQ-01,ok\n";
        assert!(matches!(
            GroundTruth::from_bytes(csv.as_bytes()),
            Err(AuditError::GroundTruth(_))
        ));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            GroundTruth::load(&dir.path().join("gt.csv")),
            Err(AuditError::ArtifactNotFound(_))
        ));
    }
}
