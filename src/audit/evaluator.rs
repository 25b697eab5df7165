//! Per-requirement judgment and report assembly.

use super::judgment::parse_judgment;
use super::{AuditReport, RequirementReport, Score};
use crate::catalog::{Requirement, RequirementCatalog};
use crate::config::AuditConfig;
use crate::error::Result;
use crate::llm::{JudgmentProvider, Prompts};
use crate::persistence::save_artifact;
use crate::retrieval::RequirementChunkCache;
use futures::stream::{self, StreamExt};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Options for an audit run.
#[derive(Debug, Clone)]
pub struct EvaluatorOptions {
    /// Judge at most this many requirements, in catalog order.
    pub max_requirements: Option<usize>,
    /// Judgment calls in flight at once.
    pub concurrency: usize,
    /// Write each produced report here.
    pub debug_dump_path: Option<PathBuf>,
}

impl Default for EvaluatorOptions {
    fn default() -> Self {
        Self {
            max_requirements: None,
            concurrency: 1,
            debug_dump_path: None,
        }
    }
}

impl From<&AuditConfig> for EvaluatorOptions {
    fn from(config: &AuditConfig) -> Self {
        Self {
            max_requirements: config.max_requirements,
            concurrency: config.concurrency,
            debug_dump_path: config.debug_dump_path.clone(),
        }
    }
}

/// Judges a document against every requirement in a catalog.
pub struct AuditEvaluator<J> {
    judge: J,
    catalog: RequirementCatalog,
    cache: RequirementChunkCache,
    options: EvaluatorOptions,
}

impl<J: JudgmentProvider> AuditEvaluator<J> {
    pub fn new(judge: J, catalog: RequirementCatalog, cache: RequirementChunkCache) -> Self {
        Self::with_options(judge, catalog, cache, EvaluatorOptions::default())
    }

    pub fn with_options(
        judge: J,
        catalog: RequirementCatalog,
        cache: RequirementChunkCache,
        options: EvaluatorOptions,
    ) -> Self {
        Self {
            judge,
            catalog,
            cache,
            options,
        }
    }

    pub fn catalog(&self) -> &RequirementCatalog {
        &self.catalog
    }

    pub fn cache(&self) -> &RequirementChunkCache {
        &self.cache
    }

    pub fn judge(&self) -> &J {
        &self.judge
    }

    pub fn options(&self) -> &EvaluatorOptions {
        &self.options
    }

    /// Build the judgment prompt for one requirement.
    ///
    /// Retrieval context comes only from the cache; a requirement without a
    /// cache entry is judged with no references.
    pub fn build_prompt(&self, document: &str, requirement: &Requirement) -> String {
        let references = match self.cache.get(&requirement.name) {
            Some(chunks) => chunks
                .iter()
                .map(|c| c.content.as_str())
                .collect::<Vec<_>>()
                .join("\n"),
            None => {
                warn!(name = %requirement.name, "no cached chunks for requirement");
                String::new()
            }
        };
        Prompts::build_compliance_judgment(document, &requirement.query_text(), &references)
    }

    /// Judge one requirement. Never fails: provider errors yield "N/A" and
    /// malformed answers yield score 0, both with explanatory notes.
    pub async fn evaluate_requirement(
        &self,
        document: &str,
        requirement: &Requirement,
    ) -> RequirementReport {
        let prompt = self.build_prompt(document, requirement);

        let (score, auditor_notes) = match self.judge.judge(&prompt).await {
            Ok(raw) => {
                let parsed = parse_judgment(&raw);
                (parsed.score, parsed.notes)
            }
            Err(e) => {
                warn!(name = %requirement.name, error = %e, "judgment provider call failed");
                (
                    Score::NotAvailable,
                    format!("Judgment provider call failed: {}", e),
                )
            }
        };
        debug!(id = %requirement.id, %score, "judged requirement");

        RequirementReport {
            mapped_id: requirement.id.clone(),
            requirement_name: requirement.name.clone(),
            score,
            auditor_notes,
        }
    }

    /// Audit a document against the catalog, preserving catalog order.
    pub async fn audit_document(&self, document: &str) -> AuditReport {
        let limit = self.options.max_requirements.unwrap_or(usize::MAX);
        let concurrency = self.options.concurrency.max(1);
        info!(
            requirements = self.catalog.len().min(limit),
            concurrency,
            judge = self.judge.name(),
            "auditing document"
        );

        let requirements: Vec<RequirementReport> = stream::iter(self.catalog.iter().take(limit))
            .map(|requirement| self.evaluate_requirement(document, requirement))
            .buffered(concurrency)
            .collect()
            .await;

        let report = AuditReport { requirements };

        if let Some(path) = &self.options.debug_dump_path {
            if let Err(e) = dump_report(&report, path) {
                warn!(path = %path.display(), error = %e, "failed to write debug dump");
            }
        }

        report
    }
}

/// Write a report as JSON for later inspection.
pub fn dump_report(report: &AuditReport, path: &Path) -> Result<()> {
    save_artifact(report, path)?;
    info!(path = %path.display(), "wrote audit report");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retrieval::RetrievedChunk;
    use crate::test_support::ScriptedJudge;
    use tempfile::TempDir;

    const CATALOG: &str = r#"{
        "Risk management": {
            "id": "REQ-01",
            "descriptive_text": "Establish a risk management process.",
            "related_articles": [{"ref": "Art. 9", "text": "A risk management system shall be established."}]
        },
        "Data governance": {
            "id": "REQ-02",
            "descriptive_text": "Govern training data.",
            "related_articles": []
        },
        "Transparency": {
            "id": "REQ-03",
            "descriptive_text": "Inform users about AI interaction.",
            "related_articles": []
        }
    }"#;

    fn cache() -> RequirementChunkCache {
        let mut cache = RequirementChunkCache::new();
        cache.insert(
            "Risk management",
            vec![
                RetrievedChunk {
                    content: "Article 9 Risk management system".into(),
                    source: "ai_act.pdf".into(),
                    score: 0.9,
                    chunk_id: Some(12),
                },
                RetrievedChunk {
                    content: "Article 17 Quality management".into(),
                    source: "ai_act.pdf".into(),
                    score: 0.7,
                    chunk_id: Some(40),
                },
            ],
        );
        cache
    }

    fn evaluator(judge: ScriptedJudge) -> AuditEvaluator<ScriptedJudge> {
        let catalog = RequirementCatalog::from_json(CATALOG).unwrap();
        AuditEvaluator::new(judge, catalog, cache())
    }

    #[tokio::test]
    async fn test_one_report_per_requirement_in_catalog_order() {
        let evaluator = evaluator(ScriptedJudge::new(r#"{"score": 3, "auditor_notes": "ok"}"#));

        let report = evaluator.audit_document("Our AI system ...").await;

        let ids: Vec<&str> = report.requirements.iter().map(|r| r.mapped_id.as_str()).collect();
        assert_eq!(ids, vec!["REQ-01", "REQ-02", "REQ-03"]);
        for row in &report.requirements {
            assert_eq!(row.score, Score::Numeric(3));
        }
    }

    #[tokio::test]
    async fn test_prompt_contains_document_requirement_and_references() {
        let evaluator = evaluator(ScriptedJudge::new(r#"{"score": 3, "auditor_notes": "ok"}"#));
        let catalog = RequirementCatalog::from_json(CATALOG).unwrap();
        let requirement = catalog.get("Risk management").unwrap();

        evaluator
            .evaluate_requirement("DOCUMENT BODY", requirement)
            .await;

        let prompts = evaluator.judge().prompts();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("DOCUMENT BODY"));
        assert!(prompts[0].contains("Establish a risk management process."));
        assert!(prompts[0].contains("Article 9 Risk management system\nArticle 17 Quality management"));
    }

    #[tokio::test]
    async fn test_uncached_requirement_still_reported() {
        let evaluator = evaluator(ScriptedJudge::new(r#"{"score": 1, "auditor_notes": "weak"}"#));
        let catalog = RequirementCatalog::from_json(CATALOG).unwrap();

        let row = evaluator
            .evaluate_requirement("doc", catalog.get("Transparency").unwrap())
            .await;

        assert_eq!(row.mapped_id, "REQ-03");
        assert_eq!(row.score, Score::Numeric(1));
        assert!(evaluator.judge().prompts()[0].contains("(no references retrieved)"));
    }

    #[tokio::test]
    async fn test_degraded_rows_never_fail_the_audit() {
        let judge = ScriptedJudge::new(r#"{"score": "N/A", "auditor_notes": "No evidence."}"#)
            .on("Govern training data.", "I think it is fine")
            .fail_on("Inform users about AI interaction.");
        let evaluator = evaluator(judge);

        let report = evaluator.audit_document("doc").await;

        assert_eq!(report.requirements.len(), 3);
        assert_eq!(report.requirements[0].score, Score::NotAvailable);

        assert_eq!(report.requirements[1].score, Score::Numeric(0));
        assert!(report.requirements[1].auditor_notes.contains("I think it is fine"));

        assert_eq!(report.requirements[2].score, Score::NotAvailable);
        assert!(report.requirements[2].auditor_notes.contains("scripted failure"));
    }

    #[tokio::test]
    async fn test_concurrency_preserves_order_and_cap_limits_rows() {
        let catalog = RequirementCatalog::from_json(CATALOG).unwrap();
        let options = EvaluatorOptions {
            max_requirements: Some(2),
            concurrency: 4,
            debug_dump_path: None,
        };
        let evaluator = AuditEvaluator::with_options(
            ScriptedJudge::new(r#"{"score": 5, "auditor_notes": "ok"}"#),
            catalog,
            cache(),
            options,
        );

        let report = evaluator.audit_document("doc").await;

        let ids: Vec<&str> = report.requirements.iter().map(|r| r.mapped_id.as_str()).collect();
        assert_eq!(ids, vec!["REQ-01", "REQ-02"]);
    }

    #[tokio::test]
    async fn test_debug_dump_written() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("debug").join("last_audit.json");
        let catalog = RequirementCatalog::from_json(CATALOG).unwrap();
        let options = EvaluatorOptions {
            debug_dump_path: Some(path.clone()),
            ..Default::default()
        };
        let evaluator = AuditEvaluator::with_options(
            ScriptedJudge::new(r#"{"score": 2, "auditor_notes": "ok"}"#),
            catalog,
            cache(),
            options,
        );

        let report = evaluator.audit_document("doc").await;

        let dumped: AuditReport = crate::persistence::load_artifact(&path).unwrap();
        assert_eq!(dumped, report);
    }
}
