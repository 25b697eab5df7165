//! Audit entry point with an explicit readiness state.
//!
//! Everything an audit needs is gathered once into an [`AuditContext`].
//! [`AuditService`] holds either that context or the reason it could not be
//! built, and every request checks readiness first.

use super::evaluator::{AuditEvaluator, EvaluatorOptions};
use super::{AuditRequest, AuditResponse};
use crate::catalog::RequirementCatalog;
use crate::config::Config;
use crate::error::{AuditError, Result};
use crate::indexer::{IndexStatus, status_path};
use crate::llm::JudgmentProvider;
use crate::retrieval::RequirementChunkCache;
use serde::Serialize;
use tracing::{info, warn};

/// Initialized collaborators for auditing.
pub struct AuditContext<J> {
    evaluator: AuditEvaluator<J>,
    index_status: Option<IndexStatus>,
}

impl<J: JudgmentProvider> AuditContext<J> {
    /// Build the context from configuration.
    ///
    /// A missing or empty catalog is an error. A missing chunk cache is not:
    /// audits then run without retrieval context.
    pub fn initialize(config: &Config, judge: J) -> Result<Self> {
        let catalog = RequirementCatalog::load(&config.audit.catalog_path)?;
        if catalog.is_empty() {
            return Err(AuditError::InvalidCatalog(format!(
                "{} contains no requirements",
                config.audit.catalog_path.display()
            )));
        }

        let cache = RequirementChunkCache::load_or_empty(&config.precompute.chunks_output)?;

        let index_status =
            IndexStatus::load(&status_path(&config.vectorization.vector_index_path)).ok();
        if index_status.is_none() {
            warn!(
                path = %config.vectorization.vector_index_path.display(),
                "no index status marker; precomputed chunks may be stale"
            );
        }

        let options = EvaluatorOptions::from(&config.audit);
        Ok(Self::from_parts(
            AuditEvaluator::with_options(judge, catalog, cache, options),
            index_status,
        ))
    }

    /// Assemble a context from an already built evaluator.
    pub fn from_parts(evaluator: AuditEvaluator<J>, index_status: Option<IndexStatus>) -> Self {
        Self {
            evaluator,
            index_status,
        }
    }

    pub fn evaluator(&self) -> &AuditEvaluator<J> {
        &self.evaluator
    }

    pub fn index_status(&self) -> Option<&IndexStatus> {
        self.index_status.as_ref()
    }
}

/// Readiness snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct ServiceStatus {
    pub ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub judge: Option<String>,
    pub requirements: usize,
    pub cached_requirements: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<IndexStatus>,
}

/// Audit service: a ready context, or why there is none.
pub struct AuditService<J> {
    state: std::result::Result<AuditContext<J>, String>,
}

impl<J: JudgmentProvider> AuditService<J> {
    /// Initialize from configuration and a judgment provider that may itself
    /// have failed to build. Never fails; failures become "not ready".
    pub fn start(config: &Config, judge: Result<J>) -> Self {
        let state = judge
            .and_then(|judge| AuditContext::initialize(config, judge))
            .map_err(|e| e.to_string());

        match &state {
            Ok(context) => info!(
                requirements = context.evaluator.catalog().len(),
                "audit service ready"
            ),
            Err(reason) => warn!(reason = %reason, "audit service not ready"),
        }

        Self { state }
    }

    pub fn ready(context: AuditContext<J>) -> Self {
        Self { state: Ok(context) }
    }

    pub fn not_ready(reason: impl Into<String>) -> Self {
        Self {
            state: Err(reason.into()),
        }
    }

    pub fn is_ready(&self) -> bool {
        self.state.is_ok()
    }

    pub fn context(&self) -> Result<&AuditContext<J>> {
        self.state
            .as_ref()
            .map_err(|reason| AuditError::NotReady(reason.clone()))
    }

    pub fn status(&self) -> ServiceStatus {
        match &self.state {
            Ok(context) => ServiceStatus {
                ready: true,
                reason: None,
                judge: Some(context.evaluator.judge().name().to_string()),
                requirements: context.evaluator.catalog().len(),
                cached_requirements: context.evaluator.cache().len(),
                index: context.index_status.clone(),
            },
            Err(reason) => ServiceStatus {
                ready: false,
                reason: Some(reason.clone()),
                judge: None,
                requirements: 0,
                cached_requirements: 0,
                index: None,
            },
        }
    }

    /// Audit one document. Fails only when the service is not ready.
    pub async fn audit(&self, request: &AuditRequest) -> Result<AuditResponse> {
        let context = self.context()?;
        Ok(context
            .evaluator
            .audit_document(&request.document_text)
            .await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::Score;
    use crate::test_support::ScriptedJudge;
    use std::fs;
    use tempfile::TempDir;

    fn config_in(dir: &TempDir) -> Config {
        let mut config = Config::default();
        config.audit.catalog_path = dir.path().join("mapping.json");
        config.precompute.chunks_output = dir.path().join("requirement_chunks.json");
        config.vectorization.vector_index_path = dir.path().join("vector_index");
        config
    }

    fn write_catalog(dir: &TempDir) {
        fs::write(
            dir.path().join("mapping.json"),
            r#"{"Risk management": {"id": "REQ-01", "descriptive_text": "Manage risk.", "related_articles": []}}"#,
        )
        .unwrap();
    }

    fn judge() -> ScriptedJudge {
        ScriptedJudge::new(r#"{"score": 4, "auditor_notes": "Documented."}"#)
    }

    #[tokio::test]
    async fn test_missing_catalog_means_not_ready() {
        let dir = TempDir::new().unwrap();
        let service = AuditService::start(&config_in(&dir), Ok(judge()));

        assert!(!service.is_ready());
        let status = service.status();
        assert!(!status.ready);
        assert!(status.reason.unwrap().contains("mapping.json"));

        let result = service.audit(&AuditRequest::new("doc")).await;
        assert!(matches!(result, Err(AuditError::NotReady(_))));
    }

    #[tokio::test]
    async fn test_failed_judge_means_not_ready() {
        let dir = TempDir::new().unwrap();
        write_catalog(&dir);
        let service: AuditService<ScriptedJudge> = AuditService::start(
            &config_in(&dir),
            Err(AuditError::Config("LLM API key is required".into())),
        );

        assert!(!service.is_ready());
        assert!(service.status().reason.unwrap().contains("API key"));
    }

    #[tokio::test]
    async fn test_ready_without_cache_audits_every_requirement() {
        let dir = TempDir::new().unwrap();
        write_catalog(&dir);
        let service = AuditService::start(&config_in(&dir), Ok(judge()));

        let status = service.status();
        assert!(status.ready);
        assert_eq!(status.requirements, 1);
        assert_eq!(status.cached_requirements, 0);
        assert_eq!(status.judge.as_deref(), Some("scripted"));

        let response = service.audit(&AuditRequest::new("doc")).await.unwrap();
        assert_eq!(response.requirements.len(), 1);
        assert_eq!(response.requirements[0].mapped_id, "REQ-01");
        assert_eq!(response.requirements[0].score, Score::Numeric(4));
    }

    #[test]
    fn test_empty_catalog_rejected() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("mapping.json"), "{}").unwrap();

        let result = AuditContext::initialize(&config_in(&dir), judge());
        assert!(matches!(result, Err(AuditError::InvalidCatalog(_))));
    }
}
