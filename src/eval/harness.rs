//! Offline evaluation of the audit pipeline against labelled reports.

use super::ground_truth::GroundTruth;
use super::metrics::{
    CaseMetrics, EvaluationSummary, RunParams, explanation_similarity, mean_absolute_error,
};
use crate::audit::{AuditEvaluator, AuditReport};
use crate::config::GroundTruthCase;
use crate::embedding::EmbeddingProvider;
use crate::error::{AuditError, Result};
use crate::llm::JudgmentProvider;
use crate::persistence::{append_json_line, save_artifact};
use chrono::Utc;
use std::fs;
use std::path::Path;
use std::time::Instant;
use tracing::{info, warn};

/// Runs audits on labelled documents and scores them.
pub struct EvaluationHarness<'a, J, E> {
    evaluator: &'a AuditEvaluator<J>,
    embedder: &'a E,
    params: RunParams,
}

impl<'a, J: JudgmentProvider, E: EmbeddingProvider> EvaluationHarness<'a, J, E> {
    pub fn new(evaluator: &'a AuditEvaluator<J>, embedder: &'a E, params: RunParams) -> Self {
        Self {
            evaluator,
            embedder,
            params,
        }
    }

    /// Audit one document and compare it to its ground truth.
    pub async fn evaluate_case(
        &self,
        name: &str,
        document_text: &str,
        truth: &GroundTruth,
    ) -> CaseMetrics {
        let report = self.evaluator.audit_document(document_text).await;
        compare_report(name, &report, truth, self.embedder).await
    }

    /// Evaluate every case; cases with missing or unreadable files are skipped.
    pub async fn run(&self, cases: &[GroundTruthCase]) -> EvaluationSummary {
        let started = Instant::now();
        let mut results = Vec::with_capacity(cases.len());

        for case in cases {
            info!(case = %case.name, "evaluating case");
            let (document, truth) = match load_case(case) {
                Ok(loaded) => loaded,
                Err(e) => {
                    warn!(case = %case.name, error = %e, "skipping case");
                    continue;
                }
            };

            let metrics = self.evaluate_case(&case.name, &document, &truth).await;
            info!(
                case = %case.name,
                pairs = metrics.num_pairs,
                mae = metrics.mae_score,
                similarity = metrics.mean_explanation_similarity,
                "case evaluated"
            );
            results.push(metrics);
        }

        let summary = EvaluationSummary::from_cases(results, self.params.clone(), Utc::now());
        info!(
            cases = summary.total_cases,
            pairs = summary.total_pairs,
            weighted_mae = summary.weighted_mae_score,
            elapsed_secs = started.elapsed().as_secs_f64(),
            "evaluation complete"
        );
        summary
    }
}

fn load_case(case: &GroundTruthCase) -> Result<(String, GroundTruth)> {
    if !case.document_path.exists() {
        return Err(AuditError::ArtifactNotFound(case.document_path.clone()));
    }
    let document =
        fs::read_to_string(&case.document_path).map_err(|e| AuditError::io(&case.document_path, e))?;
    let truth = GroundTruth::load(&case.report_path)?;
    Ok((document, truth))
}

/// Join a report to its ground truth by mapped id and compute case metrics.
///
/// Rows present on only one side are listed and skipped. Score pairs where
/// either side is "N/A" are excluded from MAE. A failed similarity embedding
/// drops that pair from the similarity mean only.
pub async fn compare_report<E: EmbeddingProvider>(
    name: &str,
    report: &AuditReport,
    truth: &GroundTruth,
    embedder: &E,
) -> CaseMetrics {
    let mut metrics = CaseMetrics {
        name: name.to_string(),
        ..Default::default()
    };
    let mut expected = Vec::new();
    let mut predicted = Vec::new();
    let mut similarities = Vec::new();

    for row in &report.requirements {
        let Some(label) = truth.get(&row.mapped_id) else {
            warn!(case = name, mapped_id = %row.mapped_id, "prediction has no ground truth row");
            metrics.unmatched_predictions.push(row.mapped_id.clone());
            continue;
        };

        match (label.score, row.score.as_f64()) {
            (Some(e), Some(p)) => {
                expected.push(e);
                predicted.push(p);
            }
            _ => metrics.excluded_not_available += 1,
        }

        if label.notes.trim().is_empty() || row.auditor_notes.trim().is_empty() {
            continue;
        }
        match explanation_similarity(embedder, &label.notes, &row.auditor_notes).await {
            Ok(s) => similarities.push(s),
            Err(e) => warn!(case = name, mapped_id = %row.mapped_id, error = %e, "similarity failed"),
        }
    }

    for label in truth.iter() {
        if report.find(&label.mapped_id).is_none() {
            warn!(case = name, mapped_id = %label.mapped_id, "ground truth row has no prediction");
            metrics.unmatched_ground_truth.push(label.mapped_id.clone());
        }
    }

    metrics.num_pairs = expected.len();
    metrics.mae_score = mean_absolute_error(&expected, &predicted);
    metrics.num_similarity_pairs = similarities.len();
    if !similarities.is_empty() {
        metrics.mean_explanation_similarity =
            similarities.iter().sum::<f64>() / similarities.len() as f64;
    }
    metrics
}

/// Write the summary and append it to the history file, if any.
pub fn persist_summary(
    summary: &EvaluationSummary,
    metrics_output: &Path,
    history_output: Option<&Path>,
) -> Result<()> {
    save_artifact(summary, metrics_output)?;
    info!(path = %metrics_output.display(), "wrote metrics");
    if let Some(history) = history_output {
        append_json_line(summary, history)?;
    }
    Ok(())
}
