//! Accuracy metrics for audit runs.

use crate::embedding::{EmbeddingProvider, cosine_similarity};
use crate::error::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Mean absolute error between paired scores. Empty input gives 0.0.
pub fn mean_absolute_error(expected: &[f64], predicted: &[f64]) -> f64 {
    let n = expected.len().min(predicted.len());
    if n == 0 {
        return 0.0;
    }
    let total: f64 = expected
        .iter()
        .zip(predicted)
        .map(|(e, p)| (e - p).abs())
        .sum();
    total / n as f64
}

/// Semantic similarity of two explanations, in [-1, 1].
///
/// Identical strings score 1.0 without embedding. If either side is empty
/// the result is 0.0.
pub async fn explanation_similarity<E: EmbeddingProvider>(
    embedder: &E,
    expected: &str,
    predicted: &str,
) -> Result<f64> {
    let (expected, predicted) = (expected.trim(), predicted.trim());
    if expected.is_empty() || predicted.is_empty() {
        return Ok(0.0);
    }
    if expected == predicted {
        return Ok(1.0);
    }

    let vectors = embedder
        .embed_batch(&[expected.to_string(), predicted.to_string()])
        .await?;
    let similarity = match vectors.as_slice() {
        [a, b] => cosine_similarity(a, b) as f64,
        _ => 0.0,
    };
    Ok(similarity.clamp(-1.0, 1.0))
}

/// Metrics for one (document, ground truth) case.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CaseMetrics {
    pub name: String,
    /// Score pairs used for MAE.
    pub num_pairs: usize,
    pub mae_score: f64,
    /// Explanation pairs where both sides were non-empty.
    pub num_similarity_pairs: usize,
    pub mean_explanation_similarity: f64,
    /// Matched rows left out of MAE because a side was "N/A".
    pub excluded_not_available: usize,
    pub unmatched_predictions: Vec<String>,
    pub unmatched_ground_truth: Vec<String>,
}

/// Parameters recorded alongside a run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunParams {
    pub llm_model: String,
    pub llm_temperature: f32,
    pub precompute_top_k: usize,
    pub random_seed: u64,
}

/// Aggregate over all cases, weighted by pair count.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationSummary {
    pub timestamp: DateTime<Utc>,
    pub params: RunParams,
    pub total_cases: usize,
    pub total_pairs: usize,
    pub weighted_mae_score: f64,
    pub total_similarity_pairs: usize,
    pub weighted_explanation_similarity: f64,
    pub cases: Vec<CaseMetrics>,
}

impl EvaluationSummary {
    pub fn from_cases(cases: Vec<CaseMetrics>, params: RunParams, timestamp: DateTime<Utc>) -> Self {
        let total_pairs: usize = cases.iter().map(|c| c.num_pairs).sum();
        let total_similarity_pairs: usize = cases.iter().map(|c| c.num_similarity_pairs).sum();

        let weighted_mae_score = weighted_mean(&cases, |c| c.mae_score, |c| c.num_pairs);
        let weighted_explanation_similarity = weighted_mean(
            &cases,
            |c| c.mean_explanation_similarity,
            |c| c.num_similarity_pairs,
        );

        Self {
            timestamp,
            params,
            total_cases: cases.len(),
            total_pairs,
            weighted_mae_score,
            total_similarity_pairs,
            weighted_explanation_similarity,
            cases,
        }
    }
}

fn weighted_mean(
    cases: &[CaseMetrics],
    value: impl Fn(&CaseMetrics) -> f64,
    weight: impl Fn(&CaseMetrics) -> usize,
) -> f64 {
    let total: usize = cases.iter().map(&weight).sum();
    if total == 0 {
        return 0.0;
    }
    cases
        .iter()
        .map(|c| value(c) * weight(c) as f64)
        .sum::<f64>()
        / total as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::HashingEmbedder;

    #[test]
    fn test_mean_absolute_error() {
        let mae = mean_absolute_error(&[3.0, 3.0, 5.0], &[3.0, 4.0, 5.0]);
        assert!((mae - 1.0 / 3.0).abs() < 1e-12);
        assert_eq!(mean_absolute_error(&[], &[]), 0.0);
    }

    #[test]
    fn test_similarity_edge_cases() {
        let embedder = HashingEmbedder::new(32);
        let notes = "Risk process documented in section 4.";
        let similarity =
            |a: &str, b: &str| tokio_test::block_on(explanation_similarity(&embedder, a, b)).unwrap();

        assert_eq!(similarity(notes, notes), 1.0);
        assert_eq!(similarity("", notes), 0.0);
        assert_eq!(similarity(notes, "  "), 0.0);
    }

    #[tokio::test]
    async fn test_similarity_is_bounded() {
        let embedder = HashingEmbedder::new(32);
        let s = explanation_similarity(&embedder, "risk process documented", "no risk process")
            .await
            .unwrap();
        assert!((-1.0..=1.0).contains(&s));
        assert!(s > 0.0);
    }

    #[test]
    fn test_summary_is_pair_weighted() {
        let case = |name: &str, pairs, mae| CaseMetrics {
            name: name.to_string(),
            num_pairs: pairs,
            mae_score: mae,
            ..Default::default()
        };
        let summary = EvaluationSummary::from_cases(
            vec![case("small", 1, 4.0), case("large", 3, 0.0)],
            RunParams::default(),
            Utc::now(),
        );

        assert_eq!(summary.total_cases, 2);
        assert_eq!(summary.total_pairs, 4);
        assert!((summary.weighted_mae_score - 1.0).abs() < 1e-12);
        assert_eq!(summary.weighted_explanation_similarity, 0.0);
    }
}
