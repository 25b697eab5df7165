//! Evaluation harness for measuring audit accuracy.
//!
//! This module provides:
//! - Ground-truth report loading (CSV, keyed by mapped id)
//! - Metrics: score MAE and explanation similarity, pair-weighted across cases
//! - A harness that audits labelled documents and persists the summary

pub mod ground_truth;
pub mod harness;
pub mod metrics;

pub use ground_truth::{GroundTruth, GroundTruthRow};
pub use harness::{EvaluationHarness, compare_report, persist_summary};
pub use metrics::{
    CaseMetrics, EvaluationSummary, RunParams, explanation_similarity, mean_absolute_error,
};
