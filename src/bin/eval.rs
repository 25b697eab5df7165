//! Evaluation CLI: measures audit accuracy against hand-labelled reports.
//!
//! Usage:
//!   eval                                   # Run every configured ground-truth case
//!   eval --document doc.txt --report gt.csv
//!
//! Options:
//!   --config <path>           # Configuration file (default: ./params.yaml)
//!   --max-requirements <N>    # Judge at most N requirements per document
//!   --output <path>           # Write metrics here instead of the configured path
//!   --no-history              # Do not append to the history file

use anyhow::{Context, Result};
use clap::Parser;
use compliance_auditor::audit::AuditContext;
use compliance_auditor::config::{Config, GroundTruthCase};
use compliance_auditor::embedding::Embedder;
use compliance_auditor::eval::{EvaluationHarness, RunParams, persist_summary};
use compliance_auditor::llm::LlmClient;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "eval")]
#[command(about = "Evaluate audit accuracy against ground-truth reports", long_about = None)]
struct Cli {
    /// Path to the YAML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Evaluate a single document instead of the configured cases
    #[arg(long, requires = "report")]
    document: Option<PathBuf>,

    /// Ground-truth CSV for --document
    #[arg(long, requires = "document")]
    report: Option<PathBuf>,

    /// Judge at most this many requirements per document
    #[arg(long)]
    max_requirements: Option<usize>,

    /// Save metrics to this JSON file
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Skip appending the run to the history file
    #[arg(long)]
    no_history: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    let cli = Cli::parse();

    let mut config = Config::load_with_path(cli.config.as_deref())
        .context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;
    if cli.max_requirements.is_some() {
        config.audit.max_requirements = cli.max_requirements;
    }

    let cases = match (cli.document, cli.report) {
        (Some(document_path), Some(report_path)) => vec![GroundTruthCase {
            name: document_path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "adhoc".to_string()),
            document_path,
            report_path,
        }],
        _ => config.evaluation.ground_truth.clone(),
    };
    if cases.is_empty() {
        anyhow::bail!("No ground-truth cases configured. Add evaluation.ground_truth or pass --document/--report.");
    }

    println!("LLM API Base: {}", config.llm.api_base);
    println!("LLM Model: {}", config.llm.model);
    println!("Cases: {}", cases.len());

    let judge = LlmClient::from_config(&config).context("Failed to create LLM client")?;
    let context =
        AuditContext::initialize(&config, judge).context("Failed to initialize audit context")?;
    let embedder = Embedder::from_config(&config).context("Failed to create embedder")?;

    let params = RunParams {
        llm_model: config.llm.model.clone(),
        llm_temperature: config.llm.temperature,
        precompute_top_k: config.precompute.top_k,
        random_seed: config.evaluation.random_seed,
    };
    let harness = EvaluationHarness::new(context.evaluator(), &embedder, params);
    let summary = harness.run(&cases).await;

    let output = cli
        .output
        .unwrap_or_else(|| config.evaluation.metrics_output.clone());
    let history = if cli.no_history {
        None
    } else {
        config.evaluation.history_output.clone()
    };
    persist_summary(&summary, &output, history.as_deref()).context("Failed to save metrics")?;

    println!("\n{}", "=".repeat(60));
    println!("EVALUATION RESULTS");
    println!("{}", "=".repeat(60));
    for case in &summary.cases {
        println!(
            "  {:<24} pairs={:<4} mae={:.3} similarity={:.3}",
            case.name, case.num_pairs, case.mae_score, case.mean_explanation_similarity
        );
        if !case.unmatched_ground_truth.is_empty() {
            println!("    unmatched ground truth: {}", case.unmatched_ground_truth.join(", "));
        }
    }
    println!("{}", "-".repeat(60));
    println!("  Cases evaluated:         {}", summary.total_cases);
    println!("  Score pairs:             {}", summary.total_pairs);
    println!("  Weighted MAE:            {:.3}", summary.weighted_mae_score);
    println!(
        "  Weighted similarity:     {:.3}",
        summary.weighted_explanation_similarity
    );
    println!("\nMetrics saved to: {}", output.display());

    Ok(())
}
