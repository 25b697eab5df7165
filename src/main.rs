//! Compliance Auditor CLI
//!
//! Runs the pipeline stages (ingest, index, precompute) and audits documents
//! against the requirement catalog.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use compliance_auditor::{
    audit::{AuditRequest, AuditService, Score},
    catalog::RequirementCatalog,
    config::Config,
    embedding::Embedder,
    indexer::{ChunkIndexer, IndexStatus, IndexerOptions, status_path},
    ingest::{Chunk, SourceDocument, ingest_corpus, normalize_text},
    llm::LlmClient,
    persistence::{artifact_exists, artifact_size, load_artifact, save_artifact},
    retrieval::RetrievalPrecomputer,
    vector::LocalVectorStore,
};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing_subscriber::EnvFilter;

/// Compliance Auditor - retrieval-augmented auditing against regulatory requirements
#[derive(Parser)]
#[command(name = "compliance-audit")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the YAML configuration file (default: ./params.yaml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract and chunk the PDF corpus
    Ingest,

    /// Embed chunks and rebuild the vector collection
    Index,

    /// Retrieve and cache the top-K chunks for every requirement
    Precompute,

    /// Audit a document against every requirement
    Audit {
        /// Path to the document (text or PDF)
        document: PathBuf,

        /// Write the report as JSON to this path
        #[arg(long)]
        debug_dump: Option<PathBuf>,

        /// Judge at most this many requirements
        #[arg(long)]
        max_requirements: Option<usize>,

        /// Print the report as JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Show pipeline artifacts and audit readiness
    Status,

    /// Test LLM connection
    Test,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Ingest => cmd_ingest(&config),
        Commands::Index => cmd_index(&config).await,
        Commands::Precompute => cmd_precompute(&config).await,
        Commands::Audit {
            document,
            debug_dump,
            max_requirements,
            json,
        } => cmd_audit(config, document, debug_dump, max_requirements, json).await,
        Commands::Status => cmd_status(&config),
        Commands::Test => cmd_test(&config).await,
    }
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    let config = Config::load_with_path(path).context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

fn cmd_ingest(config: &Config) -> Result<()> {
    let ingestion = &config.ingestion;
    println!("Ingesting corpus: {}", ingestion.raw_data_dir.display());
    println!(
        "  chunk_size={} chunk_overlap={}",
        ingestion.chunk_size, ingestion.chunk_overlap
    );

    let start = Instant::now();
    let (chunks, report) = ingest_corpus(ingestion).context("Failed to ingest corpus")?;

    let output = ingestion.chunks_path();
    save_artifact(&chunks, &output).context("Failed to save chunks")?;

    println!("\nIngestion complete in {:.2?}", start.elapsed());
    println!("  Sources:  {}", report.sources.len());
    println!("  Chunks:   {}", report.total_chunks);
    if !report.skipped.is_empty() {
        println!("  Skipped:  {}", report.skipped.len());
        for skipped in &report.skipped {
            println!("    {} ({})", skipped.path.display(), skipped.reason);
        }
    }
    if chunks.is_empty() {
        println!("  No PDF files produced chunks; the index will be empty.");
    }
    println!("Chunks saved to: {}", output.display());

    Ok(())
}

async fn cmd_index(config: &Config) -> Result<()> {
    let chunks_path = config.ingestion.chunks_path();
    if !artifact_exists(&chunks_path) {
        anyhow::bail!(
            "Chunks not found at '{}'. Run 'ingest' command first.",
            chunks_path.display()
        );
    }
    let chunks: Vec<Chunk> = load_artifact(&chunks_path).context("Failed to load chunks")?;

    let vectorization = &config.vectorization;
    println!(
        "Indexing {} chunks into '{}' at {}",
        chunks.len(),
        vectorization.collection_name,
        vectorization.vector_index_path.display()
    );
    println!("Using embedding model: {}", config.embedding.model);

    let embedder = Embedder::from_config(config).context("Failed to create embedder")?;
    let mut store = LocalVectorStore::create(&vectorization.vector_index_path)
        .context("Failed to open vector index")?;
    let options = IndexerOptions {
        batch_size: config.embedding.batch_size,
        status_path: Some(status_path(&vectorization.vector_index_path)),
    };

    let start = Instant::now();
    let status = ChunkIndexer::with_options(&embedder, &mut store, options)
        .index(&vectorization.collection_name, vectorization.distance, &chunks)
        .await
        .context("Failed to build index")?;

    println!("\nIndex built in {:.2?}", start.elapsed());
    println!("  Points:     {}", status.count);
    println!("  Dimension:  {}", status.dimension);
    println!("  Distance:   {:?}", status.distance);
    println!("Precomputed requirement chunks are now stale; run 'precompute'.");

    Ok(())
}

async fn cmd_precompute(config: &Config) -> Result<()> {
    let vectorization = &config.vectorization;
    let catalog =
        RequirementCatalog::load(&config.audit.catalog_path).context("Failed to load catalog")?;
    let store = LocalVectorStore::open(&vectorization.vector_index_path).with_context(|| {
        format!(
            "Vector index not found at '{}'. Run 'index' command first.",
            vectorization.vector_index_path.display()
        )
    })?;
    let embedder = Embedder::from_config(config).context("Failed to create embedder")?;

    println!(
        "Precomputing top-{} chunks for {} requirements",
        config.precompute.top_k,
        catalog.len()
    );

    let start = Instant::now();
    let precomputer = RetrievalPrecomputer::new(
        &embedder,
        &store,
        &vectorization.collection_name,
        config.precompute.top_k,
    );
    let (cache, report) = precomputer
        .precompute(&catalog)
        .await
        .context("Precompute failed")?;

    cache
        .save(&config.precompute.chunks_output)
        .context("Failed to save requirement chunks")?;

    println!("\nPrecompute complete in {:.2?}", start.elapsed());
    println!("  Cached:  {}/{}", report.cached, report.requirements);
    for failed in &report.failed {
        println!("  Failed:  {} ({})", failed.requirement, failed.reason);
    }
    println!(
        "Requirement chunks saved to: {}",
        config.precompute.chunks_output.display()
    );

    Ok(())
}

/// Read a document as text; PDFs go through the extractor.
fn read_document(path: &Path) -> Result<String> {
    let is_pdf = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("pdf"));

    if is_pdf {
        let document = SourceDocument::from_pdf(path).context("Failed to extract PDF text")?;
        Ok(normalize_text(&document.raw_content()))
    } else {
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
    }
}

async fn cmd_audit(
    mut config: Config,
    document_path: PathBuf,
    debug_dump: Option<PathBuf>,
    max_requirements: Option<usize>,
    json: bool,
) -> Result<()> {
    if debug_dump.is_some() {
        config.audit.debug_dump_path = debug_dump;
    }
    if max_requirements.is_some() {
        config.audit.max_requirements = max_requirements;
    }

    let document = read_document(&document_path)?;
    let service = AuditService::start(&config, LlmClient::from_config(&config));
    let status = service.status();
    if !status.ready {
        anyhow::bail!(
            "Audit service not ready: {}",
            status.reason.unwrap_or_default()
        );
    }

    if !json {
        println!("Auditing: {}", document_path.display());
        println!(
            "  Requirements: {}  Cached: {}  Model: {}",
            status.requirements,
            status.cached_requirements,
            status.judge.unwrap_or_default()
        );
        println!();
    }

    let start = Instant::now();
    let response = service
        .audit(&AuditRequest::new(document))
        .await
        .context("Audit failed")?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&response).context("Failed to serialize report")?
        );
        return Ok(());
    }

    println!("{}", "─".repeat(60));
    for row in &response.requirements {
        println!("{:<12} {:>3}  {}", row.mapped_id, row.score, row.requirement_name);
        println!("    {}", row.auditor_notes);
    }
    println!("{}", "─".repeat(60));

    let not_available = response
        .requirements
        .iter()
        .filter(|r| r.score == Score::NotAvailable)
        .count();
    match response.mean_score() {
        Some(mean) => println!("Mean score: {:.2} / 5", mean),
        None => println!("Mean score: n/a"),
    }
    println!(
        "{} requirements ({} N/A) in {:.2?}",
        response.requirements.len(),
        not_available,
        start.elapsed()
    );

    Ok(())
}

fn print_artifact(label: &str, path: &Path) {
    if artifact_exists(path) {
        let size = artifact_size(path).unwrap_or(0);
        println!("  {:<20} {} ({:.1} KB)", label, path.display(), size as f64 / 1024.0);
    } else {
        println!("  {:<20} {} (missing)", label, path.display());
    }
}

fn cmd_status(config: &Config) -> Result<()> {
    println!("Pipeline Artifacts");
    println!("{}", "─".repeat(40));
    print_artifact("Chunks:", &config.ingestion.chunks_path());
    print_artifact("Catalog:", &config.audit.catalog_path);
    print_artifact("Requirement chunks:", &config.precompute.chunks_output);

    let marker = status_path(&config.vectorization.vector_index_path);
    match IndexStatus::load(&marker) {
        Ok(status) => println!(
            "  {:<20} '{}' {} points, dim {}, built {}",
            "Index:",
            status.collection,
            status.count,
            status.dimension,
            status.indexed_at.format("%Y-%m-%d %H:%M:%S UTC")
        ),
        Err(_) => println!(
            "  {:<20} {} (not indexed)",
            "Index:",
            config.vectorization.vector_index_path.display()
        ),
    }

    let service = AuditService::start(config, LlmClient::from_config(config));
    let status = service.status();

    println!();
    println!("Audit Service");
    println!("{}", "─".repeat(40));
    if status.ready {
        println!("  Ready:         yes");
        println!("  Model:         {}", status.judge.unwrap_or_default());
        println!("  Requirements:  {}", status.requirements);
        println!("  Cached:        {}", status.cached_requirements);
    } else {
        println!("  Ready:         no");
        println!("  Reason:        {}", status.reason.unwrap_or_default());
    }

    Ok(())
}

async fn cmd_test(config: &Config) -> Result<()> {
    println!("Testing LLM connection...\n");

    println!("Configuration:");
    println!("  API Base:  {}", config.llm.api_base);
    println!("  Model:     {}", config.llm.model);
    let key_preview: String = config.llm.api_key.chars().take(8).collect();
    println!("  API Key:   {}...", key_preview);
    println!();

    let client = match LlmClient::from_config(config) {
        Ok(client) => client,
        Err(e) => {
            println!("Configuration error: {}", e);
            return Ok(());
        }
    };

    println!("Sending test request...");
    match client.test_connection().await {
        Ok(()) => println!("Connection successful!"),
        Err(e) => println!("Connection failed: {}", e),
    }

    Ok(())
}
