//! Hierarch CLI — hierarchical document index with graph-aware retrieval.
//!
//! Usage:
//!   hierarch index <path.md>
//!   hierarch query "<text>" [--k N] [--expand-graph]
//!   hierarch build same-topic | refers-to | concepts
//!   hierarch export --format cytoscape|d3|vis|graphml
//!   hierarch mcp

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::Level;

use hierarch::{
    parse_markdown_to_tree, ConceptScope, Document, Embedder, ExportConfig, ExportFormat,
    HierarchConfig, JsonDocumentStore, MockEmbedder, QueryOptions, RefersToConfig, RetrievalApi,
    RetryConfig, RetryingEmbedder, SameTopicConfig, SqliteGraphStore, SqliteVectorIndex,
};

#[derive(Parser)]
#[command(name = "hierarch", version, about = "Hierarchical document index with graph-aware retrieval")]
struct Cli {
    /// Path to a config file (defaults to the platform config directory).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug-level logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Index a markdown file as a document.
    Index {
        /// Path to a markdown file.
        path: PathBuf,
        /// Document id (defaults to the file stem).
        #[arg(long)]
        doc_id: Option<String>,
    },
    /// Run a retrieval query against the index.
    Query {
        text: String,
        #[arg(long, default_value_t = 3)]
        k: usize,
        #[arg(long)]
        expand_graph: bool,
    },
    /// Rebuild a derived graph edge type from the current corpus.
    Build {
        #[command(subcommand)]
        target: BuildTarget,
    },
    /// Export the graph in a visualization-ready shape.
    Export {
        #[arg(long, default_value = "cytoscape")]
        format: String,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Start the MCP (Model Context Protocol) server over stdio.
    #[cfg(feature = "mcp")]
    Mcp,
}

#[derive(Subcommand)]
enum BuildTarget {
    SameTopic,
    RefersTo,
    Concepts,
}

fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt().with_max_level(level).with_target(false).init();

    if let Err(e) = run(cli) {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> hierarch::HierarchResult<()> {
    let config = HierarchConfig::load(cli.config.as_deref())?;
    let api = build_api(&config)?;

    match cli.command {
        Commands::Index { path, doc_id } => cmd_index(&api, &path, doc_id),
        Commands::Query { text, k, expand_graph } => cmd_query(&api, &text, k, expand_graph),
        Commands::Build { target } => cmd_build(&api, target),
        Commands::Export { format, out } => cmd_export(&api, &format, out),
        #[cfg(feature = "mcp")]
        Commands::Mcp => hierarch::mcp::run_mcp_server(api),
    }
}

fn build_api(config: &HierarchConfig) -> hierarch::HierarchResult<RetrievalApi> {
    for path in [&config.structured_store_path, &config.vector_store_path, &config.graph_store_path] {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let doc_store = Arc::new(JsonDocumentStore::open(&config.structured_store_path)?);
    let vector_index = Arc::new(SqliteVectorIndex::open(&config.vector_store_path)?);
    let graph_store = Arc::new(SqliteGraphStore::open(&config.graph_store_path)?);
    let embedder = build_embedder(config);
    Ok(RetrievalApi::new(doc_store, vector_index, graph_store, embedder))
}

fn build_embedder(config: &HierarchConfig) -> Arc<dyn Embedder> {
    match config.embedding_provider {
        #[cfg(feature = "local-embeddings")]
        hierarch::config::EmbeddingProvider::Local => {
            match hierarch::embeddings::FastEmbedEmbedder::default_model() {
                Ok(inner) => Arc::new(RetryingEmbedder::new(inner, RetryConfig::default())),
                Err(e) => {
                    tracing::warn!(error = %e, "falling back to mock embedder");
                    Arc::new(MockEmbedder::new(config.d_max.min(768)))
                }
            }
        }
        #[cfg(not(feature = "local-embeddings"))]
        hierarch::config::EmbeddingProvider::Local => Arc::new(MockEmbedder::new(config.d_max.min(768))),
        hierarch::config::EmbeddingProvider::Mock => Arc::new(MockEmbedder::new(config.d_max.min(768))),
    }
}

fn cmd_index(api: &RetrievalApi, path: &PathBuf, doc_id: Option<String>) -> hierarch::HierarchResult<()> {
    let markdown = std::fs::read_to_string(path)?;
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("document").to_string();
    let id = doc_id.unwrap_or(stem.clone());
    let root = parse_markdown_to_tree(&stem, &markdown);
    let doc = Document::new(id, stem, root);
    let report = api.index_document(doc)?;
    println!(
        "indexed {} nodes, skipped {}, deleted {}, failed {}",
        report.indexed.len(),
        report.skipped.len(),
        report.deleted.len(),
        report.failed.len()
    );
    for (id, err) in &report.failed {
        eprintln!("  failed: {} ({err})", id.as_str());
    }
    Ok(())
}

fn cmd_query(api: &RetrievalApi, text: &str, k: usize, expand_graph: bool) -> hierarch::HierarchResult<()> {
    let opts = QueryOptions { k, expand_graph, ..QueryOptions::default() };
    let result = api.query(text, &opts)?;
    println!("{}", result.answer);
    for source in &result.sources {
        println!(
            "  [{:.3}] {} (doc={}, hop={})",
            source.score.unwrap_or(1.0 - source.distance),
            source.node_id.as_str(),
            source.doc_id.as_str(),
            source.hop
        );
    }
    Ok(())
}

fn cmd_build(api: &RetrievalApi, target: BuildTarget) -> hierarch::HierarchResult<()> {
    let report = match target {
        BuildTarget::SameTopic => api.build_same_topic(&SameTopicConfig::default())?,
        BuildTarget::RefersTo => api.build_refers_to(&RefersToConfig { cross_document_only: false, emit_reverse: false })?,
        BuildTarget::Concepts => api.build_concepts(ConceptScope::All)?,
    };
    println!(
        "built {} edges across {} documents, {} failed",
        report.edges_written,
        report.documents_processed,
        report.documents_failed.len()
    );
    Ok(())
}

fn cmd_export(api: &RetrievalApi, format: &str, out: Option<PathBuf>) -> hierarch::HierarchResult<()> {
    let export_format = match format {
        "cytoscape" => ExportFormat::Cytoscape,
        "d3" => ExportFormat::D3,
        "vis" => ExportFormat::Vis,
        "graphml" => ExportFormat::Graphml,
        other => return Err(hierarch::HierarchError::Validation(format!("unknown export format: {other}"))),
    };
    let value = api.export_graph_format(export_format, &ExportConfig::default())?;
    let rendered = if matches!(export_format, ExportFormat::Graphml) {
        value.as_str().unwrap_or_default().to_string()
    } else {
        serde_json::to_string_pretty(&value).map_err(|e| hierarch::HierarchError::Other(e.to_string()))?
    };
    match out {
        Some(path) => std::fs::write(path, rendered)?,
        None => println!("{rendered}"),
    }
    Ok(())
}
