//! Hierarch: a hierarchical document index with graph-aware retrieval over
//! a typed knowledge graph.
//!
//! # Core Concepts
//!
//! - **Documents**: trees of [`docs::SectionNode`]s, the atomic unit of
//!   retrieval.
//! - **Graph**: typed, weighted, directed edges connecting section and
//!   concept nodes (hierarchy, semantic similarity, references, mentions).
//! - **Retrieval**: vector k-NN seeding, optionally expanded across the
//!   graph and reranked by edge type, hop distance and vector similarity.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use hierarch::{RetrievalApi, InMemoryDocumentStore, InMemoryVectorIndex, InMemoryGraphStore, MockEmbedder};
//!
//! let api = RetrievalApi::new(
//!     Arc::new(InMemoryDocumentStore::new()),
//!     Arc::new(InMemoryVectorIndex::new()),
//!     Arc::new(InMemoryGraphStore::new()),
//!     Arc::new(MockEmbedder::new(8)),
//! );
//! ```

mod api;
pub mod builders;
pub mod config;
pub mod docs;
pub mod embeddings;
pub mod error;
pub mod export;
pub mod extractor;
pub mod graph;
pub mod indexer;
#[cfg(feature = "mcp")]
pub mod mcp;
pub mod retrieval;
pub mod vector;

pub use api::RetrievalApi;
pub use builders::{
    build_concepts, build_refers_to, build_same_topic, BuildReport, ConceptScope, RefersToConfig,
    SameTopicConfig,
};
pub use config::HierarchConfig;
pub use docs::{
    content_hash, derive_section_id, parse_markdown_to_tree, short_hash, slugify, DocId, Document,
    DocumentStore, DocumentSummary, InMemoryDocumentStore, JsonDocumentStore, NodeIndexEntry,
    NodeType, SectionId, SectionNode,
};
pub use embeddings::{Embedder, EmbeddingError, MockEmbedder, RetryConfig, RetryingEmbedder};
pub use error::{HierarchError, HierarchResult};
pub use export::{
    export_graph, export_graph_format, export_subgraph, ExportConfig, ExportEdge, ExportFormat,
    ExportNode, ExportStats, GraphSnapshot,
};
pub use extractor::{extract, Entity, EntityType};
pub use graph::{
    expand_graph, Direction, Edge, EdgeType, ExpandConfig, ExpandedNode, GraphStats, GraphStore,
    InMemoryGraphStore, Neighbor, SqliteGraphStore,
};
pub use indexer::{sync_document, SyncReport};
pub use retrieval::{query, QueryOptions, QueryResult, RerankConfig, RerankStrategy, Source};
pub use vector::{
    cosine_distance, InMemoryVectorIndex, KnnFilters, ScoredSection, SectionMeta,
    SqliteVectorIndex, VectorIndex, D_MAX,
};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
