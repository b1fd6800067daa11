//! MCP tool parameter structs with schemars-derived JSON schemas.

use schemars::JsonSchema;
use serde::Deserialize;

#[derive(Debug, Deserialize, JsonSchema)]
pub struct IndexDocumentParams {
    #[schemars(description = "Document id (stable across re-indexings of the same document)")]
    pub doc_id: String,
    #[schemars(description = "Document title")]
    pub title: String,
    #[schemars(description = "Markdown source; headings become the section tree")]
    pub markdown: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct DocIdParams {
    #[schemars(description = "Document id")]
    pub doc_id: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct QueryParams {
    #[schemars(description = "Natural-language query text")]
    pub text: String,
    #[schemars(description = "Number of k-NN seeds to retrieve (default 3)")]
    pub k: Option<usize>,
    #[schemars(description = "Expand seeds across the knowledge graph before reranking")]
    pub expand_graph: Option<bool>,
    #[schemars(description = "Restrict results to this document id")]
    pub doc_id: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct RawSearchParams {
    #[schemars(description = "Natural-language query text")]
    pub text: String,
    #[schemars(description = "Number of nearest neighbors to return (default 3)")]
    pub k: Option<usize>,
    #[schemars(description = "Restrict results to this document id")]
    pub doc_id: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct NodeIdParams {
    #[schemars(description = "Section or concept node id")]
    pub node_id: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct GetEdgesParams {
    #[schemars(description = "Section or concept node id")]
    pub node_id: String,
    #[schemars(description = "\"in\", \"out\", or omitted for both directions")]
    pub direction: Option<String>,
    #[schemars(description = "Restrict to one edge type, e.g. SAME_TOPIC")]
    pub edge_type: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ExpandGraphParams {
    #[schemars(description = "Seed node ids to expand from")]
    pub seeds: Vec<String>,
    #[schemars(description = "Maximum hops from any seed (default 2)")]
    pub max_hops: Option<u32>,
    #[schemars(description = "Maximum nodes to return, excluding seeds (default 50)")]
    pub max_nodes: Option<usize>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct BuildConceptsParams {
    #[schemars(description = "Restrict the concept rebuild to this document id; omit for the whole corpus")]
    pub doc_id: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ExportGraphParams {
    #[schemars(description = "\"cytoscape\", \"d3\", \"vis\", or \"graphml\" (default \"cytoscape\")")]
    pub format: Option<String>,
}
