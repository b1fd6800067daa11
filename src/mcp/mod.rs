//! MCP server exposing the retrieval API over the Model Context Protocol.
//!
//! Tools: ingestion (2) + retrieval (2) + document reads (3) + graph reads
//! (3) + graph builders (3) + export (1) = 14 total, mirroring
//! [`crate::api::RetrievalApi`]'s invocation surface.

pub mod params;

use params::*;

use rmcp::{
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{CallToolResult, Content, ServerCapabilities, ServerInfo},
    tool, tool_handler, tool_router, ErrorData as McpError, ServerHandler, ServiceExt,
};

use crate::builders::{ConceptScope, RefersToConfig, SameTopicConfig};
use crate::docs::{DocId, SectionId};
use crate::export::{ExportConfig, ExportFormat};
use crate::graph::{Direction, EdgeType, ExpandConfig};
use crate::vector::KnnFilters;
use crate::{Document, HierarchError, HierarchResult, RetrievalApi};
use crate::{parse_markdown_to_tree, QueryOptions};

fn ok_text(text: String) -> Result<CallToolResult, McpError> {
    Ok(CallToolResult::success(vec![Content::text(text)]))
}

fn err_text(msg: String) -> Result<CallToolResult, McpError> {
    Ok(CallToolResult::error(vec![Content::text(msg)]))
}

fn render<T: serde::Serialize>(result: HierarchResult<T>) -> Result<CallToolResult, McpError> {
    match result {
        Ok(value) => ok_text(serde_json::to_string_pretty(&value).unwrap_or_default()),
        Err(e) => err_text(e.to_string()),
    }
}

fn parse_export_format(format: Option<&str>) -> Result<ExportFormat, HierarchError> {
    match format.unwrap_or("cytoscape") {
        "cytoscape" => Ok(ExportFormat::Cytoscape),
        "d3" => Ok(ExportFormat::D3),
        "vis" => Ok(ExportFormat::Vis),
        "graphml" => Ok(ExportFormat::Graphml),
        other => Err(HierarchError::Validation(format!("unknown export format: {other}"))),
    }
}

#[derive(Clone)]
pub struct HierarchMcpServer {
    api: RetrievalApi,
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl HierarchMcpServer {
    pub fn new(api: RetrievalApi) -> Self {
        Self { api, tool_router: Self::tool_router() }
    }

    // ── Ingestion ───────────────────────────────────────────────────────

    #[tool(description = "Index a markdown document, parsing headings into the section tree")]
    fn index_document(
        &self,
        Parameters(p): Parameters<IndexDocumentParams>,
    ) -> Result<CallToolResult, McpError> {
        let root = parse_markdown_to_tree(&p.title, &p.markdown);
        let doc = Document::new(p.doc_id, p.title, root);
        render(self.api.index_document(doc))
    }

    #[tool(description = "Delete a document and every vector/edge derived from it")]
    fn delete_document(
        &self,
        Parameters(p): Parameters<DocIdParams>,
    ) -> Result<CallToolResult, McpError> {
        match self.api.delete_document(&DocId::from_string(p.doc_id)) {
            Ok(()) => ok_text("deleted".to_string()),
            Err(e) => err_text(e.to_string()),
        }
    }

    // ── Retrieval ───────────────────────────────────────────────────────

    #[tool(description = "Run the full retrieval pipeline: embed, k-NN seed, optionally expand the graph, rerank")]
    fn query(&self, Parameters(p): Parameters<QueryParams>) -> Result<CallToolResult, McpError> {
        let opts = QueryOptions {
            k: p.k.unwrap_or(3),
            expand_graph: p.expand_graph.unwrap_or(false),
            filters: KnnFilters { doc_id: p.doc_id.map(DocId::from_string), ..Default::default() },
            ..QueryOptions::default()
        };
        match self.api.query(&p.text, &opts) {
            Ok(result) => ok_text(
                serde_json::to_string_pretty(&serde_json::json!({
                    "answer": result.answer,
                    "sources": result.sources.iter().map(|s| serde_json::json!({
                        "nodeId": s.node_id.as_str(),
                        "docId": s.doc_id.as_str(),
                        "distance": s.distance,
                        "hop": s.hop,
                        "score": s.score,
                        "context": s.context,
                    })).collect::<Vec<_>>(),
                }))
                .unwrap_or_default(),
            ),
            Err(e) => err_text(e.to_string()),
        }
    }

    #[tool(description = "k-NN vector search only, no graph expansion, no rerank, no context assembly")]
    fn raw_search(
        &self,
        Parameters(p): Parameters<RawSearchParams>,
    ) -> Result<CallToolResult, McpError> {
        let filters = KnnFilters { doc_id: p.doc_id.map(DocId::from_string), ..Default::default() };
        match self.api.raw_search(&p.text, p.k.unwrap_or(3), &filters) {
            Ok(hits) => ok_text(
                serde_json::to_string_pretty(
                    &hits
                        .iter()
                        .map(|h| serde_json::json!({"nodeId": h.meta.node_id.as_str(), "distance": h.distance}))
                        .collect::<Vec<_>>(),
                )
                .unwrap_or_default(),
            ),
            Err(e) => err_text(e.to_string()),
        }
    }

    // ── Document reads ──────────────────────────────────────────────────

    #[tool(description = "List every indexed document's id, title and version")]
    fn list_documents(&self) -> Result<CallToolResult, McpError> {
        render(self.api.list_documents())
    }

    #[tool(description = "Fetch a document's full section tree")]
    fn get_document(
        &self,
        Parameters(p): Parameters<DocIdParams>,
    ) -> Result<CallToolResult, McpError> {
        render(self.api.get_document(&DocId::from_string(p.doc_id)))
    }

    #[tool(description = "List every section node of a document in document order")]
    fn get_sections(
        &self,
        Parameters(p): Parameters<DocIdParams>,
    ) -> Result<CallToolResult, McpError> {
        render(self.api.get_sections(&DocId::from_string(p.doc_id)))
    }

    // ── Graph reads ─────────────────────────────────────────────────────

    #[tool(description = "Aggregate knowledge graph counters: total edges, edges per type, average degree")]
    fn get_graph_stats(&self) -> Result<CallToolResult, McpError> {
        render(self.api.get_graph_stats())
    }

    #[tool(description = "Direct neighbors of a node across every edge type")]
    fn get_neighbors(
        &self,
        Parameters(p): Parameters<NodeIdParams>,
    ) -> Result<CallToolResult, McpError> {
        render(self.api.get_neighbors(&SectionId::from_string(p.node_id), None))
    }

    #[tool(description = "Raw edges incident to a node, optionally filtered by direction and edge type")]
    fn get_edges(
        &self,
        Parameters(p): Parameters<GetEdgesParams>,
    ) -> Result<CallToolResult, McpError> {
        let direction = match p.direction.as_deref() {
            Some("in") => Some(Direction::In),
            Some("out") => Some(Direction::Out),
            _ => None,
        };
        let edge_type = match p.edge_type.as_deref() {
            Some(s) => match EdgeType::parse(s) {
                Ok(t) => Some(t),
                Err(e) => return err_text(e.to_string()),
            },
            None => None,
        };
        render(self.api.get_edges(&SectionId::from_string(p.node_id), direction, edge_type))
    }

    #[tool(description = "Breadth-first expansion across the knowledge graph from one or more seed nodes")]
    fn expand_graph(
        &self,
        Parameters(p): Parameters<ExpandGraphParams>,
    ) -> Result<CallToolResult, McpError> {
        let seeds: Vec<SectionId> = p.seeds.into_iter().map(SectionId::from_string).collect();
        let cfg = ExpandConfig {
            max_hops: p.max_hops.unwrap_or(2),
            max_nodes: p.max_nodes.unwrap_or(50),
            ..ExpandConfig::default()
        };
        render(self.api.expand_graph(&seeds, &cfg))
    }

    // ── Graph builders ──────────────────────────────────────────────────

    #[tool(description = "Rebuild SAME_TOPIC edges from vector similarity across the whole corpus")]
    fn build_same_topic(&self) -> Result<CallToolResult, McpError> {
        render(self.api.build_same_topic(&SameTopicConfig::default()))
    }

    #[tool(description = "Rebuild REFERS_TO edges by resolving markdown and wiki-style links in section text")]
    fn build_refers_to(&self) -> Result<CallToolResult, McpError> {
        render(self.api.build_refers_to(&RefersToConfig::default()))
    }

    #[tool(description = "Rebuild MENTIONS/DEFINES/RELATED_TO concept edges by re-running entity extraction")]
    fn build_concepts(
        &self,
        Parameters(p): Parameters<BuildConceptsParams>,
    ) -> Result<CallToolResult, McpError> {
        let scope = match p.doc_id {
            Some(id) => ConceptScope::Doc(DocId::from_string(id)),
            None => ConceptScope::All,
        };
        render(self.api.build_concepts(scope))
    }

    // ── Export ──────────────────────────────────────────────────────────

    #[tool(description = "Export the current graph in a visualization-ready shape (cytoscape, d3, vis, or graphml)")]
    fn export_graph(
        &self,
        Parameters(p): Parameters<ExportGraphParams>,
    ) -> Result<CallToolResult, McpError> {
        let format = match parse_export_format(p.format.as_deref()) {
            Ok(f) => f,
            Err(e) => return err_text(e.to_string()),
        };
        match self.api.export_graph_format(format, &ExportConfig::default()) {
            Ok(value) => {
                let rendered = if matches!(format, ExportFormat::Graphml) {
                    value.as_str().unwrap_or_default().to_string()
                } else {
                    serde_json::to_string_pretty(&value).unwrap_or_default()
                };
                ok_text(rendered)
            }
            Err(e) => err_text(e.to_string()),
        }
    }
}

#[tool_handler]
impl ServerHandler for HierarchMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "Hierarch MCP server — hierarchical document index with graph-aware retrieval".into(),
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}

/// Start the MCP server over stdio, blocking until the client disconnects.
pub fn run_mcp_server(api: RetrievalApi) -> HierarchResult<()> {
    let rt = tokio::runtime::Runtime::new().map_err(|e| HierarchError::Other(e.to_string()))?;

    rt.block_on(async {
        let server = HierarchMcpServer::new(api);
        eprintln!("hierarch mcp server starting on stdio...");

        let service = server
            .serve(rmcp::transport::stdio())
            .await
            .map_err(|e| HierarchError::Other(format!("failed to start MCP server: {e}")))?;

        service
            .waiting()
            .await
            .map_err(|e| HierarchError::Other(format!("MCP server error: {e}")))?;

        Ok(())
    })
}
