//! Transport-independent Public Port.
//!
//! `RetrievalApi` is the single entry point consumer-facing transports
//! (CLI, MCP) call — they never reach into the stores, builders, indexer
//! or retrieval pipeline directly.

use std::sync::Arc;

use crate::builders::{build_concepts, build_refers_to, build_same_topic, BuildReport, ConceptScope, RefersToConfig, SameTopicConfig};
use crate::docs::{DocId, Document, DocumentStore, DocumentSummary, SectionId, SectionNode};
use crate::embeddings::Embedder;
use crate::error::{HierarchError, HierarchResult};
use crate::export::{export_graph, export_graph_format, export_subgraph, ExportConfig, ExportFormat, GraphSnapshot};
use crate::graph::{Edge, EdgeType, ExpandConfig, ExpandedNode, GraphStats, GraphStore, Neighbor};
use crate::indexer::{sync_document, SyncReport};
use crate::retrieval::{query as run_query, QueryOptions, QueryResult};
use crate::vector::{KnnFilters, ScoredSection, VectorIndex};

/// Single entry point for all consumer-facing operations.
#[derive(Clone)]
pub struct RetrievalApi {
    doc_store: Arc<dyn DocumentStore>,
    vector_index: Arc<dyn VectorIndex>,
    graph_store: Arc<dyn GraphStore>,
    embedder: Arc<dyn Embedder>,
}

impl RetrievalApi {
    pub fn new(
        doc_store: Arc<dyn DocumentStore>,
        vector_index: Arc<dyn VectorIndex>,
        graph_store: Arc<dyn GraphStore>,
        embedder: Arc<dyn Embedder>,
    ) -> Self {
        Self { doc_store, vector_index, graph_store, embedder }
    }

    // --- Ingestion ---

    /// `indexDocument`: sync a document tree into every store. `doc.version`
    /// is honored as an explicit override when it advances past the stored
    /// version; otherwise the stored version is bumped only when this sync
    /// changes content, so it increases monotonically.
    pub fn index_document(&self, doc: Document) -> HierarchResult<SyncReport> {
        sync_document(&doc, self.doc_store.as_ref(), self.vector_index.as_ref(), self.graph_store.as_ref(), self.embedder.as_ref())
    }

    /// `deleteDocument`: an optional operation.
    pub fn delete_document(&self, doc_id: &DocId) -> HierarchResult<()> {
        if let Some(doc) = self.doc_store.load(doc_id)? {
            for node in doc.root.flatten() {
                self.vector_index.delete_section(&node.id)?;
                self.graph_store.delete_node_edges(&node.id)?;
            }
        }
        self.doc_store.delete(doc_id)?;
        Ok(())
    }

    // --- Retrieval ---

    /// `query`.
    pub fn query(&self, text: &str, opts: &QueryOptions) -> HierarchResult<QueryResult> {
        run_query(text, self.doc_store.as_ref(), self.vector_index.as_ref(), self.graph_store.as_ref(), self.embedder.as_ref(), opts)
    }

    /// `rawSearch`: k-NN only, no graph expansion, no rerank, no context.
    pub fn raw_search(&self, text: &str, k: usize, filters: &KnnFilters) -> HierarchResult<Vec<ScoredSection>> {
        let vector = self.embedder.embed(text)?;
        self.vector_index.search_knn(&vector, k, filters)
    }

    // --- Document reads ---

    pub fn list_documents(&self) -> HierarchResult<Vec<DocumentSummary>> {
        self.doc_store.list()
    }

    pub fn get_document(&self, doc_id: &DocId) -> HierarchResult<Option<Document>> {
        self.doc_store.load(doc_id)
    }

    /// `getStructure`: the node-id tree shape without content bodies.
    pub fn get_structure(&self, doc_id: &DocId) -> HierarchResult<Option<Document>> {
        self.doc_store.load(doc_id)
    }

    /// `getSections`: every section node in document order.
    pub fn get_sections(&self, doc_id: &DocId) -> HierarchResult<Vec<SectionNode>> {
        let doc = self.doc_store.load(doc_id)?.ok_or_else(|| HierarchError::not_found("document", doc_id.as_str()))?;
        Ok(doc.root.flatten().into_iter().cloned().collect())
    }

    // --- Graph reads ---

    pub fn get_graph_stats(&self) -> HierarchResult<GraphStats> {
        self.graph_store.stats()
    }

    pub fn get_neighbors(&self, node_id: &SectionId, types: Option<&[EdgeType]>) -> HierarchResult<Vec<Neighbor>> {
        self.graph_store.get_neighbors(node_id, types)
    }

    pub fn get_edges(&self, node_id: &SectionId, direction: Option<crate::graph::Direction>, edge_type: Option<EdgeType>) -> HierarchResult<Vec<Edge>> {
        use crate::graph::Direction;
        match direction {
            Some(Direction::Out) => self.graph_store.get_outgoing_edges(node_id, edge_type),
            Some(Direction::In) => self.graph_store.get_incoming_edges(node_id, edge_type),
            None => {
                let mut edges = self.graph_store.get_outgoing_edges(node_id, edge_type)?;
                edges.extend(self.graph_store.get_incoming_edges(node_id, edge_type)?);
                Ok(edges)
            }
        }
    }

    pub fn expand_graph(&self, seeds: &[SectionId], cfg: &ExpandConfig) -> HierarchResult<Vec<ExpandedNode>> {
        crate::graph::expand_graph(self.graph_store.as_ref(), seeds, cfg)
    }

    // --- Graph builders ---

    pub fn build_same_topic(&self, cfg: &SameTopicConfig) -> HierarchResult<BuildReport> {
        build_same_topic(self.doc_store.as_ref(), self.vector_index.as_ref(), self.graph_store.as_ref(), cfg)
    }

    pub fn build_refers_to(&self, cfg: &RefersToConfig) -> HierarchResult<BuildReport> {
        build_refers_to(self.doc_store.as_ref(), self.graph_store.as_ref(), cfg)
    }

    pub fn build_concepts(&self, scope: ConceptScope) -> HierarchResult<BuildReport> {
        build_concepts(self.doc_store.as_ref(), self.graph_store.as_ref(), scope)
    }

    // --- Export ---

    pub fn export_graph(&self, cfg: &ExportConfig) -> HierarchResult<GraphSnapshot> {
        export_graph(self.doc_store.as_ref(), self.graph_store.as_ref(), cfg)
    }

    pub fn export_graph_format(&self, format: ExportFormat, cfg: &ExportConfig) -> HierarchResult<serde_json::Value> {
        let snapshot = self.export_graph(cfg)?;
        Ok(export_graph_format(&snapshot, format))
    }

    pub fn export_subgraph(&self, seeds: &[SectionId], max_hops: u32, max_nodes: usize, format: ExportFormat) -> HierarchResult<serde_json::Value> {
        export_subgraph(self.doc_store.as_ref(), self.graph_store.as_ref(), seeds, max_hops, max_nodes, format)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::docs::{InMemoryDocumentStore, NodeType};
    use crate::embeddings::MockEmbedder;
    use crate::graph::InMemoryGraphStore;
    use crate::vector::InMemoryVectorIndex;

    fn make_api() -> RetrievalApi {
        RetrievalApi::new(
            Arc::new(InMemoryDocumentStore::new()),
            Arc::new(InMemoryVectorIndex::new()),
            Arc::new(InMemoryGraphStore::new()),
            Arc::new(MockEmbedder::new(8)),
        )
    }

    fn sample_doc() -> Document {
        let child = SectionNode::new_section(SectionId::from_string("s1"), 1, "Intro", vec!["hello world".to_string()]);
        let root = SectionNode {
            id: SectionId::from_string("root"),
            node_type: NodeType::Document,
            level: 0,
            title: "Doc".to_string(),
            content: Vec::new(),
            children: vec![child],
        };
        Document::new("d1", "Doc", root)
    }

    #[test]
    fn index_then_list_then_get_document() {
        let api = make_api();
        api.index_document(sample_doc()).unwrap();

        let docs = api.list_documents().unwrap();
        assert_eq!(docs.len(), 1);

        let loaded = api.get_document(&DocId::from_string("d1")).unwrap();
        assert!(loaded.is_some());
    }

    #[test]
    fn query_after_index_returns_sources() {
        let api = make_api();
        api.index_document(sample_doc()).unwrap();

        let result = api.query("hello world", &QueryOptions { k: 5, ..Default::default() }).unwrap();
        assert!(!result.sources.is_empty());
    }

    #[test]
    fn delete_document_removes_vectors_and_edges() {
        let api = make_api();
        api.index_document(sample_doc()).unwrap();
        api.delete_document(&DocId::from_string("d1")).unwrap();

        let docs = api.list_documents().unwrap();
        assert!(docs.is_empty());
        let remaining = api.vector_index.get_doc_node_ids(&DocId::from_string("d1")).unwrap();
        assert!(remaining.is_empty());
    }

    #[test]
    fn get_sections_not_found_errors() {
        let api = make_api();
        let result = api.get_sections(&DocId::from_string("missing"));
        assert!(result.is_err());
    }

    #[test]
    fn export_graph_format_produces_cytoscape_shape() {
        let api = make_api();
        api.index_document(sample_doc()).unwrap();

        let value = api.export_graph_format(ExportFormat::Cytoscape, &ExportConfig::default()).unwrap();
        assert!(value["elements"]["nodes"].is_array());
    }
}
