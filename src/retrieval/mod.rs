//! Retrieval Pipeline: embed → k-NN seed → optional graph
//! expansion → dedup → rerank (or hop/distance sort) → per-document cap.

mod context;
mod rerank;

pub use context::assemble_context;
pub use rerank::{score, RerankConfig, RerankStrategy};

use std::collections::HashMap;

use crate::docs::{DocId, Document, DocumentStore, SectionId};
use crate::embeddings::Embedder;
use crate::error::{HierarchError, HierarchResult};
use crate::graph::{expand_graph, EdgeType, ExpandConfig, GraphStore};
use crate::vector::{cosine_distance, KnnFilters, VectorIndex};

/// `query()` options, with the defaults `k=3`,
/// `expandGraph=false`, `includeContext=true`, `rerank=true`.
#[derive(Debug, Clone)]
pub struct QueryOptions {
    pub k: usize,
    pub expand_graph: bool,
    pub graph_config: ExpandConfig,
    pub include_context: bool,
    pub rerank: bool,
    pub rerank_config: RerankConfig,
    pub max_per_document: Option<usize>,
    pub filters: KnnFilters,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            k: 3,
            expand_graph: false,
            graph_config: ExpandConfig::default(),
            include_context: true,
            rerank: true,
            rerank_config: RerankConfig::default(),
            max_per_document: None,
            filters: KnnFilters::default(),
        }
    }
}

/// A single ranked retrieval result.
#[derive(Debug, Clone)]
pub struct Source {
    pub node_id: SectionId,
    pub doc_id: DocId,
    pub distance: f32,
    pub hop: u32,
    pub edge_type: Option<EdgeType>,
    pub path: Vec<SectionId>,
    pub weight: Option<f32>,
    pub context: String,
    pub score: Option<f32>,
}

/// `query()`'s return value. `answer` is always a non-empty deterministic
/// templated string, not intended for parsing.
#[derive(Debug, Clone)]
pub struct QueryResult {
    pub answer: String,
    pub sources: Vec<Source>,
}

/// Run the full retrieval pipeline end to end.
pub fn query(
    text: &str,
    doc_store: &dyn DocumentStore,
    vector_index: &dyn VectorIndex,
    graph_store: &dyn GraphStore,
    embedder: &dyn Embedder,
    opts: &QueryOptions,
) -> HierarchResult<QueryResult> {
    if text.trim().is_empty() {
        return Err(HierarchError::Validation("query text must not be empty".to_string()));
    }
    if opts.k == 0 {
        return Err(HierarchError::Validation("k must be at least 1".to_string()));
    }

    let span = tracing::info_span!("hierarch.query", k = opts.k, expand_graph = opts.expand_graph);
    let _enter = span.enter();

    // Step 1.
    let query_vector = embedder.embed(text)?;

    // Step 2.
    let seeds = vector_index.search_knn(&query_vector, opts.k, &opts.filters)?;
    tracing::debug!(seed_count = seeds.len(), "k-NN seeding complete");
    if seeds.is_empty() {
        return Ok(QueryResult {
            answer: "no relevant documents".to_string(),
            sources: Vec::new(),
        });
    }

    let mut doc_cache: HashMap<DocId, Document> = HashMap::new();

    // Step 3: seeds at hop 0, insertion order preserved for P5 tie-breaks.
    let mut order: Vec<SectionId> = Vec::new();
    let mut candidates: HashMap<SectionId, Source> = HashMap::new();

    for seed in &seeds {
        let doc = load_doc(doc_store, &mut doc_cache, &seed.meta.doc_id)?;
        let Some(node) = doc.find_node(&seed.meta.node_id) else {
            continue;
        };
        let context = assemble_context(&doc, node, opts.include_context);
        order.push(seed.meta.node_id.clone());
        candidates.insert(
            seed.meta.node_id.clone(),
            Source {
                node_id: seed.meta.node_id.clone(),
                doc_id: seed.meta.doc_id.clone(),
                distance: seed.distance,
                hop: 0,
                edge_type: None,
                path: vec![seed.meta.node_id.clone()],
                weight: None,
                context,
                score: None,
            },
        );
    }

    // Step 4: graph expansion, hop 0 entries (the seeds themselves) dropped.
    if opts.expand_graph {
        let seed_ids: Vec<SectionId> = seeds.iter().map(|s| s.meta.node_id.clone()).collect();
        let expanded = expand_graph(graph_store, &seed_ids, &opts.graph_config)?;
        tracing::debug!(expanded_count = expanded.len(), "graph expansion complete");

        for node in expanded {
            if node.hop == 0 {
                continue;
            }
            let Some(meta) = vector_index.get_section_meta(&node.node_id)? else {
                continue;
            };
            let Some(vector) = vector_index.get_section_vector(&node.node_id)? else {
                continue;
            };
            let doc = load_doc(doc_store, &mut doc_cache, &meta.doc_id)?;
            let Some(section) = doc.find_node(&node.node_id) else {
                continue;
            };
            let distance = cosine_distance(&query_vector, &vector);
            let context = assemble_context(&doc, section, opts.include_context);
            let candidate = Source {
                node_id: node.node_id.clone(),
                doc_id: meta.doc_id,
                distance,
                hop: node.hop,
                edge_type: node.edge_type,
                path: node.path,
                weight: node.weight,
                context,
                score: None,
            };

            // Step 5: keep the lowest-distance source when duplicates arise.
            match candidates.get(&node.node_id) {
                Some(existing) if existing.distance <= candidate.distance => {}
                None => {
                    order.push(node.node_id.clone());
                    candidates.insert(node.node_id, candidate);
                }
                Some(_) => {
                    candidates.insert(node.node_id, candidate);
                }
            }
        }
    }

    let mut sources: Vec<Source> = order.into_iter().filter_map(|id| candidates.remove(&id)).collect();

    // Steps 6-7.
    if opts.rerank {
        for source in &mut sources {
            source.score = Some(score(source.distance, source.hop, source.edge_type, source.weight, &opts.rerank_config));
        }
        sources.retain(|s| s.score.unwrap_or(0.0) >= opts.rerank_config.min_score);
        sources.sort_by(|a, b| b.score.unwrap().partial_cmp(&a.score.unwrap()).unwrap());
        if let Some(cap) = opts.max_per_document {
            let mut seen_per_doc: HashMap<DocId, usize> = HashMap::new();
            sources.retain(|s| {
                let count = seen_per_doc.entry(s.doc_id.clone()).or_insert(0);
                if *count < cap {
                    *count += 1;
                    true
                } else {
                    false
                }
            });
        }
    } else {
        sources.sort_by(|a, b| a.hop.cmp(&b.hop).then(a.distance.partial_cmp(&b.distance).unwrap()));
    }
    tracing::debug!(final_count = sources.len(), "reranking complete");

    // Step 8.
    let answer = format!(
        "Found {} relevant section{}{}.",
        sources.len(),
        if sources.len() == 1 { "" } else { "s" },
        if opts.expand_graph { " via graph-expanded retrieval" } else { "" }
    );

    Ok(QueryResult { answer, sources })
}

fn load_doc(
    doc_store: &dyn DocumentStore,
    cache: &mut HashMap<DocId, Document>,
    doc_id: &DocId,
) -> HierarchResult<Document> {
    if let Some(doc) = cache.get(doc_id) {
        return Ok(doc.clone());
    }
    let doc = doc_store
        .load(doc_id)?
        .ok_or_else(|| HierarchError::not_found("document", doc_id.as_str()))?;
    cache.insert(doc_id.clone(), doc.clone());
    Ok(doc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::docs::{InMemoryDocumentStore, NodeType, SectionNode};
    use crate::embeddings::MockEmbedder;
    use crate::graph::{Edge, InMemoryGraphStore};
    use crate::indexer::sync_document;
    use crate::vector::InMemoryVectorIndex;

    fn make_doc(doc_id: &str, sections: &[(&str, &str)]) -> Document {
        let children: Vec<SectionNode> = sections
            .iter()
            .map(|(title, body)| {
                SectionNode::new_section(
                    SectionId::from_string(format!("{doc_id}-{title}")),
                    1,
                    *title,
                    vec![body.to_string()],
                )
            })
            .collect();
        let root = SectionNode {
            id: SectionId::from_string(format!("{doc_id}-root")),
            node_type: NodeType::Document,
            level: 0,
            title: doc_id.to_string(),
            content: Vec::new(),
            children,
        };
        Document::new(doc_id, doc_id, root)
    }

    #[test]
    fn empty_corpus_returns_no_relevant_documents() {
        let doc_store = InMemoryDocumentStore::new();
        let vector_index = InMemoryVectorIndex::new();
        let graph_store = InMemoryGraphStore::new();
        let embedder = MockEmbedder::new(8);

        let result = query("anything", &doc_store, &vector_index, &graph_store, &embedder, &QueryOptions::default()).unwrap();
        assert_eq!(result.answer, "no relevant documents");
        assert!(result.sources.is_empty());
    }

    #[test]
    fn rejects_empty_query_text() {
        let doc_store = InMemoryDocumentStore::new();
        let vector_index = InMemoryVectorIndex::new();
        let graph_store = InMemoryGraphStore::new();
        let embedder = MockEmbedder::new(8);

        let result = query("   ", &doc_store, &vector_index, &graph_store, &embedder, &QueryOptions::default());
        assert!(result.is_err());
    }

    #[test]
    fn seeds_are_returned_with_assembled_context() {
        let doc_store = InMemoryDocumentStore::new();
        let vector_index = InMemoryVectorIndex::new();
        let graph_store = InMemoryGraphStore::new();
        let embedder = MockEmbedder::new(8);

        let doc = make_doc("d1", &[("Intro", "hello world")]);
        sync_document(&doc, &doc_store, &vector_index, &graph_store, &embedder).unwrap();

        let opts = QueryOptions { k: 5, ..Default::default() };
        let result = query("hello world", &doc_store, &vector_index, &graph_store, &embedder, &opts).unwrap();
        assert!(!result.sources.is_empty());
        assert!(result.sources.iter().any(|s| s.context.contains("## Intro")));
    }

    #[test]
    fn graph_expansion_adds_non_seed_hops() {
        let doc_store = InMemoryDocumentStore::new();
        let vector_index = InMemoryVectorIndex::new();
        let graph_store = InMemoryGraphStore::new();
        let embedder = MockEmbedder::new(8);

        let doc1 = make_doc("d1", &[("A", "alpha content")]);
        let doc2 = make_doc("d2", &[("B", "beta content")]);
        sync_document(&doc1, &doc_store, &vector_index, &graph_store, &embedder).unwrap();
        sync_document(&doc2, &doc_store, &vector_index, &graph_store, &embedder).unwrap();

        graph_store
            .upsert_edge(Edge::new("d1-A", "d2-B", EdgeType::SameTopic).with_weight(0.9))
            .unwrap();

        let opts = QueryOptions {
            k: 1,
            expand_graph: true,
            graph_config: ExpandConfig {
                max_hops: 1,
                max_nodes: 10,
                edge_types: vec![EdgeType::SameTopic],
                min_weight: 0.0,
            },
            filters: KnnFilters { doc_id: Some(DocId::from_string("d1")), ..Default::default() },
            ..Default::default()
        };
        let result = query("alpha content", &doc_store, &vector_index, &graph_store, &embedder, &opts).unwrap();
        assert!(result.sources.iter().any(|s| s.node_id.as_str() == "d2-B" && s.hop == 1));
    }

    #[test]
    fn max_per_document_caps_results() {
        let doc_store = InMemoryDocumentStore::new();
        let vector_index = InMemoryVectorIndex::new();
        let graph_store = InMemoryGraphStore::new();
        let embedder = MockEmbedder::new(8);

        let doc = make_doc("d1", &[("A", "one"), ("B", "two"), ("C", "three")]);
        sync_document(&doc, &doc_store, &vector_index, &graph_store, &embedder).unwrap();

        let opts = QueryOptions { k: 10, max_per_document: Some(1), rerank_config: RerankConfig { min_score: 0.0, ..Default::default() }, ..Default::default() };
        let result = query("one two three", &doc_store, &vector_index, &graph_store, &embedder, &opts).unwrap();
        assert!(result.sources.len() <= 1);
    }

    #[test]
    fn without_rerank_sorts_by_hop_then_distance() {
        let doc_store = InMemoryDocumentStore::new();
        let vector_index = InMemoryVectorIndex::new();
        let graph_store = InMemoryGraphStore::new();
        let embedder = MockEmbedder::new(8);

        let doc = make_doc("d1", &[("A", "one"), ("B", "two")]);
        sync_document(&doc, &doc_store, &vector_index, &graph_store, &embedder).unwrap();

        let opts = QueryOptions { k: 10, rerank: false, ..Default::default() };
        let result = query("one", &doc_store, &vector_index, &graph_store, &embedder, &opts).unwrap();
        for pair in result.sources.windows(2) {
            assert!(pair[0].hop <= pair[1].hop);
        }
    }
}
