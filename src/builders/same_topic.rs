//! `SAME_TOPIC` builder: symmetric edges between sections
//! whose embeddings (optionally blended with title overlap) are close.

use std::collections::{HashMap, HashSet};

use crate::docs::{DocumentStore, SectionId};
use crate::error::HierarchResult;
use crate::graph::{Edge, EdgeType, GraphStore};
use crate::vector::VectorIndex;

use super::BuildReport;

#[derive(Debug, Clone)]
pub struct SameTopicConfig {
    pub min_similarity: f32,
    pub max_connections: usize,
    pub cross_doc_only: bool,
    /// Blend in word-Jaccard title similarity as
    /// `0.8 * embeddingSim + 0.2 * titleSim`.
    pub use_title_similarity: bool,
}

impl Default for SameTopicConfig {
    fn default() -> Self {
        Self {
            min_similarity: 0.80,
            max_connections: 5,
            cross_doc_only: true,
            use_title_similarity: false,
        }
    }
}

/// Rebuild every `SAME_TOPIC` edge from the corpus's current embeddings
///. Clears existing `SAME_TOPIC` edges first, so the
/// result reflects only the sections present at call time.
pub fn build_same_topic(
    doc_store: &dyn DocumentStore,
    vector_index: &dyn VectorIndex,
    graph_store: &dyn GraphStore,
    cfg: &SameTopicConfig,
) -> HierarchResult<BuildReport> {
    let mut report = BuildReport::default();

    for edge in graph_store.get_edges_by_type(EdgeType::SameTopic)? {
        graph_store.delete_edge(&edge.from, &edge.to, EdgeType::SameTopic)?;
    }

    struct Row {
        meta: crate::vector::SectionMeta,
        vector: Vec<f32>,
    }
    let mut rows: Vec<Row> = Vec::new();

    for summary in doc_store.list()? {
        let result: HierarchResult<()> = (|| {
            for node_id in vector_index.get_doc_node_ids(&summary.doc_id)? {
                let Some(meta) = vector_index.get_section_meta(&node_id)? else {
                    continue;
                };
                let Some(vector) = vector_index.get_section_vector(&node_id)? else {
                    continue;
                };
                rows.push(Row { meta, vector });
            }
            Ok(())
        })();
        match result {
            Ok(()) => report.documents_processed += 1,
            Err(e) => report.documents_failed.push((summary.doc_id.clone(), e.to_string())),
        }
    }

    let mut candidates: HashMap<SectionId, Vec<(SectionId, f32)>> = HashMap::new();

    for i in 0..rows.len() {
        for j in (i + 1)..rows.len() {
            let (a, b) = (&rows[i], &rows[j]);
            if cfg.cross_doc_only && a.meta.doc_id == b.meta.doc_id {
                continue;
            }
            let embedding_sim = 1.0 - crate::vector::cosine_distance(&a.vector, &b.vector);
            let similarity = if cfg.use_title_similarity {
                let title_sim = title_jaccard(&a.meta.title, &b.meta.title);
                0.8 * embedding_sim + 0.2 * title_sim
            } else {
                embedding_sim
            };
            if similarity < cfg.min_similarity {
                continue;
            }
            let weight = (similarity * 100.0).round() / 100.0;
            candidates.entry(a.meta.node_id.clone()).or_default().push((b.meta.node_id.clone(), weight));
            candidates.entry(b.meta.node_id.clone()).or_default().push((a.meta.node_id.clone(), weight));
        }
    }

    let mut edges = Vec::new();
    for (from, mut neighbors) in candidates {
        neighbors.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap());
        neighbors.truncate(cfg.max_connections);
        for (to, weight) in neighbors {
            edges.push(Edge::new(from.clone(), to, EdgeType::SameTopic).with_weight(weight));
        }
    }
    report.edges_written = edges.len();
    graph_store.upsert_edges(edges)?;

    Ok(report)
}

/// Word-level Jaccard similarity between two titles, lowercased and
/// split on non-alphanumerics. `0.0` if either title has no words.
fn title_jaccard(a: &str, b: &str) -> f32 {
    let words = |s: &str| -> HashSet<String> {
        s.to_lowercase()
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .map(|w| w.to_string())
            .collect()
    };
    let wa = words(a);
    let wb = words(b);
    if wa.is_empty() || wb.is_empty() {
        return 0.0;
    }
    let intersection = wa.intersection(&wb).count();
    let union = wa.union(&wb).count();
    if union == 0 {
        0.0
    } else {
        intersection as f32 / union as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::docs::{Document, InMemoryDocumentStore, NodeType, SectionNode};
    use crate::graph::InMemoryGraphStore;
    use crate::vector::{InMemoryVectorIndex, SectionMeta};
    use chrono::Utc;

    fn put(vector_index: &InMemoryVectorIndex, node_id: &str, doc_id: &str, vector: Vec<f32>) {
        let now = Utc::now();
        let meta = SectionMeta {
            node_id: SectionId::from_string(node_id),
            doc_id: crate::docs::DocId::from_string(doc_id),
            level: 1,
            title: node_id.to_string(),
            is_leaf: true,
            path: format!("{doc_id}/{node_id}"),
            content_hash: "h".to_string(),
            dimensions: vector.len(),
            created_at: now,
            updated_at: now,
        };
        vector_index.upsert_section(meta, vector).unwrap();
    }

    fn put_doc(doc_store: &InMemoryDocumentStore, doc_id: &str) {
        let root = SectionNode {
            id: SectionId::from_string(format!("{doc_id}-root")),
            node_type: NodeType::Document,
            level: 0,
            title: doc_id.to_string(),
            content: Vec::new(),
            children: Vec::new(),
        };
        doc_store.save(Document::new(doc_id, doc_id, root)).unwrap();
    }

    #[test]
    fn emits_symmetric_edges_above_threshold() {
        let doc_store = InMemoryDocumentStore::new();
        let vector_index = InMemoryVectorIndex::new();
        let graph_store = InMemoryGraphStore::new();

        put_doc(&doc_store, "d1");
        put_doc(&doc_store, "d2");
        put(&vector_index, "s1", "d1", vec![1.0, 0.0, 0.0]);
        put(&vector_index, "s2", "d2", vec![0.99, 0.01, 0.0]);

        let cfg = SameTopicConfig { min_similarity: 0.9, ..Default::default() };
        build_same_topic(&doc_store, &vector_index, &graph_store, &cfg).unwrap();

        let out = graph_store
            .get_outgoing_edges(&SectionId::from_string("s1"), Some(EdgeType::SameTopic))
            .unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].to.as_str(), "s2");

        let back = graph_store
            .get_outgoing_edges(&SectionId::from_string("s2"), Some(EdgeType::SameTopic))
            .unwrap();
        assert_eq!(back.len(), 1);
        assert_eq!(back[0].to.as_str(), "s1");
    }

    #[test]
    fn cross_doc_only_skips_same_document_pairs() {
        let doc_store = InMemoryDocumentStore::new();
        let vector_index = InMemoryVectorIndex::new();
        let graph_store = InMemoryGraphStore::new();

        put_doc(&doc_store, "d1");
        put(&vector_index, "s1", "d1", vec![1.0, 0.0]);
        put(&vector_index, "s2", "d1", vec![1.0, 0.0]);

        let cfg = SameTopicConfig { min_similarity: 0.9, cross_doc_only: true, ..Default::default() };
        build_same_topic(&doc_store, &vector_index, &graph_store, &cfg).unwrap();

        assert!(graph_store.stats().unwrap().total_edges == 0);
    }

    #[test]
    fn max_connections_prunes_to_top_k_by_weight() {
        let doc_store = InMemoryDocumentStore::new();
        let vector_index = InMemoryVectorIndex::new();
        let graph_store = InMemoryGraphStore::new();

        put_doc(&doc_store, "d0");
        put_doc(&doc_store, "d1");
        put_doc(&doc_store, "d2");
        put_doc(&doc_store, "d3");
        put(&vector_index, "hub", "d0", vec![1.0, 0.0]);
        put(&vector_index, "a", "d1", vec![0.99, 0.02]);
        put(&vector_index, "b", "d2", vec![0.98, 0.03]);
        put(&vector_index, "c", "d3", vec![0.97, 0.04]);

        let cfg = SameTopicConfig { min_similarity: 0.8, max_connections: 1, ..Default::default() };
        build_same_topic(&doc_store, &vector_index, &graph_store, &cfg).unwrap();

        let out = graph_store
            .get_outgoing_edges(&SectionId::from_string("hub"), Some(EdgeType::SameTopic))
            .unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].to.as_str(), "a");
    }

    #[test]
    fn rebuild_clears_stale_edges() {
        let doc_store = InMemoryDocumentStore::new();
        let vector_index = InMemoryVectorIndex::new();
        let graph_store = InMemoryGraphStore::new();

        graph_store
            .upsert_edge(Edge::new("stale-a", "stale-b", EdgeType::SameTopic).with_weight(0.99))
            .unwrap();

        let cfg = SameTopicConfig::default();
        build_same_topic(&doc_store, &vector_index, &graph_store, &cfg).unwrap();

        assert!(graph_store
            .get_outgoing_edges(&SectionId::from_string("stale-a"), Some(EdgeType::SameTopic))
            .unwrap()
            .is_empty());
    }

    #[test]
    fn title_similarity_blend_changes_outcome() {
        let doc_store = InMemoryDocumentStore::new();
        let vector_index = InMemoryVectorIndex::new();
        let graph_store = InMemoryGraphStore::new();

        put_doc(&doc_store, "d1");
        put_doc(&doc_store, "d2");
        // Embedding similarity alone is below threshold; title overlap
        // should not be enough to push it over when weighted 0.8/0.2.
        put(&vector_index, "s1", "d1", vec![1.0, 0.0]);
        put(&vector_index, "s2", "d2", vec![0.0, 1.0]);

        let cfg = SameTopicConfig {
            min_similarity: 0.5,
            use_title_similarity: true,
            ..Default::default()
        };
        build_same_topic(&doc_store, &vector_index, &graph_store, &cfg).unwrap();
        assert_eq!(graph_store.stats().unwrap().total_edges, 0);
    }
}
