//! Concept sub-graph builder: runs the entity extractor
//! over every section and emits `MENTIONS`/`DEFINES`/`RELATED_TO` edges
//! into concept nodes that share id-space with sections (`concept:*`).

use std::collections::{HashMap, HashSet};

use serde_json::json;

use crate::docs::{DocId, Document, DocumentStore, SectionId};
use crate::error::HierarchResult;
use crate::extractor;
use crate::graph::{Edge, EdgeType, GraphStore};

use super::BuildReport;

/// Which documents a concept build should cover. Co-occurrence for
/// `RELATED_TO` is always computed over every section actually
/// processed in a single call, so `All` yields corpus-wide pairs while
/// `Doc` is scoped to one document's sections.
pub enum ConceptScope {
    Doc(DocId),
    All,
}

/// Prefix distinguishing concept node ids from section ids sharing the
/// same id-space.
pub fn concept_node_id(normalized: &str) -> SectionId {
    SectionId::from_string(format!("concept:{normalized}"))
}

/// Rebuild the concept sub-graph for `scope`. Clears the
/// `MENTIONS`/`DEFINES`/`RELATED_TO` edges touching the processed
/// sections' concepts first, then regenerates them.
pub fn build_concepts(
    doc_store: &dyn DocumentStore,
    graph_store: &dyn GraphStore,
    scope: ConceptScope,
) -> HierarchResult<BuildReport> {
    let mut report = BuildReport::default();

    let docs: Vec<Document> = match scope {
        ConceptScope::Doc(doc_id) => doc_store.load(&doc_id)?.into_iter().collect(),
        ConceptScope::All => {
            let mut out = Vec::new();
            for summary in doc_store.list()? {
                if let Some(doc) = doc_store.load(&summary.doc_id)? {
                    out.push(doc);
                }
            }
            out
        }
    };

    // section -> set of normalized concept forms mentioned in it, used
    // to derive RELATED_TO co-occurrence across the whole call.
    let mut section_concepts: HashMap<SectionId, HashSet<String>> = HashMap::new();
    let mut mention_edges = Vec::new();
    let mut touched_concepts: HashSet<String> = HashSet::new();

    for doc in &docs {
        let result: HierarchResult<()> = (|| {
            for node in doc.root.flatten() {
                let text = if node.content.is_empty() {
                    node.title.clone()
                } else {
                    format!("{}\n{}", node.title, node.content.join("\n"))
                };
                let entities = extractor::extract(&text);
                let title_lower = node.title.to_lowercase();
                let mut here = HashSet::new();

                for entity in entities {
                    touched_concepts.insert(entity.normalized.clone());
                    here.insert(entity.normalized.clone());
                    let concept_id = concept_node_id(&entity.normalized);
                    let edge_type = if title_lower.contains(entity.normalized.as_str()) {
                        EdgeType::Defines
                    } else {
                        EdgeType::Mentions
                    };
                    mention_edges.push(
                        Edge::new(node.id.clone(), concept_id, edge_type)
                            .with_weight(entity.confidence)
                            .with_metadata(json!({
                                "entityType": entity.entity_type.as_str(),
                                "frequency": entity.frequency,
                            })),
                    );
                }
                section_concepts.insert(node.id.clone(), here);
            }
            Ok(())
        })();
        match result {
            Ok(()) => report.documents_processed += 1,
            Err(e) => report.documents_failed.push((doc.doc_id.clone(), e.to_string())),
        }
    }

    for concept in &touched_concepts {
        let concept_id = concept_node_id(concept);
        for edge in graph_store.get_incoming_edges(&concept_id, Some(EdgeType::Mentions))? {
            graph_store.delete_edge(&edge.from, &edge.to, EdgeType::Mentions)?;
        }
        for edge in graph_store.get_incoming_edges(&concept_id, Some(EdgeType::Defines))? {
            graph_store.delete_edge(&edge.from, &edge.to, EdgeType::Defines)?;
        }
        for edge in graph_store.get_outgoing_edges(&concept_id, Some(EdgeType::RelatedTo))? {
            graph_store.delete_edge(&edge.from, &edge.to, EdgeType::RelatedTo)?;
        }
    }

    let mut pair_counts: HashMap<(String, String), u32> = HashMap::new();
    for concepts in section_concepts.values() {
        let mut sorted: Vec<&String> = concepts.iter().collect();
        sorted.sort();
        for i in 0..sorted.len() {
            for j in (i + 1)..sorted.len() {
                let key = (sorted[i].clone(), sorted[j].clone());
                *pair_counts.entry(key).or_insert(0) += 1;
            }
        }
    }

    let mut related_edges = Vec::new();
    for ((a, b), count) in pair_counts {
        // weight = min(1, occurrences * 0.2), saturating rather than unbounded.
        let weight = (count as f32 * 0.2).min(1.0);
        let ca = concept_node_id(&a);
        let cb = concept_node_id(&b);
        related_edges.push(Edge::new(ca.clone(), cb.clone(), EdgeType::RelatedTo).with_weight(weight));
        related_edges.push(Edge::new(cb, ca, EdgeType::RelatedTo).with_weight(weight));
    }

    report.edges_written = mention_edges.len() + related_edges.len();
    graph_store.upsert_edges(mention_edges)?;
    graph_store.upsert_edges(related_edges)?;

    Ok(report)
}
