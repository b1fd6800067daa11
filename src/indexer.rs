//! Indexer / Sync: reconciles a document tree into the
//! Structured Store, Vector Index and hierarchical graph edges via
//! content hashing.

use std::collections::HashSet;

use chrono::Utc;
use serde::Serialize;

use crate::docs::{content_hash, DocumentStore, SectionId, SectionNode};
use crate::docs::Document;
use crate::embeddings::Embedder;
use crate::error::HierarchResult;
use crate::graph::{Edge, EdgeType, GraphStore};
use crate::vector::{SectionMeta, VectorIndex};

/// Per-sync summary: which nodes were (re-)embedded, which were skipped
/// because content was unchanged, which were removed, and which failed.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncReport {
    pub indexed: Vec<SectionId>,
    pub skipped: Vec<SectionId>,
    pub deleted: Vec<SectionId>,
    pub failed: Vec<(SectionId, String)>,
}

/// Reconcile `doc` into `doc_store`, `vector_index` and `graph_store`.
///
/// Embedding failures are collected into `SyncReport::failed`; the node
/// is left unchanged and the sync continues rather than aborting the
/// whole document.
pub fn sync_document(
    doc: &Document,
    doc_store: &dyn DocumentStore,
    vector_index: &dyn VectorIndex,
    graph_store: &dyn GraphStore,
    embedder: &dyn Embedder,
) -> HierarchResult<SyncReport> {
    let mut report = SyncReport::default();

    // Step 1.
    let existing: HashSet<SectionId> = vector_index
        .get_doc_node_ids(&doc.doc_id)
        .map(|v| v.into_iter().collect())?;

    // Step 2.
    let all_nodes = doc.root.flatten();
    let mut visited: HashSet<SectionId> = HashSet::new();

    // Step 3.
    for node in &all_nodes {
        visited.insert(node.id.clone());
        let hash = content_hash(&node.title, &node.content);

        if let Some(meta) = vector_index.get_section_meta(&node.id)? {
            if meta.content_hash == hash {
                report.skipped.push(node.id.clone());
                continue;
            }
        }

        let text = embedding_text(node);
        match embedder.embed(&text) {
            Ok(vector) => {
                let now = Utc::now();
                let meta = SectionMeta {
                    node_id: node.id.clone(),
                    doc_id: doc.doc_id.clone(),
                    level: node.level,
                    title: node.title.clone(),
                    is_leaf: node.is_leaf(),
                    path: doc.path_for(node),
                    content_hash: hash,
                    dimensions: vector.len(),
                    created_at: now,
                    updated_at: now,
                };
                vector_index.upsert_section(meta, vector)?;
                report.indexed.push(node.id.clone());
            }
            Err(e) => {
                report.failed.push((node.id.clone(), e.to_string()));
            }
        }
    }

    // Step 4.
    for id in existing.difference(&visited) {
        vector_index.delete_section(id)?;
        graph_store.delete_node_edges(id)?;
        report.deleted.push(id.clone());
    }

    // Step 5: rebuild structural edges for every node still present.
    rebuild_structural_edges(doc, graph_store)?;

    // Step 6. Version is monotonically increasing: an explicit version on
    // `doc` that advances past the stored one is honored as an override;
    // otherwise it's bumped only when this sync actually changed content,
    // so idempotent re-syncs leave it untouched.
    let existing_doc = doc_store.load(&doc.doc_id)?;
    let content_changed = !report.indexed.is_empty() || !report.deleted.is_empty();
    let version = match existing_doc {
        Some(prev) if doc.version > prev.version => doc.version,
        Some(prev) if content_changed => prev.version + 1,
        Some(prev) => prev.version,
        None => doc.version,
    };
    let mut to_save = doc.clone();
    to_save.version = version;
    doc_store.save(to_save)?;

    Ok(report)
}

fn embedding_text(node: &SectionNode) -> String {
    if node.content.is_empty() {
        node.title.clone()
    } else {
        format!("{}\n{}", node.title, node.content.join("\n"))
    }
}

/// `PARENT_OF`/`CHILD_OF` along the tree, `NEXT_SIBLING` along each
/// sibling list. `PREV_SIBLING` is never emitted — forward-only, per the
/// Open Question resolution recorded in DESIGN.md.
fn rebuild_structural_edges(doc: &Document, graph_store: &dyn GraphStore) -> HierarchResult<()> {
    for node in doc.root.flatten() {
        for edge_type in [
            EdgeType::ParentOf,
            EdgeType::ChildOf,
            EdgeType::NextSibling,
            EdgeType::PrevSibling,
        ] {
            for edge in graph_store.get_outgoing_edges(&node.id, Some(edge_type))? {
                graph_store.delete_edge(&edge.from, &edge.to, edge_type)?;
            }
        }
    }

    let mut edges = Vec::new();
    collect_structural_edges(&doc.root, &mut edges);
    graph_store.upsert_edges(edges)?;
    Ok(())
}

fn collect_structural_edges(node: &SectionNode, out: &mut Vec<Edge>) {
    for child in &node.children {
        out.push(Edge::new(node.id.clone(), child.id.clone(), EdgeType::ParentOf));
        out.push(Edge::new(child.id.clone(), node.id.clone(), EdgeType::ChildOf));
    }
    for pair in node.children.windows(2) {
        out.push(Edge::new(pair[0].id.clone(), pair[1].id.clone(), EdgeType::NextSibling));
    }
    for child in &node.children {
        collect_structural_edges(child, out);
    }
}
