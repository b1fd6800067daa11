//! `REFERS_TO` builder: markdown and wiki-style links
//! resolved to the node they target, dropping anything that doesn't
//! resolve at build time.

use std::sync::OnceLock;

use regex_lite::Regex;
use serde_json::json;

use crate::docs::{Document, DocumentStore, SectionId};
use crate::error::HierarchResult;
use crate::graph::{Edge, EdgeType, GraphStore};

use super::BuildReport;

#[derive(Debug, Clone, Default)]
pub struct RefersToConfig {
    /// When a bare title matches sections in more than one document,
    /// prefer a cross-document match over a same-document one.
    pub cross_document_only: bool,
    /// Also emit the inverse edge (`target -> source`). Off by default:
    /// `REFERS_TO` is directional, matching the authored link.
    pub emit_reverse: bool,
}

struct Patterns {
    markdown_link: Regex,
    wiki_link: Regex,
}

fn patterns() -> &'static Patterns {
    static PATTERNS: OnceLock<Patterns> = OnceLock::new();
    PATTERNS.get_or_init(|| Patterns {
        markdown_link: Regex::new(r"\[([^\]]*)\]\(([^)]+)\)").unwrap(),
        wiki_link: Regex::new(r"\[\[([^\]]+)\]\]").unwrap(),
    })
}

struct RawLink {
    text: String,
    target: String,
    link_type: &'static str,
}

fn find_links(text: &str) -> Vec<RawLink> {
    let p = patterns();
    let mut links = Vec::new();
    for caps in p.markdown_link.captures_iter(text) {
        links.push(RawLink {
            text: caps.get(1).map(|m| m.as_str().to_string()).unwrap_or_default(),
            target: caps.get(2).map(|m| m.as_str().to_string()).unwrap_or_default(),
            link_type: "markdown",
        });
    }
    for caps in p.wiki_link.captures_iter(text) {
        let inner = caps.get(1).map(|m| m.as_str().to_string()).unwrap_or_default();
        links.push(RawLink { text: inner.clone(), target: inner, link_type: "wiki" });
    }
    links
}

/// Rebuild every `REFERS_TO` edge from the corpus's current link text
///. Clears existing `REFERS_TO` edges first.
pub fn build_refers_to(
    doc_store: &dyn DocumentStore,
    graph_store: &dyn GraphStore,
    cfg: &RefersToConfig,
) -> HierarchResult<BuildReport> {
    let mut report = BuildReport::default();

    for edge in graph_store.get_edges_by_type(EdgeType::RefersTo)? {
        graph_store.delete_edge(&edge.from, &edge.to, EdgeType::RefersTo)?;
    }

    let mut all_docs: Vec<Document> = Vec::new();
    for summary in doc_store.list()? {
        if let Some(doc) = doc_store.load(&summary.doc_id)? {
            all_docs.push(doc);
        }
    }

    let mut edges = Vec::new();
    for doc in &all_docs {
        let result: HierarchResult<()> = (|| {
            for node in doc.root.flatten() {
                let text = node.content.join("\n");
                for link in find_links(&text) {
                    let Some((_target_doc, target_id)) =
                        resolve_target(doc, &all_docs, &link.target, cfg.cross_document_only)
                    else {
                        continue;
                    };
                    let metadata = json!({
                        "linkText": link.text,
                        "linkType": link.link_type,
                        "originalTarget": link.target,
                    });
                    edges.push(
                        Edge::new(node.id.clone(), target_id.clone(), EdgeType::RefersTo)
                            .with_metadata(metadata.clone()),
                    );
                    if cfg.emit_reverse {
                        edges.push(
                            Edge::new(target_id, node.id.clone(), EdgeType::RefersTo)
                                .with_metadata(metadata),
                        );
                    }
                }
            }
            Ok(())
        })();
        match result {
            Ok(()) => report.documents_processed += 1,
            Err(e) => report.documents_failed.push((doc.doc_id.clone(), e.to_string())),
        }
    }

    report.edges_written = edges.len();
    graph_store.upsert_edges(edges)?;
    Ok(report)
}

/// Resolve a raw link target against `current` first, then the whole
/// corpus: `#id` anchors, `docId#id` qualified ids, then a fuzzy title
/// match, in that order.
fn resolve_target(
    current: &Document,
    all_docs: &[Document],
    target: &str,
    cross_document_only: bool,
) -> Option<(crate::docs::DocId, SectionId)> {
    let trimmed = target.trim();

    if let Some(anchor) = trimmed.strip_prefix('#') {
        if let Some(node) = current.find_node(&SectionId::from_string(anchor)) {
            return Some((current.doc_id.clone(), node.id.clone()));
        }
        let qualified = format!("{}#{anchor}", current.doc_id.as_str());
        if let Some(node) = current.find_node(&SectionId::from_string(&qualified)) {
            return Some((current.doc_id.clone(), node.id.clone()));
        }
        return None;
    }

    if let Some((doc_part, id_part)) = trimmed.split_once('#') {
        if let Some(doc) = all_docs.iter().find(|d| d.doc_id.as_str() == doc_part) {
            if let Some(node) = doc.find_node(&SectionId::from_string(id_part)) {
                return Some((doc.doc_id.clone(), node.id.clone()));
            }
        }
    }

    fuzzy_title_match(current, all_docs, trimmed, cross_document_only)
}

fn fuzzy_title_match(
    current: &Document,
    all_docs: &[Document],
    target: &str,
    cross_document_only: bool,
) -> Option<(crate::docs::DocId, SectionId)> {
    let normalized = target.to_lowercase();
    let mut same_doc: Vec<(crate::docs::DocId, SectionId)> = Vec::new();
    let mut cross_doc: Vec<(crate::docs::DocId, SectionId)> = Vec::new();

    let mut docs: Vec<&Document> = all_docs.iter().collect();
    docs.sort_by(|a, b| a.doc_id.as_str().cmp(b.doc_id.as_str()));

    for doc in docs {
        for node in doc.root.flatten() {
            if node.title.to_lowercase() == normalized {
                let hit = (doc.doc_id.clone(), node.id.clone());
                if doc.doc_id == current.doc_id {
                    same_doc.push(hit);
                } else {
                    cross_doc.push(hit);
                }
            }
        }
    }

    if cross_document_only && !cross_doc.is_empty() {
        return cross_doc.into_iter().next();
    }
    same_doc.into_iter().next().or_else(|| cross_doc.into_iter().next())
}
