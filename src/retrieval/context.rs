//! Hierarchical context assembly.

use crate::docs::{Document, SectionNode};

/// Compose the deterministic context string surfaced alongside a result.
///
/// Always includes `[Document: title]`, the `## node.title` heading, the
/// node's content, and a `[Subsections: ...]` line if it has children.
/// When `include_context` is set and the node has a parent, a
/// `[Parent Section: ...]` line plus the parent's first two paragraphs
/// are prepended.
pub fn assemble_context(doc: &Document, node: &SectionNode, include_context: bool) -> String {
    let mut parts: Vec<String> = Vec::new();

    if include_context {
        let index = doc.build_node_index();
        if let Some(entry) = index.get(&node.id) {
            if let Some(parent_id) = &entry.parent {
                if let Some(parent) = doc.find_node(parent_id) {
                    parts.push(format!("[Parent Section: {}]", parent.title));
                    let preview: Vec<&str> = parent.content.iter().take(2).map(|s| s.as_str()).collect();
                    if !preview.is_empty() {
                        parts.push(preview.join("\n"));
                    }
                }
            }
        }
    }

    parts.push(format!("[Document: {}]", doc.title));
    parts.push(format!("## {}", node.title));
    parts.push(node.content.join("\n"));

    if !node.children.is_empty() {
        let titles: Vec<&str> = node.children.iter().map(|c| c.title.as_str()).collect();
        parts.push(format!("[Subsections: {}]", titles.join(", ")));
    }

    parts.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::docs::{DocId, NodeType, SectionId};

    fn sample_doc() -> Document {
        let grandchild =
            SectionNode::new_section(SectionId::from_string("gc"), 2, "Details", vec!["deep".to_string()]);
        let child = SectionNode::new_section(
            SectionId::from_string("child"),
            1,
            "Setup",
            vec!["first paragraph".to_string(), "second paragraph".to_string(), "third".to_string()],
        )
        .with_children(vec![grandchild]);
        let root = SectionNode {
            id: SectionId::from_string("root"),
            node_type: NodeType::Document,
            level: 0,
            title: "Guide".to_string(),
            content: Vec::new(),
            children: vec![child],
        };
        Document::new(DocId::from_string("d1"), "Guide", root)
    }

    #[test]
    fn includes_document_heading_and_subsections() {
        let doc = sample_doc();
        let child = doc.find_node(&SectionId::from_string("child")).unwrap();
        let ctx = assemble_context(&doc, child, false);
        assert!(ctx.contains("[Document: Guide]"));
        assert!(ctx.contains("## Setup"));
        assert!(ctx.contains("[Subsections: Details]"));
        assert!(!ctx.contains("[Parent Section"));
    }

    #[test]
    fn prepends_parent_when_include_context() {
        let doc = sample_doc();
        let grandchild = doc.find_node(&SectionId::from_string("gc")).unwrap();
        let ctx = assemble_context(&doc, grandchild, true);
        assert!(ctx.starts_with("[Parent Section: Setup]"));
        assert!(ctx.contains("first paragraph\nsecond paragraph"));
        assert!(!ctx.contains("third"));
    }

    #[test]
    fn leaf_without_parent_has_no_parent_or_subsections_lines() {
        let doc = sample_doc();
        let root = doc.find_node(&SectionId::from_string("root")).unwrap();
        let ctx = assemble_context(&doc, root, true);
        assert!(!ctx.contains("[Parent Section"));
    }
}
