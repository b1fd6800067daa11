//! Document and SectionNode: the hierarchical document model.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Unique identifier for a document.
///
/// Serializes as a plain string (caller-supplied, opaque).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
#[serde(transparent)]
pub struct DocId(String);

impl DocId {
    pub fn from_string(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for DocId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for DocId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for DocId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Unique identifier for a section node.
///
/// Derived from a title via [`slug_id`], or passed through unchanged when
/// the caller provides an external id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
#[serde(transparent)]
pub struct SectionId(String);

impl SectionId {
    pub fn from_string(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for SectionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for SectionId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Slug a title: lowercase, fold non-alphanumerics to `-`, trim, cap at 50 bytes.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut last_was_dash = false;
    for ch in title.chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch.to_ascii_lowercase());
            last_was_dash = false;
        } else if !last_was_dash {
            slug.push('-');
            last_was_dash = true;
        }
    }
    let trimmed = slug.trim_matches('-');
    let mut truncated = trimmed.to_string();
    while truncated.len() > 50 {
        truncated.pop();
    }
    truncated.trim_matches('-').to_string()
}

/// First 8 hex chars of SHA-256(title).
pub fn short_hash(title: &str) -> String {
    let digest = Sha256::digest(title.as_bytes());
    let hex = hex_encode(&digest);
    hex[..8].to_string()
}

/// `slug(title) || "-" || short_hash(title)`.
pub fn derive_section_id(title: &str) -> SectionId {
    let slug = slugify(title);
    let hash = short_hash(title);
    if slug.is_empty() {
        SectionId::from_string(hash)
    } else {
        SectionId::from_string(format!("{slug}-{hash}"))
    }
}

/// `H(title || "\n" || join(content, "\n"))` — SHA-256 hex digest.
pub fn content_hash(title: &str, content: &[String]) -> String {
    let joined = content.join("\n");
    let input = format!("{title}\n{joined}");
    hex_encode(&Sha256::digest(input.as_bytes()))
}

fn hex_encode(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        out.push_str(&format!("{:02x}", b));
    }
    out
}

/// Node type: top-level document wrapper, or a section within it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeType {
    Document,
    Section,
}

/// A node in a document tree: the atomic unit of retrieval.
///
/// Invariant: `level` of a child is `level` of its parent + 1. Ids are
/// unique within a document and stable across re-indexings of unchanged
/// content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectionNode {
    pub id: SectionId,
    pub node_type: NodeType,
    pub level: u32,
    pub title: String,
    pub content: Vec<String>,
    pub children: Vec<SectionNode>,
}

impl SectionNode {
    pub fn new_document(id: impl Into<SectionId>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            node_type: NodeType::Document,
            level: 0,
            title: title.into(),
            content: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn new_section(
        id: impl Into<SectionId>,
        level: u32,
        title: impl Into<String>,
        content: Vec<String>,
    ) -> Self {
        Self {
            id: id.into(),
            node_type: NodeType::Section,
            level,
            title: title.into(),
            content,
            children: Vec::new(),
        }
    }

    pub fn with_children(mut self, children: Vec<SectionNode>) -> Self {
        self.children = children;
        self
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    pub fn content_hash(&self) -> String {
        content_hash(&self.title, &self.content)
    }

    /// Depth-first walk over this node and all descendants.
    pub fn walk<'a>(&'a self, f: &mut impl FnMut(&'a SectionNode)) {
        f(self);
        for child in &self.children {
            child.walk(f);
        }
    }

    /// Collect this node and all descendants into a flat vec, document order.
    pub fn flatten(&self) -> Vec<&SectionNode> {
        let mut out = Vec::new();
        self.walk(&mut |n| out.push(n));
        out
    }
}

/// A document: identified by `docId`, containing a root [`SectionNode`] and
/// a flat `nodes` index mapping node id to parent id / children / depth
///.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub doc_id: DocId,
    pub title: String,
    pub version: u64,
    pub root: SectionNode,
}

/// An entry in a document's flat node index.
#[derive(Debug, Clone)]
pub struct NodeIndexEntry {
    pub parent: Option<SectionId>,
    pub children: Vec<SectionId>,
    pub level: u32,
}

impl Document {
    pub fn new(doc_id: impl Into<DocId>, title: impl Into<String>, root: SectionNode) -> Self {
        Self {
            doc_id: doc_id.into(),
            title: title.into(),
            version: 1,
            root,
        }
    }

    /// Override the default starting version, e.g. when a caller pins an
    /// explicit version on first index.
    pub fn with_version(mut self, version: u64) -> Self {
        self.version = version;
        self
    }

    /// Build the flat `nodes` index (parent, ordered children, depth) by
    /// walking the tree once. O(1) parent/child lookup thereafter.
    pub fn build_node_index(&self) -> std::collections::HashMap<SectionId, NodeIndexEntry> {
        let mut index = std::collections::HashMap::new();
        build_index_recursive(&self.root, None, &mut index);
        index
    }

    /// All node ids reachable from the root, depth-first.
    pub fn all_node_ids(&self) -> Vec<SectionId> {
        self.root.flatten().into_iter().map(|n| n.id.clone()).collect()
    }

    pub fn find_node(&self, id: &SectionId) -> Option<&SectionNode> {
        find_recursive(&self.root, id)
    }

    /// Canonical breadcrumb: document title + node title.
    pub fn path_for(&self, node: &SectionNode) -> String {
        if node.id == self.root.id {
            self.title.clone()
        } else {
            format!("{} / {}", self.title, node.title)
        }
    }
}

fn build_index_recursive(
    node: &SectionNode,
    parent: Option<SectionId>,
    index: &mut std::collections::HashMap<SectionId, NodeIndexEntry>,
) {
    let children: Vec<SectionId> = node.children.iter().map(|c| c.id.clone()).collect();
    index.insert(
        node.id.clone(),
        NodeIndexEntry {
            parent,
            children: children.clone(),
            level: node.level,
        },
    );
    for child in &node.children {
        build_index_recursive(child, Some(node.id.clone()), index);
    }
}

fn find_recursive<'a>(node: &'a SectionNode, id: &SectionId) -> Option<&'a SectionNode> {
    if &node.id == id {
        return Some(node);
    }
    for child in &node.children {
        if let Some(found) = find_recursive(child, id) {
            return Some(found);
        }
    }
    None
}
