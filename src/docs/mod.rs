//! Hierarchical Document Index data model and Structured Store.

mod document;
mod markdown;
mod store;

pub use document::{
    content_hash, derive_section_id, short_hash, slugify, DocId, Document, NodeIndexEntry,
    NodeType, SectionId, SectionNode,
};
pub use markdown::parse_markdown_to_tree;
pub use store::{DocumentStore, DocumentSummary, InMemoryDocumentStore, JsonDocumentStore};
