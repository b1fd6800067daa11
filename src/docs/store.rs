//! Structured Store: persistent `docId -> Document` mapping.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use dashmap::DashMap;
use serde::Serialize;

use super::document::{Document, DocId, SectionId, SectionNode};
use crate::error::{HierarchError, HierarchResult};

/// Summary row returned by [`DocumentStore::list`].
#[derive(Debug, Clone, Serialize)]
pub struct DocumentSummary {
    pub doc_id: DocId,
    pub title: String,
    pub version: u64,
    pub node_count: usize,
}

/// Persistent mapping from `docId -> Document`.
///
/// A single writer is assumed; readers observe either the pre-save or
/// post-save snapshot, never a partial one.
pub trait DocumentStore: Send + Sync {
    fn save(&self, doc: Document) -> HierarchResult<()>;
    fn load(&self, doc_id: &DocId) -> HierarchResult<Option<Document>>;
    fn delete(&self, doc_id: &DocId) -> HierarchResult<bool>;
    fn list(&self) -> HierarchResult<Vec<DocumentSummary>>;

    fn get_node(&self, doc_id: &DocId, node_id: &SectionId) -> HierarchResult<Option<SectionNode>> {
        let doc = self.load(doc_id)?;
        Ok(doc.and_then(|d| d.find_node(node_id).cloned()))
    }

    fn get_parent(&self, doc_id: &DocId, node_id: &SectionId) -> HierarchResult<Option<SectionNode>> {
        let Some(doc) = self.load(doc_id)? else {
            return Ok(None);
        };
        let index = doc.build_node_index();
        let Some(entry) = index.get(node_id) else {
            return Ok(None);
        };
        Ok(match &entry.parent {
            Some(parent_id) => doc.find_node(parent_id).cloned(),
            None => None,
        })
    }

    fn get_children(&self, doc_id: &DocId, node_id: &SectionId) -> HierarchResult<Vec<SectionNode>> {
        let Some(doc) = self.load(doc_id)? else {
            return Ok(Vec::new());
        };
        let index = doc.build_node_index();
        let Some(entry) = index.get(node_id) else {
            return Ok(Vec::new());
        };
        Ok(entry
            .children
            .iter()
            .filter_map(|id| doc.find_node(id).cloned())
            .collect())
    }

    fn get_siblings(&self, doc_id: &DocId, node_id: &SectionId) -> HierarchResult<Vec<SectionNode>> {
        let Some(doc) = self.load(doc_id)? else {
            return Ok(Vec::new());
        };
        let index = doc.build_node_index();
        let Some(entry) = index.get(node_id) else {
            return Ok(Vec::new());
        };
        let Some(parent_id) = &entry.parent else {
            return Ok(Vec::new());
        };
        let Some(parent_entry) = index.get(parent_id) else {
            return Ok(Vec::new());
        };
        Ok(parent_entry
            .children
            .iter()
            .filter(|id| *id != node_id)
            .filter_map(|id| doc.find_node(id).cloned())
            .collect())
    }
}

/// In-memory document store. Useful for tests and as the default when no
/// path is configured.
#[derive(Default)]
pub struct InMemoryDocumentStore {
    docs: DashMap<DocId, Document>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DocumentStore for InMemoryDocumentStore {
    fn save(&self, doc: Document) -> HierarchResult<()> {
        self.docs.insert(doc.doc_id.clone(), doc);
        Ok(())
    }

    fn load(&self, doc_id: &DocId) -> HierarchResult<Option<Document>> {
        Ok(self.docs.get(doc_id).map(|entry| entry.value().clone()))
    }

    fn delete(&self, doc_id: &DocId) -> HierarchResult<bool> {
        Ok(self.docs.remove(doc_id).is_some())
    }

    fn list(&self) -> HierarchResult<Vec<DocumentSummary>> {
        Ok(self
            .docs
            .iter()
            .map(|entry| {
                let d = entry.value();
                DocumentSummary {
                    doc_id: d.doc_id.clone(),
                    title: d.title.clone(),
                    version: d.version,
                    node_count: d.all_node_ids().len(),
                }
            })
            .collect())
    }
}

/// JSON-file-backed document store.
///
/// The whole corpus is a single JSON file holding `Vec<Document>`. Saves
/// write to a sibling temp file and atomically rename it over the target,
/// so readers never observe a partially-written file.
pub struct JsonDocumentStore {
    path: PathBuf,
    cache: RwLock<HashMap<DocId, Document>>,
}

impl JsonDocumentStore {
    /// Open (or create) a JSON document store at `path`.
    pub fn open(path: impl AsRef<Path>) -> HierarchResult<Self> {
        let path = path.as_ref().to_path_buf();
        let docs = if path.exists() {
            let raw = std::fs::read_to_string(&path)?;
            if raw.trim().is_empty() {
                Vec::new()
            } else {
                serde_json::from_str::<Vec<Document>>(&raw)?
            }
        } else {
            Vec::new()
        };
        let cache = docs.into_iter().map(|d| (d.doc_id.clone(), d)).collect();
        Ok(Self {
            path,
            cache: RwLock::new(cache),
        })
    }

    fn flush(&self, docs: &HashMap<DocId, Document>) -> HierarchResult<()> {
        let mut values: Vec<&Document> = docs.values().collect();
        values.sort_by(|a, b| a.doc_id.as_str().cmp(b.doc_id.as_str()));
        let serialized = serde_json::to_string_pretty(&values)?;

        let parent = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(parent)?;

        let tmp_path = parent.join(format!(
            ".{}.tmp",
            self.path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("documents.json")
        ));
        std::fs::write(&tmp_path, serialized)?;
        std::fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }
}

impl DocumentStore for JsonDocumentStore {
    fn save(&self, doc: Document) -> HierarchResult<()> {
        let mut docs = self.cache.write().unwrap();
        docs.insert(doc.doc_id.clone(), doc);
        self.flush(&docs)
    }

    fn load(&self, doc_id: &DocId) -> HierarchResult<Option<Document>> {
        Ok(self.cache.read().unwrap().get(doc_id).cloned())
    }

    fn delete(&self, doc_id: &DocId) -> HierarchResult<bool> {
        let mut docs = self.cache.write().unwrap();
        let removed = docs.remove(doc_id).is_some();
        if removed {
            self.flush(&docs)?;
        }
        Ok(removed)
    }

    fn list(&self) -> HierarchResult<Vec<DocumentSummary>> {
        Ok(self
            .cache
            .read()
            .unwrap()
            .values()
            .map(|d| DocumentSummary {
                doc_id: d.doc_id.clone(),
                title: d.title.clone(),
                version: d.version,
                node_count: d.all_node_ids().len(),
            })
            .collect())
    }
}

pub fn not_found(doc_id: &DocId) -> HierarchError {
    HierarchError::not_found("document", doc_id.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::docs::document::SectionNode;

    fn sample_doc(doc_id: &str) -> Document {
        let child = SectionNode::new_section(SectionId::from_string("s1"), 1, "S1", vec!["p".into()]);
        let root = SectionNode::new_document(SectionId::from_string("root"), "Root")
            .with_children(vec![child]);
        Document::new(doc_id, "Title", root)
    }

    #[test]
    fn in_memory_round_trip() {
        let store = InMemoryDocumentStore::new();
        store.save(sample_doc("doc-1")).unwrap();
        let loaded = store.load(&DocId::from("doc-1")).unwrap();
        assert!(loaded.is_some());
        assert_eq!(loaded.unwrap().title, "Title");
    }

    #[test]
    fn json_store_persists_across_open() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("docs.json");

        {
            let store = JsonDocumentStore::open(&path).unwrap();
            store.save(sample_doc("doc-1")).unwrap();
        }

        let store = JsonDocumentStore::open(&path).unwrap();
        let loaded = store.load(&DocId::from("doc-1")).unwrap();
        assert!(loaded.is_some());
    }

    #[test]
    fn json_store_delete_removes_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("docs.json");
        let store = JsonDocumentStore::open(&path).unwrap();
        store.save(sample_doc("doc-1")).unwrap();
        assert!(store.delete(&DocId::from("doc-1")).unwrap());

        let reopened = JsonDocumentStore::open(&path).unwrap();
        assert!(reopened.load(&DocId::from("doc-1")).unwrap().is_none());
    }

    #[test]
    fn get_children_and_parent() {
        let store = InMemoryDocumentStore::new();
        let doc = sample_doc("doc-1");
        let root_id = doc.root.id.clone();
        let child_id = doc.root.children[0].id.clone();
        store.save(doc).unwrap();

        let children = store.get_children(&DocId::from("doc-1"), &root_id).unwrap();
        assert_eq!(children.len(), 1);

        let parent = store.get_parent(&DocId::from("doc-1"), &child_id).unwrap();
        assert!(parent.is_some());
        assert_eq!(parent.unwrap().id, root_id);
    }
}
