//! `SectionMeta` and k-NN filter predicates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::docs::{DocId, SectionId};

/// Metadata row stored alongside each section's vector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectionMeta {
    pub node_id: SectionId,
    pub doc_id: DocId,
    pub level: u32,
    pub title: String,
    pub is_leaf: bool,
    /// Canonical breadcrumb: document title + node title.
    pub path: String,
    pub content_hash: String,
    /// Authoritative vector width; similarity math always slices to this.
    pub dimensions: usize,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Metadata filters accepted by `searchKnn`. Filters are
/// applied exactly, never post-filtered after too few candidates.
#[derive(Debug, Clone, Default)]
pub struct KnnFilters {
    pub doc_id: Option<DocId>,
    pub level: Option<u32>,
    pub is_leaf: Option<bool>,
}

impl KnnFilters {
    pub fn matches(&self, meta: &SectionMeta) -> bool {
        if let Some(doc_id) = &self.doc_id {
            if &meta.doc_id != doc_id {
                return false;
            }
        }
        if let Some(level) = self.level {
            if meta.level != level {
                return false;
            }
        }
        if let Some(is_leaf) = self.is_leaf {
            if meta.is_leaf != is_leaf {
                return false;
            }
        }
        true
    }
}
