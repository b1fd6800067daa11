//! Crate-wide error taxonomy.

use thiserror::Error;

use crate::embeddings::EmbeddingError;

/// Top-level error type returned by every public operation.
///
/// Validation and NotFound surface without side effects. Storage errors
/// abort the current atomic operation. Build failures are collected and
/// returned alongside a success summary rather than raised here — see
/// [`crate::builders::BuildReport`].
#[derive(Debug, Error)]
pub enum HierarchError {
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("validation error: {0}")]
    Validation(String),

    #[error("embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("{0}")]
    Other(String),
}

pub type HierarchResult<T> = Result<T, HierarchError>;

impl HierarchError {
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }
}
