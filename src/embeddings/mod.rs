//! Embedding Port: abstract text-to-vector capability.

mod mock;
mod retry;

#[cfg(feature = "local-embeddings")]
mod local;

pub use mock::MockEmbedder;
pub use retry::{RetryConfig, RetryingEmbedder};

#[cfg(feature = "local-embeddings")]
pub use local::FastEmbedEmbedder;

use thiserror::Error;

/// Failure categories for the embedding capability.
#[derive(Debug, Error, Clone)]
pub enum EmbeddingError {
    /// Transient failure (network blip); safe to retry.
    #[error("transient embedding failure: {0}")]
    Transient(String),
    /// Configuration failure (missing credential, bad model name); not
    /// worth retrying.
    #[error("embedding misconfiguration: {0}")]
    Configuration(String),
    /// The provider could not be reached at all within this process.
    #[error("embedding provider unreachable: {0}")]
    Unreachable(String),
}

impl EmbeddingError {
    /// Whether the embedding sync retry policy should retry
    /// this failure.
    pub fn is_retryable(&self) -> bool {
        matches!(self, EmbeddingError::Transient(_))
    }
}

/// Capability: given a text, return a vector of length `d`, where `d` is
/// stable for the lifetime of the process.
pub trait Embedder: Send + Sync {
    /// The stable dimensionality of vectors this embedder produces.
    fn dimensions(&self) -> usize;

    /// Embed a single text.
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;

    /// Embed N texts, returning N vectors in input order. Default
    /// implementation calls [`Embedder::embed`] per text; implementations
    /// backed by a batching provider should override this.
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        texts.iter().map(|t| self.embed(t)).collect()
    }
}
