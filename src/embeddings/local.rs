//! Production embedder backed by `fastembed` (local ONNX inference),
//! behind the `local-embeddings` feature.

use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use std::sync::Mutex;

use super::{EmbeddingError, Embedder};

/// Local ONNX-backed embedder.
///
/// Wraps `fastembed::TextEmbedding` in a `Mutex` because its `embed`
/// method requires `&mut self`, while [`Embedder`] uses `&self`.
pub struct FastEmbedEmbedder {
    model: Mutex<TextEmbedding>,
    dimensions: usize,
}

impl FastEmbedEmbedder {
    pub fn new(model: EmbeddingModel, dimensions: usize) -> Result<Self, EmbeddingError> {
        let options = InitOptions::new(model).with_show_download_progress(false);
        let embedding = TextEmbedding::try_new(options)
            .map_err(|e| EmbeddingError::Configuration(e.to_string()))?;
        Ok(Self {
            model: Mutex::new(embedding),
            dimensions,
        })
    }

    /// Default model: `nomic-embed-text-v1.5`, 768 dimensions.
    pub fn default_model() -> Result<Self, EmbeddingError> {
        Self::new(EmbeddingModel::NomicEmbedTextV15, 768)
    }
}

impl Embedder for FastEmbedEmbedder {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let vectors = self.embed_batch(&[text])?;
        vectors
            .into_iter()
            .next()
            .ok_or_else(|| EmbeddingError::Unreachable("empty embedding response".to_string()))
    }

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let mut model = self
            .model
            .lock()
            .map_err(|_| EmbeddingError::Unreachable("embedder lock poisoned".to_string()))?;
        let owned: Vec<String> = texts.iter().map(|t| t.to_string()).collect();
        let embeddings = model
            .embed(owned, None)
            .map_err(|e| EmbeddingError::Transient(e.to_string()))?;
        if embeddings.is_empty() {
            return Err(EmbeddingError::Unreachable(
                "embedding provider returned no results".to_string(),
            ));
        }
        Ok(embeddings)
    }
}
