//! Deterministic mock embedder: no network, pure function of the input text.

use sha2::{Digest, Sha256};

use super::{EmbeddingError, Embedder};

/// Deterministic hash-based pseudo-embedding.
///
/// Not semantically meaningful, but stable for identical input — callers
/// treat embedding as a pure function of text — which is exactly what the
/// crate's tests need: reproducible k-NN ordering without
/// a real model or network access.
pub struct MockEmbedder {
    dimensions: usize,
}

impl MockEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }
}

impl Default for MockEmbedder {
    fn default() -> Self {
        Self::new(32)
    }
}

impl Embedder for MockEmbedder {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        if text.trim().is_empty() {
            return Err(EmbeddingError::Configuration(
                "cannot embed empty text".to_string(),
            ));
        }

        let mut vector = vec![0f32; self.dimensions];
        let mut seed = text.as_bytes().to_vec();
        let mut counter: u32 = 0;

        for slot in vector.iter_mut() {
            seed.extend_from_slice(&counter.to_le_bytes());
            let digest = Sha256::digest(&seed);
            // Map the first 4 bytes of the digest into [-1.0, 1.0].
            let raw = u32::from_le_bytes([digest[0], digest[1], digest[2], digest[3]]);
            *slot = (raw as f32 / u32::MAX as f32) * 2.0 - 1.0;
            counter += 1;
        }

        normalize(&mut vector);
        Ok(vector)
    }
}

fn normalize(v: &mut [f32]) {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_text_same_vector() {
        let embedder = MockEmbedder::new(16);
        let a = embedder.embed("hello world").unwrap();
        let b = embedder.embed("hello world").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn different_text_different_vector() {
        let embedder = MockEmbedder::new(16);
        let a = embedder.embed("hello world").unwrap();
        let b = embedder.embed("goodbye world").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn respects_configured_dimension() {
        let embedder = MockEmbedder::new(64);
        assert_eq!(embedder.dimensions(), 64);
        assert_eq!(embedder.embed("text").unwrap().len(), 64);
    }

    #[test]
    fn rejects_empty_text() {
        let embedder = MockEmbedder::default();
        assert!(embedder.embed("   ").is_err());
    }
}
