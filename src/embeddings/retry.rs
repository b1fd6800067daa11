//! RetryingEmbedder: keeps retry/backoff/timeout policy at the boundary
//! wrapping an external embedding provider, rather than inside callers.

use std::time::Duration;

use super::{EmbeddingError, Embedder};

/// Retry/backoff policy applied around an inner [`Embedder`].
#[derive(Debug, Clone, Copy)]
pub struct RetryConfig {
    /// Maximum number of attempts (including the first).
    pub max_attempts: u32,
    /// Initial backoff delay.
    pub initial_backoff: Duration,
    /// Backoff multiplier applied after each failed attempt.
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(100),
            backoff_multiplier: 2.0,
        }
    }
}

/// Decorates an [`Embedder`] with exponential-backoff retry on transient
/// failures. Configuration/unreachable failures are not retried: only a
/// transient failure gets backed off and retried, and if it still fails
/// the node is left unchanged rather than aborting the sync.
pub struct RetryingEmbedder<E> {
    inner: E,
    config: RetryConfig,
}

impl<E: Embedder> RetryingEmbedder<E> {
    pub fn new(inner: E, config: RetryConfig) -> Self {
        Self { inner, config }
    }

    pub fn with_default_policy(inner: E) -> Self {
        Self::new(inner, RetryConfig::default())
    }
}

impl<E: Embedder> Embedder for RetryingEmbedder<E> {
    fn dimensions(&self) -> usize {
        self.inner.dimensions()
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let mut backoff = self.config.initial_backoff;
        let mut last_err = None;

        for attempt in 0..self.config.max_attempts {
            match self.inner.embed(text) {
                Ok(v) => return Ok(v),
                Err(e) if e.is_retryable() && attempt + 1 < self.config.max_attempts => {
                    tracing::debug!(attempt, error = %e, "retrying transient embedding failure");
                    std::thread::sleep(backoff);
                    backoff = backoff.mul_f64(self.config.backoff_multiplier);
                    last_err = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_err.unwrap_or_else(|| {
            EmbeddingError::Unreachable("retry budget exhausted".to_string())
        }))
    }

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        texts.iter().map(|t| self.embed(t)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct FlakyEmbedder {
        fail_count: AtomicU32,
        dims: usize,
    }

    impl Embedder for FlakyEmbedder {
        fn dimensions(&self) -> usize {
            self.dims
        }

        fn embed(&self, _text: &str) -> Result<Vec<f32>, EmbeddingError> {
            let remaining = self.fail_count.fetch_sub(1, Ordering::SeqCst);
            if remaining > 0 {
                Err(EmbeddingError::Transient("flaky".to_string()))
            } else {
                Ok(vec![1.0; self.dims])
            }
        }
    }

    #[test]
    fn retries_transient_failures_until_success() {
        let embedder = RetryingEmbedder::new(
            FlakyEmbedder {
                fail_count: AtomicU32::new(2),
                dims: 4,
            },
            RetryConfig {
                max_attempts: 5,
                initial_backoff: Duration::from_millis(1),
                backoff_multiplier: 1.0,
            },
        );
        let result = embedder.embed("x");
        assert!(result.is_ok());
    }

    #[test]
    fn exhausts_budget_and_propagates() {
        let embedder = RetryingEmbedder::new(
            FlakyEmbedder {
                fail_count: AtomicU32::new(100),
                dims: 4,
            },
            RetryConfig {
                max_attempts: 2,
                initial_backoff: Duration::from_millis(1),
                backoff_multiplier: 1.0,
            },
        );
        assert!(embedder.embed("x").is_err());
    }

    struct AlwaysConfigError;
    impl Embedder for AlwaysConfigError {
        fn dimensions(&self) -> usize {
            4
        }
        fn embed(&self, _text: &str) -> Result<Vec<f32>, EmbeddingError> {
            Err(EmbeddingError::Configuration("bad key".to_string()))
        }
    }

    #[test]
    fn does_not_retry_configuration_errors() {
        let embedder = RetryingEmbedder::with_default_policy(AlwaysConfigError);
        match embedder.embed("x") {
            Err(EmbeddingError::Configuration(_)) => {}
            other => panic!("expected immediate configuration error, got {other:?}"),
        }
    }
}
