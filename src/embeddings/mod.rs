// Embeddings module
// Passage chunking and the embedding provider seam

pub mod chunking;

pub use chunking::{Chunker, ChunkingConfig, ChunkingError, Passage, Passages};

use crate::provider::ProviderError;

/// Maps text to fixed-length vectors through an external provider
pub trait Embedder {
    /// Embed a batch of texts, one vector per input, in input order
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ProviderError>;

    /// Largest batch the provider should be sent at once
    fn batch_size(&self) -> usize {
        64
    }

    fn embed_query(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
        self.embed_batch(&[text.to_string()])?
            .pop()
            .ok_or_else(|| ProviderError::InvalidResponse("no embedding returned".to_string()))
    }
}

impl<T: Embedder + ?Sized> Embedder for &T {
    #[inline]
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ProviderError> {
        (**self).embed_batch(texts)
    }

    #[inline]
    fn batch_size(&self) -> usize {
        (**self).batch_size()
    }

    #[inline]
    fn embed_query(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
        (**self).embed_query(text)
    }
}
