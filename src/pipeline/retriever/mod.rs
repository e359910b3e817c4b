use tracing::debug;

use crate::Result;
use crate::database::IndexHandle;
use crate::embeddings::Embedder;

/// A retrieved passage with its distance to the query, smaller is closer
#[derive(Debug, Clone, PartialEq)]
pub struct RankedPassage {
    pub text: String,
    pub source: String,
    pub chunk_index: u32,
    pub distance: f32,
}

pub struct Retriever<'a, E> {
    embedder: &'a E,
    top_k: usize,
}

impl<'a, E: Embedder> Retriever<'a, E> {
    #[inline]
    pub const fn new(embedder: &'a E, top_k: usize) -> Self {
        Self { embedder, top_k }
    }

    /// The `top_k` passages closest to `query`, closest first
    #[inline]
    pub async fn retrieve(&self, index: &IndexHandle, query: &str) -> Result<Vec<RankedPassage>> {
        let query_vector = self.embedder.embed_query(query)?;
        let results = index.search(&query_vector, self.top_k).await?;

        debug!(
            "Retrieved {} passages from '{}'",
            results.len(),
            index.name()
        );

        Ok(results
            .into_iter()
            .map(|result| RankedPassage {
                text: result.metadata.content,
                source: result.metadata.source,
                chunk_index: result.metadata.chunk_index,
                distance: result.distance,
            })
            .collect())
    }
}
