
use chrono::Utc;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::database::{EmbeddingRecord, IndexHandle, RecordMetadata, VectorStore};
use crate::embeddings::{Embedder, Passage};
use crate::{ChatError, Result};

/// Outcome of building an index
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexSummary {
    pub index_name: String,
    pub documents: usize,
    pub passages: usize,
    pub dimension: usize,
}

/// Embeds passages and writes them to a named index
pub struct Indexer<'a, E> {
    store: &'a VectorStore,
    embedder: &'a E,
}

impl<'a, E: Embedder> Indexer<'a, E> {
    #[inline]
    pub const fn new(store: &'a VectorStore, embedder: &'a E) -> Self {
        Self { store, embedder }
    }

    /// Embed every passage and replace the index `name` with the result
    #[inline]
    pub async fn build(&self, name: &str, passages: &[Passage]) -> Result<IndexHandle> {
        if passages.is_empty() {
            return Err(ChatError::EmptyInput);
        }

        let records = embed_passages(self.embedder, passages, &progress_bar(passages.len()))?;
        let handle = self.store.write_index(name, &records).await?;

        info!(
            "Indexed {} passages into '{}'",
            passages.len(),
            handle.name()
        );
        Ok(handle)
    }
}

fn progress_bar(len: usize) -> ProgressBar {
    if console::user_attended_stderr() {
        ProgressBar::new(len as u64).with_style(
            ProgressStyle::with_template("{spinner} [{pos}/{len}] Embedding passages {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        )
    } else {
        ProgressBar::hidden()
    }
}

/// Embed passages in provider-sized batches, one record per passage
///
/// The first failing batch aborts the whole run.
#[inline]
pub fn embed_passages<E: Embedder>(
    embedder: &E,
    passages: &[Passage],
    bar: &ProgressBar,
) -> Result<Vec<EmbeddingRecord>> {
    let batch_size = embedder.batch_size().max(1);
    let created_at = Utc::now().to_rfc3339();
    let mut records = Vec::with_capacity(passages.len());

    for (batch_number, batch) in passages.chunks(batch_size).enumerate() {
        let texts: Vec<String> = batch.iter().map(|p| p.text.clone()).collect();
        debug!(
            "Embedding batch {} ({} passages)",
            batch_number + 1,
            texts.len()
        );

        let vectors = embedder.embed_batch(&texts).map_err(|e| {
            error!("Embedding batch {} failed: {}", batch_number + 1, e);
            e
        })?;

        if vectors.len() != batch.len() {
            bar.abandon();
            return Err(ChatError::Database(format!(
                "Embedder returned {} vectors for {} passages",
                vectors.len(),
                batch.len()
            )));
        }

        records.extend(batch.iter().zip(vectors).map(|(passage, vector)| {
            EmbeddingRecord {
                id: Uuid::new_v4().to_string(),
                vector,
                metadata: RecordMetadata {
                    content: passage.text.clone(),
                    source: passage.source.clone(),
                    chunk_index: u32::try_from(passage.chunk_index).unwrap_or(u32::MAX),
                    created_at: created_at.clone(),
                },
            }
        }));
        bar.inc(batch.len() as u64);
    }

    bar.finish_and_clear();
    Ok(records)
}
