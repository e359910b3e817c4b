
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::extractor::DocumentText;

/// A passage of source text, ready for embedding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Passage {
    /// The passage text, never empty
    pub text: String,
    /// Name of the document this passage was cut from
    pub source: String,
    /// Position of this passage within its source document
    pub chunk_index: usize,
}

/// Configuration for passage chunking, in characters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Target passage length
    pub chunk_size: usize,
    /// Characters shared between the end of one passage and the start of the next
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    #[inline]
    fn default() -> Self {
        Self {
            chunk_size: 10_000,
            chunk_overlap: 1_000,
        }
    }
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ChunkingError {
    #[error("Chunk size must be greater than zero")]
    ZeroChunkSize,
    #[error("Chunk overlap ({overlap}) must be smaller than chunk size ({size})")]
    OverlapTooLarge { overlap: usize, size: usize },
}

/// Splits text into fixed-size, overlapping passages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunker {
    chunk_size: usize,
    overlap: usize,
}

impl Chunker {
    #[inline]
    pub const fn new(chunk_size: usize, overlap: usize) -> Result<Self, ChunkingError> {
        if chunk_size == 0 {
            return Err(ChunkingError::ZeroChunkSize);
        }
        if overlap >= chunk_size {
            return Err(ChunkingError::OverlapTooLarge {
                overlap,
                size: chunk_size,
            });
        }
        Ok(Self {
            chunk_size,
            overlap,
        })
    }

    #[inline]
    pub const fn from_config(config: &ChunkingConfig) -> Result<Self, ChunkingError> {
        Self::new(config.chunk_size, config.chunk_overlap)
    }

    #[inline]
    pub const fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    #[inline]
    pub const fn overlap(&self) -> usize {
        self.overlap
    }

    /// Lazily split `text` into passages.
    ///
    /// Each passage after the first starts `overlap` characters before the
    /// previous one ends. Text no longer than the chunk size comes back as a
    /// single passage; empty text yields nothing. The returned iterator can be
    /// cloned to walk the same passages again.
    #[inline]
    pub const fn split<'a>(&self, text: &'a str) -> Passages<'a> {
        Passages {
            text,
            next_start: Some(0),
            chunk_size: self.chunk_size,
            stride: self.chunk_size - self.overlap,
        }
    }

    /// Chunk every document, skipping documents with no visible text
    #[inline]
    pub fn chunk_documents(&self, documents: &[DocumentText]) -> Vec<Passage> {
        let mut passages = Vec::new();

        for document in documents {
            if document.text.trim().is_empty() {
                debug!("Skipping document '{}' with no text", document.name);
                continue;
            }

            let before = passages.len();
            passages.extend(
                self.split(&document.text)
                    .enumerate()
                    .map(|(chunk_index, text)| Passage {
                        text: text.to_string(),
                        source: document.name.clone(),
                        chunk_index,
                    }),
            );

            debug!(
                "Chunked '{}' ({} chars) into {} passages",
                document.name,
                document.text.chars().count(),
                passages.len() - before
            );
        }

        passages
    }
}

/// Iterator over the passages of one text, see [`Chunker::split`]
#[derive(Debug, Clone)]
pub struct Passages<'a> {
    text: &'a str,
    next_start: Option<usize>,
    chunk_size: usize,
    stride: usize,
}

impl<'a> Iterator for Passages<'a> {
    type Item = &'a str;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        let start = self.next_start.take()?;
        let rest = self.text.get(start..)?;
        if rest.is_empty() {
            return None;
        }

        let end = byte_offset_after(rest, self.chunk_size).map_or(self.text.len(), |i| start + i);
        if end < self.text.len() {
            // A full chunk fits, so the stride (shorter than a chunk) lands inside `rest`
            self.next_start = byte_offset_after(rest, self.stride).map(|i| start + i);
        }

        self.text.get(start..end)
    }
}

/// Byte offset of the `chars`-th character of `text`, if the text is longer than that
fn byte_offset_after(text: &str, chars: usize) -> Option<usize> {
    text.char_indices().nth(chars).map(|(i, _)| i)
}
