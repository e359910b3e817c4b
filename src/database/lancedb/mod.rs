// LanceDB vector database module
// One table per named index; each row is a passage with its embedding


pub mod vector_store;

use serde::{Deserialize, Serialize};

/// Embedding record stored in LanceDB
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingRecord {
    /// Unique identifier for this embedding
    pub id: String,
    pub vector: Vec<f32>,
    pub metadata: RecordMetadata,
}

/// Passage data stored alongside its embedding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordMetadata {
    /// The passage text
    pub content: String,
    /// Name of the document the passage was cut from
    pub source: String,
    /// Position of the passage within its document
    pub chunk_index: u32,
    /// RFC 3339 timestamp of when the index was written
    pub created_at: String,
}
