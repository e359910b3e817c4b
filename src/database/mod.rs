// Database module
// Named vector indexes persisted with LanceDB

pub mod lancedb;

pub use self::lancedb::{EmbeddingRecord, RecordMetadata};
pub use self::lancedb::vector_store::{IndexHandle, SearchResult, VectorStore};
