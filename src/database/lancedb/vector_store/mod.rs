
use super::{EmbeddingRecord, RecordMetadata};
use crate::{ChatError, Result, config::Config};
use arrow::array::{
    Array, FixedSizeListArray, Float32Array, RecordBatchIterator, StringArray, UInt32Array,
};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use futures::TryStreamExt;
use lancedb::{
    Connection, Table,
    query::{ExecutableQuery, QueryBase},
};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Vector database holding any number of named indexes
pub struct VectorStore {
    connection: Connection,
    path: PathBuf,
}

/// An opened, non-empty index ready for similarity queries
#[derive(Clone)]
pub struct IndexHandle {
    table: Table,
    name: String,
    dimension: usize,
}

/// Search result from vector similarity search
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    pub metadata: RecordMetadata,
    pub distance: f32,
}

impl fmt::Debug for VectorStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VectorStore")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl fmt::Debug for IndexHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IndexHandle")
            .field("name", &self.name)
            .field("dimension", &self.dimension)
            .finish_non_exhaustive()
    }
}

fn db_error(context: &str) -> impl FnOnce(lancedb::Error) -> ChatError + '_ {
    move |e| ChatError::Database(format!("{}: {}", context, e))
}

impl VectorStore {
    /// Open the vector database under the configured base directory
    #[inline]
    pub async fn open(config: &Config) -> Result<Self> {
        Self::open_at(&config.vector_database_path()).await
    }

    /// Open (creating if needed) a vector database at `path`
    #[inline]
    pub async fn open_at(path: &Path) -> Result<Self> {
        debug!("Initializing LanceDB at path: {:?}", path);

        std::fs::create_dir_all(path).map_err(|e| {
            ChatError::Database(format!("Failed to create vector database directory: {}", e))
        })?;

        let uri = format!("file://{}", path.display());
        let connection = lancedb::connect(&uri)
            .execute()
            .await
            .map_err(db_error("Failed to connect to LanceDB"))?;

        Ok(Self {
            connection,
            path: path.to_path_buf(),
        })
    }

    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[inline]
    pub async fn list_indexes(&self) -> Result<Vec<String>> {
        self.connection
            .table_names()
            .execute()
            .await
            .map_err(db_error("Failed to list tables"))
    }

    #[inline]
    pub async fn index_exists(&self, name: &str) -> Result<bool> {
        Ok(self.list_indexes().await?.iter().any(|t| t == name))
    }

    /// Replace the index `name` with exactly `records`
    ///
    /// Every record must carry a vector of the same length. An existing
    /// index of that name is dropped first.
    #[inline]
    pub async fn write_index(&self, name: &str, records: &[EmbeddingRecord]) -> Result<IndexHandle> {
        let Some(first) = records.first() else {
            return Err(ChatError::EmptyInput);
        };

        let dimension = first.vector.len();
        if dimension == 0 {
            return Err(ChatError::Database("Embeddings have no dimensions".to_string()));
        }
        if let Some(bad) = records.iter().find(|r| r.vector.len() != dimension) {
            return Err(ChatError::Database(format!(
                "Embedding {} has dimension {}, expected {}",
                bad.id,
                bad.vector.len(),
                dimension
            )));
        }

        self.drop_index(name).await?;

        let schema = create_schema(dimension);
        let table = self
            .connection
            .create_empty_table(name, schema.clone())
            .execute()
            .await
            .map_err(db_error("Failed to create table"))?;

        let record_batch = create_record_batch(schema, dimension, records)?;
        let batch_schema = record_batch.schema();
        let reader = RecordBatchIterator::new(std::iter::once(Ok(record_batch)), batch_schema);
        table
            .add(reader)
            .execute()
            .await
            .map_err(db_error("Failed to insert embeddings"))?;

        info!(
            "Wrote index '{}' with {} embeddings of dimension {}",
            name,
            records.len(),
            dimension
        );

        Ok(IndexHandle {
            table,
            name: name.to_string(),
            dimension,
        })
    }

    /// Open an existing index, failing with [`ChatError::IndexMissing`] if absent
    #[inline]
    pub async fn open_index(&self, name: &str) -> Result<IndexHandle> {
        if !self.index_exists(name).await? {
            return Err(ChatError::IndexMissing {
                name: name.to_string(),
            });
        }

        let table = self
            .connection
            .open_table(name)
            .execute()
            .await
            .map_err(db_error("Failed to open existing table"))?;

        let dimension = detect_vector_dimension(&table).await?;
        debug!("Opened index '{}' with dimension {}", name, dimension);

        Ok(IndexHandle {
            table,
            name: name.to_string(),
            dimension,
        })
    }

    /// Drop the index if it exists, reporting whether anything was removed
    #[inline]
    pub async fn drop_index(&self, name: &str) -> Result<bool> {
        if !self.index_exists(name).await? {
            return Ok(false);
        }

        info!("Dropping existing index '{}'", name);
        self.connection
            .drop_table(name)
            .await
            .map_err(db_error("Failed to drop table"))?;
        Ok(true)
    }
}

impl IndexHandle {
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub const fn dimension(&self) -> usize {
        self.dimension
    }

    #[inline]
    pub async fn count(&self) -> Result<usize> {
        self.table
            .count_rows(None)
            .await
            .map_err(db_error("Failed to count rows"))
    }

    /// The `limit` passages nearest to `query_vector`, nearest first
    #[inline]
    pub async fn search(&self, query_vector: &[f32], limit: usize) -> Result<Vec<SearchResult>> {
        if query_vector.len() != self.dimension {
            return Err(ChatError::Database(format!(
                "Query has dimension {}, index '{}' has dimension {}",
                query_vector.len(),
                self.name,
                self.dimension
            )));
        }
        if limit == 0 {
            return Ok(Vec::new());
        }

        debug!(
            "Searching index '{}' for {} nearest passages",
            self.name, limit
        );

        let mut results = self
            .table
            .vector_search(query_vector)
            .map_err(db_error("Failed to create vector search"))?
            .column("vector")
            .limit(limit)
            .execute()
            .await
            .map_err(db_error("Failed to execute search"))?;

        let mut search_results = Vec::new();
        while let Some(batch) = results
            .try_next()
            .await
            .map_err(db_error("Failed to read result stream"))?
        {
            search_results.extend(parse_search_batch(&batch)?);
        }

        search_results.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        search_results.truncate(limit);
        Ok(search_results)
    }
}

fn create_schema(vector_dim: usize) -> Arc<Schema> {
    Arc::new(Schema::new(vec![
        Field::new("id", DataType::Utf8, false),
        Field::new(
            "vector",
            DataType::FixedSizeList(
                Arc::new(Field::new("item", DataType::Float32, false)),
                vector_dim as i32,
            ),
            false,
        ),
        Field::new("content", DataType::Utf8, false),
        Field::new("source", DataType::Utf8, false),
        Field::new("chunk_index", DataType::UInt32, false),
        Field::new("created_at", DataType::Utf8, false),
    ]))
}

async fn detect_vector_dimension(table: &Table) -> Result<usize> {
    let schema = table
        .schema()
        .await
        .map_err(db_error("Failed to get table schema"))?;

    schema
        .fields()
        .iter()
        .find(|field| field.name() == "vector")
        .and_then(|field| match field.data_type() {
            DataType::FixedSizeList(_, size) => usize::try_from(*size).ok(),
            _ => None,
        })
        .ok_or_else(|| {
            ChatError::Database("Could not find vector column or determine dimension".to_string())
        })
}

fn create_record_batch(
    schema: Arc<Schema>,
    vector_dim: usize,
    records: &[EmbeddingRecord],
) -> Result<RecordBatch> {
    let len = records.len();

    let mut ids = Vec::with_capacity(len);
    let mut flat_values = Vec::with_capacity(len * vector_dim);
    let mut contents = Vec::with_capacity(len);
    let mut sources = Vec::with_capacity(len);
    let mut chunk_indices = Vec::with_capacity(len);
    let mut created_ats = Vec::with_capacity(len);

    for record in records {
        ids.push(record.id.as_str());
        flat_values.extend_from_slice(&record.vector);
        contents.push(record.metadata.content.as_str());
        sources.push(record.metadata.source.as_str());
        chunk_indices.push(record.metadata.chunk_index);
        created_ats.push(record.metadata.created_at.as_str());
    }

    let field = Arc::new(Field::new("item", DataType::Float32, false));
    let vector_array = FixedSizeListArray::try_new(
        field,
        vector_dim as i32,
        Arc::new(Float32Array::from(flat_values)),
        None,
    )
    .map_err(|e| ChatError::Database(format!("Failed to create vector array: {}", e)))?;

    let arrays: Vec<Arc<dyn Array>> = vec![
        Arc::new(StringArray::from(ids)),
        Arc::new(vector_array),
        Arc::new(StringArray::from(contents)),
        Arc::new(StringArray::from(sources)),
        Arc::new(UInt32Array::from(chunk_indices)),
        Arc::new(StringArray::from(created_ats)),
    ];

    RecordBatch::try_new(schema, arrays)
        .map_err(|e| ChatError::Database(format!("Failed to create record batch: {}", e)))
}

fn column<'a, T: 'static>(batch: &'a RecordBatch, name: &str) -> Result<&'a T> {
    batch
        .column_by_name(name)
        .ok_or_else(|| ChatError::Database(format!("Missing {} column", name)))?
        .as_any()
        .downcast_ref::<T>()
        .ok_or_else(|| ChatError::Database(format!("Invalid {} column type", name)))
}

fn parse_search_batch(batch: &RecordBatch) -> Result<Vec<SearchResult>> {
    let contents = column::<StringArray>(batch, "content")?;
    let sources = column::<StringArray>(batch, "source")?;
    let chunk_indices = column::<UInt32Array>(batch, "chunk_index")?;
    let created_ats = column::<StringArray>(batch, "created_at")?;
    let distances = column::<Float32Array>(batch, "_distance").ok();

    let results = (0..batch.num_rows())
        .map(|row| SearchResult {
            metadata: RecordMetadata {
                content: contents.value(row).to_string(),
                source: sources.value(row).to_string(),
                chunk_index: chunk_indices.value(row),
                created_at: created_ats.value(row).to_string(),
            },
            distance: distances
                .filter(|d| !d.is_null(row))
                .map_or(0.0, |d| d.value(row)),
        })
        .collect();

    Ok(results)
}
