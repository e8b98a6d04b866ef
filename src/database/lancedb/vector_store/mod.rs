
use super::{IndexRecord, ScoredChunk, rank_hits};
use crate::RagError;
use arrow::array::{
    Array, FixedSizeListArray, Float32Array, RecordBatchIterator, StringArray, UInt32Array,
};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use futures::TryStreamExt;
use lancedb::{
    Connection,
    query::{ExecutableQuery, QueryBase},
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// A named vector index stored as a LanceDB table
pub struct VectorStore {
    connection: Connection,
    directory: PathBuf,
    table_name: String,
    vector_dimension: Option<usize>,
}

impl VectorStore {
    /// Connect for writing, creating the index directory if needed
    ///
    /// # Errors
    /// `RagError::Config` if the directory cannot be created or opened for writing
    #[inline]
    pub async fn create(directory: &Path, name: &str) -> Result<Self, RagError> {
        std::fs::create_dir_all(directory).map_err(|e| {
            RagError::Config(format!(
                "Failed to create index directory {}: {}",
                directory.display(),
                e
            ))
        })?;

        let connection = Self::connect(directory).await.map_err(|e| {
            RagError::Config(format!(
                "Cannot write index directory {}: {}",
                directory.display(),
                e
            ))
        })?;

        Ok(Self {
            connection,
            directory: directory.to_path_buf(),
            table_name: name.to_string(),
            vector_dimension: None,
        })
    }

    /// Open an index that a previous build produced
    ///
    /// # Errors
    /// `RagError::Storage` if the directory or table is missing or unreadable
    #[inline]
    pub async fn open(directory: &Path, name: &str) -> Result<Self, RagError> {
        if !directory.is_dir() {
            return Err(RagError::Storage(format!(
                "Index directory {} does not exist; run the build command first",
                directory.display()
            )));
        }

        let connection = Self::connect(directory).await?;

        let table_names = connection
            .table_names()
            .execute()
            .await
            .map_err(|e| RagError::Storage(format!("Failed to list tables: {}", e)))?;

        if !table_names.iter().any(|table| table == name) {
            return Err(RagError::Storage(format!(
                "Index '{}' not found in {}",
                name,
                directory.display()
            )));
        }

        let mut store = Self {
            connection,
            directory: directory.to_path_buf(),
            table_name: name.to_string(),
            vector_dimension: None,
        };
        store.vector_dimension = Some(store.detect_existing_vector_dimension().await?);

        info!(
            "Opened index '{}' ({} dimensions)",
            store.table_name,
            store.vector_dimension.unwrap_or_default()
        );
        Ok(store)
    }

    async fn connect(directory: &Path) -> Result<Connection, RagError> {
        let uri = format!("file://{}", directory.display());
        debug!("Connecting to LanceDB at {}", uri);

        lancedb::connect(&uri)
            .execute()
            .await
            .map_err(|e| RagError::Storage(format!("Failed to connect to LanceDB: {}", e)))
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.table_name
    }

    #[inline]
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    #[inline]
    pub fn dimension(&self) -> Option<usize> {
        self.vector_dimension
    }

    /// Detect vector dimension from existing table schema
    async fn detect_existing_vector_dimension(&self) -> Result<usize, RagError> {
        let table = self.open_table().await?;

        let schema = table
            .schema()
            .await
            .map_err(|e| RagError::Storage(format!("Failed to get table schema: {}", e)))?;

        for field in schema.fields() {
            if field.name() == "vector" {
                if let DataType::FixedSizeList(_, size) = field.data_type() {
                    return usize::try_from(*size).map_err(|_| {
                        RagError::Storage(format!("Invalid vector dimension {}", size))
                    });
                }
            }
        }

        Err(RagError::Storage(
            "Could not find vector column or determine dimension".to_string(),
        ))
    }

    fn create_schema(vector_dim: i32) -> Arc<Schema> {
        Arc::new(Schema::new(vec![
            Field::new("position", DataType::UInt32, false),
            Field::new(
                "vector",
                DataType::FixedSizeList(
                    Arc::new(Field::new("item", DataType::Float32, false)),
                    vector_dim,
                ),
                false,
            ),
            Field::new("content", DataType::Utf8, false),
        ]))
    }

    /// Replace any existing table of this name with an empty one
    ///
    /// # Errors
    /// `RagError::Config` if the destination cannot be written
    #[inline]
    pub async fn recreate(&mut self, vector_dim: usize) -> Result<(), RagError> {
        info!(
            "Creating index '{}' with vector dimension: {}",
            self.table_name, vector_dim
        );

        self.drop_table_if_exists().await?;

        let schema = Self::create_schema(Self::dimension_as_i32(vector_dim)?);
        self.connection
            .create_empty_table(&self.table_name, schema)
            .execute()
            .await
            .map_err(|e| self.write_error("create table", &e))?;

        self.vector_dimension = Some(vector_dim);
        Ok(())
    }

    /// Append records to the table created by [`VectorStore::recreate`]
    #[inline]
    pub async fn insert(&mut self, records: &[IndexRecord]) -> Result<(), RagError> {
        if records.is_empty() {
            debug!("No records to store");
            return Ok(());
        }

        debug!("Storing batch of {} records", records.len());

        let record_batch = self.create_record_batch(records)?;
        let table = self
            .open_table()
            .await
            .map_err(|e| self.write_error("open", &e))?;

        let schema = record_batch.schema();
        let reader = RecordBatchIterator::new(std::iter::once(Ok(record_batch)), schema);
        table
            .add(reader)
            .execute()
            .await
            .map_err(|e| self.write_error("insert records into", &e))?;

        debug!("Stored {} records", records.len());
        Ok(())
    }

    fn dimension_as_i32(vector_dim: usize) -> Result<i32, RagError> {
        i32::try_from(vector_dim)
            .map_err(|_| RagError::Storage(format!("Vector dimension {} is too large", vector_dim)))
    }

    fn create_record_batch(&self, records: &[IndexRecord]) -> Result<RecordBatch, RagError> {
        let vector_dim = self
            .vector_dimension
            .ok_or_else(|| RagError::Storage("Vector dimension not set".to_string()))?;

        let mut positions = Vec::with_capacity(records.len());
        let mut contents = Vec::with_capacity(records.len());
        let mut flat_values = Vec::with_capacity(records.len() * vector_dim);

        for record in records {
            if record.vector.len() != vector_dim {
                return Err(RagError::Storage(format!(
                    "Vector for chunk {} has {} dimensions, index expects {}",
                    record.position,
                    record.vector.len(),
                    vector_dim
                )));
            }
            positions.push(record.position);
            contents.push(record.content.as_str());
            flat_values.extend_from_slice(&record.vector);
        }

        let vector_dim = Self::dimension_as_i32(vector_dim)?;
        let field = Arc::new(Field::new("item", DataType::Float32, false));
        let vector_array = FixedSizeListArray::try_new(
            field,
            vector_dim,
            Arc::new(Float32Array::from(flat_values)),
            None,
        )
        .map_err(|e| RagError::Storage(format!("Failed to create vector array: {}", e)))?;

        let arrays: Vec<Arc<dyn Array>> = vec![
            Arc::new(UInt32Array::from(positions)),
            Arc::new(vector_array),
            Arc::new(StringArray::from(contents)),
        ];

        RecordBatch::try_new(Self::create_schema(vector_dim), arrays)
            .map_err(|e| RagError::Storage(format!("Failed to create record batch: {}", e)))
    }

    /// Find the `limit` stored chunks nearest to `query_vector`
    ///
    /// Results are ordered by ascending L2 distance, ties by insertion order.
    #[inline]
    pub async fn search(
        &self,
        query_vector: &[f32],
        limit: usize,
    ) -> Result<Vec<ScoredChunk>, RagError> {
        let expected = self
            .vector_dimension
            .ok_or_else(|| RagError::Storage("Vector dimension not set".to_string()))?;
        if query_vector.len() != expected {
            return Err(RagError::Storage(format!(
                "Query vector has {} dimensions but index '{}' stores {}",
                query_vector.len(),
                self.table_name,
                expected
            )));
        }

        let total = self.count().await?;
        if limit == 0 || total == 0 {
            return Ok(Vec::new());
        }

        debug!("Searching for similar vectors with limit: {}", limit);

        let mut fetch = limit.min(total);
        let mut hits = self.nearest(query_vector, fetch).await?;

        // Rows tied with the k-th hit may have been cut by the query limit;
        // widen until every row at that distance is present.
        if let Some(boundary) = hits.get(limit - 1).map(|hit| hit.distance) {
            while fetch < total && hits.last().is_some_and(|hit| hit.distance <= boundary) {
                fetch = fetch.saturating_mul(2).min(total);
                debug!("Widening search to {} rows for ties at distance {}", fetch, boundary);
                hits = self.nearest(query_vector, fetch).await?;
            }
        }

        hits.truncate(limit);
        Ok(hits)
    }

    /// Exact nearest `limit` rows, ranked by (distance, position)
    async fn nearest(
        &self,
        query_vector: &[f32],
        limit: usize,
    ) -> Result<Vec<ScoredChunk>, RagError> {
        let table = self.open_table().await?;
        let results = table
            .vector_search(query_vector)
            .map_err(|e| RagError::Storage(format!("Failed to create vector search: {}", e)))?
            .column("vector")
            .limit(limit)
            .execute()
            .await
            .map_err(|e| RagError::Storage(format!("Failed to execute search: {}", e)))?;

        let mut hits = Self::parse_search_results_stream(results).await?;
        rank_hits(&mut hits);
        Ok(hits)
    }

    async fn parse_search_results_stream(
        mut results: lancedb::arrow::SendableRecordBatchStream,
    ) -> Result<Vec<ScoredChunk>, RagError> {
        let mut hits = Vec::new();

        while let Some(batch) = results
            .try_next()
            .await
            .map_err(|e| RagError::Storage(format!("Failed to read result stream: {}", e)))?
        {
            hits.extend(Self::parse_search_batch(&batch)?);
        }

        debug!("Parsed {} search results from stream", hits.len());
        Ok(hits)
    }

    fn parse_search_batch(batch: &RecordBatch) -> Result<Vec<ScoredChunk>, RagError> {
        let positions = batch
            .column_by_name("position")
            .ok_or_else(|| RagError::Storage("Missing position column".to_string()))?
            .as_any()
            .downcast_ref::<UInt32Array>()
            .ok_or_else(|| RagError::Storage("Invalid position column type".to_string()))?;

        let contents = batch
            .column_by_name("content")
            .ok_or_else(|| RagError::Storage("Missing content column".to_string()))?
            .as_any()
            .downcast_ref::<StringArray>()
            .ok_or_else(|| RagError::Storage("Invalid content column type".to_string()))?;

        let distances = batch
            .column_by_name("_distance")
            .and_then(|col| col.as_any().downcast_ref::<Float32Array>());

        let hits = (0..batch.num_rows())
            .map(|row| ScoredChunk {
                position: positions.value(row),
                content: contents.value(row).to_string(),
                distance: distances.map_or(0.0, |d| if d.is_null(row) { 0.0 } else { d.value(row) }),
            })
            .collect();

        Ok(hits)
    }

    /// Get the total number of stored chunks
    #[inline]
    pub async fn count(&self) -> Result<usize, RagError> {
        let table = self.open_table().await?;

        table
            .count_rows(None)
            .await
            .map_err(|e| RagError::Storage(format!("Failed to count rows: {}", e)))
    }

    async fn open_table(&self) -> Result<lancedb::Table, RagError> {
        self.connection
            .open_table(&self.table_name)
            .execute()
            .await
            .map_err(|e| RagError::Storage(format!("Failed to open table: {}", e)))
    }

    async fn drop_table_if_exists(&self) -> Result<(), RagError> {
        let table_names = self
            .connection
            .table_names()
            .execute()
            .await
            .map_err(|e| self.write_error("list tables for", &e))?;

        if table_names.contains(&self.table_name) {
            info!("Dropping existing index table '{}'", self.table_name);
            self.connection
                .drop_table(&self.table_name)
                .await
                .map_err(|e| self.write_error("drop", &e))?;
        }

        Ok(())
    }

    /// Build-time failures mean the destination is not writable
    fn write_error(&self, action: &str, error: &dyn std::fmt::Display) -> RagError {
        RagError::Config(format!(
            "Failed to {} index '{}' in {}: {}",
            action,
            self.table_name,
            self.directory.display(),
            error
        ))
    }
}
