//! Storage backend (Arrow/Parquet/CSV)
//!
//! The experiment table is a single in-memory Arrow `RecordBatch`:
//! - Loaders combine every batch a file yields into one snapshot
//! - Every analysis stage reads the snapshot and produces a new derived value
//! - Append-only: batches can be added, rows are never updated in place
//!
//! Locating the file is the caller's job; these loaders only read a given path.

use crate::{Error, Result};
use arrow::array::ArrayRef;
use arrow::compute;
use arrow::datatypes::SchemaRef;
use arrow::record_batch::RecordBatch;
use std::path::Path;
use std::sync::Arc;

/// Immutable snapshot of raw trial records
#[derive(Debug, Clone)]
pub struct ExperimentTable {
    batch: RecordBatch,
}

impl ExperimentTable {
    /// Wrap an existing batch
    ///
    /// Useful for testing and benchmarking
    #[must_use]
    pub const fn new(batch: RecordBatch) -> Self {
        Self { batch }
    }

    /// Combine batches sharing one schema into a single table
    ///
    /// # Errors
    /// Returns error if `batches` is empty or the schemas disagree
    pub fn from_batches(batches: &[RecordBatch]) -> Result<Self> {
        let first = batches
            .first()
            .ok_or_else(|| Error::InvalidInput("No record batches supplied".to_string()))?;

        if batches.len() == 1 {
            return Ok(Self::new(first.clone()));
        }

        let schema = first.schema();
        if let Some(other) = batches.iter().find(|b| b.schema() != schema) {
            return Err(Error::StorageError(format!(
                "Schema mismatch: expected {:?}, got {:?}",
                schema,
                other.schema()
            )));
        }

        compute::concat_batches(&schema, batches)
            .map(Self::new)
            .map_err(|e| Error::StorageError(format!("Failed to combine batches: {e}")))
    }

    /// Load table from Parquet file
    ///
    /// # Errors
    /// Returns error if file cannot be read or parsed
    pub fn load_parquet<P: AsRef<Path>>(path: P) -> Result<Self> {
        use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
        use std::fs::File;

        let file = File::open(path.as_ref()).map_err(|e| {
            Error::StorageError(format!("Failed to open Parquet file: {e}"))
        })?;

        let builder = ParquetRecordBatchReaderBuilder::try_new(file).map_err(|e| {
            Error::StorageError(format!("Failed to parse Parquet file: {e}"))
        })?;
        let schema = builder.schema().clone();

        let reader = builder.build().map_err(|e| {
            Error::StorageError(format!("Failed to create Parquet reader: {e}"))
        })?;

        let mut batches = Vec::new();
        for batch in reader {
            let batch = batch.map_err(|e| {
                Error::StorageError(format!("Failed to read record batch: {e}"))
            })?;
            batches.push(batch);
        }

        Self::from_batches_or_empty(schema, &batches)
    }

    /// Load table from a CSV file with a header row
    ///
    /// Column types are inferred from the whole file, so a `treatment` column
    /// of `control`/`treatment` labels arrives as text and `0`/`1` as integers.
    ///
    /// # Errors
    /// Returns error if file cannot be read or parsed
    pub fn load_csv<P: AsRef<Path>>(path: P) -> Result<Self> {
        use arrow::csv::reader::Format;
        use arrow::csv::ReaderBuilder;
        use std::fs::File;
        use std::io::Seek;

        let mut file = File::open(path.as_ref())
            .map_err(|e| Error::StorageError(format!("Failed to open CSV file: {e}")))?;

        let (schema, _) = Format::default()
            .with_header(true)
            .infer_schema(&mut file, None)
            .map_err(|e| Error::StorageError(format!("Failed to infer CSV schema: {e}")))?;
        file.rewind()?;

        let schema = Arc::new(schema);
        let reader = ReaderBuilder::new(schema.clone())
            .with_header(true)
            .build(file)
            .map_err(|e| Error::StorageError(format!("Failed to create CSV reader: {e}")))?;

        let mut batches = Vec::new();
        for batch in reader {
            let batch = batch
                .map_err(|e| Error::StorageError(format!("Failed to read CSV batch: {e}")))?;
            batches.push(batch);
        }

        Self::from_batches_or_empty(schema, &batches)
    }

    fn from_batches_or_empty(schema: SchemaRef, batches: &[RecordBatch]) -> Result<Self> {
        if batches.is_empty() {
            return Ok(Self::new(RecordBatch::new_empty(schema)));
        }
        Self::from_batches(batches)
    }

    /// Append a batch (OLAP-style bulk load)
    ///
    /// # Errors
    ///
    /// Returns error if batch schema doesn't match the table
    pub fn append_batch(&mut self, batch: &RecordBatch) -> Result<()> {
        let existing_schema = self.batch.schema();
        if batch.schema() != existing_schema {
            return Err(Error::StorageError(format!(
                "Schema mismatch: expected {:?}, got {:?}",
                existing_schema,
                batch.schema()
            )));
        }

        self.batch = compute::concat_batches(&existing_schema, [&self.batch, batch])
            .map_err(|e| Error::StorageError(format!("Failed to append batch: {e}")))?;
        Ok(())
    }

    /// Underlying record batch
    #[must_use]
    pub const fn batch(&self) -> &RecordBatch {
        &self.batch
    }

    /// Table schema
    #[must_use]
    pub fn schema(&self) -> SchemaRef {
        self.batch.schema()
    }

    /// Number of trial records
    #[must_use]
    pub fn num_rows(&self) -> usize {
        self.batch.num_rows()
    }

    /// Column names in schema order
    #[must_use]
    pub fn column_names(&self) -> Vec<String> {
        self.batch
            .schema()
            .fields()
            .iter()
            .map(|f| f.name().clone())
            .collect()
    }

    /// Whether a column with this exact name exists
    #[must_use]
    pub fn has_column(&self, name: &str) -> bool {
        self.batch.column_by_name(name).is_some()
    }

    /// Column by name
    #[must_use]
    pub fn column(&self, name: &str) -> Option<&ArrayRef> {
        self.batch.column_by_name(name)
    }
}

impl From<RecordBatch> for ExperimentTable {
    fn from(batch: RecordBatch) -> Self {
        Self::new(batch)
    }
}
