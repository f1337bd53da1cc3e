//! Chunk metadata table
//!
//! Row `p` describes the vector at index position `p`. The table is stored
//! as Parquet with columns `chunk_id`, `source`, `article` (nullable, may be
//! missing), `text`.

use arrow_array::{Array, ArrayRef, LargeStringArray, RecordBatch, StringArray};
use arrow_schema::{DataType, Field, Schema};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use parquet::file::properties::WriterProperties;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use crate::chunking::CorpusRecord;
use crate::errors::{LexError, Result};

/// Metadata of one indexed chunk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkRecord {
    pub chunk_id: String,
    pub source: String,
    #[serde(default)]
    pub article: Option<String>,
    pub text: String,
}

impl From<CorpusRecord> for ChunkRecord {
    fn from(record: CorpusRecord) -> Self {
        Self {
            chunk_id: record.chunk_id,
            source: record.source,
            article: record.article.filter(|a| !a.trim().is_empty()),
            text: record.text,
        }
    }
}

/// Arrow schema of the metadata table
pub fn metadata_schema() -> Schema {
    Schema::new(vec![
        Field::new("chunk_id", DataType::Utf8, false),
        Field::new("source", DataType::Utf8, false),
        Field::new("article", DataType::Utf8, true),
        Field::new("text", DataType::Utf8, false),
    ])
}

/// Position-indexed chunk records
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetadataStore {
    records: Vec<ChunkRecord>,
}

impl MetadataStore {
    /// Records must be in the order their embeddings were computed
    pub fn from_records(records: Vec<ChunkRecord>) -> Self {
        Self { records }
    }

    pub fn get(&self, position: usize) -> Option<&ChunkRecord> {
        self.records.get(position)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChunkRecord> {
        self.records.iter()
    }

    fn to_record_batch(&self) -> Result<RecordBatch> {
        let chunk_ids: StringArray = self.records.iter().map(|r| Some(r.chunk_id.as_str())).collect();
        let sources: StringArray = self.records.iter().map(|r| Some(r.source.as_str())).collect();
        let articles: StringArray = self.records.iter().map(|r| r.article.as_deref()).collect();
        let texts: StringArray = self.records.iter().map(|r| Some(r.text.as_str())).collect();

        let columns: Vec<ArrayRef> = vec![
            Arc::new(chunk_ids),
            Arc::new(sources),
            Arc::new(articles),
            Arc::new(texts),
        ];
        Ok(RecordBatch::try_new(Arc::new(metadata_schema()), columns)?)
    }

    /// Write the table as a single-row-group Parquet file
    pub fn persist(&self, path: &Path) -> Result<()> {
        let batch = self.to_record_batch()?;
        let file = File::create(path)?;
        let props = WriterProperties::builder()
            .set_created_by("lexsearch".to_string())
            .build();

        let mut writer = ArrowWriter::try_new(file, batch.schema(), Some(props))?;
        writer.write(&batch)?;
        writer.close()?;
        Ok(())
    }

    /// Read a metadata table. `article` may be absent or null.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(LexError::ArtifactMissing(path.to_path_buf()));
        }

        let reader = ParquetRecordBatchReaderBuilder::try_new(File::open(path)?)?.build()?;
        let mut records = Vec::new();

        for batch in reader {
            let batch = batch?;
            let chunk_ids = required_column(&batch, "chunk_id")?;
            let sources = required_column(&batch, "source")?;
            let texts = required_column(&batch, "text")?;
            let articles = string_column(&batch, "article")?
                .unwrap_or_else(|| vec![None; batch.num_rows()]);

            for (((chunk_id, source), text), article) in
                chunk_ids.into_iter().zip(sources).zip(texts).zip(articles)
            {
                records.push(ChunkRecord {
                    chunk_id,
                    source,
                    article: article.filter(|a| !a.trim().is_empty()),
                    text,
                });
            }
        }

        Ok(Self { records })
    }
}

/// Column of strings by name; `None` when the column does not exist
fn string_column(batch: &RecordBatch, name: &str) -> Result<Option<Vec<Option<String>>>> {
    let Some(column) = batch.column_by_name(name) else {
        return Ok(None);
    };

    let values = match column.data_type() {
        DataType::Utf8 => column
            .as_any()
            .downcast_ref::<StringArray>()
            .map(|arr| arr.iter().map(|v| v.map(str::to_string)).collect()),
        DataType::LargeUtf8 => column
            .as_any()
            .downcast_ref::<LargeStringArray>()
            .map(|arr| arr.iter().map(|v| v.map(str::to_string)).collect()),
        other => {
            return Err(LexError::MetadataFormat(format!(
                "column '{}' has type {}, expected a string column",
                name, other
            )))
        }
    };

    values
        .map(Some)
        .ok_or_else(|| LexError::MetadataFormat(format!("column '{}' could not be read", name)))
}

fn required_column(batch: &RecordBatch, name: &str) -> Result<Vec<String>> {
    let values = string_column(batch, name)?
        .ok_or_else(|| LexError::MetadataFormat(format!("missing column '{}'", name)))?;

    values
        .into_iter()
        .enumerate()
        .map(|(row, v)| {
            v.ok_or_else(|| LexError::MetadataFormat(format!("null '{}' at row {}", name, row)))
        })
        .collect()
}
