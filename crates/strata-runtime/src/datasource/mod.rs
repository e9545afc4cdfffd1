//! Data access layer
//!
//! Every pipeline stage reads and writes tables through the `DataSource`
//! trait, addressed by topic name, depth and dataset split:
//! - raw tables (the dataset as shipped, possibly split over several files)
//! - prep tables (narrowed, depth-reduced artifacts of the preprocessor)
//! - feature batch tables (one per compiled feature batch)

mod memory;
pub mod store;

pub use memory::MemorySource;
pub use store::ParquetStore;

use crate::error::Result;
use crate::table::Table;
use arrow::array::RecordBatch;
use arrow::datatypes::SchemaRef;
use strata_core::{Depth, Split, Topic};

/// Name of the base table holding one row per entity.
pub const BASE_TABLE: &str = "base";

/// Streamed record batches of one raw table
pub struct RawScan<'a> {
    schema: SchemaRef,
    batches: Box<dyn Iterator<Item = Result<RecordBatch>> + 'a>,
}

impl<'a> RawScan<'a> {
    pub fn new(
        schema: SchemaRef,
        batches: Box<dyn Iterator<Item = Result<RecordBatch>> + 'a>,
    ) -> Self {
        Self { schema, batches }
    }

    /// Schema of the first file of the scan.
    pub fn schema(&self) -> &SchemaRef {
        &self.schema
    }
}

impl Iterator for RawScan<'_> {
    type Item = Result<RecordBatch>;

    fn next(&mut self) -> Option<Self::Item> {
        self.batches.next()
    }
}

/// Trait for dataset storage backends
pub trait DataSource: Send + Sync {
    /// Read a raw table. `depth: None` selects every file of the topic.
    fn read_raw(&self, name: &str, depth: Option<Depth>, split: Split) -> Result<Table>;

    /// Stream a raw table in batches of at most `batch_rows` rows.
    fn scan_raw(
        &self,
        name: &str,
        depth: Option<Depth>,
        split: Split,
        batch_rows: usize,
    ) -> Result<RawScan<'_>> {
        let table = self.read_raw(name, depth, split)?;
        let schema = table.schema().clone();
        let rows = batch_rows.max(1);
        let batches = table.into_batches().into_iter().flat_map(move |batch| {
            (0..batch.num_rows())
                .step_by(rows)
                .map(|offset| -> Result<RecordBatch> {
                    Ok(batch.slice(offset, rows.min(batch.num_rows() - offset)))
                })
                .collect::<Vec<_>>()
        });
        Ok(RawScan::new(schema, Box::new(batches)))
    }

    /// The base table of a split.
    fn read_base(&self, split: Split) -> Result<Table> {
        self.read_raw(BASE_TABLE, None, split)
    }

    fn read_prep(&self, topic: &Topic, split: Split) -> Result<Table>;

    fn has_prep(&self, topic: &Topic, split: Split) -> bool;

    fn write_prep(&self, topic: &Topic, split: Split, table: &Table) -> Result<()>;

    /// Persist the output of feature batch `index` of a topic.
    fn write_feature_batch(
        &self,
        topic: &str,
        split: Split,
        index: usize,
        table: &Table,
    ) -> Result<()>;
}

/// A raw file name parsed as `{split}_{name}[_{depth}[_{index}]].{format}`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct RawFile {
    pub file_name: String,
    pub split: String,
    pub name: String,
    pub depth: Option<u8>,
    pub index: Option<String>,
    pub format: String,
}

impl RawFile {
    /// Parse a file name. `None` when it has no extension or no name part.
    pub fn parse(file_name: &str) -> Option<Self> {
        let (stem, format) = file_name.rsplit_once('.')?;
        let parts: Vec<&str> = stem.split('_').collect();
        let n = parts.len();
        if n < 2 {
            return None;
        }

        let (name, depth, index) = if n >= 3 && is_digits(parts[n - 2]) {
            (parts[1..n - 2].join("_"), parts[n - 2], Some(parts[n - 1]))
        } else if is_digits(parts[n - 1]) {
            (parts[1..n - 1].join("_"), parts[n - 1], None)
        } else {
            (parts[1..].join("_"), "", None)
        };

        Some(Self {
            file_name: file_name.to_string(),
            split: parts[0].to_string(),
            name,
            depth: depth.parse().ok(),
            index: index.map(str::to_string),
            format: format.to_string(),
        })
    }

    /// Whether this file belongs to `name` at `depth` (any depth when `None`).
    pub fn matches(&self, name: &str, depth: Option<Depth>) -> bool {
        self.name == name && depth.map_or(true, |d| self.depth == Some(d.as_u8()))
    }
}

fn is_digits(text: &str) -> bool {
    !text.is_empty() && text.chars().all(|c| c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_raw_file_names() {
        let file = RawFile::parse("train_credit_bureau_a_2_10.parquet").unwrap();
        assert_eq!(file.split, "train");
        assert_eq!(file.name, "credit_bureau_a");
        assert_eq!(file.depth, Some(2));
        assert_eq!(file.index.as_deref(), Some("10"));
        assert_eq!(file.format, "parquet");

        let file = RawFile::parse("test_person_1.parquet").unwrap();
        assert_eq!(file.name, "person");
        assert_eq!(file.depth, Some(1));
        assert_eq!(file.index, None);

        let file = RawFile::parse("train_base.parquet").unwrap();
        assert_eq!(file.name, "base");
        assert_eq!(file.depth, None);

        assert!(RawFile::parse("README").is_none());
        assert!(RawFile::parse("base.parquet").is_none());
    }

    #[test]
    fn test_matches_depth() {
        let file = RawFile::parse("train_static_0_1.parquet").unwrap();
        assert!(file.matches("static", None));
        assert!(file.matches("static", Some(Depth::Flat)));
        assert!(!file.matches("static", Some(Depth::Entity)));
        assert!(!file.matches("static_cb", None));
    }
}
