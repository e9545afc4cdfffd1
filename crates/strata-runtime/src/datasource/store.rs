//! Parquet file store
//!
//! Directory layout under the store root:
//!
//! ```text
//! parquet_files/{split}/{split}_{name}[_{depth}][_{index}].parquet   raw tables
//! parquet_preps/{split}/{split}_{topic}_{depth}.parquet              prep tables
//! {split}_feature/{split}_{topic}_features_{index}.parquet          feature batches
//! ```
//!
//! A raw table may be spread over several index files; they are read in
//! file-name order and concatenated.

use super::{DataSource, RawFile, RawScan};
use crate::error::{Result, RuntimeError};
use crate::table::{concat_relaxed, Table};
use arrow::array::RecordBatch;
use arrow::datatypes::SchemaRef;
use parquet::arrow::arrow_reader::{ParquetRecordBatchReader, ParquetRecordBatchReaderBuilder};
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use strata_core::{Depth, Split, Topic};
use tracing::debug;

const RAW_FORMAT: &str = "parquet";

/// Parquet-backed dataset store
#[derive(Debug, Clone)]
pub struct ParquetStore {
    root: PathBuf,
}

impl ParquetStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn raw_dir(&self, split: Split) -> PathBuf {
        self.root.join(format!("{}_files", RAW_FORMAT)).join(split.as_str())
    }

    pub fn prep_path(&self, topic: &Topic, split: Split) -> PathBuf {
        self.root
            .join("parquet_preps")
            .join(split.as_str())
            .join(format!("{}_{}_{}.parquet", split, topic.name(), topic.depth()))
    }

    pub fn feature_batch_path(&self, topic: &str, split: Split, index: usize) -> PathBuf {
        self.root
            .join(format!("{}_feature", split))
            .join(format!("{}_{}_features_{}.parquet", split, topic, index))
    }

    /// Raw files of `name` (at `depth`, or all depths), sorted by file name.
    pub fn raw_files(&self, name: &str, depth: Option<Depth>, split: Split) -> Result<Vec<RawFile>> {
        let dir = self.raw_dir(split);
        if !dir.is_dir() {
            return Err(RuntimeError::missing(format!("raw directory for {}", split), dir));
        }

        let mut files = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let file_name = entry?.file_name().to_string_lossy().into_owned();
            if let Some(file) = RawFile::parse(&file_name) {
                if file.format == RAW_FORMAT && file.matches(name, depth) {
                    files.push(file);
                }
            }
        }
        files.sort_by(|a, b| a.file_name.cmp(&b.file_name));

        if files.is_empty() {
            return Err(RuntimeError::missing(
                format!("raw table {} (depth: {})", name, describe_depth(depth)),
                dir,
            ));
        }
        Ok(files)
    }
}

fn describe_depth(depth: Option<Depth>) -> String {
    depth.map_or_else(|| "any".to_string(), |d| d.to_string())
}

impl DataSource for ParquetStore {
    fn read_raw(&self, name: &str, depth: Option<Depth>, split: Split) -> Result<Table> {
        let dir = self.raw_dir(split);
        let mut tables = self
            .raw_files(name, depth, split)?
            .iter()
            .map(|file| read_table(&dir.join(&file.file_name)))
            .collect::<Result<Vec<_>>>()?;

        debug!(name, files = tables.len(), "read raw table");
        match tables.len() {
            1 => Ok(tables.remove(0)),
            _ => concat_relaxed(tables),
        }
    }

    fn scan_raw(
        &self,
        name: &str,
        depth: Option<Depth>,
        split: Split,
        batch_rows: usize,
    ) -> Result<RawScan<'_>> {
        let dir = self.raw_dir(split);
        let paths: Vec<PathBuf> = self
            .raw_files(name, depth, split)?
            .iter()
            .map(|file| dir.join(&file.file_name))
            .collect();

        let schema = ParquetRecordBatchReaderBuilder::try_new(File::open(&paths[0])?)?
            .schema()
            .clone();

        let batches = paths.into_iter().flat_map(move |path| {
            let batches: Box<dyn Iterator<Item = Result<RecordBatch>>> =
                match open_reader(&path, batch_rows) {
                    Ok(reader) => Box::new(reader.map(|batch| batch.map_err(RuntimeError::from))),
                    Err(err) => Box::new(std::iter::once(Err(err))),
                };
            batches
        });

        Ok(RawScan::new(schema, Box::new(batches)))
    }

    fn read_prep(&self, topic: &Topic, split: Split) -> Result<Table> {
        let path = self.prep_path(topic, split);
        if !path.is_file() {
            return Err(RuntimeError::missing(format!("prep table {}", topic), path));
        }
        read_table(&path)
    }

    fn has_prep(&self, topic: &Topic, split: Split) -> bool {
        self.prep_path(topic, split).is_file()
    }

    fn write_prep(&self, topic: &Topic, split: Split, table: &Table) -> Result<()> {
        write_table(&self.prep_path(topic, split), table)
    }

    fn write_feature_batch(
        &self,
        topic: &str,
        split: Split,
        index: usize,
        table: &Table,
    ) -> Result<()> {
        write_table(&self.feature_batch_path(topic, split, index), table)
    }
}

fn open_reader(path: &Path, batch_rows: usize) -> Result<ParquetRecordBatchReader> {
    let reader = ParquetRecordBatchReaderBuilder::try_new(File::open(path)?)?
        .with_batch_size(batch_rows.max(1))
        .build()?;
    Ok(reader)
}

/// Read a whole parquet file.
pub fn read_table(path: &Path) -> Result<Table> {
    let builder = ParquetRecordBatchReaderBuilder::try_new(File::open(path)?)?;
    let schema = builder.schema().clone();
    let batches = builder
        .build()?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(Table::new(schema, batches))
}

/// Write a table as one snappy-compressed parquet file, creating parent
/// directories as needed.
pub fn write_table(path: &Path, table: &Table) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut writer = parquet_writer(path, table.schema().clone())?;
    for batch in table.batches() {
        writer.write(batch)?;
    }
    writer.close()?;

    debug!(path = %path.display(), rows = table.num_rows(), "wrote parquet file");
    Ok(())
}

/// Open a snappy-compressed parquet writer at `path`.
pub(crate) fn parquet_writer(path: &Path, schema: SchemaRef) -> Result<ArrowWriter<File>> {
    let props = WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .build();
    Ok(ArrowWriter::try_new(File::create(path)?, schema, Some(props))?)
}
