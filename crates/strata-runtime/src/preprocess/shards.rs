//! Temporary shard files of a chunked reduction

use crate::datasource::store::{parquet_writer, read_table, write_table};
use crate::error::{Result, RuntimeError};
use crate::table::{concat_relaxed, Table};
use arrow::array::RecordBatch;
use arrow::datatypes::SchemaRef;
use parquet::arrow::ArrowWriter;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Kind of per-chunk shard
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShardKind {
    /// Rows of the primary sub-record (second group index 0)
    Primary,
    /// Output of the reduction query
    Reduced,
    /// Source rows of a chunk, spilled by the single pass over the source
    Input,
}

impl ShardKind {
    fn prefix(&self) -> &'static str {
        match self {
            ShardKind::Primary => "primary",
            ShardKind::Reduced => "reduced",
            ShardKind::Input => "input",
        }
    }
}

/// Scratch directory holding the shards of one reduction run
#[derive(Debug)]
pub struct ShardDir {
    path: PathBuf,
}

impl ShardDir {
    /// Create the directory, wiping leftovers of an earlier run.
    pub fn create(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if path.exists() {
            fs::remove_dir_all(&path)?;
        }
        fs::create_dir_all(&path)?;
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn shard_path(&self, kind: ShardKind, chunk: usize) -> PathBuf {
        self.path
            .join(format!("{}_{:05}.parquet", kind.prefix(), chunk))
    }

    pub fn write(&self, kind: ShardKind, chunk: usize, table: &Table) -> Result<()> {
        write_table(&self.shard_path(kind, chunk), table)
    }

    /// Input shard `file` of a chunk. A chunk spans several input files
    /// when the source schema changes between raw files.
    pub fn input_path(&self, chunk: usize, file: usize) -> PathBuf {
        self.path.join(format!(
            "{}_{:05}_{:05}.parquet",
            ShardKind::Input.prefix(),
            chunk,
            file
        ))
    }

    /// Shard files of one kind in chunk order.
    pub fn list(&self, kind: ShardKind) -> Result<Vec<PathBuf>> {
        self.list_prefixed(&format!("{}_", kind.prefix()))
    }

    fn list_prefixed(&self, prefix: &str) -> Result<Vec<PathBuf>> {
        let mut paths = Vec::new();
        for entry in fs::read_dir(&self.path)? {
            let path = entry?.path();
            let is_shard = path
                .file_name()
                .and_then(|name| name.to_str())
                .map_or(false, |name| name.starts_with(prefix) && name.ends_with(".parquet"));
            if is_shard {
                paths.push(path);
            }
        }
        paths.sort();
        Ok(paths)
    }

    /// All shards of one kind as a single table, `None` when there are none.
    pub fn concat(&self, kind: ShardKind) -> Result<Option<Table>> {
        let tables = self
            .list(kind)?
            .iter()
            .map(|path| read_table(path))
            .collect::<Result<Vec<_>>>()?;
        debug!(kind = kind.prefix(), shards = tables.len(), "concatenating shards");
        if tables.is_empty() {
            return Ok(None);
        }
        Ok(Some(concat_relaxed(tables)?))
    }

    /// Open one streaming writer slot per chunk for the input spill.
    pub fn spill(&self, chunks: usize) -> ChunkSpill<'_> {
        ChunkSpill {
            dir: self,
            writers: (0..chunks).map(|_| None).collect(),
            files: vec![0; chunks],
        }
    }

    /// The spilled source rows of one chunk, empty with `schema` when the
    /// chunk received none.
    pub fn input(&self, chunk: usize, schema: SchemaRef) -> Result<Table> {
        let tables = self
            .input_files(chunk)?
            .iter()
            .map(|path| read_table(path))
            .collect::<Result<Vec<_>>>()?;
        if tables.is_empty() {
            return Ok(Table::empty(schema));
        }
        concat_relaxed(tables)
    }

    /// Delete the input files of a chunk once it has been reduced.
    pub fn discard_input(&self, chunk: usize) -> Result<()> {
        for path in self.input_files(chunk)? {
            fs::remove_file(path)?;
        }
        Ok(())
    }

    fn input_files(&self, chunk: usize) -> Result<Vec<PathBuf>> {
        self.list_prefixed(&format!("{}_{:05}_", ShardKind::Input.prefix(), chunk))
    }

    /// Delete the directory and everything in it.
    pub fn remove(self) -> Result<()> {
        fs::remove_dir_all(&self.path)?;
        Ok(())
    }
}

/// Per-chunk parquet writers fed while the source is streamed once
pub struct ChunkSpill<'a> {
    dir: &'a ShardDir,
    writers: Vec<Option<(SchemaRef, ArrowWriter<File>)>>,
    files: Vec<usize>,
}

impl ChunkSpill<'_> {
    /// Append `batch` to the input of `chunk`, rolling over to a new file
    /// when its schema differs from the open one.
    pub fn write(&mut self, chunk: usize, batch: &RecordBatch) -> Result<()> {
        if batch.num_rows() == 0 {
            return Ok(());
        }
        let chunks = self.files.len();
        let (slot, file) = match (self.writers.get_mut(chunk), self.files.get_mut(chunk)) {
            (Some(slot), Some(file)) => (slot, file),
            _ => {
                return Err(RuntimeError::Configuration(format!(
                    "chunk {} out of range for a {}-chunk spill",
                    chunk, chunks
                )))
            }
        };

        if !matches!(slot, Some((schema, _)) if *schema == batch.schema()) {
            if let Some((_, writer)) = slot.take() {
                writer.close()?;
            }
            let path = self.dir.input_path(chunk, *file);
            *file += 1;
            *slot = Some((batch.schema(), parquet_writer(&path, batch.schema())?));
        }
        if let Some((_, writer)) = slot {
            writer.write(batch)?;
        }
        Ok(())
    }

    /// Close every open writer.
    pub fn finish(self) -> Result<()> {
        for (_, writer) in self.writers.into_iter().flatten() {
            writer.close()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{ArrayRef, Int16Array, Int8Array};
    use std::sync::Arc;
    use tempfile::TempDir;

    #[test]
    fn test_shards_round_trip() {
        let dir = TempDir::new().unwrap();
        let shards = ShardDir::create(dir.path().join("train_person_shards")).unwrap();
        assert!(shards.concat(ShardKind::Reduced).unwrap().is_none());

        let small = Table::from_columns(vec![("x", Arc::new(Int8Array::from(vec![1])) as ArrayRef)])
            .unwrap();
        let wide = Table::from_columns(vec![("x", Arc::new(Int16Array::from(vec![300, 2])) as ArrayRef)])
            .unwrap();
        shards.write(ShardKind::Reduced, 1, &wide).unwrap();
        shards.write(ShardKind::Reduced, 0, &small).unwrap();
        shards.write(ShardKind::Primary, 0, &small).unwrap();

        assert!(shards
            .shard_path(ShardKind::Reduced, 1)
            .ends_with("reduced_00001.parquet"));
        assert_eq!(shards.list(ShardKind::Reduced).unwrap().len(), 2);

        let merged = shards.concat(ShardKind::Reduced).unwrap().unwrap();
        assert_eq!(merged.num_rows(), 3);
        assert_eq!(
            merged.schema().field(0).data_type(),
            &arrow::datatypes::DataType::Int16
        );

        let path = shards.path().to_path_buf();
        shards.remove().unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn test_create_wipes_leftovers() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("shards");
        fs::create_dir_all(&path).unwrap();
        fs::write(path.join("reduced_00000.parquet"), b"stale").unwrap();

        let shards = ShardDir::create(&path).unwrap();
        assert!(shards.list(ShardKind::Reduced).unwrap().is_empty());
    }

    #[test]
    fn test_spill_rolls_over_on_schema_change() {
        let dir = TempDir::new().unwrap();
        let shards = ShardDir::create(dir.path().join("shards")).unwrap();

        let narrow = Table::from_columns(vec![("x", Arc::new(Int8Array::from(vec![1, 2])) as ArrayRef)])
            .unwrap()
            .to_batch()
            .unwrap();
        let wide = Table::from_columns(vec![("x", Arc::new(Int16Array::from(vec![300])) as ArrayRef)])
            .unwrap()
            .to_batch()
            .unwrap();

        let mut spill = shards.spill(2);
        spill.write(0, &narrow).unwrap();
        spill.write(0, &narrow).unwrap();
        spill.write(0, &wide).unwrap();
        assert!(spill.write(2, &narrow).is_err());
        spill.finish().unwrap();

        assert!(shards.input_path(0, 1).exists());
        assert!(!shards.input_path(0, 2).exists());
        assert!(shards.list(ShardKind::Reduced).unwrap().is_empty());

        let chunk = shards.input(0, narrow.schema()).unwrap();
        assert_eq!(chunk.num_rows(), 5);
        assert_eq!(
            chunk.schema().field(0).data_type(),
            &arrow::datatypes::DataType::Int16
        );
        let empty = shards.input(1, narrow.schema()).unwrap();
        assert_eq!(empty.num_rows(), 0);

        shards.discard_input(0).unwrap();
        assert!(shards.list(ShardKind::Input).unwrap().is_empty());
    }
}
