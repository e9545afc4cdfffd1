//! Chunked depth reduction
//!
//! Collapses a depth-2 table onto its depth-1 sibling with bounded memory.
//! Chunk `p` of `N` holds the rows whose entity key is `p` modulo `N`, so
//! every `(entity key, group index 1)` group lands in exactly one chunk and
//! the result does not depend on the chunk count. With more than one chunk
//! the depth-2 source is streamed once and each batch is split across
//! per-chunk input shards on disk, which are then reduced one at a time.
//! Each chunk leaves two shard files behind (primary sub-record rows and
//! reduced aggregates), which are concatenated and joined onto the depth-1
//! table once all chunks are done.

use super::shards::{ShardDir, ShardKind};
use super::{PreprocessOptions, ReductionRule};
use crate::datasource::{DataSource, RawScan};
use crate::engine::Engine;
use crate::error::{Result, RuntimeError};
use crate::optimize::narrow;
use crate::table::{concat_relaxed, Table};
use arrow::array::{AsArray, BooleanArray, RecordBatch};
use arrow::compute::{cast, filter_record_batch};
use arrow::datatypes::{DataType, Int64Type, SchemaRef};
use strata_compiler::{left_join_sql, primary_slice_sql};
use strata_core::{Depth, Split, Topic};
use tracing::{debug, info};

/// Table name reduction statements read from.
pub const DATA_TABLE: &str = "data";

const JOIN_SUFFIX: &str = "_right";

/// Reduces one depth-2 topic onto its depth-1 table
pub struct Reducer<'a> {
    source: &'a dyn DataSource,
    engine: &'a Engine,
    rule: &'a ReductionRule,
    options: &'a PreprocessOptions,
}

impl<'a> Reducer<'a> {
    pub fn new(
        source: &'a dyn DataSource,
        engine: &'a Engine,
        rule: &'a ReductionRule,
        options: &'a PreprocessOptions,
    ) -> Self {
        Self {
            source,
            engine,
            rule,
            options,
        }
    }

    /// Reduce `name` for `split` and persist the combined depth-1 prep table.
    pub fn run(&self, name: &str, split: Split) -> Result<Table> {
        if self.rule.chunks == 0 {
            return Err(RuntimeError::Configuration(format!(
                "reduction rule for {} has zero chunks",
                name
            )));
        }

        let shards = ShardDir::create(
            self.options
                .scratch_dir
                .join(format!("{}_{}_shards", split, name)),
        )?;

        if self.rule.chunks == 1 {
            self.reduce_chunk(name, 0, self.load_source(name, split)?, &shards)?;
        } else {
            let schema = self.spill(name, split, &shards)?;
            for part in 0..self.rule.chunks {
                let chunk = shards.input(part, schema.clone())?;
                self.reduce_chunk(name, part, chunk, &shards)?;
                shards.discard_input(part)?;
            }
        }

        let merged = self.merge(name, split, &shards)?;
        let topic = Topic::new(name, Depth::Entity)?;
        self.source.write_prep(&topic, split, &merged)?;
        shards.remove()?;

        info!(
            topic = %topic,
            chunks = self.rule.chunks,
            rows = merged.num_rows(),
            columns = merged.num_columns(),
            "reduced depth 2 onto depth 1"
        );
        Ok(merged)
    }

    fn reduce_chunk(&self, name: &str, part: usize, chunk: Table, shards: &ShardDir) -> Result<()> {
        let chunk = narrow(chunk)?;
        debug!(name, part, rows = chunk.num_rows(), "loaded chunk");

        let primary_sql = primary_slice_sql(
            DATA_TABLE,
            &chunk.column_names(),
            &self.options.group_index_2,
        )?;
        let primary = narrow(self.engine.query(&primary_sql, &[(DATA_TABLE, &chunk)])?)?;
        shards.write(ShardKind::Primary, part, &primary)?;
        drop(primary);

        let staged = match &self.rule.status_union {
            Some(union) => {
                let sql = union.to_sql(DATA_TABLE, &self.keys())?;
                narrow(self.engine.query(&sql, &[(DATA_TABLE, &chunk)])?)?
            }
            None => chunk,
        };
        let reduced = narrow(self.engine.query(&self.rule.query, &[(DATA_TABLE, &staged)])?)?;
        drop(staged);
        shards.write(ShardKind::Reduced, part, &reduced)?;

        info!(
            name,
            chunk = part + 1,
            of = self.rule.chunks,
            reduced_rows = reduced.num_rows(),
            "wrote chunk shards"
        );
        Ok(())
    }

    /// The whole depth-2 table, streamed.
    fn load_source(&self, name: &str, split: Split) -> Result<Table> {
        let scan = self.scan(name, split)?;
        let schema = scan.schema().clone();
        let tables = scan
            .map(|batch| batch.map(Table::from_batch))
            .collect::<Result<Vec<_>>>()?;
        if tables.is_empty() {
            return Ok(Table::empty(schema));
        }
        concat_relaxed(tables)
    }

    /// Stream the depth-2 table once, writing each batch's rows to the
    /// input shard of their chunk. Returns the source schema.
    fn spill(&self, name: &str, split: Split, shards: &ShardDir) -> Result<SchemaRef> {
        let scan = self.scan(name, split)?;
        let schema = scan.schema().clone();

        let mut spill = shards.spill(self.rule.chunks);
        let mut rows = 0;
        for batch in scan {
            let batch = batch?;
            rows += batch.num_rows();
            for part in 0..self.rule.chunks {
                let slice = partition(&batch, &self.options.entity_key, part, self.rule.chunks)?;
                spill.write(part, &slice)?;
            }
        }
        spill.finish()?;

        debug!(name, rows, chunks = self.rule.chunks, "spilled source into chunk inputs");
        Ok(schema)
    }

    fn scan(&self, name: &str, split: Split) -> Result<RawScan<'a>> {
        self.source.scan_raw(
            name,
            Some(Depth::Nested),
            split,
            self.options.scan_batch_rows,
        )
    }

    fn merge(&self, name: &str, split: Split, shards: &ShardDir) -> Result<Table> {
        let mut merged = narrow(self.source.read_raw(name, Some(Depth::Entity), split)?)?;
        let keys = self.keys();

        for kind in [ShardKind::Reduced, ShardKind::Primary] {
            let Some(right) = shards.concat(kind)? else {
                continue;
            };
            let sql = left_join_sql(
                "depth1",
                &merged.column_names(),
                "shards",
                &right.column_names(),
                &keys,
                JOIN_SUFFIX,
            )?;
            merged = self
                .engine
                .query(&sql, &[("depth1", &merged), ("shards", &right)])?;
            debug!(name, ?kind, columns = merged.num_columns(), "joined shards");
        }

        narrow(merged)
    }

    fn keys(&self) -> Vec<String> {
        vec![
            self.options.entity_key.clone(),
            self.options.group_index_1.clone(),
        ]
    }
}

/// Rows of `batch` whose entity key falls into partition `part` of `parts`.
/// Rows with a null key go to partition 0.
pub fn partition(batch: &RecordBatch, key: &str, part: usize, parts: usize) -> Result<RecordBatch> {
    if parts <= 1 {
        return Ok(batch.clone());
    }

    let index = batch
        .schema()
        .index_of(key)
        .map_err(|_| RuntimeError::ColumnNotFound(key.to_string()))?;
    let keys = cast(batch.column(index), &DataType::Int64)?;
    let parts = parts as i64;
    let part = part as i64;
    let mask: BooleanArray = keys
        .as_primitive::<Int64Type>()
        .iter()
        .map(|k| Some(k.map_or(part == 0, |k| k.rem_euclid(parts) == part)))
        .collect();

    Ok(filter_record_batch(batch, &mask)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{ArrayRef, Int32Array};
    use std::sync::Arc;

    #[test]
    fn test_partition_by_key() {
        let table = Table::from_columns(vec![(
            "case_id",
            Arc::new(Int32Array::from(vec![Some(0), Some(1), Some(2), Some(-1), None])) as ArrayRef,
        )])
        .unwrap();
        let batch = table.to_batch().unwrap();

        let sizes: Vec<usize> = (0..2)
            .map(|p| partition(&batch, "case_id", p, 2).unwrap().num_rows())
            .collect();
        // 0, 2 and the null key in partition 0; 1 and -1 in partition 1
        assert_eq!(sizes, vec![3, 2]);
        assert_eq!(partition(&batch, "case_id", 0, 1).unwrap().num_rows(), 5);
        assert!(partition(&batch, "nope", 0, 2).is_err());
    }
}
