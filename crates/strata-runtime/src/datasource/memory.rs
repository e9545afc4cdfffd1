//! In-memory data source
//!
//! Holds raw, prep and feature batch tables in maps. Suitable for tests and
//! for embedding the pipeline over tables that are already loaded.

use super::DataSource;
use crate::error::{Result, RuntimeError};
use crate::table::{concat_relaxed, Table};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};
use strata_core::{Depth, Split, Topic};

type RawKey = (Split, String, Option<Depth>);

/// In-memory data source
#[derive(Default)]
pub struct MemorySource {
    raw: Mutex<BTreeMap<RawKey, Vec<Table>>>,
    preps: Mutex<HashMap<(Split, Topic), Table>>,
    features: Mutex<BTreeMap<(Split, String, usize), Table>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register one raw file of a topic. Files of the same key are read back
    /// in insertion order.
    pub fn insert_raw(&self, name: &str, depth: Option<Depth>, split: Split, table: Table) {
        lock(&self.raw)
            .entry((split, name.to_string(), depth))
            .or_default()
            .push(table);
    }

    /// A previously written feature batch.
    pub fn feature_batch(&self, topic: &str, split: Split, index: usize) -> Option<Table> {
        lock(&self.features)
            .get(&(split, topic.to_string(), index))
            .cloned()
    }

    /// Number of feature batches written for a topic.
    pub fn feature_batch_count(&self, topic: &str, split: Split) -> usize {
        lock(&self.features)
            .keys()
            .filter(|(s, t, _)| *s == split && t == topic)
            .count()
    }
}

impl DataSource for MemorySource {
    fn read_raw(&self, name: &str, depth: Option<Depth>, split: Split) -> Result<Table> {
        let raw = lock(&self.raw);
        let tables: Vec<Table> = raw
            .iter()
            .filter(|((s, n, d), _)| *s == split && n == name && (depth.is_none() || *d == depth))
            .flat_map(|(_, tables)| tables.iter().cloned())
            .collect();

        if tables.is_empty() {
            return Err(RuntimeError::missing(
                format!("raw table {} ({})", name, split),
                format!("memory://{}/{}", split, name),
            ));
        }
        concat_relaxed(tables)
    }

    fn read_prep(&self, topic: &Topic, split: Split) -> Result<Table> {
        lock(&self.preps)
            .get(&(split, topic.clone()))
            .cloned()
            .ok_or_else(|| {
                RuntimeError::missing(
                    format!("prep table {}", topic),
                    format!("memory://{}/prep/{}", split, topic),
                )
            })
    }

    fn has_prep(&self, topic: &Topic, split: Split) -> bool {
        lock(&self.preps).contains_key(&(split, topic.clone()))
    }

    fn write_prep(&self, topic: &Topic, split: Split, table: &Table) -> Result<()> {
        lock(&self.preps).insert((split, topic.clone()), table.clone());
        Ok(())
    }

    fn write_feature_batch(
        &self,
        topic: &str,
        split: Split,
        index: usize,
        table: &Table,
    ) -> Result<()> {
        lock(&self.features).insert((split, topic.to_string(), index), table.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{ArrayRef, Int64Array};
    use std::sync::Arc;

    fn ids(values: Vec<i64>) -> Table {
        Table::from_columns(vec![("case_id", Arc::new(Int64Array::from(values)) as ArrayRef)])
            .unwrap()
    }

    #[test]
    fn test_raw_tables_by_depth() {
        let source = MemorySource::new();
        source.insert_raw("person", Some(Depth::Entity), Split::Train, ids(vec![1, 2]));
        source.insert_raw("person", Some(Depth::Nested), Split::Train, ids(vec![1, 1, 2]));

        let depth1 = source.read_raw("person", Some(Depth::Entity), Split::Train).unwrap();
        assert_eq!(depth1.num_rows(), 2);
        let all = source.read_raw("person", None, Split::Train).unwrap();
        assert_eq!(all.num_rows(), 5);
        assert!(source.read_raw("person", None, Split::Test).is_err());
    }

    #[test]
    fn test_default_scan_slices_batches() {
        let source = MemorySource::new();
        source.insert_raw("person", Some(Depth::Nested), Split::Train, ids(vec![1, 2, 3, 4, 5]));
        let sizes: Vec<usize> = source
            .scan_raw("person", Some(Depth::Nested), Split::Train, 2)
            .unwrap()
            .map(|b| b.unwrap().num_rows())
            .collect();
        assert_eq!(sizes, vec![2, 2, 1]);
    }

    #[test]
    fn test_prep_and_feature_batches() {
        let source = MemorySource::new();
        let topic = Topic::new("deposit", Depth::Entity).unwrap();
        assert!(matches!(
            source.read_prep(&topic, Split::Train),
            Err(RuntimeError::MissingArtifact { .. })
        ));
        source.write_prep(&topic, Split::Train, &ids(vec![7])).unwrap();
        assert!(source.has_prep(&topic, Split::Train));
        assert!(!source.has_prep(&topic, Split::Test));

        source.write_feature_batch("deposit", Split::Train, 0, &ids(vec![7])).unwrap();
        source.write_feature_batch("deposit", Split::Train, 1, &ids(vec![7])).unwrap();
        assert_eq!(source.feature_batch_count("deposit", Split::Train), 2);
        assert!(source.feature_batch("deposit", Split::Train, 1).is_some());
    }
}
