//! Feature frame
//!
//! Feature queries read one table, `frame`: a topic's prep table with the
//! reference date (and, for the training split, the target) of every
//! entity attached from the base table.

use crate::datasource::DataSource;
use crate::engine::Engine;
use crate::error::{Result, RuntimeError};
use crate::optimize::narrow;
use crate::table::Table;
use strata_compiler::quote_ident;
use strata_core::{Split, Topic};
use tracing::info;

/// Base table columns carried into the frame
#[derive(Debug, Clone)]
pub struct FrameOptions {
    pub entity_key: String,
    pub reference_date_column: String,
    pub target_column: String,
}

impl Default for FrameOptions {
    fn default() -> Self {
        Self {
            entity_key: "case_id".to_string(),
            reference_date_column: "date_decision".to_string(),
            target_column: "target".to_string(),
        }
    }
}

/// A topic's prep table inner-joined with the base table
#[derive(Debug, Clone)]
pub struct FeatureFrame {
    topic: Topic,
    split: Split,
    table: Table,
}

impl FeatureFrame {
    /// Load the prep table and the base table of `split` and join them.
    pub fn load(
        source: &dyn DataSource,
        engine: &Engine,
        topic: &Topic,
        split: Split,
        options: &FrameOptions,
    ) -> Result<Self> {
        let prep = source.read_prep(topic, split)?;
        let base = narrow(source.read_base(split)?)?;
        Self::join(engine, topic.clone(), split, &prep, &base, options)
    }

    /// Join an already loaded prep table with a base table.
    pub fn join(
        engine: &Engine,
        topic: Topic,
        split: Split,
        prep: &Table,
        base: &Table,
        options: &FrameOptions,
    ) -> Result<Self> {
        let mut carried = vec![&options.reference_date_column];
        if split.has_target() {
            carried.push(&options.target_column);
        }
        for column in carried.iter().chain([&&options.entity_key]) {
            if !base.has_column(column) {
                return Err(RuntimeError::ColumnNotFound(format!("base.{}", column)));
            }
        }
        if !prep.has_column(&options.entity_key) {
            return Err(RuntimeError::ColumnNotFound(format!(
                "{}.{}",
                topic, options.entity_key
            )));
        }

        // carried columns come from the base table even when the prep has them
        let key = quote_ident(&options.entity_key);
        let select: Vec<String> = prep
            .column_names()
            .iter()
            .filter(|name| !carried.contains(name))
            .map(|name| format!("p.{}", quote_ident(name)))
            .chain(carried.iter().map(|c| format!("b.{}", quote_ident(c))))
            .collect();
        let sql = format!(
            "select {}\nfrom prep p\ninner join base b on p.{} = b.{}",
            select.join(", "),
            key,
            key
        );

        let table = engine.query(&sql, &[("prep", prep), ("base", base)])?;
        info!(
            topic = %topic,
            split = %split,
            rows = table.num_rows(),
            columns = table.num_columns(),
            "loaded feature frame"
        );
        Ok(Self {
            topic,
            split,
            table,
        })
    }

    pub fn topic(&self) -> &Topic {
        &self.topic
    }

    pub fn split(&self) -> Split {
        self.split
    }

    pub fn table(&self) -> &Table {
        &self.table
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{ArrayRef, AsArray, Int32Array, Int64Array, StringArray};
    use std::sync::Arc;
    use strata_core::Depth;

    fn prep() -> Table {
        Table::from_columns(vec![
            ("case_id", Arc::new(Int32Array::from(vec![1, 1, 2, 9])) as ArrayRef),
            ("num_group1", Arc::new(Int64Array::from(vec![0, 1, 0, 0])) as ArrayRef),
        ])
        .unwrap()
    }

    fn base() -> Table {
        Table::from_columns(vec![
            ("case_id", Arc::new(Int64Array::from(vec![1, 2, 3])) as ArrayRef),
            (
                "date_decision",
                Arc::new(StringArray::from(vec!["2020-01-01", "2020-02-01", "2020-03-01"]))
                    as ArrayRef,
            ),
            ("target", Arc::new(Int64Array::from(vec![0, 1, 0])) as ArrayRef),
        ])
        .unwrap()
    }

    #[test]
    fn test_train_frame_carries_target() {
        let engine = Engine::new().unwrap();
        let topic = Topic::new("person", Depth::Entity).unwrap();
        let frame = FeatureFrame::join(
            &engine,
            topic,
            Split::Train,
            &prep(),
            &base(),
            &FrameOptions::default(),
        )
        .unwrap();

        assert_eq!(frame.table().num_rows(), 3);
        assert_eq!(
            frame.table().column_names(),
            vec!["case_id", "num_group1", "date_decision", "target"]
        );
    }

    #[test]
    fn test_prep_copy_of_carried_column_is_replaced() {
        let engine = Engine::new().unwrap();
        let topic = Topic::new("person", Depth::Entity).unwrap();
        let prep = Table::from_columns(vec![
            ("case_id", Arc::new(Int64Array::from(vec![1, 2])) as ArrayRef),
            (
                "date_decision",
                Arc::new(StringArray::from(vec!["1999-01-01", "1999-01-01"])) as ArrayRef,
            ),
            ("amount_1A", Arc::new(Int64Array::from(vec![5, 6])) as ArrayRef),
        ])
        .unwrap();

        let frame = FeatureFrame::join(
            &engine,
            topic,
            Split::Test,
            &prep,
            &base(),
            &FrameOptions::default(),
        )
        .unwrap();

        assert_eq!(
            frame.table().column_names(),
            vec!["case_id", "amount_1A", "date_decision"]
        );
        let sorted = engine
            .query(
                "select \"date_decision\" from t order by \"case_id\"",
                &[("t", frame.table())],
            )
            .unwrap();
        let dates = sorted.column("date_decision").unwrap();
        let dates = dates.as_string::<i32>();
        assert_eq!(dates.value(0), "2020-01-01");
        assert_eq!(dates.value(1), "2020-02-01");
    }

    #[test]
    fn test_test_frame_has_no_target() {
        let engine = Engine::new().unwrap();
        let topic = Topic::new("person", Depth::Entity).unwrap();
        let frame = FeatureFrame::join(
            &engine,
            topic,
            Split::Test,
            &prep(),
            &base(),
            &FrameOptions::default(),
        )
        .unwrap();
        assert!(!frame.table().has_column("target"));
    }

    #[test]
    fn test_missing_base_column() {
        let engine = Engine::new().unwrap();
        let topic = Topic::new("person", Depth::Entity).unwrap();
        let base = base().drop_column("date_decision").unwrap();
        let err = FeatureFrame::join(
            &engine,
            topic,
            Split::Train,
            &prep(),
            &base,
            &FrameOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, RuntimeError::ColumnNotFound(_)));
    }
}
