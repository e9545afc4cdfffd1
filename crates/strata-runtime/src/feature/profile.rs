//! Column profiling
//!
//! One pass over a sample table records, per column, everything the
//! generator's heuristics look at: the semantic type, null and sentinel
//! presence, non-positive values and category frequencies.

use crate::error::Result;
use crate::table::Table;
use arrow::array::{Array, ArrayRef, AsArray};
use arrow::compute::cast;
use arrow::datatypes::{DataType as ArrowType, Float64Type};
use std::collections::HashMap;
use strata_core::DataType;

/// Observations for one column of a sample
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnProfile {
    pub name: String,
    pub data_type: DataType,
    pub has_null: bool,
    /// Textual columns only
    pub has_sentinel: bool,
    /// Numeric columns only
    pub has_non_positive: bool,
    /// Textual columns only, most frequent first, ties by value
    pub value_counts: Vec<(String, usize)>,
}

impl ColumnProfile {
    /// Profile one column. `sentinel` is the reserved "masked" category.
    pub fn from_array(name: &str, array: &ArrayRef, sentinel: &str) -> Result<Self> {
        let data_type = semantic_type(name, array)?;
        let mut profile = Self {
            name: name.to_string(),
            data_type,
            has_null: array.null_count() > 0,
            has_sentinel: false,
            has_non_positive: false,
            value_counts: Vec::new(),
        };

        if data_type.is_numeric() {
            let values = cast(array, &ArrowType::Float64)?;
            profile.has_non_positive = values
                .as_primitive::<Float64Type>()
                .iter()
                .flatten()
                .any(|v| v <= 0.0);
        } else {
            let text = cast(array, &ArrowType::Utf8)?;
            let mut counts: HashMap<&str, usize> = HashMap::new();
            for value in text.as_string::<i32>().iter().flatten() {
                *counts.entry(value).or_insert(0) += 1;
            }
            profile.has_sentinel = counts.contains_key(sentinel);

            let mut counts: Vec<(String, usize)> = counts
                .into_iter()
                .map(|(value, count)| (value.to_string(), count))
                .collect();
            counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
            profile.value_counts = counts;
        }

        Ok(profile)
    }

    /// The `k` most frequent values, without the sentinel.
    ///
    /// The cut is taken before the sentinel is removed, so a frequent
    /// sentinel costs one slot.
    pub fn top_values(&self, k: usize, sentinel: &str) -> Vec<&str> {
        self.value_counts
            .iter()
            .take(k)
            .map(|(value, _)| value.as_str())
            .filter(|value| *value != sentinel)
            .collect()
    }
}

/// Semantic type of a sampled column.
///
/// Float columns whose values are all integral (and never null) are
/// treated as integers.
fn semantic_type(name: &str, array: &ArrayRef) -> Result<DataType> {
    let data_type = match array.data_type() {
        t if t.is_integer() => DataType::Integer,
        ArrowType::Boolean => DataType::Integer,
        ArrowType::Float16 | ArrowType::Float32 | ArrowType::Float64 => {
            let values = cast(array, &ArrowType::Float64)?;
            let integral = array.null_count() == 0
                && values
                    .as_primitive::<Float64Type>()
                    .values()
                    .iter()
                    .all(|v| v.fract() == 0.0);
            if integral {
                DataType::Integer
            } else {
                DataType::Float
            }
        }
        ArrowType::Date32 | ArrowType::Date64 | ArrowType::Timestamp(_, _) => DataType::Date,
        _ => DataType::for_text_column(name),
    };
    Ok(data_type)
}

/// Profiles of every column of a sample, in column order
#[derive(Debug, Clone)]
pub struct TableProfile {
    rows: usize,
    columns: Vec<ColumnProfile>,
}

impl TableProfile {
    pub fn from_table(table: &Table, sentinel: &str) -> Result<Self> {
        let batch = table.to_batch()?;
        let schema = batch.schema();
        let columns = schema
            .fields()
            .iter()
            .zip(batch.columns())
            .map(|(field, array)| ColumnProfile::from_array(field.name(), array, sentinel))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            rows: batch.num_rows(),
            columns,
        })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn columns(&self) -> &[ColumnProfile] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&ColumnProfile> {
        self.columns.iter().find(|c| c.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{Float64Array, Int32Array, StringArray};
    use std::sync::Arc;

    #[test]
    fn test_integral_floats_become_integers() {
        let array: ArrayRef = Arc::new(Float64Array::from(vec![1.0, 2.0, -3.0]));
        let profile = ColumnProfile::from_array("pmts_dpd_1073P", &array, "a55475b1").unwrap();
        assert_eq!(profile.data_type, DataType::Integer);
        assert!(profile.has_non_positive);

        let array: ArrayRef = Arc::new(Float64Array::from(vec![Some(1.0), None]));
        let profile = ColumnProfile::from_array("amount_1A", &array, "a55475b1").unwrap();
        assert_eq!(profile.data_type, DataType::Float);
        assert!(profile.has_null);
        assert!(!profile.has_non_positive);
    }

    #[test]
    fn test_text_columns() {
        let array: ArrayRef = Arc::new(StringArray::from(vec![
            Some("B"),
            Some("a55475b1"),
            Some("A"),
            Some("B"),
            None,
        ]));
        let profile = ColumnProfile::from_array("status_219L", &array, "a55475b1").unwrap();
        assert_eq!(profile.data_type, DataType::Categorical);
        assert!(profile.has_null);
        assert!(profile.has_sentinel);
        assert_eq!(profile.value_counts[0], ("B".to_string(), 2));
        assert_eq!(profile.top_values(2, "a55475b1"), vec!["B", "A"]);

        let array: ArrayRef = Arc::new(StringArray::from(vec!["2020-01-01"]));
        let profile = ColumnProfile::from_array("openingdate_857D", &array, "a55475b1").unwrap();
        assert_eq!(profile.data_type, DataType::Date);
    }

    #[test]
    fn test_table_profile() {
        let table = Table::from_columns(vec![
            ("case_id", Arc::new(Int32Array::from(vec![1, 2])) as ArrayRef),
            ("type_25L", Arc::new(StringArray::from(vec!["x", "y"])) as ArrayRef),
        ])
        .unwrap();
        let profile = TableProfile::from_table(&table, "a55475b1").unwrap();
        assert_eq!(profile.rows(), 2);
        assert_eq!(profile.columns().len(), 2);
        assert_eq!(profile.column("type_25L").unwrap().data_type, DataType::Categorical);
        assert!(profile.column("nope").is_none());
    }
}
