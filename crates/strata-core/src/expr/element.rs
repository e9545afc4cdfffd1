//! Filters and aggregations
//!
//! Both are templated expressions over an ordered list of columns, one
//! positional slot per column.

use crate::expr::column::Column;
use crate::expr::template::render;
use crate::types::DataType;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Aggregation logic templates used by the generator.
pub mod logic {
    pub const COUNT: &str = "count({0})";
    pub const COUNT_DISTINCT: &str = "count(distinct {0})";
    pub const SUM: &str = "sum({0})";
    pub const MIN: &str = "min({0})";
    pub const MAX: &str = "max({0})";
    pub const AVG: &str = "avg({0})";
    pub const STDDEV: &str = "stddev({0})";
}

/// Templated expression over an ordered list of columns
pub trait Element {
    fn columns(&self) -> &[Column];

    fn logic(&self) -> &str;

    /// Render the logic with the column names substituted.
    fn query(&self) -> String {
        let names: Vec<&str> = self.columns().iter().map(Column::name).collect();
        render(self.logic(), &names)
    }

    /// The single input column, for single-column elements.
    fn sole_column(&self) -> Option<&Column> {
        match self.columns() {
            [column] => Some(column),
            _ => None,
        }
    }
}

/// Boolean predicate, rendered in parentheses so filters conjoin safely
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Filter {
    columns: Vec<Column>,
    logic: String,
}

impl Filter {
    pub fn new(columns: Vec<Column>, logic: impl Into<String>) -> Self {
        Self {
            columns,
            logic: logic.into(),
        }
    }

    /// Predicate over a single column in slot `{0}`.
    pub fn on(column: &Column, logic: impl Into<String>) -> Self {
        Self::new(vec![column.clone()], logic)
    }
}

impl Element for Filter {
    fn columns(&self) -> &[Column] {
        &self.columns
    }

    fn logic(&self) -> &str {
        &self.logic
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({})", self.query())
    }
}

/// Scalar-producing expression with a declared result type
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Aggregation {
    columns: Vec<Column>,
    logic: String,
    data_type: DataType,
}

impl Aggregation {
    pub fn new(columns: Vec<Column>, logic: impl Into<String>, data_type: DataType) -> Self {
        Self {
            columns,
            logic: logic.into(),
            data_type,
        }
    }

    /// Aggregation over a single column in slot `{0}`.
    pub fn on(column: &Column, logic: impl Into<String>, data_type: DataType) -> Self {
        Self::new(vec![column.clone()], logic, data_type)
    }

    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    /// `avg` or `stddev` applied directly to the input.
    pub fn is_moment(&self) -> bool {
        self.logic == logic::AVG || self.logic == logic::STDDEV
    }
}

impl Element for Aggregation {
    fn columns(&self) -> &[Column] {
        &self.columns
    }

    fn logic(&self) -> &str {
        &self.logic
    }
}

impl fmt::Display for Aggregation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.query())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_renders_in_parens() {
        let col = Column::field("num_group1", DataType::Integer);
        let filter = Filter::on(&col, "{0} < 3");
        assert_eq!(filter.query(), "num_group1 < 3");
        assert_eq!(filter.to_string(), "(num_group1 < 3)");
    }

    #[test]
    fn test_aggregation_query() {
        let col = Column::field("amount_1115A", DataType::Float);
        let agg = Aggregation::on(&col, logic::SUM, DataType::Float);
        assert_eq!(agg.to_string(), "sum(amount_1115A)");
        assert_eq!(agg.sole_column(), Some(&col));
        assert!(!agg.is_moment());
        assert!(Aggregation::on(&col, logic::STDDEV, DataType::Float).is_moment());
    }

    #[test]
    fn test_filter_record_shape() {
        let col = Column::field("status_219L", DataType::Categorical);
        let filter = Filter::on(&col, "{0} = 'A'");
        let json = serde_json::to_value(&filter).unwrap();
        assert_eq!(json["logic"], "{0} = 'A'");
        assert_eq!(json["columns"][0]["name"], "status_219L");

        let back: Filter = serde_json::from_value(json).unwrap();
        assert_eq!(back, filter);
    }
}
