//! Semantic column types
//!
//! Every column and aggregate result carries one of five tags. The tag is
//! decided once per column from a sample and dispatched on with `match`
//! afterwards; it is also the `data_type` string persisted in catalogs.

use crate::error::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Postfix marking a date-typed text column.
pub const DATE_POSTFIX: char = 'D';

/// Semantic type of a column or aggregate result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DataType {
    /// Integral numbers of any width
    #[serde(
        rename = "int",
        alias = "int8",
        alias = "int16",
        alias = "int32",
        alias = "int64"
    )]
    Integer,

    /// Floating point numbers of any width
    #[serde(rename = "float", alias = "float32", alias = "float64")]
    Float,

    /// Free text, the result type of `max` over a textual column
    #[serde(rename = "string", alias = "object")]
    Text,

    /// Text column holding `YYYY-MM-DD` dates
    #[serde(rename = "date")]
    Date,

    /// Text column holding category codes
    #[serde(rename = "categorical")]
    Categorical,
}

impl DataType {
    /// Integer or float
    pub fn is_numeric(&self) -> bool {
        matches!(self, DataType::Integer | DataType::Float)
    }

    /// Any text-backed type
    pub fn is_textual(&self) -> bool {
        !self.is_numeric()
    }

    /// Persisted tag
    pub fn as_str(&self) -> &'static str {
        match self {
            DataType::Integer => "int",
            DataType::Float => "float",
            DataType::Text => "string",
            DataType::Date => "date",
            DataType::Categorical => "categorical",
        }
    }

    /// Type keyword used when casting an output column
    pub fn sql_type(&self) -> &'static str {
        match self {
            DataType::Integer => "bigint",
            DataType::Float => "double",
            DataType::Text | DataType::Date | DataType::Categorical => "varchar",
        }
    }

    /// Type tag for a text column, chosen from its name postfix.
    pub fn for_text_column(name: &str) -> Self {
        if name.ends_with(DATE_POSTFIX) {
            DataType::Date
        } else {
            DataType::Categorical
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DataType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "int" | "int8" | "int16" | "int32" | "int64" => Ok(DataType::Integer),
            "float" | "float32" | "float64" => Ok(DataType::Float),
            "string" | "object" => Ok(DataType::Text),
            "date" => Ok(DataType::Date),
            "categorical" => Ok(DataType::Categorical),
            other => Err(CoreError::InvalidDataType(other.to_string())),
        }
    }
}
