//! Column references

use crate::error::CoreError;
use crate::expr::canonical::canonical_name;
use crate::types::DataType;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A reference to one data field or derived expression.
///
/// A column without a query is a plain field reference named after the
/// field. A derived column's name is the canonical form of its query.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "ColumnRecord")]
pub struct Column {
    data_type: DataType,
    query: Option<String>,
    name: String,
}

#[derive(Deserialize)]
struct ColumnRecord {
    data_type: DataType,
    #[serde(default)]
    query: Option<String>,
    #[serde(default)]
    name: Option<String>,
}

impl TryFrom<ColumnRecord> for Column {
    type Error = CoreError;

    fn try_from(record: ColumnRecord) -> Result<Self, Self::Error> {
        match (record.name, record.query) {
            (Some(name), query) => Ok(Self {
                data_type: record.data_type,
                query,
                name,
            }),
            (None, Some(query)) => Ok(Self::derived(record.data_type, query)),
            (None, None) => Err(CoreError::InvalidColumn(
                "column record needs a name or a query".to_string(),
            )),
        }
    }
}

impl Column {
    /// Plain field reference.
    pub fn field(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            data_type,
            query: None,
            name: name.into(),
        }
    }

    /// Derived column whose name is canonicalized from `query`.
    pub fn derived(data_type: DataType, query: impl Into<String>) -> Self {
        let query = query.into();
        Self {
            data_type,
            name: canonical_name(&query),
            query: Some(query),
        }
    }

    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Trailing character of the name, which encodes the field's transform.
    pub fn postfix(&self) -> Option<char> {
        self.name.chars().last()
    }

    /// Copy of this column with a different type tag.
    pub fn with_data_type(&self, data_type: DataType) -> Self {
        Self {
            data_type,
            ..self.clone()
        }
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}
