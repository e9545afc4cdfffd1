//! Reshaping statements for nested tables

use super::quote_ident;
use crate::error::{CompileError, Result};
use serde::{Deserialize, Serialize};

/// One `status 1 / status 0` column pair merged into a single column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusPair {
    /// Column read for status-1 rows
    pub active: String,
    /// Column read for status-0 rows
    pub closed: String,
    /// Output column name
    pub merged: String,
}

/// Stacks sibling column groups into one `status`-tagged column set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusUnion {
    #[serde(default = "default_status_column")]
    pub status_column: String,
    pub pairs: Vec<StatusPair>,
}

fn default_status_column() -> String {
    "status".to_string()
}

impl StatusUnion {
    pub fn new(pairs: Vec<StatusPair>) -> Self {
        Self {
            status_column: default_status_column(),
            pairs,
        }
    }

    /// Every input column the union reads.
    pub fn input_columns(&self) -> impl Iterator<Item = &str> {
        self.pairs
            .iter()
            .flat_map(|p| [p.active.as_str(), p.closed.as_str()])
    }

    /// Generate the `union all` statement over `table`.
    ///
    /// `keys` are carried through unchanged ahead of the status tag.
    pub fn to_sql(&self, table: &str, keys: &[String]) -> Result<String> {
        if self.pairs.is_empty() {
            return Err(CompileError::InvalidSpec(
                "status union without column pairs".to_string(),
            ));
        }

        Ok(format!(
            "{}\nunion all\n{}",
            self.branch(table, keys, true),
            self.branch(table, keys, false)
        ))
    }

    fn branch(&self, table: &str, keys: &[String], active: bool) -> String {
        let mut select: Vec<String> = keys.iter().map(|k| quote_ident(k)).collect();
        select.push(format!(
            "{} as {}",
            u8::from(active),
            quote_ident(&self.status_column)
        ));
        select.extend(self.pairs.iter().map(|pair| {
            let source = if active { &pair.active } else { &pair.closed };
            format!("{} as {}", quote_ident(source), quote_ident(&pair.merged))
        }));
        format!("select {}\nfrom {}", select.join("\n    , "), quote_ident(table))
    }
}

/// Rows whose `index_column` is 0, with that column dropped.
pub fn primary_slice_sql(table: &str, columns: &[String], index_column: &str) -> Result<String> {
    if !columns.iter().any(|c| c == index_column) {
        return Err(CompileError::UnknownColumn(index_column.to_string()));
    }

    let select = columns
        .iter()
        .filter(|c| c.as_str() != index_column)
        .map(|c| quote_ident(c))
        .collect::<Vec<_>>()
        .join(", ");

    Ok(format!(
        "select {}\nfrom {}\nwhere {} = 0",
        select,
        quote_ident(table),
        quote_ident(index_column)
    ))
}
