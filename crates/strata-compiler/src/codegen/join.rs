//! Left join generation

use super::{qualified, quote_ident};
use crate::error::{CompileError, Result};

/// Generate `left ⟕ right` on `keys`.
///
/// Every left column is kept in order. Right columns follow, except the
/// join keys; a right column whose name is already taken gets `suffix`
/// appended (repeatedly, until unique).
pub fn left_join_sql(
    left_table: &str,
    left_columns: &[String],
    right_table: &str,
    right_columns: &[String],
    keys: &[String],
    suffix: &str,
) -> Result<String> {
    if keys.is_empty() {
        return Err(CompileError::InvalidSpec(
            "left join needs at least one key".to_string(),
        ));
    }
    for key in keys {
        if !left_columns.contains(key) {
            return Err(CompileError::UnknownColumn(format!("{}.{}", left_table, key)));
        }
        if !right_columns.contains(key) {
            return Err(CompileError::UnknownColumn(format!("{}.{}", right_table, key)));
        }
    }

    let mut taken: Vec<String> = left_columns.to_vec();
    let mut select: Vec<String> = left_columns
        .iter()
        .map(|column| qualified("l", column))
        .collect();

    for column in right_columns.iter().filter(|c| !keys.contains(c)) {
        let mut alias = column.clone();
        while taken.contains(&alias) {
            alias.push_str(suffix);
        }
        select.push(format!("{} as {}", qualified("r", column), quote_ident(&alias)));
        taken.push(alias);
    }

    let on = keys
        .iter()
        .map(|key| format!("{} = {}", qualified("l", key), qualified("r", key)))
        .collect::<Vec<_>>()
        .join(" and ");

    Ok(format!(
        "select {}\nfrom {} l\nleft join {} r on {}",
        select.join("\n    , "),
        quote_ident(left_table),
        quote_ident(right_table),
        on
    ))
}
