//! Engine compatibility rewrites applied to feature expressions

use serde::{Deserialize, Serialize};

/// A text rewrite applied to every compiled feature expression
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TextFixup {
    /// Literal substring replacement
    Replace { from: String, to: String },

    /// A year-to-date composite column: `-01-01` becomes null and a
    /// trailing `.0` on the year is stripped.
    YearDate { column: String },
}

impl TextFixup {
    pub fn replace(from: impl Into<String>, to: impl Into<String>) -> Self {
        TextFixup::Replace {
            from: from.into(),
            to: to.into(),
        }
    }

    pub fn year_date(column: impl Into<String>) -> Self {
        TextFixup::YearDate {
            column: column.into(),
        }
    }

    /// `float32 -> float` plus one year-date rewrite per column.
    pub fn defaults<S: AsRef<str>>(year_date_columns: &[S]) -> Vec<Self> {
        let mut fixups = vec![Self::replace("float32", "float")];
        fixups.extend(
            year_date_columns
                .iter()
                .map(|column| Self::year_date(column.as_ref())),
        );
        fixups
    }

    pub fn apply(&self, text: &str) -> String {
        match self {
            TextFixup::Replace { from, to } => text.replace(from.as_str(), to),
            TextFixup::YearDate { column } => text.replace(
                column.as_str(),
                &format!(
                    "case when {c}='-01-01' then null else replace({c}, '.0', '') end",
                    c = column
                ),
            ),
        }
    }
}

/// Apply fix-ups in order.
pub fn apply_all(fixups: &[TextFixup], text: &str) -> String {
    fixups
        .iter()
        .fold(text.to_string(), |acc, fixup| fixup.apply(&acc))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_float_alias() {
        let fixups = TextFixup::defaults::<&str>(&[]);
        assert_eq!(apply_all(&fixups, "cast(x as float32)"), "cast(x as float)");
    }

    #[test]
    fn test_year_date_rewrite() {
        let fixups = TextFixup::defaults(&["max_pmts_year_1139T507T__D"]);
        assert_eq!(
            apply_all(&fixups, "to_days(max_pmts_year_1139T507T__D)"),
            "to_days(case when max_pmts_year_1139T507T__D='-01-01' then null \
             else replace(max_pmts_year_1139T507T__D, '.0', '') end)"
        );
    }

    #[test]
    fn test_serde_shape() {
        let fixup: TextFixup =
            serde_json::from_str(r#"{"kind":"year_date","column":"c__D"}"#).unwrap();
        assert_eq!(fixup, TextFixup::year_date("c__D"));
    }
}
