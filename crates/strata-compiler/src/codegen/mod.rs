//! SQL code generation helpers
//!
//! Statements produced here are executed by the runtime engine with
//! identifier normalisation disabled, so quoted identifiers keep their case.

pub mod join;
pub mod reshape;

/// Quote an identifier, doubling embedded quotes.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Qualified, quoted column reference.
pub fn qualified(table: &str, column: &str) -> String {
    format!("{}.{}", table, quote_ident(column))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_ident() {
        assert_eq!(quote_ident("case_id"), "\"case_id\"");
        assert_eq!(quote_ident("a\"b"), "\"a\"\"b\"");
        assert_eq!(qualified("frame", "case_id"), "frame.\"case_id\"");
    }
}
