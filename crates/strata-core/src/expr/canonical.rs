//! Canonical name derivation
//!
//! Names double as catalog keys and SQL output identifiers, so the
//! transliteration must stay byte-for-byte stable.

/// Ordered literal replacements. Multi-character operators come before
/// their single-character prefixes.
pub const REPLACEMENTS: &[(&str, &str)] = &[
    ("<=", "le"),
    (">=", "ge"),
    ("!=", "ne"),
    ("<", "lt"),
    (">", "gt"),
    ("=", "eq"),
    ("-", "sub"),
    ("+", "plus"),
    ("/", "div"),
    ("*", "mul"),
    ("case when ", "_if_"),
    ("else null end", ""),
    ("(", "_"),
    (")", "_"),
    ("'", ""),
    (" and ", ""),
    (" else ", "_"),
    (" ", "_"),
];

/// Derive the canonical name of a rendered expression.
pub fn canonical_name(query: &str) -> String {
    REPLACEMENTS
        .iter()
        .fold(query.to_string(), |acc, (from, to)| acc.replace(from, to))
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relational_operators() {
        assert_eq!(canonical_name("a <= 1"), "a_le_1");
        assert_eq!(canonical_name("a < 1"), "a_lt_1");
        assert_eq!(canonical_name("a != 'x'"), "a_ne_x");
        assert_eq!(canonical_name("a >= b"), "a_ge_b");
    }

    #[test]
    fn test_case_when_collapses() {
        let query = "sum(case when (x = 1) then amount_1A else null end)";
        assert_eq!(canonical_name(query), "sum__if__x_eq_1__then_amount_1a__");
    }

    #[test]
    fn test_plain_field_is_lowercased() {
        assert_eq!(canonical_name("amount_416A"), "amount_416a");
    }
}
