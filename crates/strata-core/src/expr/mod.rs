//! Feature expression model
//!
//! Immutable value objects that describe aggregation features:
//! - `Column`: a field reference or derived expression with a canonical name
//! - `Filter`: a boolean predicate over columns
//! - `Aggregation`: a scalar-producing expression with a result type
//! - `Feature`: an aggregation applied under zero or more filters
//!
//! Equality and hashing are structural, so features can be deduplicated by
//! value and by canonical name.

pub mod canonical;
pub mod column;
pub mod element;
pub mod feature;
pub mod template;

pub use canonical::canonical_name;
pub use column::Column;
pub use element::{logic, Aggregation, Element, Filter};
pub use feature::Feature;
pub use template::{escape_braces, quote_literal, render};
