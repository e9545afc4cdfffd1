//! Strata Core - Feature expression model for hierarchical tabular data
//!
//! This crate provides the vocabulary shared by the rest of the workspace:
//! - Semantic column types and topic/depth/split identifiers
//! - Expression value objects (`Column`, `Filter`, `Aggregation`, `Feature`)
//! - Canonical name derivation
//! - Feature catalogs and their JSON form
//! - Error types

pub mod catalog;
pub mod error;
pub mod expr;
pub mod types;

// Re-export commonly used types
pub use catalog::FeatureCatalog;
pub use error::{CoreError, Result};
pub use expr::{canonical_name, Aggregation, Column, Element, Feature, Filter};
pub use types::{DataType, Depth, Split, Topic, TopicSet};
