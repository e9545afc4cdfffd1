//! Type system for strata
//!
//! This module contains:
//! - Semantic column types
//! - Topic, depth and dataset split identifiers

pub mod data_type;
pub mod topic;

pub use data_type::DataType;
pub use topic::{Depth, Split, Topic, TopicSet};
