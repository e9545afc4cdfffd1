//! Strata SDK
//!
//! High-level API for turning a hierarchical tabular dataset into flat
//! per-entity features: depth-2 reduction, catalog generation, batched
//! feature builds and catalog pruning.

pub mod builder;
pub mod config;
pub mod error;
pub mod observability;
pub mod workbench;

// Re-export main types
pub use builder::WorkbenchBuilder;
pub use config::WorkbenchConfig;
pub use error::{Result, SdkError};
pub use observability::init_tracing;
pub use workbench::{CatalogReport, PruneReport, Workbench};

// Re-export commonly used types from dependencies
pub use strata_core::{FeatureCatalog, Split, Topic, TopicSet};
pub use strata_runtime::{
    BuildReport, GenerationMode, MemorySource, ParquetStore, PreprocessOutcome, PreprocessReport,
};
