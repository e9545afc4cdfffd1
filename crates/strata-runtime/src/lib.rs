//! Strata Runtime - execution layer for feature catalogs and depth reduction
//!
//! This crate runs everything that touches data:
//! - an embedded SQL engine over in-memory tables
//! - dataset access (parquet store, in-memory source)
//! - column type narrowing and relaxed concatenation
//! - feature catalog generation and batched feature extraction
//! - the depth-2 to depth-1 preprocessing pipeline

pub mod datasource;
pub mod engine;
pub mod error;
pub mod feature;
pub mod optimize;
pub mod preprocess;
pub mod table;

// Re-export main types
pub use datasource::{DataSource, MemorySource, ParquetStore, RawFile, RawScan, BASE_TABLE};
pub use engine::Engine;
pub use error::{Result, RuntimeError};
pub use feature::{
    fibonacci, BuildReport, DefinerOptions, FeatureBuilder, FeatureDefiner, FeatureFrame,
    FrameOptions, GenerationMode,
};
pub use optimize::narrow;
pub use preprocess::{
    PreprocessOptions, PreprocessOutcome, PreprocessReport, Preprocessor, ReductionRule,
};
pub use table::{concat_relaxed, Table};
