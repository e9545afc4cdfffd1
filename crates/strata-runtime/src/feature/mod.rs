//! Feature generation and batched extraction
//!
//! Provides:
//! - Column profiling of a sample table
//! - The feature definer (candidate catalog generation)
//! - The feature frame (prep table joined with the base table)
//! - The batched feature builder

pub mod builder;
pub mod definer;
pub mod frame;
pub mod profile;

// Re-export for convenience
pub use builder::{BuildReport, FeatureBuilder};
pub use definer::{date_diff, fibonacci, DefinerOptions, FeatureDefiner, GenerationMode};
pub use frame::{FeatureFrame, FrameOptions};
pub use profile::{ColumnProfile, TableProfile};
