//! Strata Compiler - feature batches to SQL
//!
//! This crate turns feature catalogs into aggregation queries for the
//! embedded SQL engine, and generates the auxiliary statements used by the
//! depth-reduction pipeline (left joins, primary-subrecord slices and the
//! status-union reshape).

pub mod codegen;
pub mod compiler;
pub mod error;
pub mod fixup;

// Re-export main types
pub use codegen::{
    join::left_join_sql,
    quote_ident,
    reshape::{primary_slice_sql, StatusPair, StatusUnion},
};
pub use compiler::{CompiledBatch, CompilerOptions, QueryCompiler};
pub use error::{CompileError, Result};
pub use fixup::TextFixup;
