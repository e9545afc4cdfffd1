//! Compiler error types

use thiserror::Error;

/// Compiler error
#[derive(Error, Debug)]
pub enum CompileError {
    /// Nothing to compile
    #[error("Empty batch: {0}")]
    EmptyBatch(String),

    /// Batch size of zero
    #[error("Invalid batch size: {0}")]
    InvalidBatchSize(usize),

    /// Column referenced by a statement does not exist
    #[error("Unknown column: {0}")]
    UnknownColumn(String),

    /// Malformed reshape or join specification
    #[error("Invalid specification: {0}")]
    InvalidSpec(String),
}

/// Result type for compiler operations
pub type Result<T> = std::result::Result<T, CompileError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(
            CompileError::InvalidBatchSize(0).to_string(),
            "Invalid batch size: 0"
        );
        assert_eq!(
            CompileError::UnknownColumn("num_group1".into()).to_string(),
            "Unknown column: num_group1"
        );
    }
}
