//! Runtime error types

use std::path::PathBuf;
use thiserror::Error;

/// Runtime error
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Fatal misconfiguration (missing reduction rule, bad topic, bad split)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A numeric-only routine received non-numeric input
    #[error("Input type error: {0}")]
    InputType(String),

    /// A requested raw or prep table does not exist
    #[error("Missing artifact: {what} ({})", .path.display())]
    MissingArtifact { what: String, path: PathBuf },

    /// Column referenced by a step is absent from its table
    #[error("Column not found: {0}")]
    ColumnNotFound(String),

    #[error("SQL engine error: {0}")]
    Engine(#[from] datafusion::error::DataFusionError),

    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Core error: {0}")]
    Core(#[from] strata_core::CoreError),

    #[error("Compile error: {0}")]
    Compile(#[from] strata_compiler::CompileError),
}

impl RuntimeError {
    pub fn missing(what: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        RuntimeError::MissingArtifact {
            what: what.into(),
            path: path.into(),
        }
    }

    /// Whether this error belongs to the fatal configuration class.
    pub fn is_configuration(&self) -> bool {
        match self {
            RuntimeError::Configuration(_) => true,
            RuntimeError::Core(err) => err.is_configuration(),
            _ => false,
        }
    }
}

/// Result type for runtime operations
pub type Result<T> = std::result::Result<T, RuntimeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_artifact_message() {
        let err = RuntimeError::missing("prep table person_1", "/data/train_person_1.parquet");
        assert_eq!(
            err.to_string(),
            "Missing artifact: prep table person_1 (/data/train_person_1.parquet)"
        );
    }

    #[test]
    fn test_configuration_class() {
        assert!(RuntimeError::Configuration("x".into()).is_configuration());
        assert!(
            RuntimeError::Core(strata_core::CoreError::InvalidSplit("valid".into()))
                .is_configuration()
        );
        assert!(!RuntimeError::InputType("x".into()).is_configuration());
    }
}
