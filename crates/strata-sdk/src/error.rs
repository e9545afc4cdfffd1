//! SDK error types

use thiserror::Error;

/// SDK error type
#[derive(Error, Debug)]
pub enum SdkError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Layered configuration could not be read
    #[error("Config source error: {0}")]
    SourceError(#[from] config::ConfigError),

    /// Bundled or user YAML could not be parsed
    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// Core error
    #[error("Core error: {0}")]
    CoreError(#[from] strata_core::CoreError),

    /// Compiler error
    #[error("Compiler error: {0}")]
    CompileError(#[from] strata_compiler::CompileError),

    /// Runtime error
    #[error("Runtime error: {0}")]
    RuntimeError(#[from] strata_runtime::RuntimeError),

    /// I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// A catalog file for a topic does not exist yet
    #[error("Catalog not found: {0}")]
    CatalogNotFound(String),
}

impl SdkError {
    /// Whether this error belongs to the fatal configuration class.
    pub fn is_configuration(&self) -> bool {
        match self {
            SdkError::ConfigError(_) | SdkError::SourceError(_) | SdkError::YamlError(_) => true,
            SdkError::CoreError(err) => err.is_configuration(),
            SdkError::RuntimeError(err) => err.is_configuration(),
            _ => false,
        }
    }
}

/// Result type for SDK operations
pub type Result<T> = std::result::Result<T, SdkError>;
