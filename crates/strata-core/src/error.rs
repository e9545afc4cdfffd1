//! Error types for Strata Core

use thiserror::Error;

/// Core error type
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Invalid topic: {0}")]
    InvalidTopic(String),

    #[error("Invalid depth: {0}")]
    InvalidDepth(String),

    #[error("Invalid split: {0}")]
    InvalidSplit(String),

    #[error("Invalid data type: {0}")]
    InvalidDataType(String),

    #[error("Invalid column: {0}")]
    InvalidColumn(String),

    #[error("Feature not found: {0}")]
    FeatureNotFound(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CoreError {
    /// Whether this error belongs to the fatal configuration class
    /// (bad topic, depth or split tags).
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            CoreError::InvalidTopic(_) | CoreError::InvalidDepth(_) | CoreError::InvalidSplit(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
