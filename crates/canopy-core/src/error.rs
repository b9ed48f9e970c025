//! Error types for Canopy

use thiserror::Error;

/// Core error type for Canopy operations
#[derive(Error, Debug)]
pub enum CanopyError {
    #[error("Duplicate column id: {0}")]
    DuplicateColumn(String),

    #[error("Unknown column: {0}")]
    UnknownColumn(String),

    #[error("Invalid row: {0}")]
    InvalidRow(String),

    #[error("Invalid page size: {0}")]
    InvalidPageSize(usize),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

/// Result type alias for Canopy operations
pub type Result<T> = std::result::Result<T, CanopyError>;
