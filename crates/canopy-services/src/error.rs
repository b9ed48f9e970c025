use canopy_core::{CanopyError, RowId};
use thiserror::Error;

pub type ServiceResult<T> = Result<T, MutationError>;

/// Errors raised while committing a cell edit
#[derive(Debug, Clone, Error, PartialEq)]
pub enum MutationError {
    #[error("Update rejected: {0}")]
    Rejected(String),

    #[error("Row not found: {0}")]
    UnknownRow(RowId),

    #[error("Unknown column: {0}")]
    UnknownColumn(String),

    #[error("Column '{0}' is read-only")]
    ReadOnlyColumn(String),

    #[error("No commit handler is configured")]
    NoMutator,

    #[error("Data source error: {0}")]
    FetchError(String),

    #[error("{0}")]
    Invalid(String),
}

impl From<CanopyError> for MutationError {
    fn from(err: CanopyError) -> Self {
        match err {
            CanopyError::UnknownColumn(id) => Self::UnknownColumn(id),
            other => Self::Invalid(other.to_string()),
        }
    }
}
