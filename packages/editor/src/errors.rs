//! Error types for the editor

use folio_store::StoreError;
use folio_validator::FormatError;
use thiserror::Error;

/// Why the reducer rejected an action
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ReduceError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Structural violation: {0}")]
    StructuralViolation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unknown action: {0}")]
    UnknownAction(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<FormatError> for ReduceError {
    fn from(e: FormatError) -> Self {
        ReduceError::Validation(e.to_string())
    }
}

impl From<StoreError> for ReduceError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(id) => ReduceError::NotFound(id),
            StoreError::ParentNotFound(_) | StoreError::NotInTrash(_) | StoreError::AlreadyPurged(_) => {
                ReduceError::NotFound(e.to_string())
            }
            StoreError::InvalidPatch { .. } => ReduceError::Validation(e.to_string()),
            _ => ReduceError::StructuralViolation(e.to_string()),
        }
    }
}

/// Errors outside a single reduction (loading, decoding)
#[derive(Error, Debug)]
pub enum EditorError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Invalid document: {0}")]
    Json(#[from] serde_json::Error),
}
