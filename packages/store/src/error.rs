//! Error types for the store

use folio_model::EntityKind;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("Entity not found: {0}")]
    NotFound(String),

    #[error("Duplicate id: {0}")]
    DuplicateId(String),

    #[error("Parent not found: {0}")]
    ParentNotFound(String),

    #[error("Moving {id} under {parent_id} would create a cycle")]
    CycleDetected { id: String, parent_id: String },

    #[error("Entity is not in the trash: {0}")]
    NotInTrash(String),

    #[error("{id} was trashed as part of {root}; restore {root} instead")]
    NotTrashRoot { id: String, root: String },

    #[error("Original parent {parent_id} of {id} no longer exists")]
    OriginalParentMissing { id: String, parent_id: String },

    #[error("Cannot detach the root entity {0}")]
    CannotDetachRoot(String),

    #[error("A root entity already exists: {0}")]
    RootExists(String),

    #[error("{from} references missing {kind} {to}")]
    DanglingReference {
        from: String,
        to: String,
        kind: EntityKind,
    },

    #[error("Field '{field}' does not apply to {kind} {id}")]
    InvalidPatch {
        id: String,
        field: &'static str,
        kind: EntityKind,
    },

    #[error("Store is empty")]
    EmptyStore,

    #[error("{0} was already purged")]
    AlreadyPurged(String),

    #[error("Invariant violated: {0}")]
    InvariantViolation(String),
}

pub type StoreResult<T> = Result<T, StoreError>;
