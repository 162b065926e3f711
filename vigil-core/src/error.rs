//! Error types for vigil operations

use crate::ResourceId;
use thiserror::Error;

/// Storage layer errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: ResourceId },

    #[error("{kind} {id} is still referenced and cannot be deleted")]
    StillReferenced { kind: &'static str, id: ResourceId },

    #[error("storage lock poisoned")]
    LockPoisoned,
}

/// Validation errors raised before any state is mutated.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("required field missing: {field}")]
    RequiredFieldMissing { field: &'static str },

    #[error("metric expects {expected} columns, but result value provides {got}")]
    ColumnCountMismatch { expected: usize, got: usize },

    #[error("metric does not describe '{column}', which appears in result")]
    UnknownColumn { column: String },

    #[error("metric expects a {expected} for '{column}', but result is of different type")]
    ColumnTypeMismatch {
        column: String,
        expected: &'static str,
    },

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}
