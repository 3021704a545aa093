//! Error types for allocation operations

use ipam_shared_types::{ChildKind, ParentKind, ParentRef, SharedTypeError};
use thiserror::Error;

use crate::range::Family;

pub type Result<T> = std::result::Result<T, AllocationError>;

/// Main error type for allocation operations
#[derive(Debug, Error)]
pub enum AllocationError {
    #[error("Invalid range: {message}")]
    InvalidRange { message: String },

    #[error("Address family mismatch: expected {expected}, found {found}")]
    FamilyMismatch { expected: Family, found: Family },

    #[error("Insufficient space: {requested} requested, only {available} available")]
    Capacity { requested: usize, available: u128 },

    #[error("Allocation conflict on {parent}: {message}")]
    Conflict { parent: ParentRef, message: String },

    #[error("{unit} is outside of {parent}")]
    ScopeViolation { parent: ParentRef, unit: String },

    #[error("{parent} not found")]
    ParentNotFound { parent: ParentRef },

    #[error("Cannot allocate {child} records from a {parent}")]
    UnsupportedParent { parent: ParentKind, child: ChildKind },

    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Coarse classification used by transports to pick a status code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    BadRequest,
    NotFound,
    Conflict,
    Internal,
}

impl AllocationError {
    pub fn invalid_range(message: impl Into<String>) -> Self {
        AllocationError::InvalidRange {
            message: message.into(),
        }
    }

    pub fn class(&self) -> ErrorClass {
        match self {
            AllocationError::InvalidRange { .. }
            | AllocationError::FamilyMismatch { .. }
            | AllocationError::ScopeViolation { .. }
            | AllocationError::UnsupportedParent { .. } => ErrorClass::BadRequest,
            AllocationError::Capacity { .. } | AllocationError::Conflict { .. } => {
                ErrorClass::Conflict
            }
            AllocationError::ParentNotFound { .. } => ErrorClass::NotFound,
            AllocationError::Repository(_) => ErrorClass::Internal,
        }
    }
}

/// Errors raised by repository implementations
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("{kind} {id} not found")]
    NotFound { kind: ChildKind, id: u64 },

    #[error("Constraint violation: {message}")]
    Constraint { message: String },

    #[error("{child} records cannot be children of a {parent}")]
    Unsupported { parent: ParentKind, child: ChildKind },

    #[error("Storage error: {message}")]
    Storage { message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<SharedTypeError> for RepositoryError {
    fn from(err: SharedTypeError) -> Self {
        RepositoryError::Storage {
            message: err.to_string(),
        }
    }
}
