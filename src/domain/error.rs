//! Domain Layer - Errors
//!
//! Every fallible domain operation reports a `DomainError`.

use serde::{Deserialize, Serialize};

/// Common result type for domain operations
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level errors
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DomainError {
    /// Invalid item fields on creation or edit
    Validation(String),
    /// Remote endpoint could not be reached or answered garbage
    RemoteUnavailable(String),
    /// Persisted local payload does not match the item schema
    MalformedLocalState(String),
    /// Backup payload is not an array of items
    MalformedImport(String),
    NotFound(String),
    Internal(String),
}

impl DomainError {
    /// Errors that stay at the gateway boundary
    pub fn is_remote(&self) -> bool {
        matches!(self, DomainError::RemoteUnavailable(_))
    }
}

impl std::fmt::Display for DomainError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DomainError::Validation(msg) => write!(f, "Invalid input: {}", msg),
            DomainError::RemoteUnavailable(msg) => write!(f, "Remote unavailable: {}", msg),
            DomainError::MalformedLocalState(msg) => write!(f, "Malformed local state: {}", msg),
            DomainError::MalformedImport(msg) => write!(f, "Malformed import: {}", msg),
            DomainError::NotFound(msg) => write!(f, "Not found: {}", msg),
            DomainError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for DomainError {}

impl From<rusqlite::Error> for DomainError {
    fn from(e: rusqlite::Error) -> Self {
        DomainError::Internal(e.to_string())
    }
}
