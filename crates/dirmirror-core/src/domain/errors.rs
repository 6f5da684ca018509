//! Domain error types
//!
//! Validation failures raised when constructing domain newtypes.

use thiserror::Error;

/// Errors that can occur in domain operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// The name cannot identify a file inside the watched directory
    #[error("Invalid file name: {0}")]
    InvalidFileName(String),

    /// The string is not a `YYYY-MM-DD HH:MM:SS` timestamp
    #[error("Invalid sync instant: {0}")]
    InvalidInstant(String),
}
