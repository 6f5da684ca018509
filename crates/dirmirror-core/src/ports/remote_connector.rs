//! Remote connector port (driven/secondary port)
//!
//! This module defines the interface to the remote object store that mirrors
//! the watched directory. The store is a flat folder addressed by file name
//! under a configured root.
//!
//! ## Design Notes
//!
//! - Unlike the other ports, errors are typed ([`RemoteError`]) rather than
//!   `anyhow::Error`: the engine must tell a rejected credential (stop the
//!   cycle) from a timeout (retry next cycle) from an already-deleted object
//!   (treat as success).
//! - Uses `#[async_trait]` for async trait methods.

use std::collections::BTreeSet;
use std::path::Path;

use thiserror::Error;

use crate::domain::newtypes::FileName;

// ============================================================================
// RemoteError
// ============================================================================

/// Errors returned by remote store operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RemoteError {
    /// Credentials were rejected (401)
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Access to the resource is denied (403)
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// The resource does not exist (404)
    #[error("Not found: {0}")]
    NotFound(String),

    /// The object already exists or a precondition failed (409, 412)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The store is rate limiting this client (429)
    #[error("Too many requests, retry after {retry_after_secs:?}s")]
    TooManyRequests { retry_after_secs: Option<u64> },

    /// The store failed to handle the request (5xx)
    #[error("Server error ({status}): {message}")]
    ServerError { status: u16, message: String },

    /// The request did not complete within the configured timeout
    #[error("Request timed out: {0}")]
    Timeout(String),

    /// Connection-level failure
    #[error("Network error: {0}")]
    Network(String),

    /// The local file to upload could not be read
    #[error("Local file error: {0}")]
    LocalFile(String),

    /// The store answered with an unexpected status or body
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl RemoteError {
    /// Returns true if the same request may succeed later without any
    /// change on our side
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            RemoteError::TooManyRequests { .. }
                | RemoteError::ServerError { .. }
                | RemoteError::Timeout(_)
                | RemoteError::Network(_)
                | RemoteError::LocalFile(_)
        )
    }

    /// Returns true if every further request in this cycle would fail the
    /// same way
    pub fn is_fatal(&self) -> bool {
        matches!(self, RemoteError::Unauthorized(_))
    }

    /// Returns true for [`RemoteError::NotFound`]
    pub fn is_not_found(&self) -> bool {
        matches!(self, RemoteError::NotFound(_))
    }
}

// ============================================================================
// IRemoteConnector trait
// ============================================================================

/// Port for the remote object store
///
/// ## Implementation Notes
///
/// - `list` returns regular objects only, never folders.
/// - `upload` with `overwrite = false` against an existing object must fail
///   with [`RemoteError::Conflict`].
/// - Implementations perform no retries; the next cycle is the retry.
#[async_trait::async_trait]
pub trait IRemoteConnector: Send + Sync {
    /// Lists the names of all objects under the remote root
    ///
    /// # Errors
    /// Any error aborts the current cycle before mutations are issued
    async fn list(&self) -> Result<BTreeSet<FileName>, RemoteError>;

    /// Uploads a local file as `name` under the remote root
    ///
    /// # Arguments
    /// * `local_path` - Absolute path of the file to read
    /// * `name` - Object name under the remote root
    /// * `overwrite` - Whether to replace an existing object
    async fn upload(
        &self,
        local_path: &Path,
        name: &FileName,
        overwrite: bool,
    ) -> Result<(), RemoteError>;

    /// Deletes the object `name` under the remote root
    async fn delete(&self, name: &FileName) -> Result<(), RemoteError>;
}
