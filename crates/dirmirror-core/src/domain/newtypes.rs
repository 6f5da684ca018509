//! Domain newtypes with validation
//!
//! This module provides strongly-typed wrappers for the two values the
//! reconciliation engine reasons about: the name of a file inside the
//! watched directory and the instant at which it was last synchronized.
//! Each newtype ensures data validity at construction time.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;
use std::time::SystemTime;

use chrono::{DateTime, Local, NaiveDateTime};
use serde::{Deserialize, Serialize};

use super::errors::DomainError;

/// Text format of every instant stored in the ledger
///
/// Fixed-width and most-significant-field-first, so comparing two formatted
/// strings lexicographically gives the same answer as comparing the instants.
pub const INSTANT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

// ============================================================================
// FileName
// ============================================================================

/// Name of a file directly inside the watched directory
///
/// The same string identifies the object under the remote root and the
/// ledger row, so it must be a single path component.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FileName(String);

impl FileName {
    /// Create a new FileName
    ///
    /// # Errors
    /// Returns error if the name is empty, is `.` or `..`, or contains
    /// a path separator or NUL byte
    pub fn new(name: impl Into<String>) -> Result<Self, DomainError> {
        let name = name.into();

        if name.is_empty() {
            return Err(DomainError::InvalidFileName(
                "File name cannot be empty".to_string(),
            ));
        }

        if name == "." || name == ".." {
            return Err(DomainError::InvalidFileName(format!(
                "'{name}' is not a file name"
            )));
        }

        if name.contains('/') || name.contains('\0') {
            return Err(DomainError::InvalidFileName(format!(
                "File name must be a single path component: {name}"
            )));
        }

        Ok(Self(name))
    }

    /// Get the inner string reference
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for FileName {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for FileName {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for FileName {
    type Error = DomainError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<FileName> for String {
    fn from(name: FileName) -> Self {
        name.0
    }
}

impl AsRef<str> for FileName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// ============================================================================
// SyncInstant
// ============================================================================

/// A second-precision local wall-clock instant in [`INSTANT_FORMAT`]
///
/// Used both for file modification times and for the ledger's
/// last-synchronized instants. Ordering is the derived string ordering,
/// which matches chronological ordering for this format.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SyncInstant(String);

impl SyncInstant {
    /// Parse an instant from its stored text form
    ///
    /// # Errors
    /// Returns error if the string is not in [`INSTANT_FORMAT`]
    pub fn parse(s: impl Into<String>) -> Result<Self, DomainError> {
        let s = s.into();
        let parsed = NaiveDateTime::parse_from_str(&s, INSTANT_FORMAT)
            .map_err(|e| DomainError::InvalidInstant(format!("'{s}': {e}")))?;

        // Reject forms chrono accepts but that would not sort correctly,
        // e.g. unpadded fields.
        if parsed.format(INSTANT_FORMAT).to_string() != s {
            return Err(DomainError::InvalidInstant(format!(
                "'{s}' is not zero-padded {INSTANT_FORMAT}"
            )));
        }

        Ok(Self(s))
    }

    /// The current local wall-clock time
    #[must_use]
    pub fn now() -> Self {
        Self::from_local(Local::now())
    }

    /// Convert a filesystem timestamp to local wall-clock time
    #[must_use]
    pub fn from_system_time(time: SystemTime) -> Self {
        Self::from_local(DateTime::<Local>::from(time))
    }

    /// An instant older than any file modification time
    ///
    /// Stands in for a ledger value that cannot be read, so the tracked file
    /// compares as modified and is uploaded again.
    #[must_use]
    pub fn earliest() -> Self {
        Self("0000-01-01 00:00:00".to_string())
    }

    fn from_local(value: DateTime<Local>) -> Self {
        Self(value.format(INSTANT_FORMAT).to_string())
    }

    /// Get the inner string reference
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for SyncInstant {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SyncInstant {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for SyncInstant {
    type Error = DomainError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(s)
    }
}

impl From<SyncInstant> for String {
    fn from(instant: SyncInstant) -> Self {
        instant.0
    }
}

// ============================================================================
// Tests
// ============================================================================
