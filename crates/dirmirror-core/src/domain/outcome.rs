//! Per-file action outcomes
//!
//! Every remote mutation the engine issues yields an [`ActionOutcome`];
//! the engine branches on the outcome kind instead of on error types, and
//! the outcomes are aggregated into the cycle report.

use std::fmt::{self, Display, Formatter};

use super::newtypes::FileName;

/// Which remote mutation was issued for a file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    /// First upload of a file missing remotely (overwrite = false)
    Upload,
    /// Re-upload of a file modified since its last sync (overwrite = true)
    Overwrite,
    /// Removal of a remote object with no local counterpart
    Delete,
}

impl ActionKind {
    /// Short lowercase name for log fields
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Upload => "upload",
            ActionKind::Overwrite => "overwrite",
            ActionKind::Delete => "delete",
        }
    }
}

impl Display for ActionKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of one remote mutation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    /// The remote side now reflects the local state for this file
    Succeeded,
    /// The action failed; the ledger is not advanced, so the next cycle
    /// attempts it again
    Retryable(String),
    /// The action failed in a way that will fail every other action too
    /// (rejected credentials); the rest of the cycle's remote actions are
    /// skipped
    Fatal(String),
}

impl ActionOutcome {
    /// Returns true for [`ActionOutcome::Succeeded`]
    pub fn is_success(&self) -> bool {
        matches!(self, ActionOutcome::Succeeded)
    }

    /// Returns true for [`ActionOutcome::Fatal`]
    pub fn is_fatal(&self) -> bool {
        matches!(self, ActionOutcome::Fatal(_))
    }

    /// Failure reason, if any
    pub fn reason(&self) -> Option<&str> {
        match self {
            ActionOutcome::Succeeded => None,
            ActionOutcome::Retryable(reason) | ActionOutcome::Fatal(reason) => Some(reason),
        }
    }
}

/// One entry of the cycle report
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionRecord {
    pub name: FileName,
    pub kind: ActionKind,
    pub outcome: ActionOutcome,
}

impl ActionRecord {
    pub fn new(name: FileName, kind: ActionKind, outcome: ActionOutcome) -> Self {
        Self {
            name,
            kind,
            outcome,
        }
    }
}
