//! Domain types and business rules
//!
//! This module contains the core domain types for dirmirror:
//! - Newtypes for validated file names and sync instants
//! - The ledger snapshot and the per-cycle ledger change set
//! - Per-file action outcomes
//! - Domain-specific error types

pub mod errors;
pub mod ledger;
pub mod newtypes;
pub mod outcome;

// Re-export commonly used types
pub use errors::DomainError;
pub use ledger::{LedgerChangeSet, LedgerSnapshot};
pub use newtypes::{FileName, SyncInstant, INSTANT_FORMAT};
pub use outcome::{ActionKind, ActionOutcome, ActionRecord};
