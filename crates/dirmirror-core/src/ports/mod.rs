//! Port definitions (hexagonal architecture interfaces)
//!
//! This module defines the port traits that form the boundaries of the
//! hexagonal architecture. The reconciliation engine depends only on these
//! traits; their implementations live in adapter crates.
//!
//! ## Ports Overview
//!
//! - [`IRemoteConnector`] - Remote object store (list, upload, delete)
//! - [`ILocalObserver`] - Scan of the watched directory
//! - [`ILedgerStore`] - Durable `filename → last-sync-instant` mapping

pub mod ledger_store;
pub mod local_observer;
pub mod remote_connector;

pub use ledger_store::ILedgerStore;
pub use local_observer::ILocalObserver;
pub use remote_connector::{IRemoteConnector, RemoteError};
