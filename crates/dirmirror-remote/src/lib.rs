//! dirmirror Remote - Disk REST API connector
//!
//! Provides the async HTTP adapter behind the `IRemoteConnector` port:
//! - Listing the files under the remote root (paginated)
//! - Two-step uploads (negotiate target, then PUT the bytes)
//! - Deletion of orphaned objects
//!
//! Every request carries `Authorization: OAuth <token>`. No request is
//! retried here; a failed action is attempted again on the next cycle.
//!
//! ## Modules
//!
//! - [`client`] - Authenticated HTTP client and status mapping
//! - [`listing`] - Remote folder listing
//! - [`upload`] - Upload target negotiation and content transfer
//! - [`provider`] - `IRemoteConnector` implementation

pub mod client;
pub mod listing;
pub mod provider;
pub mod upload;

pub use client::DiskClient;
pub use provider::DiskRemoteConnector;
