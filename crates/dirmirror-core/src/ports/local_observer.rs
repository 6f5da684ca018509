//! Local observer port (driven/secondary port)
//!
//! Read-only view of the watched directory. The engine never writes to the
//! local side.

use std::collections::BTreeSet;
use std::path::PathBuf;

use crate::domain::newtypes::{FileName, SyncInstant};

/// Port for scanning the watched directory
///
/// ## Implementation Notes
///
/// - `list` returns regular files directly inside the directory. Entries
///   whose names are not valid [`FileName`]s are skipped.
/// - A file can disappear between `list` and `modified_at`; that is reported
///   as `Ok(None)`, not as an error.
#[async_trait::async_trait]
pub trait ILocalObserver: Send + Sync {
    /// Lists the names of all regular files in the watched directory
    ///
    /// # Errors
    /// Returns an error if the directory itself cannot be read
    async fn list(&self) -> anyhow::Result<BTreeSet<FileName>>;

    /// Returns the file's modification time as local wall-clock time
    ///
    /// # Returns
    /// `None` if the file no longer exists
    async fn modified_at(&self, name: &FileName) -> anyhow::Result<Option<SyncInstant>>;

    /// Absolute path of `name` inside the watched directory
    fn path_of(&self, name: &FileName) -> PathBuf;
}
