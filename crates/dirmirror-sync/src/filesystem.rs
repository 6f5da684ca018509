//! Local directory adapter (secondary/driven adapter)
//!
//! Implements [`ILocalObserver`] over a single flat directory using
//! `tokio::fs`.
//!
//! ## Design Decisions
//!
//! - **Flat scan**: only entries directly inside the root are considered;
//!   subdirectories are ignored.
//! - **Symlinks**: followed, so a link to a regular file is mirrored under
//!   the link's name. Dangling links are ignored.
//! - **Unrepresentable names**: entries whose name is not valid UTF-8 or is
//!   not a valid [`FileName`] are logged and skipped.

use std::collections::BTreeSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{debug, instrument, warn};

use dirmirror_core::domain::{FileName, SyncInstant};
use dirmirror_core::ports::ILocalObserver;

use crate::SyncError;

/// Adapter that bridges the [`ILocalObserver`] port to a real directory
#[derive(Debug, Clone)]
pub struct LocalDirectoryObserver {
    root: PathBuf,
}

impl LocalDirectoryObserver {
    /// Creates an observer for `root`; the directory is not touched
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The watched directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Checks that the watched path exists and is a directory
    ///
    /// # Errors
    /// - `SyncError::IoError` if the path cannot be inspected
    /// - `SyncError::NotADirectory` if it is something else
    pub async fn ensure_exists(&self) -> Result<(), SyncError> {
        let metadata = tokio::fs::metadata(&self.root).await?;
        if !metadata.is_dir() {
            return Err(SyncError::NotADirectory(self.root.clone()));
        }
        Ok(())
    }

    /// Converts a directory entry name into a [`FileName`]
    fn entry_name(raw: std::ffi::OsString) -> Result<FileName, SyncError> {
        let name = raw.into_string().map_err(|raw| {
            SyncError::DomainError(dirmirror_core::domain::DomainError::InvalidFileName(
                raw.to_string_lossy().into_owned(),
            ))
        })?;
        Ok(FileName::new(name)?)
    }
}

#[async_trait::async_trait]
impl ILocalObserver for LocalDirectoryObserver {
    #[instrument(skip(self), fields(root = %self.root.display()))]
    async fn list(&self) -> anyhow::Result<BTreeSet<FileName>> {
        let mut entries = tokio::fs::read_dir(&self.root).await?;
        let mut names = BTreeSet::new();

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();

            let metadata = match tokio::fs::metadata(&path).await {
                Ok(metadata) => metadata,
                Err(e) if e.kind() == ErrorKind::NotFound => {
                    debug!(path = %path.display(), "Entry vanished or dangling link, skipping");
                    continue;
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Cannot stat entry, skipping");
                    continue;
                }
            };

            if !metadata.is_file() {
                continue;
            }

            match Self::entry_name(entry.file_name()) {
                Ok(name) => {
                    names.insert(name);
                }
                Err(e) => warn!(path = %path.display(), error = %e, "Skipping file"),
            }
        }

        debug!(count = names.len(), "Scanned local directory");
        Ok(names)
    }

    async fn modified_at(&self, name: &FileName) -> anyhow::Result<Option<SyncInstant>> {
        let metadata = match tokio::fs::metadata(self.path_of(name)).await {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        if !metadata.is_file() {
            return Ok(None);
        }

        Ok(Some(SyncInstant::from_system_time(metadata.modified()?)))
    }

    fn path_of(&self, name: &FileName) -> PathBuf {
        self.root.join(name.as_str())
    }
}
