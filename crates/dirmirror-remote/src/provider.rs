//! DiskRemoteConnector - IRemoteConnector implementation for the disk REST API
//!
//! Wraps the [`DiskClient`] and delegates to the listing and upload modules
//! to fulfil the [`IRemoteConnector`] port contract. Deletion is a single
//! call made directly here.

use std::collections::BTreeSet;
use std::path::Path;
use std::time::Duration;

use reqwest::Method;
use tracing::{debug, instrument};

use dirmirror_core::config::RemoteConfig;
use dirmirror_core::domain::FileName;
use dirmirror_core::ports::{IRemoteConnector, RemoteError};

use crate::client::DiskClient;
use crate::{listing, upload};

/// Remote connector backed by the disk REST API
pub struct DiskRemoteConnector {
    client: DiskClient,
    /// Remote folder mirroring the watched directory, e.g. `app:/`
    root: String,
    page_size: u32,
}

impl DiskRemoteConnector {
    /// Creates a connector for `root` using an existing client
    pub fn new(client: DiskClient, root: impl Into<String>, page_size: u32) -> Self {
        Self {
            client,
            root: root.into(),
            page_size: page_size.max(1),
        }
    }

    /// Builds a connector from the `remote` configuration section
    ///
    /// # Errors
    /// Returns `RemoteError::Unauthorized` when no token is configured
    pub fn from_config(config: &RemoteConfig) -> Result<Self, RemoteError> {
        let token = config
            .token
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| RemoteError::Unauthorized("no API token configured".into()))?;

        let client = DiskClient::new(
            config.api_url.as_str(),
            token,
            Duration::from_secs(config.request_timeout_secs),
        )?
        .with_upload_timeout(Duration::from_secs(config.upload_timeout_secs));

        Ok(Self::new(client, config.root.as_str(), config.page_size))
    }

    /// Remote path of `name`: the root and the name joined by exactly one `/`
    pub fn remote_path(&self, name: &FileName) -> String {
        format!("{}/{}", self.root.trim_end_matches('/'), name.as_str())
    }

    /// Remote folder this connector mirrors into
    pub fn root(&self) -> &str {
        &self.root
    }
}

#[async_trait::async_trait]
impl IRemoteConnector for DiskRemoteConnector {
    #[instrument(skip_all, fields(root = %self.root))]
    async fn list(&self) -> Result<BTreeSet<FileName>, RemoteError> {
        let names = listing::list_files(&self.client, &self.root, self.page_size).await?;
        debug!(count = names.len(), "Listed remote root");
        Ok(names)
    }

    #[instrument(skip_all, fields(file = %name, overwrite = overwrite))]
    async fn upload(
        &self,
        local_path: &Path,
        name: &FileName,
        overwrite: bool,
    ) -> Result<(), RemoteError> {
        let remote_path = self.remote_path(name);
        upload::upload_file(&self.client, local_path, &remote_path, overwrite).await
    }

    #[instrument(skip_all, fields(file = %name))]
    async fn delete(&self, name: &FileName) -> Result<(), RemoteError> {
        let remote_path = self.remote_path(name);
        let request = self.client.request(Method::DELETE, "").query(&[
            ("path", remote_path.as_str()),
            ("permanently", "false"),
        ]);

        let response = self.client.send(request).await?;
        debug!(status = response.status().as_u16(), "Deleted remote object");
        Ok(())
    }
}
