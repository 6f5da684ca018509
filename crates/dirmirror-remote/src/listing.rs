//! Listing of the remote root folder
//!
//! `GET {api_url}?path={root}&limit={n}&offset={k}` returns the folder's
//! metadata with its children under `_embedded.items`. Large folders are
//! paginated; `_embedded.total` says when to stop.

use std::collections::BTreeSet;

use reqwest::Method;
use serde::Deserialize;
use tracing::{debug, warn};

use dirmirror_core::domain::FileName;
use dirmirror_core::ports::RemoteError;

use crate::client::{map_transport_error, DiskClient};

/// Folder resource returned by the metadata endpoint
#[derive(Debug, Deserialize)]
struct FolderResource {
    #[serde(rename = "_embedded")]
    embedded: Option<EmbeddedItems>,
}

/// One page of a folder's children
#[derive(Debug, Deserialize)]
struct EmbeddedItems {
    #[serde(default)]
    items: Vec<ResourceItem>,
    /// Total number of children across all pages
    total: Option<u64>,
}

/// A child resource
#[derive(Debug, Deserialize)]
struct ResourceItem {
    name: String,
    /// `file` or `dir`
    #[serde(rename = "type")]
    kind: Option<String>,
}

impl ResourceItem {
    fn is_file(&self) -> bool {
        self.kind.as_deref().map_or(true, |k| k == "file")
    }
}

/// Lists the names of all files directly under `root`
///
/// Sub-folders are ignored, as are names that cannot be local file names.
pub async fn list_files(
    client: &DiskClient,
    root: &str,
    page_size: u32,
) -> Result<BTreeSet<FileName>, RemoteError> {
    let mut names = BTreeSet::new();
    let mut offset: u64 = 0;

    loop {
        let request = client.request(Method::GET, "").query(&[
            ("path", root.to_string()),
            ("limit", page_size.to_string()),
            ("offset", offset.to_string()),
        ]);

        let resource: FolderResource = client
            .send(request)
            .await?
            .json()
            .await
            .map_err(map_transport_error)?;

        let Some(page) = resource.embedded else {
            return Err(RemoteError::InvalidResponse(format!(
                "'{root}' is not a folder (no _embedded listing)"
            )));
        };

        let fetched = page.items.len() as u64;
        for item in page.items {
            if !item.is_file() {
                continue;
            }
            match FileName::new(item.name.as_str()) {
                Ok(name) => {
                    names.insert(name);
                }
                Err(e) => warn!(name = %item.name, error = %e, "Skipping remote item"),
            }
        }

        offset += fetched;
        let total = page.total.unwrap_or(offset);
        debug!(offset, total, "Fetched remote listing page");

        if fetched == 0 || offset >= total {
            break;
        }
    }

    Ok(names)
}
