//! Upload operations
//!
//! Uploading is a two-step exchange:
//! 1. [`request_upload_target`] - `GET {api_url}/upload?path=..&overwrite=..`
//!    returns a one-time `href`
//! 2. [`put_content`] - `PUT href` streaming the file from disk
//!
//! Asking for a target with `overwrite=false` when the object exists fails
//! with 409, which surfaces as [`RemoteError::Conflict`].

use std::path::Path;

use reqwest::header::CONTENT_LENGTH;
use reqwest::{Body, Method};
use tokio::fs::File;
use tokio_util::io::ReaderStream;
use serde::Deserialize;
use tracing::debug;

use dirmirror_core::ports::RemoteError;

use crate::client::{check_status, map_transport_error, DiskClient};

/// Response of the upload-target endpoint
#[derive(Debug, Deserialize)]
struct UploadLink {
    href: Option<String>,
    method: Option<String>,
}

/// Negotiates a one-time upload URL for `remote_path`
pub async fn request_upload_target(
    client: &DiskClient,
    remote_path: &str,
    overwrite: bool,
) -> Result<String, RemoteError> {
    let request = client.request(Method::GET, "/upload").query(&[
        ("path", remote_path.to_string()),
        ("overwrite", overwrite.to_string()),
    ]);

    let link: UploadLink = client
        .send(request)
        .await?
        .json()
        .await
        .map_err(map_transport_error)?;

    if let Some(method) = link.method.as_deref() {
        if !method.eq_ignore_ascii_case("PUT") {
            return Err(RemoteError::InvalidResponse(format!(
                "unsupported upload method '{method}'"
            )));
        }
    }

    link.href
        .filter(|href| !href.is_empty())
        .ok_or_else(|| RemoteError::InvalidResponse("upload target has no href".into()))
}

/// Streams `file` (of `size` bytes) to an upload URL obtained from
/// [`request_upload_target`]
pub async fn put_content(
    client: &DiskClient,
    href: &str,
    file: File,
    size: u64,
) -> Result<(), RemoteError> {
    let response = client
        .upload_request(href)
        .header(CONTENT_LENGTH, size)
        .body(Body::wrap_stream(ReaderStream::new(file)))
        .send()
        .await
        .map_err(map_transport_error)?;

    check_status(response).await?;
    debug!(bytes = size, "Uploaded content");
    Ok(())
}

/// Uploads `local_path` to `remote_path`
///
/// The file is opened before negotiating, so a vanished file costs no API
/// call, and is never held in memory as a whole.
pub async fn upload_file(
    client: &DiskClient,
    local_path: &Path,
    remote_path: &str,
    overwrite: bool,
) -> Result<(), RemoteError> {
    let local_error = |e: std::io::Error| {
        RemoteError::LocalFile(format!("{}: {}", local_path.display(), e))
    };
    let file = File::open(local_path).await.map_err(local_error)?;
    let size = file.metadata().await.map_err(local_error)?.len();

    let href = request_upload_target(client, remote_path, overwrite).await?;
    put_content(client, &href, file, size).await
}
