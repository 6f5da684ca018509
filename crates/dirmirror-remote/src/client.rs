//! Disk REST API client
//!
//! Provides an authenticated HTTP client for the resources endpoint of a
//! Yandex-Disk-style REST API. Handles the authorization header, the
//! timeouts, and the mapping from HTTP status codes and transport failures
//! to [`RemoteError`].
//!
//! API calls and content uploads have separate time limits: an API call
//! should answer within seconds, while a large file may take much longer to
//! transfer.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use dirmirror_remote::client::DiskClient;
//!
//! # fn example() -> Result<(), dirmirror_core::ports::RemoteError> {
//! let client = DiskClient::new(
//!     "https://cloud-api.yandex.net/v1/disk/resources",
//!     "oauth-token-here",
//!     Duration::from_secs(30),
//! )?
//! .with_upload_timeout(Duration::from_secs(3600));
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use reqwest::header::{ACCEPT, AUTHORIZATION, RETRY_AFTER};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use tracing::debug;

use dirmirror_core::ports::RemoteError;

/// Error body returned by the API on non-2xx responses
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    /// Human-readable description
    description: Option<String>,
    /// Localized message
    message: Option<String>,
    /// Machine-readable error code (e.g. `DiskNotFoundError`)
    error: Option<String>,
}

/// Upload time limit used unless [`DiskClient::with_upload_timeout`] is called
pub const DEFAULT_UPLOAD_TIMEOUT: Duration = Duration::from_secs(3600);

/// HTTP client for the disk resources endpoint
pub struct DiskClient {
    /// The underlying HTTP client
    client: Client,
    /// Resources endpoint URL, without trailing slash
    api_url: String,
    /// OAuth token sent with every API request
    token: String,
    /// Limit for each API call
    request_timeout: Duration,
    /// Limit for each content upload, body transfer included
    upload_timeout: Duration,
}

impl DiskClient {
    /// Creates a new client
    ///
    /// # Arguments
    /// * `api_url` - Resources endpoint, e.g. `https://cloud-api.yandex.net/v1/disk/resources`
    /// * `token` - OAuth token
    /// * `request_timeout` - Upper bound on every API call, and on connecting
    ///   for uploads
    ///
    /// # Errors
    /// Returns `RemoteError::Network` if the HTTP client cannot be built
    pub fn new(
        api_url: impl Into<String>,
        token: impl Into<String>,
        request_timeout: Duration,
    ) -> Result<Self, RemoteError> {
        let client = Client::builder()
            .connect_timeout(request_timeout)
            .build()
            .map_err(|e| RemoteError::Network(format!("Failed to build HTTP client: {e}")))?;

        let api_url = api_url.into().trim_end_matches('/').to_string();

        Ok(Self {
            client,
            api_url,
            token: token.into(),
            request_timeout,
            upload_timeout: DEFAULT_UPLOAD_TIMEOUT,
        })
    }

    /// Sets the upper bound on a single content upload
    #[must_use]
    pub fn with_upload_timeout(mut self, timeout: Duration) -> Self {
        self.upload_timeout = timeout;
        self
    }

    /// Creates an authenticated request builder
    ///
    /// # Arguments
    /// * `method` - HTTP method
    /// * `suffix` - Path appended to the resources endpoint (`""` or `"/upload"`)
    pub fn request(&self, method: Method, suffix: &str) -> RequestBuilder {
        let url = format!("{}{}", self.api_url, suffix);
        self.client
            .request(method, &url)
            .timeout(self.request_timeout)
            .header(AUTHORIZATION, format!("OAuth {}", self.token))
            .header(ACCEPT, "application/json")
    }

    /// Sends a request and maps transport errors and non-2xx statuses
    pub async fn send(&self, request: RequestBuilder) -> Result<Response, RemoteError> {
        let response = request.send().await.map_err(map_transport_error)?;
        check_status(response).await
    }

    /// Returns the resources endpoint URL
    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    /// Creates a `PUT` to an upload URL handed out by the API
    ///
    /// Upload targets must not carry the OAuth header, and are bounded by the
    /// upload timeout instead of the API one.
    pub(crate) fn upload_request(&self, href: &str) -> RequestBuilder {
        self.client.put(href).timeout(self.upload_timeout)
    }
}

/// Maps a reqwest failure to a [`RemoteError`]
pub(crate) fn map_transport_error(e: reqwest::Error) -> RemoteError {
    if e.is_timeout() {
        RemoteError::Timeout(e.to_string())
    } else if e.is_decode() {
        RemoteError::InvalidResponse(e.to_string())
    } else {
        RemoteError::Network(e.to_string())
    }
}

/// Passes 2xx responses through and converts every other status to an error
pub(crate) async fn check_status(response: Response) -> Result<Response, RemoteError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let retry_after_secs = response
        .headers()
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok());

    let body = response.text().await.unwrap_or_default();
    let message = error_message(status, &body);
    debug!(status = status.as_u16(), %message, "API returned error status");

    Err(status_to_error(status, message, retry_after_secs))
}

/// Classifies a non-2xx status
pub(crate) fn status_to_error(
    status: StatusCode,
    message: String,
    retry_after_secs: Option<u64>,
) -> RemoteError {
    match status {
        StatusCode::UNAUTHORIZED => RemoteError::Unauthorized(message),
        StatusCode::FORBIDDEN => RemoteError::Forbidden(message),
        StatusCode::NOT_FOUND => RemoteError::NotFound(message),
        StatusCode::CONFLICT | StatusCode::PRECONDITION_FAILED => RemoteError::Conflict(message),
        StatusCode::TOO_MANY_REQUESTS => RemoteError::TooManyRequests { retry_after_secs },
        s if s.is_server_error() => RemoteError::ServerError {
            status: s.as_u16(),
            message,
        },
        s => RemoteError::InvalidResponse(format!("unexpected status {}: {}", s.as_u16(), message)),
    }
}

/// Extracts the most useful text from an error body
fn error_message(status: StatusCode, body: &str) -> String {
    if let Ok(parsed) = serde_json::from_str::<ApiErrorBody>(body) {
        if let Some(text) = parsed.description.or(parsed.message).or(parsed.error) {
            return text;
        }
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        status
            .canonical_reason()
            .unwrap_or("no error description")
            .to_string()
    } else {
        trimmed.to_string()
    }
}
