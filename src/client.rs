//! # Kitchen Server Client
//!
//! HTTP access to the two kitchen endpoints.
//!
//! | Operation | Request |
//! |-----------|---------|
//! | Poll      | `GET {base}/kictchen/endpoints/pending_kds_prints.jsp` |
//! | Ack       | `POST {base}/kictchen/endpoints/update_kds_print.jsp`, form `action=update&internalDispatchSerial=<id>` |
//!
//! The endpoint paths are fixed by the server and spelled exactly as it
//! serves them.

use std::time::Duration;

use crate::error::RelayError;
use crate::job::JobId;

/// Pending-jobs endpoint.
pub const POLL_PATH: &str = "/kictchen/endpoints/pending_kds_prints.jsp";

/// Acknowledgment endpoint.
pub const ACK_PATH: &str = "/kictchen/endpoints/update_kds_print.jsp";

pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(15);
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Build the shared HTTP client.
///
/// `accept_invalid_certs` disables certificate verification for kitchen
/// servers running on self-signed certificates.
pub fn build_http_client(accept_invalid_certs: bool) -> Result<reqwest::Client, RelayError> {
    reqwest::Client::builder()
        .user_agent(concat!("kds-relay/", env!("CARGO_PKG_VERSION")))
        .connect_timeout(CONNECT_TIMEOUT)
        .timeout(REQUEST_TIMEOUT)
        .danger_accept_invalid_certs(accept_invalid_certs)
        .build()
        .map_err(|e| RelayError::Config(format!("HTTP client error: {}", e)))
}

/// Join a base URL and an absolute path.
///
/// One trailing slash is trimmed from the base and a leading slash is
/// ensured on the path.
///
/// ```
/// use kds_relay::client::join_url;
///
/// assert_eq!(join_url("http://k.local/", "a.jsp"), "http://k.local/a.jsp");
/// assert_eq!(join_url("http://k.local", "/a.jsp"), "http://k.local/a.jsp");
/// ```
pub fn join_url(base: &str, path: &str) -> String {
    let base = base.strip_suffix('/').unwrap_or(base);
    if path.starts_with('/') {
        format!("{}{}", base, path)
    } else {
        format!("{}/{}", base, path)
    }
}

/// Client for the poll and acknowledgment endpoints.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
}

impl ApiClient {
    pub fn new(http: reqwest::Client) -> Self {
        Self { http }
    }

    /// Fetch the raw pending-jobs body.
    ///
    /// Network failures map to [`RelayError::Transport`] and non-2xx
    /// responses to [`RelayError::Status`]. The body is returned undecoded.
    pub async fn fetch_pending(&self, base_url: &str) -> Result<String, RelayError> {
        let url = join_url(base_url, POLL_PATH);
        tracing::debug!(%url, "polling");

        let response = self.http.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(RelayError::Status(status.as_u16()));
        }
        Ok(response.text().await?)
    }

    /// Post an acknowledgment for one job.
    pub async fn acknowledge(&self, base_url: &str, id: &JobId) -> Result<(), RelayError> {
        let url = join_url(base_url, ACK_PATH);
        let response = self
            .http
            .post(&url)
            .form(&[("action", "update"), ("internalDispatchSerial", id.as_str())])
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(RelayError::Status(status.as_u16()))
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
