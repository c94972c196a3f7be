//! Jobgauge Backend Client
//!
//! HTTP binding for remote batch-processing backends that expose a
//! job-submission REST API.
//!
//! The monitor never talks HTTP directly; it depends on the
//! [`BackendConnection`] trait, so any REST/GraphQL/gRPC binding can be
//! substituted. [`HttpBackendClient`] is the concrete binding for
//! openEO-shaped REST backends.
//!
//! # Example
//!
//! ```no_run
//! use jobgauge_client::{BackendConnection, HttpBackendClient};
//! use jobgauge_core::domain::job::JobDefinition;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = HttpBackendClient::new("https://backend.example.org/v1");
//!
//!     let definition = JobDefinition::new("ndvi", br#"{"process_graph": {}}"#.to_vec())?;
//!     let job_id = client.submit(&definition).await?;
//!
//!     println!("Submitted job: {job_id}");
//!     Ok(())
//! }
//! ```

pub mod error;
mod jobs;

// Re-export commonly used types
pub use error::{BackendError, Result};

use async_trait::async_trait;
use jobgauge_core::domain::job::JobDefinition;
use reqwest::{Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use std::path::Path;

/// Contract between the lifecycle monitor and a remote backend
///
/// Four lifecycle operations plus a best-effort diagnostics read. No
/// assumption is made about the wire protocol beyond "terminal states
/// exist and are drawn from a small closed set". `poll_status` must be a
/// single non-blocking read: the poller owns all backoff policy.
#[async_trait]
pub trait BackendConnection: Send + Sync {
    /// Base URL of the backend, used for run identity fields
    fn backend_url(&self) -> &str;

    /// Submit a job definition, returning the backend-assigned job id
    async fn submit(&self, definition: &JobDefinition) -> Result<String>;

    /// Transition the job out of its initial state
    async fn start(&self, job_id: &str) -> Result<()>;

    /// Read the current raw status string; no sleeping, no retrying
    async fn poll_status(&self, job_id: &str) -> Result<String>;

    /// Download all result artifacts into `destination`, returning the
    /// number of files written
    async fn fetch_and_download(&self, job_id: &str, destination: &Path) -> Result<usize>;

    /// Fetch remote job diagnostics (log entries); best effort only
    async fn fetch_diagnostics(&self, job_id: &str) -> Result<serde_json::Value>;
}

/// HTTP client for openEO-shaped batch backends
///
/// Endpoints used:
/// - `POST /jobs` - submit a job definition
/// - `POST /jobs/{id}/results` - start the job
/// - `GET /jobs/{id}` - read status
/// - `GET /jobs/{id}/results` - list result assets, then one GET per href
/// - `GET /jobs/{id}/logs` - job diagnostics
#[derive(Debug, Clone)]
pub struct HttpBackendClient {
    /// Base URL of the backend (e.g., "https://backend.example.org/v1")
    base_url: String,
    /// Optional bearer token attached to every request
    token: Option<String>,
    /// HTTP client instance
    client: Client,
}

impl HttpBackendClient {
    /// Create a new backend client
    ///
    /// # Arguments
    /// * `base_url` - The base URL of the backend API
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token: None,
            client: Client::new(),
        }
    }

    /// Create a new backend client with a custom HTTP client
    ///
    /// This allows configuring timeouts, proxies, TLS settings, etc.
    pub fn with_client(base_url: impl Into<String>, client: Client) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token: None,
            client,
        }
    }

    /// Attach a bearer token to every request
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Get the base URL of the backend
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build a request with authentication applied
    pub(crate) fn request(&self, method: Method, url: &str) -> RequestBuilder {
        let builder = self.client.request(method, url);
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Deserialize a successful JSON response body
    pub(crate) async fn parse_json<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T> {
        response
            .json()
            .await
            .map_err(|e| BackendError::Protocol(format!("failed to parse JSON response: {e}")))
    }
}

/// Read the body of a failed response for error reporting
pub(crate) async fn error_body(response: reqwest::Response) -> String {
    response
        .text()
        .await
        .unwrap_or_else(|_| "unknown error".to_string())
}

/// Derive a backend display name from its URL (the host portion)
///
/// Falls back to the input when it does not parse as a URL.
pub fn backend_name(url: &str) -> String {
    reqwest::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.to_string()))
        .unwrap_or_else(|| url.trim_end_matches('/').to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = HttpBackendClient::new("https://backend.example.org/v1");
        assert_eq!(client.base_url(), "https://backend.example.org/v1");
    }

    #[test]
    fn test_client_trims_trailing_slash() {
        let client = HttpBackendClient::new("https://backend.example.org/v1/");
        assert_eq!(client.base_url(), "https://backend.example.org/v1");
    }

    #[test]
    fn test_backend_name_from_url() {
        assert_eq!(
            backend_name("https://openeo.dataspace.example.eu/openeo/1.2"),
            "openeo.dataspace.example.eu"
        );
    }

    #[test]
    fn test_backend_name_fallback() {
        assert_eq!(backend_name("not a url/"), "not a url");
    }
}
