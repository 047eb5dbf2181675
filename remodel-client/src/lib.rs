//! Remodel HTTP Client
//!
//! A typed HTTP client for the job backend that queues CAD modification
//! requests, brokers refinement, and stores artifacts.
//!
//! Both the worker and the CLI use this crate, so the wire contract is
//! defined in one place.
//!
//! # Example
//!
//! ```no_run
//! use remodel_client::BackendClient;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = BackendClient::new("http://localhost:8000");
//!
//!     for job in client.list_queued_jobs().await? {
//!         println!("{}: {}", job.id, job.command);
//!     }
//!     Ok(())
//! }
//! ```

mod artifacts;
pub mod error;
mod jobs;

// Re-export commonly used types
pub use error::{ClientError, Result};
pub use remodel_core::dto::job::RefinementStatus;

use reqwest::{Client, Url};
use serde::de::DeserializeOwned;

/// HTTP client for the job backend API
///
/// Methods are organized into two groups:
/// - Job lifecycle (list, analysis, refinement, status, logs)
/// - Artifacts (download input, upload result)
#[derive(Debug, Clone)]
pub struct BackendClient {
    /// Base URL of the backend (e.g., "http://localhost:8000")
    base_url: String,
    /// HTTP client instance
    client: Client,
}

impl BackendClient {
    /// Create a new backend client
    ///
    /// # Arguments
    /// * `base_url` - The base URL of the backend API (e.g., "http://localhost:8000")
    ///
    /// # Example
    /// ```
    /// use remodel_client::BackendClient;
    ///
    /// let client = BackendClient::new("http://localhost:8000");
    /// ```
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(base_url, Client::new())
    }

    /// Create a new backend client with a custom HTTP client
    ///
    /// This allows you to configure timeouts, proxies, TLS settings, etc.
    ///
    /// # Example
    /// ```
    /// use remodel_client::BackendClient;
    /// use reqwest::Client;
    /// use std::time::Duration;
    ///
    /// let http_client = Client::builder()
    ///     .timeout(Duration::from_secs(30))
    ///     .build()
    ///     .unwrap();
    ///
    /// let client = BackendClient::with_client("http://localhost:8000", http_client);
    /// ```
    pub fn with_client(base_url: impl Into<String>, client: Client) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        }
    }

    /// Get the base URL of the backend
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Builds a URL from path segments, percent-encoding each one
    fn url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| ClientError::InvalidRequest(format!("invalid base URL: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| ClientError::InvalidRequest("base URL cannot have a path".to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    // =============================================================================
    // Response Handlers
    // =============================================================================

    /// Handle an API response and deserialize JSON
    async fn handle_response<T: DeserializeOwned>(&self, response: reqwest::Response) -> Result<T> {
        let response = Self::check_status(response).await?;

        response
            .json()
            .await
            .map_err(|e| ClientError::ParseError(format!("Failed to parse JSON response: {}", e)))
    }

    /// Handle an API response that returns no content
    async fn handle_empty_response(&self, response: reqwest::Response) -> Result<()> {
        Self::check_status(response).await?;
        Ok(())
    }

    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ClientError::api_error(status.as_u16(), error_text));
        }

        Ok(response)
    }
}
