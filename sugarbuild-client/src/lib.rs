//! Sugarbuild HTTP Client
//!
//! A small client for the two remote resources a build touches:
//! - a peer dashboard serving database dumps (`<host>/data/<branch>_<flavor>`)
//! - the published package manifest used for the startup version check
//!
//! # Example
//!
//! ```no_run
//! use sugarbuild_client::SugarbuildClient;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), sugarbuild_client::ClientError> {
//!     let client = SugarbuildClient::new("http://builds.local:3000/build");
//!     let dump = client.fetch_dump("master", "ent").await?;
//!     println!("fetched {} bytes", dump.len());
//!     Ok(())
//! }
//! ```

pub mod error;
mod dumps;
mod manifest;

pub use dumps::NO_DATA_FILE_PREFIX;
pub use error::{ClientError, Result};

use reqwest::Client;
use serde::de::DeserializeOwned;

/// HTTP client for a Sugarbuild dump host
#[derive(Debug, Clone)]
pub struct SugarbuildClient {
    /// Base URL of the host (e.g., "http://builds.local:3000/build")
    base_url: String,
    /// HTTP client instance
    client: Client,
}

impl SugarbuildClient {
    /// Create a new client
    ///
    /// # Arguments
    /// * `base_url` - The base URL of the dump host
    ///
    /// # Example
    /// ```
    /// use sugarbuild_client::SugarbuildClient;
    ///
    /// let client = SugarbuildClient::new("http://localhost:3000/build");
    /// ```
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(base_url, Client::new())
    }

    /// Create a new client with a custom HTTP client
    ///
    /// This allows you to configure timeouts, proxies, TLS settings, etc.
    pub fn with_client(base_url: impl Into<String>, client: Client) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        }
    }

    /// Get the base URL of the host
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    // =============================================================================
    // Response Handlers
    // =============================================================================

    /// Handle a response and deserialize JSON
    async fn handle_response<T: DeserializeOwned>(&self, response: reqwest::Response) -> Result<T> {
        let status = response.status();

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ClientError::api_error(status.as_u16(), error_text));
        }

        response
            .json()
            .await
            .map_err(|e| ClientError::ParseError(format!("Failed to parse JSON response: {}", e)))
    }

    /// Handle a response with a plain-text body
    async fn handle_text_response(&self, response: reqwest::Response) -> Result<String> {
        let status = response.status();

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ClientError::api_error(status.as_u16(), error_text));
        }

        Ok(response.text().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = SugarbuildClient::new("http://localhost:3000/build");
        assert_eq!(client.base_url(), "http://localhost:3000/build");
    }

    #[test]
    fn test_client_trims_trailing_slash() {
        let client = SugarbuildClient::new("http://localhost:3000/build/");
        assert_eq!(client.base_url(), "http://localhost:3000/build");
    }

    #[test]
    fn test_client_with_custom_client() {
        let http_client = Client::new();
        let client = SugarbuildClient::with_client("http://localhost:3000", http_client);
        assert_eq!(client.base_url(), "http://localhost:3000");
    }
}
