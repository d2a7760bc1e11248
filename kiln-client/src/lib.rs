//! Kiln HTTP Client
//!
//! A small, type-safe client for a remote artifact store. The runner uses it
//! to publish the packaged binary when the store is remote rather than a
//! local directory.
//!
//! # Example
//!
//! ```no_run
//! use kiln_client::ArtifactStoreClient;
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = ArtifactStoreClient::new("http://localhost:8080");
//!
//!     let binary = Path::new("dist/Survey_Processor");
//!     let published = client
//!         .upload_artifact(uuid::Uuid::new_v4(), "Survey_Processor", binary)
//!         .await?;
//!
//!     println!("Published generation {}", published.generation);
//!     Ok(())
//! }
//! ```

mod artifacts;
pub mod error;

pub use error::{ClientError, Result};

use reqwest::Client;
use serde::de::DeserializeOwned;

/// HTTP client for an artifact store
#[derive(Debug, Clone)]
pub struct ArtifactStoreClient {
    /// Base URL of the store (e.g., "http://localhost:8080")
    base_url: String,
    /// HTTP client instance
    client: Client,
}

impl ArtifactStoreClient {
    /// Create a new artifact store client
    ///
    /// # Example
    /// ```
    /// use kiln_client::ArtifactStoreClient;
    ///
    /// let client = ArtifactStoreClient::new("http://localhost:8080");
    /// ```
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: Client::new(),
        }
    }

    /// Get the base URL of the store
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    // =============================================================================
    // Response Handlers
    // =============================================================================

    /// Check the status code and deserialize the JSON body
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
}
