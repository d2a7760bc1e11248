//! Error types for the artifact store client

use thiserror::Error;

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, ClientError>;

/// Errors that can occur when talking to an artifact store
#[derive(Debug, Error)]
pub enum ClientError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    /// Store returned an error status code
    #[error("API error (status {status}): {message}")]
    ApiError {
        /// HTTP status code
        status: u16,
        /// Error message from the store
        message: String,
    },

    /// Failed to parse response
    #[error("Failed to parse response: {0}")]
    ParseError(String),

    /// Reading the local file to upload failed
    #[error("Failed to read '{path}': {message}")]
    ReadError { path: String, message: String },
}

impl ClientError {
    /// Create an API error from status code and message
    pub fn api_error(status: u16, message: impl Into<String>) -> Self {
        Self::ApiError {
            status,
            message: message.into(),
        }
    }

    /// Check if this error is a client error (4xx status)
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::ApiError { status, .. } if *status >= 400 && *status < 500)
    }

    /// Check if this error is a server error (5xx status)
    pub fn is_server_error(&self) -> bool {
        matches!(self, Self::ApiError { status, .. } if *status >= 500)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        let rejected = ClientError::api_error(413, "payload too large");
        assert!(rejected.is_client_error());
        assert!(!rejected.is_server_error());

        let unavailable = ClientError::api_error(503, "maintenance");
        assert!(unavailable.is_server_error());
        assert!(!unavailable.is_client_error());

        let parse = ClientError::ParseError("bad json".to_string());
        assert!(!parse.is_client_error());
        assert!(!parse.is_server_error());
    }
}
