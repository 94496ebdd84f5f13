//! Error types for object storage access

use thiserror::Error;

use crate::gcp::GcpError;

/// Errors raised while listing exported objects.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Credential resolution or token exchange failed
    #[error(transparent)]
    Credentials(#[from] GcpError),

    /// The API rejected the listing request
    #[error("Object listing failed: HTTP {status}: {message}")]
    Api { status: u16, message: String },

    /// Request timed out
    #[error("Request to object storage timed out")]
    Timeout,

    /// Could not reach the storage endpoint
    #[error("Cannot reach object storage: {0}")]
    Unreachable(String),

    /// Response did not match the expected wire shape
    #[error("Unexpected response from object storage: {0}")]
    Protocol(String),

    /// Transport-level failure not classified above
    #[error("HTTP error: {0}")]
    Http(String),
}

impl StorageError {
    /// Classify a transport error the way the vendor clients do.
    pub(crate) fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            StorageError::Timeout
        } else if err.is_connect() {
            StorageError::Unreachable(err.to_string())
        } else {
            StorageError::Http(err.to_string())
        }
    }
}
