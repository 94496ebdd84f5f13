//! Error types for BigQuery loads

use thiserror::Error;

use crate::gcp::GcpError;

/// Errors raised while managing datasets or running load jobs.
///
/// A failed load is contained to its table: the pipeline records the error
/// on that view's job and keeps loading the rest.
#[derive(Error, Debug)]
pub enum LoadError {
    /// Credential resolution or token exchange failed
    #[error(transparent)]
    Credentials(#[from] GcpError),

    /// The API rejected a request
    #[error("BigQuery API error: HTTP {status}: {message}")]
    Api { status: u16, message: String },

    /// The load job finished with an error; message verbatim from the job
    #[error("Load job failed: {message}")]
    JobFailed {
        reason: Option<String>,
        message: String,
    },

    /// Request timed out
    #[error("Request to BigQuery timed out")]
    Timeout,

    /// Could not reach the BigQuery endpoint
    #[error("Cannot reach BigQuery: {0}")]
    Unreachable(String),

    /// Response did not match the expected wire shape
    #[error("Unexpected response from BigQuery: {0}")]
    Protocol(String),

    /// Transport-level failure not classified above
    #[error("HTTP error: {0}")]
    Http(String),
}

impl LoadError {
    /// Classify a transport error the way the vendor clients do.
    pub(crate) fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            LoadError::Timeout
        } else if err.is_connect() {
            LoadError::Unreachable(err.to_string())
        } else {
            LoadError::Http(err.to_string())
        }
    }

    /// Get a user-friendly error message for form/CLI output
    pub fn user_message(&self) -> String {
        match self {
            LoadError::Credentials(err) => err.user_message(),
            LoadError::Api { status: 403, message } => {
                format!(
                    "BigQuery API error: HTTP 403: {message}\n\n\
                    Hint: The credentials need the BigQuery Job User and Data Editor \
                    roles on the target project."
                )
            }
            _ => self.to_string(),
        }
    }
}
