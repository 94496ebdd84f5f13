//! Error types for warehouse sessions

use thiserror::Error;

/// Errors raised while opening or using a warehouse session.
///
/// Connection-level failures are fatal to the session and surfaced to the
/// form verbatim; statement failures carry the warehouse's own code and
/// message so callers can record them against the failing unit of work.
#[derive(Error, Debug)]
pub enum ConnectionError {
    /// Account identifier failed local validation
    #[error("Invalid account identifier: {0}")]
    InvalidAccount(String),

    /// A required credential field is empty
    #[error("Missing credential: {0}")]
    MissingCredential(&'static str),

    /// The warehouse rejected the login
    #[error("Authentication failed: {message}")]
    AuthenticationFailed {
        code: Option<String>,
        message: String,
    },

    /// Request timed out
    #[error("Request to the warehouse timed out")]
    Timeout,

    /// Could not reach the warehouse host
    #[error("Cannot reach the warehouse: {0}")]
    Unreachable(String),

    /// The warehouse reported a statement failure
    #[error("Statement failed{}: {message}", code.as_ref().map(|c| format!(" ({})", c)).unwrap_or_default())]
    Statement {
        code: Option<String>,
        message: String,
    },

    /// Response did not match the expected wire shape
    #[error("Unexpected response from the warehouse: {0}")]
    Protocol(String),

    /// Transport-level failure not classified above
    #[error("HTTP error: {0}")]
    Http(String),
}

impl ConnectionError {
    /// Classify a transport error the way the vendor clients do.
    pub(crate) fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ConnectionError::Timeout
        } else if err.is_connect() {
            ConnectionError::Unreachable(err.to_string())
        } else {
            ConnectionError::Http(err.to_string())
        }
    }

    /// Get a user-friendly error message for form/CLI output
    pub fn user_message(&self) -> String {
        match self {
            ConnectionError::InvalidAccount(detail) => {
                format!(
                    "Invalid account identifier: {detail}\n\n\
                    Hint: Use the bare identifier (e.g. 'xy12345.eu-west-1') or the full \
                    '<account>.snowflakecomputing.com' host."
                )
            }
            ConnectionError::MissingCredential(field) => {
                format!("Missing credential: {field}\n\nHint: Fill in every connection field.")
            }
            ConnectionError::AuthenticationFailed { message, .. } => {
                format!(
                    "Authentication failed: {message}\n\n\
                    Hint: Check the user name, password and account identifier."
                )
            }
            ConnectionError::Unreachable(detail) => {
                format!(
                    "Cannot reach the warehouse: {detail}\n\n\
                    Hint: Check the account identifier and your network connectivity."
                )
            }
            _ => self.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_statement_error_includes_code() {
        let err = ConnectionError::Statement {
            code: Some("002003".to_string()),
            message: "SQL compilation error".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Statement failed (002003): SQL compilation error"
        );

        let err = ConnectionError::Statement {
            code: None,
            message: "boom".to_string(),
        };
        assert_eq!(err.to_string(), "Statement failed: boom");
    }

    #[test]
    fn test_user_message_has_hint_for_auth_failure() {
        let err = ConnectionError::AuthenticationFailed {
            code: Some("390100".to_string()),
            message: "Incorrect username or password was specified.".to_string(),
        };
        let message = err.user_message();
        assert!(message.contains("Incorrect username or password"));
        assert!(message.contains("Hint:"));
    }
}
