//! API error responses
//!
//! Every failure leaves the server as `{"error": "..."}` JSON with a
//! matching status code. Vendor errors go through their `user_message()` so
//! the page shows the same hints the CLI prints.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use snow2gcp_core::{ConnectionError, GcpError, LoadError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    /// The page called a session endpoint before `/api/connect`
    #[error("Not connected to Snowflake")]
    NotConnected,

    /// Another export is still running
    #[error("An export is already running")]
    ExportRunning,

    /// The request itself is unusable
    #[error("{0}")]
    BadRequest(String),

    #[error("{}", .0.user_message())]
    Connection(#[from] ConnectionError),

    #[error("{}", .0.user_message())]
    Gcp(#[from] GcpError),

    #[error("{}", .0.user_message())]
    Load(#[from] LoadError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::NotConnected | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::ExportRunning => StatusCode::CONFLICT,
            ApiError::Connection(ConnectionError::AuthenticationFailed { .. }) => {
                StatusCode::UNAUTHORIZED
            }
            ApiError::Connection(
                ConnectionError::InvalidAccount(_) | ConnectionError::MissingCredential(_),
            ) => StatusCode::BAD_REQUEST,
            ApiError::Connection(_) => StatusCode::BAD_GATEWAY,
            ApiError::Gcp(_) => StatusCode::BAD_REQUEST,
            ApiError::Load(_) => StatusCode::BAD_GATEWAY,
        };

        let message = self.to_string();
        let body = serde_json::json!({ "error": message });
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            ApiError::NotConnected.into_response().status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::ExportRunning.into_response().status(),
            StatusCode::CONFLICT
        );
        let auth = ApiError::Connection(ConnectionError::AuthenticationFailed {
            message: "Incorrect username or password was specified.".to_string(),
            code: Some("390100".to_string()),
        });
        assert_eq!(auth.into_response().status(), StatusCode::UNAUTHORIZED);
        let unreachable =
            ApiError::Connection(ConnectionError::Unreachable("dns failure".to_string()));
        assert_eq!(unreachable.into_response().status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_vendor_errors_keep_their_hints() {
        let err = ApiError::Connection(ConnectionError::AuthenticationFailed {
            message: "Incorrect username or password was specified.".to_string(),
            code: None,
        });
        assert!(err.to_string().contains("Hint:"));
    }
}
