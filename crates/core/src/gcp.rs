//! Google Cloud credential resolution
//!
//! One [`GoogleAuth`] instance backs both the GCS listing client and the
//! BigQuery loader. An explicit service-account key file wins; otherwise the
//! usual discovery chain runs (`GOOGLE_APPLICATION_CREDENTIALS`, gcloud
//! user credentials, metadata server).

use std::path::Path;
use std::sync::Arc;

use gcp_auth::{CustomServiceAccount, TokenProvider};
use thiserror::Error;
use tracing::debug;

/// OAuth scope for reading bucket listings.
pub const STORAGE_READ_SCOPE: &str = "https://www.googleapis.com/auth/devstorage.read_only";

/// OAuth scope for dataset and load-job management.
pub const BIGQUERY_SCOPE: &str = "https://www.googleapis.com/auth/bigquery";

/// Errors raised while resolving Google credentials or tokens.
#[derive(Error, Debug)]
pub enum GcpError {
    /// No usable credential source was found, or the token exchange failed
    #[error("Google credential error: {0}")]
    Credentials(#[from] gcp_auth::Error),

    /// The credential chain carries no project id and none was given
    #[error("No Google Cloud project id available: {0}")]
    NoProject(String),
}

impl GcpError {
    /// Get a user-friendly error message for form/CLI output
    pub fn user_message(&self) -> String {
        match self {
            GcpError::Credentials(err) => {
                format!(
                    "Google credential error: {err}\n\n\
                    Hint: Point GOOGLE_APPLICATION_CREDENTIALS at a service-account key \
                    file, or run 'gcloud auth application-default login'."
                )
            }
            GcpError::NoProject(detail) => {
                format!(
                    "No Google Cloud project id available: {detail}\n\n\
                    Hint: Pass the project explicitly or set GCP_PROJECT."
                )
            }
        }
    }
}

/// Shared token source for the Google REST clients.
#[derive(Clone)]
pub struct GoogleAuth {
    provider: Arc<dyn TokenProvider>,
}

impl GoogleAuth {
    /// Resolve credentials, preferring an explicit key file over discovery.
    pub async fn resolve(credentials_file: Option<&Path>) -> Result<Self, GcpError> {
        match credentials_file {
            Some(path) => Self::from_key_file(path),
            None => Self::discover().await,
        }
    }

    /// Load a service-account key file.
    pub fn from_key_file(path: &Path) -> Result<Self, GcpError> {
        debug!(path = %path.display(), "loading service-account key file");
        let account = CustomServiceAccount::from_file(path)?;
        Ok(Self {
            provider: Arc::new(account),
        })
    }

    /// Run the standard discovery chain.
    pub async fn discover() -> Result<Self, GcpError> {
        let provider = gcp_auth::provider().await?;
        Ok(Self { provider })
    }

    /// Fresh bearer token for the given scopes.
    pub async fn token(&self, scopes: &[&str]) -> Result<String, GcpError> {
        let token = self.provider.token(scopes).await?;
        Ok(token.as_str().to_string())
    }

    /// Project id carried by the resolved credentials.
    pub async fn project_id(&self) -> Result<String, GcpError> {
        match self.provider.project_id().await {
            Ok(project) => Ok(project.to_string()),
            Err(err) => Err(GcpError::NoProject(err.to_string())),
        }
    }
}

// The provider holds key material; show only the type.
impl std::fmt::Debug for GoogleAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleAuth").finish_non_exhaustive()
    }
}
