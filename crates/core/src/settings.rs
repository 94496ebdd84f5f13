//! Environment-based pre-fill settings
//!
//! Every value is optional: the environment is a convenience for pre-filling
//! the form and CLI flags, never a correctness requirement.

use serde::Serialize;
use std::env;
use std::path::PathBuf;

/// Optional startup settings sourced from the environment.
#[derive(Clone, Default, Serialize)]
pub struct Settings {
    /// `SNOWFLAKE_USER`
    pub snowflake_user: Option<String>,
    /// `SNOWFLAKE_PASSWORD`
    pub snowflake_password: Option<String>,
    /// `SNOWFLAKE_ACCOUNT`
    pub snowflake_account: Option<String>,
    /// `SNOWFLAKE_WAREHOUSE`
    pub snowflake_warehouse: Option<String>,
    /// `GCP_PROJECT`
    pub gcp_project: Option<String>,
    /// `GCS_BUCKET`
    pub gcs_bucket: Option<String>,
    /// `GOOGLE_APPLICATION_CREDENTIALS` (service-account JSON path)
    pub google_credentials: Option<PathBuf>,
}

impl Settings {
    /// Read all known variables from the process environment.
    ///
    /// Empty and whitespace-only values count as unset.
    pub fn from_env() -> Self {
        Self {
            snowflake_user: env_non_empty("SNOWFLAKE_USER"),
            snowflake_password: env_non_empty("SNOWFLAKE_PASSWORD"),
            snowflake_account: env_non_empty("SNOWFLAKE_ACCOUNT"),
            snowflake_warehouse: env_non_empty("SNOWFLAKE_WAREHOUSE"),
            gcp_project: env_non_empty("GCP_PROJECT"),
            gcs_bucket: env_non_empty("GCS_BUCKET"),
            google_credentials: env_non_empty("GOOGLE_APPLICATION_CREDENTIALS").map(PathBuf::from),
        }
    }
}

// Debug output must never leak the password.
impl std::fmt::Debug for Settings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Settings")
            .field("snowflake_user", &self.snowflake_user)
            .field(
                "snowflake_password",
                &self.snowflake_password.as_ref().map(|_| "***"),
            )
            .field("snowflake_account", &self.snowflake_account)
            .field("snowflake_warehouse", &self.snowflake_warehouse)
            .field("gcp_project", &self.gcp_project)
            .field("gcs_bucket", &self.gcs_bucket)
            .field("google_credentials", &self.google_credentials)
            .finish()
    }
}

fn env_non_empty(name: &str) -> Option<String> {
    match env::var(name) {
        Ok(value) => {
            let trimmed = value.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        }
        Err(_) => None,
    }
}
