//! CLI error type

use snow2gcp_core::{ConnectionError, GcpError, LoadError};
use thiserror::Error;

/// Errors surfaced to the terminal. Vendor errors render through their
/// user-facing messages, hints included.
#[derive(Error, Debug)]
pub enum CliError {
    #[error("{}", .0.user_message())]
    Connection(#[from] ConnectionError),

    #[error("{}", .0.user_message())]
    Gcp(#[from] GcpError),

    #[error("{}", .0.user_message())]
    Load(#[from] LoadError),

    /// A required value is neither on the command line nor in the environment
    #[error("Missing {name}\n\nHint: Pass {flag} or set {env}.")]
    MissingArgument {
        name: &'static str,
        flag: &'static str,
        env: &'static str,
    },

    /// Nothing to export
    #[error("No views selected\n\nHint: Pass --view at least once, or --all-views.")]
    NothingSelected,

    /// `--all-views` found nothing to export
    #[error("No views found in {database}.{schema}")]
    NoViews { database: String, schema: String },

    /// The run finished, but not every view made it
    #[error("{failed} of {total} view(s) failed")]
    RunFailed { failed: usize, total: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_errors_render_with_hints() {
        let err = CliError::from(ConnectionError::MissingCredential("password"));
        let rendered = err.to_string();
        assert!(rendered.contains("password"));
        assert!(rendered.contains("Hint:"));
    }

    #[test]
    fn test_missing_argument_names_flag_and_env() {
        let err = CliError::MissingArgument {
            name: "destination bucket",
            flag: "--bucket",
            env: "GCS_BUCKET",
        };
        let rendered = err.to_string();
        assert!(rendered.contains("--bucket"));
        assert!(rendered.contains("GCS_BUCKET"));
    }
}
