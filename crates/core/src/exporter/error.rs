//! Error types for view exports

use thiserror::Error;

use crate::connector::ConnectionError;

/// Errors raised while exporting one view.
///
/// Always contained to the failing view: the exporter records the error on
/// that view's job and moves on.
#[derive(Error, Debug)]
pub enum ExportError {
    /// The column metadata query returned no usable select clause
    #[error("No columns found for {database}.{schema}.{view}")]
    NoColumns {
        database: String,
        schema: String,
        view: String,
    },

    /// A statement of the unload sequence failed in the warehouse
    #[error(transparent)]
    Warehouse(#[from] ConnectionError),
}

impl ExportError {
    /// Get a user-friendly error message for form/CLI output
    pub fn user_message(&self) -> String {
        match self {
            ExportError::NoColumns {
                database,
                schema,
                view,
            } => {
                format!(
                    "No columns found for {database}.{schema}.{view}\n\n\
                    Hint: Check that the view exists and the session role can read its metadata."
                )
            }
            ExportError::Warehouse(err) => err.user_message(),
        }
    }
}
