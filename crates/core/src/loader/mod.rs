//! Loading exported Parquet objects into BigQuery
//!
//! The destination dataset is `<database>_<schema>` (sanitized) in the
//! selected project; each view becomes one table, truncated and rewritten
//! on every run.

pub mod bigquery;
pub mod error;

pub use bigquery::BigQueryLoader;
pub use error::LoadError;

use async_trait::async_trait;

use crate::sanitize::sanitize_path_component;

/// Seam for the load stage; the pipeline only talks to this.
#[async_trait]
pub trait TableLoader: Send + Sync {
    /// Create the dataset if it does not exist yet.
    async fn ensure_dataset(&self, dataset: &str) -> Result<(), LoadError>;

    /// Load one table from the given source URI, replacing its contents.
    ///
    /// Returns the row count reported by the finished job, when present.
    async fn load_table(
        &self,
        dataset: &str,
        table: &str,
        source_uri: &str,
    ) -> Result<Option<u64>, LoadError>;
}

/// Dataset name for a database/schema pair.
pub fn dataset_name(database: &str, schema: &str) -> String {
    format!(
        "{}_{}",
        sanitize_path_component(database),
        sanitize_path_component(schema)
    )
}

/// Table name for a view.
pub fn table_name(view: &str) -> String {
    sanitize_path_component(view)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dataset_name_is_sanitized() {
        assert_eq!(dataset_name("ANALYTICS", "PUBLIC"), "analytics_public");
        assert_eq!(dataset_name("my-db", "Schema.v2"), "my_db_schema_v2");
    }

    #[test]
    fn test_table_name_is_sanitized() {
        assert_eq!(table_name("Daily Orders"), "daily_orders");
        assert_eq!(table_name("orders"), "orders");
    }
}
