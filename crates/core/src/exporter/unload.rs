//! Statement rendering for the warehouse-native unload sequence
//!
//! Every function here is pure string rendering; the exporter decides when
//! each statement runs. Path components are sanitized before they reach any
//! statement or object path.

use crate::sanitize::sanitize_path_component;

/// COPY output ceiling per file, matching the warehouse default the tool has
/// always used.
pub const MAX_FILE_SIZE_BYTES: u64 = 100_000_000;

/// Role with the privileges storage-integration DDL requires.
pub const DEFAULT_ROLE: &str = "ACCOUNTADMIN";

/// Destination prefix for one view: `gcs://<bucket>/<schema>/<view>/`.
pub fn view_gcs_path(bucket: &str, schema: &str, view: &str) -> String {
    format!(
        "gcs://{}/{}/{}/",
        bucket,
        sanitize_path_component(schema),
        sanitize_path_component(view)
    )
}

/// Load URI for one view's Parquet objects: `gs://<bucket>/<schema>/<view>/*.parquet`.
pub fn load_uri(bucket: &str, schema: &str, view: &str) -> String {
    format!(
        "gs://{}/{}/{}/*.parquet",
        bucket,
        sanitize_path_component(schema),
        sanitize_path_component(view)
    )
}

/// Object prefix within the bucket (no scheme), for listing written objects.
pub fn object_prefix(schema: &str, view: &str) -> String {
    format!(
        "{}/{}/",
        sanitize_path_component(schema),
        sanitize_path_component(view)
    )
}

/// Integration name unique per exported view.
pub fn integration_name(database: &str, schema: &str, view: &str) -> String {
    format!(
        "gcs_integration_{}_{}_{}",
        sanitize_path_component(database),
        sanitize_path_component(schema),
        sanitize_path_component(view)
    )
}

/// Query building the export select clause from `INFORMATION_SCHEMA.COLUMNS`.
///
/// Timestamp-typed columns are wrapped in `CONVERT_TIMEZONE('UTC', ..)` so
/// exported timestamps are UTC regardless of session or column timezone.
pub fn column_query(database: &str, schema: &str, view: &str) -> String {
    format!(
        "SELECT LISTAGG(\n\
         \x20   CASE\n\
         \x20       WHEN DATA_TYPE IN ('TIMESTAMP_TZ', 'TIMESTAMP_LTZ', 'TIMESTAMP_NTZ')\n\
         \x20            OR DATA_TYPE LIKE '%TIMESTAMP%'\n\
         \x20            OR DATA_TYPE LIKE '%DATETIME%'\n\
         \x20       THEN 'CONVERT_TIMEZONE(''UTC'', ' || COLUMN_NAME || ')::TIMESTAMP as ' || COLUMN_NAME\n\
         \x20       ELSE COLUMN_NAME\n\
         \x20   END,\n\
         \x20   ', '\n\
         ) WITHIN GROUP (ORDER BY ORDINAL_POSITION) as SELECT_CLAUSE\n\
         FROM {database}.INFORMATION_SCHEMA.COLUMNS\n\
         WHERE TABLE_SCHEMA = '{schema}'\n\
         \x20   AND TABLE_NAME = '{view}'"
    )
}

pub fn use_role_statement(role: &str) -> String {
    format!("USE ROLE {}", role)
}

/// `CREATE OR REPLACE STORAGE INTEGRATION` scoped to one destination prefix.
pub fn create_integration_statement(integration: &str, gcs_path: &str) -> String {
    format!(
        "CREATE OR REPLACE STORAGE INTEGRATION {integration}\n\
         \x20 TYPE = EXTERNAL_STAGE\n\
         \x20 STORAGE_PROVIDER = 'GCS'\n\
         \x20 ENABLED = TRUE\n\
         \x20 STORAGE_ALLOWED_LOCATIONS = ('{gcs_path}')"
    )
}

/// `COPY INTO` the destination prefix, Parquet with Snappy compression.
pub fn copy_statement(
    database: &str,
    schema: &str,
    view: &str,
    select_clause: &str,
    gcs_path: &str,
    integration: &str,
    max_file_size: u64,
) -> String {
    format!(
        "COPY INTO '{gcs_path}'\n\
         FROM (SELECT {select_clause}\n\
         FROM {database}.\"{schema}\".{view})\n\
         FILE_FORMAT = (TYPE = 'PARQUET', COMPRESSION = 'SNAPPY')\n\
         HEADER = TRUE\n\
         STORAGE_INTEGRATION = {integration}\n\
         OVERWRITE = TRUE\n\
         MAX_FILE_SIZE = {max_file_size}"
    )
}

pub fn drop_integration_statement(integration: &str) -> String {
    format!("DROP STORAGE INTEGRATION IF EXISTS {}", integration)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_view_gcs_path_sanitizes_components() {
        assert_eq!(
            view_gcs_path("acme-bucket", "PUBLIC", "Customer View"),
            "gcs://acme-bucket/public/customer_view/"
        );
    }

    #[test]
    fn test_load_uri_matches_export_path() {
        assert_eq!(
            load_uri("acme-bucket", "PUBLIC", "ORDERS"),
            "gs://acme-bucket/public/orders/*.parquet"
        );
    }

    #[test]
    fn test_object_prefix_has_no_scheme() {
        assert_eq!(object_prefix("PUBLIC", "ORDERS"), "public/orders/");
    }

    #[test]
    fn test_integration_name_is_sanitized_and_unique_per_view() {
        assert_eq!(
            integration_name("ANALYTICS", "PUBLIC", "Customer View"),
            "gcs_integration_analytics_public_customer_view"
        );
        assert_ne!(
            integration_name("ANALYTICS", "PUBLIC", "ORDERS"),
            integration_name("ANALYTICS", "PUBLIC", "CUSTOMERS")
        );
    }

    #[test]
    fn test_column_query_targets_information_schema() {
        let sql = column_query("ANALYTICS", "PUBLIC", "ORDERS");
        assert!(sql.contains("FROM ANALYTICS.INFORMATION_SCHEMA.COLUMNS"));
        assert!(sql.contains("WHERE TABLE_SCHEMA = 'PUBLIC'"));
        assert!(sql.contains("AND TABLE_NAME = 'ORDERS'"));
        assert!(sql.contains("WITHIN GROUP (ORDER BY ORDINAL_POSITION)"));
    }

    #[test]
    fn test_column_query_converts_timestamps_to_utc() {
        let sql = column_query("ANALYTICS", "PUBLIC", "ORDERS");
        assert!(sql.contains("'TIMESTAMP_TZ', 'TIMESTAMP_LTZ', 'TIMESTAMP_NTZ'"));
        assert!(sql.contains("CONVERT_TIMEZONE(''UTC'', "));
        assert!(sql.contains("::TIMESTAMP as "));
    }

    #[test]
    fn test_create_integration_statement() {
        let sql = create_integration_statement(
            "gcs_integration_analytics_public_orders",
            "gcs://acme-bucket/public/orders/",
        );
        assert!(sql.starts_with(
            "CREATE OR REPLACE STORAGE INTEGRATION gcs_integration_analytics_public_orders"
        ));
        assert!(sql.contains("TYPE = EXTERNAL_STAGE"));
        assert!(sql.contains("STORAGE_PROVIDER = 'GCS'"));
        assert!(sql.contains("ENABLED = TRUE"));
        assert!(sql.contains("STORAGE_ALLOWED_LOCATIONS = ('gcs://acme-bucket/public/orders/')"));
    }

    #[test]
    fn test_copy_statement() {
        let sql = copy_statement(
            "ANALYTICS",
            "PUBLIC",
            "ORDERS",
            "ID, CONVERT_TIMEZONE('UTC', CREATED_AT)::TIMESTAMP as CREATED_AT",
            "gcs://acme-bucket/public/orders/",
            "gcs_integration_analytics_public_orders",
            MAX_FILE_SIZE_BYTES,
        );
        assert!(sql.starts_with("COPY INTO 'gcs://acme-bucket/public/orders/'"));
        assert!(sql.contains("FROM (SELECT ID, CONVERT_TIMEZONE('UTC', CREATED_AT)::TIMESTAMP as CREATED_AT"));
        assert!(sql.contains("FROM ANALYTICS.\"PUBLIC\".ORDERS)"));
        assert!(sql.contains("FILE_FORMAT = (TYPE = 'PARQUET', COMPRESSION = 'SNAPPY')"));
        assert!(sql.contains("HEADER = TRUE"));
        assert!(sql.contains("STORAGE_INTEGRATION = gcs_integration_analytics_public_orders"));
        assert!(sql.contains("OVERWRITE = TRUE"));
        assert!(sql.contains("MAX_FILE_SIZE = 100000000"));
    }

    #[test]
    fn test_drop_statement_is_idempotent_sql() {
        assert_eq!(
            drop_integration_statement("gcs_integration_a_b_c"),
            "DROP STORAGE INTEGRATION IF EXISTS gcs_integration_a_b_c"
        );
    }

    #[test]
    fn test_use_role_statement() {
        assert_eq!(use_role_statement(DEFAULT_ROLE), "USE ROLE ACCOUNTADMIN");
    }
}
