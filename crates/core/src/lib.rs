//! Snow2GCP Core - Shared library for exporting Snowflake views to Google Cloud
//!
//! Provides unified interfaces for:
//! - Warehouse sessions and metadata listings (connector)
//! - Per-view Parquet unloads through storage integrations (exporter)
//! - BigQuery dataset and table loading (loader)
//! - Post-export object verification (storage)
//! - Run orchestration, job records and progress reporting (pipeline, job, progress)

pub mod connector;
pub mod exporter;
pub mod gcp;
pub mod job;
pub mod loader;
pub mod pipeline;
pub mod progress;
pub mod sanitize;
pub mod settings;
pub mod storage;

// Re-export commonly used types
pub use connector::{
    ConnectionConfig, ConnectionError, QueryResult, SnowflakeSession, StatementExecutor,
};
pub use exporter::{ExportError, ViewExporter};
pub use gcp::{GcpError, GoogleAuth};
pub use job::{ExportJob, JobState, RunSummary};
pub use loader::{BigQueryLoader, LoadError, TableLoader};
pub use pipeline::{ExportPipeline, ExportTarget};
pub use progress::{NullProgress, ProgressSink};
pub use sanitize::{normalize_bucket_name, sanitize_path_component};
pub use settings::Settings;
pub use storage::{GcsClient, ObjectLister, PrefixStats, StorageError};
