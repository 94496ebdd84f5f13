//! Per-view Parquet unload into Google Cloud Storage
//!
//! Each view runs through a fixed statement sequence in the warehouse: fetch
//! the column list, create a GCS storage integration, `COPY INTO` the
//! destination prefix, drop the integration again. A failure stays contained
//! to the view it hit; the caller decides whether to keep going.

pub mod error;
pub mod unload;

pub use error::ExportError;

use tracing::{info, warn};

use crate::connector::{QueryResult, StatementExecutor};
use crate::job::ExportJob;
use crate::progress::{NullProgress, ProgressSink, format_number};
use crate::storage::ObjectLister;

/// Runs the unload sequence for single views.
///
/// Holds no per-view state: `export_view` can be called for any number of
/// views against the same session.
pub struct ViewExporter<'a> {
    executor: &'a dyn StatementExecutor,
    progress: &'a dyn ProgressSink,
    verifier: Option<&'a dyn ObjectLister>,
    role: String,
}

impl<'a> ViewExporter<'a> {
    pub fn new(executor: &'a dyn StatementExecutor) -> Self {
        Self {
            executor,
            progress: &NullProgress,
            verifier: None,
            role: unload::DEFAULT_ROLE.to_string(),
        }
    }

    /// Report steps and outcomes to the given sink.
    pub fn with_progress(mut self, progress: &'a dyn ProgressSink) -> Self {
        self.progress = progress;
        self
    }

    /// List the destination prefix after each successful copy and record
    /// object count and total bytes on the job.
    pub fn with_verifier(mut self, verifier: &'a dyn ObjectLister) -> Self {
        self.verifier = Some(verifier);
        self
    }

    /// Role to assume for the integration DDL.
    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = role.into();
        self
    }

    /// Export one view to `gcs://<bucket>/<schema>/<view>/`.
    ///
    /// Never returns an error: the outcome, including any vendor error text,
    /// is recorded on the returned job.
    pub async fn export_view(
        &self,
        database: &str,
        schema: &str,
        view: &str,
        bucket: &str,
    ) -> ExportJob {
        let gcs_path = unload::view_gcs_path(bucket, schema, view);
        let mut job = ExportJob::new(view, gcs_path.clone());
        job.start_export();

        self.progress.step(&format!("Fetching columns for {}", view));
        let select_clause = match self.fetch_select_clause(database, schema, view).await {
            Ok(clause) => clause,
            Err(err) => {
                self.progress.error(&format!("{}: {}", view, err));
                job.fail_export(err.to_string());
                return job;
            }
        };

        let integration = unload::integration_name(database, schema, view);
        self.progress
            .step(&format!("Creating storage integration {}", integration));
        if let Err(err) = self.create_integration(&integration, &gcs_path).await {
            self.progress.error(&format!("{}: {}", view, err));
            job.fail_export(err.to_string());
            return job;
        }

        // The integration exists from here on, so the drop below runs
        // whatever COPY does.
        self.progress.step(&format!("Copying {} to {}", view, gcs_path));
        let copied = self
            .copy_view(database, schema, view, &select_clause, &gcs_path, &integration)
            .await;

        self.progress
            .step(&format!("Dropping storage integration {}", integration));
        let dropped = self
            .executor
            .execute(&unload::drop_integration_statement(&integration))
            .await;

        if let Err(drop_err) = dropped {
            warn!(integration = %integration, error = %drop_err, "integration cleanup failed");
            job.cleanup_warning = Some(format!("could not drop {}: {}", integration, drop_err));
        }

        match copied {
            Ok(rows) => {
                job.complete_export(rows);
                self.verify(bucket, schema, view, &mut job).await;
                let rows_text = match job.rows_unloaded {
                    Some(rows) => format!("{} rows", format_number(rows)),
                    None => "row count unknown".to_string(),
                };
                self.progress
                    .success(&format!("Exported {} ({})", view, rows_text));
            }
            Err(copy_err) => {
                self.progress.error(&format!("{}: {}", view, copy_err));
                job.fail_export(copy_err.to_string());
            }
        }

        job
    }

    /// Column list as a ready select clause, timestamps normalized to UTC.
    async fn fetch_select_clause(
        &self,
        database: &str,
        schema: &str,
        view: &str,
    ) -> Result<String, ExportError> {
        let result = self
            .executor
            .execute(&unload::column_query(database, schema, view))
            .await?;
        match result.first_value() {
            Some(clause) if !clause.trim().is_empty() => Ok(clause.to_string()),
            _ => Err(ExportError::NoColumns {
                database: database.to_string(),
                schema: schema.to_string(),
                view: view.to_string(),
            }),
        }
    }

    /// Integration DDL needs an elevated role; switch before creating.
    async fn create_integration(
        &self,
        integration: &str,
        gcs_path: &str,
    ) -> Result<(), ExportError> {
        self.executor
            .execute(&unload::use_role_statement(&self.role))
            .await?;
        self.executor
            .execute(&unload::create_integration_statement(integration, gcs_path))
            .await?;
        Ok(())
    }

    async fn copy_view(
        &self,
        database: &str,
        schema: &str,
        view: &str,
        select_clause: &str,
        gcs_path: &str,
        integration: &str,
    ) -> Result<Option<u64>, ExportError> {
        let statement = unload::copy_statement(
            database,
            schema,
            view,
            select_clause,
            gcs_path,
            integration,
            unload::MAX_FILE_SIZE_BYTES,
        );
        let result = self.executor.execute(&statement).await?;
        Ok(rows_unloaded(&result))
    }

    /// Post-copy check against the bucket. Purely informational: a listing
    /// failure is logged and the job stays exported.
    async fn verify(&self, bucket: &str, schema: &str, view: &str, job: &mut ExportJob) {
        let Some(verifier) = self.verifier else {
            return;
        };
        let prefix = unload::object_prefix(schema, view);
        match verifier.list_prefix(bucket, &prefix).await {
            Ok(stats) => {
                info!(
                    view,
                    objects = stats.objects,
                    bytes = stats.total_bytes,
                    "verified exported objects"
                );
                job.objects_written = Some(stats.objects);
                job.bytes_written = Some(stats.total_bytes);
            }
            Err(err) => {
                warn!(view, error = %err, "object verification failed");
                self.progress
                    .info(&format!("Could not verify objects for {}: {}", view, err));
            }
        }
    }
}

/// `COPY INTO <location>` reports a single row with a `rows_unloaded` column.
fn rows_unloaded(result: &QueryResult) -> Option<u64> {
    result.get(0, "rows_unloaded")?.parse().ok()
}
