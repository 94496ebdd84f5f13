//! Export run orchestration
//!
//! Drives a full run: every selected view through the exporter, then the
//! optional BigQuery load stage, collecting one job record per view into a
//! [`RunSummary`]. A view failure never stops the run; it is recorded on
//! that view's job and the rest keep going.

use chrono::Utc;
use tracing::{Instrument, info, info_span, warn};

use crate::connector::StatementExecutor;
use crate::exporter::{ViewExporter, unload};
use crate::job::{ExportJob, RunSummary};
use crate::loader::{self, TableLoader};
use crate::progress::{NullProgress, ProgressSink, format_number, total_steps};
use crate::sanitize::normalize_bucket_name;
use crate::storage::ObjectLister;

/// User selection driving one run.
#[derive(Debug, Clone)]
pub struct ExportTarget {
    pub database: String,
    pub schema: String,
    /// Views in the order they were selected
    pub views: Vec<String>,
}

impl ExportTarget {
    pub fn new(
        database: impl Into<String>,
        schema: impl Into<String>,
        views: Vec<String>,
    ) -> Self {
        Self {
            database: database.into(),
            schema: schema.into(),
            views,
        }
    }
}

/// One run over the configured seams.
///
/// Loading happens exactly when a loader is attached; verification exactly
/// when a lister is.
pub struct ExportPipeline<'a> {
    executor: &'a dyn StatementExecutor,
    loader: Option<&'a dyn TableLoader>,
    verifier: Option<&'a dyn ObjectLister>,
    progress: &'a dyn ProgressSink,
    role: String,
}

impl<'a> ExportPipeline<'a> {
    pub fn new(executor: &'a dyn StatementExecutor) -> Self {
        Self {
            executor,
            loader: None,
            verifier: None,
            progress: &NullProgress,
            role: unload::DEFAULT_ROLE.to_string(),
        }
    }

    /// Load every exported view into BigQuery after the export stage.
    pub fn with_loader(mut self, loader: &'a dyn TableLoader) -> Self {
        self.loader = Some(loader);
        self
    }

    /// Verify exported objects by listing the destination prefix.
    pub fn with_verifier(mut self, verifier: &'a dyn ObjectLister) -> Self {
        self.verifier = Some(verifier);
        self
    }

    pub fn with_progress(mut self, progress: &'a dyn ProgressSink) -> Self {
        self.progress = progress;
        self
    }

    /// Role to assume for the integration DDL.
    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = role.into();
        self
    }

    /// Run the export (and optional load) for every selected view.
    ///
    /// Infallible by construction: per-view outcomes live on the job
    /// records, and an empty selection yields an empty summary.
    pub async fn run(&self, target: &ExportTarget, bucket: &str) -> RunSummary {
        let bucket = normalize_bucket_name(bucket);
        let span = info_span!(
            "export_run",
            database = %target.database,
            schema = %target.schema,
            views = target.views.len(),
        );
        self.run_inner(target, &bucket).instrument(span).await
    }

    async fn run_inner(&self, target: &ExportTarget, bucket: &str) -> RunSummary {
        let started_at = Utc::now();
        let load_enabled = self.loader.is_some();

        self.progress
            .begin(total_steps(target.views.len(), load_enabled));
        self.progress.info(&format!(
            "Exporting {} view(s) from {}.{} to gcs://{}/",
            target.views.len(),
            target.database,
            target.schema,
            bucket
        ));

        let mut jobs = self.export_stage(target, bucket).await;

        let mut dataset = None;
        if let Some(loader) = self.loader {
            if !jobs.is_empty() {
                let name = loader::dataset_name(&target.database, &target.schema);
                self.load_stage(loader, &name, &target.schema, bucket, &mut jobs)
                    .instrument(info_span!("load_stage", dataset = %name))
                    .await;
                dataset = Some(name);
            }
        }

        self.progress.finish();

        let summary = RunSummary {
            database: target.database.clone(),
            schema: target.schema.clone(),
            bucket: bucket.to_string(),
            load_enabled,
            dataset,
            jobs,
            started_at,
            finished_at: Utc::now(),
        };
        info!(
            exported = summary.exported(),
            export_failed = summary.export_failed(),
            loaded = summary.loaded(),
            load_failed = summary.load_failed(),
            "run finished"
        );
        summary
    }

    async fn export_stage(&self, target: &ExportTarget, bucket: &str) -> Vec<ExportJob> {
        let mut exporter = ViewExporter::new(self.executor)
            .with_progress(self.progress)
            .with_role(self.role.clone());
        if let Some(verifier) = self.verifier {
            exporter = exporter.with_verifier(verifier);
        }

        let mut jobs = Vec::with_capacity(target.views.len());
        for view in &target.views {
            self.progress.info(&format!("Processing view: {}", view));
            let job = exporter
                .export_view(&target.database, &target.schema, view, bucket)
                .instrument(info_span!("export_view", view = %view))
                .await;
            jobs.push(job);
        }
        jobs
    }

    async fn load_stage(
        &self,
        loader: &dyn TableLoader,
        dataset: &str,
        schema: &str,
        bucket: &str,
        jobs: &mut [ExportJob],
    ) {
        self.progress
            .step(&format!("Creating dataset {} if needed", dataset));
        if let Err(err) = loader.ensure_dataset(dataset).await {
            // Without the dataset no table can load; fail them all.
            warn!(dataset, error = %err, "dataset setup failed");
            self.progress.error(&format!("Dataset {}: {}", dataset, err));
            for job in jobs.iter_mut().filter(|j| j.state.export_succeeded()) {
                job.start_load();
                job.fail_load(err.to_string());
            }
            return;
        }

        for job in jobs.iter_mut() {
            if !job.state.export_succeeded() {
                self.progress
                    .step(&format!("Skipping {} (export failed)", job.view));
                continue;
            }

            let table = loader::table_name(&job.view);
            let uri = unload::load_uri(bucket, schema, &job.view);
            self.progress
                .step(&format!("Loading {} into {}.{}", job.view, dataset, table));
            job.start_load();
            match loader.load_table(dataset, &table, &uri).await {
                Ok(rows) => {
                    job.complete_load(rows);
                    let rows_text = match rows {
                        Some(rows) => format!("{} rows", format_number(rows)),
                        None => "row count unknown".to_string(),
                    };
                    self.progress
                        .success(&format!("Loaded {}.{} ({})", dataset, table, rows_text));
                }
                Err(err) => {
                    warn!(view = %job.view, error = %err, "table load failed");
                    self.progress.error(&format!("{}: {}", job.view, err));
                    job.fail_load(err.to_string());
                }
            }
        }
    }
}
