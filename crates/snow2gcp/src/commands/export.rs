//! CLI command for the export run

use snow2gcp_core::progress::{format_bytes, format_number};
use snow2gcp_core::{
    BigQueryLoader, ExportPipeline, ExportTarget, GcsClient, GoogleAuth, RunSummary, Settings,
    SnowflakeSession,
};
use tracing::debug;

use crate::error::CliError;
use crate::progress::TerminalProgress;

/// Arguments for the `export` command
pub struct ExportArgs {
    /// Source database
    pub database: String,
    /// Source schema
    pub schema: String,
    /// Views to export; empty means resolve from `--all-views`
    pub views: Vec<String>,
    /// Export every view in the schema
    pub all_views: bool,
    /// Destination bucket, with or without a `gs://` prefix
    pub bucket: String,
    /// Google Cloud project for BigQuery
    pub project: Option<String>,
    /// Load the exported views into BigQuery afterwards
    pub bigquery: bool,
}

/// Handle the `export` command
pub async fn handle_export(
    session: &SnowflakeSession,
    settings: &Settings,
    args: &ExportArgs,
) -> Result<(), CliError> {
    let views = if args.all_views {
        let views = session.list_views(&args.database, &args.schema).await?;
        if views.is_empty() {
            return Err(CliError::NoViews {
                database: args.database.clone(),
                schema: args.schema.clone(),
            });
        }
        views
    } else if args.views.is_empty() {
        return Err(CliError::NothingSelected);
    } else {
        args.views.clone()
    };

    // Google credentials are a hard requirement for loading, a nice-to-have
    // for post-export verification.
    let auth = match GoogleAuth::resolve(settings.google_credentials.as_deref()).await {
        Ok(auth) => Some(auth),
        Err(err) if args.bigquery => return Err(err.into()),
        Err(err) => {
            debug!(error = %err, "Google credentials unavailable, verification disabled");
            None
        }
    };

    let verifier = auth.as_ref().and_then(|auth| match GcsClient::new(auth.clone()) {
        Ok(client) => Some(client),
        Err(err) => {
            debug!(error = %err, "object verification disabled");
            None
        }
    });

    let loader = match &auth {
        Some(auth) if args.bigquery => {
            let project = resolve_project(args.project.as_deref(), settings, auth).await?;
            println!("BigQuery project: {}", project);
            Some(BigQueryLoader::new(auth.clone(), project)?)
        }
        _ => None,
    };

    let progress = TerminalProgress::new();
    let target = ExportTarget::new(&args.database, &args.schema, views);
    let mut pipeline = ExportPipeline::new(session).with_progress(&progress);
    if let Some(loader) = &loader {
        pipeline = pipeline.with_loader(loader);
    }
    if let Some(verifier) = &verifier {
        pipeline = pipeline.with_verifier(verifier);
    }

    let summary = pipeline.run(&target, &args.bucket).await;
    print_summary(&summary);

    if !summary.is_success() {
        return Err(CliError::RunFailed {
            failed: summary.export_failed() + summary.load_failed(),
            total: summary.jobs.len(),
        });
    }
    Ok(())
}

/// Project to load into: flag, then environment, then the credential chain.
async fn resolve_project(
    explicit: Option<&str>,
    settings: &Settings,
    auth: &GoogleAuth,
) -> Result<String, CliError> {
    if let Some(project) = explicit {
        return Ok(project.to_string());
    }
    if let Some(project) = &settings.gcp_project {
        return Ok(project.clone());
    }
    Ok(auth.project_id().await?)
}

fn print_summary(summary: &RunSummary) {
    println!();
    println!("Export Summary");
    println!("==============");
    println!("Database:    {}", summary.database);
    println!("Schema:      {}", summary.schema);
    println!("Destination: gs://{}/", summary.bucket);
    if let Some(dataset) = &summary.dataset {
        println!("Dataset:     {}", dataset);
    }
    println!();

    for job in &summary.jobs {
        let marker = if job.state.is_failed() { "✗" } else { "✓" };
        let mut detail = job.state.name().to_string();
        if let Some(rows) = job.rows_unloaded {
            detail.push_str(&format!(", {} rows unloaded", format_number(rows)));
        }
        if let Some(rows) = job.rows_loaded {
            detail.push_str(&format!(", {} rows loaded", format_number(rows)));
        }
        if let (Some(objects), Some(bytes)) = (job.objects_written, job.bytes_written) {
            detail.push_str(&format!(", {} object(s), {}", objects, format_bytes(bytes)));
        }
        println!("  {} {}: {}", marker, job.view, detail);
    }

    let failed: Vec<_> = summary.failed_jobs().collect();
    if !failed.is_empty() {
        println!();
        println!("Failures ({}):", failed.len());
        for job in failed.iter().take(10) {
            println!(
                "  - {}: {}",
                job.view,
                job.error.as_deref().unwrap_or("unknown error")
            );
        }
        if failed.len() > 10 {
            println!("  ... and {} more", failed.len() - 10);
        }
    }

    let warnings: Vec<_> = summary
        .jobs
        .iter()
        .filter_map(|job| {
            job.cleanup_warning
                .as_deref()
                .map(|warning| (job.view.as_str(), warning))
        })
        .collect();
    if !warnings.is_empty() {
        println!();
        println!("Warnings:");
        for (view, warning) in warnings {
            println!("  ⚠ {}: {}", view, warning);
        }
    }

    println!();
    println!("Exported: {}/{}", summary.exported(), summary.jobs.len());
    if summary.load_enabled {
        println!("Loaded:   {}/{}", summary.loaded(), summary.jobs.len());
    }
    println!("Duration: {}", summary.duration_formatted());
}
