//! Per-view export job records and run summaries

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Lifecycle state of a single view's job.
///
/// `Exported`/`ExportFailed` are terminal when loading is disabled;
/// `Loaded`/`LoadFailed` are terminal when it is enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobState {
    Pending,
    Exporting,
    Exported,
    ExportFailed,
    Loading,
    Loaded,
    LoadFailed,
}

impl JobState {
    /// Human-readable state name
    pub fn name(&self) -> &'static str {
        match self {
            JobState::Pending => "pending",
            JobState::Exporting => "exporting",
            JobState::Exported => "exported",
            JobState::ExportFailed => "export failed",
            JobState::Loading => "loading",
            JobState::Loaded => "loaded",
            JobState::LoadFailed => "load failed",
        }
    }

    /// True once the view's COPY completed, whatever happened afterwards.
    pub fn export_succeeded(&self) -> bool {
        matches!(
            self,
            JobState::Exported | JobState::Loading | JobState::Loaded | JobState::LoadFailed
        )
    }

    /// True for states no further transition leaves.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobState::Exported | JobState::ExportFailed | JobState::Loaded | JobState::LoadFailed
        )
    }

    /// True for either failure state.
    pub fn is_failed(&self) -> bool {
        matches!(self, JobState::ExportFailed | JobState::LoadFailed)
    }
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Transient record for one view's export (and optional load).
///
/// Created when the run starts, rendered in the summary, never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct ExportJob {
    /// View name as selected by the user
    pub view: String,
    /// Destination prefix, e.g. `gcs://bucket/schema/view/`
    pub object_path: String,
    /// Current lifecycle state
    pub state: JobState,
    /// Error text, verbatim from the vendor, for whichever step failed
    pub error: Option<String>,
    /// Rows unloaded as reported by the COPY result
    pub rows_unloaded: Option<u64>,
    /// Rows loaded as reported by the completed load job
    pub rows_loaded: Option<u64>,
    /// Objects found under the destination prefix after export
    pub objects_written: Option<u64>,
    /// Total bytes found under the destination prefix after export
    pub bytes_written: Option<u64>,
    /// Non-fatal problem after a successful export (integration cleanup)
    pub cleanup_warning: Option<String>,
}

impl ExportJob {
    pub fn new(view: impl Into<String>, object_path: impl Into<String>) -> Self {
        Self {
            view: view.into(),
            object_path: object_path.into(),
            state: JobState::Pending,
            error: None,
            rows_unloaded: None,
            rows_loaded: None,
            objects_written: None,
            bytes_written: None,
            cleanup_warning: None,
        }
    }

    pub fn start_export(&mut self) {
        self.state = JobState::Exporting;
    }

    pub fn complete_export(&mut self, rows_unloaded: Option<u64>) {
        self.state = JobState::Exported;
        self.rows_unloaded = rows_unloaded;
    }

    pub fn fail_export(&mut self, error: impl Into<String>) {
        self.state = JobState::ExportFailed;
        self.error = Some(error.into());
    }

    pub fn start_load(&mut self) {
        self.state = JobState::Loading;
    }

    pub fn complete_load(&mut self, rows_loaded: Option<u64>) {
        self.state = JobState::Loaded;
        self.rows_loaded = rows_loaded;
    }

    pub fn fail_load(&mut self, error: impl Into<String>) {
        self.state = JobState::LoadFailed;
        self.error = Some(error.into());
    }
}

/// Outcome of one export run, rendered by both frontends.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub database: String,
    pub schema: String,
    pub bucket: String,
    pub load_enabled: bool,
    /// Destination dataset, set when loading was enabled
    pub dataset: Option<String>,
    pub jobs: Vec<ExportJob>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl RunSummary {
    /// Jobs whose export succeeded (loaded or not)
    pub fn exported(&self) -> usize {
        self.jobs.iter().filter(|j| j.state.export_succeeded()).count()
    }

    pub fn export_failed(&self) -> usize {
        self.jobs
            .iter()
            .filter(|j| j.state == JobState::ExportFailed)
            .count()
    }

    pub fn loaded(&self) -> usize {
        self.jobs.iter().filter(|j| j.state == JobState::Loaded).count()
    }

    pub fn load_failed(&self) -> usize {
        self.jobs
            .iter()
            .filter(|j| j.state == JobState::LoadFailed)
            .count()
    }

    /// True when every job reached its success state.
    pub fn is_success(&self) -> bool {
        self.jobs.iter().all(|j| !j.state.is_failed())
    }

    /// Failed views with their recorded errors, for the summary listing.
    pub fn failed_jobs(&self) -> impl Iterator<Item = &ExportJob> {
        self.jobs.iter().filter(|j| j.state.is_failed())
    }

    /// Formatted wall-clock duration of the run
    pub fn duration_formatted(&self) -> String {
        let secs = (self.finished_at - self.started_at).num_seconds().max(0) as u64;
        let mins = secs / 60;
        let remaining_secs = secs % 60;

        if mins > 0 {
            format!("{}m {}s", mins, remaining_secs)
        } else {
            format!("{}s", secs)
        }
    }
}
