//! Progress reporting seam for export runs
//!
//! The pipeline drives a [`ProgressSink`]; frontends decide how to render it
//! (indicatif in the CLI, a poll-able state in the web UI). Reporting is
//! purely observational: nothing in the run depends on it.

/// Observer for a running export.
///
/// `step` advances a monotonic counter toward the total announced by `begin`.
pub trait ProgressSink: Send + Sync {
    /// Announce the total step count for the run.
    fn begin(&self, total_steps: u64);
    /// Advance the counter by one, with a short status message.
    fn step(&self, message: &str);
    /// Informational message, no counter movement.
    fn info(&self, message: &str);
    /// A unit of work finished well.
    fn success(&self, message: &str);
    /// A unit of work failed (the run continues).
    fn error(&self, message: &str);
    /// The run is over.
    fn finish(&self);
}

/// Sink that discards everything.
pub struct NullProgress;

impl ProgressSink for NullProgress {
    fn begin(&self, _total_steps: u64) {}
    fn step(&self, _message: &str) {}
    fn info(&self, _message: &str) {}
    fn success(&self, _message: &str) {}
    fn error(&self, _message: &str) {}
    fn finish(&self) {}
}

/// Step budget for a run: four per view for the export sequence
/// (columns, integration, copy, cleanup), plus one per view and one
/// dataset step when loading is enabled.
pub fn total_steps(view_count: usize, load_enabled: bool) -> u64 {
    let views = view_count as u64;
    let mut total = views * 4;
    if load_enabled {
        total += views + 1;
    }
    total
}

/// Format a count with thousand separators for summary output.
pub fn format_number(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    let offset = digits.len() % 3;
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (i + 3 - offset) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// Format a byte count as a human-readable string.
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["KB", "MB", "GB", "TB"];
    if bytes < 1024 {
        return format!("{} B", bytes);
    }
    let mut value = bytes as f64;
    let mut unit = "B";
    for next in UNITS {
        if value < 1024.0 {
            break;
        }
        value /= 1024.0;
        unit = next;
    }
    format!("{:.2} {}", value, unit)
}
