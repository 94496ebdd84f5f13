//! Progress reporting for the browser page
//!
//! The pipeline pushes steps into a shared snapshot and the page polls
//! `/api/progress` to render a bar and a running log, mirroring what the
//! terminal progress bar shows on the CLI.

use std::sync::{Arc, Mutex, MutexGuard};

use serde::Serialize;
use snow2gcp_core::ProgressSink;

/// Keep the log from growing without bound on very large exports.
const MAX_LINES: usize = 200;

/// Point-in-time view of a run, serialized as-is for the page.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProgressSnapshot {
    pub running: bool,
    pub current: u64,
    pub total: u64,
    pub lines: Vec<String>,
}

/// Cloneable handle around the shared snapshot.
#[derive(Clone, Default)]
pub struct WebProgress {
    inner: Arc<Mutex<ProgressSnapshot>>,
}

impl WebProgress {
    pub fn snapshot(&self) -> ProgressSnapshot {
        self.lock().clone()
    }

    fn lock(&self) -> MutexGuard<'_, ProgressSnapshot> {
        // A poisoned lock only means some thread panicked while holding it;
        // the snapshot itself is still usable.
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl ProgressSink for WebProgress {
    fn begin(&self, total_steps: u64) {
        let mut snapshot = self.lock();
        snapshot.running = true;
        snapshot.current = 0;
        snapshot.total = total_steps;
        snapshot.lines.clear();
        snapshot.lines.push("🚀 Starting export...".to_string());
    }

    fn step(&self, message: &str) {
        let mut snapshot = self.lock();
        snapshot.current += 1;
        let line = format!("⏳ Step {}/{}: {}", snapshot.current, snapshot.total, message);
        push_line(&mut snapshot.lines, line);
    }

    fn info(&self, message: &str) {
        push_line(&mut self.lock().lines, format!("ℹ️ {message}"));
    }

    fn success(&self, message: &str) {
        push_line(&mut self.lock().lines, format!("✅ {message}"));
    }

    fn error(&self, message: &str) {
        push_line(&mut self.lock().lines, format!("❌ {message}"));
    }

    fn finish(&self) {
        let mut snapshot = self.lock();
        snapshot.current = snapshot.total;
        snapshot.running = false;
        push_line(&mut snapshot.lines, "🎉 Export finished".to_string());
    }
}

fn push_line(lines: &mut Vec<String>, line: String) {
    lines.push(line);
    if lines.len() > MAX_LINES {
        let excess = lines.len() - MAX_LINES;
        lines.drain(..excess);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_begin_resets_previous_run() {
        let progress = WebProgress::default();
        progress.begin(4);
        progress.step("first");
        progress.finish();

        progress.begin(8);
        let snapshot = progress.snapshot();
        assert!(snapshot.running);
        assert_eq!(snapshot.current, 0);
        assert_eq!(snapshot.total, 8);
        assert_eq!(snapshot.lines, vec!["🚀 Starting export...".to_string()]);
    }

    #[test]
    fn test_steps_are_numbered() {
        let progress = WebProgress::default();
        progress.begin(2);
        progress.step("Querying columns for ORDERS");
        progress.step("Copying ORDERS to gcs://bucket/");

        let snapshot = progress.snapshot();
        assert_eq!(snapshot.current, 2);
        assert_eq!(
            snapshot.lines[1],
            "⏳ Step 1/2: Querying columns for ORDERS"
        );
        assert_eq!(
            snapshot.lines[2],
            "⏳ Step 2/2: Copying ORDERS to gcs://bucket/"
        );
    }

    #[test]
    fn test_finish_stops_the_run() {
        let progress = WebProgress::default();
        progress.begin(1);
        progress.step("only step");
        progress.finish();

        let snapshot = progress.snapshot();
        assert!(!snapshot.running);
        assert_eq!(snapshot.current, snapshot.total);
        assert_eq!(snapshot.lines.last().unwrap(), "🎉 Export finished");
    }

    #[test]
    fn test_log_is_capped() {
        let progress = WebProgress::default();
        progress.begin(1);
        for i in 0..300 {
            progress.info(&format!("line {i}"));
        }

        let snapshot = progress.snapshot();
        assert_eq!(snapshot.lines.len(), MAX_LINES);
        assert_eq!(snapshot.lines.last().unwrap(), "ℹ️ line 299");
    }
}
