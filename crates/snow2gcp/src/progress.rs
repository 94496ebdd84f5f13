//! Progress reporting for export runs
//!
//! Renders the pipeline's progress seam as a single terminal bar using the
//! `indicatif` crate. Messages arriving while the bar is active are printed
//! above it.

use std::time::Duration;

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use snow2gcp_core::ProgressSink;

/// Terminal progress bar wired into an export run.
pub struct TerminalProgress {
    bar: ProgressBar,
}

impl TerminalProgress {
    pub fn new() -> Self {
        // Hidden until the pipeline announces its step budget.
        let bar = ProgressBar::hidden();
        bar.set_style(
            ProgressStyle::with_template(
                "{spinner:.green} [{elapsed_precise}] {bar:40.cyan/blue} {pos:>3}/{len:3} {msg}",
            )
            .unwrap()
            .progress_chars("█▓▒░  "),
        );
        Self { bar }
    }
}

impl Default for TerminalProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressSink for TerminalProgress {
    fn begin(&self, total_steps: u64) {
        self.bar.set_length(total_steps);
        self.bar.set_draw_target(ProgressDrawTarget::stderr());
        self.bar.enable_steady_tick(Duration::from_millis(100));
    }

    fn step(&self, message: &str) {
        self.bar.set_message(message.to_string());
        self.bar.inc(1);
    }

    fn info(&self, message: &str) {
        self.bar.println(message);
    }

    fn success(&self, message: &str) {
        self.bar.println(format!("  ✓ {}", message));
    }

    fn error(&self, message: &str) {
        self.bar.println(format!("  ✗ Error: {}", message));
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }
}
