use avsift_core::ProgressReporter;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

const TICK_CHARS: &str = "⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏";

/// CLI progress reporter using indicatif.
///
/// - Scan phase: spinner (file count unknown upfront)
/// - Reconcile phase: progress bar over identifier groups
pub struct CliReporter {
    bar: Mutex<Option<ProgressBar>>,
}

impl CliReporter {
    pub fn new() -> Self {
        Self {
            bar: Mutex::new(None),
        }
    }

    fn set_bar(&self, pb: ProgressBar) {
        let mut guard = self.bar.lock().unwrap();
        if let Some(old) = guard.take() {
            old.finish_and_clear();
        }
        *guard = Some(pb);
    }

    fn finish_bar(&self) {
        let mut guard = self.bar.lock().unwrap();
        if let Some(pb) = guard.take() {
            pb.finish_and_clear();
        }
    }

    fn with_bar(&self, f: impl FnOnce(&ProgressBar)) {
        let guard = self.bar.lock().unwrap();
        if let Some(pb) = guard.as_ref() {
            f(pb);
        }
    }
}

impl ProgressReporter for CliReporter {
    fn on_scan_start(&self, root: &Path) {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap()
                .tick_chars(TICK_CHARS),
        );
        pb.set_message(format!("Scanning {}...", root.display()));
        pb.enable_steady_tick(Duration::from_millis(80));
        self.set_bar(pb);
    }

    fn on_scan_progress(&self, files_found: usize, _current_path: &str) {
        self.with_bar(|pb| pb.set_message(format!("Scanning... {} files found", files_found)));
    }

    fn on_scan_complete(&self, total_files: usize, duration_secs: f64) {
        self.finish_bar();
        eprintln!(
            "  \x1b[32m✓\x1b[0m Scan complete: {} files in {:.2}s",
            total_files, duration_secs
        );
    }

    fn on_reconcile_start(&self, groups: usize) {
        let pb = ProgressBar::new(groups as u64);
        pb.set_style(
            ProgressStyle::with_template(
                "  {spinner:.cyan} Reconciling [{bar:30.cyan/dim}] {pos}/{len} identifiers",
            )
            .unwrap()
            .progress_chars("━╸─")
            .tick_chars(TICK_CHARS),
        );
        pb.enable_steady_tick(Duration::from_millis(80));
        self.set_bar(pb);
    }

    fn on_reconcile_progress(&self, groups_done: usize, _total_groups: usize) {
        self.with_bar(|pb| pb.set_position(groups_done as u64));
    }

    fn on_reconcile_complete(&self, titles: usize, conflicts: usize, duration_secs: f64) {
        self.finish_bar();
        if conflicts == 0 {
            eprintln!(
                "  \x1b[32m✓\x1b[0m Reconcile complete: {} titles in {:.2}s",
                titles, duration_secs
            );
        } else {
            eprintln!(
                "  \x1b[33m!\x1b[0m Reconcile complete: {} titles, {} conflicts in {:.2}s",
                titles, conflicts, duration_secs
            );
        }
    }
}
