//! Progress reporting for scans
//!
//! The scanner only talks to [`ProgressSink`]; implementations own their
//! thread-safety since `increment` is called from every worker.

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

const BAR_TEMPLATE: &str =
    "{spinner:.green} [{elapsed_precise}] {wide_bar:.cyan/blue} {pos}/{len} keys ({per_sec}, eta {eta})";
const SPINNER_TEMPLATE: &str = "{spinner:.green} [{elapsed_precise}] {pos} keys ({per_sec})";

/// Receives scan progress.
pub trait ProgressSink: Send + Sync {
    /// Called once before any key is processed. `total` is 0 when unknown.
    fn start(&self, total: u64);
    /// One key processed.
    fn increment(&self);
    /// Called once after all workers have finished.
    fn stop(&self);
}

/// Discards all progress.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopProgress;

impl ProgressSink for NoopProgress {
    fn start(&self, _total: u64) {}
    fn increment(&self) {}
    fn stop(&self) {}
}

/// Terminal progress bar; falls back to a spinner when the total is unknown.
#[derive(Clone)]
pub struct BarProgress {
    bar: ProgressBar,
}

impl BarProgress {
    /// Draw on stderr.
    pub fn new() -> Self {
        Self::with_target(ProgressDrawTarget::stderr())
    }

    /// Track progress without drawing anything.
    pub fn hidden() -> Self {
        Self::with_target(ProgressDrawTarget::hidden())
    }

    fn with_target(target: ProgressDrawTarget) -> Self {
        Self {
            bar: ProgressBar::with_draw_target(None, target),
        }
    }

    pub fn position(&self) -> u64 {
        self.bar.position()
    }

    pub fn length(&self) -> Option<u64> {
        self.bar.length()
    }
}

impl Default for BarProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressSink for BarProgress {
    fn start(&self, total: u64) {
        if total > 0 {
            self.bar.set_length(total);
            self.bar.set_style(
                ProgressStyle::with_template(BAR_TEMPLATE)
                    .unwrap_or_else(|_| ProgressStyle::default_bar()),
            );
        } else {
            self.bar.set_style(
                ProgressStyle::with_template(SPINNER_TEMPLATE)
                    .unwrap_or_else(|_| ProgressStyle::default_spinner()),
            );
        }
        self.bar.set_position(0);
    }

    fn increment(&self) {
        self.bar.inc(1);
    }

    fn stop(&self) {
        self.bar.finish();
    }
}
