//! Progress reporting for import runs
//!
//! Observers are purely informational: the importer never waits on them
//! and their return values are ignored.

use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;
use tracing::{info, warn};

use crate::importer::ImportStats;
use crate::writer::FlushReport;

/// Receives progress notifications from a running import
pub trait ImportObserver: Send {
    /// An element closed; `accepted` counts nodes kept so far
    fn node_closed(&mut self, _accepted: u64, _elapsed: Duration) {}

    /// A composite name was seen again and the element was dropped
    fn duplicate(&mut self, _name: &str) {}

    /// A batch was written inside the open transaction
    fn batch_flushed(&mut self, _report: &FlushReport, _elapsed: Duration) {}

    /// The run committed
    fn finished(&mut self, _stats: &ImportStats) {}
}

/// Reports through `tracing` only
#[derive(Debug, Default)]
pub struct TracingObserver;

impl ImportObserver for TracingObserver {
    fn duplicate(&mut self, name: &str) {
        warn!(node = %name, "Node already exists, skipping duplicate");
    }

    fn batch_flushed(&mut self, report: &FlushReport, elapsed: Duration) {
        info!(
            batch = report.batch,
            persisted = report.persisted,
            elapsed = %format_elapsed(elapsed),
            "Saved {} nodes",
            report.persisted
        );
    }

    fn finished(&mut self, stats: &ImportStats) {
        info!(
            accepted = stats.accepted,
            duplicates = stats.duplicates,
            batches = stats.batches,
            max_depth = stats.max_depth,
            elapsed = %format_elapsed(stats.elapsed),
            "Finished reading"
        );
    }
}

/// Terminal spinner for interactive runs; also logs like [`TracingObserver`]
pub struct SpinnerObserver {
    bar: ProgressBar,
    inner: TracingObserver,
}

impl SpinnerObserver {
    pub fn new() -> Self {
        let bar = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")
        {
            bar.set_style(style);
        }
        bar.enable_steady_tick(Duration::from_millis(120));

        Self {
            bar,
            inner: TracingObserver,
        }
    }
}

impl Default for SpinnerObserver {
    fn default() -> Self {
        Self::new()
    }
}

impl ImportObserver for SpinnerObserver {
    fn node_closed(&mut self, accepted: u64, _elapsed: Duration) {
        if accepted % 1000 == 0 {
            self.bar.set_message(format!("{} nodes", accepted));
        }
    }

    fn duplicate(&mut self, name: &str) {
        let inner = &mut self.inner;
        self.bar.suspend(|| inner.duplicate(name));
    }

    fn batch_flushed(&mut self, report: &FlushReport, elapsed: Duration) {
        let inner = &mut self.inner;
        self.bar.suspend(|| inner.batch_flushed(report, elapsed));
    }

    fn finished(&mut self, stats: &ImportStats) {
        self.bar
            .finish_with_message(format!("{} nodes imported", stats.accepted));
        self.inner.finished(stats);
    }
}

/// Format a duration as `HH:MM:SS.cc`
pub fn format_elapsed(elapsed: Duration) -> String {
    let total = elapsed.as_secs();
    format!(
        "{:02}:{:02}:{:02}.{:02}",
        total / 3600,
        (total / 60) % 60,
        total % 60,
        elapsed.subsec_millis() / 10
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_elapsed() {
        assert_eq!(format_elapsed(Duration::ZERO), "00:00:00.00");
        assert_eq!(format_elapsed(Duration::from_millis(1_234)), "00:00:01.23");
        assert_eq!(
            format_elapsed(Duration::from_secs(3 * 3600 + 25 * 60 + 7)),
            "03:25:07.00"
        );
    }
}
