//! Reporting sink
//!
//! The orchestrator and the watcher never print. Everything user-facing goes
//! through a [`Reporter`], so the CLI can render to the console while tests
//! collect events in memory.

use crate::error::{BuildError, WatchError};
use crate::log::Message;
use crate::orchestrator::BuildReport;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::{error, info, warn};

/// Which compiler stream a passthrough line came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputStream {
    Stdout,
    Stderr,
}

/// Receiver of build diagnostics and watch-loop events
pub trait Reporter: Send + Sync {
    /// A classified diagnostic, in log order
    fn message(&self, message: &Message);

    /// A raw compiler output line (verbose passthrough)
    fn output_line(&self, stream: OutputStream, line: &str);

    /// A build ran to completion (whatever its diagnostics)
    fn build_finished(&self, _report: &BuildReport) {}

    /// A build could not be run at all
    fn build_failed(&self, error: &BuildError);

    /// Watched files changed and a rebuild is about to start
    fn change_detected(&self, _paths: &[PathBuf]) {}

    /// The watcher registered these directories
    fn watching(&self, _dirs: &[PathBuf]) {}

    /// The watch loop is stopping because of an I/O failure
    fn watch_failed(&self, error: &WatchError);
}

/// Reporter that forwards everything to `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn message(&self, message: &Message) {
        if message.is_error() {
            error!(target: "typeset::log", "{}", message);
        } else {
            warn!(target: "typeset::log", "{}", message);
        }
    }

    fn output_line(&self, stream: OutputStream, line: &str) {
        match stream {
            OutputStream::Stdout => info!(target: "typeset::compiler", "{}", line),
            OutputStream::Stderr => warn!(target: "typeset::compiler", "{}", line),
        }
    }

    fn build_finished(&self, report: &BuildReport) {
        info!(
            job = %report.job_name,
            errors = report.errors().count(),
            warnings = report.warnings().count(),
            "build finished in {:.2}s",
            report.duration.as_secs_f64()
        );
    }

    fn build_failed(&self, error: &BuildError) {
        error!("{}", error);
    }

    fn change_detected(&self, paths: &[PathBuf]) {
        for path in paths {
            info!("{} has been changed", path.display());
        }
    }

    fn watching(&self, dirs: &[PathBuf]) {
        for dir in dirs {
            info!("watching {}", dir.display());
        }
    }

    fn watch_failed(&self, error: &WatchError) {
        error!("{}", error);
    }
}

/// Event recorded by [`CollectingReporter`]
#[derive(Debug, Clone, PartialEq)]
pub enum ReportEntry {
    Message(Message),
    Output(OutputStream, String),
    Finished { job_name: String, succeeded: bool },
    Failed(String),
    Changed(Vec<PathBuf>),
    Watching(Vec<PathBuf>),
    WatchFailed(String),
}

/// In-memory reporter
#[derive(Debug, Default)]
pub struct CollectingReporter {
    entries: Mutex<Vec<ReportEntry>>,
}

impl CollectingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything reported so far
    pub fn entries(&self) -> Vec<ReportEntry> {
        self.lock().clone()
    }

    /// Only the diagnostics
    pub fn messages(&self) -> Vec<Message> {
        self.lock()
            .iter()
            .filter_map(|entry| match entry {
                ReportEntry::Message(message) => Some(message.clone()),
                _ => None,
            })
            .collect()
    }

    /// Number of builds that ran to completion
    pub fn finished_builds(&self) -> usize {
        self.lock()
            .iter()
            .filter(|entry| matches!(entry, ReportEntry::Finished { .. }))
            .count()
    }

    fn push(&self, entry: ReportEntry) {
        self.lock().push(entry);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<ReportEntry>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Reporter for CollectingReporter {
    fn message(&self, message: &Message) {
        self.push(ReportEntry::Message(message.clone()));
    }

    fn output_line(&self, stream: OutputStream, line: &str) {
        self.push(ReportEntry::Output(stream, line.to_string()));
    }

    fn build_finished(&self, report: &BuildReport) {
        self.push(ReportEntry::Finished {
            job_name: report.job_name.clone(),
            succeeded: report.succeeded(),
        });
    }

    fn build_failed(&self, error: &BuildError) {
        self.push(ReportEntry::Failed(error.to_string()));
    }

    fn change_detected(&self, paths: &[PathBuf]) {
        self.push(ReportEntry::Changed(paths.to_vec()));
    }

    fn watching(&self, dirs: &[PathBuf]) {
        self.push(ReportEntry::Watching(dirs.to_vec()));
    }

    fn watch_failed(&self, error: &WatchError) {
        self.push(ReportEntry::WatchFailed(error.to_string()));
    }
}
