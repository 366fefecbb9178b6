//! One-shot build orchestration
//!
//! validate -> synthesize preamble -> invoke compiler -> classify log -> report

use crate::config::BuildConfig;
use crate::error::BuildResult;
use crate::invoker::{self, CapturedOutput};
use crate::log::{self, Message, MessageKind};
use crate::preamble;
use crate::report::{Reporter, TracingReporter};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Outcome of a build that ran the compiler
#[derive(Debug, Clone)]
pub struct BuildReport {
    /// Job name the compiler used for its artefacts
    pub job_name: String,
    /// Classified diagnostics in log order (empty when output was passed through)
    pub messages: Vec<Message>,
    /// Compiler exit code
    pub exit_code: Option<i32>,
    /// Compiler wall-clock time
    pub duration: Duration,
    /// Whether the log was captured and classified
    pub parsed: bool,
}

impl BuildReport {
    fn from_output(job_name: String, output: &CapturedOutput, parsed: bool) -> Self {
        Self {
            job_name,
            messages: if parsed {
                log::parse_log(&output.stdout)
            } else {
                Vec::new()
            },
            exit_code: output.exit_code,
            duration: output.duration,
            parsed,
        }
    }

    pub fn errors(&self) -> impl Iterator<Item = &Message> {
        self.messages
            .iter()
            .filter(|m| m.kind == MessageKind::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Message> {
        self.messages
            .iter()
            .filter(|m| m.kind == MessageKind::Warning)
    }

    /// The compiler exited cleanly and reported no errors
    pub fn succeeded(&self) -> bool {
        self.exit_code == Some(0) && self.errors().next().is_none()
    }
}

/// Runs single builds and reports their diagnostics
#[derive(Clone)]
pub struct Orchestrator {
    reporter: Arc<dyn Reporter>,
}

impl Orchestrator {
    pub fn new(reporter: Arc<dyn Reporter>) -> Self {
        Self { reporter }
    }

    pub fn reporter(&self) -> &Arc<dyn Reporter> {
        &self.reporter
    }

    /// Execute one build
    ///
    /// Configuration and invocation failures are returned as errors. Compiler
    /// diagnostics are data: they are reported and carried in the report.
    pub fn build(&self, config: &BuildConfig) -> BuildResult<BuildReport> {
        config.validate()?;

        let preamble = preamble::build_preamble(config);
        debug!(
            document = %config.document().display(),
            bytes = preamble.len(),
            "synthesized preamble"
        );

        let output = invoker::invoke(&preamble, config, self.reporter.as_ref())?;
        let report = BuildReport::from_output(config.job_name(), &output, !config.verbose());

        for message in &report.messages {
            self.reporter.message(message);
        }
        self.reporter.build_finished(&report);

        Ok(report)
    }
}

impl Default for Orchestrator {
    fn default() -> Self {
        Self::new(Arc::new(TracingReporter))
    }
}
