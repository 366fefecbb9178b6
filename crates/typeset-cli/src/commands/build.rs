//! Build command - compile documents once

use super::{load_config, resolve_targets, BuildOptions};
use crate::reporter::ConsoleReporter;
use anyhow::{bail, Result};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;
use typeset_build::{Orchestrator, Reporter};

/// Run the build command
///
/// Every target is built even if an earlier one fails; the command fails if
/// any build could not run or reported errors.
pub fn run(
    config_file: Option<&Path>,
    targets: &[String],
    options: &BuildOptions,
    reporter: Arc<ConsoleReporter>,
) -> Result<()> {
    let config = load_config(config_file)?;
    let targets = resolve_targets(&config, targets, options)?;
    let orchestrator = Orchestrator::new(reporter.clone());

    let mut failed = Vec::new();
    for target in &targets {
        debug!(target = %target.label, document = %target.config.document().display(), "building");
        match orchestrator.build(&target.config) {
            Ok(report) if report.succeeded() => {}
            Ok(_) => failed.push(target.label.as_str()),
            Err(e) => {
                reporter.build_failed(&e);
                failed.push(target.label.as_str());
            }
        }
    }

    if !failed.is_empty() {
        bail!("Build failed: {}", failed.join(", "));
    }
    Ok(())
}
