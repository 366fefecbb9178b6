//! Watch command - rebuild documents whenever their sources change

use super::{load_config, resolve_targets, BuildOptions};
use crate::reporter::ConsoleReporter;
use anyhow::{anyhow, bail, Context, Result};
use std::path::Path;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{debug, warn};
use typeset_build::{ContinuousWatcher, Orchestrator, StopHandle, WatchOptions, WatchOutcome};

/// Run the watch command
///
/// One watcher runs per target; Ctrl+C stops all of them.
pub fn run(
    config_file: Option<&Path>,
    targets: &[String],
    options: &BuildOptions,
    reporter: Arc<ConsoleReporter>,
) -> Result<()> {
    let config = load_config(config_file)?;
    let targets = resolve_targets(&config, targets, options)?;
    let orchestrator = Orchestrator::new(reporter);
    let watch_options = WatchOptions {
        debounce: Duration::from_millis(options.debounce),
        ..WatchOptions::default()
    };

    let mut handles = Vec::new();
    let mut workers = Vec::new();
    for target in targets {
        let watcher = ContinuousWatcher::new(target.config, orchestrator.clone())
            .with_options(watch_options.clone());
        let (handle, worker) = watcher
            .spawn()
            .with_context(|| format!("Failed to start watcher for '{}'", target.label))?;
        handles.push(handle);
        workers.push((target.label, worker));
    }

    install_interrupt_handler(handles)?;

    let mut failed = Vec::new();
    for (label, worker) in workers {
        match worker.join() {
            Ok(Ok(WatchOutcome::Cancelled)) => debug!(target = %label, "watch cancelled"),
            Ok(Ok(WatchOutcome::RegistrationLost)) => {
                warn!(target = %label, "watched directory disappeared");
                failed.push(label);
            }
            // Already reported by the watcher
            Ok(Err(_)) => failed.push(label),
            Err(_) => return Err(anyhow!("Watcher for '{}' panicked", label)),
        }
    }

    if !failed.is_empty() {
        bail!("Watching stopped unexpectedly: {}", failed.join(", "));
    }
    Ok(())
}

/// Stop every watcher on Ctrl+C
fn install_interrupt_handler(handles: Vec<StopHandle>) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to create signal runtime")?;

    thread::Builder::new()
        .name("typeset-signal".to_string())
        .spawn(move || {
            runtime.block_on(async {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    warn!("failed to listen for Ctrl+C: {}", e);
                    return;
                }
                debug!("interrupt received, stopping watchers");
                for handle in &handles {
                    handle.stop();
                }
            });
        })
        .context("Failed to spawn signal thread")?;

    Ok(())
}
