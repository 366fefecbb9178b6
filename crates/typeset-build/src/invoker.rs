//! Compiler process invocation
//!
//! Spawns the compiler with the preamble on standard input. Standard output
//! and standard error are drained on their own threads while the process runs
//! so the child can never block on a full pipe.

use crate::config::BuildConfig;
use crate::error::{BuildError, BuildResult, ConfigurationError};
use crate::report::{OutputStream, Reporter};
use std::ffi::OsString;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::thread::{self, ScopedJoinHandle};
use std::time::{Duration, Instant};
use tracing::debug;

/// Environment variable carrying the include search path
pub const SEARCH_PATH_VAR: &str = "TEXINPUTS";

#[cfg(windows)]
const PATH_LIST_SEPARATOR: &str = ";";
#[cfg(not(windows))]
const PATH_LIST_SEPARATOR: &str = ":";

/// Result of one compiler run
#[derive(Debug, Clone, Default)]
pub struct CapturedOutput {
    /// Exit code, `None` if the process was killed by a signal
    pub exit_code: Option<i32>,
    /// Captured standard output (empty in verbose passthrough mode)
    pub stdout: String,
    /// Captured standard error (empty in verbose passthrough mode)
    pub stderr: String,
    /// Wall-clock time of the run
    pub duration: Duration,
}

impl CapturedOutput {
    /// Check if the compiler exited successfully
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Argument vector for the compiler
pub fn compiler_args(config: &BuildConfig) -> Vec<String> {
    let mut args = Vec::new();

    // externalized pictures are compiled through a nested compiler call,
    // which the restricted mode does not permit
    if config.cache_enabled() {
        args.push("-shell-escape".to_string());
    } else {
        args.push("-shell-restricted".to_string());
    }
    args.push("-interaction=nonstopmode".to_string());
    args.push(format!("-jobname={}", config.job_name()));

    if let Some(dir) = config.output_dir() {
        args.push(format!("-output-directory={}", dir.display()));
    }

    if config.draft() {
        args.push("-draftmode".to_string());
    }

    args
}

/// Search path joined with the platform separator, with a trailing separator
/// so the compiler keeps its default locations
pub fn search_path_value(paths: &[PathBuf]) -> Result<Option<OsString>, ConfigurationError> {
    if paths.is_empty() {
        return Ok(None);
    }

    let mut value = std::env::join_paths(paths)
        .map_err(|e| ConfigurationError::InvalidSearchPath(e.to_string()))?;
    value.push(PATH_LIST_SEPARATOR);
    Ok(Some(value))
}

/// Run the compiler once and wait for it to exit
///
/// A non-zero exit status is not an error here; the caller decides what the
/// diagnostics mean. Only failing to start the process is.
pub fn invoke(
    preamble: &str,
    config: &BuildConfig,
    reporter: &dyn Reporter,
) -> BuildResult<CapturedOutput> {
    let args = compiler_args(config);
    let mut command = Command::new(config.compiler());
    command
        .args(&args)
        .current_dir(config.base_dir())
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    if let Some(value) = search_path_value(config.search_path())? {
        debug!(var = SEARCH_PATH_VAR, value = ?value, "setting search path");
        command.env(SEARCH_PATH_VAR, value);
    }

    debug!(
        compiler = config.compiler(),
        args = ?args,
        cwd = %config.base_dir().display(),
        "spawning compiler"
    );

    let start = Instant::now();
    let mut child = command
        .spawn()
        .map_err(|e| BuildError::invocation(config.compiler(), e))?;

    let stdin = child.stdin.take();
    let stdout = child.stdout.take();
    let stderr = child.stderr.take();
    let verbose = config.verbose();

    let (status, stdout, stderr) = thread::scope(|scope| {
        let writer = scope.spawn(move || feed_stdin(stdin, preamble));
        let out = scope.spawn(move || drain(stdout, OutputStream::Stdout, verbose, reporter));
        let err = scope.spawn(move || drain(stderr, OutputStream::Stderr, verbose, reporter));

        let status = child.wait();
        let stdout = join(out);
        let stderr = join(err);
        if let Err(e) = join(writer) {
            debug!(error = %e, "compiler closed its input early");
        }
        (status, stdout, stderr)
    });

    let status = status.map_err(|e| BuildError::invocation(config.compiler(), e))?;
    let duration = start.elapsed();

    debug!(
        exit_code = ?status.code(),
        duration_ms = duration.as_millis() as u64,
        "compiler exited"
    );

    Ok(CapturedOutput {
        exit_code: status.code(),
        stdout: stdout?,
        stderr: stderr?,
        duration,
    })
}

fn feed_stdin(stdin: Option<std::process::ChildStdin>, preamble: &str) -> io::Result<()> {
    if let Some(mut pipe) = stdin {
        pipe.write_all(preamble.as_bytes())?;
        pipe.write_all(b"\n")?;
    }
    Ok(())
}

/// Read a pipe to the end, either into a buffer or line by line into the reporter
fn drain<R: Read>(
    pipe: Option<R>,
    stream: OutputStream,
    passthrough: bool,
    reporter: &dyn Reporter,
) -> io::Result<String> {
    let Some(pipe) = pipe else {
        return Ok(String::new());
    };

    if !passthrough {
        let mut buf = Vec::new();
        BufReader::new(pipe).read_to_end(&mut buf)?;
        return Ok(String::from_utf8_lossy(&buf).into_owned());
    }

    let mut reader = BufReader::new(pipe);
    let mut line = Vec::new();
    loop {
        line.clear();
        if reader.read_until(b'\n', &mut line)? == 0 {
            break;
        }
        let text = String::from_utf8_lossy(&line);
        reporter.output_line(stream, text.trim_end_matches(['\r', '\n']));
    }
    Ok(String::new())
}

fn join<T>(handle: ScopedJoinHandle<'_, io::Result<T>>) -> io::Result<T> {
    handle
        .join()
        .unwrap_or_else(|_| Err(io::Error::other("compiler pipe reader panicked")))
}
