//! Single-build tests against a stand-in compiler
//!
//! The stand-in is a shell script that records its argument vector, standard
//! input and search path, then prints a canned log.

#![cfg(unix)]

use pretty_assertions::assert_eq;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;
use typeset_build::{
    BuildConfig, BuildError, CollectingReporter, Message, Orchestrator, OutputStream, ReportEntry,
};

struct Fixture {
    project: TempDir,
    _bin: TempDir,
    compiler: PathBuf,
}

impl Fixture {
    fn new(exit_code: i32) -> Self {
        let project = TempDir::new().unwrap();
        fs::write(project.path().join("main.tex"), "\\documentclass{article}\n").unwrap();

        let bin = TempDir::new().unwrap();
        let compiler = bin.path().join("fakelatex");
        let script = format!(
            "#!/bin/sh\n\
             printf '%s\\n' \"$@\" > argv.txt\n\
             cat > stdin.txt\n\
             printf '%s' \"${{TEXINPUTS:-}}\" > texinputs.txt\n\
             echo 'This is fakeTeX'\n\
             echo '! Undefined control sequence.'\n\
             echo 'l.3 foo'\n\
             echo 'LaTeX Warning: Reference undefined.'\n\
             echo 'fake stderr' >&2\n\
             exit {}\n",
            exit_code
        );
        fs::write(&compiler, script).unwrap();
        fs::set_permissions(&compiler, fs::Permissions::from_mode(0o755)).unwrap();

        Self {
            project,
            _bin: bin,
            compiler,
        }
    }

    fn root(&self) -> &Path {
        self.project.path()
    }

    fn builder(&self) -> typeset_build::BuildConfigBuilder {
        BuildConfig::builder(self.root().join("main.tex"))
            .with_base_dir(self.root())
            .with_compiler(self.compiler.to_string_lossy())
    }

    fn recorded(&self, name: &str) -> String {
        fs::read_to_string(self.root().join(name)).unwrap()
    }
}

#[test]
fn test_captured_build_classifies_log() {
    let fixture = Fixture::new(1);
    let reporter = Arc::new(CollectingReporter::new());
    let orchestrator = Orchestrator::new(reporter.clone());
    let config = fixture.builder().build().unwrap();

    let report = orchestrator.build(&config).unwrap();

    let expected = vec![
        Message::error("Undefined control sequence. l.3 foo"),
        Message::warning("Reference undefined."),
    ];
    assert_eq!(report.messages, expected);
    assert_eq!(report.exit_code, Some(1));
    assert!(report.parsed);
    assert!(!report.succeeded());
    assert_eq!(reporter.messages(), expected);
    assert_eq!(reporter.finished_builds(), 1);
}

#[test]
fn test_compiler_receives_arguments_and_preamble() {
    let fixture = Fixture::new(0);
    let orchestrator = Orchestrator::new(Arc::new(CollectingReporter::new()));
    let config = fixture.builder().with_draft(true).build().unwrap();

    orchestrator.build(&config).unwrap();

    assert_eq!(
        fixture.recorded("argv.txt"),
        "-shell-restricted\n-interaction=nonstopmode\n-jobname=main\n-draftmode\n"
    );
    assert_eq!(
        fixture.recorded("stdin.txt"),
        "\\documentclass{article}\\renewcommand\\documentclass[2][]{}\\input{main}\n"
    );
    assert_eq!(fixture.recorded("texinputs.txt"), "");
}

#[test]
fn test_search_path_exported() {
    let fixture = Fixture::new(0);
    let styles = fixture.root().join("styles");
    let fonts = fixture.root().join("fonts");
    let config = fixture
        .builder()
        .with_search_path(vec![styles.clone(), fonts.clone()])
        .build()
        .unwrap();

    Orchestrator::new(Arc::new(CollectingReporter::new()))
        .build(&config)
        .unwrap();

    assert_eq!(
        fixture.recorded("texinputs.txt"),
        format!("{}:{}:", styles.display(), fonts.display())
    );
}

#[test]
fn test_verbose_build_passes_output_through() {
    let fixture = Fixture::new(0);
    let reporter = Arc::new(CollectingReporter::new());
    let config = fixture.builder().with_verbose(true).build().unwrap();

    let report = Orchestrator::new(reporter.clone()).build(&config).unwrap();

    assert!(report.messages.is_empty());
    assert!(!report.parsed);
    assert!(reporter.messages().is_empty());

    let entries = reporter.entries();
    assert!(entries.contains(&ReportEntry::Output(
        OutputStream::Stdout,
        "! Undefined control sequence.".to_string()
    )));
    assert!(entries.contains(&ReportEntry::Output(
        OutputStream::Stderr,
        "fake stderr".to_string()
    )));
}

#[test]
fn test_error_line_fails_clean_exit() {
    let fixture = Fixture::new(0);
    let config = fixture.builder().build().unwrap();

    let report = Orchestrator::new(Arc::new(CollectingReporter::new()))
        .build(&config)
        .unwrap();

    // the canned log always carries an error line
    assert_eq!(report.errors().count(), 1);
    assert!(!report.succeeded());
    assert_eq!(report.warnings().count(), 1);
}

#[test]
fn test_invalid_configuration_spawns_nothing() {
    let fixture = Fixture::new(0);
    let config = fixture.builder().build().unwrap();
    fs::remove_file(fixture.root().join("main.tex")).unwrap();

    let err = Orchestrator::new(Arc::new(CollectingReporter::new()))
        .build(&config)
        .unwrap_err();

    assert!(err.is_configuration());
    assert!(!fixture.root().join("argv.txt").exists());
}

#[test]
fn test_missing_compiler() {
    let fixture = Fixture::new(0);
    let config = fixture
        .builder()
        .with_compiler("/nonexistent/typeset-latex")
        .build()
        .unwrap();

    let err = Orchestrator::new(Arc::new(CollectingReporter::new()))
        .build(&config)
        .unwrap_err();

    assert!(matches!(err, BuildError::Invocation { .. }));
}
