//! Console reporter - render build diagnostics and watch events

use colored::*;
use std::path::PathBuf;
use typeset_build::{
    BuildError, BuildReport, Message, MessageKind, OutputStream, Reporter, WatchError,
};

/// Reporter that prints to the terminal
pub struct ConsoleReporter {
    /// Disable colored output
    no_color: bool,
}

impl ConsoleReporter {
    pub fn new(no_color: bool) -> Self {
        if no_color {
            colored::control::set_override(false);
        }
        Self { no_color }
    }

    /// `"Error: <text>"` or `"Warning: <text>"`, colored unless disabled
    pub fn render_message(&self, message: &Message) -> String {
        if self.no_color {
            return message.render();
        }

        let prefix = match message.kind {
            MessageKind::Error => message.kind.prefix().red().bold(),
            MessageKind::Warning => message.kind.prefix().yellow().bold(),
        };
        format!("{}: {}", prefix, message.text)
    }

    /// One-line summary of a finished build
    pub fn render_summary(&self, report: &BuildReport) -> String {
        let errors = report.errors().count();
        let warnings = report.warnings().count();
        let status = if report.succeeded() {
            "Built".green().bold()
        } else {
            "Failed".red().bold()
        };

        let mut line = format!(
            "{} {} in {:.2}s",
            status,
            report.job_name,
            report.duration.as_secs_f64()
        );
        if report.parsed {
            line.push_str(&format!(" ({} errors, {} warnings)", errors, warnings));
        }
        if let Some(code) = report.exit_code.filter(|code| *code != 0) {
            line.push_str(&format!(" [exit code {}]", code));
        }
        line
    }
}

impl Reporter for ConsoleReporter {
    fn message(&self, message: &Message) {
        println!("{}", self.render_message(message));
    }

    fn output_line(&self, stream: OutputStream, line: &str) {
        match stream {
            OutputStream::Stdout => println!("{}", line),
            OutputStream::Stderr => eprintln!("{}", line),
        }
    }

    fn build_finished(&self, report: &BuildReport) {
        println!("{}", self.render_summary(report));
    }

    fn build_failed(&self, error: &BuildError) {
        eprintln!("{} {}", "error:".red().bold(), error);
    }

    fn change_detected(&self, paths: &[PathBuf]) {
        for path in paths {
            println!("{} has been changed", path.display().to_string().cyan());
        }
    }

    fn watching(&self, dirs: &[PathBuf]) {
        for dir in dirs {
            println!("{} {}", "Watching".dimmed(), dir.display());
        }
    }

    fn watch_failed(&self, error: &WatchError) {
        eprintln!("{} {}", "watch error:".red().bold(), error);
    }
}
