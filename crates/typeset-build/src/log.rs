//! Compiler log classification
//!
//! Scans captured compiler output and yields the errors and warnings it
//! contains, in order of appearance.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Line prefix of a fatal error; the message continues on the next line
pub const ERROR_MARKER: &str = "!";

/// Line prefix of a warning
pub const WARNING_MARKER: &str = "LaTeX Warning";

/// Bytes stripped from a warning line (`"LaTeX Warning: "`)
const WARNING_PREFIX_LEN: usize = 15;

/// Separator between the error marker and the message text
const ERROR_SEPARATOR: char = ' ';

/// Diagnostic severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Error,
    Warning,
}

impl MessageKind {
    /// Rendering prefix
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::Error => "Error",
            Self::Warning => "Warning",
        }
    }
}

/// A single diagnostic extracted from the log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub kind: MessageKind,
    pub text: String,
}

impl Message {
    pub fn error(text: impl Into<String>) -> Self {
        Self {
            kind: MessageKind::Error,
            text: text.into(),
        }
    }

    pub fn warning(text: impl Into<String>) -> Self {
        Self {
            kind: MessageKind::Warning,
            text: text.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.kind == MessageKind::Error
    }

    /// `"<Prefix>: <text>"`
    pub fn render(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind.prefix(), self.text)
    }
}

/// Classify raw compiler output into messages
pub fn parse_log(log: &str) -> Vec<Message> {
    let normalized = log.replace("\r\n", "\n");
    let mut lines: Vec<&str> = normalized.split('\n').collect();
    // a terminating newline does not start another line
    while lines.last() == Some(&"") {
        lines.pop();
    }
    let mut messages = Vec::new();
    let mut i = 0;

    while i < lines.len() {
        let line = lines[i];

        if line.starts_with(ERROR_MARKER) {
            let head = error_head(line);
            match lines.get(i + 1) {
                Some(next) => {
                    messages.push(Message::error(format!("{} {}", head, next)));
                    i += 2;
                }
                None => {
                    messages.push(Message::error(head));
                    i += 1;
                }
            }
            continue;
        }

        if line.starts_with(WARNING_MARKER) {
            messages.push(Message::warning(skip_bytes(line, WARNING_PREFIX_LEN)));
        }

        i += 1;
    }

    messages
}

/// Text of an error line: everything after the marker and one space
fn error_head(line: &str) -> &str {
    let rest = line.strip_prefix(ERROR_MARKER).unwrap_or(line);
    rest.strip_prefix(ERROR_SEPARATOR).unwrap_or(rest)
}

/// Remainder of `line` after `len` bytes, or empty if the line is shorter
///
/// A cut inside a multi-byte character moves forward to the next boundary.
fn skip_bytes(line: &str, len: usize) -> &str {
    let start = (len..=line.len())
        .find(|&i| line.is_char_boundary(i))
        .unwrap_or(line.len());
    &line[start..]
}
