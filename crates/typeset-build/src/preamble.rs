//! Preamble synthesis
//!
//! The compiler never reads the user's document directly. Instead it reads a
//! generated preamble from standard input which declares the document class,
//! optionally sets up picture externalization, and finally `\input`s the
//! document body.
//!
//! Externalization makes the preamble self-referential: every externalized
//! picture is compiled by a nested compiler call whose command line must carry
//! an escaped copy of the preamble itself. Construction is therefore split in
//! two pure phases:
//!
//! 1. [`draft`] assembles the directives, leaving [`SYSTEM_CALL_PLACEHOLDER`]
//!    where the system-call definition belongs.
//! 2. [`PreambleDraft::expand`] escapes the finished draft (placeholder
//!    removed) and substitutes it into the placeholder position.

use crate::config::{BuildConfig, DocumentClass, DocumentKind};
use std::path::{Component, Path};

/// Token marking where the externalization system call is substituted
pub const SYSTEM_CALL_PLACEHOLDER: &str = "\\tikzsetsystemcall";

/// Turns the class declaration left in the document body into a no-op
pub const CLASS_NEUTRALIZER: &str = "\\renewcommand\\documentclass[2][]{}";

/// Escape sequence that reproduces a single backslash in the nested call
const ESCAPED_BACKSLASH: &str = "\\string\\";

/// Phase-one output: complete preamble text that may still hold the placeholder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreambleDraft {
    text: String,
    input_target: String,
    compiler: String,
}

impl PreambleDraft {
    /// Draft text, placeholder included
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Target of the final `\input` directive
    pub fn input_target(&self) -> &str {
        &self.input_target
    }

    pub fn has_placeholder(&self) -> bool {
        self.text.contains(SYSTEM_CALL_PLACEHOLDER)
    }

    /// Phase two: substitute the escaped preamble into the system call
    pub fn expand(self) -> String {
        let Some((head, tail)) = self.text.split_once(SYSTEM_CALL_PLACEHOLDER) else {
            return self.text;
        };

        let filtered = format!("{}{}", head, tail);
        let system_call = system_call(&self.compiler, &self.input_target, &filtered);

        format!("{}{}{}", head, system_call, tail)
    }
}

/// Build the full preamble for a configuration
pub fn build_preamble(config: &BuildConfig) -> String {
    draft(config).expand()
}

/// Phase one: assemble every directive in order
pub fn draft(config: &BuildConfig) -> PreambleDraft {
    let input = input_target(config.base_dir(), config.document());
    let mut text = String::new();

    text.push_str(&class_declaration(config.class()));
    text.push_str(CLASS_NEUTRALIZER);

    if config.cache_enabled() {
        text.push_str("\\usepackage{tikz}");
        text.push_str("\\usetikzlibrary{external}");
        text.push_str(SYSTEM_CALL_PLACEHOLDER);

        if let Some(cache_dir) = config.cache_dir() {
            text.push_str(&format!(
                "\\tikzsetexternalprefix{{{}}}",
                cache_prefix(config.base_dir(), cache_dir)
            ));
        }
    }

    if let Some(language) = config.language() {
        text.push_str(&format!("\\newcommand\\locale{{{}}}", language));
    }

    text.push_str(&format!("\\input{{{}}}", input));

    PreambleDraft {
        text,
        input_target: input,
        compiler: config.compiler().to_string(),
    }
}

/// Class declaration for a preset or explicit class
pub fn class_declaration(class: &DocumentClass) -> String {
    match class {
        DocumentClass::Explicit {
            name,
            attributes: Some(attributes),
        } => format!("\\documentclass[{}]{{{}}}", attributes, name),
        DocumentClass::Explicit {
            name,
            attributes: None,
        } => format!("\\documentclass{{{}}}", name),
        DocumentClass::Preset(kind) => match kind {
            // TODO: read the class from the document itself once the body is scanned
            DocumentKind::Default | DocumentKind::Article => {
                "\\documentclass{article}".to_string()
            }
            DocumentKind::Beamer => "\\documentclass{beamer}".to_string(),
            DocumentKind::BeamerHandout => "\\documentclass[handout]{beamer}".to_string(),
            DocumentKind::BeamerArticle => {
                "\\documentclass{article}\\usepackage{beamerarticle}".to_string()
            }
        },
    }
}

/// `\input` target: document directory relative to the base, plus the stem
pub fn input_target(base_dir: &Path, document: &Path) -> String {
    let stem = document
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    let relative_dir = document
        .parent()
        .map(|parent| relative_slash_path(base_dir, parent))
        .unwrap_or_default();

    if relative_dir.is_empty() {
        stem
    } else {
        format!("{}/{}", relative_dir, stem)
    }
}

/// Externalization file prefix: cache dir relative to the base, ending in `/`
pub fn cache_prefix(base_dir: &Path, cache_dir: &Path) -> String {
    let relative = relative_slash_path(base_dir, cache_dir);

    if relative.is_empty() {
        "./".to_string()
    } else if relative.ends_with('/') {
        relative
    } else {
        format!("{}/", relative)
    }
}

/// Escape text for embedding as a quoted argument of the nested compiler call
pub fn escape_for_system_call(text: &str) -> String {
    text.replace('\\', ESCAPED_BACKSLASH)
}

/// Nested compiler call; the `\input` target doubles as the real job identity
fn system_call(compiler: &str, real_job: &str, preamble: &str) -> String {
    format!(
        "\\tikzset{{external/system call={{{} \\tikzexternalcheckshellescape -halt-on-error -interaction=batchmode -jobname \"\\image\" \"\\string\\def\\string\\tikzexternalrealjob{{{}}}{}\"}}}}",
        compiler,
        real_job,
        escape_for_system_call(preamble)
    )
}

/// Relative path from `base` to `target`, always joined with `/`
fn relative_slash_path(base: &Path, target: &Path) -> String {
    let relative = pathdiff::diff_paths(target, base).unwrap_or_else(|| target.to_path_buf());

    relative
        .components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            Component::ParentDir => Some("..".to_string()),
            Component::CurDir | Component::RootDir | Component::Prefix(_) => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}
