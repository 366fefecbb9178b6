//! Project Configuration (typeset.toml)
//!
//! Handles project-level configuration stored in `typeset.toml` at the project root.
//! Each `[documents.<id>]` table declares one buildable document.

use crate::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use typeset_build::DocumentKind;

/// Project file name
pub const PROJECT_FILE: &str = "typeset.toml";

/// Prefix of the per-document target names
pub const TARGET_PREFIX: &str = "build-";

/// Project configuration from typeset.toml
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct ProjectConfig {
    /// Settings applied to every document
    #[serde(skip_serializing_if = "Option::is_none")]
    pub defaults: Option<Defaults>,

    /// Declared documents, keyed by identifier
    #[serde(default)]
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub documents: BTreeMap<String, DocumentEntry>,
}

/// Project-wide defaults
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct Defaults {
    /// Compiler executable (default: "pdflatex")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compiler: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<PathBuf>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_dir: Option<PathBuf>,

    /// Include directories appended to every document's search path
    #[serde(default)]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub search_path: Vec<PathBuf>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub draft: Option<bool>,

    /// Enable picture externalization
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache: Option<bool>,
}

/// One `[documents.<id>]` table
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct DocumentEntry {
    /// Root document, relative to the project root
    pub document: PathBuf,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<DocumentKind>,

    /// Explicit class name, overrides `kind`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class: Option<String>,

    /// Attributes of the explicit class
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class_options: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,

    /// Job name (default: document stem)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<PathBuf>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_dir: Option<PathBuf>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub draft: Option<bool>,

    /// Glob patterns that also trigger rebuilds in watch mode
    #[serde(default)]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub related: Vec<String>,

    #[serde(default)]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub search_path: Vec<PathBuf>,

    /// Compiler working directory, relative to the project root
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_dir: Option<PathBuf>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub compiler: Option<String>,
}

impl DocumentEntry {
    /// Entry with only the document path set
    pub fn new(document: impl Into<PathBuf>) -> Self {
        Self {
            document: document.into(),
            kind: None,
            class: None,
            class_options: None,
            language: None,
            output_name: None,
            output_dir: None,
            cache_dir: None,
            cache: None,
            draft: None,
            related: Vec::new(),
            search_path: Vec::new(),
            base_dir: None,
            compiler: None,
        }
    }
}

impl ProjectConfig {
    /// Load project configuration from a file
    pub fn load_from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::NotFound(path.to_path_buf())
            } else {
                ConfigError::IoError(e)
            }
        })?;

        Self::parse(&content, path)
    }

    /// Parse project configuration; `file` is only used in error messages
    pub fn parse(content: &str, file: &Path) -> ConfigResult<Self> {
        let config: Self = toml::from_str(content).map_err(|e| ConfigError::TomlParseError {
            file: file.to_path_buf(),
            error: e,
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Validate the project configuration
    pub fn validate(&self) -> ConfigResult<()> {
        for (id, entry) in &self.documents {
            if !is_valid_identifier(id) {
                return Err(ConfigError::InvalidValue {
                    field: format!("documents.{}", id),
                    reason: "identifiers may only contain letters, digits, '-' and '_'"
                        .to_string(),
                });
            }

            if entry.document.as_os_str().is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: format!("documents.{}.document", id),
                    reason: "must not be empty".to_string(),
                });
            }

            if matches!(&entry.class, Some(class) if class.trim().is_empty()) {
                return Err(ConfigError::InvalidValue {
                    field: format!("documents.{}.class", id),
                    reason: "must not be empty".to_string(),
                });
            }

            if entry.class_options.is_some() && entry.class.is_none() {
                return Err(ConfigError::InvalidValue {
                    field: format!("documents.{}.class-options", id),
                    reason: "requires an explicit 'class'".to_string(),
                });
            }
        }

        Ok(())
    }

    /// Build targets as `(target name, document id)` pairs, sorted by id
    pub fn targets(&self) -> Vec<(String, String)> {
        self.documents
            .keys()
            .map(|id| (target_name(id), id.clone()))
            .collect()
    }

    /// Look up a document by identifier or by target name
    pub fn document(&self, id_or_target: &str) -> ConfigResult<(&str, &DocumentEntry)> {
        let id = id_or_target
            .strip_prefix(TARGET_PREFIX)
            .filter(|id| self.documents.contains_key(*id))
            .unwrap_or(id_or_target);

        self.documents
            .get_key_value(id)
            .map(|(id, entry)| (id.as_str(), entry))
            .ok_or_else(|| ConfigError::UnknownDocument(id_or_target.to_string()))
    }

    /// Document identifiers in sorted order
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.documents.keys().map(String::as_str)
    }

    pub fn defaults(&self) -> Defaults {
        self.defaults.clone().unwrap_or_default()
    }
}

/// Target name for a document identifier
pub fn target_name(id: &str) -> String {
    format!("{}{}", TARGET_PREFIX, id)
}

fn is_valid_identifier(id: &str) -> bool {
    !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}
