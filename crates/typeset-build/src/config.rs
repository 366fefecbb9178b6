//! Build request description
//!
//! A [`BuildConfig`] is constructed once through [`BuildConfigBuilder`], which
//! validates the filesystem invariants and absolutizes every path. After that
//! the value is read-only: the preamble builder, the compiler invoker and the
//! watcher only ever borrow it.

use crate::error::ConfigurationError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Extension every root document must carry
pub const DOCUMENT_EXTENSION: &str = "tex";

/// Compiler binary used when none is configured
pub const DEFAULT_COMPILER: &str = "pdflatex";

/// Document-type presets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DocumentKind {
    /// Keep the document's own class (currently compiled as `article`)
    #[default]
    Default,
    /// `\documentclass{article}`
    Article,
    /// `\documentclass{beamer}`
    Beamer,
    /// `\documentclass[handout]{beamer}`
    BeamerHandout,
    /// `article` followed by the `beamerarticle` package
    BeamerArticle,
}

impl DocumentKind {
    /// Get kind name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Article => "article",
            Self::Beamer => "beamer",
            Self::BeamerHandout => "beamer-handout",
            Self::BeamerArticle => "beamer-article",
        }
    }

    /// All presets in declaration order
    pub fn all() -> [DocumentKind; 5] {
        [
            Self::Default,
            Self::Article,
            Self::Beamer,
            Self::BeamerHandout,
            Self::BeamerArticle,
        ]
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DocumentKind {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .into_iter()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| ConfigurationError::UnknownKind(s.to_string()))
    }
}

/// How the document class is chosen
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentClass {
    /// One of the fixed presets
    Preset(DocumentKind),
    /// Explicit class name with optional attributes; overrides any preset
    Explicit {
        name: String,
        attributes: Option<String>,
    },
}

impl Default for DocumentClass {
    fn default() -> Self {
        Self::Preset(DocumentKind::Default)
    }
}

/// Validated, immutable description of one build request
#[derive(Debug, Clone, PartialEq)]
pub struct BuildConfig {
    document: PathBuf,
    base_dir: PathBuf,
    output_dir: Option<PathBuf>,
    output_name: Option<String>,
    cache_dir: Option<PathBuf>,
    class: DocumentClass,
    language: Option<String>,
    draft: bool,
    cache_enabled: bool,
    verbose: bool,
    search_path: Vec<PathBuf>,
    related_paths: Vec<String>,
    compiler: String,
}

impl BuildConfig {
    /// Start building a configuration for the given root document
    pub fn builder(document: impl Into<PathBuf>) -> BuildConfigBuilder {
        BuildConfigBuilder::new(document)
    }

    /// Re-check the filesystem invariants established at construction time
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if !self.document.exists() {
            return Err(ConfigurationError::DocumentNotFound(self.document.clone()));
        }

        if self.document.extension().and_then(|e| e.to_str()) != Some(DOCUMENT_EXTENSION) {
            return Err(ConfigurationError::InvalidExtension {
                path: self.document.clone(),
                extension: DOCUMENT_EXTENSION,
            });
        }

        if !self.base_dir.exists() {
            return Err(ConfigurationError::BaseDirNotFound(self.base_dir.clone()));
        }

        if let Some(dir) = &self.output_dir {
            if !dir.exists() {
                return Err(ConfigurationError::OutputDirNotFound(dir.clone()));
            }
        }

        if let Some(dir) = &self.cache_dir {
            if !dir.exists() {
                return Err(ConfigurationError::CacheDirNotFound(dir.clone()));
            }
        }

        Ok(())
    }

    /// Absolute path of the root document
    pub fn document(&self) -> &Path {
        &self.document
    }

    /// Working directory of the compiler run
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn output_dir(&self) -> Option<&Path> {
        self.output_dir.as_deref()
    }

    pub fn output_name(&self) -> Option<&str> {
        self.output_name.as_deref()
    }

    pub fn cache_dir(&self) -> Option<&Path> {
        self.cache_dir.as_deref()
    }

    pub fn class(&self) -> &DocumentClass {
        &self.class
    }

    pub fn language(&self) -> Option<&str> {
        self.language.as_deref()
    }

    pub fn draft(&self) -> bool {
        self.draft
    }

    pub fn cache_enabled(&self) -> bool {
        self.cache_enabled
    }

    pub fn verbose(&self) -> bool {
        self.verbose
    }

    /// Additional include directories, in lookup order
    pub fn search_path(&self) -> &[PathBuf] {
        &self.search_path
    }

    /// Glob patterns, relative to the base directory, that also trigger rebuilds
    pub fn related_paths(&self) -> &[String] {
        &self.related_paths
    }

    /// Compiler executable name or path
    pub fn compiler(&self) -> &str {
        &self.compiler
    }

    /// Document file name without its extension
    pub fn document_stem(&self) -> String {
        self.document
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Job name passed to the compiler: the output name, else the document stem
    pub fn job_name(&self) -> String {
        self.output_name
            .clone()
            .unwrap_or_else(|| self.document_stem())
    }

    /// Copy of this configuration with verbose passthrough switched on or off
    pub fn with_verbose(&self, verbose: bool) -> Self {
        Self {
            verbose,
            ..self.clone()
        }
    }
}

/// Builder for [`BuildConfig`]
#[derive(Debug, Clone)]
pub struct BuildConfigBuilder {
    document: PathBuf,
    base_dir: Option<PathBuf>,
    output_dir: Option<PathBuf>,
    output_name: Option<String>,
    cache_dir: Option<PathBuf>,
    kind: DocumentKind,
    document_class: Option<String>,
    document_attributes: Option<String>,
    language: Option<String>,
    draft: bool,
    cache_enabled: bool,
    verbose: bool,
    search_path: Vec<PathBuf>,
    related_paths: Vec<String>,
    compiler: Option<String>,
}

impl BuildConfigBuilder {
    /// Create a builder with every optional setting unset
    pub fn new(document: impl Into<PathBuf>) -> Self {
        Self {
            document: document.into(),
            base_dir: None,
            output_dir: None,
            output_name: None,
            cache_dir: None,
            kind: DocumentKind::Default,
            document_class: None,
            document_attributes: None,
            language: None,
            draft: false,
            cache_enabled: false,
            verbose: false,
            search_path: Vec::new(),
            related_paths: Vec::new(),
            compiler: None,
        }
    }

    /// Set the working directory (defaults to the current directory)
    pub fn with_base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(dir.into());
        self
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(dir.into());
        self
    }

    pub fn with_output_name(mut self, name: impl Into<String>) -> Self {
        self.output_name = Some(name.into());
        self
    }

    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = Some(dir.into());
        self
    }

    pub fn with_kind(mut self, kind: DocumentKind) -> Self {
        self.kind = kind;
        self
    }

    /// Set an explicit document class, which takes precedence over the kind
    pub fn with_document_class(
        mut self,
        class: impl Into<String>,
        attributes: Option<String>,
    ) -> Self {
        self.document_class = Some(class.into());
        self.document_attributes = attributes;
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    pub fn with_draft(mut self, draft: bool) -> Self {
        self.draft = draft;
        self
    }

    /// Enable picture externalization
    pub fn with_cache(mut self, enabled: bool) -> Self {
        self.cache_enabled = enabled;
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn with_search_path(mut self, paths: Vec<PathBuf>) -> Self {
        self.search_path = paths;
        self
    }

    pub fn with_related_paths(mut self, patterns: Vec<String>) -> Self {
        self.related_paths = patterns;
        self
    }

    pub fn with_compiler(mut self, compiler: impl Into<String>) -> Self {
        self.compiler = Some(compiler.into());
        self
    }

    /// Validate and produce the immutable configuration
    pub fn build(self) -> Result<BuildConfig, ConfigurationError> {
        let document = absolutize(&self.document)?;
        let base_dir = match &self.base_dir {
            Some(dir) => absolutize(dir)?,
            None => absolutize(Path::new("."))?,
        };
        let output_dir = self.output_dir.as_deref().map(absolutize).transpose()?;
        let cache_dir = self.cache_dir.as_deref().map(absolutize).transpose()?;
        let search_path = self
            .search_path
            .iter()
            .map(|p| absolutize(p))
            .collect::<Result<Vec<_>, _>>()?;

        let class = match self.document_class {
            Some(name) if name.trim().is_empty() => {
                return Err(ConfigurationError::EmptyDocumentClass)
            }
            Some(name) => DocumentClass::Explicit {
                name,
                attributes: self.document_attributes,
            },
            None => DocumentClass::Preset(self.kind),
        };

        for pattern in &self.related_paths {
            globset::Glob::new(pattern).map_err(|e| ConfigurationError::InvalidPattern {
                pattern: pattern.clone(),
                error: e.to_string(),
            })?;
        }

        let config = BuildConfig {
            document,
            base_dir,
            output_dir,
            output_name: self.output_name,
            cache_dir,
            class,
            language: self.language,
            draft: self.draft,
            cache_enabled: self.cache_enabled,
            verbose: self.verbose,
            search_path,
            related_paths: self.related_paths,
            compiler: self
                .compiler
                .unwrap_or_else(|| DEFAULT_COMPILER.to_string()),
        };

        config.validate()?;
        Ok(config)
    }
}

fn absolutize(path: &Path) -> Result<PathBuf, ConfigurationError> {
    std::path::absolute(path).map_err(|error| ConfigurationError::UnresolvablePath {
        path: path.to_path_buf(),
        error,
    })
}
