//! Configuration Loader
//!
//! Handles loading and merging configuration from multiple sources with proper precedence.

use crate::global::GlobalConfig;
use crate::project::{Defaults, DocumentEntry, ProjectConfig, PROJECT_FILE};
use crate::{ConfigError, ConfigResult};
use std::env;
use std::path::{Path, PathBuf};
use tracing::debug;
use typeset_build::{BuildConfig, BuildConfigBuilder};

/// Configuration loader
///
/// Loads configuration from multiple sources and merges them with proper precedence:
/// 1. Global config (~/.typeset/config.toml) - lowest priority
/// 2. Project config (./typeset.toml) - overrides global
/// 3. Environment variables (TYPESET_*) - overrides project
/// 4. CLI flags - highest priority (handled by caller)
pub struct ConfigLoader {
    /// Cached global config path
    global_config_path: Option<PathBuf>,
}

/// Values taken from `TYPESET_*` environment variables
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnvOverrides {
    pub compiler: Option<String>,
    pub draft: Option<bool>,
    pub verbose: Option<bool>,
}

impl EnvOverrides {
    /// Read `TYPESET_COMPILER`, `TYPESET_DRAFT` and `TYPESET_VERBOSE`
    pub fn from_env() -> ConfigResult<Self> {
        Ok(Self {
            compiler: env::var("TYPESET_COMPILER").ok().filter(|c| !c.is_empty()),
            draft: env_flag("TYPESET_DRAFT")?,
            verbose: env_flag("TYPESET_VERBOSE")?,
        })
    }
}

fn env_flag(name: &str) -> ConfigResult<Option<bool>> {
    let Ok(value) = env::var(name) else {
        return Ok(None);
    };

    match value.to_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(Some(true)),
        "false" | "0" | "no" | "" => Ok(Some(false)),
        _ => Err(ConfigError::InvalidValue {
            field: name.to_string(),
            reason: format!("expected a boolean, got '{}'", value),
        }),
    }
}

/// Merged configuration result
#[derive(Debug, Clone)]
pub struct Config {
    /// Project configuration
    pub project: ProjectConfig,

    /// Global configuration
    pub global: GlobalConfig,

    /// Environment overrides
    pub env: EnvOverrides,

    /// Project root directory (where typeset.toml was found)
    pub project_root: Option<PathBuf>,

    /// Directory the search started from
    pub working_dir: PathBuf,
}

impl ConfigLoader {
    /// Create a new configuration loader
    pub fn new() -> Self {
        Self {
            global_config_path: None,
        }
    }

    /// Use a specific global config file instead of ~/.typeset/config.toml
    pub fn with_global_config_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.global_config_path = Some(path.into());
        self
    }

    /// Load configuration starting from the given directory
    ///
    /// Walks up the directory tree to find typeset.toml, then loads the
    /// global config if it exists.
    pub fn load_from_directory(&mut self, start_dir: &Path) -> ConfigResult<Config> {
        let working_dir = std::path::absolute(start_dir)?;
        let (project_root, project) = self.find_project_config(&working_dir)?;
        let global = self.load_global_config()?;

        Ok(Config {
            project,
            global,
            env: EnvOverrides::from_env()?,
            project_root,
            working_dir,
        })
    }

    /// Load configuration from a specific project config file
    pub fn load_from_file(&mut self, config_path: &Path) -> ConfigResult<Config> {
        let config_path = std::path::absolute(config_path)?;
        let project = ProjectConfig::load_from_file(&config_path)?;
        let global = self.load_global_config()?;

        let project_root = config_path.parent().map(|p| p.to_path_buf());
        let working_dir = match &project_root {
            Some(root) => root.clone(),
            None => std::path::absolute(".")?,
        };

        Ok(Config {
            project,
            global,
            env: EnvOverrides::from_env()?,
            project_root,
            working_dir,
        })
    }

    /// Find project configuration by walking up directory tree
    fn find_project_config(
        &self,
        start_dir: &Path,
    ) -> ConfigResult<(Option<PathBuf>, ProjectConfig)> {
        let mut current = start_dir.to_path_buf();

        loop {
            let config_path = current.join(PROJECT_FILE);

            if config_path.exists() {
                debug!(path = %config_path.display(), "loading project config");
                let project_config = ProjectConfig::load_from_file(&config_path)?;
                return Ok((Some(current), project_config));
            }

            match current.parent() {
                Some(parent) => current = parent.to_path_buf(),
                None => return Ok((None, ProjectConfig::default())),
            }
        }
    }

    /// Load global configuration; a missing file yields the defaults
    fn load_global_config(&mut self) -> ConfigResult<GlobalConfig> {
        let path = match &self.global_config_path {
            Some(path) => path.clone(),
            None => match GlobalConfig::global_config_path() {
                Ok(path) => {
                    self.global_config_path = Some(path.clone());
                    path
                }
                Err(ConfigError::HomeNotFound) => return Ok(GlobalConfig::default()),
                Err(e) => return Err(e),
            },
        };

        if !path.exists() {
            return Ok(GlobalConfig::default());
        }

        debug!(path = %path.display(), "loading global config");
        GlobalConfig::load_from_file(&path)
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    /// Directory project-relative paths resolve against
    pub fn root(&self) -> &Path {
        self.project_root.as_deref().unwrap_or(&self.working_dir)
    }

    /// Get the project root directory
    pub fn project_root(&self) -> Option<&Path> {
        self.project_root.as_deref()
    }

    /// Check if this is a project (has typeset.toml)
    pub fn is_project(&self) -> bool {
        self.project_root.is_some()
    }

    /// Unvalidated builder for a declared document, so callers can layer CLI flags
    pub fn builder_for(&self, id: &str) -> ConfigResult<BuildConfigBuilder> {
        let (_, entry) = self.project.document(id)?;
        let root = self.root();

        let mut builder = BuildConfig::builder(root.join(&entry.document)).with_base_dir(
            entry
                .base_dir
                .as_ref()
                .map(|dir| root.join(dir))
                .unwrap_or_else(|| root.to_path_buf()),
        );

        if let Some(kind) = entry.kind {
            builder = builder.with_kind(kind);
        }
        if let Some(class) = &entry.class {
            builder = builder.with_document_class(class, entry.class_options.clone());
        }
        if let Some(name) = &entry.output_name {
            builder = builder.with_output_name(name);
        }
        if !entry.related.is_empty() {
            builder = builder.with_related_paths(entry.related.clone());
        }

        Ok(self.apply_layers(builder, Some(entry)))
    }

    /// Validated build configuration for a declared document
    pub fn build_config(&self, id: &str) -> ConfigResult<BuildConfig> {
        Ok(self.builder_for(id)?.build()?)
    }

    /// Builder for a document that is not declared in the project file
    ///
    /// Project defaults still apply and the project root is the base directory.
    pub fn builder_for_file(&self, document: &Path) -> BuildConfigBuilder {
        let builder = BuildConfig::builder(self.working_dir.join(document)).with_base_dir(self.root());
        self.apply_layers(builder, None)
    }

    /// Output and cache directories a declared document expects to exist
    pub fn output_dirs(&self, id: &str) -> ConfigResult<Vec<PathBuf>> {
        let (_, entry) = self.project.document(id)?;
        let defaults = self.project.defaults();

        Ok([
            entry.output_dir.as_ref().or(defaults.output_dir.as_ref()),
            entry.cache_dir.as_ref().or(defaults.cache_dir.as_ref()),
        ]
        .into_iter()
        .flatten()
        .map(|dir| self.root().join(dir))
        .collect())
    }

    /// Create the output and cache directories of a declared document
    pub fn ensure_output_dirs(&self, id: &str) -> ConfigResult<()> {
        for dir in self.output_dirs(id)? {
            if !dir.exists() {
                debug!(dir = %dir.display(), "creating directory");
                std::fs::create_dir_all(&dir)?;
            }
        }
        Ok(())
    }

    /// Apply global, defaults, entry and environment layers in precedence order
    fn apply_layers(
        &self,
        mut builder: BuildConfigBuilder,
        entry: Option<&DocumentEntry>,
    ) -> BuildConfigBuilder {
        let root = self.root();
        let defaults = self.project.defaults();

        let compiler = self
            .env
            .compiler
            .clone()
            .or_else(|| entry.and_then(|e| e.compiler.clone()))
            .or_else(|| defaults.compiler.clone())
            .or_else(|| self.global.compiler.clone());
        if let Some(compiler) = compiler {
            builder = builder.with_compiler(compiler);
        }

        let draft = self
            .env
            .draft
            .or_else(|| entry.and_then(|e| e.draft))
            .or(defaults.draft)
            .unwrap_or(false);
        let verbose = self.env.verbose.or(self.global.verbose).unwrap_or(false);
        let cache = entry
            .and_then(|e| e.cache)
            .or(defaults.cache)
            .unwrap_or(false);
        builder = builder
            .with_draft(draft)
            .with_verbose(verbose)
            .with_cache(cache);

        let language = entry
            .and_then(|e| e.language.clone())
            .or(defaults.language.clone());
        if let Some(language) = language {
            builder = builder.with_language(language);
        }

        let output_dir = entry
            .and_then(|e| e.output_dir.as_ref())
            .or(defaults.output_dir.as_ref());
        if let Some(dir) = output_dir {
            builder = builder.with_output_dir(root.join(dir));
        }

        let cache_dir = entry
            .and_then(|e| e.cache_dir.as_ref())
            .or(defaults.cache_dir.as_ref());
        if let Some(dir) = cache_dir {
            builder = builder.with_cache_dir(root.join(dir));
        }

        builder.with_search_path(search_path(root, entry, &defaults))
    }
}

/// Document search path first, then the project-wide entries
fn search_path(root: &Path, entry: Option<&DocumentEntry>, defaults: &Defaults) -> Vec<PathBuf> {
    entry
        .map(|e| e.search_path.as_slice())
        .unwrap_or_default()
        .iter()
        .chain(&defaults.search_path)
        .map(|dir| root.join(dir))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::fs;
    use tempfile::TempDir;

    fn create_config_file(dir: &Path, content: &str) -> PathBuf {
        let config_path = dir.join(PROJECT_FILE);
        fs::write(&config_path, content).unwrap();
        config_path
    }

    fn loader(dir: &Path) -> ConfigLoader {
        ConfigLoader::new().with_global_config_path(dir.join("no-global.toml"))
    }

    #[test]
    #[serial]
    fn test_find_config_in_parent() {
        let temp_dir = TempDir::new().unwrap();
        create_config_file(
            temp_dir.path(),
            r#"
[documents.paper]
document = "paper.tex"
"#,
        );
        let sub_dir = temp_dir.path().join("chapters");
        fs::create_dir(&sub_dir).unwrap();

        let config = loader(temp_dir.path()).load_from_directory(&sub_dir).unwrap();

        assert!(config.is_project());
        assert_eq!(config.project_root(), Some(temp_dir.path()));
        assert_eq!(config.project.targets().len(), 1);
    }

    #[test]
    #[serial]
    fn test_no_project_config() {
        let temp_dir = TempDir::new().unwrap();

        let config = loader(temp_dir.path())
            .load_from_directory(temp_dir.path())
            .unwrap();

        assert!(!config.is_project());
        assert_eq!(config.root(), temp_dir.path());
    }

    #[test]
    #[serial]
    fn test_env_flag_parsing() {
        env::set_var("TYPESET_DRAFT", "yes");
        env::set_var("TYPESET_VERBOSE", "0");
        let overrides = EnvOverrides::from_env().unwrap();
        assert_eq!(overrides.draft, Some(true));
        assert_eq!(overrides.verbose, Some(false));

        env::set_var("TYPESET_DRAFT", "sometimes");
        assert!(matches!(
            EnvOverrides::from_env(),
            Err(ConfigError::InvalidValue { .. })
        ));

        env::remove_var("TYPESET_DRAFT");
        env::remove_var("TYPESET_VERBOSE");
    }

    #[test]
    #[serial]
    fn test_global_config_applies() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("paper.tex"), "").unwrap();
        create_config_file(
            temp_dir.path(),
            r#"
[documents.paper]
document = "paper.tex"
"#,
        );
        let global = temp_dir.path().join("global.toml");
        fs::write(&global, "compiler = \"xelatex\"\nverbose = true\n").unwrap();

        let config = ConfigLoader::new()
            .with_global_config_path(&global)
            .load_from_directory(temp_dir.path())
            .unwrap();
        let build = config.build_config("paper").unwrap();

        assert_eq!(build.compiler(), "xelatex");
        assert!(build.verbose());
    }
}
