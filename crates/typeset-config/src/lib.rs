//! Typeset Configuration System
//!
//! Turns declarative project files into validated build configurations:
//! - Project configuration (typeset.toml)
//! - Global user configuration (~/.typeset/config.toml)
//! - Per-document build targets (`build-<id>`)
//!
//! # Configuration Hierarchy
//!
//! Configuration is loaded and merged in the following order (later overrides earlier):
//! 1. Global config (~/.typeset/config.toml)
//! 2. Project defaults (`[defaults]` in typeset.toml)
//! 3. Document entry (`[documents.<id>]` in typeset.toml)
//! 4. Environment variables (TYPESET_*)
//! 5. CLI flags
//!
//! # Example
//!
//! ```no_run
//! use typeset_config::ConfigLoader;
//! use std::path::Path;
//!
//! let mut loader = ConfigLoader::new();
//! let config = loader.load_from_directory(Path::new(".")).unwrap();
//! for (target, id) in config.project.targets() {
//!     println!("{target}: {id}");
//! }
//! ```

pub mod global;
pub mod loader;
pub mod project;

use std::path::PathBuf;
use thiserror::Error;
use typeset_build::ConfigurationError;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to read configuration file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid TOML syntax in {file}: {error}")]
    TomlParseError {
        file: PathBuf,
        error: toml::de::Error,
    },

    #[error("Unknown document '{0}'")]
    UnknownDocument(String),

    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },

    #[error(transparent)]
    Build(#[from] ConfigurationError),

    #[error("Home directory not found")]
    HomeNotFound,
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

// Re-export main types
pub use global::GlobalConfig;
pub use loader::{Config, ConfigLoader, EnvOverrides};
pub use project::{Defaults, DocumentEntry, ProjectConfig, PROJECT_FILE};
