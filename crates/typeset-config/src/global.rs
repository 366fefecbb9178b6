//! Global Configuration (~/.typeset/config.toml)
//!
//! Handles user-level configuration stored in `~/.typeset/config.toml`.

use crate::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Global user configuration from ~/.typeset/config.toml
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct GlobalConfig {
    /// Preferred compiler executable
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compiler: Option<String>,

    /// Pass compiler output through instead of classifying it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verbose: Option<bool>,
}

impl GlobalConfig {
    /// Load global configuration from a file
    pub fn load_from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::NotFound(path.to_path_buf())
            } else {
                ConfigError::IoError(e)
            }
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::TomlParseError {
            file: path.to_path_buf(),
            error: e,
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Validate the global configuration
    pub fn validate(&self) -> ConfigResult<()> {
        if matches!(&self.compiler, Some(compiler) if compiler.trim().is_empty()) {
            return Err(ConfigError::InvalidValue {
                field: "compiler".to_string(),
                reason: "must not be empty".to_string(),
            });
        }
        Ok(())
    }

    /// Get the global config file path (~/.typeset/config.toml)
    pub fn global_config_path() -> ConfigResult<PathBuf> {
        let home = dirs::home_dir().ok_or(ConfigError::HomeNotFound)?;
        Ok(home.join(".typeset").join("config.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_global_config() {
        let config: GlobalConfig = toml::from_str(
            r#"
compiler = "xelatex"
verbose = true
"#,
        )
        .unwrap();

        assert_eq!(config.compiler.as_deref(), Some("xelatex"));
        assert_eq!(config.verbose, Some(true));
    }

    #[test]
    fn test_empty_compiler_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "compiler = \"  \"\n").unwrap();

        assert!(matches!(
            GlobalConfig::load_from_file(&path),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_missing_file() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            GlobalConfig::load_from_file(&dir.path().join("config.toml")),
            Err(ConfigError::NotFound(_))
        ));
    }

    #[test]
    fn test_global_config_path() {
        if let Ok(path) = GlobalConfig::global_config_path() {
            assert!(path.ends_with(".typeset/config.toml"));
        }
    }
}
