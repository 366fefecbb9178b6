//! Watch-set resolution
//!
//! Determines which directories continuous mode registers and which changed
//! paths should cause a rebuild.

use crate::clean::is_auxiliary;
use crate::config::{BuildConfig, DOCUMENT_EXTENSION};
use crate::error::ConfigurationError;
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Directories to watch plus the filter applied to change events
#[derive(Debug, Clone)]
pub struct WatchSet {
    dirs: Vec<PathBuf>,
    base_dir: PathBuf,
    document: PathBuf,
    document_dir: PathBuf,
    related: GlobSet,
    excluded: Vec<PathBuf>,
}

impl WatchSet {
    /// Resolve the watch set for a configuration
    ///
    /// The document's directory is always watched. Every file under the base
    /// directory matched by a related-path pattern adds its parent directory.
    pub fn resolve(config: &BuildConfig) -> Result<Self, ConfigurationError> {
        let base_dir = canonical(config.base_dir());
        let document = canonical(config.document());
        let document_dir = document
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| base_dir.clone());

        let related = related_globs(config.related_paths())?;

        let mut dirs = BTreeSet::new();
        dirs.insert(document_dir.clone());

        if !config.related_paths().is_empty() {
            for entry in WalkDir::new(&base_dir)
                .into_iter()
                .filter_entry(|e| e.file_name() != ".git")
                .filter_map(Result::ok)
                .filter(|e| e.file_type().is_file())
            {
                let Ok(relative) = entry.path().strip_prefix(&base_dir) else {
                    continue;
                };
                if related.is_match(relative) {
                    if let Some(parent) = entry.path().parent() {
                        dirs.insert(parent.to_path_buf());
                    }
                }
            }
        }

        // an output or cache dir that holds the document itself is not excluded;
        // the auxiliary filter still drops the compiler's by-products there
        let excluded = config
            .output_dir()
            .into_iter()
            .chain(config.cache_dir())
            .map(canonical)
            .filter(|dir| !document_dir.starts_with(dir))
            .collect();

        Ok(Self {
            dirs: dirs.into_iter().collect(),
            base_dir,
            document,
            document_dir,
            related,
            excluded,
        })
    }

    /// Directories to register, sorted and deduplicated
    pub fn dirs(&self) -> &[PathBuf] {
        &self.dirs
    }

    /// Whether a change to `path` should trigger a rebuild
    pub fn is_relevant(&self, path: &Path) -> bool {
        let path = canonical(path);

        if is_auxiliary(&path) || self.excluded.iter().any(|dir| path.starts_with(dir)) {
            return false;
        }

        if path == self.document {
            return true;
        }

        if let Ok(relative) = path.strip_prefix(&self.base_dir) {
            if self.related.is_match(relative) {
                return true;
            }
        }

        path.parent() == Some(self.document_dir.as_path())
            && path.extension().and_then(|e| e.to_str()) == Some(DOCUMENT_EXTENSION)
    }
}

fn related_globs(patterns: &[String]) -> Result<GlobSet, ConfigurationError> {
    let invalid = |pattern: &str, error: globset::Error| ConfigurationError::InvalidPattern {
        pattern: pattern.to_string(),
        error: error.to_string(),
    };

    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern).map_err(|e| invalid(pattern, e))?);
    }
    builder.build().map_err(|e| invalid(&patterns.join(", "), e))
}

/// Canonical form when the path exists, the path itself otherwise
fn canonical(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    struct Project {
        dir: TempDir,
    }

    impl Project {
        fn new(files: &[&str]) -> Self {
            let dir = TempDir::new().unwrap();
            for file in files {
                let path = dir.path().join(file);
                fs::create_dir_all(path.parent().unwrap()).unwrap();
                fs::write(path, "").unwrap();
            }
            Self { dir }
        }

        fn root(&self) -> PathBuf {
            self.dir.path().canonicalize().unwrap()
        }
    }

    #[test]
    fn test_document_dir_only() {
        let project = Project::new(&["doc/main.tex"]);
        let config = BuildConfig::builder(project.root().join("doc/main.tex"))
            .with_base_dir(project.root())
            .build()
            .unwrap();

        let set = WatchSet::resolve(&config).unwrap();
        assert_eq!(set.dirs(), &[project.root().join("doc")]);
    }

    #[test]
    fn test_related_dirs_unioned_and_deduplicated() {
        let project = Project::new(&[
            "main.tex",
            "chapters/one.tex",
            "chapters/two.tex",
            "figures/plot.tikz",
            "other/ignored.md",
        ]);
        let config = BuildConfig::builder(project.root().join("main.tex"))
            .with_base_dir(project.root())
            .with_related_paths(vec![
                "chapters/*.tex".to_string(),
                "figures/*.tikz".to_string(),
                "main.tex".to_string(),
            ])
            .build()
            .unwrap();

        let set = WatchSet::resolve(&config).unwrap();
        assert_eq!(
            set.dirs(),
            &[
                project.root(),
                project.root().join("chapters"),
                project.root().join("figures"),
            ]
        );
    }

    #[test]
    fn test_relevance() {
        let project = Project::new(&["main.tex", "chapters/one.tex", "out/.keep"]);
        let root = project.root();
        let config = BuildConfig::builder(root.join("main.tex"))
            .with_base_dir(&root)
            .with_output_dir(root.join("out"))
            .with_related_paths(vec!["chapters/*.tex".to_string()])
            .build()
            .unwrap();
        let set = WatchSet::resolve(&config).unwrap();

        assert!(set.is_relevant(&root.join("main.tex")));
        assert!(set.is_relevant(&root.join("appendix.tex")));
        assert!(set.is_relevant(&root.join("chapters/one.tex")));
        assert!(!set.is_relevant(&root.join("main.aux")));
        assert!(!set.is_relevant(&root.join("main.pdf")));
        assert!(!set.is_relevant(&root.join("out/main.tex")));
        assert!(!set.is_relevant(&root.join("notes.md")));
        assert!(!set.is_relevant(&root.join("chapters/draft.md")));
    }

    #[test]
    fn test_output_dir_at_base_dir_keeps_sources_relevant() {
        let project = Project::new(&["main.tex", "chapters/one.tex"]);
        let root = project.root();
        let config = BuildConfig::builder(root.join("main.tex"))
            .with_base_dir(&root)
            .with_output_dir(&root)
            .with_cache_dir(&root)
            .with_related_paths(vec!["chapters/*.tex".to_string()])
            .build()
            .unwrap();
        let set = WatchSet::resolve(&config).unwrap();

        assert!(set.is_relevant(&root.join("main.tex")));
        assert!(set.is_relevant(&root.join("chapters/one.tex")));
        assert!(!set.is_relevant(&root.join("main.pdf")));
        assert!(!set.is_relevant(&root.join("main.log")));
    }
}
