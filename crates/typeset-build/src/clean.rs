//! Removal of compiler by-products

use crate::error::{BuildError, BuildResult};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// Extensions of files the compiler leaves behind
pub const AUXILIARY_EXTENSIONS: &[&str] = &[
    "aux", "auxlock", "gz", "log", "nav", "out", "pdf", "snm", "toc",
];

/// Whether the path names a compiler by-product
pub fn is_auxiliary(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| AUXILIARY_EXTENSIONS.contains(&ext))
}

/// Delete auxiliary files directly inside `dir` and return what was removed
pub fn clean(dir: &Path) -> BuildResult<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(BuildError::io(
            dir,
            std::io::Error::new(std::io::ErrorKind::NotFound, "not a directory"),
        ));
    }

    let mut removed = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1).sort_by_file_name() {
        let entry = entry.map_err(|e| BuildError::io(dir, e.into()))?;
        let path = entry.path();

        if entry.file_type().is_file() && is_auxiliary(path) {
            fs::remove_file(path).map_err(|e| BuildError::io(path, e))?;
            debug!(path = %path.display(), "removed");
            removed.push(path.to_path_buf());
        }
    }

    Ok(removed)
}
