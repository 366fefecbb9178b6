//! Clean command - remove auxiliary files

use super::{load_config, output_locations};
use anyhow::{Context, Result};
use colored::*;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// Run the clean command
pub fn run(config_file: Option<&Path>, targets: &[String], dir: Option<&Path>) -> Result<()> {
    let dirs: BTreeSet<PathBuf> = match dir {
        Some(dir) => BTreeSet::from([dir.to_path_buf()]),
        None => {
            let config = load_config(config_file)?;
            output_locations(&config, targets)?
                .into_iter()
                .map(|(_, dir)| dir)
                .filter(|dir| dir.is_dir())
                .collect()
        }
    };

    let mut total = 0;
    for dir in &dirs {
        let removed = typeset_build::clean(dir)
            .with_context(|| format!("Failed to clean {}", dir.display()))?;
        for path in &removed {
            println!("{} {}", "Removed".dimmed(), path.display());
        }
        total += removed.len();
    }

    println!("{} {} file(s)", "Cleaned".green().bold(), total);
    Ok(())
}
