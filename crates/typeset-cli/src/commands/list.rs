//! List command - show declared build targets

use super::load_config;
use anyhow::Result;
use colored::*;
use std::path::Path;
use typeset_config::PROJECT_FILE;

/// Run the list command
pub fn run(config_file: Option<&Path>) -> Result<()> {
    let config = load_config(config_file)?;
    let targets = config.project.targets();

    if targets.is_empty() {
        println!("No documents declared in {}", PROJECT_FILE);
        return Ok(());
    }

    for (target, id) in targets {
        let (_, entry) = config.project.document(&id)?;
        println!("{}  {}", target.cyan().bold(), entry.document.display());
    }
    Ok(())
}
