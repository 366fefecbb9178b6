//! Subcommand implementations and the target resolution they share

pub mod build;
pub mod clean;
pub mod list;
pub mod watch;

use anyhow::{bail, Context, Result};
use clap::Args;
use std::path::{Path, PathBuf};
use typeset_build::{BuildConfig, BuildConfigBuilder, DocumentKind, DOCUMENT_EXTENSION};
use typeset_config::{Config, ConfigLoader};

/// Flags shared by `build` and `watch`; they override typeset.toml
#[derive(Args, Debug, Clone)]
pub struct BuildOptions {
    /// Draft mode: check the document without writing output
    #[arg(long)]
    pub draft: bool,
    /// Pass compiler output through instead of summarizing it
    #[arg(long, short = 'v')]
    pub verbose: bool,
    /// Compiler executable
    #[arg(long)]
    pub compiler: Option<String>,
    /// Document type preset
    #[arg(long, value_parser = parse_kind)]
    pub kind: Option<DocumentKind>,
    /// Enable picture externalization
    #[arg(long)]
    pub cache: bool,
    /// Settle time in milliseconds before a rebuild (watch mode)
    #[arg(long, default_value_t = 300)]
    pub debounce: u64,
}

fn parse_kind(value: &str) -> Result<DocumentKind, String> {
    value.parse().map_err(|e: typeset_build::ConfigurationError| e.to_string())
}

/// A resolved build request with a label for messages
pub struct Target {
    pub label: String,
    pub config: BuildConfig,
}

/// Load typeset.toml from the given file or by searching upwards from the current directory
pub fn load_config(config_file: Option<&Path>) -> Result<Config> {
    let mut loader = ConfigLoader::new();
    match config_file {
        Some(path) => loader
            .load_from_file(path)
            .with_context(|| format!("Failed to load {}", path.display())),
        None => {
            let cwd = std::env::current_dir().context("Failed to determine current directory")?;
            loader
                .load_from_directory(&cwd)
                .context("Failed to load project configuration")
        }
    }
}

/// Resolve command-line targets to validated build configurations
///
/// No targets means every declared document.
pub fn resolve_targets(
    config: &Config,
    targets: &[String],
    options: &BuildOptions,
) -> Result<Vec<Target>> {
    let names: Vec<String> = if targets.is_empty() {
        let ids: Vec<String> = config.project.ids().map(str::to_string).collect();
        if ids.is_empty() {
            bail!(
                "No documents declared; pass a .{} file or add [documents.<id>] to typeset.toml",
                DOCUMENT_EXTENSION
            );
        }
        ids
    } else {
        targets.to_vec()
    };

    names
        .iter()
        .map(|name| {
            let builder = builder_for(config, name, true)?;
            let build = apply_options(builder, options)
                .build()
                .with_context(|| format!("Invalid configuration for '{}'", name))?;
            Ok(Target {
                label: name.clone(),
                config: build,
            })
        })
        .collect()
}

/// Documents named on the command line, or all declared ones, as
/// `(label, output directory)` pairs for cleaning
pub fn output_locations(config: &Config, targets: &[String]) -> Result<Vec<(String, PathBuf)>> {
    let names: Vec<String> = if targets.is_empty() {
        config.project.ids().map(str::to_string).collect()
    } else {
        targets.to_vec()
    };

    names
        .iter()
        .map(|name| {
            let build = builder_for(config, name, false)?
                .build()
                .with_context(|| format!("Invalid configuration for '{}'", name))?;
            let dir = build
                .output_dir()
                .unwrap_or_else(|| build.base_dir())
                .to_path_buf();
            Ok((name.clone(), dir))
        })
        .collect()
}

/// Builder for a document path or a declared document; `prepare` creates its
/// output and cache directories
fn builder_for(config: &Config, name: &str, prepare: bool) -> Result<BuildConfigBuilder> {
    if is_document_path(name) {
        return Ok(config.builder_for_file(Path::new(name)));
    }

    if prepare {
        config
            .ensure_output_dirs(name)
            .with_context(|| format!("Failed to prepare '{}'", name))?;
    }
    Ok(config.builder_for(name)?)
}

fn apply_options(mut builder: BuildConfigBuilder, options: &BuildOptions) -> BuildConfigBuilder {
    if options.draft {
        builder = builder.with_draft(true);
    }
    if options.verbose {
        builder = builder.with_verbose(true);
    }
    if options.cache {
        builder = builder.with_cache(true);
    }
    if let Some(kind) = options.kind {
        builder = builder.with_kind(kind);
    }
    if let Some(compiler) = &options.compiler {
        builder = builder.with_compiler(compiler);
    }
    builder
}

fn is_document_path(name: &str) -> bool {
    Path::new(name)
        .extension()
        .is_some_and(|ext| ext == DOCUMENT_EXTENSION)
}
