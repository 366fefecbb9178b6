use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

mod commands;
mod config;
mod logging;
mod reporter;

use reporter::ConsoleReporter;

/// Typeset LaTeX documents.
///
/// Compiles documents declared in typeset.toml (or given as .tex files)
/// through a generated preamble, reports errors and warnings from the
/// compiler log, and rebuilds automatically in watch mode.
///
/// EXAMPLES:
///     typeset build                 Build every declared document
///     typeset build thesis          Build one document
///     typeset build paper.tex       Build an undeclared document
///     typeset watch slides          Rebuild on every change
///     typeset clean                 Remove auxiliary files
///     typeset list                  Show build targets
///
/// ENVIRONMENT VARIABLES:
///     TYPESET_COMPILER   Compiler executable (default: pdflatex)
///     TYPESET_DRAFT      Set to '1' to build in draft mode
///     TYPESET_VERBOSE    Set to '1' to pass compiler output through
///     TYPESET_LOG        Log filter (e.g. 'debug', 'typeset_build=trace')
///     NO_COLOR           Set to disable colored output
#[derive(Parser)]
#[command(name = "typeset")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to the project file (default: nearest typeset.toml)
    #[arg(long, short = 'c', global = true)]
    config: Option<PathBuf>,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    no_color: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build documents
    ///
    /// Each argument is a document identifier, a target name (build-<id>)
    /// or a path to a .tex file. Without arguments every declared document
    /// is built.
    ///
    /// EXAMPLES:
    ///     typeset build                   Build all documents
    ///     typeset build thesis slides     Build two documents
    ///     typeset build thesis --draft    Draft mode (no PDF output)
    ///     typeset build thesis --watch    Rebuild on changes
    #[command(visible_alias = "b")]
    Build {
        /// Documents to build
        targets: Vec<String>,
        /// Watch for file changes and rebuild
        #[arg(long, short = 'w')]
        watch: bool,
        #[command(flatten)]
        options: commands::BuildOptions,
    },

    /// Build documents and rebuild them whenever their sources change
    ///
    /// Compiler output is passed through while watching. Stop with Ctrl+C.
    ///
    /// EXAMPLES:
    ///     typeset watch thesis                Watch one document
    ///     typeset watch thesis --debounce 500 Longer settle window
    #[command(visible_alias = "w")]
    Watch {
        /// Documents to watch
        targets: Vec<String>,
        #[command(flatten)]
        options: commands::BuildOptions,
    },

    /// Remove auxiliary files left by the compiler
    ///
    /// Deletes .aux, .auxlock, .gz, .log, .nav, .out, .pdf, .snm and .toc
    /// files. Without --dir, cleans the output directory of each document.
    ///
    /// EXAMPLES:
    ///     typeset clean                   Clean every document
    ///     typeset clean thesis            Clean one document
    ///     typeset clean --dir build       Clean a directory
    Clean {
        /// Documents to clean
        targets: Vec<String>,
        /// Directory to clean instead of the documents' output directories
        #[arg(long, short = 'd')]
        dir: Option<PathBuf>,
    },

    /// List build targets declared in typeset.toml
    #[command(visible_alias = "ls")]
    List,

    /// Generate shell completions
    ///
    /// EXAMPLES:
    ///     typeset completions bash > ~/.bash_completions/typeset.bash
    ///     typeset completions zsh > ~/.zfunc/_typeset
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let cli_config = config::Config::from_env();

    let verbose = match &cli.command {
        Commands::Build { options, .. } | Commands::Watch { options, .. } => options.verbose,
        _ => false,
    };
    logging::init_subscriber(if verbose { "debug" } else { "warn" });

    let reporter = Arc::new(ConsoleReporter::new(cli.no_color || cli_config.no_color));
    let config_file = cli.config.as_deref();

    match cli.command {
        Commands::Build {
            targets,
            watch,
            options,
        } => {
            if watch {
                commands::watch::run(config_file, &targets, &options, reporter)?;
            } else {
                commands::build::run(config_file, &targets, &options, reporter)?;
            }
        }
        Commands::Watch { targets, options } => {
            commands::watch::run(config_file, &targets, &options, reporter)?;
        }
        Commands::Clean { targets, dir } => {
            commands::clean::run(config_file, &targets, dir.as_deref())?;
        }
        Commands::List => {
            commands::list::run(config_file)?;
        }
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "typeset", &mut io::stdout());
        }
    }

    Ok(())
}
