/// Build system error types
use std::path::PathBuf;
use thiserror::Error;

pub type BuildResult<T> = Result<T, BuildError>;

/// Invalid build request, detected before any process is spawned.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("Document \"{}\" does not exist", .0.display())]
    DocumentNotFound(PathBuf),

    #[error("Document \"{}\" does not have a .{extension} extension", .path.display())]
    InvalidExtension {
        path: PathBuf,
        extension: &'static str,
    },

    #[error("Base directory \"{}\" does not exist", .0.display())]
    BaseDirNotFound(PathBuf),

    #[error("Output directory \"{}\" does not exist", .0.display())]
    OutputDirNotFound(PathBuf),

    #[error("Cache directory \"{}\" does not exist", .0.display())]
    CacheDirNotFound(PathBuf),

    #[error("Unknown document kind '{0}' (expected default, article, beamer, beamer-handout or beamer-article)")]
    UnknownKind(String),

    #[error("Document class cannot be empty")]
    EmptyDocumentClass,

    #[error("Invalid related path pattern '{pattern}': {error}")]
    InvalidPattern { pattern: String, error: String },

    #[error("Invalid search path: {0}")]
    InvalidSearchPath(String),

    #[error("Cannot resolve path {}: {error}", .path.display())]
    UnresolvablePath {
        path: PathBuf,
        error: std::io::Error,
    },
}

#[derive(Debug, Error)]
pub enum BuildError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error("Failed to start compiler '{program}': {error}")]
    Invocation {
        program: String,
        error: std::io::Error,
    },

    #[error("I/O error at {path}: {error}")]
    IoError {
        path: PathBuf,
        error: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl BuildError {
    /// Create an invocation error for a compiler that could not be started
    pub fn invocation(program: impl Into<String>, error: std::io::Error) -> Self {
        Self::Invocation {
            program: program.into(),
            error,
        }
    }

    /// Create an I/O error with path context
    pub fn io(path: impl Into<PathBuf>, error: std::io::Error) -> Self {
        Self::IoError {
            path: path.into(),
            error,
        }
    }

    /// Whether the error was raised by validation rather than by the compiler run
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }
}

/// Failure establishing or reading the filesystem watch.
#[derive(Debug, Error)]
pub enum WatchError {
    #[error("Failed to watch {}: {error}", .path.display())]
    Setup {
        path: PathBuf,
        error: notify::Error,
    },

    #[error("Failed to create file watcher: {0}")]
    Create(notify::Error),

    #[error("File watcher reported an error: {0}")]
    Receive(notify::Error),

    #[error("File watcher channel closed unexpectedly")]
    ChannelClosed,

    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
}

impl WatchError {
    /// Create a registration error for a watched directory
    pub fn setup(path: impl Into<PathBuf>, error: notify::Error) -> Self {
        Self::Setup {
            path: path.into(),
            error,
        }
    }
}
