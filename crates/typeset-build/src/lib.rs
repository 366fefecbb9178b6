//! Typeset build infrastructure
//!
//! Drives a LaTeX compiler over a single document:
//! - Build configuration and validation
//! - Preamble synthesis (document class, picture externalization, locale)
//! - Compiler invocation with captured or passthrough output
//! - Log classification into errors and warnings
//! - Continuous mode with debounced rebuilds
//! - Removal of compiler by-products

pub mod clean;
pub mod config;
pub mod error;
pub mod invoker;
pub mod log;
pub mod orchestrator;
pub mod preamble;
pub mod related;
pub mod report;
pub mod watch;

// Re-export main types
pub use clean::{clean, is_auxiliary, AUXILIARY_EXTENSIONS};
pub use config::{
    BuildConfig, BuildConfigBuilder, DocumentClass, DocumentKind, DEFAULT_COMPILER,
    DOCUMENT_EXTENSION,
};
pub use error::{BuildError, BuildResult, ConfigurationError, WatchError};
pub use invoker::{compiler_args, invoke, CapturedOutput, SEARCH_PATH_VAR};
pub use log::{parse_log, Message, MessageKind};
pub use orchestrator::{BuildReport, Orchestrator};
pub use preamble::{build_preamble, PreambleDraft};
pub use related::WatchSet;
pub use report::{CollectingReporter, OutputStream, ReportEntry, Reporter, TracingReporter};
pub use watch::{
    ContinuousWatcher, Debouncer, StopHandle, WatchOptions, WatchOutcome, WatchSession,
    DEFAULT_DEBOUNCE,
};
