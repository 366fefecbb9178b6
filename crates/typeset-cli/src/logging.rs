//! Diagnostic logging setup

use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter; `RUST_LOG` is the fallback
pub const LOG_ENV: &str = "TYPESET_LOG";

/// Install the global stderr subscriber
///
/// `level` applies when neither `TYPESET_LOG` nor `RUST_LOG` is set.
pub fn init_subscriber(level: &str) {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .compact();

    // no-op if a subscriber is already installed
    let _ = subscriber.try_init();
}
