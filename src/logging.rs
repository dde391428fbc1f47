//! Logging configuration for querygate.
//!
//! Logs go to stderr so stdout carries only the JSON response. Access-control
//! decisions are emitted under the `audit` target, so they can be filtered
//! on their own (e.g. `RUST_LOG=audit=warn`).

use tracing_subscriber::EnvFilter;

/// Default filter when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "info";

/// Initializes logging to stderr.
pub fn init_stderr_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(std::io::stderr)
        .init();
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}
