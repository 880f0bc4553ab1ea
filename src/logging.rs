//! # Logging Setup
//!
//! Installs the global `tracing` subscriber. Diagnostics go to stderr so
//! stdout stays free for anything piped out of the tool; `RUST_LOG`
//! overrides the default `info` filter.

use tracing_subscriber::EnvFilter;

pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
