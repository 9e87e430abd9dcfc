//! Structured logging bootstrap shared by every binary in the workspace.

use tracing_subscriber::{fmt, EnvFilter};

/// Initialises a `tracing` subscriber reading its filter from `RUST_LOG`,
/// defaulting to `info` when unset. Call once, at process start.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_level(true)
        .init();
}
