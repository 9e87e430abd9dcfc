use thiserror::Error;

/// Top-level error aggregation, mirroring the per-crate `thiserror` enums
/// (`kestrel_bus::BusError`, `kestrel_gateway::GatewayError`, ...) that fold
/// into this type at the component boundary the supervisor wires together.
///
/// A [`KestrelError::Fatal`] is not recoverable: the supervisor logs it and
/// exits the process rather than attempting to restart the offending task.
#[derive(Debug, Error)]
pub enum KestrelError {
    #[error("bus error: {0}")]
    Bus(String),

    #[error("gateway error: {0}")]
    Gateway(String),

    #[error("risk error: {0}")]
    Risk(String),

    #[error("execution error: {0}")]
    Execution(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("fatal error, shutting down: {0}")]
    Fatal(String),
}
