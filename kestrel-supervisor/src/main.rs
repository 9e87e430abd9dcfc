//! Binary entrypoint: bootstraps logging, loads configuration from the
//! environment, and runs the supervisor until shutdown.

use kestrel_supervisor::config::Config;
use kestrel_supervisor::supervisor;

#[tokio::main]
async fn main() {
    kestrel_core::logging::init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(err) => {
            tracing::error!(%err, "fatal configuration error");
            std::process::exit(1);
        }
    };

    if let Err(err) = supervisor::run(config).await {
        tracing::error!(%err, "supervisor exited with a fatal error");
        std::process::exit(1);
    }
}
