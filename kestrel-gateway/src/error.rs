use thiserror::Error;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("websocket transport error: {0}")]
    Transport(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("rest request failed: {0}")]
    Rest(#[from] reqwest::Error),

    #[error("failed to decode wire message: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("bus error: {0}")]
    Bus(#[from] kestrel_bus::BusError),

    #[error("missing credentials: {0}")]
    MissingCredentials(String),

    #[error("exchange rejected request: {0}")]
    ExchangeRejected(String),
}
