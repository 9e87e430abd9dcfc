use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("bus error: {0}")]
    Bus(#[from] kestrel_bus::BusError),

    #[error("order {order_id} not found")]
    NotFound { order_id: u64 },

    #[error("request to '{topic}' timed out")]
    Timeout { topic: String },
}
