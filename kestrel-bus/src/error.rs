use thiserror::Error;

#[derive(Debug, Error)]
pub enum BusError {
    #[error("redis connection error: {0}")]
    Connection(#[from] redis::RedisError),

    #[error("failed to encode message for topic '{topic}': {source}")]
    Encode {
        topic: String,
        #[source]
        source: bincode::Error,
    },

    #[error("failed to decode message from topic '{topic}': {source}")]
    Decode {
        topic: String,
        #[source]
        source: bincode::Error,
    },

    #[error("bus is shutting down")]
    Closed,
}
