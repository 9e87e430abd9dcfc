//! The wire envelope carried over every [`kestrel-bus`](../kestrel_bus/index.html) channel.
//!
//! `(topic, value, correlation_id?)`, encoded length-prefixed binary on the
//! bus (see `kestrel_bus::codec`). Request/response exchanges thread a
//! fresh [`uuid::Uuid`] through `correlation_id` so a requester can match a
//! reply on a shared response topic.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A decoded bus message, generic over its payload type.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Envelope<T> {
    pub topic: String,
    pub value: T,
    pub correlation_id: Option<Uuid>,
}

impl<T> Envelope<T> {
    pub fn new(topic: impl Into<String>, value: T) -> Self {
        Self {
            topic: topic.into(),
            value,
            correlation_id: None,
        }
    }

    pub fn with_correlation_id(mut self, id: Uuid) -> Self {
        self.correlation_id = Some(id);
        self
    }

    pub fn reply_id(&self) -> Option<Uuid> {
        self.correlation_id
    }
}
