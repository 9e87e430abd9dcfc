//! The Redis-backed publish/subscribe fabric every component talks through.
//!
//! Delivery is at-most-once and best-effort: a subscriber that falls behind
//! has its oldest buffered message dropped in favour of the newest one
//! rather than stalling the publisher (see [`BusError`] docs and
//! `DESIGN.md` for the accepted tradeoff versus Redis's own
//! fire-and-forget `PUBLISH` semantics, which already drop messages for any
//! subscriber that isn't currently listening).

use kestrel_core::envelope::Envelope;
use redis::AsyncCommands;
use serde::{de::DeserializeOwned, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::BusError;

/// Default bound for a subscriber's message queue. Chosen generously over
/// the original's unbounded Python queues: a bounded queue gives a falling-
/// behind subscriber observable backpressure (a warning) instead of
/// unbounded memory growth.
pub const DEFAULT_QUEUE_DEPTH: usize = 1_024;

#[derive(Clone)]
pub struct MessageBus {
    client: redis::Client,
    conn: redis::aio::ConnectionManager,
}

impl MessageBus {
    pub async fn connect(redis_url: &str) -> Result<Self, BusError> {
        let client = redis::Client::open(redis_url)?;
        let conn = client.get_connection_manager().await?;
        Ok(Self { client, conn })
    }

    /// Publishes `value` on `topic`, tagging the envelope with
    /// `correlation_id` for request/response exchanges (see
    /// [`kestrel_core::topic::RESPONSE`]).
    pub async fn publish<T>(
        &self,
        topic: &str,
        value: T,
        correlation_id: Option<Uuid>,
    ) -> Result<(), BusError>
    where
        T: Serialize,
    {
        let mut envelope = Envelope::new(topic, value);
        envelope.correlation_id = correlation_id;
        let bytes = bincode::serialize(&envelope).map_err(|source| BusError::Encode {
            topic: topic.to_string(),
            source,
        })?;

        let mut conn = self.conn.clone();
        let _: i64 = conn.publish(topic, bytes).await?;
        Ok(())
    }

    /// Sets a plain key/value pair, optionally with a TTL. Used for
    /// out-of-band shared state such as the circuit breaker's counters.
    pub async fn set_key(
        &self,
        key: &str,
        value: &str,
        ttl_secs: Option<u64>,
    ) -> Result<(), BusError> {
        let mut conn = self.conn.clone();
        match ttl_secs {
            Some(ttl) => conn.set_ex(key, value, ttl).await?,
            None => conn.set(key, value).await?,
        }
        Ok(())
    }

    pub async fn get_key(&self, key: &str) -> Result<Option<String>, BusError> {
        let mut conn = self.conn.clone();
        Ok(conn.get(key).await?)
    }

    pub async fn incr(&self, key: &str, delta: i64) -> Result<i64, BusError> {
        let mut conn = self.conn.clone();
        Ok(conn.incr(key, delta).await?)
    }

    pub async fn delete_key(&self, key: &str) -> Result<(), BusError> {
        let mut conn = self.conn.clone();
        let _: i64 = conn.del(key).await?;
        Ok(())
    }

    /// Subscribes to `topic`, spawning a background task that decodes every
    /// published [`Envelope<T>`] and forwards it to the returned receiver.
    /// The task exits once the receiver (or the bus's underlying
    /// connection) is dropped.
    pub async fn subscribe<T>(&self, topic: &str) -> Result<mpsc::Receiver<Envelope<T>>, BusError>
    where
        T: DeserializeOwned + Send + 'static,
    {
        self.subscribe_with_capacity(topic, DEFAULT_QUEUE_DEPTH).await
    }

    pub async fn subscribe_with_capacity<T>(
        &self,
        topic: &str,
        capacity: usize,
    ) -> Result<mpsc::Receiver<Envelope<T>>, BusError>
    where
        T: DeserializeOwned + Send + 'static,
    {
        let mut pubsub = self.client.get_async_pubsub().await?;
        pubsub.subscribe(topic).await?;

        let (tx, rx) = mpsc::channel(capacity);
        let topic_owned = topic.to_string();

        tokio::spawn(async move {
            use futures_util::StreamExt;
            let mut stream = pubsub.on_message();
            while let Some(msg) = stream.next().await {
                let payload: Vec<u8> = match msg.get_payload() {
                    Ok(p) => p,
                    Err(err) => {
                        warn!(topic = %topic_owned, %err, "failed to read redis payload");
                        continue;
                    }
                };
                let envelope: Envelope<T> = match bincode::deserialize(&payload) {
                    Ok(e) => e,
                    Err(err) => {
                        warn!(topic = %topic_owned, %err, "failed to decode envelope, dropping message");
                        continue;
                    }
                };
                if tx.try_send(envelope).is_err() {
                    warn!(
                        topic = %topic_owned,
                        "subscriber queue full, dropping newest message"
                    );
                }
            }
            debug!(topic = %topic_owned, "subscriber task ended");
        });

        Ok(rx)
    }
}

impl std::fmt::Debug for MessageBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageBus").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Sample {
        symbol: String,
        qty: i64,
    }

    #[test]
    fn envelope_round_trips_through_bincode() {
        let mut envelope = Envelope::new(
            "candlestick:BTCUSDT",
            Sample {
                symbol: "BTCUSDT".to_string(),
                qty: 42,
            },
        );
        envelope.correlation_id = Some(Uuid::new_v4());

        let bytes = bincode::serialize(&envelope).unwrap();
        let decoded: Envelope<Sample> = bincode::deserialize(&bytes).unwrap();

        assert_eq!(decoded, envelope);
    }
}
