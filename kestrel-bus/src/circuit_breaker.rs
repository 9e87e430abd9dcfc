//! A Redis-backed circuit breaker shared by every process that can place
//! orders, so a trip in one process is visible to all of them immediately.
//!
//! State lives entirely in a handful of well-known Redis keys rather than
//! in-process memory — mirroring the original's `circuit_breaker:*` key
//! scheme — so the breaker survives a process restart and is consistent
//! across the gateway and risk manager without a shared lock.

use chrono::Utc;
use tracing::{error, info, warn};

use crate::bus::MessageBus;
use crate::error::BusError;

const STATE_KEY: &str = "circuit_breaker:state";
const FAILURES_KEY: &str = "circuit_breaker:failures";
const SUCCESS_KEY: &str = "circuit_breaker:success";
const FAILURE_TIME_KEY: &str = "circuit_breaker:failure_time";
const TRIGGERED_KEY: &str = "circuit_breaker:triggered";

const STATE_OPEN: &str = "open";
const STATE_CLOSED: &str = "closed";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Open,
    Closed,
}

#[derive(Debug, Clone)]
pub struct CircuitBreaker {
    bus: MessageBus,
    failure_threshold: u32,
    success_threshold: u32,
    reset_timeout_secs: i64,
}

impl CircuitBreaker {
    pub fn new(
        bus: MessageBus,
        failure_threshold: u32,
        success_threshold: u32,
        reset_timeout_secs: i64,
    ) -> Self {
        Self {
            bus,
            failure_threshold,
            success_threshold,
            reset_timeout_secs,
        }
    }

    /// Returns `true` if a request may proceed. A manually-forced trip
    /// (`force_open`) never auto-clears; an ordinary failure trip clears
    /// itself once `reset_timeout_secs` has elapsed since the last failure.
    pub async fn allow_request(&self) -> Result<bool, BusError> {
        if self.is_manually_triggered().await? {
            return Ok(false);
        }

        match self.state().await? {
            CircuitState::Closed => Ok(true),
            CircuitState::Open => {
                let failure_time = self
                    .bus
                    .get_key(FAILURE_TIME_KEY)
                    .await?
                    .and_then(|s| s.parse::<i64>().ok())
                    .unwrap_or(0);

                if Utc::now().timestamp() - failure_time >= self.reset_timeout_secs {
                    info!("circuit breaker reset timeout elapsed, allowing trial request");
                    Ok(true)
                } else {
                    Ok(false)
                }
            }
        }
    }

    pub async fn record_success(&self) -> Result<(), BusError> {
        if self.state().await? == CircuitState::Closed {
            return Ok(());
        }

        let successes = self.bus.incr(SUCCESS_KEY, 1).await?;
        if successes >= self.success_threshold as i64 {
            info!(successes, "circuit breaker closing after consecutive successes");
            self.close().await?;
        }
        Ok(())
    }

    pub async fn record_failure(&self) -> Result<(), BusError> {
        let failures = self.bus.incr(FAILURES_KEY, 1).await?;
        self.bus
            .set_key(FAILURE_TIME_KEY, &Utc::now().timestamp().to_string(), None)
            .await?;

        if failures >= self.failure_threshold as i64 {
            warn!(failures, "circuit breaker tripping open");
            self.bus.set_key(STATE_KEY, STATE_OPEN, None).await?;
            self.bus.set_key(SUCCESS_KEY, "0", None).await?;
        }
        Ok(())
    }

    /// Trips the breaker open regardless of the failure count, for use by
    /// the risk manager's drawdown watchdog when it orders an emergency
    /// liquidation. Requires [`Self::reset`] to clear.
    pub async fn force_open(&self) -> Result<(), BusError> {
        error!("circuit breaker force-opened");
        self.bus.set_key(TRIGGERED_KEY, "1", None).await?;
        self.bus.set_key(STATE_KEY, STATE_OPEN, None).await?;
        self.bus
            .set_key(FAILURE_TIME_KEY, &Utc::now().timestamp().to_string(), None)
            .await
    }

    /// Clears a manual trip and returns the breaker to `closed`. Intended
    /// to be invoked from an operator-facing admin surface, never
    /// automatically.
    pub async fn reset(&self) -> Result<(), BusError> {
        self.bus.delete_key(TRIGGERED_KEY).await?;
        self.close().await
    }

    async fn close(&self) -> Result<(), BusError> {
        self.bus.set_key(STATE_KEY, STATE_CLOSED, None).await?;
        self.bus.set_key(FAILURES_KEY, "0", None).await?;
        self.bus.set_key(SUCCESS_KEY, "0", None).await
    }

    async fn state(&self) -> Result<CircuitState, BusError> {
        match self.bus.get_key(STATE_KEY).await?.as_deref() {
            Some(STATE_OPEN) => Ok(CircuitState::Open),
            _ => Ok(CircuitState::Closed),
        }
    }

    async fn is_manually_triggered(&self) -> Result<bool, BusError> {
        Ok(self.bus.get_key(TRIGGERED_KEY).await?.as_deref() == Some("1"))
    }

    /// Public view of the manual-trip flag, polled by the supervisor's
    /// breaker watcher: any process sharing this Redis instance can observe
    /// a `force_open` regardless of which process called it.
    pub async fn is_emergency_tripped(&self) -> Result<bool, BusError> {
        self.is_manually_triggered().await
    }
}
