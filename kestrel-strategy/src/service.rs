//! Bus wiring around [`MacdStrategy`]: consumes closed candles for the
//! configured symbol, publishes a [`SignalUpdate`] whenever the MACD
//! crossing flips.

use kestrel_bus::MessageBus;
use kestrel_core::model::{Kline, SignalUpdate};
use kestrel_core::shutdown::ShutdownSignal;
use kestrel_core::topic;
use rust_decimal::prelude::ToPrimitive;
use tracing::{info, warn};

use crate::macd::{MacdConfig, MacdStrategy};

pub struct StrategyService {
    bus: MessageBus,
    symbol: String,
    strategy: MacdStrategy,
}

impl StrategyService {
    pub fn new(bus: MessageBus, symbol: String, config: MacdConfig) -> Self {
        Self {
            bus,
            symbol,
            strategy: MacdStrategy::new(config),
        }
    }

    /// Primes the MACD/signal-line state from historical closes before the
    /// service starts consuming live candles. `history` must be ordered
    /// oldest-first.
    pub fn seed_history(&mut self, history: Vec<(i64, rust_decimal::Decimal)>) {
        let closes = history
            .into_iter()
            .filter_map(|(t, c)| c.to_f64().map(|c| (t, c)));
        self.strategy.seed_history(closes);
    }

    pub async fn run(mut self, shutdown: ShutdownSignal) -> Result<(), kestrel_bus::BusError> {
        let mut candles = self.bus.subscribe::<Kline>(&topic::candlestick(&self.symbol)).await?;

        loop {
            tokio::select! {
                _ = shutdown.wait() => return Ok(()),
                envelope = candles.recv() => {
                    let Some(envelope) = envelope else { return Ok(()) };
                    let candle = envelope.value;
                    if !candle.closed {
                        continue;
                    }
                    let Some(close) = candle.close.to_f64() else { continue };

                    if let Some(signal) = self.strategy.on_closed_candle(candle.start_time_ms, close) {
                        info!(symbol = %self.symbol, ?signal, "signal generated");
                        let update = SignalUpdate { signal, symbol: self.symbol.clone() };
                        if let Err(err) = self.bus.publish(topic::SIGNAL, update, None).await {
                            warn!(%err, "failed to publish signal");
                        }
                    }
                }
            }
        }
    }
}
