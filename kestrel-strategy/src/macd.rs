//! Incremental MACD (12/26/9 by default) and hysteresis-based signal
//! generation, isolated from the bus for unit testing.
//!
//! EMAs are updated one closed candle at a time via
//! `alpha = smoothing_factor / (period + 1)`, rather than recomputed from
//! scratch, so a long-running process never has to replay its whole
//! candle history to produce the next signal.

use kestrel_core::model::Signal;

#[derive(Debug, Clone, Copy)]
pub struct MacdConfig {
    pub fast_period: u32,
    pub slow_period: u32,
    pub signal_period: u32,
    pub smoothing_factor: f64,
}

impl Default for MacdConfig {
    fn default() -> Self {
        Self {
            fast_period: 12,
            slow_period: 26,
            signal_period: 9,
            smoothing_factor: 2.0,
        }
    }
}

impl MacdConfig {
    fn alpha_fast(&self) -> f64 {
        self.smoothing_factor / (self.fast_period as f64 + 1.0)
    }

    fn alpha_slow(&self) -> f64 {
        self.smoothing_factor / (self.slow_period as f64 + 1.0)
    }

    fn alpha_signal(&self) -> f64 {
        self.smoothing_factor / (self.signal_period as f64 + 1.0)
    }
}

/// Last action taken, used to apply hysteresis: a signal only emits again
/// once the MACD/signal-line relationship flips, not on every candle that
/// keeps agreeing with the last one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LastAction {
    Buy,
    Sell,
}

#[derive(Debug, Clone)]
pub struct MacdStrategy {
    config: MacdConfig,
    ema_fast: Option<f64>,
    ema_slow: Option<f64>,
    macd: Option<f64>,
    signal_line: Option<f64>,
    last_action: Option<LastAction>,
    last_start_time_ms: Option<i64>,
}

impl MacdStrategy {
    pub fn new(config: MacdConfig) -> Self {
        Self {
            config,
            ema_fast: None,
            ema_slow: None,
            macd: None,
            signal_line: None,
            last_action: None,
            last_start_time_ms: None,
        }
    }

    pub fn macd(&self) -> Option<f64> {
        self.macd
    }

    pub fn signal_line(&self) -> Option<f64> {
        self.signal_line
    }

    /// Replays historical closed candles through the same incremental
    /// update path used for live candles, priming the EMAs and the
    /// hysteresis state without emitting a signal for any of them — so the
    /// first live candle doesn't immediately fire a Buy/Sell just because
    /// history put the MACD on one side of the signal line.
    pub fn seed_history<I: IntoIterator<Item = (i64, f64)>>(&mut self, candles: I) {
        for (start_time_ms, close) in candles {
            self.advance(start_time_ms, close);
        }
        self.prime_last_action();
    }

    /// Feeds one closed candle through the incremental EMA update and
    /// returns `Some(signal)` only when the MACD/signal-line relationship
    /// has flipped since the last emitted signal (hysteresis). Returns
    /// `None` for a duplicate `start_time_ms` or an unchanged relationship.
    pub fn on_closed_candle(&mut self, start_time_ms: i64, close: f64) -> Option<Signal> {
        if self.last_start_time_ms == Some(start_time_ms) {
            return None;
        }
        self.advance(start_time_ms, close);
        self.generate_signal()
    }

    fn advance(&mut self, start_time_ms: i64, close: f64) {
        let previous_fast = self.ema_fast.unwrap_or(close);
        let previous_slow = self.ema_slow.unwrap_or(close);

        let alpha_fast = self.config.alpha_fast();
        let alpha_slow = self.config.alpha_slow();
        let fast_ema = alpha_fast * close + (1.0 - alpha_fast) * previous_fast;
        let slow_ema = alpha_slow * close + (1.0 - alpha_slow) * previous_slow;
        let macd = fast_ema - slow_ema;

        let alpha_signal = self.config.alpha_signal();
        let signal_line = match self.signal_line {
            Some(previous) => alpha_signal * macd + (1.0 - alpha_signal) * previous,
            None => macd,
        };

        self.ema_fast = Some(fast_ema);
        self.ema_slow = Some(slow_ema);
        self.macd = Some(macd);
        self.signal_line = Some(signal_line);
        self.last_start_time_ms = Some(start_time_ms);
    }

    fn prime_last_action(&mut self) {
        if let (Some(macd), Some(signal_line)) = (self.macd, self.signal_line) {
            self.last_action = Some(if macd > signal_line {
                LastAction::Buy
            } else {
                LastAction::Sell
            });
        }
    }

    fn generate_signal(&mut self) -> Option<Signal> {
        let (macd, signal_line) = (self.macd?, self.signal_line?);

        if macd > signal_line && self.last_action != Some(LastAction::Buy) {
            self.last_action = Some(LastAction::Buy);
            Some(Signal::Buy)
        } else if macd < signal_line && self.last_action != Some(LastAction::Sell) {
            self.last_action = Some(LastAction::Sell);
            Some(Signal::Sell)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    #[test]
    fn first_candle_sets_macd_to_zero_and_signal_to_macd() {
        let mut strategy = MacdStrategy::new(MacdConfig::default());
        let signal = strategy.on_closed_candle(0, 100.0);
        assert!(approx(strategy.macd().unwrap(), 0.0));
        assert!(signal.is_none(), "first candle establishes state, no crossing yet");
    }

    #[test]
    fn duplicate_start_time_is_ignored() {
        let mut strategy = MacdStrategy::new(MacdConfig::default());
        strategy.on_closed_candle(0, 100.0);
        let macd_before = strategy.macd();
        strategy.on_closed_candle(0, 999.0);
        assert_eq!(strategy.macd(), macd_before);
    }

    #[test]
    fn emits_buy_once_on_upward_crossing_then_stays_silent() {
        let mut strategy = MacdStrategy::new(MacdConfig::default());
        let mut last_signal = None;
        for i in 0..40 {
            let close = 100.0 + i as f64 * 2.0;
            if let Some(signal) = strategy.on_closed_candle(i as i64, close) {
                last_signal = Some(signal);
            }
        }
        assert_eq!(last_signal, Some(Signal::Buy));

        // another rising candle should not re-emit while still above signal line
        let reemit = strategy.on_closed_candle(40, 300.0);
        assert_eq!(reemit, None);
    }

    #[test]
    fn seeding_history_does_not_emit_a_signal() {
        let mut strategy = MacdStrategy::new(MacdConfig::default());
        let history: Vec<(i64, f64)> = (0..30).map(|i| (i, 100.0 + i as f64)).collect();
        strategy.seed_history(history);
        assert!(strategy.macd().is_some());
    }
}
