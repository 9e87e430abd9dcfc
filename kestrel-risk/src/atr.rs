//! Average True Range over a rolling window of closed candles.
//!
//! Mirrors a pandas `.rolling(window=14, min_periods=1).mean()` over the
//! per-candle true range: the window fills in over the first 14 candles
//! rather than returning `None` until it's full, so position sizing can
//! start (conservatively) from the very first candle.

use kestrel_core::model::Kline;
use rust_decimal::Decimal;
use std::collections::VecDeque;

pub const ATR_PERIOD: usize = 14;

#[derive(Debug, Clone)]
pub struct AtrCalculator {
    period: usize,
    window: VecDeque<Decimal>,
    prev_close: Option<Decimal>,
}

impl AtrCalculator {
    pub fn new(period: usize) -> Self {
        Self {
            period,
            window: VecDeque::with_capacity(period),
            prev_close: None,
        }
    }

    /// Folds one closed candle into the rolling window and returns the
    /// updated ATR. The very first candle has no previous close to diff
    /// against, so its true range is simply `high - low`.
    pub fn update(&mut self, candle: &Kline) -> Decimal {
        let true_range = match self.prev_close {
            Some(prev_close) => candle.true_range(prev_close),
            None => candle.high - candle.low,
        };

        self.window.push_back(true_range);
        if self.window.len() > self.period {
            self.window.pop_front();
        }
        self.prev_close = Some(candle.close);

        self.current().expect("window is non-empty after a push")
    }

    pub fn current(&self) -> Option<Decimal> {
        if self.window.is_empty() {
            return None;
        }
        let sum: Decimal = self.window.iter().sum();
        Some(sum / Decimal::from(self.window.len()))
    }
}

impl Default for AtrCalculator {
    fn default() -> Self {
        Self::new(ATR_PERIOD)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn candle(high: Decimal, low: Decimal, close: Decimal) -> Kline {
        Kline {
            symbol: "BTCUSDT".into(),
            interval: "1m".into(),
            open: close,
            high,
            low,
            close,
            volume: dec!(1),
            start_time_ms: 0,
            end_time_ms: 60_000,
            closed: true,
        }
    }

    #[test]
    fn first_candle_true_range_is_high_minus_low() {
        let mut atr = AtrCalculator::new(ATR_PERIOD);
        let value = atr.update(&candle(dec!(110), dec!(100), dec!(105)));
        assert_eq!(value, dec!(10));
    }

    #[test]
    fn window_averages_and_caps_at_period() {
        let mut atr = AtrCalculator::new(2);
        atr.update(&candle(dec!(110), dec!(100), dec!(105)));
        atr.update(&candle(dec!(106), dec!(104), dec!(105)));
        let third = atr.update(&candle(dec!(200), dec!(100), dec!(150)));
        // only the last two true ranges should contribute once the window is full
        assert!(third > dec!(2));
    }
}
