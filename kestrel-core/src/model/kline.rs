use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A candlestick for one symbol/interval.
///
/// Invariant: `low <= open, close <= high`. A candle with `closed == true`
/// is immutable — once the strategy or risk manager has consumed it, a
/// later message with the same `start_time_ms` must be treated as a
/// duplicate, not an update (see `dedup by start_time` in the strategy).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Kline {
    pub symbol: String,
    pub interval: String,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
    pub start_time_ms: i64,
    pub end_time_ms: i64,
    pub closed: bool,
}

impl Kline {
    /// Returns `true` if the OHLC values are internally consistent.
    pub fn is_valid(&self) -> bool {
        self.low <= self.open
            && self.low <= self.close
            && self.low <= self.high
            && self.open <= self.high
            && self.close <= self.high
    }

    /// `max(h-l, |h-prev_close|, |l-prev_close|)`, the per-candle true range
    /// used by the risk manager's ATR calculation.
    pub fn true_range(&self, prev_close: Decimal) -> Decimal {
        let high_low = self.high - self.low;
        let high_close = (self.high - prev_close).abs();
        let low_close = (self.low - prev_close).abs();
        high_low.max(high_close).max(low_close)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn candle(open: Decimal, high: Decimal, low: Decimal, close: Decimal) -> Kline {
        Kline {
            symbol: "BTCUSDT".into(),
            interval: "1m".into(),
            open,
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
    fn validates_ohlc_bounds() {
        assert!(candle(dec!(10), dec!(12), dec!(9), dec!(11)).is_valid());
        assert!(!candle(dec!(10), dec!(9), dec!(9), dec!(11)).is_valid());
    }

    #[test]
    fn true_range_picks_widest_span() {
        let c = candle(dec!(10), dec!(12), dec!(9), dec!(11));
        // prev_close far below low widens the range via |low - prev_close|
        assert_eq!(c.true_range(dec!(5)), dec!(6));
        // ordinary case: high - low dominates
        assert_eq!(c.true_range(dec!(10)), dec!(3));
    }
}
