//! Portfolio-wide drawdown watchdog, throttled to a 30-second cadence by
//! the caller (`service::RiskService::run`). Tracks a peak and an initial
//! portfolio value and reports whether either drawdown limit has been
//! breached.

use rust_decimal::Decimal;

#[derive(Debug, Clone, Copy)]
pub struct DrawdownBreach {
    pub relative_dd: Decimal,
    pub absolute_dd: Decimal,
}

#[derive(Debug, Clone, Default)]
pub struct DrawdownWatchdog {
    peak_value: Option<Decimal>,
    initial_value: Option<Decimal>,
    max_relative_drawdown: Decimal,
    max_absolute_drawdown: Decimal,
}

impl DrawdownWatchdog {
    pub fn new(max_relative_drawdown: Decimal, max_absolute_drawdown: Decimal) -> Self {
        Self {
            peak_value: None,
            initial_value: None,
            max_relative_drawdown,
            max_absolute_drawdown,
        }
    }

    /// Folds in the latest portfolio value and returns `Some(breach)` if
    /// either drawdown limit is now exceeded. A non-positive
    /// `portfolio_value` is treated as "not enough data yet" and skipped,
    /// matching the upstream check.
    pub fn check(&mut self, portfolio_value: Decimal) -> Option<DrawdownBreach> {
        if portfolio_value <= Decimal::ZERO {
            return None;
        }

        let peak = self.peak_value.get_or_insert(portfolio_value);
        *peak = (*peak).max(portfolio_value);
        let initial = *self.initial_value.get_or_insert(portfolio_value);
        let peak = *peak;

        let relative_dd = if peak > Decimal::ZERO {
            (peak - portfolio_value) / peak
        } else {
            Decimal::ZERO
        };
        let absolute_dd = if initial > Decimal::ZERO {
            (initial - portfolio_value) / initial
        } else {
            Decimal::ZERO
        };

        if relative_dd >= self.max_relative_drawdown || absolute_dd >= self.max_absolute_drawdown {
            Some(DrawdownBreach { relative_dd, absolute_dd })
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn first_observation_never_breaches() {
        let mut watchdog = DrawdownWatchdog::new(dec!(0.1), dec!(0.2));
        assert!(watchdog.check(dec!(10_000)).is_none());
    }

    #[test]
    fn relative_drawdown_from_peak_triggers_breach() {
        let mut watchdog = DrawdownWatchdog::new(dec!(0.1), dec!(0.9));
        watchdog.check(dec!(10_000));
        watchdog.check(dec!(12_000));
        let breach = watchdog.check(dec!(10_000));
        assert!(breach.is_some());
        assert!(breach.unwrap().relative_dd >= dec!(0.1));
    }

    #[test]
    fn non_positive_value_is_ignored() {
        let mut watchdog = DrawdownWatchdog::new(dec!(0.1), dec!(0.2));
        assert!(watchdog.check(dec!(0)).is_none());
    }

    #[test]
    fn literal_scenario_stays_closed_at_eight_percent_then_breaches_at_fifteen() {
        let mut watchdog = DrawdownWatchdog::new(dec!(0.10), dec!(0.5));

        watchdog.check(dec!(10_000));
        watchdog.check(dec!(12_000));

        let at_eleven_thousand = watchdog.check(dec!(11_000));
        assert!(at_eleven_thousand.is_none());

        let at_ten_two_hundred = watchdog.check(dec!(10_200)).unwrap();
        assert!(at_ten_two_hundred.relative_dd >= dec!(0.05));
        assert!((at_ten_two_hundred.relative_dd - dec!(0.15)).abs() < dec!(0.001));
    }
}
