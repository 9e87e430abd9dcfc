//! Position sizing and tiered take-profit/stop-loss management, both ATR
//! driven. Kept free of any bus/I-O dependency so the arithmetic can be
//! unit tested directly.

use kestrel_core::model::Position;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// The original scales `risk_amount / atr` down by a fixed `1000`, a
/// contract-size artefact of the instrument it was trading rather than a
/// general risk constant — kept as a named constant rather than folded
/// into the formula so its origin isn't lost.
pub const CONTRACT_SIZE_SCALER: Decimal = dec!(1000);

/// `(entry_price * max_risk_per_trade_pct / atr) / CONTRACT_SIZE_SCALER`.
/// Returns `None` if `atr` is zero or negative (no meaningful volatility
/// estimate yet).
pub fn position_size(entry_price: Decimal, atr: Decimal, max_risk_per_trade_pct: Decimal) -> Option<Decimal> {
    if atr <= Decimal::ZERO {
        return None;
    }
    let risk_amount = entry_price * max_risk_per_trade_pct;
    Some((risk_amount / atr) / CONTRACT_SIZE_SCALER)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Long,
    Short,
}

impl Direction {
    pub fn from_position(position: Position) -> Option<Self> {
        if position.is_long() {
            Some(Direction::Long)
        } else if position.is_short() {
            Some(Direction::Short)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ManagedLevels {
    pub stop_loss: Decimal,
    pub take_profit: Decimal,
    pub tp_sl_hit: bool,
}

/// Recomputes stop-loss/take-profit for an open position and reports
/// whether the current price has crossed either, using three widening
/// tiers keyed off PnL% and R-multiple (see module docs in
/// `kestrel-risk`'s README for the thresholds).
pub fn manage_position(
    direction: Direction,
    entry_price: Decimal,
    current_price: Decimal,
    atr: Decimal,
    unrealized_pnl: Decimal,
    position_qty_abs: Decimal,
    atr_multiplier: Decimal,
) -> ManagedLevels {
    let risk = atr * atr_multiplier;
    let position_value = position_qty_abs * entry_price;
    let pnl_pct = if position_value > Decimal::ZERO {
        unrealized_pnl / position_value
    } else {
        Decimal::ZERO
    };
    let r_multiple = match direction {
        Direction::Long => (current_price - entry_price) / risk,
        Direction::Short => (entry_price - current_price) / risk,
    };

    let (stop_loss, take_profit) = match direction {
        Direction::Long => {
            if pnl_pct >= dec!(0.02) && r_multiple >= dec!(2.0) {
                (entry_price + dec!(0.5) * risk, current_price + dec!(1.5) * risk)
            } else if pnl_pct >= dec!(0.01) || r_multiple >= dec!(1.5) {
                (entry_price + risk, current_price + dec!(2) * risk)
            } else {
                (entry_price - risk, current_price + dec!(2) * risk)
            }
        }
        Direction::Short => {
            if pnl_pct >= dec!(0.02) && r_multiple >= dec!(2.0) {
                (entry_price - dec!(0.5) * risk, current_price - dec!(1.5) * risk)
            } else if pnl_pct >= dec!(0.01) || r_multiple >= dec!(1.5) {
                (entry_price - risk, current_price - dec!(2) * risk)
            } else {
                (entry_price + risk, current_price - dec!(2) * risk)
            }
        }
    };

    let tp_sl_hit = match direction {
        Direction::Long => current_price >= take_profit || current_price <= stop_loss,
        Direction::Short => current_price <= take_profit || current_price >= stop_loss,
    };

    ManagedLevels {
        stop_loss,
        take_profit,
        tp_sl_hit,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn position_size_scales_down_by_contract_size() {
        let size = position_size(dec!(30000), dec!(50), dec!(0.01)).unwrap();
        // (30000 * 0.01) / 50 / 1000 = 0.006
        assert_eq!(size, dec!(0.006));
    }

    #[test]
    fn zero_atr_yields_no_size() {
        assert!(position_size(dec!(30000), dec!(0), dec!(0.01)).is_none());
    }

    #[test]
    fn long_position_hits_take_profit() {
        let levels = manage_position(
            Direction::Long,
            dec!(100),
            dec!(130),
            dec!(10),
            dec!(30),
            dec!(1),
            dec!(1),
        );
        assert!(levels.tp_sl_hit);
    }

    #[test]
    fn short_position_without_breach_does_not_trigger() {
        let levels = manage_position(
            Direction::Short,
            dec!(100),
            dec!(99),
            dec!(10),
            dec!(1),
            dec!(1),
            dec!(1),
        );
        assert!(!levels.tp_sl_hit);
    }
}
