//! Signal acceptance: turns a strategy [`Signal`] plus the current
//! position/exposure/TP-SL state into a concrete order [`Action`], or
//! `None` if the signal should be ignored this tick.
//!
//! Mirrors the branching in the original's `on_signal_update` — four
//! states per direction (flat / same-direction-under-exposure /
//! same-direction-at-cap / opposite-direction) rather than a single
//! generic "rebalance" rule, because the original bot's entry and scaling
//! behaviour genuinely differ between them.

use kestrel_core::model::Signal;
use rust_decimal::Decimal;

use crate::sizing::{manage_position, position_size, Direction, ManagedLevels};

/// A position-size floor below which we treat the position as flat —
/// guards against a value like `1e-12` surviving float/decimal rounding
/// and being treated as a genuine open position.
const POSITION_SIZE_THRESHOLD: Decimal = rust_decimal_macros::dec!(0.00000001);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    OpenLong(DecimalQty),
    OpenShort(DecimalQty),
    ScaleLong(DecimalQty),
    ScaleShort(DecimalQty),
    CloseLong(DecimalQty),
    CloseShort(DecimalQty),
}

pub type DecimalQty = Decimal;

#[derive(Debug, Clone, Copy)]
pub struct SignalContext {
    pub signal: Signal,
    pub position_qty: Decimal,
    pub entry_price: Decimal,
    pub current_price: Decimal,
    pub unrealized_pnl: Decimal,
    pub cash_balance: Decimal,
    pub atr: Option<Decimal>,
    pub max_risk_per_trade_pct: Decimal,
    pub max_exposure_pct: Decimal,
    pub atr_multiplier: Decimal,
}

pub fn on_signal_update(ctx: SignalContext) -> Option<Action> {
    let mut position_qty = ctx.position_qty;
    if position_qty.abs() < POSITION_SIZE_THRESHOLD {
        position_qty = Decimal::ZERO;
    }

    let atr = ctx.atr?;
    let total_portfolio_value = ctx.cash_balance + ctx.unrealized_pnl;
    let current_exposure = (position_qty * ctx.current_price).abs();
    let max_exposure = total_portfolio_value * ctx.max_exposure_pct;

    let levels = Direction::from_position(kestrel_core::model::Position::new(position_qty, ctx.entry_price))
        .map(|direction| {
            manage_position(
                direction,
                ctx.entry_price,
                ctx.current_price,
                atr,
                ctx.unrealized_pnl,
                position_qty.abs(),
                ctx.atr_multiplier,
            )
        });

    match ctx.signal {
        Signal::Hold => None,
        Signal::Buy => on_buy(ctx, position_qty, current_exposure, max_exposure, atr, levels),
        Signal::Sell => on_sell(ctx, position_qty, current_exposure, max_exposure, atr, levels),
    }
}

fn on_buy(
    ctx: SignalContext,
    position_qty: Decimal,
    current_exposure: Decimal,
    max_exposure: Decimal,
    atr: Decimal,
    levels: Option<ManagedLevels>,
) -> Option<Action> {
    if position_qty.is_zero() {
        let size = position_size(ctx.current_price, atr, ctx.max_risk_per_trade_pct)?;
        return Some(Action::OpenLong(size));
    }

    if position_qty.is_sign_positive() {
        // existing long: close on TP/SL, else scale if under the exposure cap
        if levels.map(|l| l.tp_sl_hit).unwrap_or(true) {
            return Some(Action::CloseLong(position_qty));
        }
        if current_exposure >= max_exposure {
            return None;
        }
        let size = position_size(ctx.current_price, atr, ctx.max_risk_per_trade_pct)?;
        Some(Action::ScaleLong(size))
    } else {
        // existing short: only close on TP/SL, no auto-reversal
        if levels.map(|l| l.tp_sl_hit).unwrap_or(true) {
            Some(Action::CloseShort(position_qty.abs()))
        } else {
            None
        }
    }
}

fn on_sell(
    ctx: SignalContext,
    position_qty: Decimal,
    current_exposure: Decimal,
    max_exposure: Decimal,
    atr: Decimal,
    levels: Option<ManagedLevels>,
) -> Option<Action> {
    if position_qty.is_zero() {
        let size = position_size(ctx.current_price, atr, ctx.max_risk_per_trade_pct)?;
        return Some(Action::OpenShort(size));
    }

    if position_qty.is_sign_negative() {
        if levels.map(|l| l.tp_sl_hit).unwrap_or(true) {
            return Some(Action::CloseShort(position_qty.abs()));
        }
        if current_exposure >= max_exposure {
            return None;
        }
        let size = position_size(ctx.current_price, atr, ctx.max_risk_per_trade_pct)?;
        Some(Action::ScaleShort(size))
    } else {
        // existing long: only close on TP/SL, no auto-reversal
        if levels.map(|l| l.tp_sl_hit).unwrap_or(true) {
            Some(Action::CloseLong(position_qty))
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn base_ctx(signal: Signal) -> SignalContext {
        SignalContext {
            signal,
            position_qty: dec!(0),
            entry_price: dec!(0),
            current_price: dec!(30000),
            unrealized_pnl: dec!(0),
            cash_balance: dec!(100000),
            atr: Some(dec!(50)),
            max_risk_per_trade_pct: dec!(0.01),
            max_exposure_pct: dec!(0.5),
            atr_multiplier: dec!(1),
        }
    }

    #[test]
    fn buy_with_no_position_opens_long() {
        let action = on_signal_update(base_ctx(Signal::Buy));
        assert!(matches!(action, Some(Action::OpenLong(_))));
    }

    #[test]
    fn buy_signal_closes_existing_short_on_stop_loss_breach() {
        let mut ctx = base_ctx(Signal::Buy);
        ctx.position_qty = dec!(-1);
        ctx.entry_price = dec!(100);
        ctx.current_price = dec!(200);
        ctx.unrealized_pnl = dec!(-100);
        let action = on_signal_update(ctx);
        assert_eq!(action, Some(Action::CloseShort(dec!(1))));
    }

    #[test]
    fn buy_signal_ignores_existing_short_without_tp_sl_hit() {
        let mut ctx = base_ctx(Signal::Buy);
        ctx.position_qty = dec!(-1);
        ctx.entry_price = dec!(100);
        ctx.current_price = dec!(95);
        ctx.atr = Some(dec!(50));
        ctx.unrealized_pnl = dec!(0);
        let action = on_signal_update(ctx);
        assert_eq!(action, None);
    }

    #[test]
    fn sell_signal_closes_existing_long_on_stop_loss_breach() {
        let mut ctx = base_ctx(Signal::Sell);
        ctx.position_qty = dec!(1);
        ctx.entry_price = dec!(200);
        ctx.current_price = dec!(100);
        ctx.unrealized_pnl = dec!(-100);
        let action = on_signal_update(ctx);
        assert_eq!(action, Some(Action::CloseLong(dec!(1))));
    }

    #[test]
    fn sell_signal_ignores_existing_long_without_tp_sl_hit() {
        let mut ctx = base_ctx(Signal::Sell);
        ctx.position_qty = dec!(1);
        ctx.entry_price = dec!(95);
        ctx.current_price = dec!(100);
        ctx.atr = Some(dec!(50));
        ctx.unrealized_pnl = dec!(5);
        let action = on_signal_update(ctx);
        assert_eq!(action, None);
    }

    #[test]
    fn hold_signal_never_produces_an_action() {
        assert_eq!(on_signal_update(base_ctx(Signal::Hold)), None);
    }

    #[test]
    fn missing_atr_blocks_every_signal() {
        let mut ctx = base_ctx(Signal::Buy);
        ctx.atr = None;
        assert_eq!(on_signal_update(ctx), None);
    }
}
