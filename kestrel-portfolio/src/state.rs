//! The position/PnL state machine, isolated from the bus so it can be
//! exercised with plain unit tests. `on_new_trade` mirrors the original
//! `PortfolioManager.on_new_trade`: a weighted-average entry price update
//! on same-direction fills, and a realized-PnL booking on any fill that
//! reduces, squares off, or reverses the position.

use std::collections::{HashMap, VecDeque};

use kestrel_core::model::{OrderEvent, OrderSide, Position};
use rust_decimal::Decimal;

/// Bound on the applied-trade dedup set and the retained trade history —
/// generous enough to cover a long-running process without unbounded
/// growth.
const HISTORY_CAPACITY: usize = 10_000;

#[derive(Debug, Clone, Default)]
pub struct SymbolStats {
    pub position: Position,
    pub realized_pnl: Decimal,
    pub unrealized_pnl: Decimal,
    pub last_best_bid: Decimal,
    pub last_best_ask: Decimal,
}

#[derive(Debug, Default)]
pub struct Portfolio {
    symbols: HashMap<String, SymbolStats>,
    total_commissions: Decimal,
    trade_history: VecDeque<OrderEvent>,
    applied: VecDeque<(u64, Decimal, i64)>,
    applied_set: std::collections::HashSet<(u64, Decimal, i64)>,
}

impl Portfolio {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self, symbol: &str) -> SymbolStats {
        self.symbols.get(symbol).cloned().unwrap_or_default()
    }

    pub fn total_commissions(&self) -> Decimal {
        self.total_commissions
    }

    pub fn total_realized_pnl(&self) -> Decimal {
        self.symbols.values().map(|s| s.realized_pnl).sum()
    }

    pub fn total_unrealized_pnl(&self) -> Decimal {
        self.symbols.values().map(|s| s.unrealized_pnl).sum()
    }

    /// Applies a fill to the book. Returns `false` without mutating state
    /// if the event is not a filled trade or has already been applied
    /// (matched by [`OrderEvent::dedup_key`]).
    pub fn on_new_trade(&mut self, event: OrderEvent) -> bool {
        if !event.is_filled_trade() {
            return false;
        }

        let key = event.dedup_key();
        if self.applied_set.contains(&key) {
            return false;
        }
        self.remember_applied(key);

        self.total_commissions += event.commission;

        let symbol = event.symbol.to_uppercase();
        let signed_qty = if event.side == OrderSide::Buy {
            event.last_qty
        } else {
            -event.last_qty
        };
        let fill_price = event.last_price;

        let stats = self.symbols.entry(symbol).or_default();
        let current = stats.position;

        let (final_qty, final_price, realized_delta) = if current.is_flat() {
            (signed_qty, fill_price, Decimal::ZERO)
        } else if current.is_long() {
            apply_to_long(current.qty, current.avg_price, signed_qty, fill_price)
        } else {
            apply_to_short(current.qty, current.avg_price, signed_qty, fill_price)
        };

        stats.position = Position::new(final_qty, final_price);
        stats.realized_pnl += realized_delta;
        stats.unrealized_pnl = unrealized_pnl(stats.position, stats.last_best_bid, stats.last_best_ask);

        self.push_history(event);
        true
    }

    /// Recomputes unrealized PnL for `symbol` from the latest top of book.
    /// A flat position always reports zero unrealized PnL regardless of
    /// the quoted price.
    pub fn on_new_price(&mut self, symbol: &str, best_bid: Decimal, best_ask: Decimal) {
        let symbol = symbol.to_uppercase();
        let Some(stats) = self.symbols.get_mut(&symbol) else {
            return;
        };

        stats.last_best_bid = best_bid;
        stats.last_best_ask = best_ask;

        if stats.position.is_flat() {
            stats.unrealized_pnl = Decimal::ZERO;
            return;
        }
        stats.unrealized_pnl = unrealized_pnl(stats.position, best_bid, best_ask);
    }

    fn remember_applied(&mut self, key: (u64, Decimal, i64)) {
        self.applied_set.insert(key);
        self.applied.push_back(key);
        if self.applied.len() > HISTORY_CAPACITY {
            if let Some(oldest) = self.applied.pop_front() {
                self.applied_set.remove(&oldest);
            }
        }
    }

    fn push_history(&mut self, event: OrderEvent) {
        self.trade_history.push_back(event);
        if self.trade_history.len() > HISTORY_CAPACITY {
            self.trade_history.pop_front();
        }
    }
}

fn unrealized_pnl(position: Position, best_bid: Decimal, best_ask: Decimal) -> Decimal {
    if position.is_long() && !best_bid.is_zero() {
        position.qty * (best_bid - position.avg_price)
    } else if position.is_short() && !best_ask.is_zero() {
        position.qty.abs() * (position.avg_price - best_ask)
    } else {
        Decimal::ZERO
    }
}

/// `current_qty > 0`. Returns `(final_qty, final_price, realized_delta)`.
fn apply_to_long(
    current_qty: Decimal,
    average_price: Decimal,
    filled_qty: Decimal,
    filled_price: Decimal,
) -> (Decimal, Decimal, Decimal) {
    if filled_qty.is_sign_positive() && !filled_qty.is_zero() {
        let final_qty = current_qty + filled_qty;
        let final_price =
            (current_qty * average_price + filled_qty * filled_price) / final_qty;
        (final_qty, final_price, Decimal::ZERO)
    } else {
        let sell_qty = filled_qty.abs();
        if sell_qty < current_qty {
            // partial close: price unchanged, realize on the closed slice
            (
                current_qty + filled_qty,
                average_price,
                (filled_price - average_price) * sell_qty,
            )
        } else if sell_qty == current_qty {
            // square off
            (
                Decimal::ZERO,
                Decimal::ZERO,
                (filled_price - average_price) * sell_qty,
            )
        } else {
            // sold more than owned: realize on the old long, flip short on the remainder
            (
                current_qty + filled_qty,
                filled_price,
                (filled_price - average_price) * current_qty,
            )
        }
    }
}

/// `current_qty < 0`. Returns `(final_qty, final_price, realized_delta)`.
fn apply_to_short(
    current_qty: Decimal,
    average_price: Decimal,
    filled_qty: Decimal,
    filled_price: Decimal,
) -> (Decimal, Decimal, Decimal) {
    if filled_qty.is_sign_negative() {
        let final_qty = current_qty + filled_qty;
        let final_price = (current_qty.abs() * average_price + filled_qty.abs() * filled_price)
            / final_qty.abs();
        (final_qty, final_price, Decimal::ZERO)
    } else {
        let buy_qty = filled_qty;
        let short_qty = current_qty.abs();
        if buy_qty < short_qty {
            (
                current_qty + filled_qty,
                average_price,
                (average_price - filled_price) * buy_qty,
            )
        } else if buy_qty == short_qty {
            (
                Decimal::ZERO,
                Decimal::ZERO,
                (average_price - filled_price) * buy_qty,
            )
        } else {
            (
                current_qty + filled_qty,
                filled_price,
                (average_price - filled_price) * short_qty,
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kestrel_core::model::{
        ExecutionType, OrderSide, OrderStatus, OrderTimeInForce, OrderType, PositionSide,
    };
    use rust_decimal_macros::dec;

    fn fill(symbol: &str, side: OrderSide, qty: Decimal, price: Decimal, order_id: u64) -> OrderEvent {
        OrderEvent {
            symbol: symbol.to_string(),
            order_id,
            client_order_id: format!("c{order_id}"),
            side,
            position_side: PositionSide::Both,
            exec_type: ExecutionType::Trade,
            status: OrderStatus::Filled,
            order_type: OrderType::Market,
            time_in_force: OrderTimeInForce::GoodTillCancel,
            orig_qty: qty,
            cum_filled_qty: qty,
            avg_price: price,
            last_qty: qty,
            last_price: price,
            commission: dec!(0),
            realized_pnl: dec!(0),
            is_maker: false,
            event_time_ms: 0,
            trade_time_ms: order_id as i64,
        }
    }

    #[test]
    fn opens_new_long_position() {
        let mut portfolio = Portfolio::new();
        portfolio.on_new_trade(fill("BTCUSDT", OrderSide::Buy, dec!(1), dec!(100), 1));
        let stats = portfolio.stats("BTCUSDT");
        assert_eq!(stats.position.qty, dec!(1));
        assert_eq!(stats.position.avg_price, dec!(100));
    }

    #[test]
    fn partial_close_of_long_realizes_pnl_on_closed_slice_only() {
        let mut portfolio = Portfolio::new();
        portfolio.on_new_trade(fill("BTCUSDT", OrderSide::Buy, dec!(2), dec!(100), 1));
        portfolio.on_new_trade(fill("BTCUSDT", OrderSide::Sell, dec!(1), dec!(110), 2));

        let stats = portfolio.stats("BTCUSDT");
        assert_eq!(stats.position.qty, dec!(1));
        assert_eq!(stats.position.avg_price, dec!(100));
        assert_eq!(stats.realized_pnl, dec!(10));
    }

    #[test]
    fn selling_more_than_owned_reverses_into_a_short() {
        let mut portfolio = Portfolio::new();
        portfolio.on_new_trade(fill("BTCUSDT", OrderSide::Buy, dec!(1), dec!(100), 1));
        portfolio.on_new_trade(fill("BTCUSDT", OrderSide::Sell, dec!(3), dec!(110), 2));

        let stats = portfolio.stats("BTCUSDT");
        assert_eq!(stats.position.qty, dec!(-2));
        assert_eq!(stats.position.avg_price, dec!(110));
        assert_eq!(stats.realized_pnl, dec!(10));
    }

    #[test]
    fn covering_a_short_realizes_pnl_and_squares_off() {
        let mut portfolio = Portfolio::new();
        portfolio.on_new_trade(fill("BTCUSDT", OrderSide::Sell, dec!(1), dec!(100), 1));
        portfolio.on_new_trade(fill("BTCUSDT", OrderSide::Buy, dec!(1), dec!(90), 2));

        let stats = portfolio.stats("BTCUSDT");
        assert!(stats.position.is_flat());
        assert_eq!(stats.realized_pnl, dec!(10));
    }

    #[test]
    fn duplicate_fill_is_ignored() {
        let mut portfolio = Portfolio::new();
        let event = fill("BTCUSDT", OrderSide::Buy, dec!(1), dec!(100), 1);
        assert!(portfolio.on_new_trade(event.clone()));
        assert!(!portfolio.on_new_trade(event));
        assert_eq!(portfolio.stats("BTCUSDT").position.qty, dec!(1));
    }

    #[test]
    fn unrealized_pnl_tracks_book_updates_for_a_long_position() {
        let mut portfolio = Portfolio::new();
        portfolio.on_new_trade(fill("BTCUSDT", OrderSide::Buy, dec!(1), dec!(100), 1));
        portfolio.on_new_price("BTCUSDT", dec!(110), dec!(111));
        assert_eq!(portfolio.stats("BTCUSDT").unrealized_pnl, dec!(10));
    }

    #[test]
    fn flat_position_always_reports_zero_unrealized_pnl() {
        let mut portfolio = Portfolio::new();
        portfolio.on_new_price("BTCUSDT", dec!(110), dec!(111));
        assert_eq!(portfolio.stats("BTCUSDT").unrealized_pnl, dec!(0));
    }
}
