//! Literal position/PnL scenarios: round trips to flat, overselling into a
//! reversal, covering a short at a profit, and unrealized PnL for a long
//! and a short opened at the same entry price.

use kestrel_core::model::{
    ExecutionType, OrderEvent, OrderSide, OrderStatus, OrderTimeInForce, OrderType, PositionSide,
};
use kestrel_portfolio::Portfolio;
use rust_decimal_macros::dec;

fn fill(side: OrderSide, qty: rust_decimal::Decimal, price: rust_decimal::Decimal, order_id: u64) -> OrderEvent {
    OrderEvent {
        symbol: "BTCUSDT".to_string(),
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
fn scenario_1_round_trip_buy_then_two_sells_nets_to_flat() {
    let mut portfolio = Portfolio::new();
    portfolio.on_new_trade(fill(OrderSide::Buy, dec!(1), dec!(100), 1));
    portfolio.on_new_trade(fill(OrderSide::Sell, dec!(0.5), dec!(101), 2));
    portfolio.on_new_trade(fill(OrderSide::Sell, dec!(0.5), dec!(99), 3));

    let stats = portfolio.stats("BTCUSDT");
    assert!(stats.position.is_flat());
    assert_eq!(stats.realized_pnl, dec!(0));
}

#[test]
fn scenario_2_overselling_a_long_reverses_into_a_short() {
    let mut portfolio = Portfolio::new();
    portfolio.on_new_trade(fill(OrderSide::Buy, dec!(1), dec!(100), 1));
    portfolio.on_new_trade(fill(OrderSide::Sell, dec!(1.5), dec!(101), 2));

    let stats = portfolio.stats("BTCUSDT");
    assert_eq!(stats.position.qty, dec!(-0.5));
    assert_eq!(stats.position.avg_price, dec!(101));
    assert_eq!(stats.realized_pnl, dec!(1));
}

#[test]
fn scenario_3_covering_a_short_at_a_profit() {
    let mut portfolio = Portfolio::new();
    portfolio.on_new_trade(fill(OrderSide::Sell, dec!(1), dec!(100), 1));
    portfolio.on_new_trade(fill(OrderSide::Buy, dec!(1), dec!(99), 2));

    let stats = portfolio.stats("BTCUSDT");
    assert!(stats.position.is_flat());
    assert_eq!(stats.realized_pnl, dec!(1));
}

#[test]
fn scenario_4_unrealized_pnl_for_long_then_short_at_the_same_entry() {
    let mut long_book = Portfolio::new();
    long_book.on_new_trade(fill(OrderSide::Buy, dec!(1), dec!(100), 1));
    long_book.on_new_price("BTCUSDT", dec!(99), dec!(101));
    assert_eq!(long_book.stats("BTCUSDT").unrealized_pnl, dec!(-1));

    let mut short_book = Portfolio::new();
    short_book.on_new_trade(fill(OrderSide::Sell, dec!(1), dec!(100), 1));
    short_book.on_new_price("BTCUSDT", dec!(99), dec!(102));
    assert_eq!(short_book.stats("BTCUSDT").unrealized_pnl, dec!(-2));
}
