//! Conversions from Binance wire shapes ([`crate::wire`]) into the
//! exchange-agnostic types every other component consumes
//! ([`kestrel_core::model`]).

use kestrel_core::model::{
    ExecutionType, Kline, OrderBook, OrderEvent, OrderSide, OrderStatus, OrderTimeInForce,
    OrderType, PositionSide, PriceLevel,
};

use crate::wire::{DepthUpdate, KlineUpdate, OrderTradeUpdatePayload};

pub fn order_book_from_depth(update: &DepthUpdate) -> Option<OrderBook> {
    let bids = update
        .bids
        .iter()
        .map(|(price, size)| PriceLevel::new(*price, *size))
        .collect();
    let asks = update
        .asks
        .iter()
        .map(|(price, size)| PriceLevel::new(*price, *size))
        .collect();

    OrderBook::new(update.symbol.clone(), update.event_time_ms, bids, asks)
}

pub fn kline_from_update(update: &KlineUpdate) -> Kline {
    let k = &update.kline;
    Kline {
        symbol: update.symbol.clone(),
        interval: k.interval.clone(),
        open: k.open,
        high: k.high,
        low: k.low,
        close: k.close,
        volume: k.volume,
        start_time_ms: k.start_time_ms,
        end_time_ms: k.end_time_ms,
        closed: k.closed,
    }
}

pub fn order_event_from_update(event_time_ms: i64, payload: &OrderTradeUpdatePayload) -> OrderEvent {
    OrderEvent {
        symbol: payload.symbol.clone(),
        order_id: payload.order_id,
        client_order_id: payload.client_order_id.clone(),
        side: OrderSide::from(payload.side.as_str()),
        position_side: PositionSide::from(payload.position_side.as_str()),
        exec_type: ExecutionType::from(payload.exec_type.as_str()),
        status: OrderStatus::from(payload.status.as_str()),
        order_type: OrderType::from(payload.order_type.as_str()),
        time_in_force: OrderTimeInForce::from(payload.time_in_force.as_str()),
        orig_qty: payload.orig_qty,
        cum_filled_qty: payload.cum_filled_qty,
        avg_price: payload.avg_price,
        last_qty: payload.last_qty,
        last_price: payload.last_price,
        commission: payload.commission,
        realized_pnl: payload.realized_pnl,
        is_maker: payload.is_maker,
        event_time_ms,
        trade_time_ms: payload.trade_time_ms,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn depth_update_with_empty_side_yields_no_book() {
        let update = DepthUpdate {
            symbol: "BTCUSDT".into(),
            event_time_ms: 1,
            bids: vec![],
            asks: vec![(dec!(101), dec!(1))],
        };
        assert!(order_book_from_depth(&update).is_none());
    }

    #[test]
    fn depth_update_builds_book_with_matching_top_of_book() {
        let update = DepthUpdate {
            symbol: "BTCUSDT".into(),
            event_time_ms: 1,
            bids: vec![(dec!(100), dec!(1))],
            asks: vec![(dec!(101), dec!(1))],
        };
        let book = order_book_from_depth(&update).unwrap();
        assert_eq!(book.best_bid(), dec!(100));
        assert_eq!(book.best_ask(), dec!(101));
    }
}
