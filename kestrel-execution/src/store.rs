//! The `futures_order` record store: one row per `order_id`, upserted
//! from execution updates by [`crate::service::OrderManagerService`].
//!
//! The default [`OrderStore`] implementation is an in-memory `dashmap`
//! table. The trait boundary is what matters: a `SqliteOrderStore` or
//! similar can implement [`OrderStore`] later without touching
//! [`crate::service::OrderManagerService`].

use dashmap::DashMap;
use kestrel_core::model::{ExecutionType, OrderEvent};
use serde::Serialize;
use std::sync::Arc;

/// A row in the `futures_order` table, mirroring [`OrderEvent`] 1:1.
#[derive(Debug, Clone, Serialize)]
pub struct OrderRecord {
    pub order_id: u64,
    pub client_order_id: String,
    pub symbol: String,
    pub side: String,
    pub position_side: String,
    pub status: String,
    pub order_type: String,
    pub time_in_force: String,
    pub orig_qty: rust_decimal::Decimal,
    pub cum_filled_qty: rust_decimal::Decimal,
    pub avg_price: rust_decimal::Decimal,
    pub last_qty: rust_decimal::Decimal,
    pub last_price: rust_decimal::Decimal,
    pub commission: rust_decimal::Decimal,
    pub realized_pnl: rust_decimal::Decimal,
    pub is_maker: bool,
    pub event_time_ms: i64,
    pub trade_time_ms: i64,
}

impl OrderRecord {
    fn from_event(event: &OrderEvent) -> Self {
        Self {
            order_id: event.order_id,
            client_order_id: event.client_order_id.clone(),
            symbol: event.symbol.clone(),
            side: event.side.to_string(),
            position_side: event.position_side.to_string(),
            status: event.status.to_string(),
            order_type: event.order_type.to_string(),
            time_in_force: event.time_in_force.to_string(),
            orig_qty: event.orig_qty,
            cum_filled_qty: event.cum_filled_qty,
            avg_price: event.avg_price,
            last_qty: event.last_qty,
            last_price: event.last_price,
            commission: event.commission,
            realized_pnl: event.realized_pnl,
            is_maker: event.is_maker,
            event_time_ms: event.event_time_ms,
            trade_time_ms: event.trade_time_ms,
        }
    }

    /// Overwrites every field but `order_id` in place.
    fn apply(&mut self, event: &OrderEvent) {
        let fresh = Self::from_event(event);
        *self = Self {
            order_id: self.order_id,
            ..fresh
        };
    }
}

/// Checks whether any enum field on `event` failed to map onto its
/// canonical domain value, so the caller can reject the record with a
/// warning instead of writing a half-decoded row.
fn has_unknown_enum_value(event: &OrderEvent) -> Option<&'static str> {
    use kestrel_core::model::{OrderSide, OrderStatus, OrderTimeInForce, OrderType, PositionSide};

    if matches!(event.side, OrderSide::Unknown(_)) {
        return Some("side");
    }
    if matches!(event.position_side, PositionSide::Unknown(_)) {
        return Some("position_side");
    }
    if matches!(event.exec_type, ExecutionType::Unknown(_)) {
        return Some("exec_type");
    }
    if matches!(event.status, OrderStatus::Unknown(_)) {
        return Some("status");
    }
    if matches!(event.order_type, OrderType::Unknown(_)) {
        return Some("order_type");
    }
    if matches!(event.time_in_force, OrderTimeInForce::Unknown(_)) {
        return Some("time_in_force");
    }
    None
}

pub trait OrderStore: Send + Sync {
    /// Inserts or updates a record from a normalized execution event.
    /// Returns `Err` naming the offending field when an enum value didn't
    /// map onto its canonical domain type; the store is left unchanged.
    fn apply(&self, event: &OrderEvent) -> Result<(), &'static str>;

    fn get(&self, order_id: u64) -> Option<OrderRecord>;

    fn all(&self) -> Vec<OrderRecord>;

    fn by_symbol(&self, symbol: &str) -> Vec<OrderRecord>;
}

/// Default [`OrderStore`]: a `dashmap`-backed in-memory table, sharable
/// across the order manager's worker and the admin HTTP adapter.
#[derive(Debug, Clone, Default)]
pub struct InMemoryOrderStore {
    rows: Arc<DashMap<u64, OrderRecord>>,
}

impl InMemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl OrderStore for InMemoryOrderStore {
    fn apply(&self, event: &OrderEvent) -> Result<(), &'static str> {
        if let Some(field) = has_unknown_enum_value(event) {
            return Err(field);
        }

        match event.exec_type {
            ExecutionType::New => {
                self.rows.insert(event.order_id, OrderRecord::from_event(event));
            }
            _ => {
                self.rows
                    .entry(event.order_id)
                    .and_modify(|row| row.apply(event))
                    .or_insert_with(|| OrderRecord::from_event(event));
            }
        }
        Ok(())
    }

    fn get(&self, order_id: u64) -> Option<OrderRecord> {
        self.rows.get(&order_id).map(|r| r.clone())
    }

    fn all(&self) -> Vec<OrderRecord> {
        self.rows.iter().map(|r| r.clone()).collect()
    }

    fn by_symbol(&self, symbol: &str) -> Vec<OrderRecord> {
        self.rows
            .iter()
            .filter(|r| r.symbol == symbol)
            .map(|r| r.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kestrel_core::model::{
        ExecutionType, OrderSide, OrderStatus, OrderTimeInForce, OrderType, PositionSide,
    };
    use rust_decimal_macros::dec;

    fn event(order_id: u64, exec_type: ExecutionType, status: OrderStatus) -> OrderEvent {
        OrderEvent {
            symbol: "BTCUSDT".into(),
            order_id,
            client_order_id: "c1".into(),
            side: OrderSide::Buy,
            position_side: PositionSide::Both,
            exec_type,
            status,
            order_type: OrderType::Market,
            time_in_force: OrderTimeInForce::GoodTillCancel,
            orig_qty: dec!(1),
            cum_filled_qty: dec!(0),
            avg_price: dec!(0),
            last_qty: dec!(0),
            last_price: dec!(0),
            commission: dec!(0),
            realized_pnl: dec!(0),
            is_maker: false,
            event_time_ms: 0,
            trade_time_ms: 0,
        }
    }

    #[test]
    fn new_execution_type_inserts_a_fresh_record() {
        let store = InMemoryOrderStore::new();
        store.apply(&event(1, ExecutionType::New, OrderStatus::New)).unwrap();
        assert_eq!(store.get(1).unwrap().status, "NEW");
    }

    #[test]
    fn subsequent_events_update_the_same_record_in_place() {
        let store = InMemoryOrderStore::new();
        store.apply(&event(1, ExecutionType::New, OrderStatus::New)).unwrap();

        let mut filled = event(1, ExecutionType::Trade, OrderStatus::Filled);
        filled.cum_filled_qty = dec!(1);
        store.apply(&filled).unwrap();

        let row = store.get(1).unwrap();
        assert_eq!(row.status, "FILLED");
        assert_eq!(row.cum_filled_qty, dec!(1));
        assert_eq!(store.all().len(), 1);
    }

    #[test]
    fn unknown_enum_value_is_rejected_without_touching_the_store() {
        let store = InMemoryOrderStore::new();
        store.apply(&event(1, ExecutionType::New, OrderStatus::New)).unwrap();

        let mut bad = event(1, ExecutionType::Trade, OrderStatus::Filled);
        bad.side = OrderSide::Unknown("HEDGE".to_string());
        let err = store.apply(&bad).unwrap_err();
        assert_eq!(err, "side");

        // store is untouched by the rejected update
        assert_eq!(store.get(1).unwrap().status, "NEW");
    }
}
