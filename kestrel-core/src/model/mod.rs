//! Market and account data types shared across the bus.

mod book;
mod kline;
mod order_event;
mod position;
mod signal;

pub use book::{OrderBook, PriceLevel};
pub use kline::Kline;
pub use order_event::{
    ExecutionType, OrderEvent, OrderSide, OrderStatus, OrderTimeInForce, OrderType, PositionSide,
};
pub use position::Position;
pub use signal::{Signal, SignalUpdate};
