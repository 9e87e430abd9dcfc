use rust_decimal::Decimal;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Declares a C-like enum that (de)serializes via its canonical exchange
/// string, with an `Unknown(String)` fallback for values the exchange might
/// introduce later. Demoting an unrecognized value to `Unknown` rather than
/// failing the whole record is what keeps a single unfamiliar enum value
/// from corrupting the order store (see `kestrel-execution::store`).
macro_rules! string_enum {
    ($name:ident { $($variant:ident => $wire:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant,)+
            Unknown(String),
        }

        impl $name {
            pub fn as_str(&self) -> &str {
                match self {
                    $(Self::$variant => $wire,)+
                    Self::Unknown(s) => s.as_str(),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                match s {
                    $($wire => Self::$variant,)+
                    other => Self::Unknown(other.to_string()),
                }
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let raw = String::deserialize(deserializer)?;
                Ok(Self::from(raw.as_str()))
            }
        }
    };
}

string_enum!(OrderSide {
    Buy => "BUY",
    Sell => "SELL",
});

string_enum!(PositionSide {
    Long => "LONG",
    Short => "SHORT",
    Both => "BOTH",
});

string_enum!(ExecutionType {
    New => "NEW",
    Trade => "TRADE",
    Canceled => "CANCELED",
    Expired => "EXPIRED",
    Calculated => "CALCULATED",
    Amendment => "AMENDMENT",
});

string_enum!(OrderStatus {
    New => "NEW",
    PartiallyFilled => "PARTIALLY_FILLED",
    Filled => "FILLED",
    Canceled => "CANCELED",
    Expired => "EXPIRED",
});

string_enum!(OrderType {
    Limit => "LIMIT",
    Market => "MARKET",
    StopMarket => "STOP_MARKET",
    TakeProfitMarket => "TAKE_PROFIT_MARKET",
    TrailingStopMarket => "TRAILING_STOP_MARKET",
});

string_enum!(OrderTimeInForce {
    GoodTillCancel => "GTC",
    ImmediateOrCancel => "IOC",
    FillOrKill => "FOK",
    GoodTillDate => "GTD",
});

/// A normalized execution update, produced by the gateway from the
/// exchange's `ORDER_TRADE_UPDATE` user-data event and consumed by the
/// order manager and portfolio manager.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct OrderEvent {
    pub symbol: String,
    pub order_id: u64,
    pub client_order_id: String,
    pub side: OrderSide,
    pub position_side: PositionSide,

    pub exec_type: ExecutionType,
    pub status: OrderStatus,
    pub order_type: OrderType,
    pub time_in_force: OrderTimeInForce,

    pub orig_qty: Decimal,
    pub cum_filled_qty: Decimal,
    pub avg_price: Decimal,

    pub last_qty: Decimal,
    pub last_price: Decimal,
    pub commission: Decimal,

    pub realized_pnl: Decimal,
    pub is_maker: bool,

    pub event_time_ms: i64,
    pub trade_time_ms: i64,
}

impl OrderEvent {
    /// `true` for a `Trade` execution whose order has reached `Filled` —
    /// the only event kind the portfolio manager applies to its position
    /// state. A `PartiallyFilled` status is deliberately excluded: the
    /// portfolio only ever sees the final, fully-reconciled fill for an
    /// order, matching the upstream order manager's own filter.
    pub fn is_filled_trade(&self) -> bool {
        self.exec_type == ExecutionType::Trade && self.status == OrderStatus::Filled
    }

    /// Dedup key used by the portfolio manager's applied-set LRU:
    /// `(order_id, last_qty, trade_time_ms)`.
    pub fn dedup_key(&self) -> (u64, Decimal, i64) {
        (self.order_id, self.last_qty, self.trade_time_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_wire_value_demotes_instead_of_failing() {
        let side: OrderSide = serde_json::from_str("\"LONG_SHORT_HEDGE\"").unwrap();
        assert_eq!(side, OrderSide::Unknown("LONG_SHORT_HEDGE".to_string()));
    }

    #[test]
    fn round_trips_canonical_values() {
        for variant in [OrderStatus::New, OrderStatus::Filled, OrderStatus::Canceled] {
            let encoded = serde_json::to_string(&variant).unwrap();
            let decoded: OrderStatus = serde_json::from_str(&encoded).unwrap();
            assert_eq!(decoded, variant);
        }
    }

    #[test]
    fn is_filled_trade_requires_trade_and_fill_status() {
        let mut event = sample();
        event.exec_type = ExecutionType::New;
        assert!(!event.is_filled_trade());
        event.exec_type = ExecutionType::Trade;
        event.status = OrderStatus::Filled;
        assert!(event.is_filled_trade());
    }

    fn sample() -> OrderEvent {
        OrderEvent {
            symbol: "BTCUSDT".into(),
            order_id: 1,
            client_order_id: "c1".into(),
            side: OrderSide::Buy,
            position_side: PositionSide::Both,
            exec_type: ExecutionType::Trade,
            status: OrderStatus::Filled,
            order_type: OrderType::Market,
            time_in_force: OrderTimeInForce::GoodTillCancel,
            orig_qty: Decimal::ONE,
            cum_filled_qty: Decimal::ONE,
            avg_price: Decimal::ONE,
            last_qty: Decimal::ONE,
            last_price: Decimal::ONE,
            commission: Decimal::ZERO,
            realized_pnl: Decimal::ZERO,
            is_maker: false,
            event_time_ms: 0,
            trade_time_ms: 0,
        }
    }
}
