use derive_more::Display;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A single price tier on one side of an [`OrderBook`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Display)]
#[display("[{price} | {size}]")]
pub struct PriceLevel {
    pub price: Decimal,
    pub size: Decimal,
}

impl PriceLevel {
    pub fn new(price: Decimal, size: Decimal) -> Self {
        Self { price, size }
    }
}

/// A compact top-of-book snapshot published by the gateway.
///
/// Invariants (enforced by [`OrderBook::new`], not re-checked on every
/// field access): `bids`/`asks` are non-empty when constructed, bids are
/// sorted descending by price, asks ascending, and the top bid is strictly
/// below the top ask.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct OrderBook {
    pub contract_name: String,
    pub timestamp_ms: i64,
    pub bids: Vec<PriceLevel>,
    pub asks: Vec<PriceLevel>,
}

impl OrderBook {
    /// Builds an [`OrderBook`], returning `None` if either side is empty or
    /// the book is crossed (top bid >= top ask).
    pub fn new(
        contract_name: impl Into<String>,
        timestamp_ms: i64,
        bids: Vec<PriceLevel>,
        asks: Vec<PriceLevel>,
    ) -> Option<Self> {
        let top_bid = bids.first()?.price;
        let top_ask = asks.first()?.price;
        if top_bid >= top_ask {
            return None;
        }
        Some(Self {
            contract_name: contract_name.into(),
            timestamp_ms,
            bids,
            asks,
        })
    }

    pub fn best_bid(&self) -> Decimal {
        self.bids.first().map(|l| l.price).unwrap_or_default()
    }

    pub fn best_ask(&self) -> Decimal {
        self.asks.first().map(|l| l.price).unwrap_or_default()
    }

    /// Arithmetic mean of best bid and best ask.
    pub fn mid_price(&self) -> Decimal {
        (self.best_bid() + self.best_ask()) / Decimal::TWO
    }

    pub fn spread(&self) -> Decimal {
        self.best_ask() - self.best_bid()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn level(price: Decimal) -> PriceLevel {
        PriceLevel::new(price, dec!(1))
    }

    #[test]
    fn rejects_crossed_book() {
        let bids = vec![level(dec!(101))];
        let asks = vec![level(dec!(100))];
        assert!(OrderBook::new("BTCUSDT", 0, bids, asks).is_none());
    }

    #[test]
    fn rejects_empty_side() {
        assert!(OrderBook::new("BTCUSDT", 0, vec![], vec![level(dec!(100))]).is_none());
    }

    #[test]
    fn mid_price_is_average_of_top_of_book() {
        let book = OrderBook::new(
            "BTCUSDT",
            0,
            vec![level(dec!(99))],
            vec![level(dec!(101))],
        )
        .unwrap();
        assert_eq!(book.mid_price(), dec!(100));
    }
}
