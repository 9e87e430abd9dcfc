//! Well-known bus topic names.
//!
//! Centralised so a typo in a publisher doesn't silently orphan a
//! subscriber. The request/response pair (`Self::api_request` /
//! [`RESPONSE`]) mirrors the original's single shared `Response` channel
//! disambiguated by `correlation_id`.

/// Per-symbol top-of-book / depth updates.
pub fn orderbook(symbol: &str) -> String {
    format!("orderbook:{symbol}")
}

/// Per-symbol candlestick updates (closed and in-progress).
pub fn candlestick(symbol: &str) -> String {
    format!("candlestick:{symbol}")
}

/// Per-symbol execution (order/trade) updates from the gateway's user-data
/// stream.
pub fn execution(symbol: &str) -> String {
    format!("execution:{symbol}")
}

/// Strategy-emitted [`crate::model::SignalUpdate`]s, shared across symbols.
pub const SIGNAL: &str = "signal";

/// Portfolio manager's published snapshot stats, keyed by symbol in the
/// envelope payload rather than the topic name.
pub const PORTFOLIO_STATS: &str = "PortfolioManager@stats";

/// Gateway-facing admin requests, dispatched by `action` in the payload
/// (`place_order`, `positions`, `account_balance`, `close`).
pub const API_REQUEST: &str = "API@request";

/// Shared response topic for every request/response exchange; replies are
/// matched to requests via [`crate::Envelope::correlation_id`].
pub const RESPONSE: &str = "Response";
