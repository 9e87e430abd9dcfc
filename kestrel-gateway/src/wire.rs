//! Binance USD-M futures wire formats, for both the combined market-data
//! stream and the user-data stream. Field names follow Binance's terse
//! single-letter convention; `#[serde(rename = "...")]` keeps our own
//! field names readable while decoding the real payload shape.

use rust_decimal::Decimal;
use serde::Deserialize;

/// A top-of-book / partial depth update from `<symbol>@depth`.
#[derive(Debug, Clone, Deserialize)]
pub struct DepthUpdate {
    #[serde(rename = "s")]
    pub symbol: String,
    #[serde(rename = "E")]
    pub event_time_ms: i64,
    #[serde(rename = "b")]
    pub bids: Vec<(Decimal, Decimal)>,
    #[serde(rename = "a")]
    pub asks: Vec<(Decimal, Decimal)>,
}

/// A kline/candlestick update from `<symbol>@kline_<interval>`.
#[derive(Debug, Clone, Deserialize)]
pub struct KlineUpdate {
    #[serde(rename = "s")]
    pub symbol: String,
    #[serde(rename = "k")]
    pub kline: KlinePayload,
}

#[derive(Debug, Clone, Deserialize)]
pub struct KlinePayload {
    #[serde(rename = "t")]
    pub start_time_ms: i64,
    #[serde(rename = "T")]
    pub end_time_ms: i64,
    #[serde(rename = "i")]
    pub interval: String,
    #[serde(rename = "o")]
    pub open: Decimal,
    #[serde(rename = "c")]
    pub close: Decimal,
    #[serde(rename = "h")]
    pub high: Decimal,
    #[serde(rename = "l")]
    pub low: Decimal,
    #[serde(rename = "v")]
    pub volume: Decimal,
    #[serde(rename = "x")]
    pub closed: bool,
}

/// A user-data stream event, discriminated by Binance's `e` field. Only the
/// order/trade update variant is of interest; other event kinds (account
/// updates, margin calls) are parsed into `Other` and ignored.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "e")]
pub enum UserDataEvent {
    #[serde(rename = "ORDER_TRADE_UPDATE")]
    OrderTradeUpdate {
        #[serde(rename = "E")]
        event_time_ms: i64,
        #[serde(rename = "o")]
        order: OrderTradeUpdatePayload,
    },
    #[serde(rename = "listenKeyExpired")]
    ListenKeyExpired {
        #[serde(rename = "E")]
        event_time_ms: i64,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OrderTradeUpdatePayload {
    #[serde(rename = "s")]
    pub symbol: String,
    #[serde(rename = "c")]
    pub client_order_id: String,
    #[serde(rename = "S")]
    pub side: String,
    #[serde(rename = "o")]
    pub order_type: String,
    #[serde(rename = "f")]
    pub time_in_force: String,
    #[serde(rename = "q")]
    pub orig_qty: Decimal,
    #[serde(rename = "ap")]
    pub avg_price: Decimal,
    #[serde(rename = "X")]
    pub status: String,
    #[serde(rename = "i")]
    pub order_id: u64,
    #[serde(rename = "l")]
    pub last_qty: Decimal,
    #[serde(rename = "L")]
    pub last_price: Decimal,
    #[serde(rename = "z")]
    pub cum_filled_qty: Decimal,
    #[serde(rename = "n")]
    pub commission: Decimal,
    #[serde(rename = "x")]
    pub exec_type: String,
    #[serde(rename = "ps")]
    pub position_side: String,
    #[serde(rename = "rp")]
    pub realized_pnl: Decimal,
    #[serde(rename = "m")]
    pub is_maker: bool,
    #[serde(rename = "T")]
    pub trade_time_ms: i64,
}

#[derive(Debug, Clone, serde::Serialize, Deserialize)]
pub struct ListenKeyResponse {
    #[serde(rename = "listenKey")]
    pub listen_key: String,
}

/// One row of `GET /fapi/v2/positionRisk`, used both to answer
/// `API@positions` requests and to drive emergency liquidation.
#[derive(Debug, Clone, serde::Serialize, Deserialize)]
pub struct PositionRiskEntry {
    pub symbol: String,
    #[serde(rename = "positionAmt")]
    pub position_amt: Decimal,
    #[serde(rename = "entryPrice")]
    pub entry_price: Decimal,
    #[serde(rename = "unRealizedProfit")]
    pub unrealized_profit: Decimal,
}

/// One row of `GET /fapi/v2/balance`.
#[derive(Debug, Clone, serde::Serialize, Deserialize)]
pub struct AccountBalanceEntry {
    pub asset: String,
    pub balance: Decimal,
    #[serde(rename = "availableBalance")]
    pub available_balance: Decimal,
}
