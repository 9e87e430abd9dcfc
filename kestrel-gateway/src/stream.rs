//! The market data + user data gateway run loop: connects to Binance's
//! combined websocket streams, reconnects with [`Backoff`] on any drop,
//! normalizes every message into `kestrel-core` types, and republishes them
//! on the bus. Also answers `API@request` messages (place/cancel order,
//! positions, account balance) by calling through to [`RestClient`].

use futures_util::{SinkExt, StreamExt};
use kestrel_bus::MessageBus;
use kestrel_core::model::{Kline, OrderBook, OrderEvent};
use kestrel_core::shutdown::ShutdownSignal;
use kestrel_core::topic;
use std::time::Duration;
use tokio::time::interval;
use tokio_tungstenite::tungstenite::Message;
use tracing::{error, info, warn};

use crate::backoff::Backoff;
use crate::error::GatewayError;
use crate::normalize;
use crate::rest::RestClient;
use crate::wire::{DepthUpdate, KlineUpdate, UserDataEvent};

const LISTEN_KEY_KEEPALIVE: Duration = Duration::from_secs(15 * 60);

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub symbol: String,
    pub interval: String,
    pub ws_base_url: String,
}

pub struct MarketGateway {
    config: GatewayConfig,
    bus: MessageBus,
    rest: RestClient,
}

impl MarketGateway {
    pub fn new(config: GatewayConfig, bus: MessageBus, rest: RestClient) -> Self {
        Self { config, bus, rest }
    }

    /// Runs the market-data stream, the user-data stream, the listen-key
    /// keepalive timer and the API responder concurrently until
    /// `shutdown` fires. Each sub-loop reconnects independently; one
    /// stream dropping does not take the others down with it.
    pub async fn run(self, shutdown: ShutdownSignal) -> Result<(), GatewayError> {
        let market = self.run_market_data(shutdown.clone());
        let user = self.run_user_data(shutdown.clone());
        let keepalive = self.run_listen_key_keepalive(shutdown.clone());
        let api = self.run_api_responder(shutdown);

        tokio::join!(market, user, keepalive, api);
        Ok(())
    }

    async fn run_market_data(&self, shutdown: ShutdownSignal) {
        let mut backoff = Backoff::new();
        let stream_path = format!(
            "/stream?streams={symbol}@depth/{symbol}@kline_{interval}",
            symbol = self.config.symbol.to_lowercase(),
            interval = self.config.interval,
        );
        let url = format!("{}{}", self.config.ws_base_url, stream_path);

        loop {
            if shutdown.is_triggered() {
                return;
            }

            match tokio_tungstenite::connect_async(&url).await {
                Ok((socket, _)) => {
                    info!(symbol = %self.config.symbol, "market data stream connected");
                    backoff.reset();
                    self.consume_market_data(socket, &shutdown).await;
                }
                Err(err) => warn!(%err, "market data connection failed"),
            }

            if shutdown.is_triggered() {
                return;
            }
            tokio::time::sleep(backoff.next_delay()).await;
        }
    }

    async fn consume_market_data(
        &self,
        mut socket: tokio_tungstenite::WebSocketStream<
            tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
        >,
        shutdown: &ShutdownSignal,
    ) {
        loop {
            tokio::select! {
                _ = shutdown.wait() => return,
                msg = socket.next() => {
                    let Some(Ok(Message::Text(text))) = msg else {
                        warn!("market data stream closed");
                        return;
                    };
                    self.handle_market_data_message(&text).await;
                }
            }
        }
    }

    async fn handle_market_data_message(&self, text: &str) {
        if let Ok(depth) = serde_json::from_str::<DepthUpdate>(text) {
            if let Some(book) = normalize::order_book_from_depth(&depth) {
                self.publish_book(book).await;
                return;
            }
        }
        if let Ok(kline) = serde_json::from_str::<KlineUpdate>(text) {
            let kline = normalize::kline_from_update(&kline);
            // Only closed candles are a meaningful indicator input (open
            // question (b), resolved in DESIGN.md): an in-progress candle
            // never reaches the strategy or risk manager.
            if kline.closed {
                self.publish_kline(kline).await;
            }
        }
    }

    async fn publish_book(&self, book: OrderBook) {
        let topic = topic::orderbook(&book.contract_name);
        if let Err(err) = self.bus.publish(&topic, book, None).await {
            error!(%err, "failed to publish order book");
        }
    }

    async fn publish_kline(&self, kline: Kline) {
        let topic = topic::candlestick(&kline.symbol);
        if let Err(err) = self.bus.publish(&topic, kline, None).await {
            error!(%err, "failed to publish kline");
        }
    }

    async fn run_user_data(&self, shutdown: ShutdownSignal) {
        let mut backoff = Backoff::new();

        loop {
            if shutdown.is_triggered() {
                return;
            }

            let listen_key = match self.rest.start_listen_key().await {
                Ok(key) => key,
                Err(err) => {
                    error!(%err, "failed to obtain listen key");
                    tokio::time::sleep(backoff.next_delay()).await;
                    continue;
                }
            };

            let url = format!("{}/ws/{}", self.config.ws_base_url, listen_key);
            match tokio_tungstenite::connect_async(&url).await {
                Ok((socket, _)) => {
                    info!("user data stream connected");
                    backoff.reset();
                    self.consume_user_data(socket, &shutdown).await;
                }
                Err(err) => warn!(%err, "user data connection failed"),
            }

            if shutdown.is_triggered() {
                return;
            }
            tokio::time::sleep(backoff.next_delay()).await;
        }
    }

    async fn consume_user_data(
        &self,
        mut socket: tokio_tungstenite::WebSocketStream<
            tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
        >,
        shutdown: &ShutdownSignal,
    ) {
        loop {
            tokio::select! {
                _ = shutdown.wait() => return,
                msg = socket.next() => {
                    let Some(Ok(Message::Text(text))) = msg else {
                        warn!("user data stream closed");
                        return;
                    };
                    self.handle_user_data_message(&text).await;
                }
            }
        }
    }

    async fn handle_user_data_message(&self, text: &str) {
        let Ok(event) = serde_json::from_str::<UserDataEvent>(text) else {
            warn!(%text, "failed to decode user data event");
            return;
        };

        match event {
            UserDataEvent::OrderTradeUpdate { event_time_ms, order } => {
                let event: OrderEvent = normalize::order_event_from_update(event_time_ms, &order);
                let topic = topic::execution(&event.symbol);
                if let Err(err) = self.bus.publish(&topic, event, None).await {
                    error!(%err, "failed to publish execution update");
                }
            }
            UserDataEvent::ListenKeyExpired { .. } => {
                warn!("listen key expired, reconnecting user data stream");
            }
            UserDataEvent::Other => {}
        }
    }

    async fn run_listen_key_keepalive(&self, shutdown: ShutdownSignal) {
        let mut ticker = interval(LISTEN_KEY_KEEPALIVE);
        loop {
            tokio::select! {
                _ = shutdown.wait() => return,
                _ = ticker.tick() => {
                    if let Err(err) = self.rest.keepalive_listen_key().await {
                        warn!(%err, "listen key keepalive failed");
                    }
                }
            }
        }
    }

    /// Answers `API@request` envelopes on behalf of the admin HTTP adapter
    /// in `kestrel-execution`, replying on [`topic::RESPONSE`] tagged with
    /// the request's `correlation_id`.
    async fn run_api_responder(&self, shutdown: ShutdownSignal) {
        let mut requests = match self
            .bus
            .subscribe::<serde_json::Value>(topic::API_REQUEST)
            .await
        {
            Ok(rx) => rx,
            Err(err) => {
                error!(%err, "failed to subscribe to API requests");
                return;
            }
        };

        loop {
            tokio::select! {
                _ = shutdown.wait() => return,
                envelope = requests.recv() => {
                    let Some(envelope) = envelope else { return };
                    self.handle_api_request(envelope.value, envelope.correlation_id).await;
                }
            }
        }
    }

    async fn handle_api_request(&self, request: serde_json::Value, correlation_id: Option<uuid::Uuid>) {
        let action = request.get("action").and_then(|a| a.as_str()).unwrap_or("");
        let response = match action {
            "positions" => {
                let all_symbols = request.get("all_symbols").and_then(|v| v.as_bool()).unwrap_or(false);
                let symbol = if all_symbols { None } else { Some(self.config.symbol.as_str()) };
                self.rest
                    .position_risk(symbol)
                    .await
                    .and_then(|rows| serde_json::to_value(rows).map_err(Into::into))
            }
            "account_balance" => self
                .rest
                .account_balance()
                .await
                .and_then(|rows| serde_json::to_value(rows).map_err(Into::into)),
            "cancel_order" => {
                let order_id = request.get("order_id").and_then(|v| v.as_u64()).unwrap_or(0);
                self.rest.cancel_order(&self.config.symbol, order_id).await
            }
            "place_order" => {
                let symbol = request.get("symbol").and_then(|v| v.as_str()).unwrap_or(&self.config.symbol);
                let side = request.get("side").and_then(|v| v.as_str()).unwrap_or("BUY");
                let order_type = request.get("order_type").and_then(|v| v.as_str()).unwrap_or("MARKET");
                let quantity = request
                    .get("quantity")
                    .and_then(|v| v.as_str())
                    .and_then(|v| v.parse().ok())
                    .unwrap_or_default();
                let price = request.get("price").and_then(|v| v.as_str()).and_then(|v| v.parse().ok());
                self.rest.place_order(symbol, side, order_type, quantity, price).await
            }
            "close" => self.liquidate_all_positions().await,
            other => {
                warn!(action = %other, "unrecognised API request action");
                Ok(serde_json::json!({ "error": format!("unknown action: {other}") }))
            }
        };

        let payload = response.unwrap_or_else(|err| serde_json::json!({ "error": err.to_string() }));
        if let Err(err) = self.bus.publish(topic::RESPONSE, payload, correlation_id).await {
            error!(%err, "failed to publish API response");
        }
    }

    /// Emergency liquidation: fetches every real, non-zero position
    /// on the account and submits a Market order of `|qty|` on the
    /// opposite side for each. Best-effort — a failure to close one
    /// position is logged and does not stop the rest from being
    /// attempted, mirroring the original's `liquidate_positions`.
    async fn liquidate_all_positions(&self) -> Result<serde_json::Value, GatewayError> {
        let positions = self.rest.position_risk(None).await?;
        let mut closed = Vec::new();

        for position in positions.into_iter().filter(|p| !p.position_amt.is_zero()) {
            let side = if position.position_amt.is_sign_positive() { "SELL" } else { "BUY" };
            let qty = position.position_amt.abs();
            match self.rest.place_order(&position.symbol, side, "MARKET", qty, None).await {
                Ok(_) => {
                    info!(symbol = %position.symbol, side, %qty, "emergency liquidation order submitted");
                    closed.push(serde_json::json!({ "symbol": position.symbol, "side": side, "qty": qty.to_string() }));
                }
                Err(err) => {
                    error!(symbol = %position.symbol, %err, "failed to liquidate position");
                }
            }
        }

        Ok(serde_json::json!({ "liquidated": closed }))
    }
}
