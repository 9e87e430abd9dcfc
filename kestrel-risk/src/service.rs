//! Bus wiring for the risk manager: ATR/position-size bookkeeping per
//! candle, signal-driven order placement, and the 30-second drawdown
//! watchdog.
//!
//! Portfolio state is read via correlation-id request/response rather
//! than a shared lock (see [`kestrel_core::topic::RESPONSE`]): this
//! service never touches `kestrel-portfolio`'s state directly.

use std::time::Duration;

use kestrel_bus::{CircuitBreaker, MessageBus};
use kestrel_core::model::{Kline, OrderBook, SignalUpdate};
use kestrel_core::shutdown::ShutdownSignal;
use kestrel_core::topic;
use kestrel_portfolio::{service::STATS_REQUEST_TOPIC, PortfolioSnapshot};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use tokio::time::interval;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::atr::AtrCalculator;
use crate::drawdown::DrawdownWatchdog;
use crate::engine::{on_signal_update, Action, SignalContext};

const DRAWDOWN_CHECK_INTERVAL: Duration = Duration::from_secs(30);
const PORTFOLIO_REQUEST_TIMEOUT: Duration = Duration::from_secs(2);

/// The asset the drawdown watchdog tracks. The bot is USD-M futures only.
const MARGIN_ASSET: &str = "USDT";

/// Mirrors one row of `kestrel-gateway`'s `GET /fapi/v2/balance` response,
/// just enough of it to pull the margin wallet balance out of an
/// `API@request` reply without depending on the gateway crate for its
/// wire types.
#[derive(Debug, serde::Deserialize)]
struct BalanceRow {
    asset: String,
    balance: Decimal,
}

/// Mirrors one row of `kestrel-gateway`'s `GET /fapi/v2/positionRisk`
/// response, for the same reason as [`BalanceRow`].
#[derive(Debug, serde::Deserialize)]
struct PositionRow {
    #[serde(rename = "positionAmt")]
    position_amt: Decimal,
    #[serde(rename = "unRealizedProfit")]
    unrealized_profit: Decimal,
}

#[derive(Debug, Clone)]
pub struct RiskConfig {
    pub symbol: String,
    pub max_risk_per_trade_pct: Decimal,
    pub max_exposure_pct: Decimal,
    pub max_relative_drawdown: Decimal,
    pub max_absolute_drawdown: Decimal,
    pub atr_multiplier: Decimal,
}

pub struct RiskService {
    bus: MessageBus,
    circuit_breaker: CircuitBreaker,
    config: RiskConfig,
    atr: AtrCalculator,
    watchdog: DrawdownWatchdog,
    last_mid_price: Decimal,
    emergency_shutdown: bool,
}

impl RiskService {
    pub fn new(bus: MessageBus, circuit_breaker: CircuitBreaker, config: RiskConfig) -> Self {
        Self {
            bus,
            circuit_breaker,
            config,
            atr: AtrCalculator::default(),
            watchdog: DrawdownWatchdog::new(config.max_relative_drawdown, config.max_absolute_drawdown),
            last_mid_price: Decimal::ZERO,
            emergency_shutdown: false,
        }
    }

    pub async fn run(mut self, shutdown: ShutdownSignal) -> Result<(), kestrel_bus::BusError> {
        let mut signals = self.bus.subscribe::<SignalUpdate>(topic::SIGNAL).await?;
        let mut books = self.bus.subscribe::<OrderBook>(&topic::orderbook(&self.config.symbol)).await?;
        let mut candles = self
            .bus
            .subscribe::<Kline>(&topic::candlestick(&self.config.symbol))
            .await?;
        let mut responses = self.bus.subscribe::<serde_json::Value>(topic::RESPONSE).await?;
        let mut drawdown_ticker = interval(DRAWDOWN_CHECK_INTERVAL);

        loop {
            tokio::select! {
                _ = shutdown.wait() => return Ok(()),
                envelope = books.recv() => {
                    let Some(envelope) = envelope else { return Ok(()) };
                    self.last_mid_price = envelope.value.mid_price();
                }
                envelope = candles.recv() => {
                    let Some(envelope) = envelope else { return Ok(()) };
                    if envelope.value.closed {
                        self.atr.update(&envelope.value);
                    }
                }
                envelope = signals.recv() => {
                    let Some(envelope) = envelope else { return Ok(()) };
                    self.handle_signal(envelope.value, &mut responses).await;
                }
                _ = drawdown_ticker.tick() => {
                    self.check_drawdown(&mut responses).await;
                }
            }
        }
    }

    async fn handle_signal(
        &mut self,
        update: SignalUpdate,
        responses: &mut tokio::sync::mpsc::Receiver<kestrel_core::envelope::Envelope<serde_json::Value>>,
    ) {
        if self.emergency_shutdown {
            warn!("emergency shutdown active, ignoring signal");
            return;
        }

        match self.circuit_breaker.allow_request().await {
            Ok(false) => {
                warn!("circuit breaker open, ignoring signal");
                if !self.emergency_shutdown {
                    warn!("circuit breaker observed open for the first time, liquidating");
                    self.emergency_shutdown = true;
                    self.emergency_liquidation().await;
                }
                return;
            }
            Err(err) => {
                error!(%err, "failed to check circuit breaker");
                return;
            }
            Ok(true) => {}
        }

        // A timed-out or unreachable portfolio reply must not be treated as
        // "drop the signal": a flat position is itself a valid, common
        // portfolio state (see `on_signal_update`'s flat branch), so a
        // missing snapshot falls back to one rather than silently
        // preventing the very first position from ever opening.
        let snapshot = self
            .request_portfolio_stats(&update.symbol, responses)
            .await
            .unwrap_or_else(|| {
                warn!(symbol = %update.symbol, "no portfolio stats available, assuming flat");
                PortfolioSnapshot {
                    symbol: update.symbol.clone(),
                    qty: Decimal::ZERO,
                    avg_price: Decimal::ZERO,
                    realized_pnl: Decimal::ZERO,
                    unrealized_pnl: Decimal::ZERO,
                    last_best_bid: Decimal::ZERO,
                    last_best_ask: Decimal::ZERO,
                    total_commissions: Decimal::ZERO,
                    total_pnl: Decimal::ZERO,
                    cash_balance: Decimal::ZERO,
                }
            });

        let ctx = SignalContext {
            signal: update.signal,
            position_qty: snapshot.qty,
            entry_price: snapshot.avg_price,
            current_price: self.last_mid_price,
            unrealized_pnl: snapshot.unrealized_pnl,
            cash_balance: snapshot.cash_balance,
            atr: self.atr.current(),
            max_risk_per_trade_pct: self.config.max_risk_per_trade_pct,
            max_exposure_pct: self.config.max_exposure_pct,
            atr_multiplier: self.config.atr_multiplier,
        };

        let Some(action) = on_signal_update(ctx) else {
            info!(symbol = %update.symbol, "no action for signal");
            return;
        };

        self.place_order(&update.symbol, action).await;
    }

    async fn place_order(&self, symbol: &str, action: Action) {
        let (side, qty) = match action {
            Action::OpenLong(qty) | Action::ScaleLong(qty) => ("BUY", qty),
            Action::OpenShort(qty) | Action::ScaleShort(qty) => ("SELL", qty),
            Action::CloseLong(qty) => ("SELL", qty),
            Action::CloseShort(qty) => ("BUY", qty),
        };

        let request = serde_json::json!({
            "action": "place_order",
            "symbol": symbol,
            "side": side,
            "order_type": "MARKET",
            "quantity": qty.to_string(),
        });

        info!(symbol, side, %qty, "submitting order");
        if let Err(err) = self.bus.publish(topic::API_REQUEST, request, None).await {
            error!(%err, "failed to publish order request");
        }
    }

    /// Sources the watchdog's portfolio value from the exchange directly
    /// (margin wallet balance + unrealized PnL of every open position),
    /// not from `kestrel-portfolio`'s own state: that state tracks a
    /// placeholder cash balance and only the configured symbol, which
    /// would make the drawdown check blind to positions opened outside
    /// this bot or to the real account balance it lives against.
    async fn check_drawdown(
        &mut self,
        responses: &mut tokio::sync::mpsc::Receiver<kestrel_core::envelope::Envelope<serde_json::Value>>,
    ) {
        let Some(portfolio_value) = self.real_portfolio_value(responses).await else {
            warn!("no account data available, skipping drawdown check");
            return;
        };

        if let Some(breach) = self.watchdog.check(portfolio_value) {
            error!(
                relative_dd = %breach.relative_dd,
                absolute_dd = %breach.absolute_dd,
                "drawdown limit breached, triggering emergency liquidation"
            );
            self.emergency_shutdown = true;
            self.emergency_liquidation().await;
            if let Err(err) = self.circuit_breaker.force_open().await {
                error!(%err, "failed to force circuit breaker open after drawdown breach");
            }
        }
    }

    async fn emergency_liquidation(&self) {
        let request = serde_json::json!({
            "action": "close",
            "symbol": self.config.symbol,
        });
        if let Err(err) = self.bus.publish(topic::API_REQUEST, request, None).await {
            error!(%err, "failed to publish emergency liquidation request");
        }
    }

    /// Requests a snapshot from `kestrel-portfolio`.
    async fn request_portfolio_stats(
        &self,
        symbol: &str,
        responses: &mut tokio::sync::mpsc::Receiver<kestrel_core::envelope::Envelope<serde_json::Value>>,
    ) -> Option<PortfolioSnapshot> {
        self.request(STATS_REQUEST_TOPIC, serde_json::json!({ "symbol": symbol }), responses)
            .await
    }

    /// Margin wallet balance plus the unrealized PnL of every open
    /// position, both fetched straight from the exchange through
    /// `kestrel-gateway`'s `API@request` responder.
    async fn real_portfolio_value(
        &self,
        responses: &mut tokio::sync::mpsc::Receiver<kestrel_core::envelope::Envelope<serde_json::Value>>,
    ) -> Option<Decimal> {
        let balances: Vec<BalanceRow> = self
            .request(topic::API_REQUEST, serde_json::json!({ "action": "account_balance" }), responses)
            .await?;
        let cash = balances
            .into_iter()
            .find(|row| row.asset == MARGIN_ASSET)
            .map(|row| row.balance)
            .unwrap_or(Decimal::ZERO);

        let positions: Vec<PositionRow> = self
            .request(
                topic::API_REQUEST,
                serde_json::json!({ "action": "positions", "all_symbols": true }),
                responses,
            )
            .await?;
        let unrealized: Decimal = positions
            .into_iter()
            .filter(|row| !row.position_amt.is_zero())
            .map(|row| row.unrealized_profit)
            .sum();

        Some(cash + unrealized)
    }

    /// Publishes `payload` to `topic` with a fresh correlation id and waits
    /// (briefly) for the matching reply on [`topic::RESPONSE`], ignoring
    /// replies meant for a different in-flight request.
    async fn request<T: DeserializeOwned>(
        &self,
        topic: &str,
        payload: serde_json::Value,
        responses: &mut tokio::sync::mpsc::Receiver<kestrel_core::envelope::Envelope<serde_json::Value>>,
    ) -> Option<T> {
        let correlation_id = Uuid::new_v4();
        if let Err(err) = self.bus.publish(topic, payload, Some(correlation_id)).await {
            error!(%err, %topic, "failed to publish request");
            return None;
        }

        let deadline = tokio::time::sleep(PORTFOLIO_REQUEST_TIMEOUT);
        tokio::pin!(deadline);

        loop {
            tokio::select! {
                _ = &mut deadline => return None,
                envelope = responses.recv() => {
                    let envelope = envelope?;
                    if envelope.correlation_id != Some(correlation_id) {
                        continue;
                    }
                    return serde_json::from_value(envelope.value).ok();
                }
            }
        }
    }
}
