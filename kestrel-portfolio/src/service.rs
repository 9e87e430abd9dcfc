//! Bus wiring around [`Portfolio`]: consumes execution and order-book
//! updates for the configured symbol and answers stats requests. The
//! state itself is owned exclusively by this task — nothing else in the
//! workspace mutates it directly, only through the bus.

use kestrel_bus::MessageBus;
use kestrel_core::model::{OrderBook, OrderEvent};
use kestrel_core::shutdown::ShutdownSignal;
use kestrel_core::topic;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::state::{Portfolio, SymbolStats};

pub const STATS_REQUEST_TOPIC: &str = "PortfolioManager@request";

#[derive(Debug, Deserialize)]
struct StatsRequest {
    symbol: String,
}

/// Mirrors the original's `get_portfolio_stats_by_symbol`: per-symbol
/// position/PnL fields alongside a few account-wide totals
/// (`total_commissions`, `total_pnl`, `cash_balance`).
#[derive(Debug, Clone, Serialize)]
pub struct PortfolioSnapshot {
    pub symbol: String,
    pub qty: rust_decimal::Decimal,
    pub avg_price: rust_decimal::Decimal,
    pub realized_pnl: rust_decimal::Decimal,
    pub unrealized_pnl: rust_decimal::Decimal,
    pub last_best_bid: rust_decimal::Decimal,
    pub last_best_ask: rust_decimal::Decimal,
    pub total_commissions: rust_decimal::Decimal,
    pub total_pnl: rust_decimal::Decimal,
    /// Wallet cash balance. The bot never wires in a live margin-wallet
    /// feed for this (see `original_source/app/portfolio/portfolio_manager.py`'s
    /// `self.cash = 0.0 # placeholder`) — kept as a literal zero rather than
    /// invented, per DESIGN.md.
    pub cash_balance: rust_decimal::Decimal,
}

impl PortfolioSnapshot {
    fn from_stats(symbol: &str, stats: &SymbolStats, portfolio: &Portfolio) -> Self {
        Self {
            symbol: symbol.to_string(),
            qty: stats.position.qty,
            avg_price: stats.position.avg_price,
            realized_pnl: stats.realized_pnl,
            unrealized_pnl: stats.unrealized_pnl,
            last_best_bid: stats.last_best_bid,
            last_best_ask: stats.last_best_ask,
            total_commissions: portfolio.total_commissions(),
            total_pnl: portfolio.total_realized_pnl() + portfolio.total_unrealized_pnl(),
            cash_balance: rust_decimal::Decimal::ZERO,
        }
    }
}

pub struct PortfolioService {
    bus: MessageBus,
    symbol: String,
    portfolio: Portfolio,
}

impl PortfolioService {
    pub fn new(bus: MessageBus, symbol: String) -> Self {
        Self {
            bus,
            symbol,
            portfolio: Portfolio::new(),
        }
    }

    pub async fn run(mut self, shutdown: ShutdownSignal) -> Result<(), kestrel_bus::BusError> {
        let mut executions = self
            .bus
            .subscribe::<OrderEvent>(&topic::execution(&self.symbol))
            .await?;
        let mut books = self
            .bus
            .subscribe::<OrderBook>(&topic::orderbook(&self.symbol))
            .await?;
        let mut requests = self.bus.subscribe::<StatsRequest>(STATS_REQUEST_TOPIC).await?;

        loop {
            tokio::select! {
                _ = shutdown.wait() => return Ok(()),
                envelope = executions.recv() => {
                    let Some(envelope) = envelope else { return Ok(()) };
                    let event = envelope.value;
                    info!(symbol = %event.symbol, order_id = event.order_id, "applying fill");
                    self.portfolio.on_new_trade(event);
                    self.publish_snapshot().await;
                }
                envelope = books.recv() => {
                    let Some(envelope) = envelope else { return Ok(()) };
                    let book = envelope.value;
                    self.portfolio.on_new_price(&self.symbol, book.best_bid(), book.best_ask());
                    self.publish_snapshot().await;
                }
                envelope = requests.recv() => {
                    let Some(envelope) = envelope else { continue };
                    let stats = self.portfolio.stats(&envelope.value.symbol);
                    let snapshot = PortfolioSnapshot::from_stats(&envelope.value.symbol, &stats, &self.portfolio);
                    if let Err(err) = self.bus.publish(topic::RESPONSE, snapshot, envelope.correlation_id).await {
                        warn!(%err, "failed to publish portfolio stats response");
                    }
                }
            }
        }
    }

    async fn publish_snapshot(&self) {
        let stats = self.portfolio.stats(&self.symbol);
        let snapshot = PortfolioSnapshot::from_stats(&self.symbol, &stats, &self.portfolio);
        if let Err(err) = self.bus.publish(topic::PORTFOLIO_STATS, snapshot, None).await {
            warn!(%err, "failed to publish portfolio snapshot");
        }
    }
}
