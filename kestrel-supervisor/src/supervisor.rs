//! Starts every component as an independent worker, wires the breaker's
//! emergency trip to a shared shutdown flag, and drains on exit.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use kestrel_bus::{CircuitBreaker, MessageBus};
use kestrel_core::error::KestrelError;
use kestrel_core::shutdown::ShutdownSignal;
use kestrel_execution::admin::{self, AdminState};
use kestrel_execution::{InMemoryOrderStore, OrderManagerService};
use kestrel_gateway::{GatewayConfig, MarketGateway, RestClient, RestConfig};
use kestrel_portfolio::PortfolioService;
use kestrel_risk::{RiskConfig, RiskService};
use kestrel_strategy::{MacdConfig, StrategyService};
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use crate::config::Config;

const DRAIN_TIMEOUT: Duration = Duration::from_secs(2);
const BREAKER_POLL_INTERVAL: Duration = Duration::from_secs(2);
const HISTORICAL_CANDLE_LIMIT: u32 = 200;

const FAILURE_THRESHOLD: u32 = 10;
const SUCCESS_THRESHOLD: u32 = 3;
const RESET_TIMEOUT_SECS: i64 = 60;

/// Runs every component to completion. Returns once every worker has
/// observed shutdown and unwound, or the drain timeout has elapsed.
pub async fn run(config: Config) -> Result<(), KestrelError> {
    let bus = MessageBus::connect(&config.redis_url)
        .await
        .map_err(|err| KestrelError::Fatal(format!("failed to connect to redis: {err}")))?;
    let breaker = CircuitBreaker::new(bus.clone(), FAILURE_THRESHOLD, SUCCESS_THRESHOLD, RESET_TIMEOUT_SECS);

    let rest = RestClient::new(RestConfig {
        base_url: config.binance_rest_base_url.clone(),
        api_key: config.binance_api_key.clone(),
        api_secret: config.binance_api_secret.clone(),
    })
    .map_err(|err| KestrelError::Fatal(err.to_string()))?;

    let shutdown = ShutdownSignal::new();
    let mut workers = JoinSet::new();

    spawn_gateway(&mut workers, &config, bus.clone(), rest.clone(), shutdown.clone());
    let order_store = spawn_order_manager(&mut workers, &config, bus.clone(), shutdown.clone());
    spawn_portfolio(&mut workers, &config, bus.clone(), shutdown.clone());
    spawn_strategy(&mut workers, &config, bus.clone(), rest.clone(), shutdown.clone()).await;
    spawn_risk(&mut workers, &config, bus.clone(), breaker.clone(), shutdown.clone());
    spawn_admin_http(&mut workers, &config, bus.clone(), order_store, shutdown.clone());
    spawn_breaker_watcher(&mut workers, breaker, shutdown.clone());

    wait_for_shutdown_signal(shutdown.clone()).await;
    drain(workers).await;
    info!("supervisor shut down cleanly");
    Ok(())
}

fn spawn_gateway(
    workers: &mut JoinSet<()>,
    config: &Config,
    bus: MessageBus,
    rest: RestClient,
    shutdown: ShutdownSignal,
) {
    let gateway = MarketGateway::new(
        GatewayConfig {
            symbol: config.symbol.clone(),
            interval: config.kline_interval.clone(),
            ws_base_url: config.binance_ws_base_url.clone(),
        },
        bus,
        rest,
    );
    workers.spawn(async move {
        if let Err(err) = gateway.run(shutdown).await {
            error!(%err, component = "gateway", "worker exited with an error");
        }
    });
}

fn spawn_order_manager(
    workers: &mut JoinSet<()>,
    config: &Config,
    bus: MessageBus,
    shutdown: ShutdownSignal,
) -> Arc<InMemoryOrderStore> {
    let store = Arc::new(InMemoryOrderStore::new());
    let service = OrderManagerService::new(bus, config.symbol.clone(), store.clone());
    workers.spawn(async move {
        if let Err(err) = service.run(shutdown).await {
            error!(%err, component = "order_manager", "worker exited with an error");
        }
    });
    store
}

fn spawn_portfolio(workers: &mut JoinSet<()>, config: &Config, bus: MessageBus, shutdown: ShutdownSignal) {
    let service = PortfolioService::new(bus, config.symbol.clone());
    workers.spawn(async move {
        if let Err(err) = service.run(shutdown).await {
            error!(%err, component = "portfolio", "worker exited with an error");
        }
    });
}

/// Seeds the strategy from up to 200 historical closes before spawning
/// its worker. A fetch failure or empty history is not fatal: the
/// strategy admits live candles and emits Hold until both EMA periods
/// fill on their own.
async fn spawn_strategy(
    workers: &mut JoinSet<()>,
    config: &Config,
    bus: MessageBus,
    rest: RestClient,
    shutdown: ShutdownSignal,
) {
    let mut service = StrategyService::new(bus, config.symbol.clone(), MacdConfig::default());

    match rest
        .historical_closes(&config.symbol, &config.kline_interval, HISTORICAL_CANDLE_LIMIT)
        .await
    {
        Ok(history) if !history.is_empty() => {
            info!(candles = history.len(), "seeding strategy from historical closes");
            service.seed_history(history);
        }
        Ok(_) => warn!("historical close fetch returned no candles, strategy will seed live"),
        Err(err) => warn!(%err, "failed to fetch historical closes, strategy will seed live"),
    }

    workers.spawn(async move {
        if let Err(err) = service.run(shutdown).await {
            error!(%err, component = "strategy", "worker exited with an error");
        }
    });
}

fn spawn_risk(
    workers: &mut JoinSet<()>,
    config: &Config,
    bus: MessageBus,
    breaker: CircuitBreaker,
    shutdown: ShutdownSignal,
) {
    let risk_config = RiskConfig {
        symbol: config.symbol.clone(),
        max_risk_per_trade_pct: config.max_risk_per_trade_pct,
        max_exposure_pct: config.max_exposure_pct,
        max_relative_drawdown: config.max_relative_drawdown,
        max_absolute_drawdown: config.max_absolute_drawdown,
        atr_multiplier: config.atr_multiplier,
    };
    let service = RiskService::new(bus, breaker, risk_config);
    workers.spawn(async move {
        if let Err(err) = service.run(shutdown).await {
            error!(%err, component = "risk", "worker exited with an error");
        }
    });
}

/// The admin HTTP surface runs on its own task, independent of the bus
/// workers.
fn spawn_admin_http(
    workers: &mut JoinSet<()>,
    config: &Config,
    bus: MessageBus,
    order_store: Arc<InMemoryOrderStore>,
    shutdown: ShutdownSignal,
) {
    let addr: SocketAddr = match config.admin_http_addr.parse() {
        Ok(addr) => addr,
        Err(err) => {
            error!(%err, addr = %config.admin_http_addr, "invalid ADMIN_HTTP_ADDR, admin HTTP disabled");
            return;
        }
    };
    let state = AdminState::new(bus, config.symbol.clone(), order_store);

    workers.spawn(async move {
        tokio::select! {
            result = admin::serve(state, addr) => {
                if let Err(err) = result {
                    error!(%err, component = "admin_http", "admin HTTP server exited with an error");
                }
            }
            _ = shutdown.wait() => {
                info!(component = "admin_http", "shutting down");
            }
        }
    });
}

/// Polls the shared breaker for a manual trip and flips the supervisor's
/// own [`ShutdownSignal`] the first time it
/// observes one, since the breaker's state lives in Redis rather than
/// in-process: any component (including one in another OS process) can be
/// the one that called `force_open`.
fn spawn_breaker_watcher(workers: &mut JoinSet<()>, breaker: CircuitBreaker, shutdown: ShutdownSignal) {
    workers.spawn(async move {
        let mut ticker = tokio::time::interval(BREAKER_POLL_INTERVAL);
        loop {
            tokio::select! {
                _ = shutdown.wait() => return,
                _ = ticker.tick() => {
                    match breaker.is_emergency_tripped().await {
                        Ok(true) => {
                            error!("circuit breaker emergency trip observed, shutting down");
                            shutdown.trigger();
                            return;
                        }
                        Ok(false) => {}
                        Err(err) => warn!(%err, "failed to poll circuit breaker state"),
                    }
                }
            }
        }
    });
}

async fn wait_for_shutdown_signal(shutdown: ShutdownSignal) {
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("received ctrl-c, shutting down");
            shutdown.trigger();
        }
        _ = shutdown.wait() => {}
    }
}

/// Drains every worker within a bounded timeout. A worker still running
/// past the deadline is abandoned, not awaited further — shutdown must
/// complete even if one task is stuck.
async fn drain(mut workers: JoinSet<()>) {
    let drained = tokio::time::timeout(DRAIN_TIMEOUT, async {
        while workers.join_next().await.is_some() {}
    })
    .await;

    if drained.is_err() {
        warn!("one or more workers did not drain within the shutdown budget");
    }
}
