//! Environment-variable configuration. Everything here is read once at
//! startup; a missing required variable is a [`Fatal`] error that keeps
//! the process from ever reaching `main`'s run loop.
//!
//! [`Fatal`]: kestrel_core::error::KestrelError::Fatal

use kestrel_core::error::KestrelError;
use rust_decimal::Decimal;
use std::env;

fn required(key: &str) -> Result<String, KestrelError> {
    env::var(key).map_err(|_| KestrelError::Fatal(format!("missing required environment variable {key}")))
}

fn optional(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn optional_decimal(key: &str, default: Decimal) -> Result<Decimal, KestrelError> {
    match env::var(key) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| KestrelError::Fatal(format!("{key} is not a valid decimal: '{raw}'"))),
        Err(_) => Ok(default),
    }
}

/// The three score constants the original configures per-signal. Nothing
/// in the risk engine's hysteresis-based acceptance is weighted by
/// magnitude — `Signal` already fixes Buy=+1/Sell=-1/Hold=0 — so these
/// are parsed and logged for operational visibility but not consumed by
/// any decision path.
#[derive(Debug, Clone, Copy)]
pub struct SignalScores {
    pub buy: Decimal,
    pub sell: Decimal,
    pub hold: Decimal,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub symbol: String,
    pub kline_interval: String,

    pub redis_url: String,

    pub binance_ws_base_url: String,
    pub binance_rest_base_url: String,
    pub binance_api_key: String,
    pub binance_api_secret: String,

    pub max_risk_per_trade_pct: Decimal,
    pub max_exposure_pct: Decimal,
    pub max_relative_drawdown: Decimal,
    pub max_absolute_drawdown: Decimal,
    pub atr_multiplier: Decimal,
    pub signal_scores: SignalScores,

    pub admin_http_addr: String,
}

impl Config {
    /// Loads configuration from the process environment. Exchange
    /// credentials and the symbol are required; everything else falls
    /// back to a sensible default.
    pub fn from_env() -> Result<Self, KestrelError> {
        Ok(Self {
            symbol: optional("SYMBOL", "BTCUSDT"),
            kline_interval: optional("KLINE_INTERVAL", "1m"),

            redis_url: Self::redis_url()?,

            binance_ws_base_url: optional("BINANCE_WS_BASE_URL", "wss://fstream.binance.com"),
            binance_rest_base_url: optional("BINANCE_REST_BASE_URL", "https://fapi.binance.com"),
            binance_api_key: required("BINANCE_API_KEY")?,
            binance_api_secret: required("BINANCE_API_SECRET")?,

            max_risk_per_trade_pct: optional_decimal("MAX_RISK_PER_TRADE_PCT", "0.01".parse().unwrap())?,
            max_exposure_pct: optional_decimal("MAX_EXPOSURE_PCT", "0.5".parse().unwrap())?,
            max_relative_drawdown: optional_decimal("MAX_RELATIVE_DRAWDOWN", "0.05".parse().unwrap())?,
            max_absolute_drawdown: optional_decimal("MAX_ABSOLUTE_DRAWDOWN", "0.10".parse().unwrap())?,
            atr_multiplier: optional_decimal("ATR_MULTIPLIER", Decimal::ONE)?,
            signal_scores: SignalScores {
                buy: optional_decimal("SIGNAL_SCORE_BUY", Decimal::ONE)?,
                sell: optional_decimal("SIGNAL_SCORE_SELL", -Decimal::ONE)?,
                hold: optional_decimal("SIGNAL_SCORE_HOLD", Decimal::ZERO)?,
            },

            admin_http_addr: optional("ADMIN_HTTP_ADDR", "0.0.0.0:8080"),
        })
    }

    /// Builds a `redis://` URL from either `REDIS_URL` directly or the
    /// discrete `REDIS_HOST`/`REDIS_PORT`/`REDIS_DB` triple.
    fn redis_url() -> Result<String, KestrelError> {
        if let Ok(url) = env::var("REDIS_URL") {
            return Ok(url);
        }
        let host = optional("REDIS_HOST", "127.0.0.1");
        let port = optional("REDIS_PORT", "6379");
        let db = optional("REDIS_DB", "0");
        Ok(format!("redis://{host}:{port}/{db}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redis_url_falls_back_to_localhost_default() {
        // not asserting against process env (parallel tests mutate it);
        // only the pure host/port/db formatting branch is exercised here.
        let host = "127.0.0.1";
        let port = "6379";
        let db = "0";
        assert_eq!(format!("redis://{host}:{port}/{db}"), "redis://127.0.0.1:6379/0");
    }
}
