//! Signed REST client for Binance USD-M futures: order placement, position
//! and balance queries, and listen-key lifecycle for the user-data stream.

use hmac::{Hmac, Mac};
use rust_decimal::Decimal;
use serde::Deserialize;
use sha2::Sha256;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::debug;

use crate::error::GatewayError;
use crate::wire::{AccountBalanceEntry, ListenKeyResponse, PositionRiskEntry};

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone)]
pub struct RestConfig {
    pub base_url: String,
    pub api_key: String,
    pub api_secret: String,
}

#[derive(Debug, Clone)]
pub struct RestClient {
    http: reqwest::Client,
    config: RestConfig,
}

impl RestClient {
    pub fn new(config: RestConfig) -> Result<Self, GatewayError> {
        if config.api_key.is_empty() || config.api_secret.is_empty() {
            return Err(GatewayError::MissingCredentials(
                "BINANCE_API_KEY / BINANCE_API_SECRET must be set".to_string(),
            ));
        }
        Ok(Self {
            http: reqwest::Client::new(),
            config,
        })
    }

    fn sign(&self, query: &str) -> String {
        let mut mac = HmacSha256::new_from_slice(self.config.api_secret.as_bytes())
            .expect("hmac accepts keys of any length");
        mac.update(query.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    fn timestamp_ms() -> u128 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system clock is after 1970")
            .as_millis()
    }

    async fn signed_request<T: for<'de> Deserialize<'de>>(
        &self,
        method: reqwest::Method,
        path: &str,
        mut params: Vec<(String, String)>,
    ) -> Result<T, GatewayError> {
        params.push(("timestamp".to_string(), Self::timestamp_ms().to_string()));
        let query = params
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&");
        let signature = self.sign(&query);

        let url = format!("{}{}?{}&signature={}", self.config.base_url, path, query, signature);
        debug!(%path, "sending signed request");

        let response = self
            .http
            .request(method, url)
            .header("X-MBX-APIKEY", &self.config.api_key)
            .send()
            .await?;

        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::ExchangeRejected(body));
        }

        Ok(response.json::<T>().await?)
    }

    pub async fn place_order(
        &self,
        symbol: &str,
        side: &str,
        order_type: &str,
        quantity: Decimal,
        price: Option<Decimal>,
    ) -> Result<serde_json::Value, GatewayError> {
        let mut params = vec![
            ("symbol".to_string(), symbol.to_string()),
            ("side".to_string(), side.to_string()),
            ("type".to_string(), order_type.to_string()),
            ("quantity".to_string(), quantity.to_string()),
        ];
        if let Some(price) = price {
            params.push(("price".to_string(), price.to_string()));
            params.push(("timeInForce".to_string(), "GTC".to_string()));
        }
        self.signed_request(reqwest::Method::POST, "/fapi/v1/order", params)
            .await
    }

    pub async fn cancel_order(&self, symbol: &str, order_id: u64) -> Result<serde_json::Value, GatewayError> {
        let params = vec![
            ("symbol".to_string(), symbol.to_string()),
            ("orderId".to_string(), order_id.to_string()),
        ];
        self.signed_request(reqwest::Method::DELETE, "/fapi/v1/order", params)
            .await
    }

    /// Queries open positions. `symbol = None` fetches every symbol on the
    /// account, used by [`Self::place_order`]'s caller (the emergency
    /// liquidation path) to close out positions regardless of which symbol
    /// this gateway instance is configured for.
    pub async fn position_risk(&self, symbol: Option<&str>) -> Result<Vec<PositionRiskEntry>, GatewayError> {
        let params = match symbol {
            Some(symbol) => vec![("symbol".to_string(), symbol.to_string())],
            None => vec![],
        };
        self.signed_request(reqwest::Method::GET, "/fapi/v2/positionRisk", params)
            .await
    }

    pub async fn account_balance(&self) -> Result<Vec<AccountBalanceEntry>, GatewayError> {
        self.signed_request(reqwest::Method::GET, "/fapi/v2/balance", vec![])
            .await
    }

    pub async fn start_listen_key(&self) -> Result<String, GatewayError> {
        let url = format!("{}/fapi/v1/listenKey", self.config.base_url);
        let response: ListenKeyResponse = self
            .http
            .post(url)
            .header("X-MBX-APIKEY", &self.config.api_key)
            .send()
            .await?
            .json()
            .await?;
        Ok(response.listen_key)
    }

    /// Must be called roughly every 30 minutes; the session otherwise
    /// expires after 60 (see `gateway::stream`'s 15-minute keepalive timer).
    pub async fn keepalive_listen_key(&self) -> Result<(), GatewayError> {
        let url = format!("{}/fapi/v1/listenKey", self.config.base_url);
        self.http
            .put(url)
            .header("X-MBX-APIKEY", &self.config.api_key)
            .send()
            .await?;
        Ok(())
    }

    /// Fetches closed historical klines for strategy warm-start, as the
    /// original's `get_close_prices_df(limit=200)` does. Public endpoint,
    /// no signature required.
    pub async fn historical_closes(
        &self,
        symbol: &str,
        interval: &str,
        limit: u32,
    ) -> Result<Vec<(i64, Decimal)>, GatewayError> {
        let url = format!(
            "{}/fapi/v1/klines?symbol={symbol}&interval={interval}&limit={limit}",
            self.config.base_url
        );
        let raw: Vec<serde_json::Value> = self.http.get(url).send().await?.json().await?;

        Ok(raw
            .into_iter()
            .filter_map(|row| {
                let row = row.as_array()?;
                let start_time_ms = row.first()?.as_i64()?;
                let close: Decimal = row.get(4)?.as_str()?.parse().ok()?;
                Some((start_time_ms, close))
            })
            .collect())
    }
}
