//! The out-of-core admin HTTP surface: `GET /position`,
//! `POST /create-order`, `POST /create-market-order`, `POST /cancel-order`,
//! `GET /portfolio_state`. Thin by design — no auth, no rate limiting — it
//! exists so [`crate::store::OrderStore`] and the bus's request/response
//! pattern have a realistic external consumer, not as a hardened public API.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use kestrel_bus::MessageBus;
use kestrel_core::topic;
use rust_decimal::Decimal;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, warn};
use uuid::Uuid;

use crate::store::OrderStore;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Clone)]
pub struct AdminState {
    bus: MessageBus,
    symbol: String,
    store: Arc<dyn OrderStore>,
}

impl AdminState {
    pub fn new(bus: MessageBus, symbol: String, store: Arc<dyn OrderStore>) -> Self {
        Self { bus, symbol, store }
    }
}

impl std::fmt::Debug for AdminState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminState")
            .field("symbol", &self.symbol)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

struct ApiError(StatusCode, String);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.0, Json(ErrorBody { error: self.1 })).into_response()
    }
}

impl From<kestrel_bus::BusError> for ApiError {
    fn from(err: kestrel_bus::BusError) -> Self {
        ApiError(StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
    }
}

/// Builds the router. Served on its own task by `kestrel-supervisor`,
/// independent of the bus-driven workers.
pub fn router(state: AdminState) -> Router {
    Router::new()
        .route("/position", get(get_position))
        .route("/create-order", post(create_order))
        .route("/create-market-order", post(create_market_order))
        .route("/cancel-order", post(cancel_order))
        .route("/portfolio_state", get(get_portfolio_state))
        .with_state(state)
}

pub async fn serve(state: AdminState, addr: SocketAddr) -> std::io::Result<()> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await
}

async fn get_position(State(state): State<AdminState>) -> Result<Json<Value>, ApiError> {
    let rows = state.store.by_symbol(&state.symbol);
    Ok(Json(serde_json::to_value(rows).unwrap_or(Value::Null)))
}

#[derive(Debug, Deserialize)]
struct CreateOrderBody {
    side: String,
    quantity: Decimal,
    price: Decimal,
    #[serde(rename = "timeInForce")]
    time_in_force: Option<String>,
}

async fn create_order(
    State(state): State<AdminState>,
    Json(body): Json<CreateOrderBody>,
) -> Result<Json<Value>, ApiError> {
    let request = serde_json::json!({
        "action": "place_order",
        "symbol": state.symbol,
        "side": body.side,
        "order_type": "LIMIT",
        "quantity": body.quantity.to_string(),
        "price": body.price.to_string(),
        "time_in_force": body.time_in_force.unwrap_or_else(|| "GTC".to_string()),
    });
    dispatch(&state, topic::API_REQUEST, request).await
}

#[derive(Debug, Deserialize)]
struct CreateMarketOrderBody {
    side: String,
    quantity: Decimal,
}

async fn create_market_order(
    State(state): State<AdminState>,
    Json(body): Json<CreateMarketOrderBody>,
) -> Result<Json<Value>, ApiError> {
    let request = serde_json::json!({
        "action": "place_order",
        "symbol": state.symbol,
        "side": body.side,
        "order_type": "MARKET",
        "quantity": body.quantity.to_string(),
    });
    dispatch(&state, topic::API_REQUEST, request).await
}

#[derive(Debug, Deserialize)]
struct CancelOrderBody {
    #[serde(rename = "orderId")]
    order_id: u64,
}

async fn cancel_order(
    State(state): State<AdminState>,
    Json(body): Json<CancelOrderBody>,
) -> Result<Json<Value>, ApiError> {
    let request = serde_json::json!({
        "action": "cancel_order",
        "symbol": state.symbol,
        "order_id": body.order_id,
    });
    dispatch(&state, topic::API_REQUEST, request).await
}

async fn get_portfolio_state(State(state): State<AdminState>) -> Result<Json<Value>, ApiError> {
    let request = serde_json::json!({ "symbol": state.symbol });
    dispatch(&state, kestrel_portfolio::service::STATS_REQUEST_TOPIC, request).await
}

/// Publishes `payload` on `topic` with a fresh correlation id and awaits
/// the matching reply on `Response`, same request/response pattern the
/// risk manager uses internally.
async fn dispatch(state: &AdminState, topic: &str, payload: Value) -> Result<Json<Value>, ApiError> {
    let correlation_id = Uuid::new_v4();
    let mut responses = state
        .bus
        .subscribe::<Value>(kestrel_core::topic::RESPONSE)
        .await?;
    state.bus.publish(topic, payload, Some(correlation_id)).await?;

    let reply: Option<Value> = await_reply(&mut responses, correlation_id).await;
    match reply {
        Some(value) => Ok(Json(value)),
        None => {
            warn!(%topic, "admin request timed out waiting for a bus reply");
            Err(ApiError(StatusCode::GATEWAY_TIMEOUT, format!("timed out waiting for reply on '{topic}'")))
        }
    }
}

async fn await_reply<T: DeserializeOwned>(
    responses: &mut tokio::sync::mpsc::Receiver<kestrel_core::envelope::Envelope<T>>,
    correlation_id: Uuid,
) -> Option<T> {
    let deadline = tokio::time::sleep(REQUEST_TIMEOUT);
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            _ = &mut deadline => return None,
            envelope = responses.recv() => {
                let envelope = envelope?;
                if envelope.correlation_id != Some(correlation_id) {
                    continue;
                }
                return Some(envelope.value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_body_serializes_with_an_error_key() {
        let body = ErrorBody { error: "boom".to_string() };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["error"], "boom");
    }
}
