#![forbid(unsafe_code)]
#![warn(unused, missing_debug_implementations, rust_2018_idioms)]

//! # kestrel-gateway
//!
//! The only component that talks to the exchange directly: ingests
//! Binance's combined market-data and user-data websocket streams,
//! normalizes every message into `kestrel-core` types, republishes them on
//! the bus, and exposes a signed REST client for order placement.

pub mod backoff;
pub mod error;
pub mod normalize;
pub mod rest;
pub mod stream;
pub mod wire;

pub use error::GatewayError;
pub use rest::{RestClient, RestConfig};
pub use stream::{GatewayConfig, MarketGateway};
