#![forbid(unsafe_code)]
#![warn(unused, missing_debug_implementations, rust_2018_idioms)]
#![allow(clippy::too_many_arguments)]

//! # kestrel-execution
//!
//! The order manager: persists execution updates into an
//! [`store::OrderStore`] keyed by order id, and the admin HTTP surface
//! that sits on top of it and the bus's request/response pattern.
//! Both exist outside the bot's core decision loop — the gateway, risk
//! manager, strategy and portfolio manager never depend on this crate.

pub mod admin;
pub mod error;
pub mod service;
pub mod store;

pub use error::ExecutionError;
pub use service::OrderManagerService;
pub use store::{InMemoryOrderStore, OrderRecord, OrderStore};
