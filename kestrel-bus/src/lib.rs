#![forbid(unsafe_code)]
#![warn(unused, missing_debug_implementations, rust_2018_idioms)]

//! # kestrel-bus
//!
//! The Redis-backed transport every component in the workspace talks
//! through: a topic-addressed publish/subscribe fabric ([`bus::MessageBus`])
//! and a shared [`circuit_breaker::CircuitBreaker`] that gates outbound
//! order placement across every process connected to the same Redis
//! instance.

pub mod bus;
pub mod circuit_breaker;
pub mod error;

pub use bus::MessageBus;
pub use circuit_breaker::CircuitBreaker;
pub use error::BusError;
