#![forbid(unsafe_code)]
#![warn(unused, missing_debug_implementations, rust_2018_idioms)]

//! # kestrel-supervisor
//!
//! Wires the bus, the circuit breaker, and every other component into
//! one running process, owns their lifecycle, and routes shutdown.

pub mod config;
pub mod supervisor;

pub use config::Config;
