#![forbid(unsafe_code)]
#![warn(unused, missing_debug_implementations, rust_2018_idioms)]
#![allow(clippy::too_many_arguments)]

//! # kestrel-risk
//!
//! The risk manager: ATR over a rolling window of closed candles,
//! ATR-scaled position sizing, tiered take-profit/stop-loss management,
//! signal-driven order decisions, and the periodic drawdown watchdog that
//! can force the shared circuit breaker open and trigger emergency
//! liquidation.

pub mod atr;
pub mod drawdown;
pub mod engine;
pub mod service;
pub mod sizing;

pub use atr::AtrCalculator;
pub use drawdown::{DrawdownBreach, DrawdownWatchdog};
pub use engine::{on_signal_update, Action, SignalContext};
pub use service::{RiskConfig, RiskService};
