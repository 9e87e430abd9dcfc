#![forbid(unsafe_code)]
#![warn(unused, missing_debug_implementations, rust_2018_idioms)]

//! # kestrel-portfolio
//!
//! Owns the bot's view of its own position: applies execution fills with a
//! weighted-average-entry-price algorithm, books realized PnL on any fill
//! that reduces, squares off, or reverses a position, and recomputes
//! unrealized PnL from every order-book tick.

pub mod service;
pub mod state;

pub use service::{PortfolioService, PortfolioSnapshot};
pub use state::{Portfolio, SymbolStats};
