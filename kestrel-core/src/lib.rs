#![forbid(unsafe_code)]
#![warn(
    unused,
    clippy::cognitive_complexity,
    missing_debug_implementations,
    rust_2018_idioms
)]
#![allow(clippy::too_many_arguments)]

//! # 🦅 Kestrel Core
//!
//! Shared data model for the Kestrel futures trading bot: the wire envelope
//! exchanged over the [`kestrel-bus`](../kestrel_bus/index.html) fabric, the
//! market/account data types every component subscribes to or publishes, and
//! the small amount of ambient plumbing (error aggregation, shutdown traits,
//! logging bootstrap) every other crate in the workspace depends on.
//!
//! Nothing in this crate talks to the network or to Redis — it only defines
//! the shapes that flow across those boundaries.

pub mod envelope;
pub mod error;
pub mod logging;
pub mod model;
pub mod shutdown;
pub mod topic;

pub use envelope::Envelope;
pub use error::KestrelError;
