use serde::{Deserialize, Serialize};

/// A strategy decision for a symbol: `Buy`/`Sell` carry the conventional
/// `+1`/`-1` score from the original scoring scheme, `Hold` is `0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum Signal {
    Buy,
    Sell,
    Hold,
}

impl Signal {
    pub fn score(self) -> i8 {
        match self {
            Signal::Buy => 1,
            Signal::Sell => -1,
            Signal::Hold => 0,
        }
    }
}

/// A [`Signal`] emitted for a specific symbol, published to the `signal`
/// topic.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SignalUpdate {
    pub signal: Signal,
    pub symbol: String,
}
