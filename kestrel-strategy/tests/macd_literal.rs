//! Literal scenario: feeding the sequence
//! `[45000, 46000, 45500, 47000, 46500, 46000]` through the default
//! (12/26/9) incremental MACD should land on the same MACD/Signal pair as
//! a batch `pandas.ewm` computation over the same closes, and the first
//! signal to fire should be Buy.

use kestrel_core::model::Signal;
use kestrel_strategy::{MacdConfig, MacdStrategy};

const CLOSES: [f64; 6] = [45000.0, 46000.0, 45500.0, 47000.0, 46500.0, 46000.0];

#[test]
fn matches_the_reference_macd_and_signal_line() {
    let mut strategy = MacdStrategy::new(MacdConfig::default());
    let mut emitted = Vec::new();

    for (i, close) in CLOSES.into_iter().enumerate() {
        if let Some(signal) = strategy.on_closed_candle(i as i64, close) {
            emitted.push(signal);
        }
    }

    assert_eq!(emitted.first(), Some(&Signal::Buy));
    assert!((strategy.macd().unwrap() - 307.064).abs() < 1e-3);
    assert!((strategy.signal_line().unwrap() - 156.763).abs() < 1e-3);
}
