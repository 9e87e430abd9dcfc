use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A per-symbol inventory: signed quantity (long positive, short negative)
/// plus a weighted-average entry price.
///
/// Invariant: `qty == 0 <=> avg_price == 0`. Enforced by [`Position::flat`]
/// and [`Position::new`] rather than re-checked on every read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
pub struct Position {
    pub qty: Decimal,
    pub avg_price: Decimal,
}

impl Position {
    pub fn new(qty: Decimal, avg_price: Decimal) -> Self {
        if qty.is_zero() {
            Self::flat()
        } else {
            Self { qty, avg_price }
        }
    }

    pub fn flat() -> Self {
        Self {
            qty: Decimal::ZERO,
            avg_price: Decimal::ZERO,
        }
    }

    pub fn is_flat(&self) -> bool {
        self.qty.is_zero()
    }

    pub fn is_long(&self) -> bool {
        self.qty.is_sign_positive() && !self.qty.is_zero()
    }

    pub fn is_short(&self) -> bool {
        self.qty.is_sign_negative() && !self.qty.is_zero()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn zero_qty_always_normalises_avg_to_zero() {
        let p = Position::new(Decimal::ZERO, dec!(123));
        assert_eq!(p, Position::flat());
    }

    #[test]
    fn direction_helpers() {
        assert!(Position::new(dec!(1), dec!(100)).is_long());
        assert!(Position::new(dec!(-1), dec!(100)).is_short());
        assert!(Position::flat().is_flat());
    }
}
