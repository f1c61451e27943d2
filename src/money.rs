//! Fixed-point price and quantity types.
//!
//! Ledger arithmetic must be exact, so neither type is a float.
//! `Price` is USD cents; `Qty` is satoshi-equivalent units (1e8 per
//! whole BTC). Trade value (`price * qty`) is computed in `i128` and
//! rescaled back to cents so a single large fill cannot overflow.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Neg, Sub};

/// Scale of [`Qty`]: one BTC equals this many base units.
pub const QTY_SCALE: i128 = 100_000_000;

/// Minimum price increment, in cents. $10.00.
pub const TICK_SIZE_CENTS: i64 = 1_000;

/// A USD price, represented as an integer number of cents.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Price(pub i64);

impl Price {
    pub fn from_dollars(dollars: i64) -> Self {
        Price(dollars * 100)
    }

    pub fn is_positive(self) -> bool {
        self.0 > 0
    }

    /// Whether this price lands exactly on a tick boundary.
    pub fn is_tick_aligned(self, tick_cents: i64) -> bool {
        tick_cents > 0 && self.0 % tick_cents == 0
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, (self.0 % 100).abs())
    }
}

impl Add for Price {
    type Output = Price;
    fn add(self, rhs: Price) -> Price {
        Price(self.0 + rhs.0)
    }
}

impl Sub for Price {
    type Output = Price;
    fn sub(self, rhs: Price) -> Price {
        Price(self.0 - rhs.0)
    }
}

impl Neg for Price {
    type Output = Price;
    fn neg(self) -> Price {
        Price(-self.0)
    }
}

/// A quantity of the base asset, in satoshi-equivalent units.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub struct Qty(pub u64);

impl Qty {
    pub const ZERO: Qty = Qty(0);

    pub fn from_whole(units: u64) -> Self {
        Qty(units * QTY_SCALE as u64)
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    pub fn is_positive(self) -> bool {
        self.0 > 0
    }

    pub fn min(self, other: Qty) -> Qty {
        Qty(self.0.min(other.0))
    }

    /// Saturating subtraction; the matching loop never lets this
    /// underflow, but fills come from untrusted request quantities.
    pub fn checked_sub(self, other: Qty) -> Option<Qty> {
        self.0.checked_sub(other.0).map(Qty)
    }

    pub fn as_whole_f64(self) -> f64 {
        self.0 as f64 / QTY_SCALE as f64
    }
}

impl fmt::Display for Qty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.8}", self.as_whole_f64())
    }
}

impl Add for Qty {
    type Output = Qty;
    fn add(self, rhs: Qty) -> Qty {
        Qty(self.0 + rhs.0)
    }
}

impl Sub for Qty {
    type Output = Qty;
    fn sub(self, rhs: Qty) -> Qty {
        Qty(self.0 - rhs.0)
    }
}

/// `price * qty`, returned in cents. Used for every cash-leg of a
/// trade; `i128` keeps the intermediate product from overflowing even
/// at the full `u64`/`i64` ranges of `Qty`/`Price`.
pub fn notional_cents(price: Price, qty: Qty) -> i64 {
    let cents = price.0 as i128 * qty.0 as i128 / QTY_SCALE;
    cents as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notional_matches_whole_unit_math() {
        let price = Price::from_dollars(100_000); // $100,000.00
        let qty = Qty::from_whole(0); // not useful; use fractional below
        assert_eq!(qty, Qty::ZERO);

        let tenth = Qty(QTY_SCALE as u64 / 10); // 0.1 BTC
        assert_eq!(notional_cents(price, tenth), 100_000 * 100 / 10);
    }

    #[test]
    fn tick_alignment() {
        let aligned = Price(1_000 * 100); // 100000 ticks aligned to 1000
        assert!(aligned.is_tick_aligned(TICK_SIZE_CENTS));
        let misaligned = Price(1_001_00);
        assert!(!misaligned.is_tick_aligned(TICK_SIZE_CENTS));
    }

    #[test]
    fn display_formats_as_decimal() {
        assert_eq!(Price(123_45).to_string(), "123.45");
        assert_eq!(Qty(QTY_SCALE as u64 / 2).to_string(), "0.50000000");
    }
}
