//! Money in minor units
//!
//! Prices are kept as integer kopecks/cents everywhere and sent to the payment
//! gateway as-is. Only the HTTP layer divides by 100 for display.

use serde::{Deserialize, Serialize};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    pub const ZERO: Money = Money(0);

    pub const fn from_minor(minor: i64) -> Self {
        Self(minor)
    }

    pub const fn minor(&self) -> i64 {
        self.0
    }

    /// Major units for display (e.g. 4999 -> 49.99)
    pub fn to_major(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// `self * (1 - percent / 100)`, rounded half up to the nearest minor unit
    pub fn apply_discount(&self, percent: u8) -> Money {
        let percent = i128::from(percent.min(100));
        let discounted = (i128::from(self.0) * (100 - percent) + 50).div_euclid(100);
        // |discounted| <= |self.0|, so it always fits back into i64
        Money(discounted as i64)
    }

    pub fn saturating_sub(&self, other: Money) -> Money {
        Money((self.0 - other.0).max(0))
    }
}
