use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Sub, SubAssign};
use std::str::FromStr;

/// decimal places kept for every amount (pesewas, cents)
pub const MINOR_SCALE: u32 = 2;

fn to_scale(d: Decimal) -> Decimal {
    let mut d = d.round_dp_with_strategy(MINOR_SCALE, RoundingStrategy::MidpointAwayFromZero);
    d.rescale(MINOR_SCALE);
    d
}

/// Money type fixed to minor-unit precision.
///
/// Every constructor and operator re-rounds to two decimal places, so sums of
/// many small payments stay exact and do not depend on summation order.
/// Serialized as a two-place decimal string such as `"15.50"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "Decimal", into = "Decimal")]
pub struct Money(Decimal);

impl Money {
    pub const ZERO: Money = Money(Decimal::from_parts(0, 0, 0, false, MINOR_SCALE));
    pub const ONE: Money = Money(Decimal::from_parts(100, 0, 0, false, MINOR_SCALE));

    /// create from decimal, rounding half away from zero
    pub fn from_decimal(d: Decimal) -> Self {
        Money(to_scale(d))
    }

    /// create from string with exact parsing
    pub fn from_str_exact(s: &str) -> Result<Self, rust_decimal::Error> {
        Ok(Money(to_scale(Decimal::from_str(s.trim())?)))
    }

    /// create from whole currency units (cedis, dollars)
    pub fn from_major(amount: i64) -> Self {
        Money(to_scale(Decimal::from(amount)))
    }

    /// create from minor units (pesewas, cents)
    pub fn from_minor(amount: i64) -> Self {
        Money(Decimal::new(amount, MINOR_SCALE))
    }

    /// get underlying decimal
    pub fn as_decimal(&self) -> Decimal {
        self.0
    }

    /// amount expressed in minor units
    pub fn to_minor(&self) -> i128 {
        let mut d = self.0;
        d.rescale(MINOR_SCALE);
        d.mantissa()
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// strictly greater than zero
    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }

    /// strictly less than zero
    pub fn is_negative(&self) -> bool {
        self.0 < Decimal::ZERO
    }

    pub fn abs(&self) -> Self {
        Money(self.0.abs())
    }

    pub fn min(self, other: Self) -> Self {
        Money(self.0.min(other.0))
    }

    pub fn max(self, other: Self) -> Self {
        Money(self.0.max(other.0))
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::ZERO
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Money {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Money::from_str_exact(s)
    }
}

impl From<Decimal> for Money {
    fn from(d: Decimal) -> Self {
        Money::from_decimal(d)
    }
}

impl From<Money> for Decimal {
    fn from(m: Money) -> Self {
        m.0
    }
}

impl From<i32> for Money {
    fn from(i: i32) -> Self {
        Money::from_major(i as i64)
    }
}

impl From<u32> for Money {
    fn from(i: u32) -> Self {
        Money::from_major(i as i64)
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, other: Money) -> Money {
        Money(to_scale(self.0 + other.0))
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, other: Money) {
        self.0 = to_scale(self.0 + other.0);
    }
}

impl Sub for Money {
    type Output = Money;

    fn sub(self, other: Money) -> Money {
        Money(to_scale(self.0 - other.0))
    }
}

impl SubAssign for Money {
    fn sub_assign(&mut self, other: Money) {
        self.0 = to_scale(self.0 - other.0);
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::ZERO, |acc, m| acc + m)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.fold(Money::ZERO, |acc, m| acc + *m)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_money_precision() {
        let m = Money::from_str_exact("100.125").unwrap();
        assert_eq!(m.to_string(), "100.13"); // half away from zero

        let m = Money::from_str_exact("-0.005").unwrap();
        assert_eq!(m, Money::from_minor(-1));
    }

    #[test]
    fn test_minor_units() {
        assert_eq!(Money::from_minor(2001), Money::from_decimal(dec!(20.01)));
        assert_eq!(Money::from_major(20).to_minor(), 2000);
        assert_eq!(Money::from_str_exact("0.1").unwrap().to_minor(), 10);
    }

    #[test]
    fn test_display_always_two_places() {
        assert_eq!(Money::from_major(20).to_string(), "20.00");
        assert_eq!(Money::from_minor(5).to_string(), "0.05");
        assert_eq!(Money::ZERO.to_string(), "0.00");
    }

    #[test]
    fn test_no_drift_over_many_small_payments() {
        // 0.1 added a thousand times drifts in binary floating point
        let total: Money = std::iter::repeat(Money::from_str_exact("0.10").unwrap())
            .take(1000)
            .sum();
        assert_eq!(total, Money::from_major(100));
    }

    #[test]
    fn test_sign_predicates() {
        assert!(!Money::ZERO.is_positive());
        assert!(!Money::ZERO.is_negative());
        assert!(Money::from_minor(1).is_positive());
        assert!((Money::ZERO - Money::ONE).is_negative());
    }

    #[test]
    fn test_serde_as_string() {
        let m = Money::from_minor(1550);
        let json = serde_json::to_string(&m).unwrap();
        assert_eq!(json, "\"15.50\"");
        let back: Money = serde_json::from_str(&json).unwrap();
        assert_eq!(back, m);

        let whole = Money::from_major(100) - Money::from_major(40);
        assert_eq!(serde_json::to_string(&whole).unwrap(), "\"60.00\"");

        let loose: Money = serde_json::from_str("\"2.5\"").unwrap();
        assert_eq!(serde_json::to_string(&loose).unwrap(), "\"2.50\"");
    }
}
