use std::{
    fmt::Display,
    iter::Sum,
    ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign},
    str::FromStr,
};

use serde::{Deserialize, Serialize};
use sqlx::Type;
use thiserror::Error;

use crate::op;

//--------------------------------------      Amount       -----------------------------------------------------------
/// A quantity of value in some currency, or a quantity of sale tokens.
///
/// The sale deals in many currencies with wildly different scales (whole euros, fractions of
/// Bitcoin, token quantities with a fractional part), so amounts are kept as plain 64-bit floats
/// the way the payment provider reports them, rather than as fixed-point minor units.
#[derive(Debug, Clone, Copy, Default, Type, PartialOrd, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct Amount(f64);

op!(binary Amount, Add, add);
op!(binary Amount, Sub, sub);
op!(inplace Amount, AddAssign, add_assign);
op!(inplace Amount, SubAssign, sub_assign);
op!(unary Amount, Neg, neg);

impl Mul<f64> for Amount {
    type Output = Self;

    fn mul(self, rhs: f64) -> Self::Output {
        Self(self.0 * rhs)
    }
}

impl Sum for Amount {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

#[derive(Debug, Clone, Error)]
#[error("Value cannot be represented as an amount: {0}")]
pub struct AmountConversionError(String);

impl From<f64> for Amount {
    fn from(value: f64) -> Self {
        Self(value)
    }
}

impl From<i64> for Amount {
    #[allow(clippy::cast_precision_loss)]
    fn from(value: i64) -> Self {
        Self(value as f64)
    }
}

impl FromStr for Amount {
    type Err = AmountConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse::<f64>().map(Self).map_err(|e| AmountConversionError(format!("{s}: {e}")))
    }
}

impl PartialEq for Amount {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Display for Amount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Up to 8 decimals (the satoshi scale), trailing zeroes trimmed
        let s = format!("{:.8}", self.0);
        let s = s.trim_end_matches('0').trim_end_matches('.');
        write!(f, "{s}")
    }
}

impl Amount {
    pub fn value(&self) -> f64 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0.0
    }

    pub fn is_positive(&self) -> bool {
        self.0 > 0.0
    }

    /// The amount expressed in minor units (cents), as card processors expect.
    ///
    /// Truncation is fine here: fiat purchase amounts are whole currency units in practice.
    #[allow(clippy::cast_possible_truncation)]
    pub fn minor_units(&self) -> i64 {
        (self.0 * 100.0) as i64
    }
}

#[cfg(test)]
mod test {
    use super::Amount;

    #[test]
    fn display_trims_trailing_zeroes() {
        assert_eq!(Amount::from(0.5).to_string(), "0.5");
        assert_eq!(Amount::from(100.0).to_string(), "100");
        assert_eq!(Amount::from(0.000_000_01).to_string(), "0.00000001");
    }

    #[test]
    fn minor_units() {
        assert_eq!(Amount::from(100.0).minor_units(), 10_000);
        assert_eq!(Amount::from(19.99).minor_units(), 1_998);
    }

    #[test]
    fn arithmetic() {
        let total = Amount::from(1.5) + Amount::from(0.25);
        assert_eq!(total, Amount::from(1.75));
        assert_eq!(total * 2.0, Amount::from(3.5));
        let sum: Amount = vec![Amount::from(1.0), Amount::from(2.0)].into_iter().sum();
        assert_eq!(sum, Amount::from(3.0));
    }
}
