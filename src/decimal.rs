use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};

use crate::errors::{LedgerError, Result};

/// money held as integer minor units (cents), never as floating point
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    pub const ZERO: Money = Money(0);

    /// minor units per major unit (cents per dollar)
    pub const MINOR_PER_MAJOR: i64 = 100;

    /// create from minor amount (cents)
    pub const fn from_minor(amount: i64) -> Self {
        Money(amount)
    }

    /// create from whole major amount (dollars)
    pub const fn from_major(amount: i64) -> Self {
        Money(amount * Self::MINOR_PER_MAJOR)
    }

    /// create from a major-unit decimal, rounding half away from zero to the cent
    pub fn from_decimal_major(d: Decimal) -> Result<Self> {
        let cents = (d * Decimal::from(Self::MINOR_PER_MAJOR))
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
        cents
            .to_i64()
            .map(Money)
            .ok_or_else(|| LedgerError::InvalidAmount {
                amount: d.to_string(),
            })
    }

    /// create from a minor-unit decimal; fractional cents are rejected
    pub fn from_decimal_minor(d: Decimal) -> Result<Self> {
        if !d.fract().is_zero() {
            return Err(LedgerError::InvalidAmount {
                amount: d.to_string(),
            });
        }
        d.to_i64().map(Money).ok_or_else(|| LedgerError::InvalidAmount {
            amount: d.to_string(),
        })
    }

    /// get minor units
    pub const fn minor(&self) -> i64 {
        self.0
    }

    /// get as major-unit decimal (e.g. 350.00)
    pub fn as_major(&self) -> Decimal {
        Decimal::new(self.0, 2)
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }

    pub fn is_negative(&self) -> bool {
        self.0 < 0
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

    /// number of whole `unit`s contained in this amount (floor division)
    ///
    /// returns zero for a non-positive unit.
    pub fn whole_units_of(&self, unit: Money) -> i64 {
        if unit.0 <= 0 {
            return 0;
        }
        self.0.div_euclid(unit.0)
    }

    /// `None` when the sum leaves the i64 range
    pub fn checked_add(self, other: Money) -> Option<Money> {
        self.0.checked_add(other.0).map(Money)
    }

    pub fn checked_mul(self, times: i64) -> Option<Money> {
        self.0.checked_mul(times).map(Money)
    }

    /// sum that fails instead of wrapping
    pub fn checked_sum<I: IntoIterator<Item = Money>>(amounts: I) -> Option<Money> {
        amounts
            .into_iter()
            .try_fold(Money::ZERO, |acc, amount| acc.checked_add(amount))
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_major())
    }
}

impl From<i64> for Money {
    fn from(minor: i64) -> Self {
        Money::from_minor(minor)
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, other: Money) -> Money {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, other: Money) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Money;

    fn sub(self, other: Money) -> Money {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    fn sub_assign(&mut self, other: Money) {
        self.0 -= other.0;
    }
}

impl Mul<i64> for Money {
    type Output = Money;

    fn mul(self, times: i64) -> Money {
        Money(self.0 * times)
    }
}

impl Neg for Money {
    type Output = Money;

    fn neg(self) -> Money {
        Money(-self.0)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::ZERO, |acc, x| acc + x)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Money {
        iter.fold(Money::ZERO, |acc, x| acc + *x)
    }
}
