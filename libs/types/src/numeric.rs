//! Fixed-point decimal types for prices and quantities
//!
//! Backed by `rust_decimal` for deterministic arithmetic. Serialized as
//! JSON strings so no precision is lost at the API boundary.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Sub};
use std::str::FromStr;

use crate::errors::NumericError;

/// Largest accepted price or quantity. Two bounded values multiply to at
/// most 1e24, well inside `Decimal`'s range.
pub const MAX_MAGNITUDE: Decimal = dec!(1_000_000_000_000);

/// Strictly positive price
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Price(Decimal);

impl Price {
    /// Returns None unless `0 < value <= MAX_MAGNITUDE`
    pub fn try_new(value: Decimal) -> Option<Self> {
        (value > Decimal::ZERO && value <= MAX_MAGNITUDE).then_some(Self(value))
    }

    pub fn from_u64(value: u64) -> Self {
        Self(Decimal::from(value.max(1)).min(MAX_MAGNITUDE))
    }

    pub fn as_decimal(&self) -> Decimal {
        self.0
    }

    /// True when the price sits on the `tick` grid
    pub fn is_multiple_of(&self, tick: Decimal) -> bool {
        tick > Decimal::ZERO && (self.0 % tick).is_zero()
    }
}

impl TryFrom<Decimal> for Price {
    type Error = NumericError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        if value > MAX_MAGNITUDE {
            return Err(NumericError::TooLarge(value));
        }
        Self::try_new(value).ok_or(NumericError::NonPositivePrice(value))
    }
}

impl From<Price> for Decimal {
    fn from(value: Price) -> Self {
        value.0
    }
}

impl FromStr for Price {
    type Err = NumericError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = Decimal::from_str(s).map_err(|_| NumericError::Parse(s.to_string()))?;
        Self::try_from(value)
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Non-negative quantity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Quantity(Decimal);

impl Quantity {
    pub fn zero() -> Self {
        Self(Decimal::ZERO)
    }

    /// Returns None unless `0 <= value <= MAX_MAGNITUDE`
    pub fn try_new(value: Decimal) -> Option<Self> {
        (value >= Decimal::ZERO && value <= MAX_MAGNITUDE).then_some(Self(value))
    }

    pub fn as_decimal(&self) -> Decimal {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Saturating subtraction, never below zero
    pub fn saturating_sub(self, other: Quantity) -> Quantity {
        Quantity((self.0 - other.0).max(Decimal::ZERO))
    }

    pub fn min(self, other: Quantity) -> Quantity {
        if self <= other {
            self
        } else {
            other
        }
    }

    pub fn is_multiple_of(&self, lot: Decimal) -> bool {
        lot > Decimal::ZERO && (self.0 % lot).is_zero()
    }

    /// Notional value at `price`; both factors are bounded by `MAX_MAGNITUDE`
    pub fn notional(&self, price: Price) -> Decimal {
        self.0 * price.as_decimal()
    }
}

impl TryFrom<Decimal> for Quantity {
    type Error = NumericError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        if value > MAX_MAGNITUDE {
            return Err(NumericError::TooLarge(value));
        }
        Self::try_new(value).ok_or(NumericError::NegativeQuantity(value))
    }
}

impl From<Quantity> for Decimal {
    fn from(value: Quantity) -> Self {
        value.0
    }
}

impl FromStr for Quantity {
    type Err = NumericError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = Decimal::from_str(s).map_err(|_| NumericError::Parse(s.to_string()))?;
        Self::try_from(value)
    }
}

impl Add for Quantity {
    type Output = Quantity;

    fn add(self, rhs: Self) -> Self::Output {
        Quantity(self.0 + rhs.0)
    }
}

impl Sub for Quantity {
    type Output = Quantity;

    fn sub(self, rhs: Self) -> Self::Output {
        self.saturating_sub(rhs)
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
