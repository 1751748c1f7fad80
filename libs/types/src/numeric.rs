//! Integer amount types and exchange-rate arithmetic
//!
//! Settlement-unit amounts, wrapped-asset amounts and facility shares are all
//! integer base units (e.g. 6-decimal USDC units) held in `u128`. Each kind gets
//! its own newtype so a wrapped amount can never be added to a notional one by
//! accident. Every operation that divides takes an explicit [`Rounding`].
//!
//! The exchange rate between the settlement stablecoin and the wrapped asset is
//! the only fractional quantity and uses `rust_decimal` for deterministic
//! arithmetic.

use primitive_types::U256;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::errors::AmountError;

/// Direction to round the result of a division.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Rounding {
    /// Toward zero
    Down,
    /// Away from zero
    Up,
}

/// Computes `a * b / denominator` with an explicit rounding direction.
///
/// The product is formed in 256 bits, so only a quotient that does not fit
/// in `u128` overflows.
pub fn mul_div(a: u128, b: u128, denominator: u128, rounding: Rounding) -> Result<u128, AmountError> {
    if denominator == 0 {
        return Err(AmountError::DivisionByZero);
    }
    let product = U256::from(a)
        .checked_mul(U256::from(b))
        .ok_or(AmountError::Overflow)?;
    let (quotient, remainder) = product.div_mod(U256::from(denominator));
    let quotient = match rounding {
        Rounding::Up if !remainder.is_zero() => quotient
            .checked_add(U256::one())
            .ok_or(AmountError::Overflow)?,
        _ => quotient,
    };
    if quotient > U256::from(u128::MAX) {
        return Err(AmountError::Overflow);
    }
    Ok(quotient.low_u128())
}

macro_rules! amount_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(u128);

        impl $name {
            pub const ZERO: Self = Self(0);
            pub const MAX: Self = Self(u128::MAX);

            pub const fn new(units: u128) -> Self {
                Self(units)
            }

            /// Raw base units
            pub const fn get(self) -> u128 {
                self.0
            }

            pub const fn is_zero(self) -> bool {
                self.0 == 0
            }

            pub fn checked_add(self, other: Self) -> Result<Self, AmountError> {
                self.0.checked_add(other.0).map(Self).ok_or(AmountError::Overflow)
            }

            pub fn checked_sub(self, other: Self) -> Result<Self, AmountError> {
                self.0.checked_sub(other.0).map(Self).ok_or(AmountError::Underflow {
                    minuend: self.0,
                    subtrahend: other.0,
                })
            }

            pub fn saturating_sub(self, other: Self) -> Self {
                Self(self.0.saturating_sub(other.0))
            }
        }

        impl From<u128> for $name {
            fn from(units: u128) -> Self {
                Self(units)
            }
        }

        impl From<u64> for $name {
            fn from(units: u64) -> Self {
                Self(units as u128)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

amount_type!(
    /// Amount denominated in the settlement stablecoin's base units.
    Notional
);

amount_type!(
    /// Amount of the yield-bearing wrapped asset, in its base units.
    WrappedAmount
);

amount_type!(
    /// Facility-internal share units.
    SharesAmount
);

/// Basis points (1/10_000).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Bps(u32);

impl Bps {
    pub const DENOMINATOR: u32 = 10_000;
    pub const ZERO: Self = Self(0);
    /// 100%
    pub const FULL: Self = Self(Self::DENOMINATOR);

    pub const fn new(bps: u32) -> Self {
        Self(bps)
    }

    pub const fn get(self) -> u32 {
        self.0
    }

    /// True when the fraction is 100% or more.
    pub const fn is_full(self) -> bool {
        self.0 >= Self::DENOMINATOR
    }

    /// `amount * self / 10_000`
    pub fn apply(self, amount: Notional, rounding: Rounding) -> Result<Notional, AmountError> {
        mul_div(amount.get(), self.0 as u128, Self::DENOMINATOR as u128, rounding).map(Notional::new)
    }
}

impl fmt::Display for Bps {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}bps", self.0)
    }
}

/// Exchange rate: settlement units received per wrapped unit.
///
/// Always strictly positive. A freshly deployed wrapped asset trades at `Rate::ONE`
/// and drifts upward as yield accrues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Rate(Decimal);

impl Rate {
    pub const ONE: Self = Self(Decimal::ONE);

    /// Create a rate, rejecting zero and negative values.
    pub fn new(value: Decimal) -> Result<Self, AmountError> {
        if value <= Decimal::ZERO {
            return Err(AmountError::InvalidRate {
                rate: value.to_string(),
            });
        }
        Ok(Self(value))
    }

    /// Parse a rate from its decimal string form, e.g. `"1.10"`.
    pub fn from_str_exact(s: &str) -> Result<Self, AmountError> {
        let value = Decimal::from_str_exact(s).map_err(|_| AmountError::InvalidRate {
            rate: s.to_string(),
        })?;
        Self::new(value)
    }

    pub fn value(&self) -> Decimal {
        self.0
    }

    /// Wrapped units worth `notional` settlement units at this rate.
    pub fn notional_to_wrapped(
        &self,
        notional: Notional,
        rounding: Rounding,
    ) -> Result<WrappedAmount, AmountError> {
        let n = to_decimal(notional.get())?;
        let quotient = n.checked_div(self.0).ok_or(AmountError::Overflow)?;
        round_to_units(quotient, rounding).map(WrappedAmount::new)
    }

    /// Settlement units worth `wrapped` wrapped units at this rate.
    pub fn wrapped_to_notional(
        &self,
        wrapped: WrappedAmount,
        rounding: Rounding,
    ) -> Result<Notional, AmountError> {
        let w = to_decimal(wrapped.get())?;
        let product = w.checked_mul(self.0).ok_or(AmountError::Overflow)?;
        round_to_units(product, rounding).map(Notional::new)
    }
}

impl Default for Rate {
    fn default() -> Self {
        Self::ONE
    }
}

impl fmt::Display for Rate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

fn to_decimal(units: u128) -> Result<Decimal, AmountError> {
    Decimal::from_u128(units).ok_or(AmountError::DecimalRange {
        value: units.to_string(),
    })
}

fn round_to_units(value: Decimal, rounding: Rounding) -> Result<u128, AmountError> {
    let rounded = match rounding {
        Rounding::Down => value.floor(),
        Rounding::Up => value.ceil(),
    };
    rounded.to_u128().ok_or(AmountError::DecimalRange {
        value: rounded.to_string(),
    })
}
