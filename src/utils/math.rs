//! Fixed-point arithmetic and mathematical utilities.
//!
//! Amounts are raw `u128` values in a token's smallest unit. Fractions and
//! prices are [`FixedPoint`] values with 18 decimals. Every product is
//! computed at full precision before a single final truncation, so results
//! never depend on the order of intermediate roundings.

use num_bigint::BigUint;
use num_traits::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::ops::{Add, Sub};
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::utils::constants::FIXED_POINT_DECIMALS;

// ═══════════════════════════════════════════════════════════════════════════════
// FIXED POINT TYPE
// ═══════════════════════════════════════════════════════════════════════════════

/// Fixed-point number with 18 decimal places precision
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct FixedPoint(u128);

impl FixedPoint {
    /// Scale factor: 10^18
    pub const SCALE: u128 = 1_000_000_000_000_000_000;

    /// Zero value
    pub const ZERO: Self = Self(0);

    /// One (1.0)
    pub const ONE: Self = Self(Self::SCALE);

    /// Create a new FixedPoint from raw value
    pub const fn from_raw(raw: u128) -> Self {
        Self(raw)
    }

    /// Create from an integer (scales up)
    pub fn from_integer(value: u64) -> Self {
        Self((value as u128) * Self::SCALE)
    }

    /// Create from percentage (100 = 100%)
    pub fn from_percentage(pct: u64) -> Self {
        Self((pct as u128) * Self::SCALE / 100)
    }

    /// Create from basis points (10_000 = 100%)
    pub fn from_bps(bps: u64) -> Self {
        Self((bps as u128) * Self::SCALE / 10_000)
    }

    /// Get the raw underlying value
    pub fn raw(&self) -> u128 {
        self.0
    }

    /// Check if value is zero
    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Saturating subtraction
    pub fn saturating_sub(&self, other: Self) -> Self {
        Self(self.0.saturating_sub(other.0))
    }

    /// Checked addition
    pub fn checked_add(&self, other: Self) -> Result<Self> {
        safe_add(self.0, other.0).map(Self)
    }

    /// Checked subtraction
    pub fn checked_sub(&self, other: Self) -> Result<Self> {
        safe_sub(self.0, other.0).map(Self)
    }

    /// Product of two fractions, floored
    pub fn checked_mul(&self, other: Self) -> Result<Self> {
        mul_div(self.0, other.0, Self::SCALE).map(Self)
    }

    /// Quotient of two fractions, floored
    pub fn checked_div(&self, other: Self) -> Result<Self> {
        mul_div(self.0, Self::SCALE, other.0).map(Self)
    }

    /// `amount · self`, floored
    pub fn mul_amount(&self, amount: u128) -> Result<u128> {
        mul_div(amount, self.0, Self::SCALE)
    }

    /// `amount · self`, rounded up
    pub fn mul_amount_up(&self, amount: u128) -> Result<u128> {
        mul_div_up(amount, self.0, Self::SCALE)
    }

    /// `amount / self`, floored
    pub fn div_amount(&self, amount: u128) -> Result<u128> {
        mul_div(amount, Self::SCALE, self.0)
    }
}

impl Add for FixedPoint {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl Sub for FixedPoint {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0 - rhs.0)
    }
}

impl fmt::Display for FixedPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.0 / Self::SCALE;
        let frac = self.0 % Self::SCALE;
        if frac == 0 {
            return write!(f, "{}", whole);
        }
        let digits = format!("{:018}", frac);
        write!(f, "{}.{}", whole, digits.trim_end_matches('0'))
    }
}

impl FromStr for FixedPoint {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = |reason: &str| Error::InvalidParameter {
            name: "fixed_point".into(),
            reason: format!("{}: {:?}", reason, s),
        };
        let decimal = Decimal::from_str(s.trim()).map_err(|_| invalid("not a decimal"))?;
        if decimal.is_sign_negative() && !decimal.is_zero() {
            return Err(invalid("negative value"));
        }

        let mantissa = decimal.mantissa().unsigned_abs();
        let scale = decimal.scale();
        let target = FIXED_POINT_DECIMALS as u32;
        let raw = if scale <= target {
            mantissa
                .checked_mul(pow10(target - scale))
                .ok_or_else(|| invalid("too large"))?
        } else {
            mantissa / pow10(scale - target)
        };
        Ok(Self(raw))
    }
}

impl Serialize for FixedPoint {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for FixedPoint {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        FixedPoint::from_str(&s).map_err(serde::de::Error::custom)
    }
}

/// 10^exp as u128
pub fn pow10(exp: u32) -> u128 {
    10u128.pow(exp)
}

// ═══════════════════════════════════════════════════════════════════════════════
// SAFE ARITHMETIC OPERATIONS
// ═══════════════════════════════════════════════════════════════════════════════

/// Safe addition with overflow check
pub fn safe_add(a: u128, b: u128) -> Result<u128> {
    a.checked_add(b).ok_or(Error::Overflow {
        operation: format!("{} + {}", a, b),
    })
}

/// Safe subtraction with underflow check
pub fn safe_sub(a: u128, b: u128) -> Result<u128> {
    a.checked_sub(b).ok_or(Error::Underflow {
        operation: format!("{} - {}", a, b),
    })
}

/// Safe multiplication with overflow check
pub fn safe_mul(a: u128, b: u128) -> Result<u128> {
    a.checked_mul(b).ok_or(Error::Overflow {
        operation: format!("{} * {}", a, b),
    })
}

/// Computes `(a * b) / c`, floored, with a 256-bit intermediate
pub fn mul_div(a: u128, b: u128, c: u128) -> Result<u128> {
    if c == 0 {
        return Err(Error::InvalidParameter {
            name: "divisor".into(),
            reason: "division by zero".into(),
        });
    }
    if let Some(product) = a.checked_mul(b) {
        return Ok(product / c);
    }
    let wide = BigUint::from(a) * BigUint::from(b) / BigUint::from(c);
    wide.to_u128().ok_or(Error::Overflow {
        operation: format!("({} * {}) / {}", a, b, c),
    })
}

/// Computes `(a * b) / c`, rounded up, with a 256-bit intermediate
pub fn mul_div_up(a: u128, b: u128, c: u128) -> Result<u128> {
    let floor = mul_div(a, b, c)?;
    let exact = match a.checked_mul(b) {
        Some(product) => product % c == 0,
        None => (BigUint::from(a) * BigUint::from(b) % BigUint::from(c)) == BigUint::from(0u8),
    };
    if exact {
        Ok(floor)
    } else {
        safe_add(floor, 1)
    }
}

/// Splits `amount` across `weights` proportionally, floored per share.
///
/// The rounding remainder is added to the last share so the shares always sum
/// to `amount`.
pub fn split_proportionally(amount: u128, weights: &[u128]) -> Result<Vec<u128>> {
    let total: u128 = weights.iter().try_fold(0u128, |acc, w| safe_add(acc, *w))?;
    if total == 0 {
        return Err(Error::InvalidParameter {
            name: "weights".into(),
            reason: "total weight is zero".into(),
        });
    }

    let mut shares = Vec::with_capacity(weights.len());
    let mut distributed = 0u128;
    for weight in weights {
        let share = mul_div(amount, *weight, total)?;
        distributed = safe_add(distributed, share)?;
        shares.push(share);
    }
    if let Some(last) = shares.last_mut() {
        *last = safe_add(*last, safe_sub(amount, distributed)?)?;
    }
    Ok(shares)
}

// ═══════════════════════════════════════════════════════════════════════════════
// DECIMAL NORMALIZATION
// ═══════════════════════════════════════════════════════════════════════════════

/// Factor that lifts an amount with `decimals` to 18 decimals
pub fn decimals_scaling_factor(decimals: u8) -> Result<u128> {
    if decimals > FIXED_POINT_DECIMALS {
        return Err(Error::BadDecimals {
            token: "collateral".into(),
            decimals,
        });
    }
    Ok(pow10((FIXED_POINT_DECIMALS - decimals) as u32))
}
