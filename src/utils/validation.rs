//! Input validation utilities.
//!
//! These checks run before any state is touched so a rejected request never
//! leaves a trace.

use crate::error::{Error, Result};
use crate::utils::constants::{MAX_COLLATERAL_DECIMALS, SYNTHETIC_TOKEN_DECIMALS};
use crate::utils::math::FixedPoint;

// ═══════════════════════════════════════════════════════════════════════════════
// AMOUNT VALIDATION
// ═══════════════════════════════════════════════════════════════════════════════

/// Validate that an amount is non-zero
pub fn validate_non_zero(amount: u128) -> Result<()> {
    if amount == 0 {
        return Err(Error::ZeroAmount);
    }
    Ok(())
}

/// Validate that a request deadline has not passed
pub fn validate_expiration(expiration: u64, now: u64) -> Result<()> {
    if now > expiration {
        return Err(Error::TransactionExpired { expiration, now });
    }
    Ok(())
}

/// Validate that two parallel arrays have the same length
pub fn validate_same_length(left: usize, right: usize) -> Result<()> {
    if left != right {
        return Err(Error::ArrayLengthMismatch { left, right });
    }
    Ok(())
}

// ═══════════════════════════════════════════════════════════════════════════════
// PARAMETER VALIDATION
// ═══════════════════════════════════════════════════════════════════════════════

/// Validate a fraction lies in `[0, 1]`
pub fn validate_fraction(name: &str, value: FixedPoint) -> Result<()> {
    if value > FixedPoint::ONE {
        return Err(Error::InvalidParameter {
            name: name.into(),
            reason: format!("{} exceeds 1", value),
        });
    }
    Ok(())
}

/// Validate a fee percentage lies in `[0, 1)`
pub fn validate_fee_percentage(value: FixedPoint) -> Result<()> {
    if value >= FixedPoint::ONE {
        return Err(Error::InvalidParameter {
            name: "fee_percentage".into(),
            reason: format!("{} must be below 1", value),
        });
    }
    Ok(())
}

/// Validate the liquidation reward lies in `(0, 1]`
pub fn validate_liquidation_reward(value: FixedPoint) -> Result<()> {
    if value.is_zero() || value > FixedPoint::ONE {
        return Err(Error::InvalidParameter {
            name: "liquidation_reward".into(),
            reason: format!("{} must be in (0, 1]", value),
        });
    }
    Ok(())
}

/// Validate the collateral requirement is strictly above 1
pub fn validate_collateral_requirement(value: FixedPoint) -> Result<()> {
    if value <= FixedPoint::ONE {
        return Err(Error::InvalidParameter {
            name: "collateral_requirement".into(),
            reason: format!("{} must be greater than 1", value),
        });
    }
    Ok(())
}

/// Validate the over-collateralization covers the collateral requirement.
///
/// A freshly minted position holds `1 + over_collateralization` per unit of
/// value, which must exceed the requirement or it would be liquidatable at
/// birth.
pub fn validate_over_collateralization(
    value: FixedPoint,
    collateral_requirement: FixedPoint,
) -> Result<()> {
    let minimum = collateral_requirement.saturating_sub(FixedPoint::ONE);
    if value.is_zero() || value <= minimum {
        return Err(Error::InvalidParameter {
            name: "over_collateralization".into(),
            reason: format!("{} must be greater than {}", value, minimum),
        });
    }
    Ok(())
}

/// Validate collateral and synthetic token decimals
pub fn validate_decimals(
    collateral_symbol: &str,
    collateral_decimals: u8,
    synthetic_symbol: &str,
    synthetic_decimals: u8,
) -> Result<()> {
    if collateral_decimals > MAX_COLLATERAL_DECIMALS {
        return Err(Error::BadDecimals {
            token: collateral_symbol.into(),
            decimals: collateral_decimals,
        });
    }
    if synthetic_decimals != SYNTHETIC_TOKEN_DECIMALS {
        return Err(Error::BadDecimals {
            token: synthetic_symbol.into(),
            decimals: synthetic_decimals,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_non_zero() {
        assert!(validate_non_zero(1).is_ok());
        assert_eq!(validate_non_zero(0), Err(Error::ZeroAmount));
    }

    #[test]
    fn test_validate_expiration() {
        assert!(validate_expiration(100, 100).is_ok());
        assert!(matches!(
            validate_expiration(99, 100),
            Err(Error::TransactionExpired { expiration: 99, now: 100 })
        ));
    }

    #[test]
    fn test_parameter_bounds() {
        assert!(validate_fee_percentage(FixedPoint::from_bps(20)).is_ok());
        assert!(validate_fee_percentage(FixedPoint::ONE).is_err());
        assert!(validate_liquidation_reward(FixedPoint::ONE).is_ok());
        assert!(validate_liquidation_reward(FixedPoint::ZERO).is_err());
        assert!(validate_collateral_requirement(FixedPoint::ONE).is_err());
        assert!(validate_collateral_requirement(FixedPoint::from_percentage(105)).is_ok());
    }

    #[test]
    fn test_over_collateralization_covers_requirement() {
        let requirement = FixedPoint::from_percentage(105);
        assert!(validate_over_collateralization(FixedPoint::from_percentage(25), requirement).is_ok());
        assert!(validate_over_collateralization(FixedPoint::from_percentage(5), requirement).is_err());
        assert!(validate_over_collateralization(FixedPoint::ZERO, requirement).is_err());
    }

    #[test]
    fn test_decimals() {
        assert!(validate_decimals("USDC", 6, "jEUR", 18).is_ok());
        assert!(matches!(
            validate_decimals("BAD", 19, "jEUR", 18),
            Err(Error::BadDecimals { decimals: 19, .. })
        ));
        assert!(validate_decimals("USDC", 6, "jEUR", 8).is_err());
    }
}
