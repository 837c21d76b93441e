//! Pool ledger.
//!
//! Pure bookkeeping for one pool, with no access to tokens or the lending
//! layer:
//! - Price conversions between collateral and synthetic units
//! - Mint and redeem planning (fees, over-collateral, freed liquidity)
//! - Liquidity, position collateral and fee balances
//!
//! Plans are computed first and applied only once every check passed.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::core::fees::FeeConfig;
use crate::error::{Error, Result};
use crate::utils::crypto::Address;
use crate::utils::math::{
    decimals_scaling_factor, mul_div, safe_add, safe_mul, safe_sub, FixedPoint,
};

// ═══════════════════════════════════════════════════════════════════════════════
// VALUATION
// ═══════════════════════════════════════════════════════════════════════════════

/// Converts between collateral and synthetic units at one price
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Valuation {
    /// Collateral per synthetic token
    pub price: FixedPoint,
    /// `10^(18 - collateral decimals)`
    pub scaling: u128,
}

impl Valuation {
    /// Create a valuation for a collateral with `decimals`
    pub fn new(price: FixedPoint, decimals: u8) -> Result<Self> {
        if price.is_zero() {
            return Err(Error::InvalidParameter {
                name: "price".into(),
                reason: "cannot be zero".into(),
            });
        }
        Ok(Self {
            price,
            scaling: decimals_scaling_factor(decimals)?,
        })
    }

    fn unit(&self) -> Result<u128> {
        safe_mul(FixedPoint::SCALE, self.scaling)
    }

    /// Synthetic tokens worth `collateral`
    pub fn collateral_to_synth(&self, collateral: u128) -> Result<u128> {
        mul_div(collateral, self.unit()?, self.price.raw())
    }

    /// Collateral worth `tokens`
    pub fn synth_to_collateral(&self, tokens: u128) -> Result<u128> {
        mul_div(tokens, self.price.raw(), self.unit()?)
    }

    /// Collateral `tokens` must be backed by to meet `requirement`
    pub fn required_collateral(&self, tokens: u128, requirement: FixedPoint) -> Result<u128> {
        requirement.mul_amount(self.synth_to_collateral(tokens)?)
    }

    /// Whether `collateral` meets `requirement` for `tokens`
    pub fn is_overcollateralized(
        &self,
        collateral: u128,
        tokens: u128,
        requirement: FixedPoint,
    ) -> Result<bool> {
        Ok(collateral >= self.required_collateral(tokens, requirement)?)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// PLANS
// ═══════════════════════════════════════════════════════════════════════════════

/// Amounts moved by a mint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MintPlan {
    /// Fee charged
    pub fee: u128,
    /// Collateral backing the new tokens
    pub net_collateral: u128,
    /// Synthetic tokens minted
    pub num_tokens: u128,
    /// LP liquidity locked alongside
    pub over_collateral: u128,
}

/// Amounts moved by a redeem
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedeemPlan {
    /// Synthetic tokens burned
    pub num_tokens: u128,
    /// Position collateral released
    pub gross_collateral: u128,
    /// User part of the released collateral, before fee
    pub collateral_amount: u128,
    /// Fee charged
    pub fee: u128,
    /// Collateral paid out
    pub net_collateral: u128,
    /// LP part of the released collateral, returned to liquidity
    pub freed_liquidity: u128,
}

// ═══════════════════════════════════════════════════════════════════════════════
// POOL LEDGER
// ═══════════════════════════════════════════════════════════════════════════════

/// Balances of one pool
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolLedger {
    /// Collateral backing outstanding synthetic tokens
    pub total_collateral_amount: u128,
    /// Outstanding synthetic tokens
    pub total_synthetic_tokens: u128,
    /// LP collateral not backing any position
    pub total_available_liquidity: u128,
    /// Unclaimed fees
    pub total_fee_amount: u128,
    user_fee: BTreeMap<Address, u128>,
}

impl PoolLedger {
    /// Create an empty ledger
    pub fn new() -> Self {
        Self::default()
    }

    /// Unclaimed fee of a recipient
    pub fn user_fee(&self, account: &Address) -> u128 {
        self.user_fee.get(account).copied().unwrap_or(0)
    }

    /// Collateral the pool must have in custody
    pub fn custody_requirement(&self) -> Result<u128> {
        safe_add(
            safe_add(self.total_available_liquidity, self.total_collateral_amount)?,
            self.total_fee_amount,
        )
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // MINT / REDEEM
    // ═══════════════════════════════════════════════════════════════════════════

    /// Plan a mint of `collateral_amount`; `fees` is `None` for exchange legs
    pub fn plan_mint(
        &self,
        collateral_amount: u128,
        fees: Option<&FeeConfig>,
        valuation: &Valuation,
        over_collateralization: FixedPoint,
    ) -> Result<MintPlan> {
        let fee = match fees {
            Some(fees) => fees.fee_on(collateral_amount)?,
            None => 0,
        };
        let net_collateral = safe_sub(collateral_amount, fee)?;
        let num_tokens = valuation.collateral_to_synth(net_collateral)?;
        let over_collateral = over_collateralization.mul_amount(net_collateral)?;
        if over_collateral > self.total_available_liquidity {
            return Err(Error::InsufficientLiquidity {
                required: over_collateral,
                available: self.total_available_liquidity,
            });
        }
        Ok(MintPlan {
            fee,
            net_collateral,
            num_tokens,
            over_collateral,
        })
    }

    /// Apply a mint plan
    pub fn apply_mint(&mut self, plan: &MintPlan) -> Result<()> {
        self.total_available_liquidity =
            safe_sub(self.total_available_liquidity, plan.over_collateral)?;
        self.total_collateral_amount = safe_add(
            self.total_collateral_amount,
            safe_add(plan.net_collateral, plan.over_collateral)?,
        )?;
        self.total_synthetic_tokens = safe_add(self.total_synthetic_tokens, plan.num_tokens)?;
        Ok(())
    }

    /// Plan a redeem of `num_tokens`
    pub fn plan_redeem(
        &self,
        num_tokens: u128,
        fees: &FeeConfig,
        over_collateralization: FixedPoint,
    ) -> Result<RedeemPlan> {
        if num_tokens > self.total_synthetic_tokens {
            return Err(Error::InsufficientSyntheticTokens {
                requested: num_tokens,
                available: self.total_synthetic_tokens,
            });
        }
        let gross_collateral = mul_div(
            self.total_collateral_amount,
            num_tokens,
            self.total_synthetic_tokens,
        )?;
        let cushion = FixedPoint::ONE.checked_add(over_collateralization)?;
        let collateral_amount = mul_div(gross_collateral, FixedPoint::SCALE, cushion.raw())?;
        let fee = fees.fee_on(collateral_amount)?;
        Ok(RedeemPlan {
            num_tokens,
            gross_collateral,
            collateral_amount,
            fee,
            net_collateral: safe_sub(collateral_amount, fee)?,
            freed_liquidity: safe_sub(gross_collateral, collateral_amount)?,
        })
    }

    /// Apply a redeem plan
    pub fn apply_redeem(&mut self, plan: &RedeemPlan) -> Result<()> {
        self.total_collateral_amount =
            safe_sub(self.total_collateral_amount, plan.gross_collateral)?;
        self.total_synthetic_tokens = safe_sub(self.total_synthetic_tokens, plan.num_tokens)?;
        self.total_available_liquidity =
            safe_add(self.total_available_liquidity, plan.freed_liquidity)?;
        Ok(())
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // FEES
    // ═══════════════════════════════════════════════════════════════════════════

    /// Credit fee shares to their recipients
    pub fn credit_fees(&mut self, shares: &[(Address, u128)]) -> Result<()> {
        for (recipient, share) in shares {
            let balance = safe_add(self.user_fee(recipient), *share)?;
            self.user_fee.insert(*recipient, balance);
            self.total_fee_amount = safe_add(self.total_fee_amount, *share)?;
        }
        Ok(())
    }

    /// Take the whole unclaimed fee of `claimer`
    pub fn take_fee(&mut self, claimer: &Address) -> Result<u128> {
        let amount = self.user_fee(claimer);
        if amount == 0 {
            return Err(Error::NoFeeToClaim);
        }
        self.user_fee.remove(claimer);
        self.total_fee_amount = safe_sub(self.total_fee_amount, amount)?;
        Ok(amount)
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // LIQUIDITY
    // ═══════════════════════════════════════════════════════════════════════════

    /// Add free liquidity
    pub fn add_liquidity(&mut self, amount: u128) -> Result<()> {
        self.total_available_liquidity = safe_add(self.total_available_liquidity, amount)?;
        Ok(())
    }

    /// Remove free liquidity
    pub fn remove_liquidity(&mut self, amount: u128) -> Result<()> {
        if amount > self.total_available_liquidity {
            return Err(Error::InsufficientLiquidity {
                required: amount,
                available: self.total_available_liquidity,
            });
        }
        self.total_available_liquidity -= amount;
        Ok(())
    }

    /// Move `increase` from liquidity, topped up by `transfer`, into the position
    pub fn increase_collateral(&mut self, transfer: u128, increase: u128) -> Result<()> {
        let funded = safe_add(self.total_available_liquidity, transfer)?;
        if increase > funded {
            return Err(Error::InsufficientLiquidity {
                required: increase,
                available: funded,
            });
        }
        self.total_available_liquidity = funded - increase;
        self.total_collateral_amount = safe_add(self.total_collateral_amount, increase)?;
        Ok(())
    }

    /// Move `decrease` out of the position, paying `withdraw` out of liquidity
    pub fn decrease_collateral(&mut self, decrease: u128, withdraw: u128) -> Result<()> {
        let remaining = safe_sub(self.total_collateral_amount, decrease)?;
        let freed = safe_add(self.total_available_liquidity, decrease)?;
        if withdraw > freed {
            return Err(Error::InsufficientLiquidity {
                required: withdraw,
                available: freed,
            });
        }
        self.total_collateral_amount = remaining;
        self.total_available_liquidity = freed - withdraw;
        Ok(())
    }

    /// Move all liquidity into the position
    pub fn fold_liquidity(&mut self) -> Result<()> {
        self.total_collateral_amount =
            safe_add(self.total_collateral_amount, self.total_available_liquidity)?;
        self.total_available_liquidity = 0;
        Ok(())
    }

    /// Drop collateral the lending market rounded away, from liquidity first
    pub fn write_off(&mut self, amount: u128) -> Result<()> {
        let from_liquidity = amount.min(self.total_available_liquidity);
        let from_position = amount - from_liquidity;
        if from_position > self.total_collateral_amount {
            return Err(Error::InsufficientLiquidity {
                required: amount,
                available: safe_add(self.total_available_liquidity, self.total_collateral_amount)?,
            });
        }
        self.total_available_liquidity -= from_liquidity;
        self.total_collateral_amount -= from_position;
        Ok(())
    }

    /// Burn `tokens` and release `collateral` from the position
    pub fn release(&mut self, tokens: u128, collateral: u128) -> Result<()> {
        self.total_synthetic_tokens = safe_sub(self.total_synthetic_tokens, tokens)?;
        self.total_collateral_amount = safe_sub(self.total_collateral_amount, collateral)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fees() -> FeeConfig {
        FeeConfig::new(
            FixedPoint::from_bps(20),
            vec![Address::derive("lp"), Address::derive("dao")],
            vec![50, 50],
        )
    }

    fn valuation(price: &str) -> Valuation {
        Valuation::new(price.parse().unwrap(), 6).unwrap()
    }

    fn funded_ledger() -> PoolLedger {
        let mut ledger = PoolLedger::new();
        ledger.add_liquidity(50_000_000).unwrap();
        ledger
    }

    #[test]
    fn test_valuation_conversions() {
        let v = valuation("1.2");
        assert_eq!(v.collateral_to_synth(120_000_000).unwrap(), 100 * FixedPoint::SCALE);
        assert_eq!(v.synth_to_collateral(100 * FixedPoint::SCALE).unwrap(), 120_000_000);
        assert_eq!(
            v.required_collateral(100 * FixedPoint::SCALE, "1.05".parse().unwrap())
                .unwrap(),
            126_000_000
        );
        assert!(Valuation::new(FixedPoint::ZERO, 6).is_err());
    }

    #[test]
    fn test_mint_plan() {
        let mut ledger = funded_ledger();
        let plan = ledger
            .plan_mint(120_240_480, Some(&fees()), &valuation("1.2"), FixedPoint::from_percentage(25))
            .unwrap();
        assert_eq!(plan.fee, 240_480);
        assert_eq!(plan.net_collateral, 120_000_000);
        assert_eq!(plan.num_tokens, 100 * FixedPoint::SCALE);
        assert_eq!(plan.over_collateral, 30_000_000);

        ledger.apply_mint(&plan).unwrap();
        ledger.credit_fees(&fees().distribute(plan.fee).unwrap()).unwrap();
        assert_eq!(ledger.total_collateral_amount, 150_000_000);
        assert_eq!(ledger.total_available_liquidity, 20_000_000);
        assert_eq!(ledger.user_fee(&Address::derive("lp")), 120_240);
        assert_eq!(ledger.user_fee(&Address::derive("dao")), 120_240);
        assert_eq!(ledger.custody_requirement().unwrap(), 170_240_480);
    }

    #[test]
    fn test_mint_without_liquidity() {
        let ledger = PoolLedger::new();
        let err = ledger
            .plan_mint(1_000_000, Some(&fees()), &valuation("1.2"), FixedPoint::from_percentage(25))
            .unwrap_err();
        assert!(matches!(err, Error::InsufficientLiquidity { .. }));
    }

    #[test]
    fn test_redeem_strips_over_collateral() {
        let mut ledger = funded_ledger();
        let plan = ledger
            .plan_mint(120_240_480, Some(&fees()), &valuation("1.2"), FixedPoint::from_percentage(25))
            .unwrap();
        ledger.apply_mint(&plan).unwrap();

        let redeem = ledger
            .plan_redeem(100 * FixedPoint::SCALE, &fees(), FixedPoint::from_percentage(25))
            .unwrap();
        assert_eq!(redeem.gross_collateral, 150_000_000);
        assert_eq!(redeem.collateral_amount, 120_000_000);
        assert_eq!(redeem.fee, 240_000);
        assert_eq!(redeem.net_collateral, 119_760_000);
        assert_eq!(redeem.freed_liquidity, 30_000_000);

        ledger.apply_redeem(&redeem).unwrap();
        assert_eq!(ledger.total_collateral_amount, 0);
        assert_eq!(ledger.total_available_liquidity, 50_000_000);
        assert!(matches!(
            ledger.plan_redeem(1, &fees(), FixedPoint::from_percentage(25)),
            Err(Error::InsufficientSyntheticTokens { .. })
        ));
    }

    #[test]
    fn test_claim_fee() {
        let mut ledger = PoolLedger::new();
        ledger.credit_fees(&fees().distribute(1_001).unwrap()).unwrap();
        assert_eq!(ledger.take_fee(&Address::derive("dao")).unwrap(), 501);
        assert_eq!(ledger.total_fee_amount, 500);
        assert!(matches!(
            ledger.take_fee(&Address::derive("dao")),
            Err(Error::NoFeeToClaim)
        ));
    }

    #[test]
    fn test_collateral_moves() {
        let mut ledger = funded_ledger();
        ledger.increase_collateral(10, 50_000_010).unwrap();
        assert_eq!(ledger.total_available_liquidity, 0);
        assert_eq!(ledger.total_collateral_amount, 50_000_010);
        assert!(ledger.increase_collateral(0, 1).is_err());

        ledger.decrease_collateral(10, 5).unwrap();
        assert_eq!(ledger.total_available_liquidity, 5);
        assert!(matches!(
            ledger.decrease_collateral(0, 6),
            Err(Error::InsufficientLiquidity { .. })
        ));

        ledger.fold_liquidity().unwrap();
        assert_eq!(ledger.total_available_liquidity, 0);
        assert_eq!(ledger.total_collateral_amount, 50_000_005);
    }

    #[test]
    fn test_write_off_drains_liquidity_then_position() {
        let mut ledger = PoolLedger::new();
        ledger.add_liquidity(3).unwrap();
        ledger.total_collateral_amount = 10;

        ledger.write_off(4).unwrap();
        assert_eq!(ledger.total_available_liquidity, 0);
        assert_eq!(ledger.total_collateral_amount, 9);
        assert!(matches!(
            ledger.write_off(10),
            Err(Error::InsufficientLiquidity { required: 10, available: 9 })
        ));
        assert_eq!(ledger.total_collateral_amount, 9);
    }
}
