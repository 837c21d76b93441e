//! Liquidation engine.
//!
//! Sizes the liquidation of part of a pool's position:
//! - Refused while the position meets the collateral requirement
//! - Capitalized positions pay the token value plus a share of the surplus
//! - Undercapitalized positions pay the pro-rata collateral, with no reward

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::pool::ledger::{PoolLedger, Valuation};
use crate::utils::math::{mul_div, safe_add, FixedPoint};
use crate::utils::validation::validate_non_zero;

/// Outcome of sizing a liquidation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiquidationPlan {
    /// Tokens burned, capped at the outstanding supply
    pub tokens_liquidated: u128,
    /// Position collateral backing the burned tokens
    pub collateral_portion: u128,
    /// Value of the burned tokens at the current price
    pub collateral_expected: u128,
    /// Collateral paid to the liquidator
    pub collateral_received: u128,
    /// Reward part of the payout
    pub reward: u128,
}

impl LiquidationPlan {
    /// Whether the burned tokens were fully backed
    pub fn is_capitalized(&self) -> bool {
        self.collateral_portion >= self.collateral_expected
    }
}

/// Size a liquidation of `requested` tokens against the pool position
pub fn calculate_liquidation(
    ledger: &PoolLedger,
    requested: u128,
    valuation: &Valuation,
    collateral_requirement: FixedPoint,
    liquidation_reward: FixedPoint,
) -> Result<LiquidationPlan> {
    validate_non_zero(requested)?;
    let total_tokens = ledger.total_synthetic_tokens;
    if total_tokens == 0 {
        return Err(Error::InsufficientSyntheticTokens {
            requested,
            available: 0,
        });
    }
    let collateral = ledger.total_collateral_amount;
    if valuation.is_overcollateralized(collateral, total_tokens, collateral_requirement)? {
        return Err(Error::PositionOvercollateralized);
    }

    let tokens_liquidated = requested.min(total_tokens);
    let collateral_portion = mul_div(collateral, tokens_liquidated, total_tokens)?;
    let collateral_expected = valuation.synth_to_collateral(tokens_liquidated)?;

    let (collateral_received, reward) = if collateral_portion >= collateral_expected {
        let reward = liquidation_reward.mul_amount(collateral_portion - collateral_expected)?;
        (safe_add(collateral_expected, reward)?, reward)
    } else {
        (collateral_portion, 0)
    };

    Ok(LiquidationPlan {
        tokens_liquidated,
        collateral_portion,
        collateral_expected,
        collateral_received,
        reward,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fees::FeeConfig;

    const TOKEN: u128 = FixedPoint::SCALE;

    /// 100 tokens minted at 1.2 with 25% over-collateralization
    fn minted_ledger() -> PoolLedger {
        let mut ledger = PoolLedger::new();
        ledger.add_liquidity(30_000_000).unwrap();
        let fees = FeeConfig::new(FixedPoint::ZERO, vec![], vec![]);
        let plan = ledger
            .plan_mint(
                120_000_000,
                Some(&fees),
                &Valuation::new("1.2".parse().unwrap(), 6).unwrap(),
                FixedPoint::from_percentage(25),
            )
            .unwrap();
        ledger.apply_mint(&plan).unwrap();
        ledger
    }

    fn liquidate(price: &str, tokens: u128) -> Result<LiquidationPlan> {
        calculate_liquidation(
            &minted_ledger(),
            tokens,
            &Valuation::new(price.parse().unwrap(), 6).unwrap(),
            FixedPoint::from_percentage(105),
            FixedPoint::from_percentage(75),
        )
    }

    #[test]
    fn test_capitalized_liquidation_pays_reward() {
        let plan = liquidate("1.48", 798 * TOKEN / 10).unwrap();
        assert_eq!(plan.collateral_portion, 119_700_000);
        assert_eq!(plan.collateral_expected, 118_104_000);
        assert_eq!(plan.reward, 1_197_000);
        assert_eq!(plan.collateral_received, 119_301_000);
        assert!(plan.is_capitalized());
    }

    #[test]
    fn test_undercapitalized_liquidation_pays_portion() {
        let plan = liquidate("1.6", 50 * TOKEN).unwrap();
        assert_eq!(plan.collateral_expected, 80_000_000);
        assert_eq!(plan.collateral_received, 75_000_000);
        assert_eq!(plan.reward, 0);
        assert!(!plan.is_capitalized());
    }

    #[test]
    fn test_request_capped_at_supply() {
        let plan = liquidate("1.6", 500 * TOKEN).unwrap();
        assert_eq!(plan.tokens_liquidated, 100 * TOKEN);
        assert_eq!(plan.collateral_received, 150_000_000);
    }

    #[test]
    fn test_healthy_position_refused() {
        assert!(matches!(
            liquidate("1.2", TOKEN),
            Err(Error::PositionOvercollateralized)
        ));
        assert!(matches!(liquidate("1.48", 0), Err(Error::ZeroAmount)));
    }
}
