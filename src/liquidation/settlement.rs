//! Emergency shutdown settlement.
//!
//! After shutdown every outstanding token is worth its value at the frozen
//! price, unless the position no longer covers all of them. In that case the
//! per-token rate is `collateral / outstanding`, recomputed on every call
//! against what is left. The LP only ever receives the residual above the
//! value of all tokens still outstanding.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::pool::ledger::{PoolLedger, Valuation};
use crate::utils::math::{mul_div, safe_sub};

/// Outcome of one settlement call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementPlan {
    /// Tokens burned from the caller
    pub tokens_settled: u128,
    /// Value of those tokens at the settlement price
    pub collateral_expected: u128,
    /// Collateral paid for the tokens
    pub user_collateral: u128,
    /// Residual paid to the LP
    pub lp_collateral: u128,
}

impl SettlementPlan {
    /// Total collateral paid out
    pub fn total_collateral(&self) -> u128 {
        self.user_collateral.saturating_add(self.lp_collateral)
    }

    /// Whether the call changes nothing
    pub fn is_empty(&self) -> bool {
        self.tokens_settled == 0 && self.total_collateral() == 0
    }
}

/// Size a settlement for a holder of `balance` tokens
pub fn calculate_settlement(
    ledger: &PoolLedger,
    balance: u128,
    valuation: &Valuation,
    is_liquidity_provider: bool,
) -> Result<SettlementPlan> {
    let total_tokens = ledger.total_synthetic_tokens;
    let collateral = ledger.total_collateral_amount;
    let tokens_settled = balance.min(total_tokens);
    let collateral_expected = valuation.synth_to_collateral(tokens_settled)?;

    let user_collateral = if tokens_settled == 0 {
        0
    } else if collateral >= valuation.synth_to_collateral(total_tokens)? {
        collateral_expected
    } else {
        mul_div(collateral, tokens_settled, total_tokens)?
    };

    let lp_collateral = if is_liquidity_provider {
        let remaining_collateral = safe_sub(collateral, user_collateral)?;
        let remaining_value =
            valuation.synth_to_collateral(safe_sub(total_tokens, tokens_settled)?)?;
        remaining_collateral.saturating_sub(remaining_value)
    } else {
        0
    };

    Ok(SettlementPlan {
        tokens_settled,
        collateral_expected,
        user_collateral,
        lp_collateral,
    })
}
