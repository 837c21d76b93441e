//! Swap module used by the DAO buyback.
//!
//! Converts collateral into the reward token at a fixed rate out of a
//! pre-funded reserve.

use serde::{Deserialize, Serialize};

use crate::core::token::TokenLedger;
use crate::error::{Error, Result};
use crate::utils::crypto::Address;
use crate::utils::math::FixedPoint;

/// Fixed-rate collateral → reward token swap
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixedRateSwap {
    /// Swap address; holds the reward reserve and receives collateral
    pub address: Address,
    /// Token bought
    pub reward_token: Address,
    /// Raw reward units per raw collateral unit
    pub rate: FixedPoint,
}

impl FixedRateSwap {
    /// Create a swap
    pub fn new(address: Address, reward_token: Address, rate: FixedPoint) -> Self {
        Self {
            address,
            reward_token,
            rate,
        }
    }

    /// Reward tokens `amount` collateral buys
    pub fn quote(&self, amount: u128) -> Result<u128> {
        self.rate.mul_amount(amount)
    }

    /// Swap `amount` of `collateral` held by `from`, sending reward tokens to `recipient`
    pub fn swap_to_reward(
        &self,
        tokens: &mut TokenLedger,
        from: Address,
        collateral: Address,
        amount: u128,
        min_out: u128,
        recipient: Address,
    ) -> Result<u128> {
        let out = self.quote(amount)?;
        if out < min_out {
            return Err(Error::SlippageExceeded {
                minimum: min_out,
                actual: out,
            });
        }
        tokens.transfer(&collateral, from, self.address, amount)?;
        tokens.transfer(&self.reward_token, self.address, recipient, out)?;
        Ok(out)
    }
}
