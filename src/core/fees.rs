//! Fee configuration and distribution.
//!
//! A pool charges a flat percentage on mint, redeem and exchange. The fee is
//! split among an ordered list of recipients by relative proportion.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::utils::crypto::Address;
use crate::utils::math::{split_proportionally, FixedPoint};
use crate::utils::validation::{validate_fee_percentage, validate_same_length};

/// Fee percentage and its recipients
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeConfig {
    /// Fraction of the collateral charged as fee
    pub fee_percentage: FixedPoint,
    /// Fee recipients, in payout order
    pub recipients: Vec<Address>,
    /// Relative weight of each recipient
    pub proportions: Vec<u128>,
}

impl FeeConfig {
    /// Create a fee configuration
    pub fn new(fee_percentage: FixedPoint, recipients: Vec<Address>, proportions: Vec<u128>) -> Self {
        Self {
            fee_percentage,
            recipients,
            proportions,
        }
    }

    /// Validate percentage and recipients
    pub fn validate(&self) -> Result<()> {
        validate_fee_percentage(self.fee_percentage)?;
        Self::validate_recipients(&self.recipients, &self.proportions)
    }

    /// Validate a recipient list
    pub fn validate_recipients(recipients: &[Address], proportions: &[u128]) -> Result<()> {
        validate_same_length(recipients.len(), proportions.len())?;
        if recipients.is_empty() {
            return Err(Error::InvalidParameter {
                name: "fee_recipients".into(),
                reason: "at least one recipient is required".into(),
            });
        }
        if proportions.iter().all(|p| *p == 0) {
            return Err(Error::InvalidParameter {
                name: "fee_proportions".into(),
                reason: "total proportion is zero".into(),
            });
        }
        Ok(())
    }

    /// Sum of all proportions
    pub fn total_proportion(&self) -> u128 {
        self.proportions.iter().sum()
    }

    /// Fee owed on `collateral_amount`, floored
    pub fn fee_on(&self, collateral_amount: u128) -> Result<u128> {
        self.fee_percentage.mul_amount(collateral_amount)
    }

    /// Split a fee across recipients; shares always sum to `fee`
    pub fn distribute(&self, fee: u128) -> Result<Vec<(Address, u128)>> {
        let shares = split_proportionally(fee, &self.proportions)?;
        Ok(self.recipients.iter().copied().zip(shares).collect())
    }
}
