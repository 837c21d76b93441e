//! Pool calls and their calldata encoding.
//!
//! Every pool operation reachable through raw calldata (direct calls and
//! relayed meta-transactions) is a [`PoolCall`]. Calldata is a 4-byte
//! selector followed by 32-byte big-endian words:
//! - `uint256` values must fit in 128 bits (expirations in 64)
//! - addresses are left-padded with 12 zero bytes
//! - static tuples are encoded in place
//!
//! Results are returned as a [`CallOutcome`], encoded the same way.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::liquidation::engine::LiquidationPlan;
use crate::liquidation::settlement::SettlementPlan;
use crate::lending::manager::ReturnValues;
use crate::pool::pool::{
    ExchangeOutcome, ExchangeParams, MintOutcome, MintParams, RedeemOutcome, RedeemParams,
};
use crate::utils::constants::{ADDRESS_LENGTH, SELECTOR_LENGTH, WORD_LENGTH};
use crate::utils::crypto::{keccak256, Address};
use crate::utils::math::FixedPoint;

/// One ABI word
pub type Word = [u8; WORD_LENGTH];

// ═══════════════════════════════════════════════════════════════════════════════
// WORD CODEC
// ═══════════════════════════════════════════════════════════════════════════════

/// Encode an unsigned integer as a big-endian word
pub fn u128_word(value: u128) -> Word {
    let mut word = [0u8; WORD_LENGTH];
    word[WORD_LENGTH - 16..].copy_from_slice(&value.to_be_bytes());
    word
}

/// Encode an address as a left-padded word
pub fn address_word(address: &Address) -> Word {
    let mut word = [0u8; WORD_LENGTH];
    word[WORD_LENGTH - ADDRESS_LENGTH..].copy_from_slice(address.as_bytes());
    word
}

/// First four bytes of the keccak256 of a function signature
pub fn selector(signature: &str) -> [u8; SELECTOR_LENGTH] {
    let mut out = [0u8; SELECTOR_LENGTH];
    out.copy_from_slice(&keccak256(signature.as_bytes()).as_bytes()[..SELECTOR_LENGTH]);
    out
}

/// Sequential reader over calldata words
#[derive(Debug)]
pub struct WordReader<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> WordReader<'a> {
    /// Wrap an argument body; its length must be a whole number of words
    pub fn new(data: &'a [u8]) -> Result<Self> {
        if data.len() % WORD_LENGTH != 0 {
            return Err(Error::InvalidCalldata(format!(
                "{} bytes is not a whole number of words",
                data.len()
            )));
        }
        Ok(Self { data, offset: 0 })
    }

    fn next_word(&mut self) -> Result<&'a [u8]> {
        let end = self.offset + WORD_LENGTH;
        let word = self
            .data
            .get(self.offset..end)
            .ok_or_else(|| Error::InvalidCalldata("missing argument".into()))?;
        self.offset = end;
        Ok(word)
    }

    /// Read a word holding a value below 2^128
    pub fn u128(&mut self) -> Result<u128> {
        let word = self.next_word()?;
        if word[..WORD_LENGTH - 16].iter().any(|b| *b != 0) {
            return Err(Error::InvalidCalldata("value exceeds 128 bits".into()));
        }
        let mut bytes = [0u8; 16];
        bytes.copy_from_slice(&word[WORD_LENGTH - 16..]);
        Ok(u128::from_be_bytes(bytes))
    }

    /// Read a word holding a value below 2^64
    pub fn u64(&mut self) -> Result<u64> {
        let value = self.u128()?;
        u64::try_from(value).map_err(|_| Error::InvalidCalldata("value exceeds 64 bits".into()))
    }

    /// Read a left-padded address
    pub fn address(&mut self) -> Result<Address> {
        let word = self.next_word()?;
        if word[..WORD_LENGTH - ADDRESS_LENGTH].iter().any(|b| *b != 0) {
            return Err(Error::InvalidCalldata("dirty address padding".into()));
        }
        Address::from_slice(&word[WORD_LENGTH - ADDRESS_LENGTH..])
    }

    /// Fail if unread words remain
    pub fn finish(self) -> Result<()> {
        if self.offset != self.data.len() {
            return Err(Error::InvalidCalldata(format!(
                "{} trailing bytes",
                self.data.len() - self.offset
            )));
        }
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// POOL CALLS
// ═══════════════════════════════════════════════════════════════════════════════

/// Function signatures understood by pools
pub mod signatures {
    /// `mint(MintParams)`
    pub const MINT: &str = "mint((uint256,uint256,uint256,address))";
    /// `redeem(RedeemParams)`
    pub const REDEEM: &str = "redeem((uint256,uint256,uint256,address))";
    /// `exchange(ExchangeParams)`
    pub const EXCHANGE: &str = "exchange((address,uint256,uint256,uint256,address))";
    /// `addLiquidity(collateralAmount)`
    pub const ADD_LIQUIDITY: &str = "addLiquidity(uint256)";
    /// `withdrawLiquidity(collateralAmount)`
    pub const WITHDRAW_LIQUIDITY: &str = "withdrawLiquidity(uint256)";
    /// `increaseCollateral(collateralToTransfer, collateralToIncrease)`
    pub const INCREASE_COLLATERAL: &str = "increaseCollateral(uint256,uint256)";
    /// `decreaseCollateral(collateralToDecrease, collateralToWithdraw)`
    pub const DECREASE_COLLATERAL: &str = "decreaseCollateral(uint256,uint256)";
    /// `claimFee()`
    pub const CLAIM_FEE: &str = "claimFee()";
    /// `liquidate(numSynthTokens)`
    pub const LIQUIDATE: &str = "liquidate(uint256)";
    /// `emergencyShutdown()`
    pub const EMERGENCY_SHUTDOWN: &str = "emergencyShutdown()";
    /// `settleEmergencyShutdown()`
    pub const SETTLE_EMERGENCY_SHUTDOWN: &str = "settleEmergencyShutdown()";
    /// `updateAccumulatedInterest()`
    pub const UPDATE_ACCUMULATED_INTEREST: &str = "updateAccumulatedInterest()";
    /// `setFeePercentage(fee)`
    pub const SET_FEE_PERCENTAGE: &str = "setFeePercentage(uint256)";
    /// `setOverCollateralization(overCollateralization)`
    pub const SET_OVER_COLLATERALIZATION: &str = "setOverCollateralization(uint256)";
    /// `setLiquidationReward(liquidationReward)`
    pub const SET_LIQUIDATION_REWARD: &str = "setLiquidationReward(uint256)";

    /// Every signature above
    pub const ALL: [&str; 15] = [
        MINT,
        REDEEM,
        EXCHANGE,
        ADD_LIQUIDITY,
        WITHDRAW_LIQUIDITY,
        INCREASE_COLLATERAL,
        DECREASE_COLLATERAL,
        CLAIM_FEE,
        LIQUIDATE,
        EMERGENCY_SHUTDOWN,
        SETTLE_EMERGENCY_SHUTDOWN,
        UPDATE_ACCUMULATED_INTEREST,
        SET_FEE_PERCENTAGE,
        SET_OVER_COLLATERALIZATION,
        SET_LIQUIDATION_REWARD,
    ];
}

/// A pool operation with its arguments
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PoolCall {
    /// Mint synthetic tokens
    Mint(MintParams),
    /// Redeem synthetic tokens
    Redeem(RedeemParams),
    /// Exchange into another pool's synthetic
    Exchange(ExchangeParams),
    /// Add LP liquidity
    AddLiquidity {
        /// Collateral added
        amount: u128,
    },
    /// Withdraw LP liquidity
    WithdrawLiquidity {
        /// Collateral withdrawn
        amount: u128,
    },
    /// Move collateral into the position
    IncreaseCollateral {
        /// Collateral pulled from the LP
        collateral_to_transfer: u128,
        /// Increase of the position collateral
        collateral_to_increase: u128,
    },
    /// Move collateral out of the position
    DecreaseCollateral {
        /// Decrease of the position collateral
        collateral_to_decrease: u128,
        /// Collateral sent to the LP
        collateral_to_withdraw: u128,
    },
    /// Claim unclaimed fees
    ClaimFee,
    /// Liquidate an undercollateralized position
    Liquidate {
        /// Synthetic tokens to burn
        num_synth_tokens: u128,
    },
    /// Shut the pool down
    EmergencyShutdown,
    /// Settle after shutdown
    SettleEmergencyShutdown,
    /// Realize lending interest
    UpdateAccumulatedInterest,
    /// Change the fee percentage
    SetFeePercentage {
        /// New fee percentage
        fee_percentage: FixedPoint,
    },
    /// Change the over-collateralization
    SetOverCollateralization {
        /// New over-collateralization
        over_collateralization: FixedPoint,
    },
    /// Change the liquidation reward
    SetLiquidationReward {
        /// New liquidation reward
        liquidation_reward: FixedPoint,
    },
}

impl PoolCall {
    /// Function signature of the call
    pub fn signature(&self) -> &'static str {
        match self {
            Self::Mint(_) => signatures::MINT,
            Self::Redeem(_) => signatures::REDEEM,
            Self::Exchange(_) => signatures::EXCHANGE,
            Self::AddLiquidity { .. } => signatures::ADD_LIQUIDITY,
            Self::WithdrawLiquidity { .. } => signatures::WITHDRAW_LIQUIDITY,
            Self::IncreaseCollateral { .. } => signatures::INCREASE_COLLATERAL,
            Self::DecreaseCollateral { .. } => signatures::DECREASE_COLLATERAL,
            Self::ClaimFee => signatures::CLAIM_FEE,
            Self::Liquidate { .. } => signatures::LIQUIDATE,
            Self::EmergencyShutdown => signatures::EMERGENCY_SHUTDOWN,
            Self::SettleEmergencyShutdown => signatures::SETTLE_EMERGENCY_SHUTDOWN,
            Self::UpdateAccumulatedInterest => signatures::UPDATE_ACCUMULATED_INTEREST,
            Self::SetFeePercentage { .. } => signatures::SET_FEE_PERCENTAGE,
            Self::SetOverCollateralization { .. } => signatures::SET_OVER_COLLATERALIZATION,
            Self::SetLiquidationReward { .. } => signatures::SET_LIQUIDATION_REWARD,
        }
    }

    /// Short operation name for logs
    pub fn operation_type(&self) -> &'static str {
        let signature = self.signature();
        signature.split('(').next().unwrap_or(signature)
    }

    /// Encode as calldata
    pub fn encode(&self) -> Vec<u8> {
        let words: Vec<Word> = match self {
            Self::Mint(p) => vec![
                u128_word(p.min_num_tokens),
                u128_word(p.collateral_amount),
                u128_word(p.expiration as u128),
                address_word(&p.recipient),
            ],
            Self::Redeem(p) => vec![
                u128_word(p.num_tokens),
                u128_word(p.min_collateral),
                u128_word(p.expiration as u128),
                address_word(&p.recipient),
            ],
            Self::Exchange(p) => vec![
                address_word(&p.dest_pool),
                u128_word(p.num_tokens),
                u128_word(p.min_dest_num_tokens),
                u128_word(p.expiration as u128),
                address_word(&p.recipient),
            ],
            Self::AddLiquidity { amount } | Self::WithdrawLiquidity { amount } => {
                vec![u128_word(*amount)]
            }
            Self::IncreaseCollateral {
                collateral_to_transfer,
                collateral_to_increase,
            } => vec![
                u128_word(*collateral_to_transfer),
                u128_word(*collateral_to_increase),
            ],
            Self::DecreaseCollateral {
                collateral_to_decrease,
                collateral_to_withdraw,
            } => vec![
                u128_word(*collateral_to_decrease),
                u128_word(*collateral_to_withdraw),
            ],
            Self::Liquidate { num_synth_tokens } => vec![u128_word(*num_synth_tokens)],
            Self::SetFeePercentage { fee_percentage: v }
            | Self::SetOverCollateralization {
                over_collateralization: v,
            }
            | Self::SetLiquidationReward {
                liquidation_reward: v,
            } => vec![u128_word(v.raw())],
            Self::ClaimFee
            | Self::EmergencyShutdown
            | Self::SettleEmergencyShutdown
            | Self::UpdateAccumulatedInterest => vec![],
        };
        let mut data = selector(self.signature()).to_vec();
        for word in words {
            data.extend_from_slice(&word);
        }
        data
    }

    /// Decode calldata
    pub fn decode(data: &[u8]) -> Result<Self> {
        if data.len() < SELECTOR_LENGTH {
            return Err(Error::InvalidCalldata("missing selector".into()));
        }
        let (head, body) = data.split_at(SELECTOR_LENGTH);
        let signature = signatures::ALL
            .iter()
            .copied()
            .find(|sig| selector(sig) == head)
            .ok_or_else(|| Error::InvalidCalldata(format!("unknown selector 0x{}", hex::encode(head))))?;

        let mut r = WordReader::new(body)?;
        let call = match signature {
            signatures::MINT => Self::Mint(MintParams {
                min_num_tokens: r.u128()?,
                collateral_amount: r.u128()?,
                expiration: r.u64()?,
                recipient: r.address()?,
            }),
            signatures::REDEEM => Self::Redeem(RedeemParams {
                num_tokens: r.u128()?,
                min_collateral: r.u128()?,
                expiration: r.u64()?,
                recipient: r.address()?,
            }),
            signatures::EXCHANGE => Self::Exchange(ExchangeParams {
                dest_pool: r.address()?,
                num_tokens: r.u128()?,
                min_dest_num_tokens: r.u128()?,
                expiration: r.u64()?,
                recipient: r.address()?,
            }),
            signatures::ADD_LIQUIDITY => Self::AddLiquidity { amount: r.u128()? },
            signatures::WITHDRAW_LIQUIDITY => Self::WithdrawLiquidity { amount: r.u128()? },
            signatures::INCREASE_COLLATERAL => Self::IncreaseCollateral {
                collateral_to_transfer: r.u128()?,
                collateral_to_increase: r.u128()?,
            },
            signatures::DECREASE_COLLATERAL => Self::DecreaseCollateral {
                collateral_to_decrease: r.u128()?,
                collateral_to_withdraw: r.u128()?,
            },
            signatures::CLAIM_FEE => Self::ClaimFee,
            signatures::LIQUIDATE => Self::Liquidate {
                num_synth_tokens: r.u128()?,
            },
            signatures::EMERGENCY_SHUTDOWN => Self::EmergencyShutdown,
            signatures::SETTLE_EMERGENCY_SHUTDOWN => Self::SettleEmergencyShutdown,
            signatures::UPDATE_ACCUMULATED_INTEREST => Self::UpdateAccumulatedInterest,
            signatures::SET_FEE_PERCENTAGE => Self::SetFeePercentage {
                fee_percentage: FixedPoint::from_raw(r.u128()?),
            },
            signatures::SET_OVER_COLLATERALIZATION => Self::SetOverCollateralization {
                over_collateralization: FixedPoint::from_raw(r.u128()?),
            },
            signatures::SET_LIQUIDATION_REWARD => Self::SetLiquidationReward {
                liquidation_reward: FixedPoint::from_raw(r.u128()?),
            },
            other => return Err(Error::Internal(format!("unhandled signature {}", other))),
        };
        r.finish()?;
        Ok(call)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// OUTCOMES
// ═══════════════════════════════════════════════════════════════════════════════

/// Result of any pool call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum CallOutcome {
    /// Mint result
    Minted(MintOutcome),
    /// Redeem result
    Redeemed(RedeemOutcome),
    /// Exchange result
    Exchanged(ExchangeOutcome),
    /// Available liquidity after a liquidity change
    Liquidity {
        /// Available liquidity afterwards
        available: u128,
    },
    /// Position collateral after a collateral change
    Collateral {
        /// Position collateral afterwards
        total_collateral: u128,
    },
    /// Fees paid to the claimer
    FeeClaimed {
        /// Collateral paid
        amount: u128,
    },
    /// Liquidation result
    Liquidated(LiquidationPlan),
    /// Shutdown price
    ShutDown {
        /// Frozen settlement price
        price: FixedPoint,
    },
    /// Settlement result
    Settled(SettlementPlan),
    /// Interest realized
    InterestUpdated(ReturnValues),
    /// Parameter changed
    Updated,
}

impl CallOutcome {
    /// Encode as return data
    pub fn encode(&self) -> Vec<u8> {
        let words: Vec<Word> = match self {
            Self::Minted(o) => vec![u128_word(o.num_tokens), u128_word(o.fee_paid)],
            Self::Redeemed(o) => vec![u128_word(o.collateral_amount), u128_word(o.fee_paid)],
            Self::Exchanged(o) => vec![u128_word(o.dest_num_tokens), u128_word(o.fee_paid)],
            Self::Liquidity { available } => vec![u128_word(*available)],
            Self::Collateral { total_collateral } => vec![u128_word(*total_collateral)],
            Self::FeeClaimed { amount } => vec![u128_word(*amount)],
            Self::Liquidated(p) => vec![
                u128_word(p.tokens_liquidated),
                u128_word(p.collateral_received),
                u128_word(p.reward),
            ],
            Self::ShutDown { price } => vec![u128_word(price.raw())],
            Self::Settled(p) => vec![
                u128_word(p.tokens_settled),
                u128_word(p.total_collateral()),
            ],
            Self::InterestUpdated(v) => vec![u128_word(v.pool_interest), u128_word(v.dao_interest)],
            Self::Updated => vec![],
        };
        words.concat()
    }
}
