//! Engine events for state change notifications.
//!
//! Every successful state change appends a record to the [`EventLog`]. A
//! failed operation is rolled back together with any records it produced.

use serde::{Deserialize, Serialize};

use crate::utils::crypto::Address;
use crate::utils::math::FixedPoint;

// ═══════════════════════════════════════════════════════════════════════════════
// EVENT TYPES
// ═══════════════════════════════════════════════════════════════════════════════

/// All engine event types
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    // Pool events
    /// Synthetic tokens minted against collateral
    Mint {
        /// Caller
        account: Address,
        /// Collateral pulled from the caller
        collateral_sent: u128,
        /// Synthetic tokens minted
        num_tokens_received: u128,
        /// Fee charged
        fee_paid: u128,
        /// Receiver of the tokens
        recipient: Address,
    },
    /// Synthetic tokens redeemed for collateral
    Redeem {
        /// Caller
        account: Address,
        /// Synthetic tokens burned
        num_tokens_sent: u128,
        /// Collateral paid out
        collateral_received: u128,
        /// Fee charged
        fee_paid: u128,
        /// Receiver of the collateral
        recipient: Address,
    },
    /// Synthetic tokens swapped into another pool's synthetic
    Exchange {
        /// Caller
        account: Address,
        /// Destination pool
        dest_pool: Address,
        /// Source tokens burned
        num_tokens_sent: u128,
        /// Destination tokens minted
        dest_num_tokens_received: u128,
        /// Fee charged on the source leg
        fee_paid: u128,
        /// Receiver of the destination tokens
        recipient: Address,
    },
    /// LP added free liquidity
    AddLiquidity {
        /// Liquidity provider
        lp: Address,
        /// Collateral added
        amount: u128,
        /// Available liquidity afterwards
        available: u128,
    },
    /// LP withdrew free liquidity
    WithdrawLiquidity {
        /// Liquidity provider
        lp: Address,
        /// Collateral withdrawn
        amount: u128,
        /// Available liquidity afterwards
        available: u128,
    },
    /// LP moved collateral into the position
    IncreaseCollateral {
        /// Liquidity provider
        lp: Address,
        /// Collateral pulled from the LP
        collateral_transferred: u128,
        /// Increase of the position collateral
        collateral_increased: u128,
        /// Position collateral afterwards
        total_collateral: u128,
    },
    /// LP moved collateral out of the position
    DecreaseCollateral {
        /// Liquidity provider
        lp: Address,
        /// Decrease of the position collateral
        collateral_decreased: u128,
        /// Collateral sent to the LP
        collateral_withdrawn: u128,
        /// Position collateral afterwards
        total_collateral: u128,
    },
    /// Fee recipient claimed its fees
    ClaimFee {
        /// Claimer
        claimer: Address,
        /// Collateral paid out
        fee_amount: u128,
        /// Unclaimed pool fees afterwards
        total_remaining_fees: u128,
    },
    /// Position liquidated
    Liquidate {
        /// Liquidator
        liquidator: Address,
        /// Synthetic tokens burned
        tokens_liquidated: u128,
        /// Price used
        price: FixedPoint,
        /// Collateral value of the burned tokens
        collateral_expected: u128,
        /// Collateral paid out including reward
        collateral_received: u128,
        /// Reward part of the payout
        reward_received: u128,
    },
    /// Pool shut down
    EmergencyShutdown {
        /// Shutdown time
        timestamp: u64,
        /// Settlement price
        price: FixedPoint,
    },
    /// Holder or LP settled after shutdown
    Settle {
        /// Settling account
        account: Address,
        /// Synthetic tokens burned
        num_tokens_settled: u128,
        /// Collateral value of the tokens at settlement price
        collateral_expected: u128,
        /// Collateral paid out
        collateral_settled: u128,
    },
    /// Fee percentage changed
    SetFeePercentage {
        /// New value
        fee_percentage: FixedPoint,
    },
    /// Fee recipients changed
    SetFeeRecipients {
        /// New recipients
        recipients: Vec<Address>,
        /// New proportions
        proportions: Vec<u128>,
    },
    /// Over-collateralization changed
    SetOverCollateralization {
        /// New value
        over_collateralization: FixedPoint,
    },
    /// Liquidation reward changed
    SetLiquidationReward {
        /// New value
        liquidation_reward: FixedPoint,
    },
    /// Pool's share of realized lending interest credited to liquidity
    InterestCredited {
        /// Interest credited
        pool_interest: u128,
        /// Interest attributed to the DAO
        dao_interest: u128,
    },

    // Lending events
    /// DAO commission paid out
    BatchCommissionClaim {
        /// Collateral sent
        collateral_out: u128,
        /// Receiver
        receiver: Address,
    },
    /// DAO buyback executed
    BatchBuyback {
        /// Collateral swapped
        collateral_in: u128,
        /// Reward tokens bought
        reward_out: u128,
        /// Receiver
        receiver: Address,
    },
    /// Pool moved to a different lending module
    LendingModuleMigrated {
        /// Pool
        pool: Address,
        /// New module id
        module_id: String,
        /// New interest-bearing token
        interest_bearing_token: Address,
        /// Collateral attributed before migration
        prev_total_collateral: u128,
        /// Collateral attributed after migration
        actual_total_collateral: u128,
    },
    /// Lending storage moved to a new pool
    PoolStorageMigrated {
        /// Old pool
        old_pool: Address,
        /// New pool
        new_pool: Address,
        /// Collateral carried over
        collateral_deposited: u128,
    },

    // Forwarder events
    /// Meta-transaction relayed
    MetaTransactionExecuted {
        /// Signer
        from: Address,
        /// Target
        to: Address,
        /// Consumed nonce
        nonce: u128,
    },
}

impl Event {
    /// Get the event type as a string
    pub fn event_type(&self) -> &'static str {
        match self {
            Event::Mint { .. } => "Mint",
            Event::Redeem { .. } => "Redeem",
            Event::Exchange { .. } => "Exchange",
            Event::AddLiquidity { .. } => "AddLiquidity",
            Event::WithdrawLiquidity { .. } => "WithdrawLiquidity",
            Event::IncreaseCollateral { .. } => "IncreaseCollateral",
            Event::DecreaseCollateral { .. } => "DecreaseCollateral",
            Event::ClaimFee { .. } => "ClaimFee",
            Event::Liquidate { .. } => "Liquidate",
            Event::EmergencyShutdown { .. } => "EmergencyShutdown",
            Event::Settle { .. } => "Settle",
            Event::SetFeePercentage { .. } => "SetFeePercentage",
            Event::SetFeeRecipients { .. } => "SetFeeRecipients",
            Event::SetOverCollateralization { .. } => "SetOverCollateralization",
            Event::SetLiquidationReward { .. } => "SetLiquidationReward",
            Event::InterestCredited { .. } => "InterestCredited",
            Event::BatchCommissionClaim { .. } => "BatchCommissionClaim",
            Event::BatchBuyback { .. } => "BatchBuyback",
            Event::LendingModuleMigrated { .. } => "LendingModuleMigrated",
            Event::PoolStorageMigrated { .. } => "PoolStorageMigrated",
            Event::MetaTransactionExecuted { .. } => "MetaTransactionExecuted",
        }
    }
}

/// An event together with its emitter and time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Component that emitted the event
    pub emitter: Address,
    /// Engine time of emission
    pub timestamp: u64,
    /// The event
    pub event: Event,
}

// ═══════════════════════════════════════════════════════════════════════════════
// EVENT LOG
// ═══════════════════════════════════════════════════════════════════════════════

/// Bounded in-memory event log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventLog {
    records: Vec<EventRecord>,
    max_events: usize,
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new(crate::utils::constants::DEFAULT_MAX_EVENTS)
    }
}

impl EventLog {
    /// Create an empty log keeping at most `max_events` records
    pub fn new(max_events: usize) -> Self {
        Self {
            records: Vec::new(),
            max_events: max_events.max(1),
        }
    }

    /// Append a record, dropping the oldest when full
    pub fn push(&mut self, emitter: Address, timestamp: u64, event: Event) {
        self.records.push(EventRecord {
            emitter,
            timestamp,
            event,
        });
        if self.records.len() > self.max_events {
            let excess = self.records.len() - self.max_events;
            self.records.drain(..excess);
        }
    }

    /// All retained records, oldest first
    pub fn records(&self) -> &[EventRecord] {
        &self.records
    }

    /// Records of one event type
    pub fn filter_by_type(&self, event_type: &str) -> Vec<&EventRecord> {
        self.records
            .iter()
            .filter(|r| r.event.event_type() == event_type)
            .collect()
    }

    /// Most recent record
    pub fn last(&self) -> Option<&EventRecord> {
        self.records.last()
    }

    /// Number of retained records
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Remove all records
    pub fn clear(&mut self) {
        self.records.clear();
    }
}
