//! Synthetic pool state machine.
//!
//! A pool mints one synthetic token against one collateral token at the
//! oracle price. Users mint and redeem; the liquidity provider locks extra
//! collateral for every mint and manages the position; anyone may liquidate
//! an undercollateralized position. The manager can shut the pool down, after
//! which only settlement and fee claims remain.
//!
//! Collateral custody is split between the pool itself (unclaimed fees) and
//! the lending layer (liquidity and position collateral). Every operation
//! updates the ledger before moving tokens.

use serde::{Deserialize, Serialize};

use crate::core::config::{PoolConfig, PoolParams, PoolRoles};
use crate::core::context::Context;
use crate::core::fees::FeeConfig;
use crate::core::registry::RegistryKey;
use crate::error::{Error, Result};
use crate::lending::manager::{MigrateReturnValues, ReturnValues};
use crate::liquidation::engine::{calculate_liquidation, LiquidationPlan};
use crate::liquidation::settlement::{calculate_settlement, SettlementPlan};
use crate::pool::ledger::{PoolLedger, RedeemPlan, Valuation};
use crate::protocol::events::Event;
use crate::utils::constants::POOL_VERSION;
use crate::utils::crypto::Address;
use crate::utils::math::{safe_add, FixedPoint};
use crate::utils::validation::*;

// ═══════════════════════════════════════════════════════════════════════════════
// POOL STATE
// ═══════════════════════════════════════════════════════════════════════════════

/// Lifecycle of a pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PoolState {
    /// Accepting every operation
    Active,
    /// Terminal; only settlement and fee claims remain
    ShutDown {
        /// Shutdown time
        timestamp: u64,
        /// Price frozen for settlement
        settlement_price: FixedPoint,
    },
}

impl PoolState {
    /// Check if the pool was shut down
    pub fn is_shut_down(&self) -> bool {
        matches!(self, PoolState::ShutDown { .. })
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// REQUESTS AND OUTCOMES
// ═══════════════════════════════════════════════════════════════════════════════

/// Mint request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MintParams {
    /// Minimum synthetic tokens to receive
    pub min_num_tokens: u128,
    /// Collateral to pay, fee included
    pub collateral_amount: u128,
    /// Deadline
    pub expiration: u64,
    /// Receiver of the synthetic tokens
    pub recipient: Address,
}

/// Redeem request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedeemParams {
    /// Synthetic tokens to burn
    pub num_tokens: u128,
    /// Minimum collateral to receive
    pub min_collateral: u128,
    /// Deadline
    pub expiration: u64,
    /// Receiver of the collateral
    pub recipient: Address,
}

/// Exchange request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeParams {
    /// Pool minting the destination synthetic
    pub dest_pool: Address,
    /// Source synthetic tokens to burn
    pub num_tokens: u128,
    /// Minimum destination tokens to receive
    pub min_dest_num_tokens: u128,
    /// Deadline
    pub expiration: u64,
    /// Receiver of the destination tokens
    pub recipient: Address,
}

/// Result of a mint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MintOutcome {
    /// Synthetic tokens minted
    pub num_tokens: u128,
    /// Fee charged
    pub fee_paid: u128,
}

/// Result of a redeem
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedeemOutcome {
    /// Collateral paid out
    pub collateral_amount: u128,
    /// Fee charged
    pub fee_paid: u128,
}

/// Result of an exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeOutcome {
    /// Destination tokens minted
    pub dest_num_tokens: u128,
    /// Fee charged on the source leg
    pub fee_paid: u128,
}

/// Snapshot of the pool position at the current price
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionInfo {
    /// Position collateral
    pub total_collateral: u128,
    /// Outstanding synthetic tokens
    pub total_synthetic_tokens: u128,
    /// Free LP liquidity
    pub available_liquidity: u128,
    /// Unclaimed fees
    pub total_fees: u128,
    /// Price used
    pub price: FixedPoint,
    /// Collateral the requirement asks for
    pub required_collateral: u128,
    /// Whether the position meets the requirement
    pub is_overcollateralized: bool,
}

// ═══════════════════════════════════════════════════════════════════════════════
// POOL
// ═══════════════════════════════════════════════════════════════════════════════

/// One synthetic/collateral pool
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pool {
    address: Address,
    version: u8,
    registry: Address,
    price_identifier: String,
    collateral_token: Address,
    synthetic_token: Address,
    collateral_decimals: u8,
    roles: PoolRoles,
    params: PoolParams,
    ledger: PoolLedger,
    state: PoolState,
}

impl Pool {
    /// Create an empty pool
    pub fn new(
        address: Address,
        registry: Address,
        config: &PoolConfig,
        collateral_decimals: u8,
    ) -> Result<Self> {
        config.validate()?;
        Valuation::new(FixedPoint::ONE, collateral_decimals)?;
        Ok(Self {
            address,
            version: POOL_VERSION,
            registry,
            price_identifier: config.price_identifier.clone(),
            collateral_token: config.collateral_token,
            synthetic_token: config.synthetic_token,
            collateral_decimals,
            roles: config.roles,
            params: config.params.clone(),
            ledger: PoolLedger::new(),
            state: PoolState::Active,
        })
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // ACCESSORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Pool address
    pub fn address(&self) -> Address {
        self.address
    }

    /// Pool version
    pub fn version(&self) -> u8 {
        self.version
    }

    /// Registry instance the pool was deployed against
    pub fn registry(&self) -> Address {
        self.registry
    }

    /// Price identifier on the feed
    pub fn price_identifier(&self) -> &str {
        &self.price_identifier
    }

    /// Collateral token
    pub fn collateral_token(&self) -> Address {
        self.collateral_token
    }

    /// Synthetic token
    pub fn synthetic_token(&self) -> Address {
        self.synthetic_token
    }

    /// Role holders
    pub fn roles(&self) -> &PoolRoles {
        &self.roles
    }

    /// Economic parameters
    pub fn params(&self) -> &PoolParams {
        &self.params
    }

    /// Fee configuration
    pub fn fee(&self) -> &FeeConfig {
        &self.params.fee
    }

    /// Balances
    pub fn ledger(&self) -> &PoolLedger {
        &self.ledger
    }

    /// Lifecycle state
    pub fn state(&self) -> PoolState {
        self.state
    }

    /// Move the pool to a new address; lending storage and balances move separately
    pub(crate) fn relocate(&mut self, address: Address) {
        self.address = address;
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // VIEWS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Valuation at the latest oracle price
    pub fn valuation(&self, ctx: &Context) -> Result<Valuation> {
        let price = ctx.latest_price(&self.price_identifier)?.price;
        Valuation::new(price, self.collateral_decimals)
    }

    /// Latest oracle price
    pub fn get_price(&self, ctx: &Context) -> Result<FixedPoint> {
        Ok(self.valuation(ctx)?.price)
    }

    /// Synthetic tokens `collateral` buys at the current price, before fees
    pub fn collateral_to_synth(&self, ctx: &Context, collateral: u128) -> Result<u128> {
        self.valuation(ctx)?.collateral_to_synth(collateral)
    }

    /// Collateral value of `tokens` at the current price
    pub fn synth_to_collateral(&self, ctx: &Context, tokens: u128) -> Result<u128> {
        self.valuation(ctx)?.synth_to_collateral(tokens)
    }

    /// Whether the position meets the collateral requirement
    pub fn is_overcollateralized(&self, ctx: &Context) -> Result<bool> {
        self.valuation(ctx)?.is_overcollateralized(
            self.ledger.total_collateral_amount,
            self.ledger.total_synthetic_tokens,
            self.params.collateral_requirement,
        )
    }

    /// Position snapshot at the current price
    pub fn position_info(&self, ctx: &Context) -> Result<PositionInfo> {
        let valuation = self.valuation(ctx)?;
        let required_collateral = valuation.required_collateral(
            self.ledger.total_synthetic_tokens,
            self.params.collateral_requirement,
        )?;
        Ok(PositionInfo {
            total_collateral: self.ledger.total_collateral_amount,
            total_synthetic_tokens: self.ledger.total_synthetic_tokens,
            available_liquidity: self.ledger.total_available_liquidity,
            total_fees: self.ledger.total_fee_amount,
            price: valuation.price,
            required_collateral,
            is_overcollateralized: self.ledger.total_collateral_amount >= required_collateral,
        })
    }

    /// Collateral actually held for the pool: its own balance plus what the
    /// market holds against its attributed position
    pub fn custody_balance(&self, ctx: &Context) -> Result<u128> {
        let own = ctx.tokens.balance_of(&self.collateral_token, &self.address);
        let lent = ctx
            .lending
            .backed_collateral(&ctx.lending_storage, &ctx.markets, self.address)?;
        safe_add(own, lent)
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // USER OPERATIONS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Mint synthetic tokens against collateral
    pub fn mint(
        &mut self,
        ctx: &mut Context,
        sender: Address,
        params: MintParams,
    ) -> Result<MintOutcome> {
        self.ensure_active()?;
        validate_non_zero(params.collateral_amount)?;
        validate_expiration(params.expiration, ctx.now)?;

        let valuation = self.valuation(ctx)?;
        let plan = self.ledger.plan_mint(
            params.collateral_amount,
            Some(&self.params.fee),
            &valuation,
            self.params.over_collateralization,
        )?;
        if plan.num_tokens < params.min_num_tokens {
            return Err(Error::SlippageExceeded {
                minimum: params.min_num_tokens,
                actual: plan.num_tokens,
            });
        }
        let shares = self.params.fee.distribute(plan.fee)?;
        self.ledger.apply_mint(&plan)?;
        self.ledger.credit_fees(&shares)?;

        ctx.tokens.transfer(
            &self.collateral_token,
            sender,
            self.address,
            params.collateral_amount,
        )?;
        self.deposit_to_lending(ctx, plan.net_collateral)?;
        ctx.tokens.mint(
            &self.synthetic_token,
            self.address,
            params.recipient,
            plan.num_tokens,
        )?;

        ctx.emit(
            self.address,
            Event::Mint {
                account: sender,
                collateral_sent: params.collateral_amount,
                num_tokens_received: plan.num_tokens,
                fee_paid: plan.fee,
                recipient: params.recipient,
            },
        );
        tracing::info!(pool = %self.address, tokens = plan.num_tokens, fee = plan.fee, "mint");
        Ok(MintOutcome {
            num_tokens: plan.num_tokens,
            fee_paid: plan.fee,
        })
    }

    /// Burn synthetic tokens for collateral
    pub fn redeem(
        &mut self,
        ctx: &mut Context,
        sender: Address,
        params: RedeemParams,
    ) -> Result<RedeemOutcome> {
        self.ensure_active()?;
        validate_non_zero(params.num_tokens)?;
        validate_expiration(params.expiration, ctx.now)?;

        let valuation = self.valuation(ctx)?;
        let plan = self.plan_burn(&valuation, params.num_tokens)?;
        if plan.net_collateral < params.min_collateral {
            return Err(Error::SlippageExceeded {
                minimum: params.min_collateral,
                actual: plan.net_collateral,
            });
        }
        self.apply_burn(ctx, sender, &plan)?;
        ctx.tokens.transfer(
            &self.collateral_token,
            self.address,
            params.recipient,
            plan.net_collateral,
        )?;

        ctx.emit(
            self.address,
            Event::Redeem {
                account: sender,
                num_tokens_sent: params.num_tokens,
                collateral_received: plan.net_collateral,
                fee_paid: plan.fee,
                recipient: params.recipient,
            },
        );
        tracing::info!(pool = %self.address, collateral = plan.net_collateral, fee = plan.fee, "redeem");
        Ok(RedeemOutcome {
            collateral_amount: plan.net_collateral,
            fee_paid: plan.fee,
        })
    }

    /// Swap this pool's synthetic for `dest`'s synthetic through the shared collateral
    pub fn exchange(
        &mut self,
        ctx: &mut Context,
        dest: &mut Pool,
        sender: Address,
        params: ExchangeParams,
    ) -> Result<ExchangeOutcome> {
        if dest.address == self.address || params.dest_pool != dest.address {
            return Err(Error::ConfigMismatch("destination must be another pool".into()));
        }
        if dest.registry != self.registry {
            return Err(Error::ConfigMismatch("pools use different registries".into()));
        }
        if dest.collateral_token != self.collateral_token {
            return Err(Error::ConfigMismatch("pools use different collaterals".into()));
        }
        self.ensure_active()?;
        dest.ensure_active()?;
        validate_non_zero(params.num_tokens)?;
        validate_expiration(params.expiration, ctx.now)?;

        let valuation = self.valuation(ctx)?;
        let plan = self.plan_burn(&valuation, params.num_tokens)?;
        self.apply_burn(ctx, sender, &plan)?;
        ctx.tokens.transfer(
            &self.collateral_token,
            self.address,
            dest.address,
            plan.net_collateral,
        )?;
        let dest_num_tokens = dest.exchange_mint(
            ctx,
            self.address,
            plan.net_collateral,
            params.recipient,
            params.min_dest_num_tokens,
        )?;

        ctx.emit(
            self.address,
            Event::Exchange {
                account: sender,
                dest_pool: dest.address,
                num_tokens_sent: params.num_tokens,
                dest_num_tokens_received: dest_num_tokens,
                fee_paid: plan.fee,
                recipient: params.recipient,
            },
        );
        tracing::info!(
            pool = %self.address,
            dest = %dest.address,
            tokens = dest_num_tokens,
            "exchange"
        );
        Ok(ExchangeOutcome {
            dest_num_tokens,
            fee_paid: plan.fee,
        })
    }

    /// Destination leg of an exchange: mint without fee against collateral already received
    fn exchange_mint(
        &mut self,
        ctx: &mut Context,
        source: Address,
        collateral_amount: u128,
        recipient: Address,
        min_num_tokens: u128,
    ) -> Result<u128> {
        let valuation = self.valuation(ctx)?;
        let plan = self.ledger.plan_mint(
            collateral_amount,
            None,
            &valuation,
            self.params.over_collateralization,
        )?;
        if plan.num_tokens < min_num_tokens {
            return Err(Error::SlippageExceeded {
                minimum: min_num_tokens,
                actual: plan.num_tokens,
            });
        }
        self.ledger.apply_mint(&plan)?;
        self.deposit_to_lending(ctx, plan.net_collateral)?;
        ctx.tokens
            .mint(&self.synthetic_token, self.address, recipient, plan.num_tokens)?;
        tracing::debug!(pool = %self.address, %source, tokens = plan.num_tokens, "exchange mint");
        Ok(plan.num_tokens)
    }

    /// Claim the caller's unclaimed fees
    pub fn claim_fee(&mut self, ctx: &mut Context, sender: Address) -> Result<u128> {
        let amount = self.ledger.take_fee(&sender)?;
        ctx.tokens
            .transfer(&self.collateral_token, self.address, sender, amount)?;
        ctx.emit(
            self.address,
            Event::ClaimFee {
                claimer: sender,
                fee_amount: amount,
                total_remaining_fees: self.ledger.total_fee_amount,
            },
        );
        Ok(amount)
    }

    /// Liquidate up to `num_tokens` of an undercollateralized position
    pub fn liquidate(
        &mut self,
        ctx: &mut Context,
        sender: Address,
        num_tokens: u128,
    ) -> Result<LiquidationPlan> {
        self.ensure_active()?;
        let valuation = self.valuation(ctx)?;
        let plan = calculate_liquidation(
            &self.ledger,
            num_tokens,
            &valuation,
            self.params.collateral_requirement,
            self.params.liquidation_reward,
        )?;
        self.ledger
            .release(plan.tokens_liquidated, plan.collateral_received)?;

        ctx.tokens.burn(
            &self.synthetic_token,
            self.address,
            sender,
            plan.tokens_liquidated,
        )?;
        self.withdraw_from_lending(ctx, plan.collateral_received, sender)?;

        ctx.emit(
            self.address,
            Event::Liquidate {
                liquidator: sender,
                tokens_liquidated: plan.tokens_liquidated,
                price: valuation.price,
                collateral_expected: plan.collateral_expected,
                collateral_received: plan.collateral_received,
                reward_received: plan.reward,
            },
        );
        tracing::info!(
            pool = %self.address,
            tokens = plan.tokens_liquidated,
            received = plan.collateral_received,
            capitalized = plan.is_capitalized(),
            "liquidation"
        );
        Ok(plan)
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // LIQUIDITY PROVIDER OPERATIONS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Add free liquidity
    pub fn add_liquidity(&mut self, ctx: &mut Context, sender: Address, amount: u128) -> Result<()> {
        self.only_liquidity_provider(sender)?;
        self.ensure_active()?;
        validate_non_zero(amount)?;
        self.ledger.add_liquidity(amount)?;

        ctx.tokens
            .transfer(&self.collateral_token, sender, self.address, amount)?;
        self.deposit_to_lending(ctx, amount)?;
        ctx.emit(
            self.address,
            Event::AddLiquidity {
                lp: sender,
                amount,
                available: self.ledger.total_available_liquidity,
            },
        );
        Ok(())
    }

    /// Withdraw free liquidity
    pub fn withdraw_liquidity(
        &mut self,
        ctx: &mut Context,
        sender: Address,
        amount: u128,
    ) -> Result<()> {
        self.only_liquidity_provider(sender)?;
        self.ensure_active()?;
        validate_non_zero(amount)?;
        self.ledger.remove_liquidity(amount)?;

        self.withdraw_from_lending(ctx, amount, sender)?;
        ctx.emit(
            self.address,
            Event::WithdrawLiquidity {
                lp: sender,
                amount,
                available: self.ledger.total_available_liquidity,
            },
        );
        Ok(())
    }

    /// Move collateral into the position, optionally pulling `transfer` from the LP first
    pub fn increase_collateral(
        &mut self,
        ctx: &mut Context,
        sender: Address,
        collateral_to_transfer: u128,
        collateral_to_increase: u128,
    ) -> Result<u128> {
        self.only_liquidity_provider(sender)?;
        self.ensure_active()?;
        validate_non_zero(collateral_to_increase)?;
        self.ledger
            .increase_collateral(collateral_to_transfer, collateral_to_increase)?;

        ctx.tokens.transfer(
            &self.collateral_token,
            sender,
            self.address,
            collateral_to_transfer,
        )?;
        self.deposit_to_lending(ctx, collateral_to_transfer)?;
        ctx.emit(
            self.address,
            Event::IncreaseCollateral {
                lp: sender,
                collateral_transferred: collateral_to_transfer,
                collateral_increased: collateral_to_increase,
                total_collateral: self.ledger.total_collateral_amount,
            },
        );
        Ok(self.ledger.total_collateral_amount)
    }

    /// Move collateral out of the position, optionally sending `withdraw` to the LP
    pub fn decrease_collateral(
        &mut self,
        ctx: &mut Context,
        sender: Address,
        collateral_to_decrease: u128,
        collateral_to_withdraw: u128,
    ) -> Result<u128> {
        self.only_liquidity_provider(sender)?;
        self.ensure_active()?;
        validate_non_zero(collateral_to_decrease)?;
        if collateral_to_decrease > self.ledger.total_collateral_amount {
            return Err(Error::InvalidParameter {
                name: "collateral_to_decrease".into(),
                reason: "exceeds the position collateral".into(),
            });
        }
        let remaining = self.ledger.total_collateral_amount - collateral_to_decrease;
        let valuation = self.valuation(ctx)?;
        if !valuation.is_overcollateralized(
            remaining,
            self.ledger.total_synthetic_tokens,
            self.params.collateral_requirement,
        )? {
            return Err(Error::PositionUndercollateralized);
        }
        self.ledger
            .decrease_collateral(collateral_to_decrease, collateral_to_withdraw)?;

        self.withdraw_from_lending(ctx, collateral_to_withdraw, sender)?;
        ctx.emit(
            self.address,
            Event::DecreaseCollateral {
                lp: sender,
                collateral_decreased: collateral_to_decrease,
                collateral_withdrawn: collateral_to_withdraw,
                total_collateral: self.ledger.total_collateral_amount,
            },
        );
        Ok(self.ledger.total_collateral_amount)
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // EMERGENCY SHUTDOWN
    // ═══════════════════════════════════════════════════════════════════════════

    /// Freeze the pool at the current price; manager only, once
    pub fn emergency_shutdown(&mut self, ctx: &mut Context, sender: Address) -> Result<FixedPoint> {
        ctx.registry.ensure(RegistryKey::Manager, sender)?;
        self.ensure_active()?;
        let price = self.get_price(ctx)?;
        self.ledger.fold_liquidity()?;
        self.state = PoolState::ShutDown {
            timestamp: ctx.now,
            settlement_price: price,
        };
        ctx.emit(
            self.address,
            Event::EmergencyShutdown {
                timestamp: ctx.now,
                price,
            },
        );
        tracing::warn!(pool = %self.address, price = %price, "emergency shutdown");
        Ok(price)
    }

    /// Settle the caller's tokens, and the LP residual when called by the LP
    pub fn settle_emergency_shutdown(
        &mut self,
        ctx: &mut Context,
        sender: Address,
    ) -> Result<SettlementPlan> {
        let settlement_price = match self.state {
            PoolState::ShutDown {
                settlement_price, ..
            } => settlement_price,
            PoolState::Active => return Err(Error::NotShutDown),
        };
        let valuation = Valuation::new(settlement_price, self.collateral_decimals)?;
        let balance = ctx.tokens.balance_of(&self.synthetic_token, &sender);
        let plan = calculate_settlement(
            &self.ledger,
            balance,
            &valuation,
            sender == self.roles.liquidity_provider,
        )?;
        if plan.is_empty() {
            return Ok(plan);
        }
        let payout = plan.total_collateral();
        self.ledger.release(plan.tokens_settled, payout)?;

        ctx.tokens
            .burn(&self.synthetic_token, self.address, sender, plan.tokens_settled)?;
        self.withdraw_from_lending(ctx, payout, sender)?;
        ctx.emit(
            self.address,
            Event::Settle {
                account: sender,
                num_tokens_settled: plan.tokens_settled,
                collateral_expected: plan.collateral_expected,
                collateral_settled: payout,
            },
        );
        tracing::info!(pool = %self.address, account = %sender, payout, "settled");
        Ok(plan)
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // LENDING
    // ═══════════════════════════════════════════════════════════════════════════

    /// Realize lending interest without moving collateral
    pub fn update_accumulated_interest(&mut self, ctx: &mut Context) -> Result<ReturnValues> {
        let values = {
            let (proxy, mut env) = ctx.lending_env();
            proxy.update_accumulated_interest(&mut env, self.address)?
        };
        self.credit_interest(ctx, values.pool_interest, values.dao_interest)?;
        self.absorb_rounding_loss(values.rounding_loss)?;
        Ok(values)
    }

    /// Move the pool's collateral to another lending module
    pub fn migrate_lending_module(
        &mut self,
        ctx: &mut Context,
        sender: Address,
        module_id: &str,
        interest_bearing_token: Option<Address>,
    ) -> Result<MigrateReturnValues> {
        self.only_maintainer(sender)?;
        let values = {
            let (proxy, mut env) = ctx.lending_env();
            proxy.migrate_lending_module(&mut env, self.address, module_id, interest_bearing_token)?
        };
        self.credit_interest(ctx, values.pool_interest, 0)?;
        self.absorb_rounding_loss(values.rounding_loss)?;
        Ok(values)
    }

    /// Credit realized interest; liquidity while active, the position once shut down
    pub fn credit_interest(
        &mut self,
        ctx: &mut Context,
        pool_interest: u128,
        dao_interest: u128,
    ) -> Result<()> {
        if pool_interest == 0 && dao_interest == 0 {
            return Ok(());
        }
        if self.state.is_shut_down() {
            self.ledger.total_collateral_amount =
                safe_add(self.ledger.total_collateral_amount, pool_interest)?;
        } else {
            self.ledger.add_liquidity(pool_interest)?;
        }
        ctx.emit(
            self.address,
            Event::InterestCredited {
                pool_interest,
                dao_interest,
            },
        );
        tracing::debug!(pool = %self.address, pool_interest, dao_interest, "interest credited");
        Ok(())
    }

    /// Take collateral lost to market rounding off the ledger
    pub fn absorb_rounding_loss(&mut self, loss: u128) -> Result<()> {
        if loss == 0 {
            return Ok(());
        }
        self.ledger.write_off(loss)?;
        tracing::debug!(pool = %self.address, loss, "rounding loss absorbed");
        Ok(())
    }

    fn deposit_to_lending(&mut self, ctx: &mut Context, amount: u128) -> Result<()> {
        if amount == 0 {
            return Ok(());
        }
        let values = {
            let (proxy, mut env) = ctx.lending_env();
            proxy.deposit(&mut env, self.address, amount)?
        };
        self.credit_interest(ctx, values.pool_interest, values.dao_interest)?;
        self.absorb_rounding_loss(values.rounding_loss)
    }

    fn withdraw_from_lending(
        &mut self,
        ctx: &mut Context,
        amount: u128,
        recipient: Address,
    ) -> Result<()> {
        if amount == 0 {
            return Ok(());
        }
        let values = {
            let (proxy, mut env) = ctx.lending_env();
            proxy.withdraw(&mut env, self.address, amount, recipient)?
        };
        self.credit_interest(ctx, values.pool_interest, values.dao_interest)?;
        self.absorb_rounding_loss(values.rounding_loss)
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // SETTERS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Change the fee percentage
    pub fn set_fee_percentage(
        &mut self,
        ctx: &mut Context,
        sender: Address,
        fee_percentage: FixedPoint,
    ) -> Result<()> {
        self.only_maintainer(sender)?;
        self.ensure_active()?;
        validate_fee_percentage(fee_percentage)?;
        self.params.fee.fee_percentage = fee_percentage;
        ctx.emit(self.address, Event::SetFeePercentage { fee_percentage });
        Ok(())
    }

    /// Replace the fee recipients
    pub fn set_fee_recipients(
        &mut self,
        ctx: &mut Context,
        sender: Address,
        recipients: Vec<Address>,
        proportions: Vec<u128>,
    ) -> Result<()> {
        self.only_maintainer(sender)?;
        self.ensure_active()?;
        FeeConfig::validate_recipients(&recipients, &proportions)?;
        self.params.fee.recipients = recipients.clone();
        self.params.fee.proportions = proportions.clone();
        ctx.emit(
            self.address,
            Event::SetFeeRecipients {
                recipients,
                proportions,
            },
        );
        Ok(())
    }

    /// Change the over-collateralization
    pub fn set_over_collateralization(
        &mut self,
        ctx: &mut Context,
        sender: Address,
        over_collateralization: FixedPoint,
    ) -> Result<()> {
        self.only_maintainer(sender)?;
        self.ensure_active()?;
        validate_over_collateralization(over_collateralization, self.params.collateral_requirement)?;
        self.params.over_collateralization = over_collateralization;
        ctx.emit(
            self.address,
            Event::SetOverCollateralization {
                over_collateralization,
            },
        );
        Ok(())
    }

    /// Change the liquidation reward
    pub fn set_liquidation_reward(
        &mut self,
        ctx: &mut Context,
        sender: Address,
        liquidation_reward: FixedPoint,
    ) -> Result<()> {
        self.only_maintainer(sender)?;
        self.ensure_active()?;
        validate_liquidation_reward(liquidation_reward)?;
        self.params.liquidation_reward = liquidation_reward;
        ctx.emit(
            self.address,
            Event::SetLiquidationReward { liquidation_reward },
        );
        Ok(())
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // INTERNALS
    // ═══════════════════════════════════════════════════════════════════════════

    fn ensure_active(&self) -> Result<()> {
        if self.state.is_shut_down() {
            return Err(Error::AlreadyShutDown);
        }
        Ok(())
    }

    fn only_liquidity_provider(&self, sender: Address) -> Result<()> {
        if sender != self.roles.liquidity_provider {
            return Err(Error::SenderMustBeLP);
        }
        Ok(())
    }

    fn only_maintainer(&self, sender: Address) -> Result<()> {
        if sender != self.roles.maintainer {
            return Err(Error::SenderMustBeMaintainer);
        }
        Ok(())
    }

    /// Plan a token burn that releases collateral, checking what remains
    fn plan_burn(&self, valuation: &Valuation, num_tokens: u128) -> Result<RedeemPlan> {
        let plan = self.ledger.plan_redeem(
            num_tokens,
            &self.params.fee,
            self.params.over_collateralization,
        )?;
        let remaining_tokens = self.ledger.total_synthetic_tokens - num_tokens;
        if remaining_tokens > 0 {
            let remaining_collateral =
                self.ledger.total_collateral_amount - plan.gross_collateral;
            if !valuation.is_overcollateralized(
                remaining_collateral,
                remaining_tokens,
                self.params.collateral_requirement,
            )? {
                return Err(Error::PositionUndercapitalized);
            }
        }
        Ok(plan)
    }

    /// Commit a burn: ledger first, then tokens, then pull the user part into custody
    fn apply_burn(&mut self, ctx: &mut Context, sender: Address, plan: &RedeemPlan) -> Result<()> {
        let shares = self.params.fee.distribute(plan.fee)?;
        self.ledger.apply_redeem(plan)?;
        self.ledger.credit_fees(&shares)?;

        ctx.tokens
            .burn(&self.synthetic_token, self.address, sender, plan.num_tokens)?;
        self.withdraw_from_lending(ctx, plan.collateral_amount, self.address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::LendingConfig;
    use crate::core::config::ProtocolConfig;
    use crate::core::registry::Registry;
    use crate::lending::aave::AaveModule;
    use crate::lending::manager::{LendingManager, LendingRoles};
    use crate::lending::market::{MarketKind, MoneyMarket};
    use crate::lending::module::LendingModuleKind;
    use crate::lending::storage::LendingStorageManager;
    use crate::oracle::price_feed::ManualPriceFeed;
    use std::sync::Arc;

    const TOKEN: u128 = FixedPoint::SCALE;

    struct Setup {
        ctx: Context,
        feed: Arc<ManualPriceFeed>,
        pool: Pool,
        maintainer: Address,
        lp: Address,
        user: Address,
        usdc: Address,
        synth: Address,
    }

    fn setup() -> Setup {
        let maintainer = Address::derive("maintainer");
        let lp = Address::derive("lp");
        let user = Address::derive("user");
        let factory = Address::derive("factory");
        let proxy = Address::derive("proxy");

        let mut registry = Registry::new(Address::derive("registry"), maintainer);
        for (key, address) in [
            (RegistryKey::PoolFactory, factory),
            (RegistryKey::LendingProxy, proxy),
            (RegistryKey::PriceFeed, Address::derive("feed")),
            (RegistryKey::Manager, maintainer),
        ] {
            registry
                .change_implementation_address(maintainer, key, address)
                .unwrap();
        }
        let feed = Arc::new(ManualPriceFeed::new(maintainer));
        feed.set_price(maintainer, "EUR/USD", "1.2".parse().unwrap(), 0)
            .unwrap();

        let mut lending = LendingManager::new(
            proxy,
            LendingRoles {
                admin: maintainer,
                maintainer,
            },
        );
        lending
            .set_lending_module(maintainer, "aave", LendingModuleKind::Aave(AaveModule::new()))
            .unwrap();
        let mut ctx = Context::new(
            &ProtocolConfig::default(),
            registry.clone(),
            feed.clone(),
            lending,
            LendingStorageManager::new(Address::derive("storage")),
        );

        let usdc = ctx
            .tokens
            .create_token(Address::derive("USDC"), "USD Coin", "USDC", 6, Address::ZERO, true)
            .unwrap();
        let synth = ctx
            .tokens
            .create_token(Address::derive("jEUR"), "Jarvis EUR", "jEUR", 18, maintainer, false)
            .unwrap();
        let a_usdc = ctx
            .markets
            .insert(MoneyMarket::new(Address::derive("aUSDC"), "aUSDC", usdc, MarketKind::Rebasing))
            .unwrap();

        let config = PoolConfig {
            price_identifier: "EUR/USD".into(),
            collateral_token: usdc,
            synthetic_token: synth,
            roles: PoolRoles {
                admin: maintainer,
                maintainer,
                liquidity_provider: lp,
            },
            params: PoolParams::default().with_fee(FeeConfig::new(
                FixedPoint::from_bps(20),
                vec![lp, Address::derive("dao")],
                vec![50, 50],
            )),
            lending: LendingConfig {
                module_id: "aave".into(),
                interest_bearing_token: Some(a_usdc),
                dao_interest_share: FixedPoint::from_percentage(40),
                jrt_buyback_share: FixedPoint::from_percentage(50),
            },
        };
        let pool_address = Address::derive("pool");
        let pool = Pool::new(pool_address, registry.address(), &config, 6).unwrap();
        ctx.tokens.add_minter(&synth, maintainer, pool_address).unwrap();
        ctx.lending_storage
            .set_pool_storage(
                &registry,
                factory,
                "aave",
                pool_address,
                usdc,
                a_usdc,
                config.lending.dao_interest_share,
                config.lending.jrt_buyback_share,
            )
            .unwrap();

        ctx.tokens.mint(&usdc, lp, lp, 1_000_000_000).unwrap();
        ctx.tokens.mint(&usdc, user, user, 1_000_000_000).unwrap();

        Setup {
            ctx,
            feed,
            pool,
            maintainer,
            lp,
            user,
            usdc,
            synth,
        }
    }

    fn mint_params(s: &Setup, amount: u128) -> MintParams {
        MintParams {
            min_num_tokens: 0,
            collateral_amount: amount,
            expiration: s.ctx.now + 60,
            recipient: s.user,
        }
    }

    fn assert_custody(s: &Setup) {
        assert_eq!(
            s.pool.custody_balance(&s.ctx).unwrap(),
            s.pool.ledger().custody_requirement().unwrap()
        );
    }

    fn funded() -> Setup {
        let mut s = setup();
        let lp = s.lp;
        s.pool.add_liquidity(&mut s.ctx, lp, 50_000_000).unwrap();
        let params = mint_params(&s, 120_240_480);
        let user = s.user;
        s.pool.mint(&mut s.ctx, user, params).unwrap();
        s
    }

    #[test]
    fn test_mint_scenario() {
        let s = funded();
        let ledger = s.pool.ledger();
        assert_eq!(ledger.total_synthetic_tokens, 100 * TOKEN);
        assert_eq!(ledger.total_collateral_amount, 150_000_000);
        assert_eq!(ledger.total_available_liquidity, 20_000_000);
        assert_eq!(ledger.user_fee(&s.lp), 120_240);
        assert_eq!(ledger.total_fee_amount, 240_480);
        assert_eq!(s.ctx.tokens.balance_of(&s.synth, &s.user), 100 * TOKEN);
        assert_custody(&s);
    }

    #[test]
    fn test_mint_guards() {
        let mut s = setup();
        let user = s.user;
        let mut params = mint_params(&s, 1_000_000);
        assert!(matches!(
            s.pool.mint(&mut s.ctx, user, params),
            Err(Error::InsufficientLiquidity { .. })
        ));
        params.expiration = 0;
        s.ctx.now = 10;
        assert!(matches!(
            s.pool.mint(&mut s.ctx, user, params),
            Err(Error::TransactionExpired { .. })
        ));
        params.collateral_amount = 0;
        assert!(matches!(
            s.pool.mint(&mut s.ctx, user, params),
            Err(Error::ZeroAmount)
        ));
    }

    #[test]
    fn test_redeem_all() {
        let mut s = funded();
        let user = s.user;
        let before = s.ctx.tokens.balance_of(&s.usdc, &user);
        let out = s
            .pool
            .redeem(
                &mut s.ctx,
                user,
                RedeemParams {
                    num_tokens: 100 * TOKEN,
                    min_collateral: 119_760_000,
                    expiration: 60,
                    recipient: user,
                },
            )
            .unwrap();
        assert_eq!(out.collateral_amount, 119_760_000);
        assert_eq!(out.fee_paid, 240_000);
        assert_eq!(s.ctx.tokens.balance_of(&s.usdc, &user) - before, 119_760_000);
        assert_eq!(s.pool.ledger().total_collateral_amount, 0);
        assert_eq!(s.pool.ledger().total_available_liquidity, 50_000_000);
        assert_custody(&s);
    }

    #[test]
    fn test_redeem_blocked_when_remaining_position_short() {
        let mut s = funded();
        let maintainer = s.maintainer;
        s.feed
            .set_price(maintainer, "EUR/USD", "1.45".parse().unwrap(), 0)
            .unwrap();
        let user = s.user;
        let err = s
            .pool
            .redeem(
                &mut s.ctx,
                user,
                RedeemParams {
                    num_tokens: 10 * TOKEN,
                    min_collateral: 0,
                    expiration: 60,
                    recipient: user,
                },
            )
            .unwrap_err();
        assert!(matches!(err, Error::PositionUndercapitalized));
    }

    #[test]
    fn test_lp_collateral_management() {
        let mut s = funded();
        let lp = s.lp;
        let user = s.user;
        assert!(matches!(
            s.pool.withdraw_liquidity(&mut s.ctx, user, 1),
            Err(Error::SenderMustBeLP)
        ));
        assert_eq!(
            s.pool.increase_collateral(&mut s.ctx, lp, 5_000_000, 10_000_000).unwrap(),
            160_000_000
        );
        assert_eq!(s.pool.ledger().total_available_liquidity, 15_000_000);

        assert!(matches!(
            s.pool.decrease_collateral(&mut s.ctx, lp, 40_000_000, 0),
            Err(Error::PositionUndercollateralized)
        ));
        s.pool.decrease_collateral(&mut s.ctx, lp, 10_000_000, 25_000_000).unwrap();
        assert_eq!(s.pool.ledger().total_available_liquidity, 0);
        assert_custody(&s);
    }

    #[test]
    fn test_claim_fee() {
        let mut s = funded();
        let lp = s.lp;
        let before = s.ctx.tokens.balance_of(&s.usdc, &lp);
        assert_eq!(s.pool.claim_fee(&mut s.ctx, lp).unwrap(), 120_240);
        assert_eq!(s.ctx.tokens.balance_of(&s.usdc, &lp) - before, 120_240);
        assert!(matches!(s.pool.claim_fee(&mut s.ctx, lp), Err(Error::NoFeeToClaim)));
        assert_custody(&s);
    }

    #[test]
    fn test_shutdown_and_settle() {
        let mut s = funded();
        let maintainer = s.maintainer;
        let user = s.user;
        let lp = s.lp;
        assert!(matches!(
            s.pool.settle_emergency_shutdown(&mut s.ctx, user),
            Err(Error::NotShutDown)
        ));
        assert!(matches!(
            s.pool.emergency_shutdown(&mut s.ctx, user),
            Err(Error::NotAllowed(_))
        ));
        s.pool.emergency_shutdown(&mut s.ctx, maintainer).unwrap();
        assert!(matches!(
            s.pool.emergency_shutdown(&mut s.ctx, maintainer),
            Err(Error::AlreadyShutDown)
        ));
        let params = mint_params(&s, 1);
        assert!(matches!(
            s.pool.mint(&mut s.ctx, user, params),
            Err(Error::AlreadyShutDown)
        ));

        let settled = s.pool.settle_emergency_shutdown(&mut s.ctx, user).unwrap();
        assert_eq!(settled.user_collateral, 120_000_000);
        let lp_settled = s.pool.settle_emergency_shutdown(&mut s.ctx, lp).unwrap();
        assert_eq!(lp_settled.lp_collateral, 50_000_000);
        assert!(s
            .pool
            .settle_emergency_shutdown(&mut s.ctx, user)
            .unwrap()
            .is_empty());
        assert_eq!(s.pool.ledger().total_synthetic_tokens, 0);
        assert_custody(&s);
    }

    #[test]
    fn test_setters_are_maintainer_only() {
        let mut s = setup();
        let maintainer = s.maintainer;
        let user = s.user;
        assert!(matches!(
            s.pool.set_fee_percentage(&mut s.ctx, user, FixedPoint::ZERO),
            Err(Error::SenderMustBeMaintainer)
        ));
        assert!(s
            .pool
            .set_fee_percentage(&mut s.ctx, maintainer, FixedPoint::ONE)
            .is_err());
        assert!(matches!(
            s.pool
                .set_fee_recipients(&mut s.ctx, maintainer, vec![user], vec![1, 2]),
            Err(Error::ArrayLengthMismatch { .. })
        ));
        assert!(s
            .pool
            .set_over_collateralization(&mut s.ctx, maintainer, FixedPoint::from_percentage(5))
            .is_err());
        s.pool
            .set_liquidation_reward(&mut s.ctx, maintainer, FixedPoint::from_percentage(50))
            .unwrap();
        assert_eq!(s.pool.params().liquidation_reward, FixedPoint::from_percentage(50));
        assert_eq!(s.ctx.events.filter_by_type("SetLiquidationReward").len(), 1);
    }
}
