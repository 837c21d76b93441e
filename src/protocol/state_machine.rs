//! Protocol orchestrator.
//!
//! [`Protocol`] owns the shared [`Context`], every deployed pool and the
//! forwarder. It is the only entry point that mutates them:
//! - Every public operation runs atomically: context and pools are restored
//!   on any error
//! - A pool is checked out of the pool map while it runs, so a nested entry
//!   into the same pool fails with `ReentrantCall`
//! - Raw calldata from the trusted forwarder carries the real sender in its
//!   last 20 bytes
//!
//! Forwarder nonces live outside the atomic snapshot: a relayed call that
//! fails still consumes its nonce.

use std::collections::{BTreeMap, BTreeSet};

use crate::core::config::{PoolConfig, ProtocolConfig};
use crate::core::context::Context;
use crate::core::registry::RegistryKey;
use crate::error::{Error, Result};
use crate::forwarder::eip712::ForwardRequest;
use crate::forwarder::forwarder::Forwarder;
use crate::lending::manager::{AccumulatedInterest, InterestSplit, MigrateReturnValues, ReturnValues};
use crate::lending::market::MoneyMarket;
use crate::lending::module::{LendingModule, LendingModuleKind};
use crate::lending::swap::FixedRateSwap;
use crate::liquidation::engine::LiquidationPlan;
use crate::liquidation::settlement::SettlementPlan;
use crate::pool::pool::{
    ExchangeOutcome, ExchangeParams, MintOutcome, MintParams, Pool, PositionInfo, RedeemOutcome,
    RedeemParams,
};
use crate::protocol::events::{Event, EventLog};
use crate::protocol::operations::{CallOutcome, PoolCall};
use crate::utils::constants::{ADDRESS_LENGTH, SELECTOR_LENGTH};
use crate::utils::crypto::{Address, Signature};
use crate::utils::math::FixedPoint;
use crate::utils::validation::validate_decimals;

// ═══════════════════════════════════════════════════════════════════════════════
// PROTOCOL
// ═══════════════════════════════════════════════════════════════════════════════

/// Pools, their shared context and the forwarder
#[derive(Debug)]
pub struct Protocol {
    ctx: Context,
    pools: BTreeMap<Address, Pool>,
    busy: BTreeSet<Address>,
    forwarder: Forwarder,
}

impl Protocol {
    /// Create an orchestrator with no pools
    pub fn new(config: &ProtocolConfig, ctx: Context, forwarder_address: Address) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            ctx,
            pools: BTreeMap::new(),
            busy: BTreeSet::new(),
            forwarder: Forwarder::from_config(forwarder_address, config),
        })
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // ACCESSORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Shared context
    pub fn ctx(&self) -> &Context {
        &self.ctx
    }

    /// Emitted events
    pub fn events(&self) -> &EventLog {
        &self.ctx.events
    }

    /// The forwarder
    pub fn forwarder(&self) -> &Forwarder {
        &self.forwarder
    }

    /// A deployed pool
    pub fn pool(&self, address: &Address) -> Result<&Pool> {
        self.pools
            .get(address)
            .ok_or_else(|| Error::PoolNotFound(address.to_hex()))
    }

    /// Addresses of all deployed pools
    pub fn pool_addresses(&self) -> Vec<Address> {
        self.pools.keys().copied().collect()
    }

    /// Token balance
    pub fn balance_of(&self, token: &Address, account: &Address) -> u128 {
        self.ctx.tokens.balance_of(token, account)
    }

    /// Position snapshot of a pool
    pub fn position_info(&self, pool: &Address) -> Result<PositionInfo> {
        self.pool(pool)?.position_info(&self.ctx)
    }

    /// Whether the pool's custody equals its ledger obligations
    pub fn custody_matches(&self, pool: &Address) -> Result<bool> {
        let pool = self.pool(pool)?;
        Ok(pool.custody_balance(&self.ctx)? == pool.ledger().custody_requirement()?)
    }

    /// Pending lending interest of a pool
    pub fn get_accumulated_interest(&self, pool: &Address) -> Result<AccumulatedInterest> {
        self.ctx
            .lending
            .get_accumulated_interest(&self.ctx.lending_storage, &self.ctx.markets, *pool)
    }

    /// Set the engine time
    pub fn set_time(&mut self, now: u64) {
        self.ctx.now = now;
    }

    /// Advance the engine time
    pub fn advance_time(&mut self, seconds: u64) {
        self.ctx.now = self.ctx.now.saturating_add(seconds);
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // ENVIRONMENT
    // ═══════════════════════════════════════════════════════════════════════════

    /// Register a new token
    pub fn create_token(
        &mut self,
        address: Address,
        name: &str,
        symbol: &str,
        decimals: u8,
        admin: Address,
        faucet: bool,
    ) -> Result<Address> {
        self.ctx
            .tokens
            .create_token(address, name, symbol, decimals, admin, faucet)
    }

    /// List a new money market
    pub fn add_market(&mut self, market: MoneyMarket) -> Result<Address> {
        self.ctx.markets.insert(market)
    }

    /// Mint a faucet token; tokens with minter roles are rejected
    pub fn faucet(&mut self, token: &Address, to: Address, amount: u128) -> Result<()> {
        self.ctx.tokens.faucet(token, to, amount)
    }

    /// Move tokens held by `sender`
    pub fn transfer(
        &mut self,
        sender: Address,
        token: &Address,
        to: Address,
        amount: u128,
    ) -> Result<()> {
        self.ctx.tokens.transfer(token, sender, to, amount)
    }

    /// Let a market generate interest at `rate`; returns the underlying generated
    pub fn accrue_market(&mut self, market: &Address, rate: FixedPoint) -> Result<u128> {
        let ctx = &mut self.ctx;
        ctx.markets.get_mut(market)?.accrue(&mut ctx.tokens, rate)
    }

    /// Rebind a registry key; sender must be the registry maintainer
    pub fn change_implementation_address(
        &mut self,
        sender: Address,
        key: RegistryKey,
        address: Address,
    ) -> Result<()> {
        self.ctx
            .registry
            .change_implementation_address(sender, key, address)
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // DEPLOYMENT
    // ═══════════════════════════════════════════════════════════════════════════

    /// Deploy a pool at `address`; sender must be the registered pool factory
    /// and admin of the synthetic token
    pub fn deploy_pool(
        &mut self,
        sender: Address,
        address: Address,
        config: PoolConfig,
    ) -> Result<Address> {
        self.atomically(|p| {
            p.ctx.registry.ensure(RegistryKey::PoolFactory, sender)?;
            if p.pools.contains_key(&address) || p.ctx.lending_storage.contains(&address) {
                return Err(Error::AlreadyInitialized(format!("pool {}", address)));
            }
            let collateral = config.collateral_token;
            let synthetic = config.synthetic_token;
            let collateral_decimals = p.ctx.tokens.decimals(&collateral)?;
            validate_decimals(
                &p.ctx.tokens.symbol(&collateral)?,
                collateral_decimals,
                &p.ctx.tokens.symbol(&synthetic)?,
                p.ctx.tokens.decimals(&synthetic)?,
            )?;
            if !p.ctx.price_feed.is_price_supported(&config.price_identifier) {
                return Err(Error::UnsupportedPriceIdentifier(
                    config.price_identifier.clone(),
                ));
            }

            let pool = Pool::new(address, p.ctx.registry.address(), &config, collateral_decimals)?;
            p.ctx.tokens.add_minter(&synthetic, sender, address)?;

            let lending = &config.lending;
            let interest_bearing_token = match lending.interest_bearing_token {
                Some(token) => token,
                None => p
                    .ctx
                    .lending
                    .module(&lending.module_id)?
                    .interest_bearing_token(&p.ctx.markets, collateral)?,
            };
            if p.ctx.markets.get(&interest_bearing_token)?.underlying != collateral {
                return Err(Error::ConfigMismatch(
                    "interest-bearing token does not match pool collateral".into(),
                ));
            }
            p.ctx.lending_storage.set_pool_storage(
                &p.ctx.registry,
                sender,
                &lending.module_id,
                address,
                collateral,
                interest_bearing_token,
                lending.dao_interest_share,
                lending.jrt_buyback_share,
            )?;

            p.pools.insert(address, pool);
            tracing::info!(pool = %address, identifier = %config.price_identifier, "pool deployed");
            Ok(address)
        })
    }

    /// Move a pool, its lending position and its fee custody to a new address
    pub fn migrate_pool(
        &mut self,
        sender: Address,
        old_pool: Address,
        new_pool: Address,
    ) -> Result<()> {
        self.atomically(|p| {
            if p.pools.contains_key(&new_pool) {
                return Err(Error::AlreadyInitialized(format!("pool {}", new_pool)));
            }
            let mut pool = p
                .pools
                .remove(&old_pool)
                .ok_or_else(|| Error::PoolNotFound(old_pool.to_hex()))?;
            {
                let (proxy, mut env) = p.ctx.lending_env();
                proxy.migrate_pool(&mut env, sender, old_pool, new_pool)?;
            }
            let collateral = pool.collateral_token();
            let fees = p.ctx.tokens.balance_of(&collateral, &old_pool);
            p.ctx.tokens.transfer(&collateral, old_pool, new_pool, fees)?;
            p.ctx
                .tokens
                .add_minter(&pool.synthetic_token(), sender, new_pool)?;

            pool.relocate(new_pool);
            p.pools.insert(new_pool, pool);
            tracing::info!(%old_pool, %new_pool, "pool migrated");
            Ok(())
        })
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // POOL OPERATIONS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Execute a pool call atomically
    pub fn execute(&mut self, sender: Address, pool: Address, call: PoolCall) -> Result<CallOutcome> {
        self.atomically(|p| p.run(sender, pool, call))
    }

    /// Execute raw calldata against a pool, returning encoded return data
    pub fn call(&mut self, sender: Address, pool: Address, data: &[u8]) -> Result<Vec<u8>> {
        self.atomically(|p| p.dispatch(sender, pool, data))
    }

    /// Mint synthetic tokens
    pub fn mint(&mut self, sender: Address, pool: Address, params: MintParams) -> Result<MintOutcome> {
        self.atomically(|p| p.with_pool(pool, |pool, ctx| pool.mint(ctx, sender, params)))
    }

    /// Redeem synthetic tokens
    pub fn redeem(
        &mut self,
        sender: Address,
        pool: Address,
        params: RedeemParams,
    ) -> Result<RedeemOutcome> {
        self.atomically(|p| p.with_pool(pool, |pool, ctx| pool.redeem(ctx, sender, params)))
    }

    /// Exchange one pool's synthetic for another's
    pub fn exchange(
        &mut self,
        sender: Address,
        pool: Address,
        params: ExchangeParams,
    ) -> Result<ExchangeOutcome> {
        self.atomically(|p| p.exchange_between(sender, pool, params))
    }

    /// Add LP liquidity
    pub fn add_liquidity(&mut self, sender: Address, pool: Address, amount: u128) -> Result<()> {
        self.atomically(|p| p.with_pool(pool, |pool, ctx| pool.add_liquidity(ctx, sender, amount)))
    }

    /// Withdraw LP liquidity
    pub fn withdraw_liquidity(&mut self, sender: Address, pool: Address, amount: u128) -> Result<()> {
        self.atomically(|p| {
            p.with_pool(pool, |pool, ctx| pool.withdraw_liquidity(ctx, sender, amount))
        })
    }

    /// Move collateral into a pool's position
    pub fn increase_collateral(
        &mut self,
        sender: Address,
        pool: Address,
        collateral_to_transfer: u128,
        collateral_to_increase: u128,
    ) -> Result<u128> {
        self.atomically(|p| {
            p.with_pool(pool, |pool, ctx| {
                pool.increase_collateral(ctx, sender, collateral_to_transfer, collateral_to_increase)
            })
        })
    }

    /// Move collateral out of a pool's position
    pub fn decrease_collateral(
        &mut self,
        sender: Address,
        pool: Address,
        collateral_to_decrease: u128,
        collateral_to_withdraw: u128,
    ) -> Result<u128> {
        self.atomically(|p| {
            p.with_pool(pool, |pool, ctx| {
                pool.decrease_collateral(ctx, sender, collateral_to_decrease, collateral_to_withdraw)
            })
        })
    }

    /// Claim the sender's pool fees
    pub fn claim_fee(&mut self, sender: Address, pool: Address) -> Result<u128> {
        self.atomically(|p| p.with_pool(pool, |pool, ctx| pool.claim_fee(ctx, sender)))
    }

    /// Liquidate a pool's position
    pub fn liquidate(
        &mut self,
        sender: Address,
        pool: Address,
        num_synth_tokens: u128,
    ) -> Result<LiquidationPlan> {
        self.atomically(|p| {
            p.with_pool(pool, |pool, ctx| pool.liquidate(ctx, sender, num_synth_tokens))
        })
    }

    /// Shut a pool down
    pub fn emergency_shutdown(&mut self, sender: Address, pool: Address) -> Result<FixedPoint> {
        self.atomically(|p| p.with_pool(pool, |pool, ctx| pool.emergency_shutdown(ctx, sender)))
    }

    /// Settle after shutdown
    pub fn settle_emergency_shutdown(
        &mut self,
        sender: Address,
        pool: Address,
    ) -> Result<SettlementPlan> {
        self.atomically(|p| {
            p.with_pool(pool, |pool, ctx| pool.settle_emergency_shutdown(ctx, sender))
        })
    }

    /// Realize a pool's lending interest
    pub fn update_accumulated_interest(&mut self, pool: Address) -> Result<ReturnValues> {
        self.atomically(|p| p.with_pool(pool, |pool, ctx| pool.update_accumulated_interest(ctx)))
    }

    /// Move a pool to another lending module
    pub fn migrate_lending_module(
        &mut self,
        sender: Address,
        pool: Address,
        module_id: &str,
        interest_bearing_token: Option<Address>,
    ) -> Result<MigrateReturnValues> {
        self.atomically(|p| {
            p.with_pool(pool, |pool, ctx| {
                pool.migrate_lending_module(ctx, sender, module_id, interest_bearing_token)
            })
        })
    }

    /// Change a pool's fee percentage
    pub fn set_fee_percentage(
        &mut self,
        sender: Address,
        pool: Address,
        fee_percentage: FixedPoint,
    ) -> Result<()> {
        self.atomically(|p| {
            p.with_pool(pool, |pool, ctx| pool.set_fee_percentage(ctx, sender, fee_percentage))
        })
    }

    /// Replace a pool's fee recipients
    pub fn set_fee_recipients(
        &mut self,
        sender: Address,
        pool: Address,
        recipients: Vec<Address>,
        proportions: Vec<u128>,
    ) -> Result<()> {
        self.atomically(|p| {
            p.with_pool(pool, |pool, ctx| {
                pool.set_fee_recipients(ctx, sender, recipients, proportions)
            })
        })
    }

    /// Change a pool's over-collateralization
    pub fn set_over_collateralization(
        &mut self,
        sender: Address,
        pool: Address,
        over_collateralization: FixedPoint,
    ) -> Result<()> {
        self.atomically(|p| {
            p.with_pool(pool, |pool, ctx| {
                pool.set_over_collateralization(ctx, sender, over_collateralization)
            })
        })
    }

    /// Change a pool's liquidation reward
    pub fn set_liquidation_reward(
        &mut self,
        sender: Address,
        pool: Address,
        liquidation_reward: FixedPoint,
    ) -> Result<()> {
        self.atomically(|p| {
            p.with_pool(pool, |pool, ctx| {
                pool.set_liquidation_reward(ctx, sender, liquidation_reward)
            })
        })
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // LENDING ADMINISTRATION
    // ═══════════════════════════════════════════════════════════════════════════

    /// Register a lending module on the proxy
    pub fn set_lending_module(
        &mut self,
        sender: Address,
        id: &str,
        module: LendingModuleKind,
    ) -> Result<()> {
        self.atomically(|p| p.ctx.lending.set_lending_module(sender, id, module))
    }

    /// Register the buyback swap for a collateral
    pub fn set_swap_module(
        &mut self,
        sender: Address,
        collateral: Address,
        swap: FixedRateSwap,
    ) -> Result<()> {
        self.atomically(|p| p.ctx.lending.set_swap_module(sender, collateral, swap))
    }

    /// Change a pool's interest shares
    pub fn set_shares(
        &mut self,
        sender: Address,
        pool: Address,
        dao_interest_share: FixedPoint,
        jrt_buyback_share: FixedPoint,
    ) -> Result<InterestSplit> {
        self.atomically(|p| {
            let split = {
                let (proxy, mut env) = p.ctx.lending_env();
                proxy.set_shares(&mut env, sender, pool, dao_interest_share, jrt_buyback_share)?
            };
            p.credit_realized(&[(pool, split)])?;
            Ok(split)
        })
    }

    /// Pay accrued DAO commission of several pools
    pub fn batch_claim_commission(
        &mut self,
        sender: Address,
        pools: &[Address],
        amounts: &[u128],
    ) -> Result<()> {
        self.atomically(|p| {
            let realized = {
                let (proxy, mut env) = p.ctx.lending_env();
                proxy.batch_claim_commission(&mut env, sender, pools, amounts)?
            };
            p.credit_realized(&realized)
        })
    }

    /// Swap accrued buyback interest of several pools into the reward token
    pub fn batch_buyback(
        &mut self,
        sender: Address,
        pools: &[Address],
        amounts: &[u128],
        collateral: Address,
        min_out: u128,
    ) -> Result<u128> {
        self.atomically(|p| {
            let (reward_out, realized) = {
                let (proxy, mut env) = p.ctx.lending_env();
                proxy.batch_buyback(&mut env, sender, pools, amounts, collateral, min_out)?
            };
            p.credit_realized(&realized)?;
            Ok(reward_out)
        })
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // META-TRANSACTIONS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Verify and relay a signed request
    pub fn safe_execute(
        &mut self,
        request: &ForwardRequest,
        signature: &Signature,
    ) -> Result<Vec<u8>> {
        let forwarder = self.forwarder.address();
        self.ctx.registry.ensure(RegistryKey::TrustedForwarder, forwarder)?;
        let data = self.forwarder.accept(request, signature)?;

        match self.atomically(|p| p.dispatch(forwarder, request.to, &data)) {
            Ok(output) => {
                self.ctx.emit(
                    forwarder,
                    Event::MetaTransactionExecuted {
                        from: request.from,
                        to: request.to,
                        nonce: request.nonce,
                    },
                );
                tracing::debug!(from = %request.from, to = %request.to, "meta-transaction relayed");
                Ok(output)
            }
            Err(err) => {
                tracing::warn!(
                    from = %request.from,
                    to = %request.to,
                    nonce = request.nonce,
                    error = %err,
                    "forwarded call failed"
                );
                Err(Error::ForwardedCallError(err.to_string()))
            }
        }
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // INTERNALS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Run `f`, restoring context and pools if it fails
    fn atomically<T, F>(&mut self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Self) -> Result<T>,
    {
        let ctx = self.ctx.clone();
        let pools = self.pools.clone();
        let busy = self.busy.clone();
        let result = f(self);
        if result.is_err() {
            self.ctx = ctx;
            self.pools = pools;
            self.busy = busy;
        }
        result
    }

    fn checkout(&mut self, address: Address) -> Result<Pool> {
        if self.busy.contains(&address) {
            return Err(Error::ReentrantCall(address.to_hex()));
        }
        let pool = self
            .pools
            .remove(&address)
            .ok_or_else(|| Error::PoolNotFound(address.to_hex()))?;
        self.busy.insert(address);
        Ok(pool)
    }

    fn checkin(&mut self, pool: Pool) {
        self.busy.remove(&pool.address());
        self.pools.insert(pool.address(), pool);
    }

    fn with_pool<T, F>(&mut self, address: Address, f: F) -> Result<T>
    where
        F: FnOnce(&mut Pool, &mut Context) -> Result<T>,
    {
        let mut pool = self.checkout(address)?;
        let result = f(&mut pool, &mut self.ctx);
        self.checkin(pool);
        result
    }

    fn exchange_between(
        &mut self,
        sender: Address,
        source: Address,
        params: ExchangeParams,
    ) -> Result<ExchangeOutcome> {
        if params.dest_pool == source {
            return Err(Error::ConfigMismatch("destination must be another pool".into()));
        }
        let mut pool = self.checkout(source)?;
        let result = match self.checkout(params.dest_pool) {
            Ok(mut dest) => {
                let outcome = pool.exchange(&mut self.ctx, &mut dest, sender, params);
                self.checkin(dest);
                outcome
            }
            Err(err) => Err(err),
        };
        self.checkin(pool);
        result
    }

    /// Credit interest realized by a proxy call to the pools it belongs to
    fn credit_realized(&mut self, realized: &[(Address, InterestSplit)]) -> Result<()> {
        for (pool, split) in realized {
            if self.pools.contains_key(pool) {
                self.with_pool(*pool, |pool, ctx| {
                    pool.credit_interest(ctx, split.pool_interest, split.dao_interest)?;
                    pool.absorb_rounding_loss(split.rounding_loss)
                })?;
            }
        }
        Ok(())
    }

    /// Strip the appended sender from calldata relayed by the trusted forwarder
    fn resolve_sender<'d>(&self, sender: Address, data: &'d [u8]) -> Result<(Address, &'d [u8])> {
        let trusted = self.ctx.registry.try_get(RegistryKey::TrustedForwarder);
        if trusted == Some(sender) && data.len() >= SELECTOR_LENGTH + ADDRESS_LENGTH {
            let (call, from) = data.split_at(data.len() - ADDRESS_LENGTH);
            return Ok((Address::from_slice(from)?, call));
        }
        Ok((sender, data))
    }

    fn dispatch(&mut self, sender: Address, pool: Address, data: &[u8]) -> Result<Vec<u8>> {
        let (sender, data) = self.resolve_sender(sender, data)?;
        let call = PoolCall::decode(data)?;
        tracing::debug!(op = call.operation_type(), %pool, %sender, "dispatch");
        Ok(self.run(sender, pool, call)?.encode())
    }

    fn run(&mut self, sender: Address, pool: Address, call: PoolCall) -> Result<CallOutcome> {
        if let PoolCall::Exchange(params) = call {
            return self
                .exchange_between(sender, pool, params)
                .map(CallOutcome::Exchanged);
        }
        self.with_pool(pool, |pool, ctx| apply(pool, ctx, sender, call))
    }
}

/// Apply a single-pool call
fn apply(pool: &mut Pool, ctx: &mut Context, sender: Address, call: PoolCall) -> Result<CallOutcome> {
    let outcome = match call {
        PoolCall::Mint(params) => CallOutcome::Minted(pool.mint(ctx, sender, params)?),
        PoolCall::Redeem(params) => CallOutcome::Redeemed(pool.redeem(ctx, sender, params)?),
        PoolCall::Exchange(_) => {
            return Err(Error::Internal("exchange needs both pools".into()));
        }
        PoolCall::AddLiquidity { amount } => {
            pool.add_liquidity(ctx, sender, amount)?;
            CallOutcome::Liquidity {
                available: pool.ledger().total_available_liquidity,
            }
        }
        PoolCall::WithdrawLiquidity { amount } => {
            pool.withdraw_liquidity(ctx, sender, amount)?;
            CallOutcome::Liquidity {
                available: pool.ledger().total_available_liquidity,
            }
        }
        PoolCall::IncreaseCollateral {
            collateral_to_transfer,
            collateral_to_increase,
        } => CallOutcome::Collateral {
            total_collateral: pool.increase_collateral(
                ctx,
                sender,
                collateral_to_transfer,
                collateral_to_increase,
            )?,
        },
        PoolCall::DecreaseCollateral {
            collateral_to_decrease,
            collateral_to_withdraw,
        } => CallOutcome::Collateral {
            total_collateral: pool.decrease_collateral(
                ctx,
                sender,
                collateral_to_decrease,
                collateral_to_withdraw,
            )?,
        },
        PoolCall::ClaimFee => CallOutcome::FeeClaimed {
            amount: pool.claim_fee(ctx, sender)?,
        },
        PoolCall::Liquidate { num_synth_tokens } => {
            CallOutcome::Liquidated(pool.liquidate(ctx, sender, num_synth_tokens)?)
        }
        PoolCall::EmergencyShutdown => CallOutcome::ShutDown {
            price: pool.emergency_shutdown(ctx, sender)?,
        },
        PoolCall::SettleEmergencyShutdown => {
            CallOutcome::Settled(pool.settle_emergency_shutdown(ctx, sender)?)
        }
        PoolCall::UpdateAccumulatedInterest => {
            CallOutcome::InterestUpdated(pool.update_accumulated_interest(ctx)?)
        }
        PoolCall::SetFeePercentage { fee_percentage } => {
            pool.set_fee_percentage(ctx, sender, fee_percentage)?;
            CallOutcome::Updated
        }
        PoolCall::SetOverCollateralization {
            over_collateralization,
        } => {
            pool.set_over_collateralization(ctx, sender, over_collateralization)?;
            CallOutcome::Updated
        }
        PoolCall::SetLiquidationReward { liquidation_reward } => {
            pool.set_liquidation_reward(ctx, sender, liquidation_reward)?;
            CallOutcome::Updated
        }
    };
    Ok(outcome)
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════
