//! Lending proxy.
//!
//! Routes pool collateral into the module bound to each pool and attributes
//! the interest realized since the previous interaction:
//! - `interest = underlying now + moved out − moved in − attributed before`
//! - the DAO takes `dao_interest_share`, split into buyback and commission
//! - the rest belongs to the pool and is added to `collateral_deposited`
//!
//! Pool-facing withdrawals are exact in collateral units. The interest-bearing
//! amount is quoted exact-out and any rounding excess is supplied back to the
//! market.
//!
//! Storage books what the market actually credits. When market rounding
//! leaves the position short of what was moved, the difference is written off
//! `collateral_deposited` and reported as `rounding_loss` for the pool to take
//! off its own ledger.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::core::registry::{Registry, RegistryKey};
use crate::core::token::TokenLedger;
use crate::error::{Error, Result};
use crate::lending::market::MarketRegistry;
use crate::lending::module::{LendingModule, LendingModuleKind, MarketAccess, QuoteKind};
use crate::lending::storage::{LendingStorageManager, PoolStorage};
use crate::lending::swap::FixedRateSwap;
use crate::protocol::events::{Event, EventLog};
use crate::utils::crypto::Address;
use crate::utils::math::{safe_add, safe_sub, FixedPoint};
use crate::utils::validation::{validate_fraction, validate_same_length};

// ═══════════════════════════════════════════════════════════════════════════════
// TYPES
// ═══════════════════════════════════════════════════════════════════════════════

/// Accounts holding proxy roles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LendingRoles {
    /// Proxy administrator
    pub admin: Address,
    /// May register modules and run DAO claims
    pub maintainer: Address,
}

/// Everything a proxy operation reads or writes
#[derive(Debug)]
pub struct LendingEnv<'a> {
    /// Per-pool lending storage
    pub storage: &'a mut LendingStorageManager,
    /// Money markets
    pub markets: &'a mut MarketRegistry,
    /// Token balances
    pub tokens: &'a mut TokenLedger,
    /// Service locator
    pub registry: &'a Registry,
    /// Event sink
    pub events: &'a mut EventLog,
    /// Engine time
    pub now: u64,
}

/// Split of realized interest
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterestSplit {
    /// Pool's share
    pub pool_interest: u128,
    /// DAO's share
    pub dao_interest: u128,
    /// DAO share reserved for buybacks
    pub jrt_interest: u128,
    /// DAO share reserved as commission
    pub commission_interest: u128,
    /// Collateral lost to market rounding, written off the pool's share
    #[serde(default)]
    pub rounding_loss: u128,
}

impl InterestSplit {
    /// Split `interest` by the pool's shares
    pub fn compute(interest: u128, storage: &PoolStorage) -> Result<Self> {
        let dao_interest = storage.dao_interest_share.mul_amount(interest)?;
        let pool_interest = safe_sub(interest, dao_interest)?;
        let jrt_interest = storage.jrt_buyback_share.mul_amount(dao_interest)?;
        let commission_interest = safe_sub(dao_interest, jrt_interest)?;
        Ok(Self {
            pool_interest,
            dao_interest,
            jrt_interest,
            commission_interest,
            rounding_loss: 0,
        })
    }
}

/// Result of a pool-facing proxy call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnValues {
    /// Interest realized for the pool
    pub pool_interest: u128,
    /// Interest realized for the DAO
    pub dao_interest: u128,
    /// Interest-bearing tokens minted (deposit) or burned (withdraw)
    pub tokens_out: u128,
    /// Collateral moved
    pub tokens_transferred: u128,
    /// Collateral lost to market rounding, written off the pool's share
    #[serde(default)]
    pub rounding_loss: u128,
}

/// Result of moving a pool to another module
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrateReturnValues {
    /// Collateral attributed to the pool before migration
    pub prev_total_collateral: u128,
    /// Interest realized for the pool during migration
    pub pool_interest: u128,
    /// Pool collateral held by the new module
    pub actual_total_collateral: u128,
    /// Collateral lost to rounding in the new market
    #[serde(default)]
    pub rounding_loss: u128,
}

/// Pending interest of a pool, not yet realized
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccumulatedInterest {
    /// Pool's pending share
    pub pool_interest: u128,
    /// DAO's pending share
    pub dao_interest: u128,
    /// Collateral currently attributed to the pool
    pub collateral_deposited: u128,
}

// ═══════════════════════════════════════════════════════════════════════════════
// LENDING MANAGER
// ═══════════════════════════════════════════════════════════════════════════════

/// The lending proxy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LendingManager {
    address: Address,
    roles: LendingRoles,
    modules: BTreeMap<String, LendingModuleKind>,
    swap_modules: BTreeMap<Address, FixedRateSwap>,
}

impl LendingManager {
    /// Create a proxy with no modules
    pub fn new(address: Address, roles: LendingRoles) -> Self {
        Self {
            address,
            roles,
            modules: BTreeMap::new(),
            swap_modules: BTreeMap::new(),
        }
    }

    /// Address of the proxy
    pub fn address(&self) -> Address {
        self.address
    }

    /// Role holders
    pub fn roles(&self) -> LendingRoles {
        self.roles
    }

    fn only_maintainer(&self, sender: Address) -> Result<()> {
        if sender != self.roles.maintainer {
            return Err(Error::SenderMustBeMaintainer);
        }
        Ok(())
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // ADMINISTRATION
    // ═══════════════════════════════════════════════════════════════════════════

    /// Register or replace a lending module under `id`
    pub fn set_lending_module(
        &mut self,
        sender: Address,
        id: &str,
        module: LendingModuleKind,
    ) -> Result<()> {
        self.only_maintainer(sender)?;
        if id.is_empty() {
            return Err(Error::InvalidParameter {
                name: "module_id".into(),
                reason: "cannot be empty".into(),
            });
        }
        tracing::info!(id, "lending module registered");
        self.modules.insert(id.to_string(), module);
        Ok(())
    }

    /// Register the swap used to buy back with `collateral`
    pub fn set_swap_module(
        &mut self,
        sender: Address,
        collateral: Address,
        swap: FixedRateSwap,
    ) -> Result<()> {
        self.only_maintainer(sender)?;
        self.swap_modules.insert(collateral, swap);
        Ok(())
    }

    /// Module registered under `id`
    pub fn module(&self, id: &str) -> Result<&LendingModuleKind> {
        self.modules
            .get(id)
            .ok_or_else(|| Error::LendingModuleNotFound(id.to_string()))
    }

    /// Change a pool's interest shares, realizing pending interest first
    pub fn set_shares(
        &self,
        env: &mut LendingEnv<'_>,
        sender: Address,
        pool: Address,
        dao_interest_share: FixedPoint,
        jrt_buyback_share: FixedPoint,
    ) -> Result<InterestSplit> {
        self.only_maintainer(sender)?;
        validate_fraction("dao_interest_share", dao_interest_share)?;
        validate_fraction("jrt_buyback_share", jrt_buyback_share)?;
        let split = self.realize(env, pool)?;
        env.storage
            .update_values(env.registry, self.address, &pool, |s| {
                s.dao_interest_share = dao_interest_share;
                s.jrt_buyback_share = jrt_buyback_share;
                Ok(())
            })?;
        Ok(split)
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // POOL OPERATIONS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Move `amount` of collateral from the pool into its module
    pub fn deposit(
        &self,
        env: &mut LendingEnv<'_>,
        pool: Address,
        amount: u128,
    ) -> Result<ReturnValues> {
        let mut split = self.realize(env, pool)?;
        let storage = env.storage.pool_storage(&pool)?.clone();
        let module = self.module(&storage.lending_module_id)?;
        let token = storage.interest_bearing_token;
        let before = module.total_balance(env.markets, pool, token)?;

        env.tokens
            .transfer(&storage.collateral, pool, self.address, amount)?;
        let receipt = module.deposit(
            &mut MarketAccess {
                markets: &mut *env.markets,
                tokens: &mut *env.tokens,
            },
            self.address,
            pool,
            token,
            amount,
        )?;

        let credited = receipt.balance_after.saturating_sub(before);
        self.book(env, pool, InterestSplit::default(), amount, 0)?;
        let loss = amount.saturating_sub(credited);
        split.rounding_loss = safe_add(split.rounding_loss, self.write_off(env, pool, loss)?)?;

        tracing::debug!(%pool, amount, credited, interest = split.pool_interest, "lending deposit");
        Ok(ReturnValues {
            pool_interest: split.pool_interest,
            dao_interest: split.dao_interest,
            tokens_out: receipt.interest_tokens_minted,
            tokens_transferred: credited,
            rounding_loss: split.rounding_loss,
        })
    }

    /// Send exactly `amount` of the pool's collateral to `recipient`
    pub fn withdraw(
        &self,
        env: &mut LendingEnv<'_>,
        pool: Address,
        amount: u128,
        recipient: Address,
    ) -> Result<ReturnValues> {
        let mut split = self.realize(env, pool)?;
        let storage = env.storage.pool_storage(&pool)?.clone();
        let module = self.module(&storage.lending_module_id)?;
        let token = storage.interest_bearing_token;
        let before = module.total_balance(env.markets, pool, token)?;

        let burned = self.pull_collateral(env, module, &storage, pool, amount, recipient)?;
        let after = module.total_balance(env.markets, pool, token)?;

        self.book(env, pool, InterestSplit::default(), 0, amount)?;
        let loss = safe_sub(before, amount)?.saturating_sub(after);
        split.rounding_loss = safe_add(split.rounding_loss, self.write_off(env, pool, loss)?)?;

        tracing::debug!(%pool, amount, interest = split.pool_interest, "lending withdraw");
        Ok(ReturnValues {
            pool_interest: split.pool_interest,
            dao_interest: split.dao_interest,
            tokens_out: burned,
            tokens_transferred: amount,
            rounding_loss: split.rounding_loss,
        })
    }

    /// Realize pending interest without moving collateral
    pub fn update_accumulated_interest(
        &self,
        env: &mut LendingEnv<'_>,
        pool: Address,
    ) -> Result<ReturnValues> {
        let split = self.realize(env, pool)?;
        Ok(ReturnValues {
            pool_interest: split.pool_interest,
            dao_interest: split.dao_interest,
            tokens_out: 0,
            tokens_transferred: 0,
            rounding_loss: split.rounding_loss,
        })
    }

    /// Interest accrued in the market but not yet realized
    pub fn get_accumulated_interest(
        &self,
        storage: &LendingStorageManager,
        markets: &MarketRegistry,
        pool: Address,
    ) -> Result<AccumulatedInterest> {
        let storage = storage.pool_storage(&pool)?;
        let module = self.module(&storage.lending_module_id)?;
        let balance = module.total_balance(markets, pool, storage.interest_bearing_token)?;
        let interest = balance.saturating_sub(storage.total_attributed()?);
        let split = InterestSplit::compute(interest, storage)?;
        Ok(AccumulatedInterest {
            pool_interest: split.pool_interest,
            dao_interest: split.dao_interest,
            collateral_deposited: storage.collateral_deposited,
        })
    }

    /// Attributed collateral the market actually holds for the pool
    pub fn backed_collateral(
        &self,
        storage: &LendingStorageManager,
        markets: &MarketRegistry,
        pool: Address,
    ) -> Result<u128> {
        let storage = storage.pool_storage(&pool)?;
        let module = self.module(&storage.lending_module_id)?;
        let balance = module.total_balance(markets, pool, storage.interest_bearing_token)?;
        let dao = safe_add(storage.unclaimed_dao_jrt, storage.unclaimed_dao_commission)?;
        Ok(balance
            .saturating_sub(dao)
            .min(storage.collateral_deposited))
    }

    /// Interest-bearing tokens a deposit of `amount` collateral would mint
    pub fn collateral_to_interest_token(
        &self,
        storage: &LendingStorageManager,
        markets: &MarketRegistry,
        pool: Address,
        amount: u128,
    ) -> Result<(u128, Address)> {
        let storage = storage.pool_storage(&pool)?;
        let module = self.module(&storage.lending_module_id)?;
        let token = storage.interest_bearing_token;
        Ok((module.quote(markets, token, amount, QuoteKind::ExactIn)?, token))
    }

    /// Collateral value of `amount` interest-bearing tokens
    pub fn interest_token_to_collateral(
        &self,
        storage: &LendingStorageManager,
        markets: &MarketRegistry,
        pool: Address,
        amount: u128,
    ) -> Result<(u128, Address)> {
        let storage = storage.pool_storage(&pool)?;
        let module = self.module(&storage.lending_module_id)?;
        Ok((
            module.interest_to_collateral(markets, storage.interest_bearing_token, amount)?,
            storage.collateral,
        ))
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // DAO CLAIMS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Pay accrued commission of several pools to the commission receiver
    pub fn batch_claim_commission(
        &self,
        env: &mut LendingEnv<'_>,
        sender: Address,
        pools: &[Address],
        amounts: &[u128],
    ) -> Result<Vec<(Address, InterestSplit)>> {
        self.only_maintainer(sender)?;
        validate_same_length(pools.len(), amounts.len())?;
        let receiver = env.registry.get(RegistryKey::CommissionReceiver)?;

        let mut realized = Vec::with_capacity(pools.len());
        let mut total = 0u128;
        for (pool, amount) in pools.iter().zip(amounts) {
            let mut split = self.realize(env, *pool)?;
            let storage = env.storage.pool_storage(pool)?.clone();
            if *amount > storage.unclaimed_dao_commission {
                return Err(Error::ClaimExceedsAccrued {
                    requested: *amount,
                    available: storage.unclaimed_dao_commission,
                });
            }
            let module = self.module(&storage.lending_module_id)?;
            let loss = self.pull_tracked(env, module, &storage, *pool, *amount, receiver)?;
            env.storage
                .update_values(env.registry, self.address, pool, |s| {
                    s.unclaimed_dao_commission = safe_sub(s.unclaimed_dao_commission, *amount)?;
                    Ok(())
                })?;
            split.rounding_loss =
                safe_add(split.rounding_loss, self.write_off(env, *pool, loss)?)?;
            total = safe_add(total, *amount)?;
            realized.push((*pool, split));
        }

        env.events.push(
            self.address,
            env.now,
            Event::BatchCommissionClaim {
                collateral_out: total,
                receiver,
            },
        );
        tracing::info!(total, %receiver, "commission claimed");
        Ok(realized)
    }

    /// Swap accrued buyback interest of several pools into the reward token
    pub fn batch_buyback(
        &self,
        env: &mut LendingEnv<'_>,
        sender: Address,
        pools: &[Address],
        amounts: &[u128],
        collateral: Address,
        min_out: u128,
    ) -> Result<(u128, Vec<(Address, InterestSplit)>)> {
        self.only_maintainer(sender)?;
        validate_same_length(pools.len(), amounts.len())?;
        let receiver = env.registry.get(RegistryKey::BuybackProgramReceiver)?;
        let swap = self.swap_modules.get(&collateral).ok_or_else(|| {
            Error::ConfigMismatch(format!("no swap module for collateral {}", collateral))
        })?;

        let mut realized = Vec::with_capacity(pools.len());
        let mut total = 0u128;
        for (pool, amount) in pools.iter().zip(amounts) {
            let storage = env.storage.pool_storage(pool)?.clone();
            if storage.collateral != collateral {
                return Err(Error::ConfigMismatch("Collateral mismatch".into()));
            }
            let mut split = self.realize(env, *pool)?;
            let storage = env.storage.pool_storage(pool)?.clone();
            if *amount > storage.unclaimed_dao_jrt {
                return Err(Error::ClaimExceedsAccrued {
                    requested: *amount,
                    available: storage.unclaimed_dao_jrt,
                });
            }
            let module = self.module(&storage.lending_module_id)?;
            let loss = self.pull_tracked(env, module, &storage, *pool, *amount, self.address)?;
            env.storage
                .update_values(env.registry, self.address, pool, |s| {
                    s.unclaimed_dao_jrt = safe_sub(s.unclaimed_dao_jrt, *amount)?;
                    Ok(())
                })?;
            split.rounding_loss =
                safe_add(split.rounding_loss, self.write_off(env, *pool, loss)?)?;
            total = safe_add(total, *amount)?;
            realized.push((*pool, split));
        }

        let reward_out =
            swap.swap_to_reward(env.tokens, self.address, collateral, total, min_out, receiver)?;
        env.events.push(
            self.address,
            env.now,
            Event::BatchBuyback {
                collateral_in: total,
                reward_out,
                receiver,
            },
        );
        tracing::info!(total, reward_out, %receiver, "buyback executed");
        Ok((reward_out, realized))
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // MIGRATIONS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Move a pool's collateral to another module
    pub fn migrate_lending_module(
        &self,
        env: &mut LendingEnv<'_>,
        pool: Address,
        new_module_id: &str,
        new_interest_bearing_token: Option<Address>,
    ) -> Result<MigrateReturnValues> {
        let split = self.realize(env, pool)?;
        let storage = env.storage.pool_storage(&pool)?.clone();
        let old_module = self.module(&storage.lending_module_id)?;
        let new_module = self.module(new_module_id)?;

        let new_token = match new_interest_bearing_token {
            Some(token) => token,
            None => new_module
                .interest_bearing_token(env.markets, storage.collateral)
                .map_err(|_| Error::InvalidParameter {
                    name: "interest_bearing_token".into(),
                    reason: "No bearing token passed".into(),
                })?,
        };
        if env.markets.get(&new_token)?.underlying != storage.collateral {
            return Err(Error::ConfigMismatch(
                "interest-bearing token does not match pool collateral".into(),
            ));
        }

        let old_token = storage.interest_bearing_token;
        let position = env.markets.get(&old_token)?.balance_of(&pool);
        let resident = new_module.total_balance(env.markets, pool, new_token)?;
        let mut access = MarketAccess {
            markets: &mut *env.markets,
            tokens: &mut *env.tokens,
        };
        let withdrawn =
            old_module.withdraw(&mut access, pool, old_token, position, self.address)?;
        let receipt = new_module.deposit(
            &mut access,
            self.address,
            pool,
            new_token,
            withdrawn.collateral_out,
        )?;

        env.storage
            .update_values(env.registry, self.address, &pool, |s| {
                s.lending_module_id = new_module_id.to_string();
                s.interest_bearing_token = new_token;
                Ok(())
            })?;
        let credited = receipt.balance_after.saturating_sub(resident);
        let loss = withdrawn.collateral_out.saturating_sub(credited);
        let rounding_loss = safe_add(split.rounding_loss, self.write_off(env, pool, loss)?)?;

        let moved = env.storage.pool_storage(&pool)?;
        let result = MigrateReturnValues {
            prev_total_collateral: safe_sub(storage.collateral_deposited, split.pool_interest)?,
            pool_interest: split.pool_interest,
            actual_total_collateral: moved.collateral_deposited,
            rounding_loss,
        };
        env.events.push(
            self.address,
            env.now,
            Event::LendingModuleMigrated {
                pool,
                module_id: new_module_id.to_string(),
                interest_bearing_token: new_token,
                prev_total_collateral: result.prev_total_collateral,
                actual_total_collateral: result.actual_total_collateral,
            },
        );
        tracing::info!(%pool, module = new_module_id, "lending module migrated");
        Ok(result)
    }

    /// Move a pool's lending storage and position to a new pool address
    pub fn migrate_pool(
        &self,
        env: &mut LendingEnv<'_>,
        sender: Address,
        old_pool: Address,
        new_pool: Address,
    ) -> Result<PoolStorage> {
        env.registry.ensure(RegistryKey::PoolFactory, sender)?;
        let storage = env.storage.pool_storage(&old_pool)?.clone();
        let market = env.markets.get_mut(&storage.interest_bearing_token)?;
        let position = market.balance_of(&old_pool);
        market.transfer(old_pool, new_pool, position)?;

        let moved = env
            .storage
            .migrate_pool(env.registry, self.address, &old_pool, new_pool)?;
        env.events.push(
            self.address,
            env.now,
            Event::PoolStorageMigrated {
                old_pool,
                new_pool,
                collateral_deposited: moved.collateral_deposited,
            },
        );
        tracing::info!(%old_pool, %new_pool, "pool storage migrated");
        Ok(moved)
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // INTERNALS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Realize interest accrued since the last checkpoint
    fn realize(&self, env: &mut LendingEnv<'_>, pool: Address) -> Result<InterestSplit> {
        let storage = env.storage.pool_storage(&pool)?.clone();
        let module = self.module(&storage.lending_module_id)?;
        let balance = module.total_balance(env.markets, pool, storage.interest_bearing_token)?;
        let attributed = storage.total_attributed()?;
        let mut split = InterestSplit::compute(balance.saturating_sub(attributed), &storage)?;
        self.book(env, pool, split, 0, 0)?;
        split.rounding_loss = self.write_off(env, pool, attributed.saturating_sub(balance))?;
        Ok(split)
    }

    /// Write `loss` off the pool's attributed collateral, spilling into unclaimed
    /// DAO interest once that is exhausted; returns the part the pool bears
    fn write_off(&self, env: &mut LendingEnv<'_>, pool: Address, loss: u128) -> Result<u128> {
        if loss == 0 {
            return Ok(0);
        }
        let mut charged = 0;
        env.storage
            .update_values(env.registry, self.address, &pool, |s| {
                charged = loss.min(s.collateral_deposited);
                s.collateral_deposited -= charged;
                let mut rest = loss - charged;
                for bucket in [&mut s.unclaimed_dao_commission, &mut s.unclaimed_dao_jrt] {
                    let cut = rest.min(*bucket);
                    *bucket -= cut;
                    rest -= cut;
                }
                Ok(())
            })?;
        tracing::debug!(%pool, loss, charged, "rounding loss written off");
        Ok(charged)
    }

    /// Record realized interest and collateral movement in storage
    fn book(
        &self,
        env: &mut LendingEnv<'_>,
        pool: Address,
        split: InterestSplit,
        moved_in: u128,
        moved_out: u128,
    ) -> Result<()> {
        env.storage
            .update_values(env.registry, self.address, &pool, |s| {
                let grown = safe_add(
                    safe_add(s.collateral_deposited, split.pool_interest)?,
                    moved_in,
                )?;
                s.collateral_deposited = safe_sub(grown, moved_out)?;
                s.unclaimed_dao_jrt = safe_add(s.unclaimed_dao_jrt, split.jrt_interest)?;
                s.unclaimed_dao_commission =
                    safe_add(s.unclaimed_dao_commission, split.commission_interest)?;
                Ok(())
            })
    }

    /// [`Self::pull_collateral`], returning how far the position fell below `balance - amount`
    fn pull_tracked(
        &self,
        env: &mut LendingEnv<'_>,
        module: &LendingModuleKind,
        storage: &PoolStorage,
        pool: Address,
        amount: u128,
        recipient: Address,
    ) -> Result<u128> {
        let token = storage.interest_bearing_token;
        let before = module.total_balance(env.markets, pool, token)?;
        self.pull_collateral(env, module, storage, pool, amount, recipient)?;
        let after = module.total_balance(env.markets, pool, token)?;
        Ok(safe_sub(before, amount)?.saturating_sub(after))
    }

    /// Withdraw exactly `amount` of collateral from the pool's position
    fn pull_collateral(
        &self,
        env: &mut LendingEnv<'_>,
        module: &LendingModuleKind,
        storage: &PoolStorage,
        pool: Address,
        amount: u128,
        recipient: Address,
    ) -> Result<u128> {
        let token = storage.interest_bearing_token;
        let burn = module.quote(env.markets, token, amount, QuoteKind::ExactOut)?;
        let mut access = MarketAccess {
            markets: &mut *env.markets,
            tokens: &mut *env.tokens,
        };
        let receipt = module.withdraw(&mut access, pool, token, burn, self.address)?;
        let excess = safe_sub(receipt.collateral_out, amount)?;

        access
            .tokens
            .transfer(&storage.collateral, self.address, recipient, amount)?;
        if excess > 0 {
            module.deposit(&mut access, self.address, pool, token, excess)?;
        }
        Ok(burn)
    }
}
