//! Lending module interface.
//!
//! A module adapts one money-market protocol to the uniform interface the
//! lending proxy drives. Modules are stateless: all balances live in the
//! market, keyed by pool.

use serde::{Deserialize, Serialize};

use crate::core::token::TokenLedger;
use crate::error::Result;
use crate::lending::aave::AaveModule;
use crate::lending::compound::CompoundModule;
use crate::lending::market::MarketRegistry;
use crate::utils::crypto::Address;

/// Rounding direction of a quote
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuoteKind {
    /// Interest-bearing tokens received for depositing `amount`
    ExactIn,
    /// Interest-bearing tokens to burn to receive at least `amount`
    ExactOut,
}

/// Outcome of a module deposit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DepositReceipt {
    /// Interest-bearing tokens credited to the pool
    pub interest_tokens_minted: u128,
    /// Pool's underlying balance in the market afterwards
    pub balance_after: u128,
}

/// Outcome of a module withdrawal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WithdrawReceipt {
    /// Interest-bearing tokens burned
    pub interest_tokens_burned: u128,
    /// Underlying sent to the recipient
    pub collateral_out: u128,
    /// Pool's underlying balance in the market afterwards
    pub balance_after: u128,
}

/// Mutable view over what a module touches
#[derive(Debug)]
pub struct MarketAccess<'a> {
    /// Money markets
    pub markets: &'a mut MarketRegistry,
    /// Token balances
    pub tokens: &'a mut TokenLedger,
}

/// Uniform money-market adapter
pub trait LendingModule {
    /// Supply `amount` of collateral held by `from` on behalf of `pool`
    fn deposit(
        &self,
        access: &mut MarketAccess<'_>,
        from: Address,
        pool: Address,
        interest_token: Address,
        amount: u128,
    ) -> Result<DepositReceipt>;

    /// Burn `interest_amount` of the pool's position and send the underlying to `recipient`
    fn withdraw(
        &self,
        access: &mut MarketAccess<'_>,
        pool: Address,
        interest_token: Address,
        interest_amount: u128,
        recipient: Address,
    ) -> Result<WithdrawReceipt>;

    /// Pool's current underlying balance in the market
    fn total_balance(
        &self,
        markets: &MarketRegistry,
        pool: Address,
        interest_token: Address,
    ) -> Result<u128>;

    /// Interest-bearing token this module uses for `collateral`
    fn interest_bearing_token(&self, markets: &MarketRegistry, collateral: Address)
        -> Result<Address>;

    /// Interest-bearing amount corresponding to `amount` of collateral
    fn quote(
        &self,
        markets: &MarketRegistry,
        interest_token: Address,
        amount: u128,
        kind: QuoteKind,
    ) -> Result<u128>;

    /// Collateral value of an interest-bearing amount
    fn interest_to_collateral(
        &self,
        markets: &MarketRegistry,
        interest_token: Address,
        interest_amount: u128,
    ) -> Result<u128>;
}

/// Every lending module the proxy can bind a pool to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LendingModuleKind {
    /// Rebasing 1:1 market
    Aave(AaveModule),
    /// Exchange-rate market
    Compound(CompoundModule),
}

impl LendingModuleKind {
    fn inner(&self) -> &dyn LendingModule {
        match self {
            LendingModuleKind::Aave(module) => module,
            LendingModuleKind::Compound(module) => module,
        }
    }
}

impl LendingModule for LendingModuleKind {
    fn deposit(
        &self,
        access: &mut MarketAccess<'_>,
        from: Address,
        pool: Address,
        interest_token: Address,
        amount: u128,
    ) -> Result<DepositReceipt> {
        self.inner().deposit(access, from, pool, interest_token, amount)
    }

    fn withdraw(
        &self,
        access: &mut MarketAccess<'_>,
        pool: Address,
        interest_token: Address,
        interest_amount: u128,
        recipient: Address,
    ) -> Result<WithdrawReceipt> {
        self.inner()
            .withdraw(access, pool, interest_token, interest_amount, recipient)
    }

    fn total_balance(
        &self,
        markets: &MarketRegistry,
        pool: Address,
        interest_token: Address,
    ) -> Result<u128> {
        self.inner().total_balance(markets, pool, interest_token)
    }

    fn interest_bearing_token(
        &self,
        markets: &MarketRegistry,
        collateral: Address,
    ) -> Result<Address> {
        self.inner().interest_bearing_token(markets, collateral)
    }

    fn quote(
        &self,
        markets: &MarketRegistry,
        interest_token: Address,
        amount: u128,
        kind: QuoteKind,
    ) -> Result<u128> {
        self.inner().quote(markets, interest_token, amount, kind)
    }

    fn interest_to_collateral(
        &self,
        markets: &MarketRegistry,
        interest_token: Address,
        interest_amount: u128,
    ) -> Result<u128> {
        self.inner()
            .interest_to_collateral(markets, interest_token, interest_amount)
    }
}
