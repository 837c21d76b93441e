//! Adapter for exchange-rate markets.
//!
//! Interest-bearing balances are fixed and each token is worth
//! `exchange_rate` underlying. Deposits floor the tokens minted; exact-out
//! quotes round up so a withdrawal always covers the requested collateral.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::lending::market::{MarketKind, MarketRegistry, MoneyMarket};
use crate::lending::module::{
    DepositReceipt, LendingModule, MarketAccess, QuoteKind, WithdrawReceipt,
};
use crate::utils::crypto::Address;

/// Exchange-rate market adapter
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompoundModule {}

impl CompoundModule {
    /// Create the adapter
    pub fn new() -> Self {
        Self {}
    }

    fn market<'m>(&self, markets: &'m MarketRegistry, token: &Address) -> Result<&'m MoneyMarket> {
        let market = markets.get(token)?;
        if market.kind != MarketKind::ExchangeRate {
            return Err(Error::ConfigMismatch(format!(
                "{} is not an exchange-rate market",
                market.symbol
            )));
        }
        Ok(market)
    }
}

impl LendingModule for CompoundModule {
    fn deposit(
        &self,
        access: &mut MarketAccess<'_>,
        from: Address,
        pool: Address,
        interest_token: Address,
        amount: u128,
    ) -> Result<DepositReceipt> {
        self.market(access.markets, &interest_token)?;
        let market = access.markets.get_mut(&interest_token)?;
        let minted = market.supply(access.tokens, from, pool, amount)?;
        Ok(DepositReceipt {
            interest_tokens_minted: minted,
            balance_after: market.underlying_balance_of(&pool)?,
        })
    }

    fn withdraw(
        &self,
        access: &mut MarketAccess<'_>,
        pool: Address,
        interest_token: Address,
        interest_amount: u128,
        recipient: Address,
    ) -> Result<WithdrawReceipt> {
        self.market(access.markets, &interest_token)?;
        let market = access.markets.get_mut(&interest_token)?;
        let out = market.redeem(access.tokens, pool, interest_amount, recipient)?;
        Ok(WithdrawReceipt {
            interest_tokens_burned: interest_amount,
            collateral_out: out,
            balance_after: market.underlying_balance_of(&pool)?,
        })
    }

    fn total_balance(
        &self,
        markets: &MarketRegistry,
        pool: Address,
        interest_token: Address,
    ) -> Result<u128> {
        self.market(markets, &interest_token)?
            .underlying_balance_of(&pool)
    }

    fn interest_bearing_token(
        &self,
        markets: &MarketRegistry,
        collateral: Address,
    ) -> Result<Address> {
        markets
            .find(&collateral, MarketKind::ExchangeRate)
            .map(|m| m.address)
            .ok_or_else(|| {
                Error::MarketNotFound(format!("exchange-rate market for {}", collateral))
            })
    }

    fn quote(
        &self,
        markets: &MarketRegistry,
        interest_token: Address,
        amount: u128,
        kind: QuoteKind,
    ) -> Result<u128> {
        let market = self.market(markets, &interest_token)?;
        market.to_interest(amount, kind == QuoteKind::ExactOut)
    }

    fn interest_to_collateral(
        &self,
        markets: &MarketRegistry,
        interest_token: Address,
        interest_amount: u128,
    ) -> Result<u128> {
        self.market(markets, &interest_token)?
            .to_underlying(interest_amount)
    }
}
