//! Simulated money markets backing the lending modules.
//!
//! A market holds underlying collateral and issues an interest-bearing
//! token for it. Two mechanics are supported:
//! - Rebasing: balances are 1:1 with underlying and grow in place
//! - Exchange rate: balances are fixed and the rate per token grows
//!
//! Interest is generated explicitly with [`MoneyMarket::accrue`], which mints
//! the matching underlying into the market so redemptions stay fully backed.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::core::token::TokenLedger;
use crate::error::{Error, Result};
use crate::utils::crypto::Address;
use crate::utils::math::{mul_div, mul_div_up, safe_add, safe_sub, FixedPoint};

/// How a market's interest-bearing token tracks underlying
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MarketKind {
    /// Balances equal underlying and grow with interest
    Rebasing,
    /// Underlying per token grows with interest
    ExchangeRate,
}

/// One lending market for one underlying asset
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MoneyMarket {
    /// Market address, which is also its interest-bearing token
    pub address: Address,
    /// Ticker of the interest-bearing token
    pub symbol: String,
    /// Underlying collateral token
    pub underlying: Address,
    /// Token mechanics
    pub kind: MarketKind,
    /// Underlying per interest-bearing token
    exchange_rate: FixedPoint,
    total_supply: u128,
    balances: BTreeMap<Address, u128>,
}

impl MoneyMarket {
    /// Create an empty market
    pub fn new(address: Address, symbol: &str, underlying: Address, kind: MarketKind) -> Self {
        Self {
            address,
            symbol: symbol.to_string(),
            underlying,
            kind,
            exchange_rate: FixedPoint::ONE,
            total_supply: 0,
            balances: BTreeMap::new(),
        }
    }

    /// Start from a custom exchange rate
    pub fn with_exchange_rate(mut self, rate: FixedPoint) -> Self {
        self.exchange_rate = rate;
        self
    }

    /// Current underlying per interest-bearing token
    pub fn exchange_rate(&self) -> FixedPoint {
        match self.kind {
            MarketKind::Rebasing => FixedPoint::ONE,
            MarketKind::ExchangeRate => self.exchange_rate,
        }
    }

    /// Interest-bearing balance of a holder
    pub fn balance_of(&self, holder: &Address) -> u128 {
        self.balances.get(holder).copied().unwrap_or(0)
    }

    /// Total interest-bearing supply
    pub fn total_supply(&self) -> u128 {
        self.total_supply
    }

    /// Underlying value of an interest-bearing amount, floored
    pub fn to_underlying(&self, interest_amount: u128) -> Result<u128> {
        self.exchange_rate().mul_amount(interest_amount)
    }

    /// Interest-bearing amount for an underlying amount
    pub fn to_interest(&self, underlying: u128, round_up: bool) -> Result<u128> {
        let rate = self.exchange_rate().raw();
        if round_up {
            mul_div_up(underlying, FixedPoint::SCALE, rate)
        } else {
            mul_div(underlying, FixedPoint::SCALE, rate)
        }
    }

    /// Underlying value held by a holder
    pub fn underlying_balance_of(&self, holder: &Address) -> Result<u128> {
        self.to_underlying(self.balance_of(holder))
    }

    /// Supply underlying from `from`, crediting interest-bearing tokens to `on_behalf_of`
    pub fn supply(
        &mut self,
        tokens: &mut TokenLedger,
        from: Address,
        on_behalf_of: Address,
        amount: u128,
    ) -> Result<u128> {
        tokens.transfer(&self.underlying, from, self.address, amount)?;
        let minted = self.to_interest(amount, false)?;
        self.credit(on_behalf_of, minted)?;
        self.total_supply = safe_add(self.total_supply, minted)?;
        Ok(minted)
    }

    /// Burn `interest_amount` of `holder` and send the underlying to `to`
    pub fn redeem(
        &mut self,
        tokens: &mut TokenLedger,
        holder: Address,
        interest_amount: u128,
        to: Address,
    ) -> Result<u128> {
        let underlying = self.to_underlying(interest_amount)?;
        self.debit(holder, interest_amount)?;
        self.total_supply = safe_sub(self.total_supply, interest_amount)?;
        tokens.transfer(&self.underlying, self.address, to, underlying)?;
        Ok(underlying)
    }

    /// Move interest-bearing tokens between holders
    pub fn transfer(&mut self, from: Address, to: Address, amount: u128) -> Result<()> {
        if amount == 0 || from == to {
            return Ok(());
        }
        self.debit(from, amount)?;
        self.credit(to, amount)
    }

    /// Grow every holder's underlying by `rate`; returns the interest generated
    pub fn accrue(&mut self, tokens: &mut TokenLedger, rate: FixedPoint) -> Result<u128> {
        let interest = match self.kind {
            MarketKind::Rebasing => {
                let mut generated = 0u128;
                for balance in self.balances.values_mut() {
                    let gain = rate.mul_amount(*balance)?;
                    *balance = safe_add(*balance, gain)?;
                    generated = safe_add(generated, gain)?;
                }
                self.total_supply = safe_add(self.total_supply, generated)?;
                generated
            }
            MarketKind::ExchangeRate => {
                let before = self.to_underlying(self.total_supply)?;
                let growth = self.exchange_rate.checked_mul(rate)?;
                self.exchange_rate = self.exchange_rate.checked_add(growth)?;
                let after = self.to_underlying(self.total_supply)?;
                safe_sub(after, before)?
            }
        };
        tokens.mint(&self.underlying, self.address, self.address, interest)?;
        tracing::debug!(market = %self.symbol, interest, "interest accrued");
        Ok(interest)
    }

    fn debit(&mut self, holder: Address, amount: u128) -> Result<()> {
        let available = self.balance_of(&holder);
        if available < amount {
            return Err(Error::InsufficientBalance {
                token: self.symbol.clone(),
                required: amount,
                available,
            });
        }
        if available == amount {
            self.balances.remove(&holder);
        } else {
            self.balances.insert(holder, available - amount);
        }
        Ok(())
    }

    fn credit(&mut self, holder: Address, amount: u128) -> Result<()> {
        if amount == 0 {
            return Ok(());
        }
        let balance = safe_add(self.balance_of(&holder), amount)?;
        self.balances.insert(holder, balance);
        Ok(())
    }
}

/// All markets, keyed by interest-bearing token
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MarketRegistry {
    markets: HashMap<Address, MoneyMarket>,
}

impl MarketRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a market
    pub fn insert(&mut self, market: MoneyMarket) -> Result<Address> {
        let address = market.address;
        if self.markets.contains_key(&address) {
            return Err(Error::AlreadyInitialized(format!("market {}", market.symbol)));
        }
        self.markets.insert(address, market);
        Ok(address)
    }

    /// Look up a market by interest-bearing token
    pub fn get(&self, interest_token: &Address) -> Result<&MoneyMarket> {
        self.markets
            .get(interest_token)
            .ok_or_else(|| Error::MarketNotFound(interest_token.to_hex()))
    }

    /// Look up a market mutably
    pub fn get_mut(&mut self, interest_token: &Address) -> Result<&mut MoneyMarket> {
        self.markets
            .get_mut(interest_token)
            .ok_or_else(|| Error::MarketNotFound(interest_token.to_hex()))
    }

    /// Find the market of a given kind for an underlying asset
    pub fn find(&self, underlying: &Address, kind: MarketKind) -> Option<&MoneyMarket> {
        let mut candidates: Vec<&MoneyMarket> = self
            .markets
            .values()
            .filter(|m| m.underlying == *underlying && m.kind == kind)
            .collect();
        candidates.sort_by_key(|m| m.address);
        candidates.into_iter().next()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup(kind: MarketKind) -> (TokenLedger, MoneyMarket, Address) {
        let mut tokens = TokenLedger::new();
        let usdc = tokens
            .create_token(Address::derive("USDC"), "USD Coin", "USDC", 6, Address::ZERO, true)
            .unwrap();
        let market = MoneyMarket::new(Address::derive("aUSDC"), "aUSDC", usdc, kind);
        (tokens, market, usdc)
    }

    #[test]
    fn test_rebasing_accrual() {
        let (mut tokens, mut market, usdc) = setup(MarketKind::Rebasing);
        let proxy = Address::derive("proxy");
        let pool = Address::derive("pool");
        tokens.mint(&usdc, proxy, proxy, 10_000_000).unwrap();

        assert_eq!(market.supply(&mut tokens, proxy, pool, 10_000_000).unwrap(), 10_000_000);
        let interest = market.accrue(&mut tokens, FixedPoint::from_percentage(10)).unwrap();
        assert_eq!(interest, 1_000_000);
        assert_eq!(market.underlying_balance_of(&pool).unwrap(), 11_000_000);

        let out = market.redeem(&mut tokens, pool, 11_000_000, proxy).unwrap();
        assert_eq!(out, 11_000_000);
        assert_eq!(tokens.balance_of(&usdc, &market.address), 0);
    }

    #[test]
    fn test_exchange_rate_accrual() {
        let (mut tokens, market, usdc) = setup(MarketKind::ExchangeRate);
        let mut market = market.with_exchange_rate(FixedPoint::from_integer(2));
        let proxy = Address::derive("proxy");
        let pool = Address::derive("pool");
        tokens.mint(&usdc, proxy, proxy, 10_000_000).unwrap();

        assert_eq!(market.supply(&mut tokens, proxy, pool, 10_000_000).unwrap(), 5_000_000);
        market.accrue(&mut tokens, FixedPoint::from_percentage(10)).unwrap();
        assert_eq!(market.underlying_balance_of(&pool).unwrap(), 11_000_000);
        assert_eq!(market.to_interest(11_000_000, true).unwrap(), 5_000_000);
        assert_eq!(tokens.balance_of(&usdc, &market.address), 11_000_000);
    }

    #[test]
    fn test_redeem_more_than_held() {
        let (mut tokens, mut market, _) = setup(MarketKind::Rebasing);
        let pool = Address::derive("pool");
        assert!(matches!(
            market.redeem(&mut tokens, pool, 1, pool),
            Err(Error::InsufficientBalance { .. })
        ));
    }

    #[test]
    fn test_registry_find() {
        let (_, market, usdc) = setup(MarketKind::Rebasing);
        let mut markets = MarketRegistry::new();
        markets.insert(market.clone()).unwrap();
        assert!(markets.insert(market).is_err());
        assert!(markets.find(&usdc, MarketKind::Rebasing).is_some());
        assert!(markets.find(&usdc, MarketKind::ExchangeRate).is_none());
    }
}
