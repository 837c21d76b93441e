//! Adapter for rebasing markets.
//!
//! Interest-bearing balances track underlying 1:1, so quotes are the identity
//! and deposits and withdrawals are exact.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::lending::market::{MarketKind, MarketRegistry, MoneyMarket};
use crate::lending::module::{
    DepositReceipt, LendingModule, MarketAccess, QuoteKind, WithdrawReceipt,
};
use crate::utils::crypto::Address;

/// Rebasing market adapter
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AaveModule {}

impl AaveModule {
    /// Create the adapter
    pub fn new() -> Self {
        Self {}
    }

    fn market<'m>(&self, markets: &'m MarketRegistry, token: &Address) -> Result<&'m MoneyMarket> {
        let market = markets.get(token)?;
        if market.kind != MarketKind::Rebasing {
            return Err(Error::ConfigMismatch(format!(
                "{} is not a rebasing market",
                market.symbol
            )));
        }
        Ok(market)
    }
}

impl LendingModule for AaveModule {
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
            balance_after: market.balance_of(&pool),
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
            balance_after: market.balance_of(&pool),
        })
    }

    fn total_balance(
        &self,
        markets: &MarketRegistry,
        pool: Address,
        interest_token: Address,
    ) -> Result<u128> {
        Ok(self.market(markets, &interest_token)?.balance_of(&pool))
    }

    fn interest_bearing_token(
        &self,
        markets: &MarketRegistry,
        collateral: Address,
    ) -> Result<Address> {
        markets
            .find(&collateral, MarketKind::Rebasing)
            .map(|m| m.address)
            .ok_or_else(|| Error::MarketNotFound(format!("rebasing market for {}", collateral)))
    }

    fn quote(
        &self,
        markets: &MarketRegistry,
        interest_token: Address,
        amount: u128,
        _kind: QuoteKind,
    ) -> Result<u128> {
        self.market(markets, &interest_token)?;
        Ok(amount)
    }

    fn interest_to_collateral(
        &self,
        markets: &MarketRegistry,
        interest_token: Address,
        interest_amount: u128,
    ) -> Result<u128> {
        self.market(markets, &interest_token)?;
        Ok(interest_amount)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::token::TokenLedger;
    use crate::utils::math::FixedPoint;

    #[test]
    fn test_deposit_withdraw_exact() {
        let mut tokens = TokenLedger::new();
        let usdc = tokens
            .create_token(Address::derive("USDC"), "USD Coin", "USDC", 6, Address::ZERO, true)
            .unwrap();
        let mut markets = MarketRegistry::new();
        let a_usdc = markets
            .insert(MoneyMarket::new(Address::derive("aUSDC"), "aUSDC", usdc, MarketKind::Rebasing))
            .unwrap();
        let proxy = Address::derive("proxy");
        let pool = Address::derive("pool");
        tokens.mint(&usdc, proxy, proxy, 500).unwrap();

        let module = AaveModule::new();
        assert_eq!(module.interest_bearing_token(&markets, usdc).unwrap(), a_usdc);

        let mut access = MarketAccess {
            markets: &mut markets,
            tokens: &mut tokens,
        };
        let receipt = module.deposit(&mut access, proxy, pool, a_usdc, 500).unwrap();
        assert_eq!(receipt.interest_tokens_minted, 500);
        assert_eq!(receipt.balance_after, 500);

        access
            .markets
            .get_mut(&a_usdc)
            .unwrap()
            .accrue(access.tokens, FixedPoint::from_percentage(10))
            .unwrap();

        let receipt = module.withdraw(&mut access, pool, a_usdc, 200, proxy).unwrap();
        assert_eq!(receipt.collateral_out, 200);
        assert_eq!(receipt.balance_after, 350);
        assert_eq!(module.quote(&markets, a_usdc, 77, QuoteKind::ExactOut).unwrap(), 77);
    }
}
