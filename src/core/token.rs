//! Fungible token ledger.
//!
//! A minimal multi-token balance book standing in for on-chain token
//! contracts:
//! - Token creation with symbol and decimals
//! - Minting and burning gated by minter roles
//! - Transfers between accounts
//!
//! Faucet tokens let anyone mint, which is how tests and simulations fund
//! accounts and generate money-market interest. Allowances are not modelled:
//! a component moving tokens on a caller's behalf is trusted by construction.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

use crate::error::{Error, Result};
use crate::utils::crypto::Address;
use crate::utils::math::{safe_add, safe_sub};

// ═══════════════════════════════════════════════════════════════════════════════
// TOKEN
// ═══════════════════════════════════════════════════════════════════════════════

/// One fungible token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Token {
    /// Token address
    pub address: Address,
    /// Display name
    pub name: String,
    /// Ticker symbol
    pub symbol: String,
    /// Decimals of the smallest unit
    pub decimals: u8,
    /// Account allowed to grant minter roles
    pub admin: Address,
    /// Accounts allowed to mint and burn
    minters: BTreeSet<Address>,
    /// Anyone may mint
    faucet: bool,
    total_supply: u128,
    balances: HashMap<Address, u128>,
}

impl Token {
    /// Balance of an account
    pub fn balance_of(&self, account: &Address) -> u128 {
        self.balances.get(account).copied().unwrap_or(0)
    }

    /// Total supply
    pub fn total_supply(&self) -> u128 {
        self.total_supply
    }

    /// Check whether an account may mint and burn
    pub fn is_minter(&self, account: &Address) -> bool {
        self.faucet || self.minters.contains(account)
    }

    /// Anyone may mint
    pub fn is_faucet(&self) -> bool {
        self.faucet
    }

    fn debit(&mut self, account: Address, amount: u128) -> Result<()> {
        let available = self.balance_of(&account);
        if available < amount {
            return Err(Error::InsufficientBalance {
                token: self.symbol.clone(),
                required: amount,
                available,
            });
        }
        let remaining = available - amount;
        if remaining == 0 {
            self.balances.remove(&account);
        } else {
            self.balances.insert(account, remaining);
        }
        Ok(())
    }

    fn credit(&mut self, account: Address, amount: u128) -> Result<()> {
        let balance = safe_add(self.balance_of(&account), amount)?;
        if balance > 0 {
            self.balances.insert(account, balance);
        }
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TOKEN LEDGER
// ═══════════════════════════════════════════════════════════════════════════════

/// Every token the engine knows about
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenLedger {
    tokens: HashMap<Address, Token>,
}

impl TokenLedger {
    /// Create an empty ledger
    pub fn new() -> Self {
        Self::default()
    }

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
        if self.tokens.contains_key(&address) {
            return Err(Error::AlreadyInitialized(format!("token {}", symbol)));
        }
        self.tokens.insert(
            address,
            Token {
                address,
                name: name.to_string(),
                symbol: symbol.to_string(),
                decimals,
                admin,
                minters: BTreeSet::new(),
                faucet,
                total_supply: 0,
                balances: HashMap::new(),
            },
        );
        Ok(address)
    }

    /// Look up a token
    pub fn token(&self, address: &Address) -> Result<&Token> {
        self.tokens
            .get(address)
            .ok_or_else(|| Error::TokenNotFound(address.to_hex()))
    }

    fn token_mut(&mut self, address: &Address) -> Result<&mut Token> {
        self.tokens
            .get_mut(address)
            .ok_or_else(|| Error::TokenNotFound(address.to_hex()))
    }

    /// Balance of `account` in `token` (zero for unknown tokens)
    pub fn balance_of(&self, token: &Address, account: &Address) -> u128 {
        self.tokens
            .get(token)
            .map(|t| t.balance_of(account))
            .unwrap_or(0)
    }

    /// Total supply of a token
    pub fn total_supply(&self, token: &Address) -> Result<u128> {
        Ok(self.token(token)?.total_supply)
    }

    /// Decimals of a token
    pub fn decimals(&self, token: &Address) -> Result<u8> {
        Ok(self.token(token)?.decimals)
    }

    /// Symbol of a token
    pub fn symbol(&self, token: &Address) -> Result<String> {
        Ok(self.token(token)?.symbol.clone())
    }

    /// Grant the minter role; only the token admin may do this
    pub fn add_minter(&mut self, token: &Address, sender: Address, minter: Address) -> Result<()> {
        let token = self.token_mut(token)?;
        if sender != token.admin {
            return Err(Error::NotAllowed(format!(
                "{} is not admin of {}",
                sender, token.symbol
            )));
        }
        token.minters.insert(minter);
        Ok(())
    }

    /// Move tokens between accounts
    pub fn transfer(
        &mut self,
        token: &Address,
        from: Address,
        to: Address,
        amount: u128,
    ) -> Result<()> {
        if amount == 0 || from == to {
            return Ok(());
        }
        let token = self.token_mut(token)?;
        token.debit(from, amount)?;
        token.credit(to, amount)
    }

    /// Mint a faucet token to `to`
    pub fn faucet(&mut self, token: &Address, to: Address, amount: u128) -> Result<()> {
        let token = self.token_mut(token)?;
        if !token.faucet {
            return Err(Error::NotAllowed(format!("{} has no faucet", token.symbol)));
        }
        token.total_supply = safe_add(token.total_supply, amount)?;
        token.credit(to, amount)
    }

    /// Create new tokens
    pub fn mint(&mut self, token: &Address, minter: Address, to: Address, amount: u128) -> Result<()> {
        let token = self.token_mut(token)?;
        if !token.is_minter(&minter) {
            return Err(Error::NotAllowed(format!(
                "{} cannot mint {}",
                minter, token.symbol
            )));
        }
        token.total_supply = safe_add(token.total_supply, amount)?;
        token.credit(to, amount)
    }

    /// Destroy tokens held by `from`
    pub fn burn(&mut self, token: &Address, burner: Address, from: Address, amount: u128) -> Result<()> {
        let token = self.token_mut(token)?;
        if !token.is_minter(&burner) {
            return Err(Error::NotAllowed(format!(
                "{} cannot burn {}",
                burner, token.symbol
            )));
        }
        token.debit(from, amount)?;
        token.total_supply = safe_sub(token.total_supply, amount)?;
        Ok(())
    }
}
