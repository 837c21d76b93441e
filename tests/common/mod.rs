//! Shared fixture for integration tests.
//!
//! One EUR/USD pool over a 6-decimal USDC faucet with every registry key
//! bound. The pool lends through the rebasing market by default; the
//! exchange-rate market starts at 1.1 so its rounding is exercised.

#![allow(dead_code)]

use std::sync::Arc;

use synthpool::prelude::*;

/// One synthetic token unit
pub const TOKEN: u128 = FixedPoint::SCALE;

/// Far-future deadline
pub const DEADLINE: u64 = 4_102_444_800;

pub struct World {
    pub protocol: Protocol,
    pub feed: Arc<ManualPriceFeed>,
    pub maintainer: Address,
    pub factory: Address,
    pub manager: Address,
    pub lp: Address,
    pub dao: Address,
    pub user: Address,
    pub commission: Address,
    pub buyback: Address,
    pub usdc: Address,
    pub jeur: Address,
    pub a_usdc: Address,
    pub c_usdc: Address,
    /// Market the pool lends through
    pub market: Address,
    pub pool: Address,
}

pub fn fraction(s: &str) -> FixedPoint {
    s.parse().unwrap()
}

pub fn pool_config(w: &World, identifier: &str, synthetic: Address) -> PoolConfig {
    PoolConfig {
        price_identifier: identifier.into(),
        collateral_token: w.usdc,
        synthetic_token: synthetic,
        roles: PoolRoles {
            admin: w.maintainer,
            maintainer: w.maintainer,
            liquidity_provider: w.lp,
        },
        params: PoolParams::default().with_fee(FeeConfig::new(
            FixedPoint::from_bps(20),
            vec![w.lp, w.dao],
            vec![50, 50],
        )),
        lending: LendingConfig {
            module_id: "aave".into(),
            interest_bearing_token: None,
            dao_interest_share: FixedPoint::from_percentage(40),
            jrt_buyback_share: FixedPoint::from_percentage(50),
        },
    }
}

/// Deployed pool, funded accounts, no liquidity
pub fn world() -> World {
    world_on("aave")
}

/// [`world`] with the pool lending through `module_id`
pub fn world_on(module_id: &str) -> World {
    let maintainer = Address::derive("maintainer");
    let factory = Address::derive("factory");
    let manager = Address::derive("manager");
    let commission = Address::derive("commission");
    let buyback = Address::derive("buyback");
    let proxy = Address::derive("lending-proxy");
    let forwarder = Address::derive("forwarder");

    let config = ProtocolConfig::default();
    let mut registry = Registry::new(Address::derive("registry"), maintainer);
    for (key, address) in [
        (RegistryKey::PoolFactory, factory),
        (RegistryKey::LendingProxy, proxy),
        (RegistryKey::LendingStorageManager, Address::derive("lending-storage")),
        (RegistryKey::PriceFeed, Address::derive("price-feed")),
        (RegistryKey::Manager, manager),
        (RegistryKey::CommissionReceiver, commission),
        (RegistryKey::BuybackProgramReceiver, buyback),
        (RegistryKey::TrustedForwarder, forwarder),
    ] {
        registry
            .change_implementation_address(maintainer, key, address)
            .unwrap();
    }

    let feed = Arc::new(ManualPriceFeed::new(maintainer));
    feed.set_price(maintainer, "EUR/USD", fraction("1.2"), 0).unwrap();

    let mut lending = LendingManager::new(
        proxy,
        LendingRoles {
            admin: maintainer,
            maintainer,
        },
    );
    lending
        .set_lending_module(maintainer, "aave", LendingModuleKind::Aave(Default::default()))
        .unwrap();
    lending
        .set_lending_module(
            maintainer,
            "compound",
            LendingModuleKind::Compound(Default::default()),
        )
        .unwrap();

    let mut ctx = Context::new(
        &config,
        registry,
        feed.clone(),
        lending,
        LendingStorageManager::new(Address::derive("lending-storage")),
    );
    let usdc = ctx
        .tokens
        .create_token(Address::derive("USDC"), "USD Coin", "USDC", 6, Address::ZERO, true)
        .unwrap();
    let jeur = ctx
        .tokens
        .create_token(Address::derive("jEUR"), "Jarvis Synthetic Euro", "jEUR", 18, factory, false)
        .unwrap();
    let a_usdc = ctx
        .markets
        .insert(MoneyMarket::new(Address::derive("aUSDC"), "aUSDC", usdc, MarketKind::Rebasing))
        .unwrap();
    let c_usdc = ctx
        .markets
        .insert(
            MoneyMarket::new(Address::derive("cUSDC"), "cUSDC", usdc, MarketKind::ExchangeRate)
                .with_exchange_rate(fraction("1.1")),
        )
        .unwrap();

    let protocol = Protocol::new(&config, ctx, forwarder).unwrap();
    let mut w = World {
        protocol,
        feed,
        maintainer,
        factory,
        manager,
        lp: Address::derive("lp"),
        dao: Address::derive("dao"),
        user: Address::derive("user"),
        commission,
        buyback,
        usdc,
        jeur,
        a_usdc,
        c_usdc,
        market: if module_id == "compound" { c_usdc } else { a_usdc },
        pool: Address::derive("pool"),
    };

    let mut pool_config = pool_config(&w, "EUR/USD", jeur);
    pool_config.lending.module_id = module_id.into();
    w.protocol
        .deploy_pool(factory, w.pool, pool_config)
        .unwrap();
    for account in [w.lp, w.user] {
        faucet(&mut w, account, 1_000_000_000);
    }
    w
}

/// LP added 50 USDC and the user minted 100 jEUR with 120.24048 USDC
pub fn funded() -> World {
    funded_on("aave")
}

/// [`funded`] with the pool lending through `module_id`
pub fn funded_on(module_id: &str) -> World {
    let mut w = world_on(module_id);
    let (lp, pool) = (w.lp, w.pool);
    w.protocol.add_liquidity(lp, pool, 50_000_000).unwrap();
    let params = mint_params(&w, 120_240_480);
    let user = w.user;
    w.protocol.mint(user, pool, params).unwrap();
    w
}

pub fn faucet(w: &mut World, account: Address, amount: u128) {
    let usdc = w.usdc;
    w.protocol.faucet(&usdc, account, amount).unwrap();
}

pub fn set_price(w: &mut World, identifier: &str, price: &str) {
    let now = w.protocol.ctx().now;
    w.feed
        .set_price(w.maintainer, identifier, fraction(price), now)
        .unwrap();
}

/// Accrue interest on a market once
pub fn accrue(w: &mut World, market: Address, rate: &str) -> u128 {
    w.protocol.accrue_market(&market, fraction(rate)).unwrap()
}

pub fn mint_params(w: &World, collateral_amount: u128) -> MintParams {
    MintParams {
        min_num_tokens: 0,
        collateral_amount,
        expiration: DEADLINE,
        recipient: w.user,
    }
}

pub fn redeem_params(w: &World, num_tokens: u128) -> RedeemParams {
    RedeemParams {
        num_tokens,
        min_collateral: 0,
        expiration: DEADLINE,
        recipient: w.user,
    }
}

pub fn usdc_balance(w: &World, account: &Address) -> u128 {
    w.protocol.balance_of(&w.usdc, account)
}

pub fn assert_custody(w: &World, pool: &Address) {
    assert!(
        w.protocol.custody_matches(pool).unwrap(),
        "custody diverged from ledger for {}",
        pool
    );
}
