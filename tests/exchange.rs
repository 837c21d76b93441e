//! Cross-pool exchange.

mod common;

use common::*;
use synthpool::prelude::*;

/// Adds a GBP/USD pool over the same collateral, with 50 USDC of liquidity
fn with_gbp_pool(w: &mut World) -> (Address, Address) {
    let (factory, lp, maintainer) = (w.factory, w.lp, w.maintainer);
    let jgbp = w
        .protocol
        .create_token(Address::derive("jGBP"), "Jarvis Synthetic Pound", "jGBP", 18, factory, false)
        .unwrap();
    w.feed.set_price(maintainer, "GBP/USD", fraction("1.5"), 0).unwrap();
    let gbp_pool = Address::derive("gbp-pool");
    let config = pool_config(w, "GBP/USD", jgbp);
    w.protocol.deploy_pool(factory, gbp_pool, config).unwrap();
    w.protocol.add_liquidity(lp, gbp_pool, 50_000_000).unwrap();
    (gbp_pool, jgbp)
}

fn exchange_params(w: &World, dest_pool: Address, num_tokens: u128) -> ExchangeParams {
    ExchangeParams {
        dest_pool,
        num_tokens,
        min_dest_num_tokens: 0,
        expiration: DEADLINE,
        recipient: w.user,
    }
}

#[test]
fn test_exchange_moves_collateral_between_pools() {
    let mut w = funded();
    let (gbp_pool, jgbp) = with_gbp_pool(&mut w);
    let (user, pool) = (w.user, w.pool);

    let params = exchange_params(&w, gbp_pool, 50 * TOKEN);
    let outcome = w.protocol.exchange(user, pool, params).unwrap();
    // 60 USDC released, 0.12 fee, 59.88 re-priced at 1.5
    assert_eq!(outcome.fee_paid, 120_000);
    assert_eq!(outcome.dest_num_tokens, 3_992 * TOKEN / 100);
    assert_eq!(w.protocol.balance_of(&jgbp, &user), 3_992 * TOKEN / 100);
    assert_eq!(w.protocol.balance_of(&w.jeur, &user), 50 * TOKEN);

    let source = w.protocol.position_info(&pool).unwrap();
    assert_eq!(source.total_synthetic_tokens, 50 * TOKEN);
    assert_eq!(source.total_collateral, 75_000_000);
    assert_eq!(source.available_liquidity, 35_000_000);

    let dest = w.protocol.position_info(&gbp_pool).unwrap();
    assert_eq!(dest.total_collateral, 59_880_000 + 14_970_000);
    assert_eq!(dest.available_liquidity, 50_000_000 - 14_970_000);
    assert_eq!(dest.total_fees, 0);

    assert!(matches!(
        w.protocol.events().last().unwrap().event,
        Event::Exchange { .. }
    ));
    assert_custody(&w, &pool);
    assert_custody(&w, &gbp_pool);
}

#[test]
fn test_exchange_into_same_pool_rejected() {
    let mut w = funded();
    let (user, pool) = (w.user, w.pool);
    let params = exchange_params(&w, pool, TOKEN);
    assert!(matches!(
        w.protocol.exchange(user, pool, params),
        Err(Error::ConfigMismatch(_))
    ));
}

#[test]
fn test_exchange_requires_same_collateral() {
    let mut w = funded();
    let (factory, maintainer, user, pool) = (w.factory, w.maintainer, w.user, w.pool);
    let dai = w
        .protocol
        .create_token(Address::derive("DAI"), "Dai", "DAI", 18, Address::ZERO, true)
        .unwrap();
    w.protocol
        .add_market(MoneyMarket::new(Address::derive("aDAI"), "aDAI", dai, MarketKind::Rebasing))
        .unwrap();
    let jchf = w
        .protocol
        .create_token(Address::derive("jCHF"), "Jarvis Synthetic Franc", "jCHF", 18, factory, false)
        .unwrap();
    w.feed.set_price(maintainer, "CHF/USD", fraction("1.1"), 0).unwrap();

    let mut config = pool_config(&w, "CHF/USD", jchf);
    config.collateral_token = dai;
    let chf_pool = Address::derive("chf-pool");
    w.protocol.deploy_pool(factory, chf_pool, config).unwrap();

    let params = exchange_params(&w, chf_pool, TOKEN);
    assert!(matches!(
        w.protocol.exchange(user, pool, params),
        Err(Error::ConfigMismatch(_))
    ));
}

#[test]
fn test_failed_destination_leg_rolls_back_source() {
    let mut w = funded();
    let (gbp_pool, jgbp) = with_gbp_pool(&mut w);
    let (user, pool) = (w.user, w.pool);
    let source = w.protocol.position_info(&pool).unwrap();
    let dest = w.protocol.position_info(&gbp_pool).unwrap();
    let events = w.protocol.events().len();

    let mut params = exchange_params(&w, gbp_pool, 50 * TOKEN);
    params.min_dest_num_tokens = 40 * TOKEN;
    assert!(matches!(
        w.protocol.exchange(user, pool, params),
        Err(Error::SlippageExceeded { .. })
    ));

    assert_eq!(w.protocol.position_info(&pool).unwrap(), source);
    assert_eq!(w.protocol.position_info(&gbp_pool).unwrap(), dest);
    assert_eq!(w.protocol.balance_of(&w.jeur, &user), 100 * TOKEN);
    assert_eq!(w.protocol.balance_of(&jgbp, &user), 0);
    assert_eq!(w.protocol.events().len(), events);
}

#[test]
fn test_exchange_via_calldata() {
    let mut w = funded();
    let (gbp_pool, jgbp) = with_gbp_pool(&mut w);
    let (user, pool) = (w.user, w.pool);
    let data = PoolCall::Exchange(exchange_params(&w, gbp_pool, 10 * TOKEN)).encode();
    w.protocol.call(user, pool, &data).unwrap();
    assert!(w.protocol.balance_of(&jgbp, &user) > 0);
    assert_custody(&w, &pool);
    assert_custody(&w, &gbp_pool);
}
