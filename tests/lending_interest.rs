//! Lending yield: realization, DAO claims and migrations.

mod common;

use common::*;
use synthpool::lending::swap::FixedRateSwap;
use synthpool::prelude::*;

/// LP supplied 100 USDC and the market accrued 1 USDC on it
fn accrued() -> World {
    let mut w = world();
    let (lp, pool, a_usdc) = (w.lp, w.pool, w.a_usdc);
    w.protocol.add_liquidity(lp, pool, 100_000_000).unwrap();
    assert_eq!(accrue(&mut w, a_usdc, "0.01"), 1_000_000);
    w
}

#[test]
fn test_pending_interest_preview() {
    let w = accrued();
    let pending = w.protocol.get_accumulated_interest(&w.pool).unwrap();
    assert_eq!(pending.pool_interest, 600_000);
    assert_eq!(pending.dao_interest, 400_000);
    assert_eq!(pending.collateral_deposited, 100_000_000);
}

#[test]
fn test_deposit_realizes_interest_split() {
    let mut w = accrued();
    let (lp, pool) = (w.lp, w.pool);
    w.protocol.add_liquidity(lp, pool, 10_000_000).unwrap();

    let storage = w.protocol.ctx().lending_storage.pool_storage(&pool).unwrap().clone();
    assert_eq!(storage.collateral_deposited, 110_600_000);
    assert_eq!(storage.unclaimed_dao_jrt, 200_000);
    assert_eq!(storage.unclaimed_dao_commission, 200_000);

    let info = w.protocol.position_info(&pool).unwrap();
    assert_eq!(info.available_liquidity, 110_600_000);
    let credited = w.protocol.events().filter_by_type("InterestCredited");
    assert_eq!(credited.len(), 1);
    assert_custody(&w, &pool);
}

#[test]
fn test_update_accumulated_interest() {
    let mut w = accrued();
    let pool = w.pool;
    let values = w.protocol.update_accumulated_interest(pool).unwrap();
    assert_eq!(values.pool_interest, 600_000);
    assert_eq!(values.dao_interest, 400_000);

    let again = w.protocol.update_accumulated_interest(pool).unwrap();
    assert_eq!(again.pool_interest, 0);
    assert_eq!(
        w.protocol.position_info(&pool).unwrap().available_liquidity,
        100_600_000
    );
    assert_custody(&w, &pool);
}

#[test]
fn test_commission_claim() {
    let mut w = accrued();
    let (maintainer, user, pool, commission) = (w.maintainer, w.user, w.pool, w.commission);

    assert_eq!(
        w.protocol.batch_claim_commission(user, &[pool], &[100_000]),
        Err(Error::SenderMustBeMaintainer)
    );
    assert!(matches!(
        w.protocol.batch_claim_commission(maintainer, &[pool], &[200_001]),
        Err(Error::ClaimExceedsAccrued { .. })
    ));

    w.protocol
        .batch_claim_commission(maintainer, &[pool], &[200_000])
        .unwrap();
    assert_eq!(usdc_balance(&w, &commission), 200_000);
    let storage = w.protocol.ctx().lending_storage.pool_storage(&pool).unwrap();
    assert_eq!(storage.unclaimed_dao_commission, 0);
    assert_eq!(storage.unclaimed_dao_jrt, 200_000);
    // the claim realized the pool's 600k as well
    assert_eq!(
        w.protocol.position_info(&pool).unwrap().available_liquidity,
        100_600_000
    );
    assert_custody(&w, &pool);
}

#[test]
fn test_buyback_swaps_into_reward_token() {
    let mut w = accrued();
    let (maintainer, pool, usdc, buyback) = (w.maintainer, w.pool, w.usdc, w.buyback);
    let jrt = w
        .protocol
        .create_token(Address::derive("JRT"), "Jarvis Reward Token", "JRT", 18, Address::ZERO, true)
        .unwrap();
    let swap = FixedRateSwap::new(Address::derive("swap"), jrt, FixedPoint::from_integer(2));
    w.protocol.faucet(&jrt, swap.address, 1_000_000).unwrap();

    assert!(matches!(
        w.protocol.batch_buyback(maintainer, &[pool], &[200_000], usdc, 0),
        Err(Error::ConfigMismatch(_))
    ));
    w.protocol.set_swap_module(maintainer, usdc, swap).unwrap();
    assert!(matches!(
        w.protocol.batch_buyback(maintainer, &[pool], &[200_000], usdc, 400_001),
        Err(Error::SlippageExceeded { .. })
    ));

    let out = w
        .protocol
        .batch_buyback(maintainer, &[pool], &[200_000], usdc, 400_000)
        .unwrap();
    assert_eq!(out, 400_000);
    assert_eq!(w.protocol.balance_of(&jrt, &buyback), 400_000);
    let storage = w.protocol.ctx().lending_storage.pool_storage(&pool).unwrap();
    assert_eq!(storage.unclaimed_dao_jrt, 0);
    assert_custody(&w, &pool);
}

#[test]
fn test_set_shares_realizes_under_old_split() {
    let mut w = accrued();
    let (maintainer, pool, a_usdc) = (w.maintainer, w.pool, w.a_usdc);
    let split = w
        .protocol
        .set_shares(maintainer, pool, fraction("0.5"), fraction("0.5"))
        .unwrap();
    assert_eq!(split.pool_interest, 600_000);

    // 101 USDC in the market now; 1% more split 50/50
    assert_eq!(accrue(&mut w, a_usdc, "0.01"), 1_010_000);
    let values = w.protocol.update_accumulated_interest(pool).unwrap();
    assert_eq!(values.pool_interest, 505_000);
    assert_eq!(values.dao_interest, 505_000);
    assert_custody(&w, &pool);
}

#[test]
fn test_migrate_lending_module() {
    let mut w = funded();
    let (maintainer, user, pool, a_usdc) = (w.maintainer, w.user, w.pool, w.a_usdc);
    accrue(&mut w, a_usdc, "0.01");

    assert_eq!(
        w.protocol.migrate_lending_module(user, pool, "compound", None),
        Err(Error::SenderMustBeMaintainer)
    );
    let values = w
        .protocol
        .migrate_lending_module(maintainer, pool, "compound", None)
        .unwrap();
    assert_eq!(values.pool_interest, 1_020_000);
    assert_eq!(values.prev_total_collateral, 170_000_000);

    let storage = w.protocol.ctx().lending_storage.pool_storage(&pool).unwrap().clone();
    assert_eq!(storage.lending_module_id, "compound");
    assert_eq!(storage.interest_bearing_token, Address::derive("cUSDC"));
    // cUSDC is at 1.1, so the move rounds; storage keeps only what landed
    assert_eq!(values.actual_total_collateral, storage.collateral_deposited);
    assert_eq!(w.protocol.ctx().markets.get(&a_usdc).unwrap().balance_of(&pool), 0);
    assert_custody(&w, &pool);

    // the pool keeps working on the new market
    let params = redeem_params(&w, 10 * TOKEN);
    w.protocol.redeem(user, pool, params).unwrap();
    assert_custody(&w, &pool);
}

#[test]
fn test_migrate_pool_moves_storage() {
    let mut w = funded();
    let (factory, user, pool) = (w.factory, w.user, w.pool);
    let before = w.protocol.ctx().lending_storage.pool_storage(&pool).unwrap().clone();
    let new_pool = Address::derive("pool-v2");

    assert!(w.protocol.migrate_pool(user, pool, new_pool).is_err());
    w.protocol.migrate_pool(factory, pool, new_pool).unwrap();

    assert!(!w.protocol.ctx().lending_storage.contains(&pool));
    let after = w.protocol.ctx().lending_storage.pool_storage(&new_pool).unwrap();
    assert_eq!(after.collateral_deposited, before.collateral_deposited);
    assert!(matches!(w.protocol.pool(&pool), Err(Error::PoolNotFound(_))));
    assert_eq!(usdc_balance(&w, &pool), 0);
    assert_custody(&w, &new_pool);

    let params = mint_params(&w, 12_024_048);
    let outcome = w.protocol.mint(user, new_pool, params).unwrap();
    assert_eq!(outcome.num_tokens, 10 * TOKEN);
    assert_custody(&w, &new_pool);
}

#[test]
fn test_exchange_rate_market_round_trip() {
    let mut w = world_on("compound");
    let (lp, user, pool, jeur) = (w.lp, w.user, w.pool, w.jeur);
    // 1.1 underlying per cToken: 15_151_530 cTokens are worth 16_666_683, two short
    for _ in 0..5 {
        w.protocol.add_liquidity(lp, pool, 3_333_337).unwrap();
        assert_custody(&w, &pool);
    }
    assert_eq!(
        w.protocol.position_info(&pool).unwrap().available_liquidity,
        16_666_683
    );

    let params = mint_params(&w, 12_345_677);
    w.protocol.mint(user, pool, params).unwrap();
    assert_custody(&w, &pool);

    let minted = w.protocol.balance_of(&jeur, &user);
    let params = redeem_params(&w, minted);
    w.protocol.redeem(user, pool, params).unwrap();
    assert_custody(&w, &pool);

    let info = w.protocol.position_info(&pool).unwrap();
    assert_eq!(info.total_synthetic_tokens, 0);
    w.protocol
        .withdraw_liquidity(lp, pool, info.available_liquidity)
        .unwrap();
    assert_custody(&w, &pool);

    let storage = w.protocol.ctx().lending_storage.pool_storage(&pool).unwrap();
    assert_eq!(storage.collateral_deposited, 0);
    assert_eq!(w.protocol.position_info(&pool).unwrap().available_liquidity, 0);
}
