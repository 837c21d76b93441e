//! Random operation sequences keep custody equal to the ledger.

mod common;

use common::*;
use proptest::prelude::*;
use synthpool::prelude::*;

#[derive(Debug, Clone)]
enum Op {
    Mint(u128),
    Redeem(u128),
    AddLiquidity(u128),
    WithdrawLiquidity(u128),
    IncreaseCollateral(u128, u128),
    DecreaseCollateral(u128, u128),
    Accrue(u32),
    ClaimFee(bool),
    Liquidate(u128),
    Price(u32),
    Update,
    ClaimCommission(u128),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (1u128..200_000_000).prop_map(Op::Mint),
        (1u128..150).prop_map(|n| Op::Redeem(n * TOKEN / 2)),
        (1u128..100_000_000).prop_map(Op::AddLiquidity),
        (1u128..100_000_000).prop_map(Op::WithdrawLiquidity),
        (0u128..20_000_000, 0u128..20_000_000).prop_map(|(a, b)| Op::IncreaseCollateral(a, b)),
        (0u128..20_000_000, 0u128..20_000_000).prop_map(|(a, b)| Op::DecreaseCollateral(a, b)),
        (1u32..300).prop_map(Op::Accrue),
        any::<bool>().prop_map(Op::ClaimFee),
        (1u128..150).prop_map(|n| Op::Liquidate(n * TOKEN / 2)),
        (100u32..200).prop_map(Op::Price),
        Just(Op::Update),
        (1u128..1_000_000).prop_map(Op::ClaimCommission),
    ]
}

fn apply(w: &mut World, op: &Op) {
    let (lp, dao, user, pool, maintainer, market) =
        (w.lp, w.dao, w.user, w.pool, w.maintainer, w.market);
    // individual operations may fail; only custody matters here
    let _ = match op {
        Op::Mint(amount) => {
            let params = mint_params(w, *amount);
            w.protocol.mint(user, pool, params).map(|_| ())
        }
        Op::Redeem(tokens) => {
            let params = redeem_params(w, *tokens);
            w.protocol.redeem(user, pool, params).map(|_| ())
        }
        Op::AddLiquidity(amount) => w.protocol.add_liquidity(lp, pool, *amount),
        Op::WithdrawLiquidity(amount) => w.protocol.withdraw_liquidity(lp, pool, *amount),
        Op::IncreaseCollateral(transfer, increase) => w
            .protocol
            .increase_collateral(lp, pool, *transfer, *increase)
            .map(|_| ()),
        Op::DecreaseCollateral(decrease, withdraw) => w
            .protocol
            .decrease_collateral(lp, pool, *decrease, *withdraw)
            .map(|_| ()),
        Op::Accrue(bps) => {
            let rate = FixedPoint::from_bps(u64::from(*bps));
            w.protocol.accrue_market(&market, rate).map(|_| ())
        }
        Op::ClaimFee(by_lp) => {
            let claimer = if *by_lp { lp } else { dao };
            w.protocol.claim_fee(claimer, pool).map(|_| ())
        }
        Op::Liquidate(tokens) => w.protocol.liquidate(user, pool, *tokens).map(|_| ()),
        Op::Price(cents) => {
            let price = FixedPoint::from_percentage(u64::from(*cents));
            let now = w.protocol.ctx().now;
            w.feed.set_price(maintainer, "EUR/USD", price, now)
        }
        Op::Update => w.protocol.update_accumulated_interest(pool).map(|_| ()),
        Op::ClaimCommission(amount) => w
            .protocol
            .batch_claim_commission(maintainer, &[pool], &[*amount])
            .map(|_| ()),
    };
}

fn run_tracked(mut w: World, ops: &[Op]) -> std::result::Result<(), TestCaseError> {
    let pool = w.pool;
    for op in ops {
        apply(&mut w, op);
        prop_assert!(w.protocol.custody_matches(&pool).unwrap(), "after {:?}", op);
    }
    Ok(())
}

fn run_to_shutdown(mut w: World, ops: &[Op], accrual: u32) -> std::result::Result<(), TestCaseError> {
    for op in ops {
        apply(&mut w, op);
    }
    let (manager, user, lp, pool) = (w.manager, w.user, w.lp, w.pool);
    if w.protocol.emergency_shutdown(manager, pool).is_ok() {
        apply(&mut w, &Op::Accrue(accrual));
        let _ = w.protocol.settle_emergency_shutdown(user, pool);
        prop_assert!(w.protocol.custody_matches(&pool).unwrap());
        let _ = w.protocol.settle_emergency_shutdown(lp, pool);
        prop_assert!(w.protocol.custody_matches(&pool).unwrap());
    }
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn custody_tracks_ledger(ops in prop::collection::vec(op(), 1..40)) {
        run_tracked(world(), &ops)?;
    }

    #[test]
    fn custody_tracks_ledger_on_exchange_rate_market(ops in prop::collection::vec(op(), 1..40)) {
        run_tracked(world_on("compound"), &ops)?;
    }

    #[test]
    fn custody_survives_shutdown(
        ops in prop::collection::vec(op(), 1..20),
        accrual in 1u32..300,
    ) {
        run_to_shutdown(funded(), &ops, accrual)?;
    }

    #[test]
    fn custody_survives_shutdown_on_exchange_rate_market(
        ops in prop::collection::vec(op(), 1..20),
        accrual in 1u32..300,
    ) {
        run_to_shutdown(funded_on("compound"), &ops, accrual)?;
    }
}
