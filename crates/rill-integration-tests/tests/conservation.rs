//! Integration test: conservation and monotonicity under random load.
//!
//! Drives a staking-variant instance through randomized operation
//! sequences and checks the global accounting properties:
//! 1. `total_claimed` and `total_registered` never decrease
//! 2. `total_claimed` never exceeds `total_registered`
//! 3. Once every epoch has elapsed and every claimant settles, the pool
//!    is paid out in full, up to sub-unit rounding dust bounded by the
//!    number of settlements

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use rill_assets::{AssetLedger, InMemoryAssets};
use rill_epoch::EpochClock;
use rill_streams::{StakingStreams, MAX_EPOCHS_AHEAD};
use rill_types::{AccountId, AssetId};

/// 10-day epochs.
const DURATION: u64 = 10 * 24 * 3600;

const CUSTODY: AccountId = [0xCC; 32];
const FUNDER: AccountId = [0xF1; 32];
const COLLECTOR: AccountId = [0xD1; 32];
const ACTORS: [AccountId; 3] = [[0xA1; 32], [0xB1; 32], [0xC1; 32]];
const STAKED: AssetId = [0x51; 32];
const REWARD: AssetId = [0x52; 32];

const OPS_PER_RUN: usize = 200;

fn setup() -> StakingStreams<InMemoryAssets> {
    let clock = EpochClock::new(DURATION).expect("valid epoch duration");
    let mut assets = InMemoryAssets::new();
    assets
        .mint(&REWARD, &FUNDER, u128::MAX / 4)
        .expect("fund the registrar");
    for actor in &ACTORS {
        assets
            .mint(&STAKED, actor, 1_000_000_000)
            .expect("fund the actors");
    }
    StakingStreams::new(clock, assets, CUSTODY)
}

#[test]
fn random_operation_sequences_conserve_the_pool() {
    for seed in [7u64, 1312, 990_017] {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut streams = setup();
        let mut now = DURATION;
        let mut settlements: u128 = 0;

        let mut last_registered = 0u128;
        let mut last_claimed = 0u128;

        for _ in 0..OPS_PER_RUN {
            let actor = ACTORS[rng.gen_range(0..ACTORS.len())];
            match rng.gen_range(0..7u8) {
                // Register a short schedule.
                0 => {
                    let len = rng.gen_range(1..=3usize);
                    let amounts: Vec<u128> =
                        (0..len).map(|_| rng.gen_range(1..=1_000_000u128)).collect();
                    streams
                        .register_reward(&FUNDER, &STAKED, &REWARD, 0, &amounts, now)
                        .expect("valid registration should succeed");
                }
                // Stake a modest amount.
                1 => {
                    let amount = rng.gen_range(1..=1_000u128);
                    streams
                        .stake(&actor, &STAKED, amount, now)
                        .expect("funded stake should succeed");
                    settlements += 1;
                }
                // Unstake part of whatever is staked.
                2 => {
                    let staked = streams.balance_of(&actor, &STAKED);
                    if staked > 0 {
                        let amount = rng.gen_range(1..=staked);
                        streams
                            .unstake(&actor, &STAKED, amount, &actor, rng.gen_bool(0.2), now)
                            .expect("covered unstake should succeed");
                        settlements += 1;
                    }
                }
                // Enroll (idempotent).
                3 => {
                    streams
                        .enable_reward(&actor, &STAKED, &REWARD, now)
                        .expect("enable should succeed");
                    settlements += 1;
                }
                // Withdraw enrollment, sometimes forfeiting.
                4 => {
                    streams
                        .disable_reward(&actor, &STAKED, &REWARD, rng.gen_bool(0.2), now)
                        .expect("disable should succeed");
                    settlements += 1;
                }
                // Claim whatever is pending.
                5 => {
                    streams
                        .claim_reward(&actor, &STAKED, &REWARD, &COLLECTOR, false, now)
                        .expect("claim should succeed");
                    settlements += 1;
                }
                // Let time pass (also poke the accumulator now and then).
                _ => {
                    now += rng.gen_range(1..=2 * DURATION);
                    if rng.gen_bool(0.3) {
                        streams.update_reward(&STAKED, &REWARD, now);
                        settlements += 1;
                    }
                }
            }

            // Monotonicity holds after every single operation.
            let registered = streams.total_reward_registered(&STAKED, &REWARD);
            let claimed = streams.total_reward_claimed(&STAKED, &REWARD);
            assert!(registered >= last_registered, "registered never decreases");
            assert!(claimed >= last_claimed, "claimed never decreases");
            assert!(claimed <= registered, "claimed never exceeds registered");
            last_registered = registered;
            last_claimed = claimed;
        }

        // ========================================================
        // Drain: run past every schedule, settle every claimant
        // ========================================================
        let drained_at = now + (MAX_EPOCHS_AHEAD + 4) * DURATION;
        for actor in &ACTORS {
            streams
                .claim_reward(actor, &STAKED, &REWARD, &COLLECTOR, false, drained_at)
                .expect("draining claim should succeed");
            settlements += 1;
        }
        streams
            .claim_spillover(&STAKED, &REWARD, &COLLECTOR, drained_at)
            .expect("draining sweep should succeed");
        settlements += 1;

        let registered = streams.total_reward_registered(&STAKED, &REWARD);
        let claimed = streams.total_reward_claimed(&STAKED, &REWARD);
        assert!(claimed <= registered, "seed {seed}: claims exceed the pool");
        // Each settlement truncates below one base unit, and at most one
        // more unit can sit in the spillover residual.
        assert!(
            registered - claimed <= settlements + 1,
            "seed {seed}: more than rounding dust went missing: \
             registered {registered}, claimed {claimed}, settlements {settlements}"
        );

        // What was claimed is what the collector physically holds.
        assert_eq!(
            streams.assets().balance_of(&REWARD, &COLLECTOR),
            claimed,
            "seed {seed}: ledger balance must match the claimed total"
        );
    }
}

#[test]
fn forfeited_accrual_is_never_lost() {
    // A forfeiting disable must leave the forfeited release claimable by
    // the remaining participants or the sentinel, never burned.
    let mut streams = setup();
    streams
        .register_reward(&FUNDER, &STAKED, &REWARD, 2, &[1_000_000], DURATION)
        .expect("registration should succeed");

    let actor = ACTORS[0];
    streams
        .stake(&actor, &STAKED, 500, DURATION)
        .expect("stake should succeed");
    streams
        .enable_reward(&actor, &STAKED, &REWARD, DURATION)
        .expect("enable should succeed");

    // The whole epoch elapses; the sole staker forfeits on the way out.
    let now = 3 * DURATION;
    streams
        .disable_reward(&actor, &STAKED, &REWARD, true, now)
        .expect("forfeiting disable should succeed");
    assert_eq!(
        streams.earned_reward(&actor, &STAKED, &REWARD, false, now),
        0,
        "the forfeiter walks away with nothing"
    );

    // With nobody eligible any more, the next checkpoint routes the whole
    // release to the sentinel.
    let swept = streams
        .claim_spillover(&STAKED, &REWARD, &COLLECTOR, now + 1)
        .expect("sweep should succeed");
    assert_eq!(swept, 1_000_000, "the forfeited epoch is fully recovered");
}
