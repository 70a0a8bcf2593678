//! Integration test: full streaming lifecycle.
//!
//! Exercises registration, idle accrual, enrollment, and claiming across
//! epoch boundaries:
//! 1. Register a multi-epoch schedule with nobody enrolled
//! 2. Verify the sentinel account absorbs the unattended release exactly
//! 3. Sweep the spillover and verify custody pays out to the recipient
//! 4. Verify start-epoch defaulting and the registration window bounds
//! 5. Mix an idle epoch with an attended one and account for every unit

use rill_assets::{AssetLedger, InMemoryAssets};
use rill_epoch::EpochClock;
use rill_streams::{StakingStreams, StreamsError};
use rill_types::{AccountId, AssetId, UNCLAIMED_ACCOUNT};

/// 10-day epochs.
const DURATION: u64 = 10 * 24 * 3600;

/// One whole token in base units.
const TOKEN: u128 = 1_000_000;

const CUSTODY: AccountId = [0xCC; 32];
const FUNDER: AccountId = [0xF1; 32];
const ALICE: AccountId = [0xA1; 32];
const SWEEPER: AccountId = [0xE1; 32];
const STAKED: AssetId = [0x51; 32];
const REWARD: AssetId = [0x52; 32];

/// A staking-variant instance with funded actors.
fn setup() -> StakingStreams<InMemoryAssets> {
    let clock = EpochClock::new(DURATION).expect("valid epoch duration");
    let mut assets = InMemoryAssets::new();
    assets
        .mint(&REWARD, &FUNDER, 1_000_000 * TOKEN)
        .expect("fund the registrar");
    assets
        .mint(&STAKED, &ALICE, 1_000 * TOKEN)
        .expect("fund the staker");
    StakingStreams::new(clock, assets, CUSTODY)
}

#[test]
fn unattended_schedule_accrues_to_sentinel_exactly() {
    let mut streams = setup();

    // =========================================================
    // Register [5, 10, 15, 5, 10] tokens starting at epoch 2
    // =========================================================
    let registered_at = DURATION;
    let schedule = [5 * TOKEN, 10 * TOKEN, 15 * TOKEN, 5 * TOKEN, 10 * TOKEN];
    let start = streams
        .register_reward(&FUNDER, &STAKED, &REWARD, 2, &schedule, registered_at)
        .expect("registration should succeed");
    assert_eq!(start, 2);
    assert_eq!(
        streams.total_reward_registered(&STAKED, &REWARD),
        45 * TOKEN
    );
    assert_eq!(
        streams.assets().balance_of(&REWARD, &CUSTODY),
        45 * TOKEN,
        "custody must hold the full scheduled pool"
    );

    // =========================================================
    // 2.5 epochs into the schedule, nobody ever enrolled
    // =========================================================
    let now = streams.epoch_start_timestamp(2) + 2 * DURATION + DURATION / 2;
    let sentinel_earned = streams.earned_reward(&UNCLAIMED_ACCOUNT, &STAKED, &REWARD, false, now);
    assert_eq!(
        sentinel_earned,
        22 * TOKEN + TOKEN / 2,
        "5 + 10 + 15/2 tokens must sit with the sentinel"
    );

    // =========================================================
    // Sweeping transfers exactly that amount and zeroes it
    // =========================================================
    let paid = streams
        .claim_spillover(&STAKED, &REWARD, &SWEEPER, now)
        .expect("spillover claim should succeed");
    assert_eq!(paid, 22 * TOKEN + TOKEN / 2);
    assert_eq!(
        streams.assets().balance_of(&REWARD, &SWEEPER),
        22 * TOKEN + TOKEN / 2
    );
    assert_eq!(
        streams.earned_reward(&UNCLAIMED_ACCOUNT, &STAKED, &REWARD, false, now),
        0,
        "the sentinel is zeroed after the sweep"
    );
    assert_eq!(streams.total_reward_claimed(&STAKED, &REWARD), paid);

    // =========================================================
    // The remaining 2.5 epochs stay claimable for later
    // =========================================================
    let end = streams.epoch_start_timestamp(2) + 5 * DURATION;
    let rest = streams
        .claim_spillover(&STAKED, &REWARD, &SWEEPER, end)
        .expect("final sweep should succeed");
    assert_eq!(rest, 22 * TOKEN + TOKEN / 2);
    assert_eq!(
        streams.total_reward_claimed(&STAKED, &REWARD),
        45 * TOKEN,
        "every registered unit was claimed"
    );
}

#[test]
fn start_epoch_zero_defaults_to_next_epoch() {
    let mut streams = setup();
    let now = 7 * DURATION + 123;

    let start = streams
        .register_reward(&FUNDER, &STAKED, &REWARD, 0, &[TOKEN], now)
        .expect("registration should succeed");
    assert_eq!(start, 8, "epoch 0 means: start right after the current epoch");
    assert_eq!(streams.reward_amount(&STAKED, &REWARD, 8), TOKEN);
    assert_eq!(streams.reward_amount(&STAKED, &REWARD, 7), 0);
}

#[test]
fn registration_window_is_enforced() {
    let mut streams = setup();
    let now = 7 * DURATION;

    // At or before the current epoch.
    let err = streams
        .register_reward(&FUNDER, &STAKED, &REWARD, 7, &[TOKEN], now)
        .expect_err("current epoch must be rejected");
    assert!(matches!(err, StreamsError::InvalidEpoch { .. }));

    // Beyond the look-ahead window.
    let err = streams
        .register_reward(&FUNDER, &STAKED, &REWARD, 13, &[TOKEN], now)
        .expect_err("past the look-ahead bound");
    assert!(matches!(err, StreamsError::InvalidEpoch { .. }));

    // Both window edges are valid.
    streams
        .register_reward(&FUNDER, &STAKED, &REWARD, 8, &[TOKEN], now)
        .expect("first epoch after the current one");
    streams
        .register_reward(&FUNDER, &STAKED, &REWARD, 12, &[TOKEN], now)
        .expect("last epoch inside the look-ahead window");
}

#[test]
fn idle_epoch_goes_to_sentinel_and_attended_epoch_to_staker() {
    let mut streams = setup();

    // Two epochs of 10 tokens each, starting at epoch 2.
    streams
        .register_reward(&FUNDER, &STAKED, &REWARD, 2, &[10 * TOKEN, 10 * TOKEN], DURATION)
        .expect("registration should succeed");

    // Epoch 2 passes unattended; Alice arrives at its end.
    let arrival = 3 * DURATION;
    streams
        .stake(&ALICE, &STAKED, 100, arrival)
        .expect("stake should succeed");
    streams
        .enable_reward(&ALICE, &STAKED, &REWARD, arrival)
        .expect("enable should succeed");

    // Epoch 3 passes fully attended.
    let end = 4 * DURATION;
    assert_eq!(
        streams.earned_reward(&UNCLAIMED_ACCOUNT, &STAKED, &REWARD, false, end),
        10 * TOKEN,
        "the idle epoch belongs to the sentinel"
    );
    assert_eq!(
        streams.earned_reward(&ALICE, &STAKED, &REWARD, false, end),
        10 * TOKEN,
        "the attended epoch belongs to the staker"
    );

    // Every registered unit is attributable to exactly one claimant.
    let alice_paid = streams
        .claim_reward(&ALICE, &STAKED, &REWARD, &ALICE, false, end)
        .expect("claim should succeed");
    let swept = streams
        .claim_spillover(&STAKED, &REWARD, &SWEEPER, end)
        .expect("sweep should succeed");
    assert_eq!(alice_paid + swept, 20 * TOKEN);
    assert_eq!(streams.total_reward_claimed(&STAKED, &REWARD), 20 * TOKEN);
}

#[test]
fn checkpoints_at_epoch_boundaries_do_not_double_count() {
    let mut streams = setup();
    streams
        .register_reward(&FUNDER, &STAKED, &REWARD, 2, &[10 * TOKEN], DURATION)
        .expect("registration should succeed");
    streams.stake(&ALICE, &STAKED, 100, DURATION).expect("stake");
    streams
        .enable_reward(&ALICE, &STAKED, &REWARD, DURATION)
        .expect("enable");

    // Checkpoint exactly on the closing boundary, then again later:
    // the second settlement must add nothing.
    let boundary = 3 * DURATION;
    let paid = streams
        .claim_reward(&ALICE, &STAKED, &REWARD, &ALICE, false, boundary)
        .expect("claim at the boundary");
    assert_eq!(paid, 10 * TOKEN);

    let later = 5 * DURATION;
    let paid_later = streams
        .claim_reward(&ALICE, &STAKED, &REWARD, &ALICE, false, later)
        .expect("claim after the schedule ended");
    assert_eq!(paid_later, 0, "the schedule released everything already");
    assert_eq!(
        streams.earned_reward(&UNCLAIMED_ACCOUNT, &STAKED, &REWARD, false, later),
        0,
        "nothing leaked to the sentinel while the staker was enrolled"
    );
}
