//! Per-account balances and earned records.
//!
//! One [`AccountRecord`] exists per (account, rewarded asset): the
//! enrolled balance, the bounded set of enabled rewards, and one
//! [`EarnedRecord`] per reward the account has ever been settled for.
//! Records are created lazily and only ever zeroed, never deleted.

use std::collections::HashMap;

use rill_types::AssetId;

use crate::rewards_set::RewardSet;
use crate::SCALER;

/// Claimable amount and accumulator snapshot for one reward.
///
/// The claimable field is deliberately narrower than the token width: the
/// registration bound keeps `total_registered` under `u64::MAX`, so every
/// reachable claimable fits, and settlement routes anything beyond the
/// width to the sentinel account instead of wrapping.
#[derive(Clone, Copy, Debug, Default)]
pub struct EarnedRecord {
    /// Amount owed to the account, in base units.
    pub(crate) claimable: u64,
    /// Distribution accumulator value at the last settlement.
    pub(crate) snapshot: u128,
}

impl EarnedRecord {
    /// Fold the accrual since the last settlement into `claimable` and
    /// move the snapshot up to `accumulator`.
    ///
    /// `balance` is the eligible balance the accrual applies to — zero
    /// when the account was not enrolled over the settled window, which
    /// fast-forwards the snapshot without earning.
    ///
    /// Returns the base units that did not fit the claimable width and
    /// belong to the sentinel account.
    pub(crate) fn settle(&mut self, accumulator: u128, balance: u128) -> u128 {
        let diff = accumulator.saturating_sub(self.snapshot);
        self.snapshot = accumulator;
        if diff == 0 || balance == 0 {
            return 0;
        }

        // diff * balance is bounded by SCALER * total_registered in every
        // reachable state: the snapshot delta only grows while `balance`
        // is counted inside total_eligible. Saturation clamps rather than
        // wraps if that invariant were ever broken.
        let earned = diff.saturating_mul(balance) / SCALER;
        let total = u128::from(self.claimable).saturating_add(earned);
        let cap = u128::from(u64::MAX);
        if total > cap {
            self.claimable = u64::MAX;
            total - cap
        } else {
            self.claimable = total as u64;
            0
        }
    }
}

/// Enrollment state of one account for one rewarded asset.
#[derive(Clone, Debug, Default)]
pub struct AccountRecord {
    /// The account's eligible quantity of the rewarded asset.
    pub(crate) balance: u128,
    /// Rewards the account is currently enrolled for.
    pub(crate) enabled: RewardSet,
    /// Settlement state per reward, created on first settlement.
    pub(crate) earned: HashMap<AssetId, EarnedRecord>,
}

impl AccountRecord {
    /// The earned record for `reward`, if the account was ever settled.
    pub(crate) fn earned(&self, reward: &AssetId) -> Option<&EarnedRecord> {
        self.earned.get(reward)
    }

    /// The earned record for `reward`, created zeroed if absent.
    pub(crate) fn earned_mut(&mut self, reward: &AssetId) -> &mut EarnedRecord {
        self.earned.entry(*reward).or_default()
    }
}
