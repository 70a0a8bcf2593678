//! The reward streams orchestrator.
//!
//! [`RewardStreams`] owns the distribution and account maps, the epoch
//! clock, and the custody identity on the asset ledger. It is generic over
//! two collaborators:
//!
//! - the [`AssetLedger`](rill_assets::AssetLedger) that physically holds
//!   balances (untrusted — deltas are verified around every pull), and
//! - a [`BalanceSource`] marker selecting how the rewarded asset's
//!   eligible balance changes: [`Custodial`] (stake/unstake against this
//!   system's custody) or [`Tracked`] (mirrored from an external ledger
//!   through a hook).
//!
//! Everything except the balance-change entry points is shared between the
//! two variants. Every mutating operation checkpoints — folds elapsed time
//! into the distribution accumulator and settles the acting account —
//! before it mutates eligibility, balances, or custody.

use std::collections::HashMap;
use std::marker::PhantomData;

use rill_assets::AssetLedger;
use rill_epoch::EpochClock;
use rill_types::{id_hex, AccountId, AssetId, UNCLAIMED_ACCOUNT};

use crate::account::AccountRecord;
use crate::distribution::Distribution;
use crate::{
    Result, StreamsError, MAX_DISTRIBUTION_LENGTH, MAX_EPOCHS_AHEAD, MAX_REWARDS_ENABLED, SCALER,
};

/// Marker for how the eligible balance of a rewarded asset is tracked.
pub trait BalanceSource {}

/// The rewarded asset is held in custody here; balances change through
/// [`stake`](RewardStreams::stake) and [`unstake`](RewardStreams::unstake).
pub struct Custodial;

/// The rewarded asset lives in an external ledger that reports every
/// balance mutation through
/// [`balance_hook`](RewardStreams::balance_hook).
pub struct Tracked;

impl BalanceSource for Custodial {}
impl BalanceSource for Tracked {}

/// Streams with custodial balance tracking.
pub type StakingStreams<L> = RewardStreams<L, Custodial>;

/// Streams with hook-driven balance tracking.
pub type TrackingStreams<L> = RewardStreams<L, Tracked>;

/// Call-in-progress guard around transfer-then-mutate sequences.
///
/// `&mut self` already makes reentry unrepresentable in safe Rust; the
/// guard keeps the discipline explicit at every window where an asset
/// ledger runs before internal state is committed. Nested entry is a
/// fatal internal error, not a recoverable rejection.
#[derive(Debug, Default)]
pub(crate) struct CallGuard {
    busy: bool,
}

impl CallGuard {
    pub(crate) fn enter(&mut self) {
        assert!(!self.busy, "reentrant call during an asset transfer");
        self.busy = true;
    }

    pub(crate) fn exit(&mut self) {
        self.busy = false;
    }
}

/// A validated balance change, ready to commit.
///
/// Produced by the prepare phase (checkpoints done, new eligibility totals
/// pre-computed with checked arithmetic); committing is a set of
/// infallible field writes. The balance-source variant decides what
/// happens between the phases — a custody pull, a custody release, or
/// nothing.
#[derive(Debug)]
pub(crate) struct BalanceChange {
    account: AccountId,
    rewarded: AssetId,
    new_balance: u128,
    /// New `total_eligible` per enabled reward.
    eligibles: Vec<(AssetId, u128)>,
}

/// The reward streaming state machine.
pub struct RewardStreams<L, S: BalanceSource = Custodial> {
    pub(crate) clock: EpochClock,
    pub(crate) assets: L,
    /// Ledger identity under which registered rewards (and, in the
    /// custodial variant, staked balances) are held.
    pub(crate) custody: AccountId,
    pub(crate) distributions: HashMap<(AssetId, AssetId), Distribution>,
    pub(crate) accounts: HashMap<(AccountId, AssetId), AccountRecord>,
    pub(crate) guard: CallGuard,
    source: PhantomData<S>,
}

impl<L: AssetLedger, S: BalanceSource> RewardStreams<L, S> {
    /// Create a streams instance over `assets`, holding custody under
    /// `custody`.
    pub fn new(clock: EpochClock, assets: L, custody: AccountId) -> Self {
        Self {
            clock,
            assets,
            custody,
            distributions: HashMap::new(),
            accounts: HashMap::new(),
            guard: CallGuard::default(),
            source: PhantomData,
        }
    }

    /// The epoch clock.
    pub fn clock(&self) -> &EpochClock {
        &self.clock
    }

    /// The custody identity on the asset ledger.
    pub fn custody(&self) -> &AccountId {
        &self.custody
    }

    /// The underlying asset ledger.
    pub fn assets(&self) -> &L {
        &self.assets
    }

    /// Mutable access to the asset ledger for the embedding application.
    ///
    /// The streams re-verify custody balances around every pull, so
    /// external mutations cannot silently inflate a registration.
    pub fn assets_mut(&mut self) -> &mut L {
        &mut self.assets
    }

    // ---- registration ---------------------------------------------------

    /// Register a reward schedule for the (rewarded, reward) pair, pulling
    /// the scheduled total from `funder` into custody.
    ///
    /// `start_epoch == 0` defaults to the epoch after the current one.
    /// Registration is permissionless; schedules for the same epochs
    /// accumulate. Returns the resolved start epoch.
    ///
    /// # Errors
    ///
    /// - [`StreamsError::InvalidEpoch`] if the start epoch is not in
    ///   `(current, current + MAX_EPOCHS_AHEAD]`
    /// - [`StreamsError::InvalidDistribution`] if the schedule is empty or
    ///   longer than [`MAX_DISTRIBUTION_LENGTH`]
    /// - [`StreamsError::InvalidAmount`] if the schedule sums to zero, or
    ///   custody did not grow by exactly the scheduled total
    /// - [`StreamsError::AccumulatorOverflow`] if the new registered total
    ///   could overflow the accumulator at an eligible balance of one
    /// - [`StreamsError::Asset`] if the asset ledger refuses the pull
    pub fn register_reward(
        &mut self,
        funder: &AccountId,
        rewarded: &AssetId,
        reward: &AssetId,
        start_epoch: u64,
        amounts: &[u128],
        now: u64,
    ) -> Result<u64> {
        let current_epoch = self.clock.epoch_of(now);
        let start_epoch = if start_epoch == 0 {
            current_epoch + 1
        } else {
            start_epoch
        };
        if start_epoch <= current_epoch
            || start_epoch > current_epoch.saturating_add(MAX_EPOCHS_AHEAD)
        {
            return Err(StreamsError::InvalidEpoch {
                start_epoch,
                current_epoch,
            });
        }
        if amounts.is_empty() || amounts.len() > MAX_DISTRIBUTION_LENGTH {
            return Err(StreamsError::InvalidDistribution {
                len: amounts.len(),
                max: MAX_DISTRIBUTION_LENGTH,
            });
        }
        let mut total: u128 = 0;
        for &amount in amounts {
            total = total.checked_add(amount).ok_or(StreamsError::Overflow)?;
        }
        if total == 0 {
            return Err(StreamsError::InvalidAmount(
                "reward schedule sums to zero".to_string(),
            ));
        }

        // Fold elapsed time in first so the new schedule cannot distort
        // accrual already owed under the old totals.
        self.advance_distribution(rewarded, reward, now);

        let new_registered = {
            let dist = self.distributions.entry((*rewarded, *reward)).or_default();
            let new_registered = dist
                .total_registered
                .checked_add(total)
                .ok_or(StreamsError::AccumulatorOverflow)?;
            // Worst case the whole pool is owed to one unit of eligible
            // balance; the scaled total must stay representable.
            if SCALER.checked_mul(new_registered).is_none() {
                return Err(StreamsError::AccumulatorOverflow);
            }
            new_registered
        };

        self.guard.enter();
        let pulled = self.pull_into_custody(reward, funder, total);
        if pulled.is_ok() {
            if let Some(dist) = self.distributions.get_mut(&(*rewarded, *reward)) {
                dist.total_registered = new_registered;
                dist.buckets.add_amounts(start_epoch, amounts);
                if !dist.is_initialized() {
                    dist.last_updated = now;
                }
            }
        }
        self.guard.exit();
        pulled?;

        tracing::info!(
            rewarded = id_hex(rewarded),
            reward = id_hex(reward),
            start_epoch,
            epochs = amounts.len(),
            total,
            "registered reward distribution"
        );

        Ok(start_epoch)
    }

    // ---- enrollment -----------------------------------------------------

    /// Enroll `account`'s balance of `rewarded` into the given reward.
    ///
    /// Returns `false` when the reward was already enabled. The window
    /// before enabling earns nothing: the account is settled at balance
    /// zero before its balance joins `total_eligible`.
    ///
    /// # Errors
    ///
    /// - [`StreamsError::InvalidRecipient`] if `account` is the sentinel
    /// - [`StreamsError::TooManyRewardsEnabled`] at the cardinality bound
    /// - [`StreamsError::Overflow`] if eligibility accounting overflows
    pub fn enable_reward(
        &mut self,
        account: &AccountId,
        rewarded: &AssetId,
        reward: &AssetId,
        now: u64,
    ) -> Result<bool> {
        self.reject_sentinel_actor(account)?;

        let record = self.accounts.entry((*account, *rewarded)).or_default();
        if record.enabled.contains(reward) {
            return Ok(false);
        }
        if record.enabled.len() >= MAX_REWARDS_ENABLED {
            return Err(StreamsError::TooManyRewardsEnabled {
                max: MAX_REWARDS_ENABLED,
            });
        }
        let balance = record.balance;

        self.checkpoint(account, rewarded, reward, 0, false, now);

        let new_eligible = {
            let dist = self.distributions.entry((*rewarded, *reward)).or_default();
            dist.total_eligible
                .checked_add(balance)
                .ok_or(StreamsError::Overflow)?
        };

        if let Some(record) = self.accounts.get_mut(&(*account, *rewarded)) {
            record.enabled.insert(*reward)?;
        }
        if let Some(dist) = self.distributions.get_mut(&(*rewarded, *reward)) {
            dist.total_eligible = new_eligible;
        }

        tracing::debug!(
            account = id_hex(account),
            rewarded = id_hex(rewarded),
            reward = id_hex(reward),
            balance,
            "enabled reward"
        );

        Ok(true)
    }

    /// Withdraw `account`'s balance from the given reward's eligibility.
    ///
    /// Returns `false` when the reward was not enabled. The account is
    /// settled with its real balance first (or forfeits its pending
    /// window when `forfeit_recent`), then leaves `total_eligible`.
    ///
    /// # Errors
    ///
    /// - [`StreamsError::InvalidRecipient`] if `account` is the sentinel
    pub fn disable_reward(
        &mut self,
        account: &AccountId,
        rewarded: &AssetId,
        reward: &AssetId,
        forfeit_recent: bool,
        now: u64,
    ) -> Result<bool> {
        self.reject_sentinel_actor(account)?;

        let Some(record) = self.accounts.get(&(*account, *rewarded)) else {
            return Ok(false);
        };
        if !record.enabled.contains(reward) {
            return Ok(false);
        }
        let balance = record.balance;

        self.checkpoint(account, rewarded, reward, balance, forfeit_recent, now);

        if let Some(record) = self.accounts.get_mut(&(*account, *rewarded)) {
            record.enabled.remove(reward);
        }
        if let Some(dist) = self.distributions.get_mut(&(*rewarded, *reward)) {
            // total_eligible always contains the balances of enrolled
            // accounts, so this cannot underflow.
            dist.total_eligible = dist.total_eligible.saturating_sub(balance);
        }

        tracing::debug!(
            account = id_hex(account),
            rewarded = id_hex(rewarded),
            reward = id_hex(reward),
            forfeit_recent,
            "disabled reward"
        );

        Ok(true)
    }

    // ---- claims ---------------------------------------------------------

    /// Settle and pay out `account`'s claimable amount to `recipient`.
    ///
    /// Returns the amount paid, zero included (claiming nothing touches
    /// neither the ledger nor the totals). With `forfeit_recent` the
    /// caller gives up accrual pending since its last checkpoint.
    ///
    /// # Errors
    ///
    /// - [`StreamsError::InvalidRecipient`] if `account` or `recipient` is
    ///   the sentinel
    /// - [`StreamsError::Asset`] if the payout transfer fails
    pub fn claim_reward(
        &mut self,
        account: &AccountId,
        rewarded: &AssetId,
        reward: &AssetId,
        recipient: &AccountId,
        forfeit_recent: bool,
        now: u64,
    ) -> Result<u128> {
        self.reject_sentinel_actor(account)?;
        if *recipient == UNCLAIMED_ACCOUNT {
            return Err(StreamsError::InvalidRecipient);
        }

        // Accrual applies only while the reward is enabled.
        let balance = self
            .accounts
            .get(&(*account, *rewarded))
            .filter(|record| record.enabled.contains(reward))
            .map(|record| record.balance)
            .unwrap_or(0);
        self.checkpoint(account, rewarded, reward, balance, forfeit_recent, now);

        self.payout(account, rewarded, reward, recipient)
    }

    /// Pay out the sentinel account's spillover to `recipient`.
    ///
    /// Callable by anyone with no enrollment prerequisite: sentinel-owned
    /// rewards must never become unreachable.
    ///
    /// # Errors
    ///
    /// - [`StreamsError::InvalidRecipient`] if `recipient` is the sentinel
    /// - [`StreamsError::Asset`] if the payout transfer fails
    pub fn claim_spillover(
        &mut self,
        rewarded: &AssetId,
        reward: &AssetId,
        recipient: &AccountId,
        now: u64,
    ) -> Result<u128> {
        if *recipient == UNCLAIMED_ACCOUNT {
            return Err(StreamsError::InvalidRecipient);
        }

        // Credit any idle-period accrual before sweeping.
        self.advance_distribution(rewarded, reward, now);

        self.payout(&UNCLAIMED_ACCOUNT, rewarded, reward, recipient)
    }

    /// Fold elapsed time into the distribution with no further effect.
    ///
    /// A public poke: after a long idle stretch anyone can bring the
    /// accumulator (and the sentinel's credit) up to date.
    pub fn update_reward(&mut self, rewarded: &AssetId, reward: &AssetId, now: u64) {
        self.advance_distribution(rewarded, reward, now);
    }

    // ---- read surface ---------------------------------------------------

    /// The account's enrolled balance of `rewarded`.
    pub fn balance_of(&self, account: &AccountId, rewarded: &AssetId) -> u128 {
        self.accounts
            .get(&(*account, *rewarded))
            .map(|record| record.balance)
            .unwrap_or(0)
    }

    /// The rewards the account currently has enabled for `rewarded`.
    pub fn enabled_rewards(&self, account: &AccountId, rewarded: &AssetId) -> Vec<AssetId> {
        self.accounts
            .get(&(*account, *rewarded))
            .map(|record| record.enabled.iter().copied().collect())
            .unwrap_or_default()
    }

    /// What a claim at `now` would pay the account, without mutating.
    ///
    /// For the sentinel account this includes idle-period accrual that has
    /// not been credited by a checkpoint yet.
    pub fn earned_reward(
        &self,
        account: &AccountId,
        rewarded: &AssetId,
        reward: &AssetId,
        forfeit_recent: bool,
        now: u64,
    ) -> u128 {
        let record = self.accounts.get(&(*account, *rewarded));
        let (claimable, snapshot) = record
            .and_then(|r| r.earned(reward))
            .map(|e| (e.claimable, e.snapshot))
            .unwrap_or((0, 0));
        let mut total = u128::from(claimable);

        let Some(dist) = self.distributions.get(&(*rewarded, *reward)) else {
            return total;
        };

        let (accumulator, pending_spill) = if forfeit_recent {
            (dist.accumulator, 0)
        } else {
            dist.pending_accumulator(&self.clock, now)
        };

        let enrolled_balance = record
            .filter(|r| r.enabled.contains(reward))
            .map(|r| r.balance)
            .unwrap_or(0);
        if enrolled_balance > 0 {
            let diff = accumulator.saturating_sub(snapshot);
            total = total.saturating_add(diff.saturating_mul(enrolled_balance) / SCALER);
        }

        if *account == UNCLAIMED_ACCOUNT && !forfeit_recent {
            total = total
                .saturating_add(dist.spill_residual.saturating_add(pending_spill) / SCALER);
        }

        total
    }

    /// Sum of enrolled balances for the pair.
    pub fn total_rewarded_eligible(&self, rewarded: &AssetId, reward: &AssetId) -> u128 {
        self.distributions
            .get(&(*rewarded, *reward))
            .map(|dist| dist.total_eligible)
            .unwrap_or(0)
    }

    /// Cumulative amount ever registered for the pair.
    pub fn total_reward_registered(&self, rewarded: &AssetId, reward: &AssetId) -> u128 {
        self.distributions
            .get(&(*rewarded, *reward))
            .map(|dist| dist.total_registered)
            .unwrap_or(0)
    }

    /// Cumulative amount ever claimed for the pair.
    pub fn total_reward_claimed(&self, rewarded: &AssetId, reward: &AssetId) -> u128 {
        self.distributions
            .get(&(*rewarded, *reward))
            .map(|dist| dist.total_claimed)
            .unwrap_or(0)
    }

    /// The amount scheduled for `epoch`.
    pub fn reward_amount(&self, rewarded: &AssetId, reward: &AssetId, epoch: u64) -> u128 {
        self.distributions
            .get(&(*rewarded, *reward))
            .map(|dist| dist.buckets.amount(epoch))
            .unwrap_or(0)
    }

    /// The epoch containing `now`.
    pub fn current_epoch(&self, now: u64) -> u64 {
        self.clock.epoch_of(now)
    }

    /// First second of `epoch`.
    pub fn epoch_start_timestamp(&self, epoch: u64) -> u64 {
        self.clock.start_of(epoch)
    }

    /// First second after `epoch`.
    pub fn epoch_end_timestamp(&self, epoch: u64) -> u64 {
        self.clock.end_of(epoch)
    }

    // ---- internals ------------------------------------------------------

    pub(crate) fn reject_sentinel_actor(&self, account: &AccountId) -> Result<()> {
        if *account == UNCLAIMED_ACCOUNT {
            return Err(StreamsError::InvalidRecipient);
        }
        Ok(())
    }

    /// Advance the distribution to `now`, crediting spillover.
    fn advance_distribution(&mut self, rewarded: &AssetId, reward: &AssetId, now: u64) {
        let Some(dist) = self.distributions.get_mut(&(*rewarded, *reward)) else {
            return;
        };
        let credit = dist.advance(&self.clock, now);
        if credit > 0 {
            self.credit_sentinel(rewarded, reward, credit);
        }
    }

    /// Checkpoint the distribution and settle one account against it.
    ///
    /// `settle_balance` is the balance the pending accrual applies to —
    /// zero while the account was not enrolled. With `forfeit_recent` the
    /// distribution is left where it stands and the account settles
    /// against the current accumulator, forfeiting its own pending window
    /// (rewards already snapshotted are never forfeited).
    fn checkpoint(
        &mut self,
        account: &AccountId,
        rewarded: &AssetId,
        reward: &AssetId,
        settle_balance: u128,
        forfeit_recent: bool,
        now: u64,
    ) {
        if !forfeit_recent {
            self.advance_distribution(rewarded, reward, now);
        }

        let accumulator = match self.distributions.get(&(*rewarded, *reward)) {
            Some(dist) if dist.is_initialized() => dist.accumulator,
            _ => return,
        };

        let record = self.accounts.entry((*account, *rewarded)).or_default();
        let spill = record
            .earned_mut(reward)
            .settle(accumulator, settle_balance);
        if spill > 0 {
            self.credit_sentinel(rewarded, reward, spill);
        }
    }

    /// Add spillover to the sentinel's claimable for the pair.
    fn credit_sentinel(&mut self, rewarded: &AssetId, reward: &AssetId, credit: u128) {
        let record = self
            .accounts
            .entry((UNCLAIMED_ACCOUNT, *rewarded))
            .or_default()
            .earned_mut(reward);
        let total = u128::from(record.claimable).saturating_add(credit);
        // The registration bound keeps reachable totals inside the width.
        record.claimable = total.min(u128::from(u64::MAX)) as u64;

        tracing::trace!(
            rewarded = id_hex(rewarded),
            reward = id_hex(reward),
            credit,
            "credited spillover to the unclaimed account"
        );
    }

    /// Transfer `amount` from `from` into custody and verify custody grew
    /// by exactly that much.
    pub(crate) fn pull_into_custody(
        &mut self,
        asset: &AssetId,
        from: &AccountId,
        amount: u128,
    ) -> Result<()> {
        let before = self.assets.balance_of(asset, &self.custody);
        self.assets.transfer(asset, from, &self.custody, amount)?;
        let received = self
            .assets
            .balance_of(asset, &self.custody)
            .saturating_sub(before);
        if received != amount {
            return Err(StreamsError::InvalidAmount(format!(
                "custody received {received} of the {amount} requested"
            )));
        }

        tracing::debug!(
            asset = id_hex(asset),
            from = id_hex(from),
            amount,
            "pulled into custody"
        );

        Ok(())
    }

    /// Pay out `owner`'s claimable for the pair to `recipient`.
    fn payout(
        &mut self,
        owner: &AccountId,
        rewarded: &AssetId,
        reward: &AssetId,
        recipient: &AccountId,
    ) -> Result<u128> {
        let amount = self
            .accounts
            .get(&(*owner, *rewarded))
            .and_then(|record| record.earned(reward))
            .map(|earned| u128::from(earned.claimable))
            .unwrap_or(0);
        if amount == 0 {
            return Ok(0);
        }

        let (registered, claimed) = self
            .distributions
            .get(&(*rewarded, *reward))
            .map(|dist| (dist.total_registered, dist.total_claimed))
            .unwrap_or((0, 0));
        let new_claimed = claimed.saturating_add(amount);
        // Paying out more than was ever registered means the accounting
        // itself is broken; halt rather than keep a corrupt ledger alive.
        assert!(
            new_claimed <= registered,
            "total claimed {new_claimed} exceeds total registered {registered}"
        );

        self.guard.enter();
        let sent = self
            .assets
            .transfer(reward, &self.custody, recipient, amount)
            .map_err(StreamsError::Asset);
        if sent.is_ok() {
            if let Some(record) = self.accounts.get_mut(&(*owner, *rewarded)) {
                record.earned_mut(reward).claimable = 0;
            }
            if let Some(dist) = self.distributions.get_mut(&(*rewarded, *reward)) {
                dist.total_claimed = new_claimed;
            }
        }
        self.guard.exit();
        sent?;

        tracing::info!(
            owner = id_hex(owner),
            rewarded = id_hex(rewarded),
            reward = id_hex(reward),
            recipient = id_hex(recipient),
            amount,
            "claimed reward"
        );

        Ok(amount)
    }

    /// Prepare a balance change: checkpoint every enabled reward at the
    /// old balance and pre-compute the new eligibility totals.
    ///
    /// Nothing observable changes if this errors; commit is infallible.
    pub(crate) fn prepare_balance_change(
        &mut self,
        account: &AccountId,
        rewarded: &AssetId,
        new_balance: u128,
        forfeit_recent: bool,
        now: u64,
    ) -> Result<BalanceChange> {
        let record = self.accounts.entry((*account, *rewarded)).or_default();
        let old_balance = record.balance;
        let rewards: Vec<AssetId> = record.enabled.iter().copied().collect();

        for reward in &rewards {
            self.checkpoint(account, rewarded, reward, old_balance, forfeit_recent, now);
        }

        let mut eligibles = Vec::with_capacity(rewards.len());
        for reward in rewards {
            let eligible = self
                .distributions
                .get(&(*rewarded, reward))
                .map(|dist| dist.total_eligible)
                .unwrap_or(0);
            let eligible = eligible
                .saturating_sub(old_balance)
                .checked_add(new_balance)
                .ok_or(StreamsError::Overflow)?;
            eligibles.push((reward, eligible));
        }

        Ok(BalanceChange {
            account: *account,
            rewarded: *rewarded,
            new_balance,
            eligibles,
        })
    }

    /// Commit a prepared balance change.
    pub(crate) fn commit_balance_change(&mut self, change: BalanceChange) {
        for (reward, eligible) in &change.eligibles {
            if let Some(dist) = self.distributions.get_mut(&(change.rewarded, *reward)) {
                dist.total_eligible = *eligible;
            }
        }
        if let Some(record) = self.accounts.get_mut(&(change.account, change.rewarded)) {
            record.balance = change.new_balance;
        }

        tracing::trace!(
            account = id_hex(&change.account),
            rewarded = id_hex(&change.rewarded),
            balance = change.new_balance,
            "committed balance change"
        );
    }
}
