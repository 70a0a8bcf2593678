//! The per-pair distribution accumulator.
//!
//! One [`Distribution`] exists per (rewarded asset, reward asset) pair.
//! Its accumulator is the cumulative reward released per unit of eligible
//! balance since inception, scaled by [`SCALER`]. Advancing it walks every
//! epoch that overlaps the window since the last checkpoint — the
//! in-progress epoch included — so accrual is continuous in time no matter
//! how many epoch boundaries a quiet period crossed.
//!
//! While nothing is eligible the released amount cannot be divided out, so
//! it flows to the unclaimed sentinel instead: whole base units are
//! credited immediately, and the sub-unit remainder is carried in a scaled
//! residual so repeated checkpoints truncate once per unit, not once per
//! call.

use rill_epoch::EpochClock;

use crate::buckets::EpochBuckets;
use crate::SCALER;

/// Accumulator state for one (rewarded, reward) pair.
///
/// `last_updated == 0` means the distribution has never been registered;
/// the record may still carry `total_eligible` from accounts that enabled
/// the reward ahead of its first registration.
#[derive(Clone, Debug, Default)]
pub struct Distribution {
    /// Timestamp of the last accumulator checkpoint; 0 = uninitialized.
    pub(crate) last_updated: u64,
    /// Cumulative reward per unit of eligible balance, scaled by [`SCALER`].
    pub(crate) accumulator: u128,
    /// Scaled spillover smaller than one base unit, not yet credited.
    pub(crate) spill_residual: u128,
    /// Sum of enrolled balances across accounts with this reward enabled.
    pub(crate) total_eligible: u128,
    /// Cumulative amount ever registered. Never decreases.
    pub(crate) total_registered: u128,
    /// Cumulative amount ever claimed. Never decreases.
    pub(crate) total_claimed: u128,
    /// Scheduled amount per epoch.
    pub(crate) buckets: EpochBuckets,
}

impl Distribution {
    /// Whether the distribution has been registered at least once.
    pub(crate) fn is_initialized(&self) -> bool {
        self.last_updated != 0
    }

    /// Scaled reward released in `[last_updated, now)`.
    pub(crate) fn released_since(&self, clock: &EpochClock, now: u64) -> u128 {
        let duration = clock.epoch_duration();
        let first = clock.epoch_of(self.last_updated);
        let last = clock.epoch_of(now);

        let mut delta: u128 = 0;
        for slot in EpochBuckets::slot_of(first)..=EpochBuckets::slot_of(last) {
            let lanes = self.buckets.slot(slot);
            for (lane, &amount) in lanes.iter().enumerate() {
                if amount == 0 {
                    continue;
                }
                let epoch = slot * 2 + lane as u64;
                if epoch < first || epoch > last {
                    continue;
                }
                let elapsed = clock.overlap(epoch, self.last_updated, now);
                if elapsed == 0 {
                    continue;
                }
                delta = delta.saturating_add(scaled_release(amount, elapsed, duration));
            }
        }
        delta
    }

    /// Advance the accumulator to `now`.
    ///
    /// Returns the whole base units of spillover to credit to the sentinel
    /// account (non-zero only while `total_eligible == 0`).
    pub(crate) fn advance(&mut self, clock: &EpochClock, now: u64) -> u128 {
        if !self.is_initialized() || now <= self.last_updated {
            return 0;
        }

        let delta = self.released_since(clock, now);
        self.last_updated = now;
        if delta == 0 {
            return 0;
        }

        if self.total_eligible == 0 {
            // Nothing to divide the release over; park it for the sentinel.
            // Bounded by SCALER * total_registered, the registration
            // invariant.
            self.spill_residual = self.spill_residual.saturating_add(delta);
            let credit = self.spill_residual / SCALER;
            self.spill_residual -= credit * SCALER;
            credit
        } else {
            self.accumulator = self
                .accumulator
                .saturating_add(delta / self.total_eligible);
            0
        }
    }

    /// The accumulator as it would stand after an advance to `now`, plus
    /// any scaled release that would instead become spillover.
    ///
    /// Read-only companion of [`Distribution::advance`] for the earned
    /// view.
    pub(crate) fn pending_accumulator(&self, clock: &EpochClock, now: u64) -> (u128, u128) {
        if !self.is_initialized() || now <= self.last_updated {
            return (self.accumulator, 0);
        }
        let delta = self.released_since(clock, now);
        if self.total_eligible == 0 {
            (self.accumulator, delta)
        } else {
            (
                self.accumulator
                    .saturating_add(delta / self.total_eligible),
                0,
            )
        }
    }
}

/// `SCALER * amount * elapsed / duration` with the multiplication split so
/// every intermediate fits `u128`.
///
/// Exact when `elapsed == duration`: a fully elapsed epoch releases its
/// scheduled amount with no rounding loss.
fn scaled_release(amount: u128, elapsed: u64, duration: u64) -> u128 {
    // SCALER * amount fits u128 for any registered amount (registration
    // bounds SCALER * total_registered).
    let scaled = SCALER.saturating_mul(amount);
    let duration = u128::from(duration);
    let elapsed = u128::from(elapsed);
    let quotient = scaled / duration;
    let remainder = scaled % duration;
    // elapsed <= duration keeps both products in range.
    quotient.saturating_mul(elapsed) + remainder * elapsed / duration
}
