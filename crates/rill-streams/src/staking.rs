//! Custodial balance-source variant.
//!
//! The rewarded asset itself is held in custody here: staking pulls it in
//! (with the same delta verification as registration, so a fee-on-transfer
//! asset cannot understate what it delivered) and unstaking releases it to
//! a recipient of the staker's choosing. Eligible balance equals staked
//! balance.

use rill_assets::AssetLedger;
use rill_types::{id_hex, AccountId, AssetId, UNCLAIMED_ACCOUNT};

use crate::streams::{Custodial, RewardStreams};
use crate::{Result, StreamsError};

impl<L: AssetLedger> RewardStreams<L, Custodial> {
    /// Stake `amount` of the rewarded asset, increasing the account's
    /// eligible balance for every enabled reward.
    ///
    /// `u128::MAX` stakes the account's entire ledger balance. Returns the
    /// amount actually staked.
    ///
    /// # Errors
    ///
    /// - [`StreamsError::InvalidRecipient`] if `account` is the sentinel
    /// - [`StreamsError::InvalidAmount`] on a zero amount, or if custody
    ///   did not grow by exactly `amount`
    /// - [`StreamsError::Overflow`] if the balance or eligibility totals
    ///   would overflow
    /// - [`StreamsError::Asset`] if the asset ledger refuses the pull
    pub fn stake(
        &mut self,
        account: &AccountId,
        rewarded: &AssetId,
        amount: u128,
        now: u64,
    ) -> Result<u128> {
        self.reject_sentinel_actor(account)?;

        let amount = if amount == u128::MAX {
            self.assets().balance_of(rewarded, account)
        } else {
            amount
        };
        if amount == 0 {
            return Err(StreamsError::InvalidAmount(
                "cannot stake zero".to_string(),
            ));
        }

        let old_balance = self.balance_of(account, rewarded);
        let new_balance = old_balance
            .checked_add(amount)
            .ok_or(StreamsError::Overflow)?;

        let change = self.prepare_balance_change(account, rewarded, new_balance, false, now)?;

        self.guard.enter();
        let pulled = self.pull_into_custody(rewarded, account, amount);
        if pulled.is_ok() {
            self.commit_balance_change(change);
        }
        self.guard.exit();
        pulled?;

        tracing::debug!(
            account = id_hex(account),
            rewarded = id_hex(rewarded),
            amount,
            balance = new_balance,
            "staked rewarded asset"
        );

        Ok(amount)
    }

    /// Unstake `amount` of the rewarded asset to `recipient`, decreasing
    /// the account's eligible balance for every enabled reward.
    ///
    /// `u128::MAX` unstakes the entire staked balance. With
    /// `forfeit_recent` the account gives up accrual pending since its
    /// last checkpoint. Returns the amount actually unstaked.
    ///
    /// # Errors
    ///
    /// - [`StreamsError::InvalidRecipient`] if `account` or `recipient` is
    ///   the sentinel
    /// - [`StreamsError::InvalidAmount`] on a zero amount
    /// - [`StreamsError::InsufficientBalance`] if `amount` exceeds the
    ///   staked balance
    /// - [`StreamsError::Asset`] if the asset ledger refuses the release
    pub fn unstake(
        &mut self,
        account: &AccountId,
        rewarded: &AssetId,
        amount: u128,
        recipient: &AccountId,
        forfeit_recent: bool,
        now: u64,
    ) -> Result<u128> {
        self.reject_sentinel_actor(account)?;
        if *recipient == UNCLAIMED_ACCOUNT {
            return Err(StreamsError::InvalidRecipient);
        }

        let old_balance = self.balance_of(account, rewarded);
        let amount = if amount == u128::MAX { old_balance } else { amount };
        if amount == 0 {
            return Err(StreamsError::InvalidAmount(
                "cannot unstake zero".to_string(),
            ));
        }
        if amount > old_balance {
            return Err(StreamsError::InsufficientBalance {
                requested: amount,
                available: old_balance,
            });
        }

        let new_balance = old_balance - amount;
        let change =
            self.prepare_balance_change(account, rewarded, new_balance, forfeit_recent, now)?;

        self.guard.enter();
        let sent = self
            .assets
            .transfer(rewarded, &self.custody, recipient, amount)
            .map_err(StreamsError::Asset);
        if sent.is_ok() {
            self.commit_balance_change(change);
        }
        self.guard.exit();
        sent?;

        tracing::debug!(
            account = id_hex(account),
            rewarded = id_hex(rewarded),
            recipient = id_hex(recipient),
            amount,
            balance = new_balance,
            "unstaked rewarded asset"
        );

        Ok(amount)
    }
}
