//! Hook-driven balance-source variant.
//!
//! The rewarded asset's ledger is external; it invokes the balance hook
//! synchronously on every balance mutation of a tracked account (including
//! a zero-balance call when tracking is enabled or disabled). Eligibility
//! mirrors the reported balance — this variant never moves the rewarded
//! asset itself.
//!
//! The `rewarded` parameter is the caller's identity: the asset reports
//! only its own balances, which is what scopes a hostile asset's influence
//! to distributions that chose it as the rewarded asset.

use rill_assets::AssetLedger;
use rill_types::{id_hex, AccountId, AssetId};

use crate::streams::{RewardStreams, Tracked};
use crate::Result;

impl<L: AssetLedger> RewardStreams<L, Tracked> {
    /// Record that `account`'s balance of `rewarded` is now
    /// `new_balance`.
    ///
    /// Every enabled reward is settled at the old balance first, then
    /// eligibility totals shift by the difference. With `forfeit_recent`
    /// the account gives up accrual pending since its last checkpoint.
    ///
    /// # Errors
    ///
    /// - [`StreamsError`](crate::StreamsError)`::InvalidRecipient` if
    ///   `account` is the sentinel
    /// - [`StreamsError`](crate::StreamsError)`::Overflow` if eligibility
    ///   accounting overflows
    pub fn balance_hook(
        &mut self,
        rewarded: &AssetId,
        account: &AccountId,
        new_balance: u128,
        forfeit_recent: bool,
        now: u64,
    ) -> Result<()> {
        self.reject_sentinel_actor(account)?;

        let change =
            self.prepare_balance_change(account, rewarded, new_balance, forfeit_recent, now)?;
        self.commit_balance_change(change);

        tracing::trace!(
            rewarded = id_hex(rewarded),
            account = id_hex(account),
            new_balance,
            "balance hook applied"
        );

        Ok(())
    }
}
