//! In-memory reference ledger.
//!
//! A conforming [`AssetLedger`] backed by a `HashMap`, used as the custody
//! ledger in tests and in single-process deployments. `mint` funds an
//! account out of thin air; everything else conserves balances exactly.

use std::collections::HashMap;

use rill_types::{id_hex, AccountId, AssetId};

use crate::{AssetError, AssetLedger, Result};

/// In-memory balances for any number of assets.
#[derive(Debug, Default)]
pub struct InMemoryAssets {
    /// Balances keyed by (asset, holder).
    balances: HashMap<(AssetId, AccountId), u128>,
}

impl InMemoryAssets {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Credit `amount` of `asset` to `to`.
    ///
    /// # Errors
    ///
    /// - [`AssetError::Overflow`] if the credit would overflow the balance
    pub fn mint(&mut self, asset: &AssetId, to: &AccountId, amount: u128) -> Result<()> {
        let balance = self.balances.entry((*asset, *to)).or_insert(0);
        *balance = balance.checked_add(amount).ok_or(AssetError::Overflow)?;

        tracing::debug!(
            asset = id_hex(asset),
            to = id_hex(to),
            amount,
            "minted asset units"
        );

        Ok(())
    }
}

impl AssetLedger for InMemoryAssets {
    fn balance_of(&self, asset: &AssetId, holder: &AccountId) -> u128 {
        self.balances.get(&(*asset, *holder)).copied().unwrap_or(0)
    }

    fn transfer(
        &mut self,
        asset: &AssetId,
        from: &AccountId,
        to: &AccountId,
        amount: u128,
    ) -> Result<()> {
        let available = self.balance_of(asset, from);
        if available < amount {
            return Err(AssetError::InsufficientBalance {
                requested: amount,
                available,
            });
        }

        // Self-transfers are a no-op once funds are verified.
        if from == to {
            return Ok(());
        }

        let credited = self
            .balance_of(asset, to)
            .checked_add(amount)
            .ok_or(AssetError::Overflow)?;

        self.balances.insert((*asset, *from), available - amount);
        self.balances.insert((*asset, *to), credited);

        tracing::trace!(
            asset = id_hex(asset),
            from = id_hex(from),
            to = id_hex(to),
            amount,
            "transferred asset units"
        );

        Ok(())
    }
}
