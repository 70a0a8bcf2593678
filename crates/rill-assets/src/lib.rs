//! # rill-assets
//!
//! The asset-transfer collaborator interface.
//!
//! The reward streams never move tokens themselves; they drive an
//! [`AssetLedger`] that holds every asset's balances. Implementations are
//! untrusted: an asset may take fees on transfer, rebase balances, or lie
//! outright, so the streaming protocols re-read balances around transfers
//! and verify the observed delta before committing any internal state.
//!
//! ## Modules
//!
//! - [`mem`] — In-memory reference ledger

pub mod mem;

pub use mem::InMemoryAssets;

use rill_types::{AccountId, AssetId};

/// Error types for asset ledger operations.
#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    /// The sender does not hold enough of the asset.
    #[error("insufficient balance: requested {requested}, available {available}")]
    InsufficientBalance {
        /// The amount the transfer asked for.
        requested: u128,
        /// The sender's balance at the time of the transfer.
        available: u128,
    },

    /// Crediting the recipient would overflow its balance.
    #[error("arithmetic overflow crediting balance")]
    Overflow,

    /// The asset itself refused the transfer.
    #[error("transfer rejected by asset: {0}")]
    Rejected(String),
}

/// Convenience result type for asset operations.
pub type Result<T> = std::result::Result<T, AssetError>;

/// Balance bookkeeping for any number of assets.
///
/// `transfer` must either move exactly `amount` from `from` to `to` and
/// return `Ok`, or leave both balances untouched and return an error.
/// Callers that cannot trust an implementation to honor this contract
/// verify the balance delta themselves.
pub trait AssetLedger {
    /// Balance of `holder` for `asset`, zero when unknown.
    fn balance_of(&self, asset: &AssetId, holder: &AccountId) -> u128;

    /// Move `amount` of `asset` from `from` to `to`.
    ///
    /// # Errors
    ///
    /// - [`AssetError::InsufficientBalance`] if `from` holds less than
    ///   `amount`
    /// - [`AssetError::Overflow`] if crediting `to` would overflow
    /// - [`AssetError::Rejected`] if the asset refuses the transfer
    fn transfer(
        &mut self,
        asset: &AssetId,
        from: &AccountId,
        to: &AccountId,
        amount: u128,
    ) -> Result<()>;
}
