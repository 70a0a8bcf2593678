//! # rill-types
//!
//! Shared identifiers used across the Rill workspace.
//!
//! All quantities of an asset (balances, transfers, per-epoch reward
//! amounts) are plain `u128` base units; the aliases here cover the two
//! identifier spaces and the sentinel account.

/// A 32-byte logical account identifier.
///
/// Identity resolution (mapping a physical caller to the account it acts
/// for) happens upstream of this workspace; every operation takes the
/// already resolved account.
pub type AccountId = [u8; 32];

/// A 32-byte asset identifier.
pub type AssetId = [u8; 32];

/// The sentinel account that absorbs rewards accrued while no balance was
/// eligible, and any amount that would overflow a claimable record.
///
/// The sentinel never acts: it only ever receives spillover credits, which
/// anyone may sweep out via the spillover claim.
pub const UNCLAIMED_ACCOUNT: AccountId = [0u8; 32];

/// Render a 32-byte identifier as lowercase hex for log fields.
pub fn id_hex(id: &[u8; 32]) -> String {
    hex::encode(id)
}
