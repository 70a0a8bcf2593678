//! # rill-streams
//!
//! Epoch-based reward streaming.
//!
//! A finite, pre-funded pool of a reward asset is streamed to holders of a
//! second "rewarded" asset, proportionally to how much of it each holder
//! has enrolled and for how long, across fixed-length epochs. Every unit
//! registered is eventually attributable to exactly one claimant: a real
//! participant, or the unclaimed sentinel account that absorbs accrual
//! from periods with no eligible balance.
//!
//! The accumulator pattern keeps claims O(1) regardless of the number of
//! participants: each distribution carries a monotone per-unit-of-eligible
//! accumulator, and each account a snapshot of it from its last
//! settlement. Every mutation checkpoints (folds elapsed time into the
//! accumulator and settles the caller) before it touches eligibility or
//! balances; that ordering is the load-bearing correctness property.
//!
//! ## Modules
//!
//! - [`buckets`] — Per-epoch reward amounts, two epochs per slot
//! - [`rewards_set`] — Bounded set of enabled rewards
//! - [`distribution`] — The per-pair accumulator
//! - [`account`] — Per-account balances and earned records
//! - [`streams`] — The orchestrator and its protocols
//! - [`staking`] — Custodial balance-source variant
//! - [`tracking`] — Hook-driven balance-source variant

pub mod account;
pub mod buckets;
pub mod distribution;
pub mod rewards_set;
pub mod staking;
pub mod streams;
pub mod tracking;

pub use rewards_set::RewardSet;
pub use streams::{
    BalanceSource, Custodial, RewardStreams, StakingStreams, Tracked, TrackingStreams,
};

use rill_assets::AssetError;

/// Fixed-point scale of the distribution accumulator.
///
/// Registration keeps `SCALER * total_registered` representable in `u128`,
/// so the accumulator cannot overflow even if a single unit of eligible
/// balance ends up owning an entire distribution.
pub const SCALER: u128 = 20_000_000_000_000_000_000;

/// How far into the future a reward schedule may start, in epochs.
pub const MAX_EPOCHS_AHEAD: u64 = 5;

/// Longest reward schedule accepted by a single registration, in epochs.
pub const MAX_DISTRIBUTION_LENGTH: usize = 25;

/// Most rewards an account can have enabled per rewarded asset.
pub const MAX_REWARDS_ENABLED: usize = 5;

/// Error types for reward streaming operations.
#[derive(Debug, thiserror::Error)]
pub enum StreamsError {
    /// Registration start epoch outside the allowed window.
    #[error("invalid start epoch {start_epoch} for current epoch {current_epoch}")]
    InvalidEpoch {
        /// The rejected start epoch (after zero-defaulting).
        start_epoch: u64,
        /// The epoch containing the call timestamp.
        current_epoch: u64,
    },

    /// Reward schedule length outside `1..=MAX_DISTRIBUTION_LENGTH`.
    #[error("invalid distribution length {len} (must be 1..={max})")]
    InvalidDistribution {
        /// The rejected schedule length.
        len: usize,
        /// The maximum allowed length.
        max: usize,
    },

    /// A zero amount where a positive one is required, or an asset that
    /// moved a different amount than requested.
    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    /// Registering would make `SCALER * total_registered` unrepresentable.
    #[error("registered amount would overflow the reward accumulator")]
    AccumulatorOverflow,

    /// The account already has the maximum number of rewards enabled.
    #[error("too many rewards enabled (limit {max})")]
    TooManyRewardsEnabled {
        /// The cardinality bound.
        max: usize,
    },

    /// The unclaimed sentinel account cannot act or receive transfers.
    #[error("the unclaimed sentinel account cannot act or receive transfers")]
    InvalidRecipient,

    /// Unstaking more than the staked balance.
    #[error("insufficient staked balance: requested {requested}, available {available}")]
    InsufficientBalance {
        /// The requested amount.
        requested: u128,
        /// The staked balance available.
        available: u128,
    },

    /// Arithmetic overflow in eligibility accounting.
    #[error("arithmetic overflow")]
    Overflow,

    /// The asset ledger refused or failed a transfer.
    #[error("asset ledger error: {0}")]
    Asset(#[from] AssetError),
}

/// Convenience result type for streaming operations.
pub type Result<T> = std::result::Result<T, StreamsError>;
