//! # rill-epoch
//!
//! Epoch arithmetic for reward streaming.
//!
//! Time is divided into fixed-length epochs starting at Unix time 0. The
//! epoch duration is fixed at construction and bounded below so that a
//! reward schedule cannot be compressed into manipulably short windows.
//!
//! ## Modules
//!
//! - [`clock`] — The epoch clock

pub mod clock;

pub use clock::{EpochClock, MIN_EPOCH_DURATION};

/// Error types for epoch configuration.
#[derive(Debug, thiserror::Error)]
pub enum EpochError {
    /// The configured epoch duration is below the protocol minimum.
    #[error("epoch duration {duration}s is below the minimum {min}s")]
    DurationTooShort {
        /// The rejected duration in seconds.
        duration: u64,
        /// The minimum allowed duration in seconds.
        min: u64,
    },
}

/// Convenience result type for epoch operations.
pub type Result<T> = std::result::Result<T, EpochError>;
