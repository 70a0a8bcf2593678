//! Bounded set of enabled rewards.
//!
//! Each account may have at most [`MAX_REWARDS_ENABLED`] rewards enabled
//! per rewarded asset, because every balance change walks the whole set.
//! The bound is a property of the set itself, not a check scattered
//! through the enrollment protocol.

use serde::{Deserialize, Serialize};

use rill_types::AssetId;

use crate::{Result, StreamsError, MAX_REWARDS_ENABLED};

/// Fixed-capacity set of reward asset identifiers.
///
/// Membership is what matters; iteration order is insertion order and
/// carries no meaning.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardSet {
    items: Vec<AssetId>,
}

impl RewardSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `reward`, returning `false` if it was already present.
    ///
    /// # Errors
    ///
    /// - [`StreamsError::TooManyRewardsEnabled`] if the set is at capacity
    pub fn insert(&mut self, reward: AssetId) -> Result<bool> {
        if self.contains(&reward) {
            return Ok(false);
        }
        if self.items.len() >= MAX_REWARDS_ENABLED {
            return Err(StreamsError::TooManyRewardsEnabled {
                max: MAX_REWARDS_ENABLED,
            });
        }
        self.items.push(reward);
        Ok(true)
    }

    /// Remove `reward`, returning whether it was present.
    pub fn remove(&mut self, reward: &AssetId) -> bool {
        match self.items.iter().position(|item| item == reward) {
            Some(index) => {
                self.items.swap_remove(index);
                true
            }
            None => false,
        }
    }

    /// Whether `reward` is in the set.
    pub fn contains(&self, reward: &AssetId) -> bool {
        self.items.contains(reward)
    }

    /// Iterate over the members.
    pub fn iter(&self) -> impl Iterator<Item = &AssetId> {
        self.items.iter()
    }

    /// Number of members.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
