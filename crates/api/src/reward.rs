// Path: crates/api/src/reward.rs
//! The staking reward calculator seam.

/// Computes the reward minted for a staker at insertion time.
pub trait RewardCalculator {
    /// The reward for staking `weight` for `staking_period` seconds while
    /// the subnet's circulating supply is `current_supply`.
    fn calculate(&self, staking_period: u64, weight: u64, current_supply: u64) -> u64;
}
