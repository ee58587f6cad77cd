// Path: crates/types/src/config/forks.rs
//! The fork schedule: activation timestamps for each named network upgrade.
//!
//! Every fork-gated behavior in the executor selects its rule set by calling
//! one of these predicates with the **current chain timestamp**. Wall-clock
//! time never participates; two nodes replaying the same block must pick the
//! same rules.

use serde::{Deserialize, Serialize};

/// Activation times for the named upgrades. `None` means the upgrade never
/// activates on this network.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ForkSchedule {
    /// Apricot Phase 3: splits subnet/blockchain creation fees off the
    /// generic asset fee.
    pub apricot_phase3_time: Option<u64>,
    /// Durango: bans the legacy `AddValidatorTx`/`AddDelegatorTx` forms and
    /// the explicit clock-advance proposal.
    pub durango_time: Option<u64>,
    /// Continuous staking: stakers become current immediately and are shut
    /// down explicitly instead of expiring.
    pub continuous_staking_time: Option<u64>,
    /// E-Upgrade: replaces the static fee schedule with dynamic,
    /// complexity-metered fees.
    pub e_upgrade_time: Option<u64>,
}

impl ForkSchedule {
    /// A schedule with every upgrade active from genesis.
    pub fn all_active() -> Self {
        Self {
            apricot_phase3_time: Some(0),
            durango_time: Some(0),
            continuous_staking_time: Some(0),
            e_upgrade_time: Some(0),
        }
    }

    /// A schedule with no upgrade ever active.
    pub fn none_active() -> Self {
        Self::default()
    }

    fn active(at: Option<u64>, timestamp: u64) -> bool {
        matches!(at, Some(t) if timestamp >= t)
    }

    /// Whether Apricot Phase 3 is active at `timestamp`.
    pub fn is_apricot_phase3_active(&self, timestamp: u64) -> bool {
        Self::active(self.apricot_phase3_time, timestamp)
    }

    /// Whether Durango is active at `timestamp`.
    pub fn is_durango_active(&self, timestamp: u64) -> bool {
        Self::active(self.durango_time, timestamp)
    }

    /// Whether continuous staking is active at `timestamp`.
    pub fn is_continuous_staking_active(&self, timestamp: u64) -> bool {
        Self::active(self.continuous_staking_time, timestamp)
    }

    /// Whether the E-Upgrade is active at `timestamp`.
    pub fn is_e_upgrade_active(&self, timestamp: u64) -> bool {
        Self::active(self.e_upgrade_time, timestamp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn activation_is_inclusive() {
        let schedule = ForkSchedule {
            apricot_phase3_time: Some(100),
            ..ForkSchedule::default()
        };
        assert!(!schedule.is_apricot_phase3_active(99));
        assert!(schedule.is_apricot_phase3_active(100));
        assert!(schedule.is_apricot_phase3_active(101));
    }

    #[test]
    fn none_means_never() {
        let schedule = ForkSchedule::none_active();
        assert!(!schedule.is_e_upgrade_active(u64::MAX));
        assert!(!schedule.is_continuous_staking_active(u64::MAX));
        assert!(!schedule.is_durango_active(u64::MAX));
    }
}
