// Path: crates/types/src/staker.rs
//! Staker records and the priority order that drives their lifecycle.
//!
//! A staker is a validator or delegator on exactly one subnet, living in
//! exactly one of the pending or current sets. The priority enum encodes the
//! total order used for iteration and tie-breaking: within each of the
//! pending and current halves, subnet validators sort before primary-network
//! validators, which sort before delegators.

use crate::ids::{NodeId, SubnetId, TxId};
use parity_scale_codec::{Decode, Encode};
use serde::{Deserialize, Serialize};

/// The far-future timestamp used as the end time of continuous stakers.
pub const MAX_TIME: u64 = u64::MAX;

/// The total order over staker kinds. Discriminants are the sort keys;
/// their relative order is consensus-critical and must never change.
#[derive(
    Encode,
    Decode,
    Serialize,
    Deserialize,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Debug,
    Hash,
)]
pub enum StakerPriority {
    /// Pending permissioned subnet validator.
    PendingSubnetPermissionedValidator = 0,
    /// Pending permissionless subnet validator.
    PendingSubnetPermissionlessValidator = 1,
    /// Pending primary-network validator.
    PendingPrimaryNetworkValidator = 2,
    /// Pending permissionless subnet delegator.
    PendingSubnetPermissionlessDelegator = 3,
    /// Pending primary-network delegator.
    PendingPrimaryNetworkDelegator = 4,
    /// Current permissioned subnet validator.
    CurrentSubnetPermissionedValidator = 5,
    /// Current permissionless subnet validator.
    CurrentSubnetPermissionlessValidator = 6,
    /// Current primary-network validator.
    CurrentPrimaryNetworkValidator = 7,
    /// Current permissionless subnet delegator.
    CurrentSubnetPermissionlessDelegator = 8,
    /// Current primary-network delegator.
    CurrentPrimaryNetworkDelegator = 9,
}

impl StakerPriority {
    /// True for every current-set priority.
    pub fn is_current(&self) -> bool {
        *self >= StakerPriority::CurrentSubnetPermissionedValidator
    }

    /// True for every pending-set priority.
    pub fn is_pending(&self) -> bool {
        !self.is_current()
    }

    /// True for validators, pending or current.
    pub fn is_validator(&self) -> bool {
        matches!(
            self,
            StakerPriority::PendingSubnetPermissionedValidator
                | StakerPriority::PendingSubnetPermissionlessValidator
                | StakerPriority::PendingPrimaryNetworkValidator
                | StakerPriority::CurrentSubnetPermissionedValidator
                | StakerPriority::CurrentSubnetPermissionlessValidator
                | StakerPriority::CurrentPrimaryNetworkValidator
        )
    }

    /// True for delegators, pending or current.
    pub fn is_delegator(&self) -> bool {
        !self.is_validator()
    }

    /// True only for permissioned subnet validators. These never accrue
    /// rewards and are the only stakers `RemoveSubnetValidatorTx` may remove.
    pub fn is_permissioned_validator(&self) -> bool {
        matches!(
            self,
            StakerPriority::PendingSubnetPermissionedValidator
                | StakerPriority::CurrentSubnetPermissionedValidator
        )
    }

    /// The current-set counterpart of this priority.
    pub fn as_current(&self) -> StakerPriority {
        match self {
            StakerPriority::PendingSubnetPermissionedValidator => {
                StakerPriority::CurrentSubnetPermissionedValidator
            }
            StakerPriority::PendingSubnetPermissionlessValidator => {
                StakerPriority::CurrentSubnetPermissionlessValidator
            }
            StakerPriority::PendingPrimaryNetworkValidator => {
                StakerPriority::CurrentPrimaryNetworkValidator
            }
            StakerPriority::PendingSubnetPermissionlessDelegator => {
                StakerPriority::CurrentSubnetPermissionlessDelegator
            }
            StakerPriority::PendingPrimaryNetworkDelegator => {
                StakerPriority::CurrentPrimaryNetworkDelegator
            }
            current => *current,
        }
    }
}

/// One staker: a validator or delegator bound to a subnet.
#[derive(Encode, Decode, Serialize, Deserialize, Clone, PartialEq, Eq, Debug, Hash)]
pub struct Staker {
    /// The transaction that created this staker.
    pub tx_id: TxId,
    /// The staking node.
    pub node_id: NodeId,
    /// The subnet being validated or delegated on.
    pub subnet_id: SubnetId,
    /// Consensus weight.
    pub weight: u64,
    /// When this staker starts (or started) staking.
    pub start_time: u64,
    /// When this staker stops staking. [`MAX_TIME`] for continuous stakers
    /// that have not been stopped.
    pub end_time: u64,
    /// The earliest time a continuous staker may be shut down: one full
    /// staking period after its start.
    pub earliest_stop_time: u64,
    /// The reward minted for this staker at insertion time, paid out (or
    /// burned) on removal. Zero for permissioned subnet validators.
    pub potential_reward: u64,
    /// Position in the staker total order.
    pub priority: StakerPriority,
}

impl Staker {
    /// Builds a pending staker from a pre-continuous-staking transaction:
    /// the stated start and end times are honored as-is.
    pub fn new_pending(
        tx_id: TxId,
        node_id: NodeId,
        subnet_id: SubnetId,
        weight: u64,
        start_time: u64,
        end_time: u64,
        priority: StakerPriority,
    ) -> Self {
        debug_assert!(priority.is_pending());
        Self {
            tx_id,
            node_id,
            subnet_id,
            weight,
            start_time,
            end_time,
            earliest_stop_time: end_time,
            potential_reward: 0,
            priority,
        }
    }

    /// Builds a current staker starting now. `end_time_bound` caps the end
    /// time (the primary validator's end for delegators, the staking period
    /// for subnet validators, [`MAX_TIME`] for primary validators); the
    /// earliest stop time is one staking period after `chain_time`, also
    /// capped by the bound.
    pub fn new_current(
        tx_id: TxId,
        node_id: NodeId,
        subnet_id: SubnetId,
        weight: u64,
        chain_time: u64,
        staking_period: u64,
        end_time_bound: u64,
        potential_reward: u64,
        priority: StakerPriority,
    ) -> Self {
        debug_assert!(priority.is_current());
        let earliest_stop = chain_time.saturating_add(staking_period).min(end_time_bound);
        Self {
            tx_id,
            node_id,
            subnet_id,
            weight,
            start_time: chain_time,
            end_time: end_time_bound,
            earliest_stop_time: earliest_stop,
            potential_reward,
            priority,
        }
    }

    /// The time of this staker's next lifecycle transition: its start if
    /// pending, its end otherwise. Drives iteration order.
    pub fn next_transition_time(&self) -> u64 {
        if self.priority.is_pending() {
            self.start_time
        } else {
            self.end_time
        }
    }

    /// Truncates this staker's lifetime so it is removed once `stop_time`
    /// is reached. Used by the stop-staker path; `stop_time` never precedes
    /// the staker's earliest admissible stop.
    pub fn mark_for_removal_before(&mut self, stop_time: u64) {
        self.earliest_stop_time = stop_time;
        self.end_time = self.end_time.min(stop_time);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_order_matches_lifecycle_buckets() {
        // Every pending priority sorts before every current priority.
        let pending = [
            StakerPriority::PendingSubnetPermissionedValidator,
            StakerPriority::PendingSubnetPermissionlessValidator,
            StakerPriority::PendingPrimaryNetworkValidator,
            StakerPriority::PendingSubnetPermissionlessDelegator,
            StakerPriority::PendingPrimaryNetworkDelegator,
        ];
        let current = [
            StakerPriority::CurrentSubnetPermissionedValidator,
            StakerPriority::CurrentSubnetPermissionlessValidator,
            StakerPriority::CurrentPrimaryNetworkValidator,
            StakerPriority::CurrentSubnetPermissionlessDelegator,
            StakerPriority::CurrentPrimaryNetworkDelegator,
        ];
        for p in pending {
            assert!(p.is_pending());
            for c in current {
                assert!(c.is_current());
                assert!(p < c);
            }
            assert!(p.as_current().is_current());
        }
    }

    #[test]
    fn validators_sort_before_delegators_within_bucket() {
        assert!(
            StakerPriority::CurrentPrimaryNetworkValidator
                < StakerPriority::CurrentPrimaryNetworkDelegator
        );
        assert!(
            StakerPriority::PendingSubnetPermissionlessValidator
                < StakerPriority::PendingSubnetPermissionlessDelegator
        );
    }

    #[test]
    fn current_staker_stop_bounds() {
        let staker = Staker::new_current(
            TxId([1; 32]),
            NodeId([2; 20]),
            SubnetId::PRIMARY,
            1_000,
            100,
            50,
            MAX_TIME,
            7,
            StakerPriority::CurrentPrimaryNetworkValidator,
        );
        assert_eq!(staker.start_time, 100);
        assert_eq!(staker.end_time, MAX_TIME);
        assert_eq!(staker.earliest_stop_time, 150);

        let mut stopped = staker;
        stopped.mark_for_removal_before(150);
        assert_eq!(stopped.end_time, 150);
        assert_eq!(stopped.next_transition_time(), 150);
    }
}
