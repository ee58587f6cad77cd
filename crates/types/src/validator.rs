// Path: crates/types/src/validator.rs
//! Validator-set snapshots and the reverse diffs that reconstruct them.

use crate::ids::{BlsPublicKey, NodeId};
use parity_scale_codec::{Decode, Encode};
use std::collections::HashMap;

/// One validator as seen by consensus at some height.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidatorSnapshot {
    /// The validating node.
    pub node_id: NodeId,
    /// Consensus weight at that height.
    pub weight: u64,
    /// The node's BLS key. Subnet snapshots borrow the key from the primary
    /// network; absent when the node predates key registration.
    pub public_key: Option<BlsPublicKey>,
}

/// A materialized validator set: node id to snapshot.
pub type ValidatorSet = HashMap<NodeId, ValidatorSnapshot>;

/// The signed weight delta recorded for one validator at one height.
///
/// Reconstruction walks heights downward and inverts each diff: a recorded
/// increase is subtracted, a recorded decrease is added back.
#[derive(Encode, Decode, Clone, Copy, Debug, PartialEq, Eq)]
pub struct ValidatorWeightDiff {
    /// True if the validator's weight decreased at this height.
    pub decrease: bool,
    /// The magnitude of the change.
    pub amount: u64,
}

impl ValidatorWeightDiff {
    /// Applies the inverse of this diff to a running weight, yielding the
    /// weight before the change. `None` means the validator did not exist
    /// before the change.
    pub fn invert(&self, weight: u64) -> Option<u64> {
        if self.decrease {
            Some(weight.saturating_add(self.amount))
        } else {
            weight.checked_sub(self.amount).filter(|w| *w > 0)
        }
    }
}

/// The public-key change recorded for one primary-network validator at one
/// height: the key it held **before** the change. `None` records that the
/// node had no key (it first registered one at this height).
#[derive(Encode, Decode, Clone, Copy, Debug, PartialEq, Eq)]
pub struct ValidatorPublicKeyDiff {
    /// The key held before this height's change, if any.
    pub previous: Option<BlsPublicKey>,
}
