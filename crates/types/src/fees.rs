// Path: crates/types/src/fees.rs
//! Multidimensional transaction complexity and tip accounting.
//!
//! Post-E-upgrade, a transaction's fee is a linear function of its measured
//! complexity across four dimensions. Complexity adds component-wise with
//! saturation; block capacity is enforced per dimension.

use crate::error::FeeError;
use parity_scale_codec::{Decode, Encode};
use serde::{Deserialize, Serialize};

/// The number of fee dimensions.
pub const NUM_DIMENSIONS: usize = 4;

/// The denominator of tip percentages: a tip of 1% is encoded as `10_000`.
pub const TIP_DENOMINATOR: u64 = 1_000_000;

/// One axis of transaction complexity.
#[derive(
    Encode, Decode, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug, Hash,
)]
pub enum Dimension {
    /// Bytes moved across the wire: the serialized transaction itself.
    Bandwidth = 0,
    /// State entries read during verification and execution.
    DbRead = 1,
    /// State entries written or deleted.
    DbWrite = 2,
    /// Signature verification and other CPU work.
    Compute = 3,
}

impl Dimension {
    /// All dimensions, in index order.
    pub const ALL: [Dimension; NUM_DIMENSIONS] = [
        Dimension::Bandwidth,
        Dimension::DbRead,
        Dimension::DbWrite,
        Dimension::Compute,
    ];
}

/// A fixed-size tuple of per-dimension complexity (or unit-fee) values.
#[derive(
    Encode,
    Decode,
    Serialize,
    Deserialize,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Debug,
    Default,
    Hash,
)]
pub struct Dimensions(pub [u64; NUM_DIMENSIONS]);

impl Dimensions {
    /// All-zero complexity.
    pub const EMPTY: Self = Self([0; NUM_DIMENSIONS]);

    /// The unbounded cap.
    pub const MAX: Self = Self([u64::MAX; NUM_DIMENSIONS]);

    /// Builds a tuple from explicit per-dimension values.
    pub const fn new(bandwidth: u64, db_read: u64, db_write: u64, compute: u64) -> Self {
        Self([bandwidth, db_read, db_write, compute])
    }

    /// Reads one component.
    pub fn get(&self, d: Dimension) -> u64 {
        self.0[d as usize]
    }

    /// Writes one component.
    pub fn set(&mut self, d: Dimension, v: u64) {
        self.0[d as usize] = v;
    }

    /// Returns true if every component is zero.
    pub fn is_empty(&self) -> bool {
        *self == Self::EMPTY
    }

    /// Component-wise saturating addition.
    pub fn saturating_add(&self, other: &Self) -> Self {
        let mut out = [0u64; NUM_DIMENSIONS];
        for (i, slot) in out.iter_mut().enumerate() {
            *slot = self.0[i].saturating_add(other.0[i]);
        }
        Self(out)
    }

    /// Component-wise subtraction; `None` if any component would underflow.
    pub fn checked_sub(&self, other: &Self) -> Option<Self> {
        let mut out = [0u64; NUM_DIMENSIONS];
        for (i, slot) in out.iter_mut().enumerate() {
            *slot = self.0[i].checked_sub(other.0[i])?;
        }
        Some(Self(out))
    }

    /// Returns the first dimension in which `self` exceeds `cap`, if any.
    pub fn first_exceeding(&self, cap: &Self) -> Option<Dimension> {
        Dimension::ALL
            .into_iter()
            .find(|&d| self.get(d) > cap.get(d))
    }
}

/// A tip expressed as a fraction of the required fee, with denominator
/// [`TIP_DENOMINATOR`].
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
    Default,
    Hash,
)]
pub struct TipPercentage(pub u64);

impl TipPercentage {
    /// No tip.
    pub const ZERO: Self = Self(0);

    /// Rejects tips above 100% of the required fee.
    pub fn validate(&self) -> Result<(), FeeError> {
        if self.0 > TIP_DENOMINATOR {
            return Err(FeeError::TipTooLarge(self.0));
        }
        Ok(())
    }
}
