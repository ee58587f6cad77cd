// Path: crates/tx/src/fee/manager.rs
//! The per-block fee manager: unit fees plus the running complexity total.

use trellis_types::error::FeeError;
use trellis_types::fees::{Dimension, Dimensions, TipPercentage, TIP_DENOMINATOR};

/// Tracks cumulative block complexity and prices it.
///
/// One manager lives per block under construction or verification; every
/// transaction's metered complexity is cumulated into it, and removed again
/// if the transaction is evicted.
#[derive(Clone, Debug)]
pub struct FeeManager {
    unit_fees: Dimensions,
    cumulated: Dimensions,
}

impl FeeManager {
    /// A manager with the given unit fees and nothing cumulated.
    pub fn new(unit_fees: Dimensions) -> Self {
        Self {
            unit_fees,
            cumulated: Dimensions::EMPTY,
        }
    }

    /// The complexity cumulated so far.
    pub fn cumulated(&self) -> Dimensions {
        self.cumulated
    }

    /// Adds `units` to the running total, failing with the first breached
    /// dimension if the result would exceed `cap`. On failure nothing is
    /// cumulated.
    pub fn cumulate_complexity(
        &mut self,
        units: Dimensions,
        cap: Dimensions,
    ) -> Result<(), Dimension> {
        let next = self.cumulated.saturating_add(&units);
        if let Some(dimension) = next.first_exceeding(&cap) {
            return Err(dimension);
        }
        self.cumulated = next;
        Ok(())
    }

    /// Removes `units` from the running total. Removing complexity that was
    /// never cumulated is a caller bug and fails.
    pub fn remove_complexity(&mut self, units: Dimensions) -> Result<(), FeeError> {
        self.cumulated = self
            .cumulated
            .checked_sub(&units)
            .ok_or(FeeError::ComplexityUnderflow)?;
        Ok(())
    }

    /// Prices `units` at the unit fees, scaled by `1 + tip/TIP_DENOMINATOR`.
    pub fn calculate_fee(
        &self,
        units: Dimensions,
        tip: TipPercentage,
    ) -> Result<u64, FeeError> {
        tip.validate()?;
        let mut fee: u128 = 0;
        for d in Dimension::ALL {
            fee = fee
                .checked_add(u128::from(self.unit_fees.get(d)) * u128::from(units.get(d)))
                .ok_or_else(|| {
                    FeeError::FeeCalculationFailed("fee overflows u128".to_string())
                })?;
        }
        let scaled = fee * u128::from(TIP_DENOMINATOR + tip.0) / u128::from(TIP_DENOMINATOR);
        u64::try_from(scaled)
            .map_err(|_| FeeError::FeeCalculationFailed("fee overflows u64".to_string()))
    }
}
