// Path: crates/tx/src/fee/mod.rs
//! The transaction fee calculator.
//!
//! Before the E-Upgrade, fees come from the static per-variant schedule
//! (with the Apricot-Phase-3 gate on the creation fees). After it, a
//! transaction's fee is its metered complexity priced by the per-block
//! [`FeeManager`], cumulated against the block cap, plus an optional tip.

pub mod manager;
pub mod meter;

pub use manager::FeeManager;

use trellis_types::config::{DynamicFeesConfig, PlatformConfig};
use trellis_types::error::FeeError;
use trellis_types::fees::{Dimensions, TipPercentage, TIP_DENOMINATOR};
use trellis_types::ids::SubnetId;
use trellis_types::tx::{Tx, UnsignedTx};
use trellis_types::utxo::{TransferInput, TransferOutput};

/// The fee accounting shared by every transaction of one block.
#[derive(Clone, Debug)]
pub struct BlockFeeState {
    /// The per-block complexity accumulator and price list.
    pub manager: FeeManager,
    /// The per-block complexity cap.
    pub block_max_complexity: Dimensions,
}

impl BlockFeeState {
    /// Builds block fee state from the effective dynamic-fee parameters.
    pub fn new(cfg: &DynamicFeesConfig) -> Self {
        Self {
            manager: FeeManager::new(cfg.unit_fees),
            block_max_complexity: cfg.block_max_complexity,
        }
    }
}

/// Computes one transaction's required fee.
pub struct FeeCalculator<'a> {
    config: &'a PlatformConfig,
    chain_time: u64,
    is_e_active: bool,
    // Post-E-upgrade accounting; absent in the static regime.
    block_fees: Option<&'a mut BlockFeeState>,
    tip_percentage: TipPercentage,
    fee: u64,
}

impl<'a> FeeCalculator<'a> {
    /// A static calculator for the pre-E-upgrade regime.
    pub fn new_static(config: &'a PlatformConfig, chain_time: u64) -> Self {
        Self {
            config,
            chain_time,
            is_e_active: false,
            block_fees: None,
            tip_percentage: TipPercentage::ZERO,
            fee: 0,
        }
    }

    /// A dynamic calculator. Must be used once the E-Upgrade is active;
    /// `block_fees` is shared by every transaction of the block.
    pub fn new_dynamic(
        config: &'a PlatformConfig,
        chain_time: u64,
        block_fees: &'a mut BlockFeeState,
    ) -> Self {
        Self {
            config,
            chain_time,
            is_e_active: true,
            block_fees: Some(block_fees),
            tip_percentage: TipPercentage::ZERO,
            fee: 0,
        }
    }

    /// Selects the regime from the fork schedule at `chain_time`.
    pub fn new(
        config: &'a PlatformConfig,
        chain_time: u64,
        block_fees: &'a mut BlockFeeState,
    ) -> Self {
        if config.forks.is_e_upgrade_active(chain_time) {
            Self::new_dynamic(config, chain_time, block_fees)
        } else {
            Self::new_static(config, chain_time)
        }
    }

    /// The fee computed so far.
    pub fn fee(&self) -> u64 {
        self.fee
    }

    /// The tip computed by [`FeeCalculator::calculate_tip_percentage`], or
    /// set beforehand when building a transaction.
    pub fn tip_percentage(&self) -> TipPercentage {
        self.tip_percentage
    }

    /// Sets the tip used to price subsequent complexity.
    pub fn set_tip_percentage(&mut self, tip: TipPercentage) {
        self.tip_percentage = tip;
    }

    /// The total required fee of `tx` under the active regime. In the
    /// dynamic regime this also cumulates the transaction's complexity into
    /// the block accumulator.
    pub fn compute_fee(&mut self, tx: &Tx) -> Result<u64, FeeError> {
        let static_fees = &self.config.static_fees;
        match &tx.unsigned {
            // Legacy staking forms keep their static fees in every regime.
            UnsignedTx::AddValidator(_) => {
                self.fee = static_fees.add_primary_network_validator_fee;
            }
            UnsignedTx::AddDelegator(_) => {
                self.fee = static_fees.add_primary_network_delegator_fee;
            }
            // Proposal forms are fee-free.
            UnsignedTx::AdvanceTime(_) | UnsignedTx::RewardValidator(_) => {
                self.fee = 0;
            }
            UnsignedTx::Base(_) if !self.is_e_active => {
                self.fee = static_fees.tx_fee;
            }
            UnsignedTx::Import(_) | UnsignedTx::Export(_) if !self.is_e_active => {
                self.fee = static_fees.tx_fee;
            }
            UnsignedTx::RemoveSubnetValidator(_) | UnsignedTx::StopStaker(_)
                if !self.is_e_active =>
            {
                self.fee = static_fees.tx_fee;
            }
            UnsignedTx::CreateChain(_) if !self.is_e_active => {
                self.fee = self.config.create_blockchain_tx_fee(self.chain_time);
            }
            UnsignedTx::CreateSubnet(_) if !self.is_e_active => {
                self.fee = self.config.create_subnet_tx_fee(self.chain_time);
            }
            UnsignedTx::TransformSubnet(_) if !self.is_e_active => {
                self.fee = static_fees.transform_subnet_tx_fee;
            }
            UnsignedTx::AddSubnetValidator(_) if !self.is_e_active => {
                self.fee = static_fees.add_subnet_validator_fee;
            }
            UnsignedTx::AddPermissionlessValidator(inner) if !self.is_e_active => {
                self.fee = if inner.subnet_id == SubnetId::PRIMARY {
                    static_fees.add_primary_network_validator_fee
                } else {
                    static_fees.add_subnet_validator_fee
                };
            }
            UnsignedTx::AddPermissionlessDelegator(inner) if !self.is_e_active => {
                self.fee = if inner.subnet_id == SubnetId::PRIMARY {
                    static_fees.add_primary_network_delegator_fee
                } else {
                    static_fees.add_subnet_delegator_fee
                };
            }
            // Dynamic regime: meter and cumulate.
            unsigned => {
                let (all_outputs, all_inputs) = combined_flows(unsigned);
                let complexity = meter::meter_tx(tx, &all_outputs, &all_inputs);
                self.add_fees_for(complexity)?;
            }
        }
        Ok(self.fee)
    }

    /// Cumulates `complexity` into the block and adds its price to the
    /// running fee. Fails without cumulating if any dimension would breach
    /// the block cap.
    pub fn add_fees_for(&mut self, complexity: Dimensions) -> Result<u64, FeeError> {
        if complexity.is_empty() {
            return Ok(0);
        }
        let Some(block_fees) = self.block_fees.as_deref_mut() else {
            return Ok(0);
        };
        block_fees
            .manager
            .cumulate_complexity(complexity, block_fees.block_max_complexity)
            .map_err(|dimension| FeeError::BlockCapacityExceeded { dimension })?;
        let fee = block_fees
            .manager
            .calculate_fee(complexity, self.tip_percentage)?;
        self.fee += fee;
        Ok(fee)
    }

    /// Removes previously cumulated complexity and subtracts its price.
    /// The caller must only remove complexity it has added; the running fee
    /// cannot go negative under that invariant.
    pub fn remove_fees_for(&mut self, units: Dimensions) -> Result<u64, FeeError> {
        if units.is_empty() {
            return Ok(0);
        }
        let Some(block_fees) = self.block_fees.as_deref_mut() else {
            return Ok(0);
        };
        block_fees.manager.remove_complexity(units)?;
        let fee = block_fees
            .manager
            .calculate_fee(units, self.tip_percentage)?;
        debug_assert!(self.fee >= fee, "removing fees that were never added");
        self.fee = self.fee.saturating_sub(fee);
        Ok(fee)
    }

    /// Derives the tip from the fees actually paid, given the required fee
    /// already computed for the target transaction:
    /// `tip = (paid − required) × TIP_DENOMINATOR / required`.
    pub fn calculate_tip_percentage(
        &mut self,
        fees_paid: u64,
    ) -> Result<TipPercentage, FeeError> {
        if fees_paid < self.fee {
            return Err(FeeError::InsufficientFees {
                paid: fees_paid,
                required: self.fee,
            });
        }
        if self.fee == 0 {
            self.tip_percentage = TipPercentage::ZERO;
            return Ok(self.tip_percentage);
        }
        let tip = fees_paid - self.fee;
        let percentage =
            u128::from(tip) * u128::from(TIP_DENOMINATOR) / u128::from(self.fee);
        let percentage = u64::try_from(percentage)
            .map_err(|_| FeeError::FeeCalculationFailed("tip overflows u64".to_string()))?;
        self.tip_percentage = TipPercentage(percentage);
        self.tip_percentage.validate()?;
        Ok(self.tip_percentage)
    }
}

/// The combined produced outputs and consumed inputs of a transaction,
/// including stake outputs, imported inputs, and exported outputs.
fn combined_flows(unsigned: &UnsignedTx) -> (Vec<TransferOutput>, Vec<TransferInput>) {
    let mut outputs: Vec<TransferOutput> = Vec::new();
    let mut inputs: Vec<TransferInput> = Vec::new();
    if let Some(base) = unsigned.base_fields() {
        outputs.extend(base.outputs.iter().cloned());
        inputs.extend(base.inputs.iter().cloned());
    }
    match unsigned {
        UnsignedTx::Import(tx) => inputs.extend(tx.imported_inputs.iter().cloned()),
        UnsignedTx::Export(tx) => outputs.extend(tx.exported_outputs.iter().cloned()),
        _ => {
            if let Some(view) = unsigned.staker_view() {
                outputs.extend(view.stake_outputs.iter().cloned());
            }
        }
    }
    (outputs, inputs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use trellis_types::config::{ForkSchedule, StaticFeeConfig};
    use trellis_types::fees::Dimension;
    use trellis_types::ids::ChainId;
    use trellis_types::tx::{BaseTx, BaseTxFields};

    fn config(e_active: bool) -> PlatformConfig {
        PlatformConfig {
            static_fees: StaticFeeConfig {
                tx_fee: 77,
                create_asset_tx_fee: 5,
                create_subnet_tx_fee: 50,
                create_blockchain_tx_fee: 60,
                transform_subnet_tx_fee: 90,
                add_primary_network_validator_fee: 11,
                add_primary_network_delegator_fee: 12,
                add_subnet_validator_fee: 13,
                add_subnet_delegator_fee: 14,
            },
            forks: if e_active {
                ForkSchedule::all_active()
            } else {
                ForkSchedule::none_active()
            },
            ..PlatformConfig::default()
        }
    }

    fn base_tx() -> Tx {
        Tx {
            version: 0,
            unsigned: UnsignedTx::Base(BaseTx {
                base: BaseTxFields {
                    network_id: 0,
                    chain_id: ChainId::PLATFORM,
                    inputs: vec![],
                    outputs: vec![],
                    memo: vec![],
                },
            }),
            credentials: vec![],
        }
    }

    #[test]
    fn static_base_tx_pays_the_flat_fee() {
        let config = config(false);
        let mut calc = FeeCalculator::new_static(&config, 0);
        assert_eq!(calc.compute_fee(&base_tx()).unwrap(), 77);
    }

    #[test]
    fn dynamic_fee_prices_metered_complexity() {
        let config = config(true);
        let mut fees = BlockFeeState::new(&DynamicFeesConfig::E_UPGRADE);
        let tx = base_tx();
        let mut calc = FeeCalculator::new_dynamic(&config, 0, &mut fees);
        let fee = calc.compute_fee(&tx).unwrap();
        // With unit fees (1, 2, 3, 4) and an empty tx the only complexity
        // is bandwidth, priced at 1 per byte.
        let expected_bandwidth = tx.unsigned_bytes().len() as u64
            + meter::VERSION_SIZE
            + meter::SLICE_LEN_PREFIX_SIZE;
        assert_eq!(fee, expected_bandwidth);
    }

    #[test]
    fn add_fees_for_respects_the_block_cap() {
        let config = config(true);
        let custom = DynamicFeesConfig {
            unit_fees: Dimensions::new(1, 2, 3, 4),
            block_max_complexity: Dimensions::new(150, 0, 0, 0),
        };
        let mut fees = BlockFeeState::new(&custom);
        let mut calc = FeeCalculator::new_dynamic(&config, 0, &mut fees);

        let complexity = Dimensions::new(100, 0, 0, 0);
        assert_eq!(calc.add_fees_for(complexity).unwrap(), 100);
        assert_eq!(
            calc.add_fees_for(complexity),
            Err(FeeError::BlockCapacityExceeded {
                dimension: Dimension::Bandwidth
            })
        );
    }

    #[test]
    fn add_then_remove_is_neutral() {
        let config = config(true);
        let mut fees = BlockFeeState::new(&DynamicFeesConfig::E_UPGRADE);
        let mut calc = FeeCalculator::new_dynamic(&config, 0, &mut fees);

        let complexity = Dimensions::new(40, 4, 2, 1);
        calc.add_fees_for(complexity).unwrap();
        let fee_before = calc.fee();
        calc.add_fees_for(complexity).unwrap();
        calc.remove_fees_for(complexity).unwrap();
        assert_eq!(calc.fee(), fee_before);
        drop(calc);
        assert_eq!(fees.manager.cumulated(), complexity);
    }

    #[test]
    fn tip_percentage_requires_covering_the_fee() {
        let config = config(false);
        let mut calc = FeeCalculator::new_static(&config, 0);
        calc.compute_fee(&base_tx()).unwrap();
        assert_eq!(
            calc.calculate_tip_percentage(76),
            Err(FeeError::InsufficientFees {
                paid: 76,
                required: 77
            })
        );
        // Paying double the required fee is a 100% tip.
        let tip = calc.calculate_tip_percentage(154).unwrap();
        assert_eq!(tip, TipPercentage(TIP_DENOMINATOR));
    }

    #[test]
    fn zero_required_fee_means_zero_tip() {
        let config = config(false);
        let mut calc = FeeCalculator::new_static(&config, 0);
        calc.compute_fee(&Tx {
            version: 0,
            unsigned: UnsignedTx::AdvanceTime(trellis_types::tx::AdvanceTimeTx { time: 9 }),
            credentials: vec![],
        })
        .unwrap();
        assert_eq!(
            calc.calculate_tip_percentage(5).unwrap(),
            TipPercentage::ZERO
        );
    }

    #[test]
    fn creation_fees_follow_apricot_phase3() {
        let mut config = config(false);
        config.forks.apricot_phase3_time = Some(100);
        let tx = Tx {
            version: 0,
            unsigned: UnsignedTx::CreateSubnet(trellis_types::tx::CreateSubnetTx {
                base: BaseTxFields::default(),
                owner: Default::default(),
            }),
            credentials: vec![],
        };
        let mut before = FeeCalculator::new_static(&config, 99);
        assert_eq!(before.compute_fee(&tx).unwrap(), 5);
        let mut after = FeeCalculator::new_static(&config, 100);
        assert_eq!(after.compute_fee(&tx).unwrap(), 50);
    }
}
