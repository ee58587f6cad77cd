// Path: crates/types/src/config/mod.rs
//! Platform configuration: staking bounds, fee schedules, reward curves.
//!
//! Configuration is plain data passed explicitly at construction. There is
//! no process-global mutable configuration anywhere in the workspace; the
//! dynamic-fee override in particular is an explicit constructor argument,
//! rejected outright on production networks.

mod forks;

pub use forks::ForkSchedule;

use crate::error::ConfigError;
use crate::fees::Dimensions;
use crate::ids::{AssetId, SubnetId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// How far ahead of chain time a pre-continuous-staking staker may schedule
/// its start: 24 hours.
pub const MAX_FUTURE_START_TIME: u64 = 24 * 60 * 60;

/// Default delegation capacity as a multiple of validator weight. Subnets
/// override it through their `TransformSubnetTx`.
pub const MAX_VALIDATOR_WEIGHT_FACTOR: u8 = 5;

/// The denominator of consumption rates and delegation-fee shares.
pub const RATE_DENOMINATOR: u64 = 1_000_000;

/// A network identifier. Production networks refuse fee overrides.
#[derive(
    Serialize, Deserialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug, Default, Hash,
)]
#[serde(transparent)]
pub struct NetworkId(pub u32);

impl NetworkId {
    /// The production network.
    pub const MAINNET: Self = Self(1);
    /// The public test network.
    pub const TESTNET: Self = Self(5);
    /// A local single-operator network.
    pub const LOCAL: Self = Self(12345);

    /// True for networks whose fee parameters are consensus-frozen.
    pub fn is_production(&self) -> bool {
        *self == Self::MAINNET || *self == Self::TESTNET
    }
}

/// The static fee schedule, effective until the E-Upgrade activates.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StaticFeeConfig {
    /// Flat fee for generic fee-bearing transactions.
    pub tx_fee: u64,
    /// Fee for asset-creating operations; also the pre-Apricot-Phase-3 fee
    /// for subnet and blockchain creation.
    pub create_asset_tx_fee: u64,
    /// Fee for `CreateSubnetTx` once Apricot Phase 3 is active.
    pub create_subnet_tx_fee: u64,
    /// Fee for `CreateChainTx` once Apricot Phase 3 is active.
    pub create_blockchain_tx_fee: u64,
    /// Fee for `TransformSubnetTx`.
    pub transform_subnet_tx_fee: u64,
    /// Fee for adding a primary-network validator.
    pub add_primary_network_validator_fee: u64,
    /// Fee for adding a primary-network delegator.
    pub add_primary_network_delegator_fee: u64,
    /// Fee for adding a subnet validator.
    pub add_subnet_validator_fee: u64,
    /// Fee for adding a subnet delegator.
    pub add_subnet_delegator_fee: u64,
}

/// Unit fees and block caps for the dynamic, complexity-metered fee regime.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct DynamicFeesConfig {
    /// Fee per unit of complexity, per dimension.
    pub unit_fees: Dimensions,
    /// The maximum cumulative complexity a block may host, per dimension.
    pub block_max_complexity: Dimensions,
}

impl DynamicFeesConfig {
    /// The parameters that take effect when the E-Upgrade activates.
    pub const E_UPGRADE: Self = Self {
        unit_fees: Dimensions::new(1, 2, 3, 4),
        block_max_complexity: Dimensions::MAX,
    };

    /// The placeholder parameters before the E-Upgrade: no unit fees, no cap.
    pub const PRE_E_UPGRADE: Self = Self {
        unit_fees: Dimensions::EMPTY,
        block_max_complexity: Dimensions::MAX,
    };

    /// Selects the effective dynamic-fee parameters for a chain timestamp.
    /// `custom` substitutes for the defaults post-activation and must have
    /// been admitted through [`DynamicFeesConfig::custom_for`].
    pub fn effective(
        forks: &ForkSchedule,
        timestamp: u64,
        custom: Option<&DynamicFeesConfig>,
    ) -> Self {
        if !forks.is_e_upgrade_active(timestamp) {
            return Self::PRE_E_UPGRADE;
        }
        custom.copied().unwrap_or(Self::E_UPGRADE)
    }

    /// Admits a custom fee configuration for a network. Production networks
    /// are refused: their parameters change only through a fork.
    pub fn custom_for(network: NetworkId, cfg: DynamicFeesConfig) -> Result<Self, ConfigError> {
        if network.is_production() {
            return Err(ConfigError::ForbiddenDynamicFeeOverride { network: network.0 });
        }
        Ok(cfg)
    }
}

/// The reward curve parameters of one subnet.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RewardConfig {
    /// Consumption rate for a maximal-length stake, denominator
    /// [`RATE_DENOMINATOR`].
    pub max_consumption_rate: u64,
    /// Consumption rate for a minimal-length stake, denominator
    /// [`RATE_DENOMINATOR`].
    pub min_consumption_rate: u64,
    /// The period over which the consumption rate is expressed, in seconds.
    pub mint_period: u64,
    /// The supply at which minting stops.
    pub supply_cap: u64,
}

/// The platform chain's own configuration.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct PlatformConfig {
    /// The network this node runs on.
    pub network_id: NetworkId,
    /// The platform's staking asset.
    pub asset_id: AssetId,
    /// Minimum primary-network validator stake.
    pub min_validator_stake: u64,
    /// Maximum primary-network validator stake; also caps delegated weight
    /// post-Apricot-Phase-3.
    pub max_validator_stake: u64,
    /// Minimum primary-network delegator stake.
    pub min_delegator_stake: u64,
    /// Minimum delegation fee share, denominator [`RATE_DENOMINATOR`].
    pub min_delegation_fee: u32,
    /// Minimum staking period in seconds.
    pub min_stake_duration: u64,
    /// Maximum staking period in seconds.
    pub max_stake_duration: u64,
    /// The static fee schedule.
    pub static_fees: StaticFeeConfig,
    /// The fork schedule.
    pub forks: ForkSchedule,
    /// The primary network's reward curve.
    pub reward_config: RewardConfig,
    /// Subnets this node tracks; their validator sets are cached.
    pub tracked_subnets: BTreeSet<SubnetId>,
    /// Overrides minimum-height queries to always answer with the last
    /// accepted height.
    pub use_current_height: bool,
}

impl PlatformConfig {
    /// The `CreateSubnetTx` fee at `timestamp`: the dedicated subnet fee
    /// post-Apricot-Phase-3, the generic asset fee before.
    pub fn create_subnet_tx_fee(&self, timestamp: u64) -> u64 {
        if self.forks.is_apricot_phase3_active(timestamp) {
            self.static_fees.create_subnet_tx_fee
        } else {
            self.static_fees.create_asset_tx_fee
        }
    }

    /// The `CreateChainTx` fee at `timestamp`.
    pub fn create_blockchain_tx_fee(&self, timestamp: u64) -> u64 {
        if self.forks.is_apricot_phase3_active(timestamp) {
            self.static_fees.create_blockchain_tx_fee
        } else {
            self.static_fees.create_asset_tx_fee
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn production_networks_refuse_fee_overrides() {
        let custom = DynamicFeesConfig {
            unit_fees: Dimensions::new(9, 9, 9, 9),
            block_max_complexity: Dimensions::MAX,
        };
        assert!(DynamicFeesConfig::custom_for(NetworkId::MAINNET, custom).is_err());
        assert!(DynamicFeesConfig::custom_for(NetworkId::TESTNET, custom).is_err());
        assert!(DynamicFeesConfig::custom_for(NetworkId::LOCAL, custom).is_ok());
    }

    #[test]
    fn effective_fees_follow_the_fork() {
        let forks = ForkSchedule {
            e_upgrade_time: Some(1_000),
            ..ForkSchedule::default()
        };
        assert_eq!(
            DynamicFeesConfig::effective(&forks, 999, None),
            DynamicFeesConfig::PRE_E_UPGRADE
        );
        assert_eq!(
            DynamicFeesConfig::effective(&forks, 1_000, None),
            DynamicFeesConfig::E_UPGRADE
        );

        let custom = DynamicFeesConfig {
            unit_fees: Dimensions::new(5, 5, 5, 5),
            block_max_complexity: Dimensions::MAX,
        };
        assert_eq!(
            DynamicFeesConfig::effective(&forks, 1_000, Some(&custom)),
            custom
        );
        // A custom config never applies before activation.
        assert_eq!(
            DynamicFeesConfig::effective(&forks, 999, Some(&custom)),
            DynamicFeesConfig::PRE_E_UPGRADE
        );
    }

    #[test]
    fn platform_config_round_trips_through_json() {
        let mut cfg = PlatformConfig {
            network_id: NetworkId::LOCAL,
            min_validator_stake: 2_000,
            max_stake_duration: 365 * 24 * 60 * 60,
            forks: ForkSchedule {
                apricot_phase3_time: Some(100),
                e_upgrade_time: Some(9_000),
                ..ForkSchedule::default()
            },
            ..PlatformConfig::default()
        };
        cfg.tracked_subnets.insert(crate::ids::SubnetId([7; 32]));

        let json = serde_json::to_string(&cfg).unwrap();
        let parsed: PlatformConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, cfg);
    }

    #[test]
    fn creation_fees_are_apricot_gated() {
        let cfg = PlatformConfig {
            static_fees: StaticFeeConfig {
                create_asset_tx_fee: 10,
                create_subnet_tx_fee: 100,
                create_blockchain_tx_fee: 200,
                ..StaticFeeConfig::default()
            },
            forks: ForkSchedule {
                apricot_phase3_time: Some(50),
                ..ForkSchedule::default()
            },
            ..PlatformConfig::default()
        };
        assert_eq!(cfg.create_subnet_tx_fee(49), 10);
        assert_eq!(cfg.create_subnet_tx_fee(50), 100);
        assert_eq!(cfg.create_blockchain_tx_fee(49), 10);
        assert_eq!(cfg.create_blockchain_tx_fee(50), 200);
    }
}
