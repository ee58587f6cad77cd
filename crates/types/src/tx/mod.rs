// Path: crates/types/src/tx/mod.rs
//! The signed transaction envelope and its unsigned variants.
//!
//! Unsigned transactions are a tagged sum: every variant is a plain struct
//! and [`UnsignedTx`] is the exhaustive enum over them. Dispatch in the
//! executors is a `match` per variant, so adding a variant is a compile
//! error everywhere it matters.

use crate::codec;
use crate::config::{NetworkId, RATE_DENOMINATOR};
use crate::error::ErrorCode;
use crate::ids::{hash_id, AssetId, BlsPublicKey, ChainId, NodeId, SubnetId, TxId, VmId};
use crate::staker::StakerPriority;
use crate::utxo::{OutputOwners, TransferInput, TransferOutput};
use parity_scale_codec::{Decode, Encode};
use thiserror::Error;

/// Maximum memo length in bytes.
pub const MAX_MEMO_LEN: usize = 256;

/// Maximum blockchain name length in bytes.
pub const MAX_CHAIN_NAME_LEN: usize = 128;

/// Structural errors in a transaction, independent of any state.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TxSyntaxError {
    /// The transaction targets a different network.
    #[error("wrong network id: expected {expected}, got {got}")]
    WrongNetworkId {
        /// This node's network.
        expected: u32,
        /// The network named by the transaction.
        got: u32,
    },
    /// The transaction targets a different blockchain.
    #[error("wrong chain id")]
    WrongChainId,
    /// The memo exceeds [`MAX_MEMO_LEN`].
    #[error("memo of {got} bytes exceeds the {max} byte maximum")]
    MemoTooLarge {
        /// Allowed maximum.
        max: usize,
        /// Actual length.
        got: usize,
    },
    /// Inputs are not sorted and unique by referenced UTXO.
    #[error("inputs are not sorted and unique")]
    InputsNotSortedUnique,
    /// An input claims a zero amount.
    #[error("input consumes zero value")]
    ZeroInputAmount,
    /// An output carries a zero amount.
    #[error("output produces zero value")]
    ZeroOutputAmount,
    /// A staker transaction stakes nothing.
    #[error("staker transaction has no stake outputs")]
    NoStakeOutputs,
    /// The declared weight does not match the staked amount.
    #[error("declared weight {weight} does not match staked amount {staked}")]
    StakeWeightMismatch {
        /// Declared validator weight.
        weight: u64,
        /// Sum of stake output amounts.
        staked: u64,
    },
    /// An owner predicate has an unsatisfiable threshold.
    #[error("threshold {threshold} unsatisfiable with {addresses} addresses")]
    InvalidThreshold {
        /// The declared threshold.
        threshold: u32,
        /// The number of candidate addresses.
        addresses: usize,
    },
    /// Owner addresses are not sorted and unique.
    #[error("owner addresses are not sorted and unique")]
    AddressesNotSortedUnique,
    /// Signature indices are not sorted and unique.
    #[error("signature indices are not sorted and unique")]
    SigIndicesNotSortedUnique,
    /// The blockchain name is empty, too long, or not printable ASCII.
    #[error("invalid blockchain name")]
    InvalidChainName,
    /// The envelope carries the wrong number of credentials for its inputs
    /// and authorizations.
    #[error("wrong number of credentials: expected {expected}, got {got}")]
    WrongNumberOfCredentials {
        /// Credentials demanded by the unsigned body.
        expected: usize,
        /// Credentials attached.
        got: usize,
    },
    /// A subnet transformation's initial supply exceeds its maximum supply.
    #[error("initial supply exceeds maximum supply")]
    InitialSupplyExceedsMaximum,
    /// A subnet transformation's stake bounds are inverted or zero.
    #[error("invalid stake bounds")]
    InvalidStakeBounds,
    /// A subnet transformation's duration bounds are inverted or zero.
    #[error("invalid stake duration bounds")]
    InvalidStakeDurationBounds,
    /// A subnet transformation's delegation fee is not a valid fraction.
    #[error("delegation fee share out of range")]
    DelegationFeeOutOfRange,
    /// A subnet transformation allows no delegation weight at all.
    #[error("max validator weight factor cannot be zero")]
    ZeroWeightFactor,
}

impl ErrorCode for TxSyntaxError {
    fn code(&self) -> &'static str {
        match self {
            Self::WrongNetworkId { .. } => "TX_WRONG_NETWORK",
            Self::WrongChainId => "TX_WRONG_CHAIN",
            Self::MemoTooLarge { .. } => "TX_MEMO_TOO_LARGE",
            Self::InputsNotSortedUnique => "TX_INPUTS_NOT_SORTED",
            Self::ZeroInputAmount => "TX_ZERO_INPUT",
            Self::ZeroOutputAmount => "TX_ZERO_OUTPUT",
            Self::NoStakeOutputs => "TX_NO_STAKE_OUTPUTS",
            Self::StakeWeightMismatch { .. } => "TX_STAKE_WEIGHT_MISMATCH",
            Self::InvalidThreshold { .. } => "TX_INVALID_THRESHOLD",
            Self::AddressesNotSortedUnique => "TX_ADDRESSES_NOT_SORTED",
            Self::SigIndicesNotSortedUnique => "TX_SIG_INDICES_NOT_SORTED",
            Self::InvalidChainName => "TX_INVALID_CHAIN_NAME",
            Self::WrongNumberOfCredentials { .. } => "TX_WRONG_CREDENTIAL_COUNT",
            Self::InitialSupplyExceedsMaximum => "TX_SUPPLY_BOUNDS",
            Self::InvalidStakeBounds => "TX_STAKE_BOUNDS",
            Self::InvalidStakeDurationBounds => "TX_STAKE_DURATION_BOUNDS",
            Self::DelegationFeeOutOfRange => "TX_DELEGATION_FEE_RANGE",
            Self::ZeroWeightFactor => "TX_ZERO_WEIGHT_FACTOR",
        }
    }
}

/// The static context a transaction is verified against.
#[derive(Clone, Copy, Debug)]
pub struct TxContext {
    /// This node's network.
    pub network_id: NetworkId,
    /// The id of the platform chain itself.
    pub chain_id: ChainId,
}

/// A set of signatures authorizing one input or one subnet modification.
/// Signature bytes are opaque here; the crypto seam interprets them.
#[derive(Encode, Decode, Clone, PartialEq, Eq, Debug, Default, Hash)]
pub struct Credential {
    /// The raw signatures, one per signature index.
    pub signatures: Vec<Vec<u8>>,
}

/// Indices into a subnet owner's address list, selecting which owners sign
/// the subnet authorization credential.
#[derive(Encode, Decode, Clone, PartialEq, Eq, Debug, Default, Hash)]
pub struct SubnetAuth {
    /// Sorted, unique indices.
    pub sig_indices: Vec<u32>,
}

impl SubnetAuth {
    fn syntactic_verify(&self) -> Result<(), TxSyntaxError> {
        if !self.sig_indices.windows(2).all(|w| w[0] < w[1]) {
            return Err(TxSyntaxError::SigIndicesNotSortedUnique);
        }
        Ok(())
    }
}

/// Fields shared by every fee-bearing transaction.
#[derive(Encode, Decode, Clone, PartialEq, Eq, Debug, Default, Hash)]
pub struct BaseTxFields {
    /// The network this transaction is bound to.
    pub network_id: u32,
    /// The blockchain this transaction is bound to.
    pub chain_id: ChainId,
    /// Consumed UTXOs, sorted and unique.
    pub inputs: Vec<TransferInput>,
    /// Produced outputs.
    pub outputs: Vec<TransferOutput>,
    /// Arbitrary memo, at most [`MAX_MEMO_LEN`] bytes.
    pub memo: Vec<u8>,
}

impl BaseTxFields {
    fn syntactic_verify(&self, ctx: &TxContext) -> Result<(), TxSyntaxError> {
        if self.network_id != ctx.network_id.0 {
            return Err(TxSyntaxError::WrongNetworkId {
                expected: ctx.network_id.0,
                got: self.network_id,
            });
        }
        if self.chain_id != ctx.chain_id {
            return Err(TxSyntaxError::WrongChainId);
        }
        if self.memo.len() > MAX_MEMO_LEN {
            return Err(TxSyntaxError::MemoTooLarge {
                max: MAX_MEMO_LEN,
                got: self.memo.len(),
            });
        }
        verify_inputs(&self.inputs)?;
        verify_outputs(&self.outputs)?;
        Ok(())
    }
}

fn verify_inputs(inputs: &[TransferInput]) -> Result<(), TxSyntaxError> {
    if !inputs.windows(2).all(|w| w[0].utxo_id < w[1].utxo_id) {
        return Err(TxSyntaxError::InputsNotSortedUnique);
    }
    for input in inputs {
        if input.amount == 0 {
            return Err(TxSyntaxError::ZeroInputAmount);
        }
        if !input.sig_indices.windows(2).all(|w| w[0] < w[1]) {
            return Err(TxSyntaxError::SigIndicesNotSortedUnique);
        }
    }
    Ok(())
}

fn verify_outputs(outputs: &[TransferOutput]) -> Result<(), TxSyntaxError> {
    for output in outputs {
        if output.amount == 0 {
            return Err(TxSyntaxError::ZeroOutputAmount);
        }
        output.owners.syntactic_verify()?;
    }
    Ok(())
}

fn verify_stake(
    declared_weight: u64,
    stake_outputs: &[TransferOutput],
) -> Result<(), TxSyntaxError> {
    if stake_outputs.is_empty() {
        return Err(TxSyntaxError::NoStakeOutputs);
    }
    verify_outputs(stake_outputs)?;
    let staked = stake_outputs
        .iter()
        .try_fold(0u64, |acc, o| acc.checked_add(o.amount))
        .ok_or(TxSyntaxError::StakeWeightMismatch {
            weight: declared_weight,
            staked: u64::MAX,
        })?;
    if staked != declared_weight {
        return Err(TxSyntaxError::StakeWeightMismatch {
            weight: declared_weight,
            staked,
        });
    }
    Ok(())
}

/// The staking header carried by every staker transaction. The start and end
/// times are honored literally before the continuous-staking fork; after it,
/// only their difference (the staking period) matters.
#[derive(Encode, Decode, Clone, Copy, PartialEq, Eq, Debug, Default, Hash)]
pub struct Validator {
    /// The staking node.
    pub node_id: NodeId,
    /// Stated start time.
    pub start_time: u64,
    /// Stated end time.
    pub end_time: u64,
    /// Consensus weight, equal to the staked amount.
    pub weight: u64,
}

impl Validator {
    /// The staking period: stated end minus stated start.
    pub fn staking_period(&self) -> u64 {
        self.end_time.saturating_sub(self.start_time)
    }
}

// --- Standard transaction variants ---

/// A plain asset transfer.
#[derive(Encode, Decode, Clone, PartialEq, Eq, Debug, Default, Hash)]
pub struct BaseTx {
    /// Common fields.
    pub base: BaseTxFields,
}

/// Registers a new subnet controlled by `owner`.
#[derive(Encode, Decode, Clone, PartialEq, Eq, Debug, Default, Hash)]
pub struct CreateSubnetTx {
    /// Common fields.
    pub base: BaseTxFields,
    /// The subnet's control owner; authorizes later subnet modifications.
    pub owner: OutputOwners,
}

/// Registers a new blockchain under an existing subnet.
#[derive(Encode, Decode, Clone, PartialEq, Eq, Debug, Default, Hash)]
pub struct CreateChainTx {
    /// Common fields.
    pub base: BaseTxFields,
    /// The subnet that will validate the new chain.
    pub subnet_id: SubnetId,
    /// Human-readable chain name, printable ASCII.
    pub chain_name: String,
    /// The virtual machine the chain runs.
    pub vm_id: VmId,
    /// Opaque genesis payload handed to the VM.
    pub genesis_data: Vec<u8>,
    /// Authorization by the subnet's control owner.
    pub subnet_auth: SubnetAuth,
}

/// Moves assets into this chain from another chain's shared memory.
#[derive(Encode, Decode, Clone, PartialEq, Eq, Debug, Default, Hash)]
pub struct ImportTx {
    /// Common fields.
    pub base: BaseTxFields,
    /// The chain whose shared memory holds the imported UTXOs.
    pub source_chain: ChainId,
    /// Inputs consuming UTXOs out of the source chain's shared memory.
    pub imported_inputs: Vec<TransferInput>,
}

/// Moves assets out of this chain into another chain's shared memory.
#[derive(Encode, Decode, Clone, PartialEq, Eq, Debug, Default, Hash)]
pub struct ExportTx {
    /// Common fields.
    pub base: BaseTxFields,
    /// The chain whose shared memory receives the exported UTXOs.
    pub destination_chain: ChainId,
    /// Outputs materialized in the destination chain's shared memory.
    pub exported_outputs: Vec<TransferOutput>,
}

/// Legacy primary-network validator registration with explicit start and end
/// times.
#[derive(Encode, Decode, Clone, PartialEq, Eq, Debug, Default, Hash)]
pub struct AddValidatorTx {
    /// Common fields.
    pub base: BaseTxFields,
    /// Staking header.
    pub validator: Validator,
    /// Locked stake, returned when the staker leaves the set.
    pub stake_outputs: Vec<TransferOutput>,
    /// Where validation rewards are paid.
    pub rewards_owner: OutputOwners,
    /// The fraction of delegator rewards kept by this validator, with
    /// denominator [`RATE_DENOMINATOR`].
    pub delegation_shares: u32,
}

/// Legacy primary-network delegator registration.
#[derive(Encode, Decode, Clone, PartialEq, Eq, Debug, Default, Hash)]
pub struct AddDelegatorTx {
    /// Common fields.
    pub base: BaseTxFields,
    /// Staking header; `node_id` names the validator delegated to.
    pub validator: Validator,
    /// Locked stake.
    pub stake_outputs: Vec<TransferOutput>,
    /// Where delegation rewards are paid.
    pub rewards_owner: OutputOwners,
}

/// Adds a permissioned validator to a subnet, authorized by the subnet
/// owner.
#[derive(Encode, Decode, Clone, PartialEq, Eq, Debug, Default, Hash)]
pub struct AddSubnetValidatorTx {
    /// Common fields.
    pub base: BaseTxFields,
    /// Staking header.
    pub validator: Validator,
    /// The subnet being validated.
    pub subnet_id: SubnetId,
    /// Authorization by the subnet's control owner.
    pub subnet_auth: SubnetAuth,
}

/// Post-fork validator registration, usable on the primary network and on
/// permissionless (transformed) subnets.
#[derive(Encode, Decode, Clone, PartialEq, Eq, Debug, Default, Hash)]
pub struct AddPermissionlessValidatorTx {
    /// Common fields.
    pub base: BaseTxFields,
    /// Staking header.
    pub validator: Validator,
    /// The subnet being validated.
    pub subnet_id: SubnetId,
    /// The node's BLS key, present for primary-network validators.
    pub signer: Option<BlsPublicKey>,
    /// Locked stake.
    pub stake_outputs: Vec<TransferOutput>,
    /// Where validation rewards are paid.
    pub validation_rewards_owner: OutputOwners,
    /// Where this validator's share of delegation rewards is paid.
    pub delegation_rewards_owner: OutputOwners,
    /// Delegation fee share, denominator [`RATE_DENOMINATOR`].
    pub delegation_shares: u32,
}

/// Post-fork delegator registration.
#[derive(Encode, Decode, Clone, PartialEq, Eq, Debug, Default, Hash)]
pub struct AddPermissionlessDelegatorTx {
    /// Common fields.
    pub base: BaseTxFields,
    /// Staking header; `node_id` names the validator delegated to.
    pub validator: Validator,
    /// The subnet delegated on.
    pub subnet_id: SubnetId,
    /// Locked stake.
    pub stake_outputs: Vec<TransferOutput>,
    /// Where delegation rewards are paid.
    pub rewards_owner: OutputOwners,
}

/// Converts a permissioned subnet into a permissionless one with its own
/// staking asset and rules.
#[derive(Encode, Decode, Clone, PartialEq, Eq, Debug, Default, Hash)]
pub struct TransformSubnetTx {
    /// Common fields.
    pub base: BaseTxFields,
    /// The subnet being transformed.
    pub subnet_id: SubnetId,
    /// The subnet's staking and reward asset. Never the platform asset.
    pub asset_id: AssetId,
    /// Supply already circulating at transformation time.
    pub initial_supply: u64,
    /// Hard cap on supply; the difference funds staking rewards.
    pub maximum_supply: u64,
    /// Minimum validator stake.
    pub min_validator_stake: u64,
    /// Maximum validator stake, which also caps delegation.
    pub max_validator_stake: u64,
    /// Minimum delegator stake.
    pub min_delegator_stake: u64,
    /// Minimum delegation fee share, denominator [`RATE_DENOMINATOR`].
    pub min_delegation_fee: u32,
    /// Minimum staking period in seconds.
    pub min_stake_duration: u64,
    /// Maximum staking period in seconds.
    pub max_stake_duration: u64,
    /// Delegation capacity as a multiple of validator weight.
    pub max_validator_weight_factor: u8,
    /// Authorization by the subnet's control owner.
    pub subnet_auth: SubnetAuth,
}

/// Removes a permissioned validator from a subnet.
#[derive(Encode, Decode, Clone, PartialEq, Eq, Debug, Default, Hash)]
pub struct RemoveSubnetValidatorTx {
    /// Common fields.
    pub base: BaseTxFields,
    /// The validator to remove.
    pub node_id: NodeId,
    /// The subnet to remove it from.
    pub subnet_id: SubnetId,
    /// Authorization by the subnet's control owner.
    pub subnet_auth: SubnetAuth,
}

/// Proposal transaction: advances the chain clock. Fee-free.
#[derive(Encode, Decode, Clone, Copy, PartialEq, Eq, Debug, Default, Hash)]
pub struct AdvanceTimeTx {
    /// The proposed new chain timestamp.
    pub time: u64,
}

/// Proposal transaction: removes the next expiring staker and settles its
/// reward. Fee-free.
#[derive(Encode, Decode, Clone, Copy, PartialEq, Eq, Debug, Default, Hash)]
pub struct RewardValidatorTx {
    /// The staker transaction being settled.
    pub tx_id: TxId,
}

/// Post-continuous-staking: requests orderly shutdown of a running staker.
#[derive(Encode, Decode, Clone, PartialEq, Eq, Debug, Default, Hash)]
pub struct StopStakerTx {
    /// Common fields.
    pub base: BaseTxFields,
    /// The staker transaction to stop.
    pub tx_id: TxId,
    /// Signature indices into the staker's rewards (or subnet) owner.
    pub staker_auth: SubnetAuth,
}

// --- The tagged sum ---

/// Every unsigned transaction form the platform chain accepts.
#[derive(Encode, Decode, Clone, PartialEq, Eq, Debug, Hash)]
pub enum UnsignedTx {
    /// Asset transfer.
    Base(BaseTx),
    /// Subnet registration.
    CreateSubnet(CreateSubnetTx),
    /// Blockchain registration.
    CreateChain(CreateChainTx),
    /// Cross-chain import.
    Import(ImportTx),
    /// Cross-chain export.
    Export(ExportTx),
    /// Legacy primary-network validator.
    AddValidator(AddValidatorTx),
    /// Legacy primary-network delegator.
    AddDelegator(AddDelegatorTx),
    /// Permissioned subnet validator.
    AddSubnetValidator(AddSubnetValidatorTx),
    /// Post-fork validator.
    AddPermissionlessValidator(AddPermissionlessValidatorTx),
    /// Post-fork delegator.
    AddPermissionlessDelegator(AddPermissionlessDelegatorTx),
    /// Permissioned-to-permissionless subnet conversion.
    TransformSubnet(TransformSubnetTx),
    /// Permissioned validator removal.
    RemoveSubnetValidator(RemoveSubnetValidatorTx),
    /// Proposal: clock advance.
    AdvanceTime(AdvanceTimeTx),
    /// Proposal: staker settlement.
    RewardValidator(RewardValidatorTx),
    /// Continuous-staker shutdown request.
    StopStaker(StopStakerTx),
}

/// A borrowed view of the staking fields common to all staker transactions,
/// used by the executor's insertion path.
#[derive(Clone, Copy, Debug)]
pub struct StakerView<'a> {
    /// The staking node.
    pub node_id: NodeId,
    /// The subnet staked on.
    pub subnet_id: SubnetId,
    /// Consensus weight.
    pub weight: u64,
    /// Stated start time (pre-continuous-staking only).
    pub start_time: u64,
    /// Stated end time (pre-continuous-staking only).
    pub end_time: u64,
    /// The locked stake outputs.
    pub stake_outputs: &'a [TransferOutput],
    /// Priority if inserted pending.
    pub pending_priority: StakerPriority,
    /// Priority if inserted current.
    pub current_priority: StakerPriority,
}

impl StakerView<'_> {
    /// The staking period: stated end minus stated start.
    pub fn staking_period(&self) -> u64 {
        self.end_time.saturating_sub(self.start_time)
    }
}

impl UnsignedTx {
    /// The common fields, absent only on proposal transactions.
    pub fn base_fields(&self) -> Option<&BaseTxFields> {
        match self {
            UnsignedTx::Base(tx) => Some(&tx.base),
            UnsignedTx::CreateSubnet(tx) => Some(&tx.base),
            UnsignedTx::CreateChain(tx) => Some(&tx.base),
            UnsignedTx::Import(tx) => Some(&tx.base),
            UnsignedTx::Export(tx) => Some(&tx.base),
            UnsignedTx::AddValidator(tx) => Some(&tx.base),
            UnsignedTx::AddDelegator(tx) => Some(&tx.base),
            UnsignedTx::AddSubnetValidator(tx) => Some(&tx.base),
            UnsignedTx::AddPermissionlessValidator(tx) => Some(&tx.base),
            UnsignedTx::AddPermissionlessDelegator(tx) => Some(&tx.base),
            UnsignedTx::TransformSubnet(tx) => Some(&tx.base),
            UnsignedTx::RemoveSubnetValidator(tx) => Some(&tx.base),
            UnsignedTx::AdvanceTime(_) | UnsignedTx::RewardValidator(_) => None,
            UnsignedTx::StopStaker(tx) => Some(&tx.base),
        }
    }

    /// The staking fields, present only on the five staker-insertion forms.
    pub fn staker_view(&self) -> Option<StakerView<'_>> {
        match self {
            UnsignedTx::AddValidator(tx) => Some(StakerView {
                node_id: tx.validator.node_id,
                subnet_id: SubnetId::PRIMARY,
                weight: tx.validator.weight,
                start_time: tx.validator.start_time,
                end_time: tx.validator.end_time,
                stake_outputs: &tx.stake_outputs,
                pending_priority: StakerPriority::PendingPrimaryNetworkValidator,
                current_priority: StakerPriority::CurrentPrimaryNetworkValidator,
            }),
            UnsignedTx::AddDelegator(tx) => Some(StakerView {
                node_id: tx.validator.node_id,
                subnet_id: SubnetId::PRIMARY,
                weight: tx.validator.weight,
                start_time: tx.validator.start_time,
                end_time: tx.validator.end_time,
                stake_outputs: &tx.stake_outputs,
                pending_priority: StakerPriority::PendingPrimaryNetworkDelegator,
                current_priority: StakerPriority::CurrentPrimaryNetworkDelegator,
            }),
            UnsignedTx::AddSubnetValidator(tx) => Some(StakerView {
                node_id: tx.validator.node_id,
                subnet_id: tx.subnet_id,
                weight: tx.validator.weight,
                start_time: tx.validator.start_time,
                end_time: tx.validator.end_time,
                stake_outputs: &[],
                pending_priority: StakerPriority::PendingSubnetPermissionedValidator,
                current_priority: StakerPriority::CurrentSubnetPermissionedValidator,
            }),
            UnsignedTx::AddPermissionlessValidator(tx) => {
                let (pending, current) = if tx.subnet_id == SubnetId::PRIMARY {
                    (
                        StakerPriority::PendingPrimaryNetworkValidator,
                        StakerPriority::CurrentPrimaryNetworkValidator,
                    )
                } else {
                    (
                        StakerPriority::PendingSubnetPermissionlessValidator,
                        StakerPriority::CurrentSubnetPermissionlessValidator,
                    )
                };
                Some(StakerView {
                    node_id: tx.validator.node_id,
                    subnet_id: tx.subnet_id,
                    weight: tx.validator.weight,
                    start_time: tx.validator.start_time,
                    end_time: tx.validator.end_time,
                    stake_outputs: &tx.stake_outputs,
                    pending_priority: pending,
                    current_priority: current,
                })
            }
            UnsignedTx::AddPermissionlessDelegator(tx) => {
                let (pending, current) = if tx.subnet_id == SubnetId::PRIMARY {
                    (
                        StakerPriority::PendingPrimaryNetworkDelegator,
                        StakerPriority::CurrentPrimaryNetworkDelegator,
                    )
                } else {
                    (
                        StakerPriority::PendingSubnetPermissionlessDelegator,
                        StakerPriority::CurrentSubnetPermissionlessDelegator,
                    )
                };
                Some(StakerView {
                    node_id: tx.validator.node_id,
                    subnet_id: tx.subnet_id,
                    weight: tx.validator.weight,
                    start_time: tx.validator.start_time,
                    end_time: tx.validator.end_time,
                    stake_outputs: &tx.stake_outputs,
                    pending_priority: pending,
                    current_priority: current,
                })
            }
            _ => None,
        }
    }

    /// How many credentials the envelope must carry: one per input (imported
    /// inputs included), plus one for a subnet or staker authorization.
    pub fn credential_demand(&self) -> usize {
        let base_inputs = self.base_fields().map_or(0, |b| b.inputs.len());
        match self {
            UnsignedTx::Import(tx) => base_inputs + tx.imported_inputs.len(),
            UnsignedTx::CreateChain(_)
            | UnsignedTx::AddSubnetValidator(_)
            | UnsignedTx::TransformSubnet(_)
            | UnsignedTx::RemoveSubnetValidator(_)
            | UnsignedTx::StopStaker(_) => base_inputs + 1,
            UnsignedTx::AdvanceTime(_) | UnsignedTx::RewardValidator(_) => 0,
            _ => base_inputs,
        }
    }

    /// Structural verification of the unsigned body against the chain
    /// context. No state access.
    pub fn syntactic_verify(&self, ctx: &TxContext) -> Result<(), TxSyntaxError> {
        if let Some(base) = self.base_fields() {
            base.syntactic_verify(ctx)?;
        }
        match self {
            UnsignedTx::Base(_) | UnsignedTx::Export(_) | UnsignedTx::CreateSubnet(_) => {}
            UnsignedTx::CreateChain(tx) => {
                tx.subnet_auth.syntactic_verify()?;
                if tx.chain_name.is_empty()
                    || tx.chain_name.len() > MAX_CHAIN_NAME_LEN
                    || !tx
                        .chain_name
                        .bytes()
                        .all(|b| (0x20..=0x7e).contains(&b))
                {
                    return Err(TxSyntaxError::InvalidChainName);
                }
            }
            UnsignedTx::Import(tx) => verify_inputs(&tx.imported_inputs)?,
            UnsignedTx::AddValidator(tx) => {
                verify_stake(tx.validator.weight, &tx.stake_outputs)?;
                tx.rewards_owner.syntactic_verify()?;
            }
            UnsignedTx::AddDelegator(tx) => {
                verify_stake(tx.validator.weight, &tx.stake_outputs)?;
                tx.rewards_owner.syntactic_verify()?;
            }
            UnsignedTx::AddSubnetValidator(tx) => tx.subnet_auth.syntactic_verify()?,
            UnsignedTx::AddPermissionlessValidator(tx) => {
                verify_stake(tx.validator.weight, &tx.stake_outputs)?;
                tx.validation_rewards_owner.syntactic_verify()?;
                tx.delegation_rewards_owner.syntactic_verify()?;
            }
            UnsignedTx::AddPermissionlessDelegator(tx) => {
                verify_stake(tx.validator.weight, &tx.stake_outputs)?;
                tx.rewards_owner.syntactic_verify()?;
            }
            UnsignedTx::TransformSubnet(tx) => {
                tx.subnet_auth.syntactic_verify()?;
                if tx.initial_supply > tx.maximum_supply {
                    return Err(TxSyntaxError::InitialSupplyExceedsMaximum);
                }
                if tx.min_validator_stake == 0
                    || tx.min_validator_stake > tx.max_validator_stake
                    || tx.min_delegator_stake == 0
                {
                    return Err(TxSyntaxError::InvalidStakeBounds);
                }
                if tx.min_stake_duration == 0 || tx.min_stake_duration > tx.max_stake_duration {
                    return Err(TxSyntaxError::InvalidStakeDurationBounds);
                }
                if u64::from(tx.min_delegation_fee) > RATE_DENOMINATOR {
                    return Err(TxSyntaxError::DelegationFeeOutOfRange);
                }
                if tx.max_validator_weight_factor == 0 {
                    return Err(TxSyntaxError::ZeroWeightFactor);
                }
            }
            UnsignedTx::RemoveSubnetValidator(tx) => tx.subnet_auth.syntactic_verify()?,
            UnsignedTx::AdvanceTime(_) | UnsignedTx::RewardValidator(_) => {}
            UnsignedTx::StopStaker(tx) => tx.staker_auth.syntactic_verify()?,
        }
        Ok(())
    }
}

/// The signed transaction envelope.
#[derive(Encode, Decode, Clone, PartialEq, Eq, Debug, Hash)]
pub struct Tx {
    /// Codec version of the payload.
    pub version: u16,
    /// The unsigned body.
    pub unsigned: UnsignedTx,
    /// One credential per input, plus one per authorization.
    pub credentials: Vec<Credential>,
}

impl Tx {
    /// The canonical bytes the credentials sign: version plus unsigned body.
    pub fn unsigned_bytes(&self) -> Vec<u8> {
        codec::to_bytes_canonical(&(self.version, &self.unsigned))
    }

    /// This transaction's id: the hash of its unsigned bytes.
    pub fn id(&self) -> TxId {
        TxId(hash_id(&self.unsigned_bytes()))
    }

    /// Verifies the envelope: unsigned body structure plus the credential
    /// count against the body's demand.
    pub fn syntactic_verify(&self, ctx: &TxContext) -> Result<(), TxSyntaxError> {
        self.unsigned.syntactic_verify(ctx)?;
        let expected = self.unsigned.credential_demand();
        if self.credentials.len() != expected {
            return Err(TxSyntaxError::WrongNumberOfCredentials {
                expected,
                got: self.credentials.len(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::UtxoId;
    use crate::utxo::OutputOwners;

    fn test_ctx() -> TxContext {
        TxContext {
            network_id: NetworkId(12345),
            chain_id: ChainId::PLATFORM,
        }
    }

    fn input(tx_byte: u8, amount: u64) -> TransferInput {
        TransferInput {
            utxo_id: UtxoId {
                tx_id: TxId([tx_byte; 32]),
                output_index: 0,
            },
            asset_id: AssetId([1; 32]),
            amount,
            sig_indices: vec![0],
        }
    }

    fn base_with_inputs(inputs: Vec<TransferInput>) -> BaseTxFields {
        BaseTxFields {
            network_id: 12345,
            chain_id: ChainId::PLATFORM,
            inputs,
            outputs: vec![],
            memo: vec![],
        }
    }

    #[test]
    fn tx_id_ignores_credentials() {
        let unsigned = UnsignedTx::Base(BaseTx {
            base: base_with_inputs(vec![input(1, 10)]),
        });
        let bare = Tx {
            version: 0,
            unsigned: unsigned.clone(),
            credentials: vec![],
        };
        let signed = Tx {
            version: 0,
            unsigned,
            credentials: vec![Credential {
                signatures: vec![vec![0xaa; 65]],
            }],
        };
        assert_eq!(bare.id(), signed.id());
    }

    #[test]
    fn envelope_demands_one_credential_per_input() {
        let tx = Tx {
            version: 0,
            unsigned: UnsignedTx::Base(BaseTx {
                base: base_with_inputs(vec![input(1, 10), input(2, 20)]),
            }),
            credentials: vec![Credential::default()],
        };
        assert!(matches!(
            tx.syntactic_verify(&test_ctx()),
            Err(TxSyntaxError::WrongNumberOfCredentials {
                expected: 2,
                got: 1
            })
        ));
    }

    #[test]
    fn subnet_auth_adds_one_credential() {
        let tx = UnsignedTx::RemoveSubnetValidator(RemoveSubnetValidatorTx {
            base: base_with_inputs(vec![input(1, 10)]),
            node_id: NodeId([3; 20]),
            subnet_id: SubnetId([4; 32]),
            subnet_auth: SubnetAuth {
                sig_indices: vec![0],
            },
        });
        assert_eq!(tx.credential_demand(), 2);
    }

    #[test]
    fn proposal_txs_carry_no_credentials() {
        assert_eq!(
            UnsignedTx::AdvanceTime(AdvanceTimeTx { time: 5 }).credential_demand(),
            0
        );
        assert_eq!(
            UnsignedTx::RewardValidator(RewardValidatorTx {
                tx_id: TxId([1; 32])
            })
            .credential_demand(),
            0
        );
    }

    #[test]
    fn unsorted_inputs_are_rejected() {
        let tx = UnsignedTx::Base(BaseTx {
            base: base_with_inputs(vec![input(2, 10), input(1, 20)]),
        });
        assert!(matches!(
            tx.syntactic_verify(&test_ctx()),
            Err(TxSyntaxError::InputsNotSortedUnique)
        ));
    }

    #[test]
    fn transform_subnet_bounds_are_checked() {
        let mut tx = TransformSubnetTx {
            base: base_with_inputs(vec![input(1, 10)]),
            subnet_id: SubnetId([4; 32]),
            asset_id: AssetId([9; 32]),
            initial_supply: 100,
            maximum_supply: 1_000,
            min_validator_stake: 10,
            max_validator_stake: 100,
            min_delegator_stake: 1,
            min_delegation_fee: 20_000,
            min_stake_duration: 60,
            max_stake_duration: 3_600,
            max_validator_weight_factor: 5,
            subnet_auth: SubnetAuth::default(),
        };
        assert!(UnsignedTx::TransformSubnet(tx.clone())
            .syntactic_verify(&test_ctx())
            .is_ok());

        tx.initial_supply = 2_000;
        assert!(matches!(
            UnsignedTx::TransformSubnet(tx.clone()).syntactic_verify(&test_ctx()),
            Err(TxSyntaxError::InitialSupplyExceedsMaximum)
        ));

        tx.initial_supply = 100;
        tx.max_validator_weight_factor = 0;
        assert!(matches!(
            UnsignedTx::TransformSubnet(tx).syntactic_verify(&test_ctx()),
            Err(TxSyntaxError::ZeroWeightFactor)
        ));
    }

    #[test]
    fn stake_weight_mismatch_is_rejected() {
        let stake = vec![TransferOutput {
            asset_id: AssetId([1; 32]),
            amount: 40,
            owners: OutputOwners::default(),
        }];
        let tx = UnsignedTx::AddValidator(AddValidatorTx {
            base: base_with_inputs(vec![input(1, 10)]),
            validator: Validator {
                node_id: NodeId([5; 20]),
                start_time: 0,
                end_time: 100,
                weight: 50,
            },
            stake_outputs: stake,
            rewards_owner: OutputOwners::default(),
            delegation_shares: 20_000,
        });
        assert!(matches!(
            tx.syntactic_verify(&test_ctx()),
            Err(TxSyntaxError::StakeWeightMismatch {
                weight: 50,
                staked: 40
            })
        ));
    }
}
