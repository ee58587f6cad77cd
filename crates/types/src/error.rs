// Path: crates/types/src/error.rs
//! The error taxonomy for the platform chain core.
//!
//! One enum per failure domain. Verifier errors never imply state mutation;
//! executor errors may leave a partially mutated diff behind, which the
//! caller must discard. Every enum implements [`ErrorCode`] so that RPC and
//! log layers can surface stable, machine-readable codes without string
//! matching on display text.

use crate::fees::Dimension;
use crate::ids::{AssetId, ChainId, NodeId, SubnetId, TxId, UtxoId};
use thiserror::Error;

/// A trait for assigning a stable, machine-readable string code to an error.
pub trait ErrorCode {
    /// Returns the unique, stable string identifier for this error variant.
    fn code(&self) -> &'static str;
}

/// Errors produced by the staker verifiers. These are pure validation
/// failures; the diff is untouched when one is returned.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StakerValidationError {
    /// The staker's weight is below the subnet's minimum stake.
    #[error("staker weight is below the subnet minimum")]
    TooSmallWeight,
    /// The staker's weight is above the subnet's maximum stake.
    #[error("staker weight is above the subnet maximum")]
    TooLargeWeight,
    /// The validator charges less than the minimum delegation fee.
    #[error("staker charges an insufficient delegation fee")]
    InsufficientDelegationFee,
    /// The staking period is shorter than the subnet minimum.
    #[error("staking period is too short")]
    StakeTooShort,
    /// The staking period is longer than the subnet maximum.
    #[error("staking period is too long")]
    StakeTooLong,
    /// Pre-continuous-staking: the stated start time is further ahead of
    /// chain time than the future-start bound allows.
    #[error("staker start time is too far ahead of the current chain time")]
    FutureStakeTime,
    /// Pre-continuous-staking: chain time has already reached the stated
    /// start time.
    #[error("chain timestamp {current} is not before staker start time {start}")]
    TimestampNotBeforeStartTime {
        /// Current chain timestamp.
        current: u64,
        /// The transaction's stated start time.
        start: u64,
    },
    /// The named node is not a current or pending validator of the subnet.
    #[error("{node} is not a current or pending validator of subnet {subnet}")]
    NotValidator {
        /// The node that was looked up.
        node: NodeId,
        /// The subnet it was looked up on.
        subnet: SubnetId,
    },
    /// The node already validates the primary network.
    #[error("{node} is already a validator of the primary network")]
    AlreadyValidator {
        /// The duplicated node.
        node: NodeId,
    },
    /// The node already validates the named subnet.
    #[error("duplicate validator {node} on subnet {subnet}")]
    DuplicateValidator {
        /// The duplicated node.
        node: NodeId,
        /// The subnet it already validates.
        subnet: SubnetId,
    },
    /// A subnet staker's interval is not contained in its node's
    /// primary-network validation interval.
    #[error("subnet staking period must be a subset of the primary network staking period")]
    ValidatorSubsetViolation,
    /// Admitting the delegator would push the validator past its delegation
    /// capacity at some instant of the delegator's interval.
    #[error("validator would be over delegated")]
    OverDelegated,
    /// The delegation-capacity product overflowed.
    #[error("validator stake exceeds limit")]
    StakeOverflow,
    /// The staked outputs carry the wrong asset for this subnet.
    #[error("incorrect staked asset id: expected {expected}, got {got}")]
    WrongStakedAssetId {
        /// The subnet's staking asset.
        expected: AssetId,
        /// The asset actually staked.
        got: AssetId,
    },
    /// Delegation is only possible to permissionless validators.
    #[error("delegation to a permissioned validator")]
    DelegateToPermissionedValidator,
    /// `RemoveSubnetValidatorTx` only removes permissioned validators.
    #[error("attempted to remove a permissionless validator")]
    RemovePermissionlessValidator,
    /// The staker-stop credential does not satisfy the staker's owner.
    #[error("unauthorized staker stopping")]
    UnauthorizedStakerStopping,
    /// The validator node id is the empty id.
    #[error("validator node id cannot be empty")]
    EmptyNodeId,
    /// A subnet transformation names a max stake duration beyond the global
    /// maximum.
    #[error("max stake duration must not exceed the global maximum")]
    MaxStakeDurationTooLarge,
    /// The transaction form is not active at the current chain time.
    #[error("transaction form is not active at the current chain time")]
    WrongFork,
    /// The subnet's recorded transformation is not a `TransformSubnetTx`.
    #[error("subnet {subnet} has no permissionless staking rules")]
    NotTransformSubnetTx {
        /// The subnet whose rules were requested.
        subnet: SubnetId,
    },
    /// The subnet has been transformed and its owner can no longer modify
    /// its validator set.
    #[error("subnet {subnet} is permissionless and no longer owner-modifiable")]
    ImmutableSubnetModification {
        /// The transformed subnet.
        subnet: SubnetId,
    },
    /// A subnet transformation must introduce its own staking asset.
    #[error("subnet staking asset must differ from the platform asset")]
    InvalidTransformAsset,
    /// The credential list is too short to carry the required authorization
    /// credential.
    #[error("wrong number of credentials for subnet authorization")]
    WrongNumberOfCredentials,
    /// A subnet authorization credential was rejected by the owner predicate.
    #[error("subnet authorization rejected: {0}")]
    UnauthorizedSubnetModification(String),
}

impl ErrorCode for StakerValidationError {
    fn code(&self) -> &'static str {
        match self {
            Self::TooSmallWeight => "STAKER_WEIGHT_TOO_SMALL",
            Self::TooLargeWeight => "STAKER_WEIGHT_TOO_LARGE",
            Self::InsufficientDelegationFee => "STAKER_INSUFFICIENT_DELEGATION_FEE",
            Self::StakeTooShort => "STAKER_PERIOD_TOO_SHORT",
            Self::StakeTooLong => "STAKER_PERIOD_TOO_LONG",
            Self::FutureStakeTime => "STAKER_FUTURE_START_TIME",
            Self::TimestampNotBeforeStartTime { .. } => "STAKER_START_NOT_AFTER_CHAIN_TIME",
            Self::NotValidator { .. } => "STAKER_NOT_VALIDATOR",
            Self::AlreadyValidator { .. } => "STAKER_ALREADY_VALIDATOR",
            Self::DuplicateValidator { .. } => "STAKER_DUPLICATE_VALIDATOR",
            Self::ValidatorSubsetViolation => "STAKER_SUBSET_VIOLATION",
            Self::OverDelegated => "STAKER_OVER_DELEGATED",
            Self::StakeOverflow => "STAKER_STAKE_OVERFLOW",
            Self::WrongStakedAssetId { .. } => "STAKER_WRONG_STAKED_ASSET",
            Self::DelegateToPermissionedValidator => "STAKER_DELEGATE_TO_PERMISSIONED",
            Self::RemovePermissionlessValidator => "STAKER_REMOVE_PERMISSIONLESS",
            Self::UnauthorizedStakerStopping => "STAKER_UNAUTHORIZED_STOP",
            Self::EmptyNodeId => "STAKER_EMPTY_NODE_ID",
            Self::MaxStakeDurationTooLarge => "STAKER_MAX_DURATION_TOO_LARGE",
            Self::WrongFork => "STAKER_WRONG_FORK",
            Self::NotTransformSubnetTx { .. } => "STAKER_NOT_TRANSFORM_SUBNET_TX",
            Self::ImmutableSubnetModification { .. } => "STAKER_IMMUTABLE_SUBNET",
            Self::InvalidTransformAsset => "STAKER_INVALID_TRANSFORM_ASSET",
            Self::WrongNumberOfCredentials => "STAKER_WRONG_CREDENTIAL_COUNT",
            Self::UnauthorizedSubnetModification(_) => "STAKER_UNAUTHORIZED_SUBNET_MODIFICATION",
        }
    }
}

/// Causes of a flow-check failure. Surfaced wrapped in
/// [`ExecutorError::FlowCheckFailed`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FlowCheckError {
    /// A referenced UTXO does not exist or was already consumed.
    #[error("missing utxo {0}")]
    MissingUtxo(UtxoId),
    /// An input names a different asset than the UTXO it spends.
    #[error("input asset {input} does not match utxo asset {utxo}")]
    AssetMismatch {
        /// Asset named by the input.
        input: AssetId,
        /// Asset carried by the UTXO.
        utxo: AssetId,
    },
    /// An input claims a different amount than the UTXO it spends.
    #[error("input amount {input} does not match utxo amount {utxo}")]
    AmountMismatch {
        /// Amount named by the input.
        input: u64,
        /// Amount carried by the UTXO.
        utxo: u64,
    },
    /// The credential list does not line up with the input list.
    #[error("expected {expected} credentials, got {got}")]
    CredentialCountMismatch {
        /// Credentials the inputs demand.
        expected: usize,
        /// Credentials supplied.
        got: usize,
    },
    /// A credential failed to authorize the spend of a UTXO.
    #[error("credential rejected for utxo {utxo}: {reason}")]
    Unauthorized {
        /// The UTXO whose owner predicate rejected the credential.
        utxo: UtxoId,
        /// Why the crypto seam rejected it.
        reason: String,
    },
    /// An asset's consumed amount does not equal produced plus required fee.
    #[error(
        "asset {asset} does not balance: consumed {consumed}, produced {produced}, fee {fee}"
    )]
    UnbalancedAsset {
        /// The unbalanced asset.
        asset: AssetId,
        /// Total consumed by inputs.
        consumed: u64,
        /// Total produced by outputs.
        produced: u64,
        /// Fee required for this asset.
        fee: u64,
    },
    /// Adding amounts overflowed u64.
    #[error("amount overflow while summing asset {asset}")]
    AmountOverflow {
        /// The asset whose amounts overflowed.
        asset: AssetId,
    },
}

impl ErrorCode for FlowCheckError {
    fn code(&self) -> &'static str {
        match self {
            Self::MissingUtxo(_) => "FLOW_MISSING_UTXO",
            Self::AssetMismatch { .. } => "FLOW_ASSET_MISMATCH",
            Self::AmountMismatch { .. } => "FLOW_AMOUNT_MISMATCH",
            Self::CredentialCountMismatch { .. } => "FLOW_CREDENTIAL_COUNT_MISMATCH",
            Self::Unauthorized { .. } => "FLOW_UNAUTHORIZED",
            Self::UnbalancedAsset { .. } => "FLOW_UNBALANCED_ASSET",
            Self::AmountOverflow { .. } => "FLOW_AMOUNT_OVERFLOW",
        }
    }
}

/// Errors produced by the fee calculator and fee manager.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FeeError {
    /// Cumulating a transaction's complexity would push the block past its
    /// cap in the named dimension.
    #[error("block complexity cap exceeded in dimension {dimension:?}")]
    BlockCapacityExceeded {
        /// The first dimension that breached the cap.
        dimension: Dimension,
    },
    /// The fee arithmetic itself failed.
    #[error("failed fee calculation: {0}")]
    FeeCalculationFailed(String),
    /// Fees paid fall short of the required fee.
    #[error("fees paid {paid} are less than the required fees {required}")]
    InsufficientFees {
        /// Amount actually paid.
        paid: u64,
        /// Amount required.
        required: u64,
    },
    /// A tip percentage above 100% of the required fee.
    #[error("tip percentage {0} exceeds the tip denominator")]
    TipTooLarge(u64),
    /// Removing complexity that was never cumulated.
    #[error("removing complexity that was never cumulated")]
    ComplexityUnderflow,
}

impl ErrorCode for FeeError {
    fn code(&self) -> &'static str {
        match self {
            Self::BlockCapacityExceeded { .. } => "FEE_BLOCK_CAPACITY_EXCEEDED",
            Self::FeeCalculationFailed(_) => "FEE_CALCULATION_FAILED",
            Self::InsufficientFees { .. } => "FEE_INSUFFICIENT",
            Self::TipTooLarge(_) => "FEE_TIP_TOO_LARGE",
            Self::ComplexityUnderflow => "FEE_COMPLEXITY_UNDERFLOW",
        }
    }
}

/// Errors surfaced by state reads and writes.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StateError {
    /// The requested entry does not exist.
    #[error("entry not found in state")]
    NotFound,
    /// Data read back from state failed canonical decoding.
    #[error("canonical decode failed: {0}")]
    Decode(String),
    /// A transaction read from state is not of the expected variant.
    #[error("wrong transaction type")]
    WrongTxType,
}

impl ErrorCode for StateError {
    fn code(&self) -> &'static str {
        match self {
            Self::NotFound => "STATE_NOT_FOUND",
            Self::Decode(_) => "STATE_DECODE_FAILED",
            Self::WrongTxType => "STATE_WRONG_TX_TYPE",
        }
    }
}

/// Errors from the shared atomic-memory region.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("shared memory: {0}")]
pub struct SharedMemoryError(pub String);

impl ErrorCode for SharedMemoryError {
    fn code(&self) -> &'static str {
        "SHARED_MEMORY_FAILED"
    }
}

/// The umbrella error for transaction execution. A failed execution may have
/// partially mutated the diff; the caller must discard the diff on error.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExecutorError {
    /// The signed envelope failed syntactic verification.
    #[error("transaction syntax: {0}")]
    Syntax(#[from] crate::tx::TxSyntaxError),
    /// A staker verifier rejected the transaction.
    #[error(transparent)]
    Validation(#[from] StakerValidationError),
    /// The flow check rejected the transaction.
    #[error("flow check failed: {0}")]
    FlowCheckFailed(#[from] FlowCheckError),
    /// Fee computation or cumulation failed.
    #[error(transparent)]
    Fee(#[from] FeeError),
    /// A state read failed.
    #[error(transparent)]
    State(#[from] StateError),
    /// Shared memory could not serve the import.
    #[error(transparent)]
    SharedMemory(#[from] SharedMemoryError),
    /// The transaction variant is not handled by this executor.
    #[error("unexpected transaction type for this executor")]
    WrongTxType,
    /// A cross-chain transfer names a chain outside the executing subnet.
    #[error("chain {chain} is not in the executing subnet")]
    ChainNotInSubnet {
        /// The offending source or destination chain.
        chain: ChainId,
    },
    /// A UTXO fetched from shared memory failed to decode.
    #[error("failed to unmarshal shared-memory utxo: {0}")]
    Unmarshal(String),
    /// A clock-advance proposal does not move the clock forward.
    #[error("proposed chain time {proposed} is not after the current chain time {current}")]
    TimestampNotMonotonic {
        /// Current chain time.
        current: u64,
        /// The proposed new time.
        proposed: u64,
    },
    /// A clock-advance proposal skips over a staker lifecycle transition.
    #[error("proposed chain time {proposed} passes the next staker change at {next_change}")]
    TimestampBeyondNextChange {
        /// The proposed new time.
        proposed: u64,
        /// The earliest pending start or current end.
        next_change: u64,
    },
    /// A reward proposal names a staker other than the next one to remove.
    #[error("staker {got} is not the next staker to remove ({expected})")]
    WrongRewardedStaker {
        /// The staker at the head of the removal order.
        expected: TxId,
        /// The staker the proposal named.
        got: TxId,
    },
    /// A reward proposal fired before the staker's end time.
    #[error("staker ends at {end_time}, chain time is {chain_time}")]
    StakerNotDone {
        /// The staker's end time.
        end_time: u64,
        /// Current chain time.
        chain_time: u64,
    },
}

impl ErrorCode for ExecutorError {
    fn code(&self) -> &'static str {
        match self {
            Self::Syntax(_) => "EXEC_TX_SYNTAX",
            Self::Validation(e) => e.code(),
            Self::FlowCheckFailed(_) => "EXEC_FLOW_CHECK_FAILED",
            Self::Fee(e) => e.code(),
            Self::State(e) => e.code(),
            Self::SharedMemory(e) => e.code(),
            Self::WrongTxType => "EXEC_WRONG_TX_TYPE",
            Self::ChainNotInSubnet { .. } => "EXEC_CHAIN_NOT_IN_SUBNET",
            Self::Unmarshal(_) => "EXEC_UNMARSHAL_FAILED",
            Self::TimestampNotMonotonic { .. } => "EXEC_TIMESTAMP_NOT_MONOTONIC",
            Self::TimestampBeyondNextChange { .. } => "EXEC_TIMESTAMP_BEYOND_NEXT_CHANGE",
            Self::WrongRewardedStaker { .. } => "EXEC_WRONG_REWARDED_STAKER",
            Self::StakerNotDone { .. } => "EXEC_STAKER_NOT_DONE",
        }
    }
}

/// Errors from the historical validator-set manager.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ManagerError {
    /// The requested height is beyond the last accepted block, or required
    /// data is missing.
    #[error("validator set not found")]
    NotFound,
    /// Invariant violation: a subnet validator has no primary-network
    /// counterpart to source its public key from.
    #[error("missing validator {node} in subnet {subnet}")]
    MissingValidator {
        /// The node missing from the primary network set.
        node: NodeId,
        /// The subnet whose set was being rebuilt.
        subnet: SubnetId,
    },
    /// Invariant violation: no current validator set exists for the subnet.
    #[error("missing validator set for subnet {subnet}")]
    MissingValidatorSet {
        /// The subnet with no set.
        subnet: SubnetId,
    },
    /// A state read failed while reconstructing.
    #[error(transparent)]
    State(#[from] StateError),
    /// The reconstruction was cancelled between diff heights.
    #[error("validator set reconstruction cancelled")]
    Cancelled,
    /// The chain whose subnet was requested is not a blockchain.
    #[error("{chain} is not a blockchain")]
    NotABlockchain {
        /// The id that failed to resolve to a `CreateChainTx`.
        chain: ChainId,
    },
}

impl ErrorCode for ManagerError {
    fn code(&self) -> &'static str {
        match self {
            Self::NotFound => "VALIDATORS_NOT_FOUND",
            Self::MissingValidator { .. } => "VALIDATORS_MISSING_VALIDATOR",
            Self::MissingValidatorSet { .. } => "VALIDATORS_MISSING_SET",
            Self::State(e) => e.code(),
            Self::Cancelled => "VALIDATORS_CANCELLED",
            Self::NotABlockchain { .. } => "VALIDATORS_NOT_A_BLOCKCHAIN",
        }
    }
}

/// Errors raised while constructing configuration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Dynamic fee overrides are forbidden on production networks.
    #[error("forbidden dynamic fee override for network {network}")]
    ForbiddenDynamicFeeOverride {
        /// The production network id the override targeted.
        network: u32,
    },
}

impl ErrorCode for ConfigError {
    fn code(&self) -> &'static str {
        match self {
            Self::ForbiddenDynamicFeeOverride { .. } => "CONFIG_FORBIDDEN_FEE_OVERRIDE",
        }
    }
}
