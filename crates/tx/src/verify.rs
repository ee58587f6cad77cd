// Path: crates/tx/src/verify.rs
//! Precondition checks for the staking transaction forms.
//!
//! Everything here is pure over the state: a verifier either returns the
//! derived values its executor branch needs, or an error, and never touches
//! the diff. The fork-gated start-time rule is applied uniformly: before
//! continuous staking the stated start must be strictly after chain time and
//! at most the future-start bound ahead; after it the stated times only
//! carry the staking period.

use crate::executor::Backend;
use std::collections::HashMap;
use trellis_api::state::ChainState;
use trellis_types::config::{MAX_FUTURE_START_TIME, MAX_VALIDATOR_WEIGHT_FACTOR};
use trellis_types::error::{ExecutorError, StakerValidationError, StateError};
use trellis_types::ids::{AssetId, NodeId, SubnetId, TxId};
use trellis_types::staker::{Staker, StakerPriority, MAX_TIME};
use trellis_types::tx::{
    AddDelegatorTx, AddPermissionlessDelegatorTx, AddPermissionlessValidatorTx,
    AddSubnetValidatorTx, AddValidatorTx, Credential, RemoveSubnetValidatorTx, StopStakerTx,
    SubnetAuth, Tx, UnsignedTx,
};
use trellis_types::utxo::{OutputOwners, TransferOutput};

/// Returns the current-or-pending validator of `subnet_id` with `node_id`.
pub(crate) fn get_validator(
    state: &dyn ChainState,
    subnet_id: SubnetId,
    node_id: NodeId,
) -> Result<Staker, StateError> {
    match state.get_current_validator(subnet_id, node_id) {
        Ok(staker) => Ok(staker),
        Err(StateError::NotFound) => state.get_pending_validator(subnet_id, node_id),
        Err(e) => Err(e),
    }
}

/// True iff `[start, end]` is contained in `[bound_start, bound_end]`.
pub(crate) fn bounded_by(start: u64, end: u64, bound_start: u64, bound_end: u64) -> bool {
    bound_start <= start && start <= end && end <= bound_end
}

fn fee_map(backend: &Backend, fee: u64) -> HashMap<AssetId, u64> {
    [(backend.config.asset_id, fee)].into_iter().collect()
}

/// Pre-continuous-staking: chain time must be strictly before the stated
/// start time.
fn verify_start_after_now(
    current_timestamp: u64,
    start_time: u64,
) -> Result<(), StakerValidationError> {
    if current_timestamp >= start_time {
        return Err(StakerValidationError::TimestampNotBeforeStartTime {
            current: current_timestamp,
            start: start_time,
        });
    }
    Ok(())
}

/// Pre-continuous-staking: the stated start must not be more than the
/// future-start bound ahead. Checked last so callers can rely on seeing the
/// other failures first.
fn verify_start_not_too_far(
    current_timestamp: u64,
    start_time: u64,
) -> Result<(), StakerValidationError> {
    if start_time > current_timestamp.saturating_add(MAX_FUTURE_START_TIME) {
        return Err(StakerValidationError::FutureStakeTime);
    }
    Ok(())
}

/// Validation for `AddValidatorTx`. Returns the combined outputs that would
/// be refunded were the validator not admitted.
pub(crate) fn verify_add_validator_tx(
    backend: &Backend,
    state: &dyn ChainState,
    tx: &Tx,
    inner: &AddValidatorTx,
    fee: u64,
) -> Result<Vec<TransferOutput>, ExecutorError> {
    tx.syntactic_verify(&backend.tx_context())?;

    let config = &backend.config;
    let duration = inner.validator.staking_period();
    if inner.validator.weight < config.min_validator_stake {
        return Err(StakerValidationError::TooSmallWeight.into());
    }
    if inner.validator.weight > config.max_validator_stake {
        return Err(StakerValidationError::TooLargeWeight.into());
    }
    if inner.delegation_shares < config.min_delegation_fee {
        return Err(StakerValidationError::InsufficientDelegationFee.into());
    }
    if duration < config.min_stake_duration {
        return Err(StakerValidationError::StakeTooShort.into());
    }
    if duration > config.max_stake_duration {
        return Err(StakerValidationError::StakeTooLong.into());
    }

    let mut outs = inner.base.outputs.clone();
    outs.extend(inner.stake_outputs.iter().cloned());

    if !backend.is_bootstrapped() {
        return Ok(outs);
    }

    let current_timestamp = state.get_timestamp();
    let continuous = config.forks.is_continuous_staking_active(current_timestamp);
    if !continuous {
        verify_start_after_now(current_timestamp, inner.validator.start_time)?;
    }

    match get_validator(state, SubnetId::PRIMARY, inner.validator.node_id) {
        Ok(_) => {
            return Err(StakerValidationError::AlreadyValidator {
                node: inner.validator.node_id,
            }
            .into())
        }
        Err(StateError::NotFound) => {}
        Err(e) => return Err(e.into()),
    }

    backend.flow_checker.verify_spend(
        tx,
        state,
        &inner.base.inputs,
        &outs,
        &tx.credentials,
        &fee_map(backend, fee),
    )?;

    if !continuous {
        verify_start_not_too_far(current_timestamp, inner.validator.start_time)?;
    }
    Ok(outs)
}

/// Validation for `AddSubnetValidatorTx`.
pub(crate) fn verify_add_subnet_validator_tx(
    backend: &Backend,
    state: &dyn ChainState,
    tx: &Tx,
    inner: &AddSubnetValidatorTx,
    fee: u64,
) -> Result<(), ExecutorError> {
    tx.syntactic_verify(&backend.tx_context())?;

    let config = &backend.config;
    let staking_period = inner.validator.staking_period();
    if staking_period < config.min_stake_duration {
        return Err(StakerValidationError::StakeTooShort.into());
    }
    if staking_period > config.max_stake_duration {
        return Err(StakerValidationError::StakeTooLong.into());
    }

    if !backend.is_bootstrapped() {
        return Ok(());
    }

    let current_timestamp = state.get_timestamp();
    let continuous = config.forks.is_continuous_staking_active(current_timestamp);
    if !continuous {
        verify_start_after_now(current_timestamp, inner.validator.start_time)?;
    }

    match get_validator(state, inner.subnet_id, inner.validator.node_id) {
        Ok(_) => {
            return Err(StakerValidationError::DuplicateValidator {
                node: inner.validator.node_id,
                subnet: inner.subnet_id,
            }
            .into())
        }
        Err(StateError::NotFound) => {}
        Err(e) => return Err(e.into()),
    }

    let primary = get_validator(state, SubnetId::PRIMARY, inner.validator.node_id)
        .map_err(|_| StakerValidationError::NotValidator {
            node: inner.validator.node_id,
            subnet: SubnetId::PRIMARY,
        })?;

    // The subnet staking interval must be a subset of the node's primary
    // network interval.
    let (staker_start, staker_end) = if continuous {
        (
            current_timestamp,
            current_timestamp.saturating_add(staking_period),
        )
    } else {
        (inner.validator.start_time, inner.validator.end_time)
    };
    if !bounded_by(staker_start, staker_end, primary.start_time, primary.end_time) {
        return Err(StakerValidationError::ValidatorSubsetViolation.into());
    }

    let base_creds =
        verify_poa_subnet_authorization(backend, state, tx, inner.subnet_id, &inner.subnet_auth)?;

    backend.flow_checker.verify_spend(
        tx,
        state,
        &inner.base.inputs,
        &inner.base.outputs,
        base_creds,
        &fee_map(backend, fee),
    )?;

    if !continuous {
        verify_start_not_too_far(current_timestamp, inner.validator.start_time)?;
    }
    Ok(())
}

/// Validation for `RemoveSubnetValidatorTx`. Returns the staker to remove
/// and whether it lives in the current set.
pub(crate) fn verify_remove_subnet_validator_tx(
    backend: &Backend,
    state: &dyn ChainState,
    tx: &Tx,
    inner: &RemoveSubnetValidatorTx,
    fee: u64,
) -> Result<(Staker, bool), ExecutorError> {
    tx.syntactic_verify(&backend.tx_context())?;

    let (staker, is_current) = match state.get_current_validator(inner.subnet_id, inner.node_id)
    {
        Ok(staker) => (staker, true),
        Err(StateError::NotFound) => {
            let staker = state
                .get_pending_validator(inner.subnet_id, inner.node_id)
                .map_err(|_| StakerValidationError::NotValidator {
                    node: inner.node_id,
                    subnet: inner.subnet_id,
                })?;
            (staker, false)
        }
        Err(e) => return Err(e.into()),
    };

    if !staker.priority.is_permissioned_validator() {
        return Err(StakerValidationError::RemovePermissionlessValidator.into());
    }

    if !backend.is_bootstrapped() {
        return Ok((staker, is_current));
    }

    let base_creds =
        verify_subnet_authorization(backend, state, tx, inner.subnet_id, &inner.subnet_auth)?;

    backend.flow_checker.verify_spend(
        tx,
        state,
        &inner.base.inputs,
        &inner.base.outputs,
        base_creds,
        &fee_map(backend, fee),
    )?;

    Ok((staker, is_current))
}

/// Validation for `AddDelegatorTx`. Returns the refund outputs and the
/// primary validator's end time, which bounds the delegator's lifetime.
pub(crate) fn verify_add_delegator_tx(
    backend: &Backend,
    state: &dyn ChainState,
    tx: &Tx,
    inner: &AddDelegatorTx,
    fee: u64,
) -> Result<(Vec<TransferOutput>, u64), ExecutorError> {
    tx.syntactic_verify(&backend.tx_context())?;

    let config = &backend.config;
    let duration = inner.validator.staking_period();
    if duration < config.min_stake_duration {
        return Err(StakerValidationError::StakeTooShort.into());
    }
    if duration > config.max_stake_duration {
        return Err(StakerValidationError::StakeTooLong.into());
    }
    if inner.validator.weight < config.min_delegator_stake {
        return Err(StakerValidationError::TooSmallWeight.into());
    }

    let mut outs = inner.base.outputs.clone();
    outs.extend(inner.stake_outputs.iter().cloned());

    let primary = get_validator(state, SubnetId::PRIMARY, inner.validator.node_id).map_err(
        |_| StakerValidationError::NotValidator {
            node: inner.validator.node_id,
            subnet: SubnetId::PRIMARY,
        },
    )?;

    if !backend.is_bootstrapped() {
        return Ok((outs, primary.end_time));
    }

    let current_timestamp = state.get_timestamp();
    let continuous = config.forks.is_continuous_staking_active(current_timestamp);
    if !continuous {
        verify_start_after_now(current_timestamp, inner.validator.start_time)?;
    }

    // The legacy path errors on overflow instead of saturating.
    let mut maximum_weight = u64::from(MAX_VALIDATOR_WEIGHT_FACTOR)
        .checked_mul(primary.weight)
        .ok_or(StakerValidationError::StakeOverflow)?;
    if config.forks.is_apricot_phase3_active(current_timestamp) {
        maximum_weight = maximum_weight.min(config.max_validator_stake);
    }

    let candidate = candidate_delegator(
        tx.id(),
        inner.validator.node_id,
        SubnetId::PRIMARY,
        inner.validator.weight,
        inner.validator.start_time,
        inner.validator.end_time,
        StakerPriority::PendingPrimaryNetworkDelegator,
        current_timestamp,
        continuous,
    );
    if !can_delegate(state, &primary, maximum_weight, &candidate) {
        return Err(StakerValidationError::OverDelegated.into());
    }

    backend.flow_checker.verify_spend(
        tx,
        state,
        &inner.base.inputs,
        &outs,
        &tx.credentials,
        &fee_map(backend, fee),
    )?;

    if !continuous {
        verify_start_not_too_far(current_timestamp, inner.validator.start_time)?;
    }
    Ok((outs, primary.end_time))
}

/// Validation for `AddPermissionlessValidatorTx`.
pub(crate) fn verify_add_permissionless_validator_tx(
    backend: &Backend,
    state: &dyn ChainState,
    tx: &Tx,
    inner: &AddPermissionlessValidatorTx,
    fee: u64,
) -> Result<(), ExecutorError> {
    tx.syntactic_verify(&backend.tx_context())?;

    if !backend.is_bootstrapped() {
        return Ok(());
    }

    let current_timestamp = state.get_timestamp();
    let continuous = backend
        .config
        .forks
        .is_continuous_staking_active(current_timestamp);
    if !continuous {
        verify_start_after_now(current_timestamp, inner.validator.start_time)?;
    }

    let rules = get_validator_rules(backend, state, inner.subnet_id)?;
    let staking_period = inner.validator.staking_period();
    let staked_asset_id = inner.stake_outputs[0].asset_id;
    if inner.validator.weight < rules.min_validator_stake {
        return Err(StakerValidationError::TooSmallWeight.into());
    }
    if inner.validator.weight > rules.max_validator_stake {
        return Err(StakerValidationError::TooLargeWeight.into());
    }
    if inner.delegation_shares < rules.min_delegation_fee {
        return Err(StakerValidationError::InsufficientDelegationFee.into());
    }
    if staking_period < rules.min_stake_duration {
        return Err(StakerValidationError::StakeTooShort.into());
    }
    if staking_period > rules.max_stake_duration {
        return Err(StakerValidationError::StakeTooLong.into());
    }
    if staked_asset_id != rules.asset_id {
        return Err(StakerValidationError::WrongStakedAssetId {
            expected: rules.asset_id,
            got: staked_asset_id,
        }
        .into());
    }

    match get_validator(state, inner.subnet_id, inner.validator.node_id) {
        Ok(_) => {
            return Err(StakerValidationError::DuplicateValidator {
                node: inner.validator.node_id,
                subnet: inner.subnet_id,
            }
            .into())
        }
        Err(StateError::NotFound) => {}
        Err(e) => return Err(e.into()),
    }

    if inner.subnet_id != SubnetId::PRIMARY {
        let primary = get_validator(state, SubnetId::PRIMARY, inner.validator.node_id)
            .map_err(|_| StakerValidationError::NotValidator {
                node: inner.validator.node_id,
                subnet: SubnetId::PRIMARY,
            })?;

        let (staker_start, staker_end) = if continuous {
            (
                current_timestamp,
                current_timestamp.saturating_add(staking_period),
            )
        } else {
            (inner.validator.start_time, inner.validator.end_time)
        };
        if !bounded_by(staker_start, staker_end, primary.start_time, primary.end_time) {
            return Err(StakerValidationError::ValidatorSubsetViolation.into());
        }
    }

    let mut outs = inner.base.outputs.clone();
    outs.extend(inner.stake_outputs.iter().cloned());

    backend.flow_checker.verify_spend(
        tx,
        state,
        &inner.base.inputs,
        &outs,
        &tx.credentials,
        &fee_map(backend, fee),
    )?;

    if !continuous {
        verify_start_not_too_far(current_timestamp, inner.validator.start_time)?;
    }
    Ok(())
}

/// Validation for `AddPermissionlessDelegatorTx`. Returns the validator's
/// end time.
pub(crate) fn verify_add_permissionless_delegator_tx(
    backend: &Backend,
    state: &dyn ChainState,
    tx: &Tx,
    inner: &AddPermissionlessDelegatorTx,
    fee: u64,
) -> Result<u64, ExecutorError> {
    tx.syntactic_verify(&backend.tx_context())?;

    let validator = get_validator(state, inner.subnet_id, inner.validator.node_id).map_err(
        |_| StakerValidationError::NotValidator {
            node: inner.validator.node_id,
            subnet: inner.subnet_id,
        },
    )?;

    if !backend.is_bootstrapped() {
        return Ok(validator.end_time);
    }

    let current_timestamp = state.get_timestamp();
    let continuous = backend
        .config
        .forks
        .is_continuous_staking_active(current_timestamp);
    if !continuous {
        verify_start_after_now(current_timestamp, inner.validator.start_time)?;
    }

    let rules = get_delegator_rules(backend, state, inner.subnet_id)?;
    let duration = inner.validator.staking_period();
    let staked_asset_id = inner.stake_outputs[0].asset_id;
    if inner.validator.weight < rules.min_delegator_stake {
        return Err(StakerValidationError::TooSmallWeight.into());
    }
    if duration < rules.min_stake_duration {
        return Err(StakerValidationError::StakeTooShort.into());
    }
    if duration > rules.max_stake_duration {
        return Err(StakerValidationError::StakeTooLong.into());
    }
    if staked_asset_id != rules.asset_id {
        return Err(StakerValidationError::WrongStakedAssetId {
            expected: rules.asset_id,
            got: staked_asset_id,
        }
        .into());
    }

    // The permissionless path saturates instead of erroring on overflow.
    let maximum_weight = u64::from(rules.max_validator_weight_factor)
        .checked_mul(validator.weight)
        .unwrap_or(u64::MAX)
        .min(rules.max_validator_stake);

    let (pending_priority, _) = delegator_priorities(inner.subnet_id);
    let candidate = candidate_delegator(
        tx.id(),
        inner.validator.node_id,
        inner.subnet_id,
        inner.validator.weight,
        inner.validator.start_time,
        inner.validator.end_time,
        pending_priority,
        current_timestamp,
        continuous,
    );
    if !can_delegate(state, &validator, maximum_weight, &candidate) {
        return Err(StakerValidationError::OverDelegated.into());
    }

    if inner.subnet_id != SubnetId::PRIMARY && validator.priority.is_permissioned_validator() {
        // Delegators may only reference validators whose transactions carry
        // rewards owners; the permissioned subnet form is the one that
        // does not.
        return Err(StakerValidationError::DelegateToPermissionedValidator.into());
    }

    let mut outs = inner.base.outputs.clone();
    outs.extend(inner.stake_outputs.iter().cloned());

    backend.flow_checker.verify_spend(
        tx,
        state,
        &inner.base.inputs,
        &outs,
        &tx.credentials,
        &fee_map(backend, fee),
    )?;

    if !continuous {
        verify_start_not_too_far(current_timestamp, inner.validator.start_time)?;
    }
    Ok(validator.end_time)
}

/// Validation for `StopStakerTx`. Returns every staker to stop (the named
/// one, plus its delegators and same-node subnet validators when it is a
/// primary-network validator) and the stop time to apply to all of them.
pub(crate) fn verify_stop_staker_tx(
    backend: &Backend,
    state: &dyn ChainState,
    tx: &Tx,
    inner: &StopStakerTx,
    fee: u64,
) -> Result<(Vec<Staker>, u64), ExecutorError> {
    if !backend
        .config
        .forks
        .is_continuous_staking_active(state.get_timestamp())
    {
        return Err(StakerValidationError::WrongFork.into());
    }

    tx.syntactic_verify(&backend.tx_context())?;

    let staker_to_stop = state
        .get_current_staker_iterator()
        .find(|staker| staker.tx_id == inner.tx_id)
        .ok_or(StateError::NotFound)?;

    if backend.is_bootstrapped() {
        let base_creds =
            verify_stop_staker_authorization(backend, state, tx, inner.tx_id, &inner.staker_auth)?;

        backend.flow_checker.verify_spend(
            tx,
            state,
            &inner.base.inputs,
            &inner.base.outputs,
            base_creds,
            &fee_map(backend, fee),
        )?;
    }

    let stop_time = staker_to_stop.earliest_stop_time;
    if !staker_to_stop.priority.is_validator() || staker_to_stop.subnet_id != SubnetId::PRIMARY {
        return Ok((vec![staker_to_stop], stop_time));
    }

    // Stopping a primary-network validator truncates everything that rides
    // on its node: its delegators and any subnet validators using the node.
    let mut result = vec![staker_to_stop.clone()];
    result.extend(state.get_current_staker_iterator().filter(|staker| {
        staker.node_id == staker_to_stop.node_id && staker.tx_id != staker_to_stop.tx_id
    }));
    Ok((result, stop_time))
}

fn verify_stop_staker_authorization<'t>(
    backend: &Backend,
    state: &dyn ChainState,
    tx: &'t Tx,
    staker_tx_id: TxId,
    staker_auth: &SubnetAuth,
) -> Result<&'t [Credential], ExecutorError> {
    if tx.credentials.is_empty() {
        return Err(StakerValidationError::WrongNumberOfCredentials.into());
    }
    let (base_creds, auth_cred) = tx.credentials.split_at(tx.credentials.len() - 1);

    let staker_tx = state.get_tx(staker_tx_id)?;
    let owner = staker_owner(state, &staker_tx)?;

    backend
        .fx
        .verify_permission(&tx.unsigned_bytes(), staker_auth, &auth_cred[0], &owner)
        .map_err(|_| StakerValidationError::UnauthorizedStakerStopping)?;

    Ok(base_creds)
}

/// The owner whose signature authorizes stopping a staker: the rewards
/// owner for reward-bearing stakers, the subnet owner for permissioned
/// subnet validators.
fn staker_owner(state: &dyn ChainState, staker_tx: &Tx) -> Result<OutputOwners, ExecutorError> {
    match &staker_tx.unsigned {
        UnsignedTx::AddValidator(v) => Ok(v.rewards_owner.clone()),
        UnsignedTx::AddPermissionlessValidator(v) => Ok(v.validation_rewards_owner.clone()),
        UnsignedTx::AddDelegator(d) => Ok(d.rewards_owner.clone()),
        UnsignedTx::AddPermissionlessDelegator(d) => Ok(d.rewards_owner.clone()),
        UnsignedTx::AddSubnetValidator(sv) => subnet_owner(state, sv.subnet_id),
        _ => Err(StateError::WrongTxType.into()),
    }
}

/// The control owner of a subnet, from its `CreateSubnetTx`.
pub(crate) fn subnet_owner(
    state: &dyn ChainState,
    subnet_id: SubnetId,
) -> Result<OutputOwners, ExecutorError> {
    let subnet_tx = state.get_tx(TxId(subnet_id.0))?;
    match &subnet_tx.unsigned {
        UnsignedTx::CreateSubnet(create) => Ok(create.owner.clone()),
        _ => Err(StateError::WrongTxType.into()),
    }
}

/// Verifies the subnet authorization credential (the last credential of the
/// envelope) against the subnet's control owner, returning the remaining
/// base credentials.
pub(crate) fn verify_subnet_authorization<'t>(
    backend: &Backend,
    state: &dyn ChainState,
    tx: &'t Tx,
    subnet_id: SubnetId,
    auth: &SubnetAuth,
) -> Result<&'t [Credential], ExecutorError> {
    if tx.credentials.is_empty() {
        return Err(StakerValidationError::WrongNumberOfCredentials.into());
    }
    let (base_creds, auth_cred) = tx.credentials.split_at(tx.credentials.len() - 1);

    let owner = subnet_owner(state, subnet_id)?;
    backend
        .fx
        .verify_permission(&tx.unsigned_bytes(), auth, &auth_cred[0], &owner)
        .map_err(|reason| {
            StakerValidationError::UnauthorizedSubnetModification(reason)
        })?;

    Ok(base_creds)
}

/// Like [`verify_subnet_authorization`], additionally rejecting subnets
/// that have been transformed: a permissionless subnet's validator set is
/// no longer owner-modifiable.
pub(crate) fn verify_poa_subnet_authorization<'t>(
    backend: &Backend,
    state: &dyn ChainState,
    tx: &'t Tx,
    subnet_id: SubnetId,
    auth: &SubnetAuth,
) -> Result<&'t [Credential], ExecutorError> {
    if state.get_subnet_transformation(subnet_id).is_ok() {
        return Err(StakerValidationError::ImmutableSubnetModification { subnet: subnet_id }.into());
    }
    verify_subnet_authorization(backend, state, tx, subnet_id, auth)
}

/// The staking rules a validator must satisfy on a subnet: platform config
/// for the primary network, the subnet's `TransformSubnetTx` otherwise.
pub(crate) struct ValidatorRules {
    pub asset_id: AssetId,
    pub min_validator_stake: u64,
    pub max_validator_stake: u64,
    pub min_stake_duration: u64,
    pub max_stake_duration: u64,
    pub min_delegation_fee: u32,
}

pub(crate) fn get_validator_rules(
    backend: &Backend,
    state: &dyn ChainState,
    subnet_id: SubnetId,
) -> Result<ValidatorRules, ExecutorError> {
    let config = &backend.config;
    if subnet_id == SubnetId::PRIMARY {
        return Ok(ValidatorRules {
            asset_id: config.asset_id,
            min_validator_stake: config.min_validator_stake,
            max_validator_stake: config.max_validator_stake,
            min_stake_duration: config.min_stake_duration,
            max_stake_duration: config.max_stake_duration,
            min_delegation_fee: config.min_delegation_fee,
        });
    }

    let transform_tx = state
        .get_subnet_transformation(subnet_id)
        .map_err(|_| StakerValidationError::NotTransformSubnetTx { subnet: subnet_id })?;
    let UnsignedTx::TransformSubnet(transform) = &transform_tx.unsigned else {
        return Err(StakerValidationError::NotTransformSubnetTx { subnet: subnet_id }.into());
    };
    Ok(ValidatorRules {
        asset_id: transform.asset_id,
        min_validator_stake: transform.min_validator_stake,
        max_validator_stake: transform.max_validator_stake,
        min_stake_duration: transform.min_stake_duration,
        max_stake_duration: transform.max_stake_duration,
        min_delegation_fee: transform.min_delegation_fee,
    })
}

/// The staking rules a delegator must satisfy on a subnet.
pub(crate) struct DelegatorRules {
    pub asset_id: AssetId,
    pub min_delegator_stake: u64,
    pub max_validator_stake: u64,
    pub min_stake_duration: u64,
    pub max_stake_duration: u64,
    pub max_validator_weight_factor: u8,
}

pub(crate) fn get_delegator_rules(
    backend: &Backend,
    state: &dyn ChainState,
    subnet_id: SubnetId,
) -> Result<DelegatorRules, ExecutorError> {
    let config = &backend.config;
    if subnet_id == SubnetId::PRIMARY {
        return Ok(DelegatorRules {
            asset_id: config.asset_id,
            min_delegator_stake: config.min_delegator_stake,
            max_validator_stake: config.max_validator_stake,
            min_stake_duration: config.min_stake_duration,
            max_stake_duration: config.max_stake_duration,
            max_validator_weight_factor: MAX_VALIDATOR_WEIGHT_FACTOR,
        });
    }

    let transform_tx = state
        .get_subnet_transformation(subnet_id)
        .map_err(|_| StakerValidationError::NotTransformSubnetTx { subnet: subnet_id })?;
    let UnsignedTx::TransformSubnet(transform) = &transform_tx.unsigned else {
        return Err(StakerValidationError::NotTransformSubnetTx { subnet: subnet_id }.into());
    };
    Ok(DelegatorRules {
        asset_id: transform.asset_id,
        min_delegator_stake: transform.min_delegator_stake,
        max_validator_stake: transform.max_validator_stake,
        min_stake_duration: transform.min_stake_duration,
        max_stake_duration: transform.max_stake_duration,
        max_validator_weight_factor: transform.max_validator_weight_factor,
    })
}

/// The pending and current priorities of a delegator on `subnet_id`.
pub(crate) fn delegator_priorities(subnet_id: SubnetId) -> (StakerPriority, StakerPriority) {
    if subnet_id == SubnetId::PRIMARY {
        (
            StakerPriority::PendingPrimaryNetworkDelegator,
            StakerPriority::CurrentPrimaryNetworkDelegator,
        )
    } else {
        (
            StakerPriority::PendingSubnetPermissionlessDelegator,
            StakerPriority::CurrentSubnetPermissionlessDelegator,
        )
    }
}

/// Builds the would-be staker record for a delegation candidate, in
/// whichever form the active fork dictates.
#[allow(clippy::too_many_arguments)]
fn candidate_delegator(
    tx_id: TxId,
    node_id: NodeId,
    subnet_id: SubnetId,
    weight: u64,
    stated_start: u64,
    stated_end: u64,
    pending_priority: StakerPriority,
    current_timestamp: u64,
    continuous: bool,
) -> Staker {
    if continuous {
        Staker::new_current(
            tx_id,
            node_id,
            subnet_id,
            weight,
            current_timestamp,
            stated_end.saturating_sub(stated_start),
            MAX_TIME,
            0,
            pending_priority.as_current(),
        )
    } else {
        Staker::new_pending(
            tx_id,
            node_id,
            subnet_id,
            weight,
            stated_start,
            stated_end,
            pending_priority,
        )
    }
}

/// Whether `candidate` can delegate to `validator` without the combined
/// weight exceeding `maximum_weight` at any instant of the candidate's
/// staking interval. Considers every existing current and pending delegator
/// of the validator.
pub(crate) fn can_delegate(
    state: &dyn ChainState,
    validator: &Staker,
    maximum_weight: u64,
    candidate: &Staker,
) -> bool {
    let window_start = candidate.start_time;
    let window_end = candidate.end_time;

    // Sweep line over delegation intervals clipped to the candidate's
    // window. Ends sort before starts at the same instant: intervals are
    // half-open.
    let mut events: Vec<(u64, bool, u64)> = Vec::new();
    let existing = state
        .get_current_delegator_iterator(validator.subnet_id, validator.node_id)
        .chain(state.get_pending_delegator_iterator(validator.subnet_id, validator.node_id));
    for delegator in existing {
        let start = delegator.start_time.max(window_start);
        let end = delegator.end_time.min(window_end);
        if start >= end {
            continue;
        }
        events.push((end, false, delegator.weight));
        events.push((start, true, delegator.weight));
    }
    events.sort_unstable_by_key(|&(time, is_start, _)| (time, is_start));

    let base = u128::from(validator.weight) + u128::from(candidate.weight);
    let mut active = base;
    let mut supremum = base;
    for (_, is_start, weight) in events {
        if is_start {
            active += u128::from(weight);
            supremum = supremum.max(active);
        } else {
            active -= u128::from(weight);
        }
    }
    supremum <= u128::from(maximum_weight)
}
