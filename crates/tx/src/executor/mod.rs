// Path: crates/tx/src/executor/mod.rs
//! The standard transaction executor.
//!
//! One executor instance runs one transaction against one staged diff. The
//! effect order is fixed: verify, compute fees, flow-check, consume inputs,
//! produce outputs, staker mutations, atomic requests. On any error the
//! diff may be partially mutated; the caller commits it only on success.

pub mod proposal;

pub use proposal::ProposalTxExecutor;

use crate::fee::{BlockFeeState, FeeCalculator};
use crate::flow::FlowChecker;
use crate::reward::ScaledRewardCalculator;
use crate::verify;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use trellis_api::shared_memory::{AtomicElement, AtomicRequests};
use trellis_api::state::ChainDiff;
use trellis_api::{ChainRegistrar, Fx, RewardCalculator, SharedMemory};
use trellis_types::codec;
use trellis_types::config::{DynamicFeesConfig, PlatformConfig};
use trellis_types::error::{ExecutorError, StakerValidationError};
use trellis_types::ids::{AssetId, ChainId, NodeId, SubnetId, TxId, UtxoId, UtxoKey};
use trellis_types::staker::{Staker, StakerPriority, MAX_TIME};
use tracing::debug;
use trellis_types::tx::{StakerView, Tx, TxContext, UnsignedTx};
use trellis_types::utxo::{TransferInput, TransferOutput, Utxo};

/// Everything the executors need besides the diff: configuration, the
/// crypto seam, the flow checker, shared memory, and the chain registrar.
pub struct Backend {
    /// The platform configuration, fork schedule included.
    pub config: PlatformConfig,
    /// The id of the chain this executor runs on (the platform chain).
    pub chain_id: ChainId,
    /// The subnet the executing chain belongs to.
    pub subnet_id: SubnetId,
    /// Credential verification.
    pub fx: Arc<dyn Fx + Send + Sync>,
    /// Input/output/fee conservation.
    pub flow_checker: FlowChecker,
    /// The cross-chain atomic memory region.
    pub shared_memory: Arc<dyn SharedMemory + Send + Sync>,
    /// The on-accept blockchain instantiation hook.
    pub chain_registrar: Arc<dyn ChainRegistrar>,
    /// Custom dynamic-fee parameters, admitted for non-production networks.
    pub custom_dynamic_fees: Option<DynamicFeesConfig>,
    bootstrapped: AtomicBool,
}

impl Backend {
    /// Builds a backend. `fx` is shared with the flow checker.
    pub fn new(
        config: PlatformConfig,
        chain_id: ChainId,
        subnet_id: SubnetId,
        fx: Arc<dyn Fx + Send + Sync>,
        shared_memory: Arc<dyn SharedMemory + Send + Sync>,
        chain_registrar: Arc<dyn ChainRegistrar>,
    ) -> Self {
        Self {
            config,
            chain_id,
            subnet_id,
            flow_checker: FlowChecker::new(fx.clone()),
            fx,
            shared_memory,
            chain_registrar,
            custom_dynamic_fees: None,
            bootstrapped: AtomicBool::new(false),
        }
    }

    /// The static verification context.
    pub fn tx_context(&self) -> TxContext {
        TxContext {
            network_id: self.config.network_id,
            chain_id: self.chain_id,
        }
    }

    /// Whether state sync has finished. Before that, verifiers skip flow
    /// checks and authorization and only replay effects.
    pub fn is_bootstrapped(&self) -> bool {
        self.bootstrapped.load(Ordering::Acquire)
    }

    /// Marks state sync finished.
    pub fn mark_bootstrapped(&self) {
        self.bootstrapped.store(true, Ordering::Release);
    }

    /// The dynamic-fee parameters effective at `timestamp`.
    pub fn effective_dynamic_fees(&self, timestamp: u64) -> DynamicFeesConfig {
        DynamicFeesConfig::effective(
            &self.config.forks,
            timestamp,
            self.custom_dynamic_fees.as_ref(),
        )
    }
}

/// The callback registered by `CreateChainTx`, run if and when the
/// enclosing block is accepted. Must be idempotent.
pub type OnAcceptFn = Box<dyn FnOnce() + Send>;

/// What one executed transaction asks of its surroundings.
#[derive(Default)]
pub struct TxExecutionOutputs {
    /// Run when the enclosing block is accepted.
    pub on_accept: Option<OnAcceptFn>,
    /// Shared-memory UTXO keys consumed by this transaction.
    pub inputs: HashSet<UtxoKey>,
    /// Shared-memory operations, applied atomically with block acceptance.
    pub atomic_requests: HashMap<ChainId, AtomicRequests>,
}

impl std::fmt::Debug for TxExecutionOutputs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TxExecutionOutputs")
            .field("on_accept", &self.on_accept.as_ref().map(|_| "<fn>"))
            .field("inputs", &self.inputs)
            .field("atomic_requests", &self.atomic_requests)
            .finish()
    }
}

/// Executes one standard transaction against a staged diff.
pub struct StandardTxExecutor<'a, D: ChainDiff> {
    backend: &'a Backend,
    block_fees: &'a mut BlockFeeState,
    diff: &'a mut D,
    tx: &'a Tx,
}

impl<'a, D: ChainDiff> StandardTxExecutor<'a, D> {
    /// Binds an executor to a transaction. `block_fees` is shared by every
    /// transaction of the block being built or verified.
    pub fn new(
        backend: &'a Backend,
        block_fees: &'a mut BlockFeeState,
        diff: &'a mut D,
        tx: &'a Tx,
    ) -> Self {
        Self {
            backend,
            block_fees,
            diff,
            tx,
        }
    }

    /// Runs the transaction. On error the diff must be discarded.
    pub fn execute(self) -> Result<TxExecutionOutputs, ExecutorError> {
        let chain_time = self.diff.get_timestamp();
        let fee = {
            let mut calculator =
                FeeCalculator::new(&self.backend.config, chain_time, self.block_fees);
            calculator.compute_fee(self.tx)?
        };

        let backend = self.backend;
        let diff = self.diff;
        let tx = self.tx;
        let tx_id = tx.id();
        let mut outputs = TxExecutionOutputs::default();

        match &tx.unsigned {
            UnsignedTx::AdvanceTime(_) | UnsignedTx::RewardValidator(_) => {
                return Err(ExecutorError::WrongTxType)
            }

            UnsignedTx::Base(inner) => {
                tx.syntactic_verify(&backend.tx_context())?;
                backend.flow_checker.verify_spend(
                    tx,
                    diff_state(diff),
                    &inner.base.inputs,
                    &inner.base.outputs,
                    &tx.credentials,
                    &platform_fee(backend, fee),
                )?;
                consume(diff, &inner.base.inputs);
                produce(diff, tx_id, &inner.base.outputs, 0);
            }

            UnsignedTx::CreateSubnet(inner) => {
                tx.syntactic_verify(&backend.tx_context())?;
                backend.flow_checker.verify_spend(
                    tx,
                    diff_state(diff),
                    &inner.base.inputs,
                    &inner.base.outputs,
                    &tx.credentials,
                    &platform_fee(backend, fee),
                )?;
                consume(diff, &inner.base.inputs);
                produce(diff, tx_id, &inner.base.outputs, 0);
                diff.add_subnet(tx);
            }

            UnsignedTx::CreateChain(inner) => {
                tx.syntactic_verify(&backend.tx_context())?;
                let base_creds = verify::verify_poa_subnet_authorization(
                    backend,
                    diff_state(diff),
                    tx,
                    inner.subnet_id,
                    &inner.subnet_auth,
                )?;
                backend.flow_checker.verify_spend(
                    tx,
                    diff_state(diff),
                    &inner.base.inputs,
                    &inner.base.outputs,
                    base_creds,
                    &platform_fee(backend, fee),
                )?;
                consume(diff, &inner.base.inputs);
                produce(diff, tx_id, &inner.base.outputs, 0);
                diff.add_chain(tx);

                // Instantiate the new blockchain only if this block lands.
                let registrar = backend.chain_registrar.clone();
                let create = inner.clone();
                outputs.on_accept = Some(Box::new(move || {
                    registrar.create_chain(tx_id, &create);
                }));
            }

            UnsignedTx::Import(inner) => {
                tx.syntactic_verify(&backend.tx_context())?;

                let utxo_keys: Vec<UtxoKey> = inner
                    .imported_inputs
                    .iter()
                    .map(|input| input.utxo_id.input_id())
                    .collect();
                outputs.inputs = utxo_keys.iter().copied().collect();

                if backend.is_bootstrapped() {
                    verify_same_subnet(backend, diff_state(diff), inner.source_chain)?;

                    let utxo_bytes = backend
                        .shared_memory
                        .get(inner.source_chain, &utxo_keys)?;

                    let mut utxos =
                        Vec::with_capacity(inner.base.inputs.len() + utxo_bytes.len());
                    for input in &inner.base.inputs {
                        let utxo = diff
                            .get_utxo(&input.utxo_id)
                            .map_err(|_| ExecutorError::FlowCheckFailed(
                                trellis_types::error::FlowCheckError::MissingUtxo(input.utxo_id),
                            ))?;
                        utxos.push(utxo);
                    }
                    for bytes in &utxo_bytes {
                        let utxo: Utxo = codec::from_bytes_canonical(bytes)
                            .map_err(|e| ExecutorError::Unmarshal(e.to_string()))?;
                        utxos.push(utxo);
                    }

                    let mut all_inputs = inner.base.inputs.clone();
                    all_inputs.extend(inner.imported_inputs.iter().cloned());

                    backend.flow_checker.verify_spend_utxos(
                        tx,
                        &utxos,
                        &all_inputs,
                        &inner.base.outputs,
                        &tx.credentials,
                        &platform_fee(backend, fee),
                    )?;
                }

                consume(diff, &inner.base.inputs);
                produce(diff, tx_id, &inner.base.outputs, 0);

                outputs.atomic_requests.insert(
                    inner.source_chain,
                    AtomicRequests {
                        put_requests: Vec::new(),
                        remove_requests: utxo_keys,
                    },
                );
            }

            UnsignedTx::Export(inner) => {
                tx.syntactic_verify(&backend.tx_context())?;

                let mut all_outputs = inner.base.outputs.clone();
                all_outputs.extend(inner.exported_outputs.iter().cloned());

                if backend.is_bootstrapped() {
                    verify_same_subnet(backend, diff_state(diff), inner.destination_chain)?;
                }

                backend.flow_checker.verify_spend(
                    tx,
                    diff_state(diff),
                    &inner.base.inputs,
                    &all_outputs,
                    &tx.credentials,
                    &platform_fee(backend, fee),
                )?;

                consume(diff, &inner.base.inputs);
                produce(diff, tx_id, &inner.base.outputs, 0);

                let mut elements = Vec::with_capacity(inner.exported_outputs.len());
                for (i, exported) in inner.exported_outputs.iter().enumerate() {
                    let utxo = Utxo {
                        utxo_id: UtxoId {
                            tx_id,
                            output_index: (inner.base.outputs.len() + i) as u32,
                        },
                        output: exported.clone(),
                    };
                    elements.push(AtomicElement {
                        key: utxo.key(),
                        value: codec::to_bytes_canonical(&utxo),
                        traits: utxo.addresses().to_vec(),
                    });
                }
                outputs.atomic_requests.insert(
                    inner.destination_chain,
                    AtomicRequests {
                        put_requests: elements,
                        remove_requests: Vec::new(),
                    },
                );
            }

            UnsignedTx::AddValidator(inner) => {
                if inner.validator.node_id == NodeId::EMPTY {
                    return Err(StakerValidationError::EmptyNodeId.into());
                }
                verify::verify_add_validator_tx(backend, diff_state(diff), tx, inner, fee)?;

                let view = tx.unsigned.staker_view().expect("staker variant");
                add_staker_from_staker_tx(diff, backend, tx_id, &view, chain_time, MAX_TIME)?;

                consume(diff, &inner.base.inputs);
                produce(diff, tx_id, &inner.base.outputs, 0);
            }

            UnsignedTx::AddSubnetValidator(inner) => {
                verify::verify_add_subnet_validator_tx(backend, diff_state(diff), tx, inner, fee)?;

                let view = tx.unsigned.staker_view().expect("staker variant");
                let bound = chain_time.saturating_add(view.staking_period());
                add_staker_from_staker_tx(diff, backend, tx_id, &view, chain_time, bound)?;

                consume(diff, &inner.base.inputs);
                produce(diff, tx_id, &inner.base.outputs, 0);
            }

            UnsignedTx::AddDelegator(inner) => {
                let (_, primary_end) =
                    verify::verify_add_delegator_tx(backend, diff_state(diff), tx, inner, fee)?;

                let view = tx.unsigned.staker_view().expect("staker variant");
                add_staker_from_staker_tx(diff, backend, tx_id, &view, chain_time, primary_end)?;

                consume(diff, &inner.base.inputs);
                produce(diff, tx_id, &inner.base.outputs, 0);
            }

            UnsignedTx::AddPermissionlessValidator(inner) => {
                verify::verify_add_permissionless_validator_tx(
                    backend,
                    diff_state(diff),
                    tx,
                    inner,
                    fee,
                )?;

                let view = tx.unsigned.staker_view().expect("staker variant");
                let bound = if inner.subnet_id == SubnetId::PRIMARY {
                    MAX_TIME
                } else {
                    chain_time.saturating_add(view.staking_period())
                };
                add_staker_from_staker_tx(diff, backend, tx_id, &view, chain_time, bound)?;

                consume(diff, &inner.base.inputs);
                produce(diff, tx_id, &inner.base.outputs, 0);
            }

            UnsignedTx::AddPermissionlessDelegator(inner) => {
                let validator_end = verify::verify_add_permissionless_delegator_tx(
                    backend,
                    diff_state(diff),
                    tx,
                    inner,
                    fee,
                )?;

                let view = tx.unsigned.staker_view().expect("staker variant");
                add_staker_from_staker_tx(diff, backend, tx_id, &view, chain_time, validator_end)?;

                consume(diff, &inner.base.inputs);
                produce(diff, tx_id, &inner.base.outputs, 0);
            }

            UnsignedTx::RemoveSubnetValidator(inner) => {
                let (staker, is_current) = verify::verify_remove_subnet_validator_tx(
                    backend,
                    diff_state(diff),
                    tx,
                    inner,
                    fee,
                )?;

                if is_current {
                    diff.delete_current_validator(&staker);
                } else {
                    diff.delete_pending_validator(&staker);
                }
                // Permissioned subnet validators never carry delegators.

                consume(diff, &inner.base.inputs);
                produce(diff, tx_id, &inner.base.outputs, 0);
            }

            UnsignedTx::TransformSubnet(inner) => {
                tx.syntactic_verify(&backend.tx_context())?;

                if inner.max_stake_duration > backend.config.max_stake_duration {
                    return Err(StakerValidationError::MaxStakeDurationTooLarge.into());
                }
                if inner.asset_id == backend.config.asset_id {
                    return Err(StakerValidationError::InvalidTransformAsset.into());
                }

                let base_creds = verify::verify_poa_subnet_authorization(
                    backend,
                    diff_state(diff),
                    tx,
                    inner.subnet_id,
                    &inner.subnet_auth,
                )?;

                // The whole reward pot is locked up front: the difference
                // between maximum and initial supply is burned here and
                // minted back out as staking rewards.
                let total_reward_amount = inner.maximum_supply - inner.initial_supply;
                let mut required_fees = platform_fee(backend, fee);
                required_fees.insert(inner.asset_id, total_reward_amount);

                backend.flow_checker.verify_spend(
                    tx,
                    diff_state(diff),
                    &inner.base.inputs,
                    &inner.base.outputs,
                    base_creds,
                    &required_fees,
                )?;

                consume(diff, &inner.base.inputs);
                produce(diff, tx_id, &inner.base.outputs, 0);
                diff.add_subnet_transformation(tx);
                diff.set_current_supply(inner.subnet_id, inner.initial_supply);
            }

            UnsignedTx::StopStaker(inner) => {
                let (stakers, stop_time) =
                    verify::verify_stop_staker_tx(backend, diff_state(diff), tx, inner, fee)?;

                debug!(staker = %inner.tx_id, stop_time, cascade = stakers.len(), "stopping staker");
                for mut staker in stakers {
                    staker.mark_for_removal_before(stop_time);
                    if staker.priority.is_validator() {
                        diff.update_current_validator(staker)?;
                    } else {
                        diff.update_current_delegator(staker)?;
                    }
                }

                consume(diff, &inner.base.inputs);
                produce(diff, tx_id, &inner.base.outputs, 0);
            }
        }

        Ok(outputs)
    }
}

/// Upcasts the generic diff to the read-only view the verifiers take.
fn diff_state<D: ChainDiff>(diff: &D) -> &dyn trellis_api::state::ChainState {
    diff
}

/// The required-fee map charging `fee` in the platform asset.
fn platform_fee(backend: &Backend, fee: u64) -> HashMap<AssetId, u64> {
    [(backend.config.asset_id, fee)].into_iter().collect()
}

/// Marks every input's UTXO consumed.
fn consume<D: ChainDiff>(diff: &mut D, inputs: &[TransferInput]) {
    for input in inputs {
        diff.delete_utxo(&input.utxo_id);
    }
}

/// Materializes `outputs` as UTXOs of `tx_id`, starting at `first_index`.
pub(crate) fn produce<D: ChainDiff>(
    diff: &mut D,
    tx_id: TxId,
    outputs: &[TransferOutput],
    first_index: u32,
) {
    for (i, output) in outputs.iter().enumerate() {
        diff.add_utxo(Utxo {
            utxo_id: UtxoId {
                tx_id,
                output_index: first_index + i as u32,
            },
            output: output.clone(),
        });
    }
}

/// Fails an import or export naming a chain outside the executing subnet.
fn verify_same_subnet(
    backend: &Backend,
    state: &dyn trellis_api::state::ChainState,
    peer_chain: ChainId,
) -> Result<(), ExecutorError> {
    let peer_subnet = state
        .get_chain_subnet(peer_chain)
        .map_err(|_| ExecutorError::ChainNotInSubnet { chain: peer_chain })?;
    if peer_subnet != backend.subnet_id || peer_chain == backend.chain_id {
        return Err(ExecutorError::ChainNotInSubnet { chain: peer_chain });
    }
    Ok(())
}

/// Builds the staker record for an accepted staker transaction and inserts
/// it into the diff.
///
/// Before the continuous-staking fork the staker enters the pending set
/// with its stated times. After it, the staker is immediately current: its
/// start is `chain_time`, its end is `end_time_bound`, and for
/// reward-bearing variants the potential reward is minted into the
/// subnet's supply up front.
pub(crate) fn add_staker_from_staker_tx<D: ChainDiff>(
    diff: &mut D,
    backend: &Backend,
    tx_id: TxId,
    view: &StakerView<'_>,
    chain_time: u64,
    end_time_bound: u64,
) -> Result<(), ExecutorError> {
    let staker = if !backend
        .config
        .forks
        .is_continuous_staking_active(chain_time)
    {
        Staker::new_pending(
            tx_id,
            view.node_id,
            view.subnet_id,
            view.weight,
            view.start_time,
            view.end_time,
            view.pending_priority,
        )
    } else {
        let mut potential_reward = 0;
        if view.current_priority != StakerPriority::CurrentSubnetPermissionedValidator {
            let current_supply = diff.get_current_supply(view.subnet_id)?;
            let reward_config = diff.get_reward_config(view.subnet_id)?;
            let calculator = ScaledRewardCalculator::new(reward_config);
            potential_reward =
                calculator.calculate(view.staking_period(), view.weight, current_supply);
            diff.set_current_supply(
                view.subnet_id,
                current_supply.saturating_add(potential_reward),
            );
        }
        Staker::new_current(
            tx_id,
            view.node_id,
            view.subnet_id,
            view.weight,
            chain_time,
            view.staking_period(),
            end_time_bound,
            potential_reward,
            view.current_priority,
        )
    };

    match staker.priority {
        p if p.is_current() && p.is_validator() => diff.put_current_validator(staker),
        p if p.is_current() => diff.put_current_delegator(staker),
        p if p.is_validator() => diff.put_pending_validator(staker),
        _ => diff.put_pending_delegator(staker),
    }
    Ok(())
}

#[cfg(test)]
mod tests;
