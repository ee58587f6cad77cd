// Path: crates/state/src/store.rs
//! The committed in-memory store.
//!
//! `MemoryState` is the canonical `ChainState` implementation backing tests
//! and light deployments, and it owns the reverse diff log the validator
//! manager replays: per-height weight diffs per subnet and public-key diffs
//! for the primary network. Durable deployments put a key-value store behind
//! the same interface using the layout in [`crate::keys`].

use crate::stakers::StakerBook;
use std::collections::{HashMap, HashSet};
use tracing::error;
use trellis_api::state::{ChainDiff, ChainState, StakerIter};
use trellis_api::CancelToken;
use trellis_types::config::RewardConfig;
use trellis_types::error::{ManagerError, StateError};
use trellis_types::ids::{BlockId, BlsPublicKey, ChainId, NodeId, SubnetId, TxId, UtxoId};
use trellis_types::staker::Staker;
use trellis_types::tx::{Tx, UnsignedTx};
use trellis_types::utxo::Utxo;
use trellis_types::validator::{
    ValidatorPublicKeyDiff, ValidatorSet, ValidatorSnapshot, ValidatorWeightDiff,
};

/// The committed platform-chain state, entirely in memory.
#[derive(Default)]
pub struct MemoryState {
    timestamp: u64,
    supplies: HashMap<SubnetId, u64>,
    txs: HashMap<TxId, Tx>,
    utxos: HashMap<UtxoId, Utxo>,
    chains: HashMap<ChainId, SubnetId>,
    subnets: HashSet<SubnetId>,
    transformations: HashMap<SubnetId, TxId>,
    reward_configs: HashMap<SubnetId, RewardConfig>,
    pub(crate) current: StakerBook,
    pub(crate) pending: StakerBook,

    // Primary-network BLS keys, overlaid onto subnet snapshots.
    bls_keys: HashMap<NodeId, BlsPublicKey>,

    // Block bookkeeping for the validator manager.
    last_accepted: BlockId,
    block_heights: HashMap<BlockId, u64>,

    // Reverse diff log, keyed by (subnet, height) and height respectively.
    weight_diffs: HashMap<(SubnetId, u64), HashMap<NodeId, ValidatorWeightDiff>>,
    public_key_diffs: HashMap<u64, HashMap<NodeId, ValidatorPublicKeyDiff>>,
}

impl MemoryState {
    /// An empty store at timestamp zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Directly sets the chain clock.
    pub fn set_timestamp(&mut self, timestamp: u64) {
        self.timestamp = timestamp;
    }

    /// Directly sets a subnet's circulating supply.
    pub fn set_current_supply(&mut self, subnet_id: SubnetId, supply: u64) {
        self.supplies.insert(subnet_id, supply);
    }

    /// Records an accepted transaction.
    pub fn add_tx(&mut self, tx: Tx) {
        self.txs.insert(tx.id(), tx);
    }

    /// Materializes a UTXO.
    pub fn add_utxo(&mut self, utxo: Utxo) {
        self.utxos.insert(utxo.utxo_id, utxo);
    }

    /// Consumes a UTXO.
    pub fn remove_utxo(&mut self, utxo_id: &UtxoId) {
        self.utxos.remove(utxo_id);
    }

    /// Registers a subnet from its creating transaction.
    pub fn add_subnet(&mut self, tx: &Tx) {
        self.subnets.insert(SubnetId(tx.id().0));
        self.add_tx(tx.clone());
    }

    /// Registers a blockchain from its creating transaction.
    pub fn add_chain(&mut self, tx: &Tx) {
        if let UnsignedTx::CreateChain(create) = &tx.unsigned {
            self.chains.insert(ChainId(tx.id().0), create.subnet_id);
        }
        self.add_tx(tx.clone());
    }

    /// Registers a chain to subnet binding directly (genesis chains).
    pub fn add_chain_binding(&mut self, chain_id: ChainId, subnet_id: SubnetId) {
        self.chains.insert(chain_id, subnet_id);
    }

    /// Records a subnet transformation from its transaction.
    pub fn add_subnet_transformation(&mut self, tx: &Tx) {
        if let UnsignedTx::TransformSubnet(transform) = &tx.unsigned {
            self.transformations.insert(transform.subnet_id, tx.id());
        }
        self.add_tx(tx.clone());
    }

    /// Sets a subnet's reward curve.
    pub fn set_reward_config(&mut self, subnet_id: SubnetId, cfg: RewardConfig) {
        self.reward_configs.insert(subnet_id, cfg);
    }

    /// Registers a primary-network validator's BLS key.
    pub fn set_bls_key(&mut self, node_id: NodeId, key: BlsPublicKey) {
        self.bls_keys.insert(node_id, key);
    }

    /// Direct access to the current staker book.
    pub fn current_stakers(&self) -> &StakerBook {
        &self.current
    }

    /// Mutable access to the current staker book.
    pub fn current_stakers_mut(&mut self) -> &mut StakerBook {
        &mut self.current
    }

    /// Direct access to the pending staker book.
    pub fn pending_stakers(&self) -> &StakerBook {
        &self.pending
    }

    /// Mutable access to the pending staker book.
    pub fn pending_stakers_mut(&mut self) -> &mut StakerBook {
        &mut self.pending
    }

    // --- Block bookkeeping ---

    /// Records an accepted block and moves the last-accepted pointer.
    pub fn accept_block(&mut self, block_id: BlockId, height: u64) {
        self.block_heights.insert(block_id, height);
        self.last_accepted = block_id;
    }

    /// The last accepted block.
    pub fn last_accepted(&self) -> BlockId {
        self.last_accepted
    }

    /// The height of a known block.
    pub fn get_block_height(&self, block_id: BlockId) -> Result<u64, StateError> {
        self.block_heights
            .get(&block_id)
            .copied()
            .ok_or(StateError::NotFound)
    }

    // --- Reverse diff log ---

    /// Records that `node_id`'s weight on `subnet_id` changed at `height`.
    pub fn record_weight_diff(
        &mut self,
        subnet_id: SubnetId,
        height: u64,
        node_id: NodeId,
        diff: ValidatorWeightDiff,
    ) {
        self.weight_diffs
            .entry((subnet_id, height))
            .or_default()
            .insert(node_id, diff);
    }

    /// Records that `node_id`'s primary-network key changed at `height`,
    /// remembering the key held before the change.
    pub fn record_public_key_diff(
        &mut self,
        height: u64,
        node_id: NodeId,
        diff: ValidatorPublicKeyDiff,
    ) {
        self.public_key_diffs
            .entry(height)
            .or_default()
            .insert(node_id, diff);
    }

    /// Rewinds `validators` from the set at `start_height` to the set at
    /// `end_height - 1` by inverting the weight diffs recorded in
    /// `[end_height, start_height]`, walking heights downward. Checks
    /// `cancel` between heights.
    pub fn apply_validator_weight_diffs(
        &self,
        validators: &mut ValidatorSet,
        start_height: u64,
        end_height: u64,
        subnet_id: SubnetId,
        cancel: &CancelToken,
    ) -> Result<(), ManagerError> {
        let mut height = start_height;
        while height >= end_height {
            if cancel.is_cancelled() {
                return Err(ManagerError::Cancelled);
            }
            if let Some(diffs) = self.weight_diffs.get(&(subnet_id, height)) {
                for (node_id, diff) in diffs {
                    let prior = match validators.get(node_id) {
                        Some(snapshot) => diff.invert(snapshot.weight),
                        // The validator is absent at this height; inverting
                        // a recorded decrease resurrects it.
                        None => diff.invert(0),
                    };
                    match prior {
                        Some(weight) => {
                            validators
                                .entry(*node_id)
                                .or_insert_with(|| ValidatorSnapshot {
                                    node_id: *node_id,
                                    weight: 0,
                                    public_key: None,
                                })
                                .weight = weight;
                        }
                        None => {
                            validators.remove(node_id);
                        }
                    }
                }
            }
            if height == 0 {
                break;
            }
            height -= 1;
        }
        Ok(())
    }

    /// Rewinds the BLS keys of `validators` by replaying the public-key
    /// diffs recorded in `[end_height, start_height]`, walking heights
    /// downward.
    pub fn apply_validator_public_key_diffs(
        &self,
        validators: &mut ValidatorSet,
        start_height: u64,
        end_height: u64,
        cancel: &CancelToken,
    ) -> Result<(), ManagerError> {
        let mut height = start_height;
        while height >= end_height {
            if cancel.is_cancelled() {
                return Err(ManagerError::Cancelled);
            }
            if let Some(diffs) = self.public_key_diffs.get(&height) {
                for (node_id, diff) in diffs {
                    if let Some(snapshot) = validators.get_mut(node_id) {
                        snapshot.public_key = diff.previous;
                    }
                }
            }
            if height == 0 {
                break;
            }
            height -= 1;
        }
        Ok(())
    }

    /// Materializes the current validator set of `subnet_id` from the
    /// current staker book: each validator's snapshot weight includes its
    /// delegators, and primary-network keys are attached where registered.
    pub fn validator_set(&self, subnet_id: SubnetId) -> Result<ValidatorSet, ManagerError> {
        let mut set = ValidatorSet::new();
        for staker in self.current.iter().filter(|s| s.subnet_id == subnet_id) {
            let entry = set
                .entry(staker.node_id)
                .or_insert_with(|| ValidatorSnapshot {
                    node_id: staker.node_id,
                    weight: 0,
                    public_key: self.bls_keys.get(&staker.node_id).copied(),
                });
            entry.weight = entry.weight.saturating_add(staker.weight);
        }
        if set.is_empty() {
            error!(subnet = %subnet_id, "no current validator set for subnet");
            return Err(ManagerError::MissingValidatorSet { subnet: subnet_id });
        }
        Ok(set)
    }
}

impl ChainState for MemoryState {
    fn get_timestamp(&self) -> u64 {
        self.timestamp
    }

    fn get_current_supply(&self, subnet_id: SubnetId) -> Result<u64, StateError> {
        self.supplies
            .get(&subnet_id)
            .copied()
            .ok_or(StateError::NotFound)
    }

    fn get_tx(&self, tx_id: TxId) -> Result<Tx, StateError> {
        self.txs.get(&tx_id).cloned().ok_or(StateError::NotFound)
    }

    fn get_utxo(&self, utxo_id: &UtxoId) -> Result<Utxo, StateError> {
        self.utxos.get(utxo_id).cloned().ok_or(StateError::NotFound)
    }

    fn get_chain_subnet(&self, chain_id: ChainId) -> Result<SubnetId, StateError> {
        self.chains
            .get(&chain_id)
            .copied()
            .ok_or(StateError::NotFound)
    }

    fn get_subnet_transformation(&self, subnet_id: SubnetId) -> Result<Tx, StateError> {
        let tx_id = self
            .transformations
            .get(&subnet_id)
            .ok_or(StateError::NotFound)?;
        self.get_tx(*tx_id)
    }

    fn get_current_validator(
        &self,
        subnet_id: SubnetId,
        node_id: NodeId,
    ) -> Result<Staker, StateError> {
        self.current
            .get_validator(subnet_id, node_id)
            .cloned()
            .ok_or(StateError::NotFound)
    }

    fn get_pending_validator(
        &self,
        subnet_id: SubnetId,
        node_id: NodeId,
    ) -> Result<Staker, StateError> {
        self.pending
            .get_validator(subnet_id, node_id)
            .cloned()
            .ok_or(StateError::NotFound)
    }

    fn get_current_staker_iterator(&self) -> StakerIter<'_> {
        Box::new(self.current.iter().cloned())
    }

    fn get_pending_staker_iterator(&self) -> StakerIter<'_> {
        Box::new(self.pending.iter().cloned())
    }

    fn get_current_delegator_iterator(
        &self,
        subnet_id: SubnetId,
        node_id: NodeId,
    ) -> StakerIter<'_> {
        Box::new(self.current.delegator_iter(subnet_id, node_id).cloned())
    }

    fn get_pending_delegator_iterator(
        &self,
        subnet_id: SubnetId,
        node_id: NodeId,
    ) -> StakerIter<'_> {
        Box::new(self.pending.delegator_iter(subnet_id, node_id).cloned())
    }

    fn get_reward_config(&self, subnet_id: SubnetId) -> Result<RewardConfig, StateError> {
        self.reward_configs
            .get(&subnet_id)
            .copied()
            .ok_or(StateError::NotFound)
    }
}

impl ChainDiff for MemoryState {
    fn set_timestamp(&mut self, timestamp: u64) {
        MemoryState::set_timestamp(self, timestamp);
    }

    fn set_current_supply(&mut self, subnet_id: SubnetId, supply: u64) {
        MemoryState::set_current_supply(self, subnet_id, supply);
    }

    fn add_utxo(&mut self, utxo: Utxo) {
        MemoryState::add_utxo(self, utxo);
    }

    fn delete_utxo(&mut self, utxo_id: &UtxoId) {
        self.remove_utxo(utxo_id);
    }

    fn add_subnet(&mut self, tx: &Tx) {
        MemoryState::add_subnet(self, tx);
    }

    fn add_chain(&mut self, tx: &Tx) {
        MemoryState::add_chain(self, tx);
    }

    fn add_subnet_transformation(&mut self, tx: &Tx) {
        MemoryState::add_subnet_transformation(self, tx);
    }

    fn put_current_validator(&mut self, staker: Staker) {
        self.current.insert(staker);
    }

    fn put_current_delegator(&mut self, staker: Staker) {
        self.current.insert(staker);
    }

    fn put_pending_validator(&mut self, staker: Staker) {
        self.pending.insert(staker);
    }

    fn put_pending_delegator(&mut self, staker: Staker) {
        self.pending.insert(staker);
    }

    fn delete_current_validator(&mut self, staker: &Staker) {
        self.current.remove(staker.tx_id);
    }

    fn delete_pending_validator(&mut self, staker: &Staker) {
        self.pending.remove(staker.tx_id);
    }

    fn delete_current_delegator(&mut self, staker: &Staker) {
        self.current.remove(staker.tx_id);
    }

    fn delete_pending_delegator(&mut self, staker: &Staker) {
        self.pending.remove(staker.tx_id);
    }

    fn update_current_validator(&mut self, staker: Staker) -> Result<(), StateError> {
        self.current.update(staker)
    }

    fn update_current_delegator(&mut self, staker: Staker) -> Result<(), StateError> {
        self.current.update(staker)
    }
}
