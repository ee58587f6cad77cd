// Path: crates/state/src/diff.rs
//! The staged diff the executor mutates.
//!
//! A `Diff` buffers every write against a read-only parent. Reads consult
//! the buffer first and fall through to the parent on miss. `apply` commits
//! the whole buffer into a [`MemoryState`]; dropping the diff discards it.
//! The executor relies on this being all-or-nothing: on any execution error
//! the caller drops the diff and the parent is untouched.

use crate::stakers::{StakerBook, StakerSortKey};
use crate::store::MemoryState;
use std::collections::{HashMap, HashSet};
use trellis_api::state::{ChainDiff, ChainState, StakerIter};
use trellis_types::config::RewardConfig;
use trellis_types::error::StateError;
use trellis_types::ids::{ChainId, SubnetId, TxId, UtxoId};
use trellis_types::ids::NodeId;
use trellis_types::staker::Staker;
use trellis_types::tx::{Tx, UnsignedTx};
use trellis_types::utxo::Utxo;

/// Buffered staker mutations for one half (current or pending) of the
/// staker state.
#[derive(Default, Debug)]
struct StakerDelta {
    added: StakerBook,
    deleted: HashSet<TxId>,
}

impl StakerDelta {
    fn put(&mut self, staker: Staker) {
        self.added.insert(staker);
    }

    fn delete(&mut self, tx_id: TxId) {
        self.added.remove(tx_id);
        self.deleted.insert(tx_id);
    }

    /// An update is a delete of the parent's record shadowed by the new one.
    fn update(&mut self, staker: Staker) {
        self.deleted.insert(staker.tx_id);
        self.added.insert(staker);
    }
}

/// A staged overlay over a committed [`ChainState`].
pub struct Diff<'a> {
    parent: &'a dyn ChainState,
    timestamp: Option<u64>,
    supplies: HashMap<SubnetId, u64>,
    added_txs: HashMap<TxId, Tx>,
    added_utxos: HashMap<UtxoId, Utxo>,
    deleted_utxos: HashSet<UtxoId>,
    added_chains: HashMap<ChainId, SubnetId>,
    added_subnets: Vec<TxId>,
    added_transformations: HashMap<SubnetId, TxId>,
    current: StakerDelta,
    pending: StakerDelta,
}

impl std::fmt::Debug for Diff<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Diff")
            .field("timestamp", &self.timestamp)
            .field("supplies", &self.supplies)
            .field("added_txs", &self.added_txs)
            .field("added_utxos", &self.added_utxos)
            .field("deleted_utxos", &self.deleted_utxos)
            .field("added_chains", &self.added_chains)
            .field("added_subnets", &self.added_subnets)
            .field("added_transformations", &self.added_transformations)
            .field("current", &self.current)
            .field("pending", &self.pending)
            .finish_non_exhaustive()
    }
}

impl<'a> Diff<'a> {
    /// A fresh, empty diff over `parent`.
    pub fn new(parent: &'a dyn ChainState) -> Self {
        Self {
            parent,
            timestamp: None,
            supplies: HashMap::new(),
            added_txs: HashMap::new(),
            added_utxos: HashMap::new(),
            deleted_utxos: HashSet::new(),
            added_chains: HashMap::new(),
            added_subnets: Vec::new(),
            added_transformations: HashMap::new(),
            current: StakerDelta::default(),
            pending: StakerDelta::default(),
        }
    }

    /// Commits every buffered write into `store`. The parent this diff was
    /// built over must be the same store.
    pub fn apply(self, store: &mut MemoryState) {
        if let Some(timestamp) = self.timestamp {
            store.set_timestamp(timestamp);
        }
        for (subnet_id, supply) in self.supplies {
            store.set_current_supply(subnet_id, supply);
        }
        for tx_id in &self.added_subnets {
            if let Some(tx) = self.added_txs.get(tx_id) {
                store.add_subnet(tx);
            }
        }
        for tx_id in self.added_transformations.values() {
            if let Some(tx) = self.added_txs.get(tx_id) {
                store.add_subnet_transformation(tx);
            }
        }
        for (_, tx) in self.added_txs {
            store.add_tx(tx);
        }
        for (_, utxo) in self.added_utxos {
            store.add_utxo(utxo);
        }
        for utxo_id in self.deleted_utxos {
            store.remove_utxo(&utxo_id);
        }
        for (chain_id, subnet_id) in self.added_chains {
            store.add_chain_binding(chain_id, subnet_id);
        }
        for tx_id in self.current.deleted {
            store.current_stakers_mut().remove(tx_id);
        }
        for staker in self.current.added.iter().cloned().collect::<Vec<_>>() {
            store.current_stakers_mut().insert(staker);
        }
        for tx_id in self.pending.deleted {
            store.pending_stakers_mut().remove(tx_id);
        }
        for staker in self.pending.added.iter().cloned().collect::<Vec<_>>() {
            store.pending_stakers_mut().insert(staker);
        }
    }

    fn merged_iter<'s>(
        parent: StakerIter<'s>,
        delta: &'s StakerDelta,
    ) -> StakerIter<'s> {
        let deleted = &delta.deleted;
        let base = parent.filter(move |s| !deleted.contains(&s.tx_id));
        Box::new(MergeIter {
            base: base.peekable(),
            overlay: delta.added.iter().cloned().peekable(),
        })
    }
}

/// Merges two staker streams, both already in staker order.
struct MergeIter<B, O>
where
    B: Iterator<Item = Staker>,
    O: Iterator<Item = Staker>,
{
    base: std::iter::Peekable<B>,
    overlay: std::iter::Peekable<O>,
}

impl<B, O> Iterator for MergeIter<B, O>
where
    B: Iterator<Item = Staker>,
    O: Iterator<Item = Staker>,
{
    type Item = Staker;

    fn next(&mut self) -> Option<Staker> {
        match (self.base.peek(), self.overlay.peek()) {
            (Some(b), Some(o)) => {
                if StakerSortKey::of(b) <= StakerSortKey::of(o) {
                    self.base.next()
                } else {
                    self.overlay.next()
                }
            }
            (Some(_), None) => self.base.next(),
            (None, _) => self.overlay.next(),
        }
    }
}

impl ChainState for Diff<'_> {
    fn get_timestamp(&self) -> u64 {
        self.timestamp.unwrap_or_else(|| self.parent.get_timestamp())
    }

    fn get_current_supply(&self, subnet_id: SubnetId) -> Result<u64, StateError> {
        match self.supplies.get(&subnet_id) {
            Some(supply) => Ok(*supply),
            None => self.parent.get_current_supply(subnet_id),
        }
    }

    fn get_tx(&self, tx_id: TxId) -> Result<Tx, StateError> {
        match self.added_txs.get(&tx_id) {
            Some(tx) => Ok(tx.clone()),
            None => self.parent.get_tx(tx_id),
        }
    }

    fn get_utxo(&self, utxo_id: &UtxoId) -> Result<Utxo, StateError> {
        if self.deleted_utxos.contains(utxo_id) {
            return Err(StateError::NotFound);
        }
        match self.added_utxos.get(utxo_id) {
            Some(utxo) => Ok(utxo.clone()),
            None => self.parent.get_utxo(utxo_id),
        }
    }

    fn get_chain_subnet(&self, chain_id: ChainId) -> Result<SubnetId, StateError> {
        match self.added_chains.get(&chain_id) {
            Some(subnet_id) => Ok(*subnet_id),
            None => self.parent.get_chain_subnet(chain_id),
        }
    }

    fn get_subnet_transformation(&self, subnet_id: SubnetId) -> Result<Tx, StateError> {
        match self.added_transformations.get(&subnet_id) {
            Some(tx_id) => self.get_tx(*tx_id),
            None => self.parent.get_subnet_transformation(subnet_id),
        }
    }

    fn get_current_validator(
        &self,
        subnet_id: SubnetId,
        node_id: NodeId,
    ) -> Result<Staker, StateError> {
        if let Some(staker) = self.current.added.get_validator(subnet_id, node_id) {
            return Ok(staker.clone());
        }
        let staker = self.parent.get_current_validator(subnet_id, node_id)?;
        if self.current.deleted.contains(&staker.tx_id) {
            return Err(StateError::NotFound);
        }
        Ok(staker)
    }

    fn get_pending_validator(
        &self,
        subnet_id: SubnetId,
        node_id: NodeId,
    ) -> Result<Staker, StateError> {
        if let Some(staker) = self.pending.added.get_validator(subnet_id, node_id) {
            return Ok(staker.clone());
        }
        let staker = self.parent.get_pending_validator(subnet_id, node_id)?;
        if self.pending.deleted.contains(&staker.tx_id) {
            return Err(StateError::NotFound);
        }
        Ok(staker)
    }

    fn get_current_staker_iterator(&self) -> StakerIter<'_> {
        Self::merged_iter(self.parent.get_current_staker_iterator(), &self.current)
    }

    fn get_pending_staker_iterator(&self) -> StakerIter<'_> {
        Self::merged_iter(self.parent.get_pending_staker_iterator(), &self.pending)
    }

    fn get_current_delegator_iterator(
        &self,
        subnet_id: SubnetId,
        node_id: NodeId,
    ) -> StakerIter<'_> {
        let deleted = &self.current.deleted;
        let base = self
            .parent
            .get_current_delegator_iterator(subnet_id, node_id)
            .filter(move |s| !deleted.contains(&s.tx_id));
        Box::new(MergeIter {
            base: base.peekable(),
            overlay: self
                .current
                .added
                .delegator_iter(subnet_id, node_id)
                .cloned()
                .peekable(),
        })
    }

    fn get_pending_delegator_iterator(
        &self,
        subnet_id: SubnetId,
        node_id: NodeId,
    ) -> StakerIter<'_> {
        let deleted = &self.pending.deleted;
        let base = self
            .parent
            .get_pending_delegator_iterator(subnet_id, node_id)
            .filter(move |s| !deleted.contains(&s.tx_id));
        Box::new(MergeIter {
            base: base.peekable(),
            overlay: self
                .pending
                .added
                .delegator_iter(subnet_id, node_id)
                .cloned()
                .peekable(),
        })
    }

    fn get_reward_config(&self, subnet_id: SubnetId) -> Result<RewardConfig, StateError> {
        self.parent.get_reward_config(subnet_id)
    }
}

impl ChainDiff for Diff<'_> {
    fn set_timestamp(&mut self, timestamp: u64) {
        self.timestamp = Some(timestamp);
    }

    fn set_current_supply(&mut self, subnet_id: SubnetId, supply: u64) {
        self.supplies.insert(subnet_id, supply);
    }

    fn add_utxo(&mut self, utxo: Utxo) {
        self.added_utxos.insert(utxo.utxo_id, utxo);
    }

    fn delete_utxo(&mut self, utxo_id: &UtxoId) {
        if self.added_utxos.remove(utxo_id).is_none() {
            self.deleted_utxos.insert(*utxo_id);
        }
    }

    fn add_subnet(&mut self, tx: &Tx) {
        self.added_subnets.push(tx.id());
        self.added_txs.insert(tx.id(), tx.clone());
    }

    fn add_chain(&mut self, tx: &Tx) {
        if let UnsignedTx::CreateChain(create) = &tx.unsigned {
            self.added_chains
                .insert(ChainId(tx.id().0), create.subnet_id);
        }
        self.added_txs.insert(tx.id(), tx.clone());
    }

    fn add_subnet_transformation(&mut self, tx: &Tx) {
        if let UnsignedTx::TransformSubnet(transform) = &tx.unsigned {
            self.added_transformations
                .insert(transform.subnet_id, tx.id());
        }
        self.added_txs.insert(tx.id(), tx.clone());
    }

    fn put_current_validator(&mut self, staker: Staker) {
        self.current.put(staker);
    }

    fn put_current_delegator(&mut self, staker: Staker) {
        self.current.put(staker);
    }

    fn put_pending_validator(&mut self, staker: Staker) {
        self.pending.put(staker);
    }

    fn put_pending_delegator(&mut self, staker: Staker) {
        self.pending.put(staker);
    }

    fn delete_current_validator(&mut self, staker: &Staker) {
        self.current.delete(staker.tx_id);
    }

    fn delete_pending_validator(&mut self, staker: &Staker) {
        self.pending.delete(staker.tx_id);
    }

    fn delete_current_delegator(&mut self, staker: &Staker) {
        self.current.delete(staker.tx_id);
    }

    fn delete_pending_delegator(&mut self, staker: &Staker) {
        self.pending.delete(staker.tx_id);
    }

    fn update_current_validator(&mut self, staker: Staker) -> Result<(), StateError> {
        // The record must exist in this diff's view.
        self.get_current_validator(staker.subnet_id, staker.node_id)?;
        self.current.update(staker);
        Ok(())
    }

    fn update_current_delegator(&mut self, staker: Staker) -> Result<(), StateError> {
        let exists = self
            .get_current_delegator_iterator(staker.subnet_id, staker.node_id)
            .any(|s| s.tx_id == staker.tx_id)
            || self
                .current
                .added
                .get_by_tx(staker.tx_id)
                .is_some();
        if !exists {
            return Err(StateError::NotFound);
        }
        self.current.update(staker);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trellis_types::staker::{Staker, StakerPriority};
    use trellis_types::utxo::{OutputOwners, TransferOutput};
    use trellis_types::ids::AssetId;

    fn utxo(tx: u8, amount: u64) -> Utxo {
        Utxo {
            utxo_id: UtxoId {
                tx_id: TxId([tx; 32]),
                output_index: 0,
            },
            output: TransferOutput {
                asset_id: AssetId([1; 32]),
                amount,
                owners: OutputOwners::default(),
            },
        }
    }

    fn current_validator(tx: u8, node: u8, end: u64) -> Staker {
        Staker {
            tx_id: TxId([tx; 32]),
            node_id: NodeId([node; 20]),
            subnet_id: SubnetId::PRIMARY,
            weight: 100,
            start_time: 0,
            end_time: end,
            earliest_stop_time: end,
            potential_reward: 0,
            priority: StakerPriority::CurrentPrimaryNetworkValidator,
        }
    }

    #[test]
    fn reads_fall_through_and_writes_shadow() {
        let mut store = MemoryState::new();
        store.set_timestamp(50);
        store.add_utxo(utxo(1, 10));

        let mut diff = Diff::new(&store);
        assert_eq!(diff.get_timestamp(), 50);
        assert!(diff.get_utxo(&utxo(1, 10).utxo_id).is_ok());

        ChainDiff::set_timestamp(&mut diff, 60);
        diff.delete_utxo(&utxo(1, 10).utxo_id);
        diff.add_utxo(utxo(2, 20));

        assert_eq!(diff.get_timestamp(), 60);
        assert!(diff.get_utxo(&utxo(1, 10).utxo_id).is_err());
        assert!(diff.get_utxo(&utxo(2, 20).utxo_id).is_ok());

        // Nothing reached the parent yet.
        assert_eq!(store.get_timestamp(), 50);
        assert!(store.get_utxo(&utxo(1, 10).utxo_id).is_ok());
    }

    #[test]
    fn apply_commits_atomically() {
        let mut store = MemoryState::new();
        store.add_utxo(utxo(1, 10));

        let mut diff = Diff::new(&store);
        ChainDiff::set_timestamp(&mut diff, 99);
        diff.delete_utxo(&utxo(1, 10).utxo_id);
        diff.add_utxo(utxo(2, 20));
        diff.put_current_validator(current_validator(3, 3, 100));

        // Work around the borrow: the diff holds `&store`.
        let staged = diff;
        let mut committed = MemoryState::new();
        committed.add_utxo(utxo(1, 10));
        staged.apply(&mut committed);

        assert_eq!(committed.get_timestamp(), 99);
        assert!(committed.get_utxo(&utxo(1, 10).utxo_id).is_err());
        assert!(committed.get_utxo(&utxo(2, 20).utxo_id).is_ok());
        assert!(committed
            .get_current_validator(SubnetId::PRIMARY, NodeId([3; 20]))
            .is_ok());
    }

    #[test]
    fn dropping_a_diff_discards_it() {
        let mut store = MemoryState::new();
        store.add_utxo(utxo(1, 10));
        {
            let mut diff = Diff::new(&store);
            diff.delete_utxo(&utxo(1, 10).utxo_id);
        }
        assert!(store.get_utxo(&utxo(1, 10).utxo_id).is_ok());
    }

    #[test]
    fn merged_iterator_interleaves_and_hides_deletions() {
        let mut store = MemoryState::new();
        store.current_stakers_mut().insert(current_validator(1, 1, 10));
        store.current_stakers_mut().insert(current_validator(2, 2, 30));

        let mut diff = Diff::new(&store);
        diff.put_current_validator(current_validator(3, 3, 20));
        diff.delete_current_validator(&current_validator(2, 2, 30));

        let order: Vec<TxId> = diff
            .get_current_staker_iterator()
            .map(|s| s.tx_id)
            .collect();
        assert_eq!(order, vec![TxId([1; 32]), TxId([3; 32])]);
    }

    #[test]
    fn update_rekeys_a_parent_record() {
        let mut store = MemoryState::new();
        store.current_stakers_mut().insert(current_validator(1, 1, 100));

        let mut diff = Diff::new(&store);
        let mut stopped = current_validator(1, 1, 100);
        stopped.mark_for_removal_before(40);
        diff.update_current_validator(stopped).unwrap();

        let got = diff
            .get_current_validator(SubnetId::PRIMARY, NodeId([1; 20]))
            .unwrap();
        assert_eq!(got.end_time, 40);
        assert_eq!(diff.get_current_staker_iterator().count(), 1);
    }
}
