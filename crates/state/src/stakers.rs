// Path: crates/state/src/stakers.rs
//! The staker book: stakers in consensus order plus lookup indexes.
//!
//! Iteration order is the staker order everywhere in the platform: next
//! transition time, then priority, then tx id. The book maintains three
//! synchronized indexes — the ordered map itself, tx id to sort key, and a
//! validator slot per (subnet, node) with a delegator set beside it.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use trellis_types::error::StateError;
use trellis_types::ids::{NodeId, SubnetId, TxId};
use trellis_types::staker::Staker;

/// The total order on stakers.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug, Hash)]
pub struct StakerSortKey {
    /// The staker's next lifecycle transition: start if pending, end if
    /// current.
    pub next_time: u64,
    /// Priority discriminant; see `StakerPriority`.
    pub priority: u8,
    /// Final tie-break.
    pub tx_id: TxId,
}

impl StakerSortKey {
    /// The sort key of a staker record.
    pub fn of(staker: &Staker) -> Self {
        Self {
            next_time: staker.next_transition_time(),
            priority: staker.priority as u8,
            tx_id: staker.tx_id,
        }
    }
}

/// One half (current or pending) of the staker state.
#[derive(Clone, Debug, Default)]
pub struct StakerBook {
    by_key: BTreeMap<StakerSortKey, Staker>,
    by_tx: HashMap<TxId, StakerSortKey>,
    validators: HashMap<(SubnetId, NodeId), TxId>,
    delegators: HashMap<(SubnetId, NodeId), BTreeSet<StakerSortKey>>,
}

impl StakerBook {
    /// An empty book.
    pub fn new() -> Self {
        Self::default()
    }

    /// The number of stakers in the book.
    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    /// True when the book is empty.
    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }

    /// Inserts a staker, indexing it as validator or delegator according to
    /// its priority. Replaces any record with the same tx id.
    pub fn insert(&mut self, staker: Staker) {
        self.remove(staker.tx_id);
        let key = StakerSortKey::of(&staker);
        let slot = (staker.subnet_id, staker.node_id);
        if staker.priority.is_validator() {
            self.validators.insert(slot, staker.tx_id);
        } else {
            self.delegators.entry(slot).or_default().insert(key);
        }
        self.by_tx.insert(staker.tx_id, key);
        self.by_key.insert(key, staker);
    }

    /// Removes the staker created by `tx_id`, returning it.
    pub fn remove(&mut self, tx_id: TxId) -> Option<Staker> {
        let key = self.by_tx.remove(&tx_id)?;
        let staker = self.by_key.remove(&key)?;
        let slot = (staker.subnet_id, staker.node_id);
        if staker.priority.is_validator() {
            self.validators.remove(&slot);
        } else if let Some(set) = self.delegators.get_mut(&slot) {
            set.remove(&key);
            if set.is_empty() {
                self.delegators.remove(&slot);
            }
        }
        Some(staker)
    }

    /// Replaces the record with the staker's tx id; the record must exist.
    pub fn update(&mut self, staker: Staker) -> Result<(), StateError> {
        if !self.by_tx.contains_key(&staker.tx_id) {
            return Err(StateError::NotFound);
        }
        self.insert(staker);
        Ok(())
    }

    /// The staker created by `tx_id`.
    pub fn get_by_tx(&self, tx_id: TxId) -> Option<&Staker> {
        self.by_tx.get(&tx_id).and_then(|k| self.by_key.get(k))
    }

    /// The validator of `subnet_id` run by `node_id`.
    pub fn get_validator(&self, subnet_id: SubnetId, node_id: NodeId) -> Option<&Staker> {
        self.validators
            .get(&(subnet_id, node_id))
            .and_then(|tx_id| self.get_by_tx(*tx_id))
    }

    /// All stakers in staker order.
    pub fn iter(&self) -> impl Iterator<Item = &Staker> + '_ {
        self.by_key.values()
    }

    /// The delegators attached to one validator, in staker order.
    pub fn delegator_iter(
        &self,
        subnet_id: SubnetId,
        node_id: NodeId,
    ) -> impl Iterator<Item = &Staker> + '_ {
        self.delegators
            .get(&(subnet_id, node_id))
            .into_iter()
            .flat_map(|set| set.iter())
            .filter_map(|key| self.by_key.get(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trellis_types::staker::{StakerPriority, MAX_TIME};

    fn validator(tx: u8, node: u8, end: u64) -> Staker {
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

    fn delegator(tx: u8, node: u8, end: u64) -> Staker {
        Staker {
            priority: StakerPriority::CurrentPrimaryNetworkDelegator,
            ..validator(tx, node, end)
        }
    }

    #[test]
    fn iteration_is_time_then_priority_then_tx() {
        let mut book = StakerBook::new();
        book.insert(delegator(1, 1, 50));
        book.insert(validator(2, 1, 50));
        book.insert(validator(3, 2, 10));

        let order: Vec<TxId> = book.iter().map(|s| s.tx_id).collect();
        // Earliest end first; at equal end, validators before delegators.
        assert_eq!(order, vec![TxId([3; 32]), TxId([2; 32]), TxId([1; 32])]);
    }

    #[test]
    fn validator_slot_and_delegator_sets_stay_in_sync() {
        let mut book = StakerBook::new();
        book.insert(validator(1, 7, 100));
        book.insert(delegator(2, 7, 60));
        book.insert(delegator(3, 7, 80));

        assert_eq!(
            book.get_validator(SubnetId::PRIMARY, NodeId([7; 20]))
                .map(|s| s.tx_id),
            Some(TxId([1; 32]))
        );
        let delegators: Vec<TxId> = book
            .delegator_iter(SubnetId::PRIMARY, NodeId([7; 20]))
            .map(|s| s.tx_id)
            .collect();
        assert_eq!(delegators, vec![TxId([2; 32]), TxId([3; 32])]);

        book.remove(TxId([2; 32]));
        assert_eq!(
            book.delegator_iter(SubnetId::PRIMARY, NodeId([7; 20])).count(),
            1
        );
        book.remove(TxId([1; 32]));
        assert!(book
            .get_validator(SubnetId::PRIMARY, NodeId([7; 20]))
            .is_none());
    }

    #[test]
    fn update_moves_the_record_to_its_new_position() {
        let mut book = StakerBook::new();
        let mut staker = validator(1, 1, MAX_TIME);
        book.insert(staker.clone());
        staker.mark_for_removal_before(500);
        book.update(staker).unwrap();

        let got = book.get_by_tx(TxId([1; 32])).unwrap();
        assert_eq!(got.end_time, 500);
        assert_eq!(book.len(), 1);
        assert_eq!(
            book.iter().next().map(|s| s.next_transition_time()),
            Some(500)
        );
    }

    #[test]
    fn update_of_missing_staker_fails() {
        let mut book = StakerBook::new();
        assert_eq!(
            book.update(validator(9, 9, 10)),
            Err(StateError::NotFound)
        );
    }
}
