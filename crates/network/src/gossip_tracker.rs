// Path: crates/network/src/gossip_tracker.rs
//! Tracks which peers each peer has already been told about.
//!
//! Every tracked peer owns one index in a dense space `0..count`; all set
//! membership is bitsets over those indices. `get_unknown` is one AND-NOT:
//! the peers we know about minus the peers we have told `p` about. Removal
//! swaps the removed index with the tail index in every bitset, keeping the
//! index space dense.
//!
//! New peers always enter at the high end of the index space, so
//! `get_unknown` iterates from the low end: the longest-untold peers come
//! first, and a limit never starves them under churn.

use hibitset::{BitSet, BitSetAnd, BitSetLike, BitSetNot};
use parking_lot::RwLock;
use std::collections::HashMap;
use trellis_types::ids::NodeId;

/// A thread-safe gossip-knowledge tracker.
///
/// `contains` and `get_unknown` take the read lock; `add`, `remove`, and
/// `update_known` take the write lock. No method holds the lock across
/// anything but map and bitset operations.
#[derive(Default)]
pub struct GossipTracker {
    inner: RwLock<Inner>,
}

struct Inner {
    /// Every peer we are aware of.
    local: BitSet,
    /// Per peer, the peers we have already told it about.
    known_peers: HashMap<NodeId, BitSet>,
    /// Peer to index.
    peers_to_indices: HashMap<NodeId, u32>,
    /// Index to peer.
    indices_to_peers: HashMap<u32, NodeId>,
}

impl Default for Inner {
    fn default() -> Self {
        Self {
            local: BitSet::new(),
            known_peers: HashMap::new(),
            peers_to_indices: HashMap::new(),
            indices_to_peers: HashMap::new(),
        }
    }
}

impl GossipTracker {
    /// An empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `id` is being tracked.
    pub fn contains(&self, id: &NodeId) -> bool {
        self.inner.read().known_peers.contains_key(id)
    }

    /// The number of tracked peers.
    pub fn len(&self) -> usize {
        self.inner.read().peers_to_indices.len()
    }

    /// True when nothing is tracked.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Starts tracking `id` at the tail of the index space. Returns false
    /// (and changes nothing) if it is already tracked.
    pub fn add(&self, id: NodeId) -> bool {
        let mut inner = self.inner.write();
        if inner.peers_to_indices.contains_key(&id) {
            return false;
        }

        let tail = inner.peers_to_indices.len() as u32;
        inner.peers_to_indices.insert(id, tail);
        inner.known_peers.insert(id, BitSet::new());
        inner.indices_to_peers.insert(tail, id);
        inner.local.add(tail);
        true
    }

    /// Stops tracking `id`, swapping the tail peer into its index so the
    /// index space stays dense. Returns false if it was not tracked.
    pub fn remove(&self, id: &NodeId) -> bool {
        let mut inner = self.inner.write();
        let Some(idx) = inner.peers_to_indices.get(id).copied() else {
            return false;
        };

        let tail = inner.peers_to_indices.len() as u32 - 1;
        if idx != tail {
            // Move the tail peer into the vacated slot.
            let tail_peer = inner.indices_to_peers[&tail];
            inner.indices_to_peers.insert(idx, tail_peer);
            inner.peers_to_indices.insert(tail_peer, idx);
        }

        inner.known_peers.remove(id);
        inner.peers_to_indices.remove(id);
        inner.indices_to_peers.remove(&tail);
        inner.local.remove(tail);

        // Mirror the swap in every peer's knowledge set: bit `tail` moves
        // to bit `idx`, bit `tail` clears.
        for known in inner.known_peers.values_mut() {
            if idx != tail {
                if known.contains(tail) {
                    known.add(idx);
                } else {
                    known.remove(idx);
                }
            }
            known.remove(tail);
        }
        true
    }

    /// Records that `id` now knows about every peer in `learned`. Fails
    /// without mutating anything if `id` or any element is untracked.
    pub fn update_known(&self, id: &NodeId, learned: &[NodeId]) -> bool {
        let mut inner = self.inner.write();
        if !inner.known_peers.contains_key(id) {
            return false;
        }

        let mut indices = Vec::with_capacity(learned.len());
        for peer in learned {
            match inner.peers_to_indices.get(peer) {
                Some(idx) => indices.push(*idx),
                None => return false,
            }
        }

        let known = inner
            .known_peers
            .get_mut(id)
            .expect("checked above");
        for idx in indices {
            known.add(idx);
        }
        true
    }

    /// Up to `limit` peers that `id` has not been told about yet, oldest
    /// index first. `None` if `id` is untracked or `limit` is zero.
    pub fn get_unknown(&self, id: &NodeId, limit: usize) -> Option<Vec<NodeId>> {
        if limit == 0 {
            return None;
        }

        let inner = self.inner.read();
        let known = inner.known_peers.get(id)?;

        let mut result = Vec::with_capacity(limit);
        for idx in BitSetAnd(&inner.local, BitSetNot(known)).iter() {
            if result.len() >= limit {
                break;
            }
            if let Some(peer) = inner.indices_to_peers.get(&idx) {
                result.push(*peer);
            }
        }
        Some(result)
    }
}
