// Path: crates/api/src/shared_memory.rs
//! The shared atomic-memory region between chains of one subnet.
//!
//! Imports read the region during verification; all mutations are batched
//! into [`AtomicRequests`] and applied by consensus together with block
//! acceptance, which is what gives cross-chain transfers their exactly-once
//! semantics.

use std::collections::HashMap;
use trellis_types::error::SharedMemoryError;
use trellis_types::ids::{Address, ChainId, UtxoKey};

/// One entry to be placed into a remote chain's shared memory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AtomicElement {
    /// The UTXO key the entry is stored under.
    pub key: UtxoKey,
    /// The canonical bytes of the UTXO.
    pub value: Vec<u8>,
    /// The owner addresses, for indexed lookup on the remote side.
    pub traits: Vec<Address>,
}

/// The batched shared-memory operations one transaction produces against one
/// chain.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AtomicRequests {
    /// Entries to create (exports).
    pub put_requests: Vec<AtomicElement>,
    /// Keys to remove (imports).
    pub remove_requests: Vec<UtxoKey>,
}

/// The shared-memory region, keyed by peer chain.
pub trait SharedMemory {
    /// Fetches the values stored under `keys` in `chain_id`'s region.
    /// Missing keys are an error: an import referencing an absent UTXO is
    /// invalid.
    fn get(&self, chain_id: ChainId, keys: &[UtxoKey]) -> Result<Vec<Vec<u8>>, SharedMemoryError>;

    /// Applies a batch of requests. Invoked by consensus on block
    /// acceptance, atomically with the state diff commit.
    fn apply(
        &self,
        requests: &HashMap<ChainId, AtomicRequests>,
    ) -> Result<(), SharedMemoryError>;
}
