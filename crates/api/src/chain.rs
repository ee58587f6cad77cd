// Path: crates/api/src/chain.rs
//! The on-accept hook for blockchain creation.

use trellis_types::ids::TxId;
use trellis_types::tx::CreateChainTx;

/// Creates blockchain instances when their `CreateChainTx` is accepted.
///
/// The executor registers a callback invoking this when it executes a
/// `CreateChainTx`; the platform runs the callback only if and when the
/// enclosing block is accepted. Implementations MUST be idempotent: the
/// accept path may deliver the same creation more than once across restarts.
pub trait ChainRegistrar: Send + Sync {
    /// Instantiates the blockchain described by `tx`, id'd by its
    /// transaction id.
    fn create_chain(&self, tx_id: TxId, tx: &CreateChainTx);
}
