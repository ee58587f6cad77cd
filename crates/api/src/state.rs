// Path: crates/api/src/state.rs
//! Read and write access to platform-chain state.
//!
//! [`ChainState`] is the read surface shared by committed state and staged
//! diffs; reads against a diff fall through to its parent on miss.
//! [`ChainDiff`] adds the buffered mutations the executor applies. A diff is
//! committed or discarded atomically by its owner; the traits never expose a
//! partial commit.

use trellis_types::config::RewardConfig;
use trellis_types::error::StateError;
use trellis_types::ids::{ChainId, NodeId, SubnetId, TxId, UtxoId};
use trellis_types::staker::Staker;
use trellis_types::tx::Tx;
use trellis_types::utxo::Utxo;

/// A lazy sequence of stakers bound to the lifetime of the state it reads.
/// Dropping it releases the underlying view; there is no explicit release
/// call to forget.
pub type StakerIter<'a> = Box<dyn Iterator<Item = Staker> + 'a>;

/// Read access to platform-chain state.
pub trait ChainState {
    /// The current chain timestamp.
    fn get_timestamp(&self) -> u64;

    /// The circulating supply of the subnet's staking asset.
    fn get_current_supply(&self, subnet_id: SubnetId) -> Result<u64, StateError>;

    /// Looks up an accepted transaction by id.
    fn get_tx(&self, tx_id: TxId) -> Result<Tx, StateError>;

    /// Looks up an unconsumed UTXO.
    fn get_utxo(&self, utxo_id: &UtxoId) -> Result<Utxo, StateError>;

    /// The subnet a blockchain belongs to.
    fn get_chain_subnet(&self, chain_id: ChainId) -> Result<SubnetId, StateError>;

    /// The `TransformSubnetTx` that made a subnet permissionless, if any.
    fn get_subnet_transformation(&self, subnet_id: SubnetId) -> Result<Tx, StateError>;

    /// The current validator of `subnet_id` with the given node id.
    fn get_current_validator(
        &self,
        subnet_id: SubnetId,
        node_id: NodeId,
    ) -> Result<Staker, StateError>;

    /// The pending validator of `subnet_id` with the given node id.
    fn get_pending_validator(
        &self,
        subnet_id: SubnetId,
        node_id: NodeId,
    ) -> Result<Staker, StateError>;

    /// All current stakers, in staker order (next transition time, priority,
    /// tx id).
    fn get_current_staker_iterator(&self) -> StakerIter<'_>;

    /// All pending stakers, in staker order.
    fn get_pending_staker_iterator(&self) -> StakerIter<'_>;

    /// Current delegators of one validator, in staker order.
    fn get_current_delegator_iterator(
        &self,
        subnet_id: SubnetId,
        node_id: NodeId,
    ) -> StakerIter<'_>;

    /// Pending delegators of one validator, in staker order.
    fn get_pending_delegator_iterator(
        &self,
        subnet_id: SubnetId,
        node_id: NodeId,
    ) -> StakerIter<'_>;

    /// The reward curve for a subnet.
    fn get_reward_config(&self, subnet_id: SubnetId) -> Result<RewardConfig, StateError>;
}

/// Buffered write access on top of [`ChainState`]. All writes land in the
/// diff; nothing reaches the parent until the diff is applied.
pub trait ChainDiff: ChainState {
    /// Moves the chain clock.
    fn set_timestamp(&mut self, timestamp: u64);

    /// Sets the circulating supply of a subnet's staking asset.
    fn set_current_supply(&mut self, subnet_id: SubnetId, supply: u64);

    /// Materializes a new UTXO.
    fn add_utxo(&mut self, utxo: Utxo);

    /// Consumes a UTXO.
    fn delete_utxo(&mut self, utxo_id: &UtxoId);

    /// Records an accepted `CreateSubnetTx`.
    fn add_subnet(&mut self, tx: &Tx);

    /// Records an accepted `CreateChainTx`.
    fn add_chain(&mut self, tx: &Tx);

    /// Records an accepted `TransformSubnetTx`.
    fn add_subnet_transformation(&mut self, tx: &Tx);

    /// Inserts a current validator.
    fn put_current_validator(&mut self, staker: Staker);

    /// Inserts a current delegator.
    fn put_current_delegator(&mut self, staker: Staker);

    /// Inserts a pending validator.
    fn put_pending_validator(&mut self, staker: Staker);

    /// Inserts a pending delegator.
    fn put_pending_delegator(&mut self, staker: Staker);

    /// Removes a current validator.
    fn delete_current_validator(&mut self, staker: &Staker);

    /// Removes a pending validator.
    fn delete_pending_validator(&mut self, staker: &Staker);

    /// Removes a current delegator.
    fn delete_current_delegator(&mut self, staker: &Staker);

    /// Removes a pending delegator.
    fn delete_pending_delegator(&mut self, staker: &Staker);

    /// Replaces a current validator record in place (same tx id).
    fn update_current_validator(&mut self, staker: Staker) -> Result<(), StateError>;

    /// Replaces a current delegator record in place (same tx id).
    fn update_current_delegator(&mut self, staker: Staker) -> Result<(), StateError>;
}
