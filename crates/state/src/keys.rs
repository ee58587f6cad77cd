// Path: crates/state/src/keys.rs
//! The persisted key-value layout of platform-chain state.
//!
//! Durable deployments partition one key-value store into the namespaces
//! below. The builders here are the single source of truth for key bytes;
//! values are canonical SCALE (see `trellis_types::codec`). Weight diffs are
//! stored per (subnet, height, node) and public-key diffs per (height,
//! node), which is exactly the shape the validator manager replays.

use trellis_types::ids::{NodeId, SubnetId, UtxoKey};

/// Namespace of unspent outputs, keyed by UTXO key.
pub const UTXOS_PREFIX: &[u8] = b"utxos/";
/// Namespace of current validators, per subnet.
pub const CURRENT_VALIDATORS_PREFIX: &[u8] = b"current_validators/";
/// Namespace of pending validators, per subnet.
pub const PENDING_VALIDATORS_PREFIX: &[u8] = b"pending_validators/";
/// Namespace of current delegators, per subnet and validator.
pub const CURRENT_DELEGATORS_PREFIX: &[u8] = b"current_delegators/";
/// Namespace of blockchains.
pub const CHAINS_PREFIX: &[u8] = b"chains/";
/// Namespace of subnets.
pub const SUBNETS_PREFIX: &[u8] = b"subnets/";
/// Namespace of subnet transformations.
pub const SUBNET_TRANSFORMATIONS_PREFIX: &[u8] = b"subnet_transformations/";
/// Namespace of per-subnet circulating supply.
pub const CURRENT_SUPPLY_PREFIX: &[u8] = b"current_supply/";
/// Namespace of validator weight diffs.
pub const WEIGHT_DIFFS_PREFIX: &[u8] = b"weight_diffs/";
/// Namespace of validator public-key diffs.
pub const PUBKEY_DIFFS_PREFIX: &[u8] = b"pubkey_diffs/";

fn concat(parts: &[&[u8]]) -> Vec<u8> {
    let len = parts.iter().map(|p| p.len()).sum();
    let mut key = Vec::with_capacity(len);
    for part in parts {
        key.extend_from_slice(part);
    }
    key
}

/// `utxos/<key>`
pub fn utxo_key(utxo: &UtxoKey) -> Vec<u8> {
    concat(&[UTXOS_PREFIX, utxo.as_ref()])
}

/// `current_validators/<subnet>/<node>`
pub fn current_validator_key(subnet_id: &SubnetId, node_id: &NodeId) -> Vec<u8> {
    concat(&[
        CURRENT_VALIDATORS_PREFIX,
        subnet_id.as_ref(),
        b"/",
        node_id.as_ref(),
    ])
}

/// `pending_validators/<subnet>/<node>`
pub fn pending_validator_key(subnet_id: &SubnetId, node_id: &NodeId) -> Vec<u8> {
    concat(&[
        PENDING_VALIDATORS_PREFIX,
        subnet_id.as_ref(),
        b"/",
        node_id.as_ref(),
    ])
}

/// `current_delegators/<subnet>/<validator-node>/<delegator-tx>`
pub fn current_delegator_key(
    subnet_id: &SubnetId,
    node_id: &NodeId,
    delegator_tx: &[u8; 32],
) -> Vec<u8> {
    concat(&[
        CURRENT_DELEGATORS_PREFIX,
        subnet_id.as_ref(),
        b"/",
        node_id.as_ref(),
        b"/",
        delegator_tx,
    ])
}

/// `chains/<chain>`
pub fn chain_key(chain: &[u8; 32]) -> Vec<u8> {
    concat(&[CHAINS_PREFIX, chain])
}

/// `subnets/<subnet>`
pub fn subnet_key(subnet_id: &SubnetId) -> Vec<u8> {
    concat(&[SUBNETS_PREFIX, subnet_id.as_ref()])
}

/// `subnet_transformations/<subnet>`
pub fn subnet_transformation_key(subnet_id: &SubnetId) -> Vec<u8> {
    concat(&[SUBNET_TRANSFORMATIONS_PREFIX, subnet_id.as_ref()])
}

/// `current_supply/<subnet>`
pub fn current_supply_key(subnet_id: &SubnetId) -> Vec<u8> {
    concat(&[CURRENT_SUPPLY_PREFIX, subnet_id.as_ref()])
}

/// `weight_diffs/<subnet>/<height-be>/<node>`
pub fn weight_diff_key(subnet_id: &SubnetId, height: u64, node_id: &NodeId) -> Vec<u8> {
    concat(&[
        WEIGHT_DIFFS_PREFIX,
        subnet_id.as_ref(),
        b"/",
        &height.to_be_bytes(),
        b"/",
        node_id.as_ref(),
    ])
}

/// `pubkey_diffs/<height-be>/<node>`
pub fn public_key_diff_key(height: u64, node_id: &NodeId) -> Vec<u8> {
    concat(&[
        PUBKEY_DIFFS_PREFIX,
        &height.to_be_bytes(),
        b"/",
        node_id.as_ref(),
    ])
}
