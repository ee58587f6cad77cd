// Path: crates/validators/src/tests.rs
//! Manager tests: reconstruction, caching, window-driven minimum height.

use crate::window::ManualClock;
use crate::{Manager, ValidatorState};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use trellis_api::CancelToken;
use trellis_state::MemoryState;
use trellis_types::config::PlatformConfig;
use trellis_types::error::ManagerError;
use trellis_types::ids::{BlockId, BlsPublicKey, ChainId, NodeId, SubnetId, TxId};
use trellis_types::staker::{Staker, StakerPriority};
use trellis_types::tx::{BaseTxFields, CreateChainTx, SubnetAuth, Tx, UnsignedTx};
use trellis_types::validator::{
    ValidatorPublicKeyDiff, ValidatorSet, ValidatorSnapshot, ValidatorWeightDiff,
};

fn node(b: u8) -> NodeId {
    NodeId([b; 20])
}

fn key(b: u8) -> BlsPublicKey {
    BlsPublicKey([b; 48])
}

fn snapshot(node_byte: u8, weight: u64, pk: Option<BlsPublicKey>) -> ValidatorSnapshot {
    ValidatorSnapshot {
        node_id: node(node_byte),
        weight,
        public_key: pk,
    }
}

fn set_of(entries: &[(u8, u64, Option<BlsPublicKey>)]) -> ValidatorSet {
    entries
        .iter()
        .map(|&(n, w, pk)| (node(n), snapshot(n, w, pk)))
        .collect()
}

/// Five blocks of primary-network history:
/// h1: node 1 joins with 100 and registers key 1.
/// h2: node 2 joins with 50 (key 2 registered).
/// h3: node 1 grows to 125.
/// h4: node 2 leaves (key 2 recorded as removed).
/// h5: quiet.
fn history() -> MemoryState {
    let mut state = MemoryState::new();
    for h in 1..=5u64 {
        state.accept_block(BlockId([h as u8; 32]), h);
    }

    state.record_weight_diff(
        SubnetId::PRIMARY,
        1,
        node(1),
        ValidatorWeightDiff {
            decrease: false,
            amount: 100,
        },
    );
    state.record_public_key_diff(1, node(1), ValidatorPublicKeyDiff { previous: None });
    state.record_weight_diff(
        SubnetId::PRIMARY,
        2,
        node(2),
        ValidatorWeightDiff {
            decrease: false,
            amount: 50,
        },
    );
    state.record_public_key_diff(2, node(2), ValidatorPublicKeyDiff { previous: None });
    state.record_weight_diff(
        SubnetId::PRIMARY,
        3,
        node(1),
        ValidatorWeightDiff {
            decrease: false,
            amount: 25,
        },
    );
    state.record_weight_diff(
        SubnetId::PRIMARY,
        4,
        node(2),
        ValidatorWeightDiff {
            decrease: true,
            amount: 50,
        },
    );
    state.record_public_key_diff(
        4,
        node(2),
        ValidatorPublicKeyDiff {
            previous: Some(key(2)),
        },
    );
    state
}

fn manager_over(state: MemoryState, config: PlatformConfig) -> Manager<MemoryState> {
    let manager = Manager::new(
        config,
        Arc::new(RwLock::new(())),
        Arc::new(state),
        Arc::new(ManualClock::default()),
    );
    manager.set_current_validators(SubnetId::PRIMARY, set_of(&[(1, 125, Some(key(1)))]));
    manager
}

#[test]
fn reconstruction_matches_every_height() {
    let manager = manager_over(history(), PlatformConfig::default());
    let cancel = CancelToken::new();

    let expected: [(u64, ValidatorSet); 6] = [
        (0, ValidatorSet::new()),
        (1, set_of(&[(1, 100, Some(key(1)))])),
        (2, set_of(&[(1, 100, Some(key(1))), (2, 50, Some(key(2)))])),
        (3, set_of(&[(1, 125, Some(key(1))), (2, 50, Some(key(2)))])),
        (4, set_of(&[(1, 125, Some(key(1)))])),
        (5, set_of(&[(1, 125, Some(key(1)))])),
    ];
    for (height, want) in expected {
        let got = manager
            .get_validator_set(height, SubnetId::PRIMARY, &cancel)
            .unwrap();
        assert_eq!(got, want, "height {height}");
    }
}

#[test]
fn heights_beyond_the_tip_are_not_found() {
    let manager = manager_over(history(), PlatformConfig::default());
    let cancel = CancelToken::new();
    assert!(matches!(
        manager.get_validator_set(6, SubnetId::PRIMARY, &cancel),
        Err(ManagerError::NotFound)
    ));
}

#[test]
fn reconstruction_is_cancellable() {
    let manager = manager_over(history(), PlatformConfig::default());
    let cancel = CancelToken::new();
    cancel.cancel();
    assert!(matches!(
        manager.get_validator_set(0, SubnetId::PRIMARY, &cancel),
        Err(ManagerError::Cancelled)
    ));
}

#[test]
fn subnet_snapshots_borrow_primary_keys() {
    let subnet = SubnetId([9; 32]);
    let mut state = history();
    state.current_stakers_mut().insert(Staker {
        tx_id: TxId([0x51; 32]),
        node_id: node(1),
        subnet_id: subnet,
        weight: 7,
        start_time: 0,
        end_time: 1_000,
        earliest_stop_time: 1_000,
        potential_reward: 0,
        priority: StakerPriority::CurrentSubnetPermissionedValidator,
    });

    let manager = manager_over(state, PlatformConfig::default());
    let cancel = CancelToken::new();
    let got = manager.get_validator_set(5, subnet, &cancel).unwrap();
    assert_eq!(got.get(&node(1)).unwrap().weight, 7);
    assert_eq!(got.get(&node(1)).unwrap().public_key, Some(key(1)));
}

#[test]
fn subnet_validator_missing_from_primary_is_an_invariant_violation() {
    let subnet = SubnetId([9; 32]);
    let mut state = history();
    state.current_stakers_mut().insert(Staker {
        tx_id: TxId([0x52; 32]),
        node_id: node(3),
        subnet_id: subnet,
        weight: 7,
        start_time: 0,
        end_time: 1_000,
        earliest_stop_time: 1_000,
        potential_reward: 0,
        priority: StakerPriority::CurrentSubnetPermissionedValidator,
    });

    let manager = manager_over(state, PlatformConfig::default());
    let cancel = CancelToken::new();
    assert!(matches!(
        manager.get_validator_set(5, subnet, &cancel),
        Err(ManagerError::MissingValidator { .. })
    ));
}

#[test]
fn tracked_subnet_results_are_served_from_the_cache() {
    let subnet = SubnetId([9; 32]);
    let mut config = PlatformConfig::default();
    config.tracked_subnets.insert(subnet);

    let manager = manager_over(history(), config);
    manager.set_current_validators(subnet, set_of(&[(1, 10, None)]));
    let cancel = CancelToken::new();

    let first = manager.get_validator_set(5, subnet, &cancel).unwrap();
    assert_eq!(first.get(&node(1)).unwrap().weight, 10);

    // The live set moves on; the cached answer for height 5 does not.
    manager.set_current_validators(subnet, set_of(&[(1, 99, None)]));
    let second = manager.get_validator_set(5, subnet, &cancel).unwrap();
    assert_eq!(second, first);
}

#[test]
fn untracked_subnets_are_recomputed_every_time() {
    let subnet = SubnetId([9; 32]);
    let manager = manager_over(history(), PlatformConfig::default());
    manager.set_current_validators(subnet, set_of(&[(1, 10, Some(key(1)))]));
    let cancel = CancelToken::new();

    let first = manager.get_validator_set(5, subnet, &cancel).unwrap();
    assert_eq!(first.get(&node(1)).unwrap().weight, 10);

    manager.set_current_validators(subnet, set_of(&[(1, 99, Some(key(1)))]));
    let second = manager.get_validator_set(5, subnet, &cancel).unwrap();
    assert_eq!(second.get(&node(1)).unwrap().weight, 99);
}

#[test]
fn minimum_height_follows_the_window() {
    let manager = manager_over(history(), PlatformConfig::default());

    // Empty window: fall back to the last accepted height.
    assert_eq!(manager.get_minimum_height().unwrap(), 5);

    manager.on_accepted_block_id(BlockId([3; 32]));
    manager.on_accepted_block_id(BlockId([4; 32]));
    manager.on_accepted_block_id(BlockId([5; 32]));

    // The block before the oldest windowed entry.
    assert_eq!(manager.get_minimum_height().unwrap(), 2);
}

#[test]
fn use_current_height_overrides_the_window() {
    let mut config = PlatformConfig::default();
    config.use_current_height = true;
    let manager = manager_over(history(), config);
    manager.on_accepted_block_id(BlockId([3; 32]));
    assert_eq!(manager.get_minimum_height().unwrap(), 5);
}

#[test]
fn chains_resolve_to_their_subnet() {
    let subnet = SubnetId([9; 32]);
    let mut state = history();
    let chain_tx = Tx {
        version: 0,
        unsigned: UnsignedTx::CreateChain(CreateChainTx {
            base: BaseTxFields::default(),
            subnet_id: subnet,
            chain_name: "wavelet".to_string(),
            vm_id: Default::default(),
            genesis_data: vec![],
            subnet_auth: SubnetAuth::default(),
        }),
        credentials: vec![],
    };
    let chain_id = ChainId(chain_tx.id().0);
    state.add_chain(&chain_tx);

    let manager = manager_over(state, PlatformConfig::default());
    assert_eq!(manager.get_subnet_id(ChainId::PLATFORM).unwrap(), SubnetId::PRIMARY);
    assert_eq!(manager.get_subnet_id(chain_id).unwrap(), subnet);
}
