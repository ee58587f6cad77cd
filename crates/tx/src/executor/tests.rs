// Path: crates/tx/src/executor/tests.rs
//! Scenario tests for the standard and proposal executors.

use crate::executor::{ProposalTxExecutor, StandardTxExecutor};
use crate::fee::BlockFeeState;
use crate::test_fixtures::*;
use trellis_api::{ChainState, SharedMemory};
use trellis_state::Diff;
use trellis_types::config::{DynamicFeesConfig, ForkSchedule};
use trellis_types::error::{ExecutorError, StakerValidationError};
use trellis_types::ids::{NodeId, SubnetId, TxId, UtxoId, VmId};
use trellis_types::staker::{Staker, StakerPriority, MAX_TIME};
use trellis_types::tx::{
    AddDelegatorTx, AddSubnetValidatorTx, AddValidatorTx, AdvanceTimeTx, BaseTxFields,
    CreateChainTx, CreateSubnetTx, ImportTx, RewardValidatorTx, StopStakerTx, SubnetAuth, Tx,
    UnsignedTx, Validator,
};
use trellis_types::utxo::{TransferInput, TransferOutput, Utxo};

fn continuous_forks() -> ForkSchedule {
    ForkSchedule {
        continuous_staking_time: Some(0),
        ..ForkSchedule::default()
    }
}

fn base_fields(inputs: Vec<TransferInput>, outputs: Vec<TransferOutput>) -> BaseTxFields {
    BaseTxFields {
        network_id: 12345,
        chain_id: Default::default(),
        inputs,
        outputs,
        memo: vec![],
    }
}

fn execute<'e>(
    env: &'e TestEnv,
    tx: &Tx,
) -> Result<(super::TxExecutionOutputs, Diff<'e>), ExecutorError> {
    let mut fees = BlockFeeState::new(&DynamicFeesConfig::PRE_E_UPGRADE);
    let mut diff = Diff::new(&env.state);
    let outputs = StandardTxExecutor::new(&env.backend, &mut fees, &mut diff, tx).execute()?;
    Ok((outputs, diff))
}

fn current_validator(tx_id: TxId, node: u8, start: u64, end: u64, weight: u64) -> Staker {
    Staker {
        tx_id,
        node_id: NodeId([node; 20]),
        subnet_id: SubnetId::PRIMARY,
        weight,
        start_time: start,
        end_time: end,
        earliest_stop_time: end,
        potential_reward: 0,
        priority: StakerPriority::CurrentPrimaryNetworkValidator,
    }
}

fn add_validator_tx(env: &mut TestEnv, seed: u8, node: u8, start: u64, end: u64, weight: u64) -> Tx {
    let fee = env.backend.config.static_fees.add_primary_network_validator_fee;
    let funding = fund(&mut env.state, seed, weight + fee);
    signed(UnsignedTx::AddValidator(AddValidatorTx {
        base: base_fields(vec![input_spending(&funding)], vec![]),
        validator: Validator {
            node_id: NodeId([node; 20]),
            start_time: start,
            end_time: end,
            weight,
        },
        stake_outputs: vec![stake_output(weight)],
        rewards_owner: owner_of(1),
        delegation_shares: 0,
    }))
}

#[test]
fn add_validator_pre_fork_inserts_a_pending_staker() {
    let mut env = test_env(ForkSchedule::none_active());
    let start = GENESIS_TIME + 100;
    let end = start + 90 * DAY;
    let tx = add_validator_tx(&mut env, 1, 7, start, end, 1_000);

    let (_, diff) = execute(&env, &tx).unwrap();

    let staker = diff
        .get_pending_validator(SubnetId::PRIMARY, NodeId([7; 20]))
        .unwrap();
    assert_eq!(staker.start_time, start);
    assert_eq!(staker.end_time, end);
    assert_eq!(staker.potential_reward, 0);
    assert_eq!(
        staker.priority,
        StakerPriority::PendingPrimaryNetworkValidator
    );
    // The funding UTXO was consumed.
    assert!(diff
        .get_utxo(&UtxoId {
            tx_id: TxId([1; 32]),
            output_index: 0
        })
        .is_err());
}

#[test]
fn add_validator_post_fork_is_immediately_current_and_mints_its_reward() {
    let mut env = test_env(continuous_forks());
    let tx = add_validator_tx(&mut env, 1, 7, 0, 90 * DAY, 1_000);

    let supply_before = 360_000_000;
    let (_, diff) = execute(&env, &tx).unwrap();

    let staker = diff
        .get_current_validator(SubnetId::PRIMARY, NodeId([7; 20]))
        .unwrap();
    assert_eq!(staker.start_time, GENESIS_TIME);
    assert_eq!(staker.end_time, MAX_TIME);
    assert_eq!(staker.earliest_stop_time, GENESIS_TIME + 90 * DAY);
    assert!(staker.potential_reward > 0);
    assert_eq!(
        diff.get_current_supply(SubnetId::PRIMARY).unwrap(),
        supply_before + staker.potential_reward
    );
}

#[test]
fn add_validator_rejects_start_at_or_before_chain_time() {
    let mut env = test_env(ForkSchedule::none_active());
    let tx = add_validator_tx(&mut env, 1, 7, GENESIS_TIME, GENESIS_TIME + 90 * DAY, 1_000);
    let err = execute(&env, &tx).unwrap_err();
    assert!(matches!(
        err,
        ExecutorError::Validation(StakerValidationError::TimestampNotBeforeStartTime { .. })
    ));
}

#[test]
fn add_validator_rejects_far_future_start() {
    let mut env = test_env(ForkSchedule::none_active());
    let start = GENESIS_TIME + 25 * 60 * 60; // one hour beyond the bound
    let tx = add_validator_tx(&mut env, 1, 7, start, start + 90 * DAY, 1_000);
    let err = execute(&env, &tx).unwrap_err();
    assert!(matches!(
        err,
        ExecutorError::Validation(StakerValidationError::FutureStakeTime)
    ));
}

#[test]
fn add_validator_rejects_duplicates() {
    let mut env = test_env(ForkSchedule::none_active());
    env.state.current_stakers_mut().insert(current_validator(
        TxId([0x70; 32]),
        7,
        GENESIS_TIME,
        GENESIS_TIME + 100 * DAY,
        1_000,
    ));
    let start = GENESIS_TIME + 100;
    let tx = add_validator_tx(&mut env, 1, 7, start, start + 90 * DAY, 1_000);
    let err = execute(&env, &tx).unwrap_err();
    assert!(matches!(
        err,
        ExecutorError::Validation(StakerValidationError::AlreadyValidator { .. })
    ));
}

fn add_delegator_tx(env: &mut TestEnv, seed: u8, node: u8, start: u64, end: u64, weight: u64) -> Tx {
    let fee = env.backend.config.static_fees.add_primary_network_delegator_fee;
    let funding = fund(&mut env.state, seed, weight + fee);
    signed(UnsignedTx::AddDelegator(AddDelegatorTx {
        base: base_fields(vec![input_spending(&funding)], vec![]),
        validator: Validator {
            node_id: NodeId([node; 20]),
            start_time: start,
            end_time: end,
            weight,
        },
        stake_outputs: vec![stake_output(weight)],
        rewards_owner: owner_of(2),
    }))
}

// Delegation cap: validator weight 1000 allows 5000 in total under the
// default weight factor; an existing 3000 delegator leaves room for exactly
// 1000 more.
#[test]
fn delegation_cap_admits_to_the_boundary_and_no_further() {
    let validator_interval_end = GENESIS_TIME + 100 * DAY;
    let setup = |env: &mut TestEnv| {
        env.state.current_stakers_mut().insert(current_validator(
            TxId([0x71; 32]),
            7,
            GENESIS_TIME,
            validator_interval_end,
            1_000,
        ));
        env.state.current_stakers_mut().insert(Staker {
            tx_id: TxId([0x72; 32]),
            node_id: NodeId([7; 20]),
            subnet_id: SubnetId::PRIMARY,
            weight: 3_000,
            start_time: GENESIS_TIME,
            end_time: validator_interval_end,
            earliest_stop_time: validator_interval_end,
            potential_reward: 0,
            priority: StakerPriority::CurrentPrimaryNetworkDelegator,
        });
    };

    let start = GENESIS_TIME + 100;
    let end = GENESIS_TIME + 10 * DAY;

    let mut over = test_env(ForkSchedule::none_active());
    setup(&mut over);
    let tx = add_delegator_tx(&mut over, 1, 7, start, end, 1_001);
    assert!(matches!(
        execute(&over, &tx).unwrap_err(),
        ExecutorError::Validation(StakerValidationError::OverDelegated)
    ));

    let mut fits = test_env(ForkSchedule::none_active());
    setup(&mut fits);
    let tx = add_delegator_tx(&mut fits, 1, 7, start, end, 1_000);
    let (_, diff) = execute(&fits, &tx).unwrap();
    assert_eq!(
        diff.get_pending_delegator_iterator(SubnetId::PRIMARY, NodeId([7; 20]))
            .count(),
        1
    );
}

fn create_subnet(env: &mut TestEnv) -> SubnetId {
    let tx = signed(UnsignedTx::CreateSubnet(CreateSubnetTx {
        base: base_fields(vec![], vec![]),
        owner: owner_of(9),
    }));
    let subnet_id = SubnetId(tx.id().0);
    env.state.add_subnet(&tx);
    subnet_id
}

fn add_subnet_validator_tx(
    env: &mut TestEnv,
    seed: u8,
    subnet_id: SubnetId,
    node: u8,
    start: u64,
    end: u64,
) -> Tx {
    let fee = env.backend.config.static_fees.add_subnet_validator_fee;
    let funding = fund(&mut env.state, seed, fee);
    signed(UnsignedTx::AddSubnetValidator(AddSubnetValidatorTx {
        base: base_fields(vec![input_spending(&funding)], vec![]),
        validator: Validator {
            node_id: NodeId([node; 20]),
            start_time: start,
            end_time: end,
            weight: 1,
        },
        subnet_id,
        subnet_auth: SubnetAuth::default(),
    }))
}

// Subnet staking periods must nest inside the node's primary-network
// period.
#[test]
fn subnet_staking_period_must_nest_in_the_primary_period() {
    let primary_start = GENESIS_TIME + 100;
    let primary_end = primary_start + 30 * DAY;

    let mut env = test_env(ForkSchedule::none_active());
    let subnet_id = create_subnet(&mut env);
    env.state.current_stakers_mut().insert(current_validator(
        TxId([0x71; 32]),
        7,
        primary_start,
        primary_end,
        1_000,
    ));

    // Starts one second before the primary period.
    let tx = add_subnet_validator_tx(
        &mut env,
        1,
        subnet_id,
        7,
        primary_start - 1,
        primary_start + 29 * DAY,
    );
    assert!(matches!(
        execute(&env, &tx).unwrap_err(),
        ExecutorError::Validation(StakerValidationError::ValidatorSubsetViolation)
    ));

    // Exactly aligned with the primary start is contained.
    let tx = add_subnet_validator_tx(
        &mut env,
        2,
        subnet_id,
        7,
        primary_start,
        primary_start + 29 * DAY,
    );
    let (_, diff) = execute(&env, &tx).unwrap();
    let staker = diff.get_pending_validator(subnet_id, NodeId([7; 20])).unwrap();
    assert_eq!(
        staker.priority,
        StakerPriority::PendingSubnetPermissionedValidator
    );
}

// Cross-chain import: the flow check spans shared memory, and acceptance
// removes exactly the imported keys.
#[test]
fn import_consumes_shared_memory_utxos_atomically() {
    let mut env = test_env(ForkSchedule::none_active());

    let imported = [
        Utxo {
            utxo_id: UtxoId {
                tx_id: TxId([3; 32]),
                output_index: 0,
            },
            output: stake_output(60),
        },
        Utxo {
            utxo_id: UtxoId {
                tx_id: TxId([4; 32]),
                output_index: 0,
            },
            output: stake_output(40),
        },
    ];
    for utxo in &imported {
        env.shared_memory.put_utxo(PEER_CHAIN, utxo);
    }

    let fee = env.backend.config.static_fees.tx_fee;
    let tx = signed(UnsignedTx::Import(ImportTx {
        base: base_fields(vec![], vec![stake_output(100 - fee)]),
        source_chain: PEER_CHAIN,
        imported_inputs: imported.iter().map(input_spending).collect(),
    }));

    let (outputs, diff) = execute(&env, &tx).unwrap();

    let keys: Vec<_> = imported.iter().map(|u| u.key()).collect();
    assert_eq!(
        outputs.inputs,
        keys.iter().copied().collect::<std::collections::HashSet<_>>()
    );
    assert_eq!(
        outputs.atomic_requests[&PEER_CHAIN].remove_requests,
        keys
    );
    // The imported value landed as a local UTXO.
    assert_eq!(
        diff.get_utxo(&UtxoId {
            tx_id: tx.id(),
            output_index: 0
        })
        .unwrap()
        .output
        .amount,
        100 - fee
    );

    // Applying the requests removes exactly the imported entries.
    env.shared_memory.apply(&outputs.atomic_requests).unwrap();
    for key in &keys {
        assert!(!env.shared_memory.contains(PEER_CHAIN, key));
    }
}

#[test]
fn import_rejects_chains_outside_the_subnet() {
    let mut env = test_env(ForkSchedule::none_active());
    let foreign_chain = trellis_types::ids::ChainId([3; 32]);
    env.state
        .add_chain_binding(foreign_chain, SubnetId([9; 32]));

    let tx = signed(UnsignedTx::Import(ImportTx {
        base: base_fields(vec![], vec![]),
        source_chain: foreign_chain,
        imported_inputs: vec![],
    }));
    assert!(matches!(
        execute(&env, &tx).unwrap_err(),
        ExecutorError::ChainNotInSubnet { .. }
    ));
}

// Stopping a primary-network validator truncates its delegators and
// same-node subnet validators along with it.
#[test]
fn stop_staker_cascades_over_the_whole_node() {
    let mut env = test_env(continuous_forks());

    let v_tx = add_validator_tx(&mut env, 1, 7, 0, 90 * DAY, 1_000);
    env.state.add_tx(v_tx.clone());
    let v_id = v_tx.id();

    let stop_time = GENESIS_TIME + 500;
    env.state.current_stakers_mut().insert(Staker {
        earliest_stop_time: stop_time,
        ..current_validator(v_id, 7, GENESIS_TIME - 1_000, MAX_TIME, 1_000)
    });
    for (seed, weight) in [(0x72u8, 100u64), (0x73, 200)] {
        env.state.current_stakers_mut().insert(Staker {
            tx_id: TxId([seed; 32]),
            node_id: NodeId([7; 20]),
            subnet_id: SubnetId::PRIMARY,
            weight,
            start_time: GENESIS_TIME - 500,
            end_time: MAX_TIME,
            earliest_stop_time: GENESIS_TIME + 200,
            potential_reward: 0,
            priority: StakerPriority::CurrentPrimaryNetworkDelegator,
        });
    }
    env.state.current_stakers_mut().insert(Staker {
        tx_id: TxId([0x74; 32]),
        node_id: NodeId([7; 20]),
        subnet_id: SubnetId([9; 32]),
        weight: 1,
        start_time: GENESIS_TIME - 500,
        end_time: GENESIS_TIME + 5_000,
        earliest_stop_time: GENESIS_TIME + 5_000,
        potential_reward: 0,
        priority: StakerPriority::CurrentSubnetPermissionedValidator,
    });
    // A staker on another node stays untouched.
    env.state.current_stakers_mut().insert(current_validator(
        TxId([0x75; 32]),
        8,
        GENESIS_TIME - 500,
        GENESIS_TIME + 9_000,
        500,
    ));

    let fee = env.backend.config.static_fees.tx_fee;
    let funding = fund(&mut env.state, 0x20, fee);
    let tx = signed(UnsignedTx::StopStaker(StopStakerTx {
        base: base_fields(vec![input_spending(&funding)], vec![]),
        tx_id: v_id,
        staker_auth: SubnetAuth::default(),
    }));

    let (_, diff) = execute(&env, &tx).unwrap();

    let stopped: Vec<Staker> = diff
        .get_current_staker_iterator()
        .filter(|s| s.node_id == NodeId([7; 20]))
        .collect();
    assert_eq!(stopped.len(), 4);
    for staker in &stopped {
        assert_eq!(staker.earliest_stop_time, stop_time);
        assert!(staker.end_time <= stop_time);
    }
    let untouched = diff
        .get_current_validator(SubnetId::PRIMARY, NodeId([8; 20]))
        .unwrap();
    assert_eq!(untouched.end_time, GENESIS_TIME + 9_000);
}

#[test]
fn stop_staker_requires_the_continuous_staking_fork() {
    let mut env = test_env(ForkSchedule::none_active());
    let tx = signed(UnsignedTx::StopStaker(StopStakerTx {
        base: base_fields(vec![], vec![]),
        tx_id: TxId([1; 32]),
        staker_auth: SubnetAuth::default(),
    }));
    assert!(matches!(
        execute(&env, &tx).unwrap_err(),
        ExecutorError::Validation(StakerValidationError::WrongFork)
    ));
}

#[test]
fn create_chain_defers_instantiation_to_acceptance() {
    let mut env = test_env(ForkSchedule::none_active());
    let subnet_id = create_subnet(&mut env);

    let fee = env.backend.config.static_fees.create_asset_tx_fee;
    let funding = fund(&mut env.state, 1, fee);
    let tx = signed(UnsignedTx::CreateChain(CreateChainTx {
        base: base_fields(vec![input_spending(&funding)], vec![]),
        subnet_id,
        chain_name: "wavelet".to_string(),
        vm_id: VmId([5; 32]),
        genesis_data: vec![1, 2, 3],
        subnet_auth: SubnetAuth::default(),
    }));
    let tx_id = tx.id();

    let (outputs, diff) = execute(&env, &tx).unwrap();
    assert_eq!(
        diff.get_chain_subnet(trellis_types::ids::ChainId(tx_id.0)).unwrap(),
        subnet_id
    );

    // Nothing is instantiated until the block is accepted.
    assert!(env.registrar.created.lock().unwrap().is_empty());
    (outputs.on_accept.unwrap())();
    assert_eq!(*env.registrar.created.lock().unwrap(), vec![tx_id]);
}

#[test]
fn proposal_forms_are_rejected_by_the_standard_executor() {
    let mut env = test_env(ForkSchedule::none_active());
    let tx = signed(UnsignedTx::AdvanceTime(AdvanceTimeTx { time: 1 }));
    assert!(matches!(
        execute(&env, &tx).unwrap_err(),
        ExecutorError::WrongTxType
    ));
}

// --- Proposal executor ---

#[test]
fn advance_time_promotes_arrived_pending_stakers() {
    let mut env = test_env(ForkSchedule::none_active());
    let start = GENESIS_TIME + 100;
    env.state.pending_stakers_mut().insert(Staker {
        tx_id: TxId([0x81; 32]),
        node_id: NodeId([7; 20]),
        subnet_id: SubnetId::PRIMARY,
        weight: 1_000,
        start_time: start,
        end_time: start + 90 * DAY,
        earliest_stop_time: start + 90 * DAY,
        potential_reward: 0,
        priority: StakerPriority::PendingPrimaryNetworkValidator,
    });

    let tx = signed(UnsignedTx::AdvanceTime(AdvanceTimeTx { time: start }));
    let mut diff = Diff::new(&env.state);
    ProposalTxExecutor::new(&env.backend, &mut diff, &tx)
        .execute()
        .unwrap();

    assert_eq!(diff.get_timestamp(), start);
    let promoted = diff
        .get_current_validator(SubnetId::PRIMARY, NodeId([7; 20]))
        .unwrap();
    assert!(promoted.potential_reward > 0);
    assert!(diff
        .get_pending_validator(SubnetId::PRIMARY, NodeId([7; 20]))
        .is_err());
    assert_eq!(
        diff.get_current_supply(SubnetId::PRIMARY).unwrap(),
        360_000_000 + promoted.potential_reward
    );
}

#[test]
fn advance_time_cannot_skip_a_staker_transition() {
    let mut env = test_env(ForkSchedule::none_active());
    let start = GENESIS_TIME + 100;
    env.state.pending_stakers_mut().insert(Staker {
        tx_id: TxId([0x81; 32]),
        node_id: NodeId([7; 20]),
        subnet_id: SubnetId::PRIMARY,
        weight: 1_000,
        start_time: start,
        end_time: start + 90 * DAY,
        earliest_stop_time: start + 90 * DAY,
        potential_reward: 0,
        priority: StakerPriority::PendingPrimaryNetworkValidator,
    });

    let tx = signed(UnsignedTx::AdvanceTime(AdvanceTimeTx { time: start + 1 }));
    let mut diff = Diff::new(&env.state);
    let err = ProposalTxExecutor::new(&env.backend, &mut diff, &tx)
        .execute()
        .unwrap_err();
    assert!(matches!(
        err,
        ExecutorError::TimestampBeyondNextChange { .. }
    ));
}

#[test]
fn advance_time_is_banned_after_durango() {
    let env = test_env(ForkSchedule {
        durango_time: Some(0),
        ..ForkSchedule::default()
    });
    let tx = signed(UnsignedTx::AdvanceTime(AdvanceTimeTx {
        time: GENESIS_TIME + 1,
    }));
    let mut diff = Diff::new(&env.state);
    let err = ProposalTxExecutor::new(&env.backend, &mut diff, &tx)
        .execute()
        .unwrap_err();
    assert!(matches!(
        err,
        ExecutorError::Validation(StakerValidationError::WrongFork)
    ));
}

#[test]
fn reward_validator_returns_stake_and_pays_the_reward() {
    let mut env = test_env(ForkSchedule::none_active());
    let v_tx = add_validator_tx(&mut env, 1, 7, 0, 90 * DAY, 1_000);
    env.state.add_tx(v_tx.clone());
    let v_id = v_tx.id();

    env.state.current_stakers_mut().insert(Staker {
        potential_reward: 500,
        ..current_validator(v_id, 7, GENESIS_TIME - 90 * DAY, GENESIS_TIME, 1_000)
    });

    let tx = signed(UnsignedTx::RewardValidator(RewardValidatorTx { tx_id: v_id }));
    let mut diff = Diff::new(&env.state);
    ProposalTxExecutor::new(&env.backend, &mut diff, &tx)
        .execute()
        .unwrap();

    assert!(diff
        .get_current_validator(SubnetId::PRIMARY, NodeId([7; 20]))
        .is_err());
    // Stake comes back as the staker tx's next output...
    let stake = diff
        .get_utxo(&UtxoId {
            tx_id: v_id,
            output_index: 0,
        })
        .unwrap();
    assert_eq!(stake.output.amount, 1_000);
    // ...followed by the reward, paid to the rewards owner.
    let reward = diff
        .get_utxo(&UtxoId {
            tx_id: v_id,
            output_index: 1,
        })
        .unwrap();
    assert_eq!(reward.output.amount, 500);
    assert_eq!(reward.output.owners, owner_of(1));
}

#[test]
fn reward_validator_only_settles_the_head_of_the_queue() {
    let mut env = test_env(ForkSchedule::none_active());
    env.state.current_stakers_mut().insert(current_validator(
        TxId([0x71; 32]),
        7,
        GENESIS_TIME - 100,
        GENESIS_TIME,
        1_000,
    ));
    env.state.current_stakers_mut().insert(current_validator(
        TxId([0x72; 32]),
        8,
        GENESIS_TIME - 100,
        GENESIS_TIME + 50,
        1_000,
    ));

    // Naming the later staker fails.
    let tx = signed(UnsignedTx::RewardValidator(RewardValidatorTx {
        tx_id: TxId([0x72; 32]),
    }));
    let mut diff = Diff::new(&env.state);
    let err = ProposalTxExecutor::new(&env.backend, &mut diff, &tx)
        .execute()
        .unwrap_err();
    assert!(matches!(err, ExecutorError::WrongRewardedStaker { .. }));
}

// --- Cross-chain export and subnet transformation ---

#[test]
fn export_stages_put_requests_for_the_destination_chain() {
    let mut env = test_env(ForkSchedule::none_active());
    let fee = env.backend.config.static_fees.tx_fee;
    let funding = fund(&mut env.state, 1, 100 + fee);

    let exported = TransferOutput {
        asset_id: TEST_ASSET,
        amount: 50,
        owners: owner_of(3),
    };
    let tx = signed(UnsignedTx::Export(trellis_types::tx::ExportTx {
        base: base_fields(vec![input_spending(&funding)], vec![stake_output(50)]),
        destination_chain: PEER_CHAIN,
        exported_outputs: vec![exported.clone()],
    }));
    let tx_id = tx.id();

    let (outputs, diff) = execute(&env, &tx).unwrap();

    // The local change output exists; the exported one does not.
    assert!(diff
        .get_utxo(&UtxoId {
            tx_id,
            output_index: 0
        })
        .is_ok());
    assert!(diff
        .get_utxo(&UtxoId {
            tx_id,
            output_index: 1
        })
        .is_err());

    let puts = &outputs.atomic_requests[&PEER_CHAIN].put_requests;
    assert_eq!(puts.len(), 1);
    let expected = Utxo {
        utxo_id: UtxoId {
            tx_id,
            output_index: 1,
        },
        output: exported,
    };
    assert_eq!(puts[0].key, expected.key());
    assert_eq!(puts[0].traits, expected.addresses().to_vec());

    // The entry decodes back to the exported UTXO on the remote side.
    env.shared_memory.apply(&outputs.atomic_requests).unwrap();
    assert!(env.shared_memory.contains(PEER_CHAIN, &expected.key()));
}

const SUBNET_ASSET: trellis_types::ids::AssetId = trellis_types::ids::AssetId([0xbb; 32]);

fn subnet_asset_utxo(env: &mut TestEnv, seed: u8, amount: u64) -> Utxo {
    let utxo = Utxo {
        utxo_id: UtxoId {
            tx_id: TxId([seed; 32]),
            output_index: 0,
        },
        output: TransferOutput {
            asset_id: SUBNET_ASSET,
            amount,
            owners: Default::default(),
        },
    };
    env.state.add_utxo(utxo.clone());
    utxo
}

fn transform_tx(env: &mut TestEnv, subnet_id: SubnetId) -> Tx {
    let fee = env.backend.config.static_fees.transform_subnet_tx_fee;
    let platform_funding = fund(&mut env.state, 1, fee);
    // The locked reward pot: maximum minus initial supply.
    let pot = subnet_asset_utxo(env, 3, 4_000);
    signed(UnsignedTx::TransformSubnet(trellis_types::tx::TransformSubnetTx {
        base: base_fields(
            vec![input_spending(&platform_funding), input_spending(&pot)],
            vec![],
        ),
        subnet_id,
        asset_id: SUBNET_ASSET,
        initial_supply: 1_000,
        maximum_supply: 5_000,
        min_validator_stake: 50,
        max_validator_stake: 10_000,
        min_delegator_stake: 5,
        min_delegation_fee: 0,
        min_stake_duration: 60,
        max_stake_duration: 100 * DAY,
        max_validator_weight_factor: 5,
        subnet_auth: SubnetAuth::default(),
    }))
}

#[test]
fn transform_subnet_records_rules_and_seeds_the_supply() {
    let mut env = test_env(ForkSchedule::none_active());
    let subnet_id = create_subnet(&mut env);
    let tx = transform_tx(&mut env, subnet_id);

    let (_, diff) = execute(&env, &tx).unwrap();

    assert!(diff.get_subnet_transformation(subnet_id).is_ok());
    assert_eq!(diff.get_current_supply(subnet_id).unwrap(), 1_000);
}

#[test]
fn transformed_subnets_reject_owner_modifications() {
    let mut env = test_env(ForkSchedule::none_active());
    let subnet_id = create_subnet(&mut env);
    let transform = transform_tx(&mut env, subnet_id);
    env.state.add_subnet_transformation(&transform);

    let fee = env.backend.config.static_fees.create_asset_tx_fee;
    let funding = fund(&mut env.state, 5, fee);
    let tx = signed(UnsignedTx::CreateChain(CreateChainTx {
        base: base_fields(vec![input_spending(&funding)], vec![]),
        subnet_id,
        chain_name: "lattice".to_string(),
        vm_id: VmId([5; 32]),
        genesis_data: vec![],
        subnet_auth: SubnetAuth::default(),
    }));
    assert!(matches!(
        execute(&env, &tx).unwrap_err(),
        ExecutorError::Validation(StakerValidationError::ImmutableSubnetModification { .. })
    ));
}

#[test]
fn permissionless_validators_follow_the_transformed_subnet_rules() {
    let mut env = test_env(ForkSchedule::none_active());
    let subnet_id = create_subnet(&mut env);
    let transform = transform_tx(&mut env, subnet_id);
    env.state.add_subnet_transformation(&transform);
    env.state.set_current_supply(subnet_id, 1_000);

    // The node validates the primary network around the candidate interval.
    let primary_start = GENESIS_TIME + 50;
    env.state.current_stakers_mut().insert(current_validator(
        TxId([0x71; 32]),
        7,
        primary_start,
        primary_start + 100 * DAY,
        1_000,
    ));

    let fee = env.backend.config.static_fees.add_subnet_validator_fee;
    let platform_funding = fund(&mut env.state, 5, fee);
    let stake_funding = subnet_asset_utxo(&mut env, 6, 60);

    let build = |staked_asset| {
        signed(UnsignedTx::AddPermissionlessValidator(
            trellis_types::tx::AddPermissionlessValidatorTx {
                base: base_fields(
                    vec![
                        input_spending(&platform_funding),
                        input_spending(&stake_funding),
                    ],
                    vec![],
                ),
                validator: Validator {
                    node_id: NodeId([7; 20]),
                    start_time: primary_start,
                    end_time: primary_start + 90 * DAY,
                    weight: 60,
                },
                subnet_id,
                signer: None,
                stake_outputs: vec![TransferOutput {
                    asset_id: staked_asset,
                    amount: 60,
                    owners: Default::default(),
                }],
                validation_rewards_owner: owner_of(1),
                delegation_rewards_owner: owner_of(1),
                delegation_shares: 0,
            },
        ))
    };

    // Staking the platform asset on a transformed subnet is rejected.
    assert!(matches!(
        execute(&env, &build(TEST_ASSET)).unwrap_err(),
        ExecutorError::Validation(StakerValidationError::WrongStakedAssetId { .. })
    ));

    let (_, diff) = execute(&env, &build(SUBNET_ASSET)).unwrap();
    let staker = diff
        .get_pending_validator(subnet_id, NodeId([7; 20]))
        .unwrap();
    assert_eq!(
        staker.priority,
        StakerPriority::PendingSubnetPermissionlessValidator
    );
    assert_eq!(staker.weight, 60);
}

#[test]
fn remove_subnet_validator_only_touches_permissioned_stakers() {
    let mut env = test_env(ForkSchedule::none_active());
    let subnet_id = create_subnet(&mut env);
    env.state.current_stakers_mut().insert(Staker {
        tx_id: TxId([0x74; 32]),
        node_id: NodeId([7; 20]),
        subnet_id,
        weight: 1,
        start_time: GENESIS_TIME,
        end_time: GENESIS_TIME + 10 * DAY,
        earliest_stop_time: GENESIS_TIME + 10 * DAY,
        potential_reward: 0,
        priority: StakerPriority::CurrentSubnetPermissionedValidator,
    });

    let fee = env.backend.config.static_fees.tx_fee;
    let funding = fund(&mut env.state, 1, fee);
    let tx = signed(UnsignedTx::RemoveSubnetValidator(
        trellis_types::tx::RemoveSubnetValidatorTx {
            base: base_fields(vec![input_spending(&funding)], vec![]),
            node_id: NodeId([7; 20]),
            subnet_id,
            subnet_auth: SubnetAuth::default(),
        },
    ));
    let (_, diff) = execute(&env, &tx).unwrap();
    assert!(diff
        .get_current_validator(subnet_id, NodeId([7; 20]))
        .is_err());

    // A permissionless validator on the same slot is untouchable this way.
    let mut env = test_env(ForkSchedule::none_active());
    let subnet_id = create_subnet(&mut env);
    env.state.current_stakers_mut().insert(Staker {
        tx_id: TxId([0x74; 32]),
        node_id: NodeId([7; 20]),
        subnet_id,
        weight: 1,
        start_time: GENESIS_TIME,
        end_time: GENESIS_TIME + 10 * DAY,
        earliest_stop_time: GENESIS_TIME + 10 * DAY,
        potential_reward: 0,
        priority: StakerPriority::CurrentSubnetPermissionlessValidator,
    });
    let funding = fund(&mut env.state, 1, fee);
    let tx = signed(UnsignedTx::RemoveSubnetValidator(
        trellis_types::tx::RemoveSubnetValidatorTx {
            base: base_fields(vec![input_spending(&funding)], vec![]),
            node_id: NodeId([7; 20]),
            subnet_id,
            subnet_auth: SubnetAuth::default(),
        },
    ));
    assert!(matches!(
        execute(&env, &tx).unwrap_err(),
        ExecutorError::Validation(StakerValidationError::RemovePermissionlessValidator)
    ));
}
