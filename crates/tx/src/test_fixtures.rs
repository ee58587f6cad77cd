// Path: crates/tx/src/test_fixtures.rs
//! Shared mocks and builders for the executor test suites.

use crate::executor::Backend;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use trellis_api::shared_memory::AtomicRequests;
use trellis_api::{ChainRegistrar, Fx, SharedMemory};
use trellis_state::MemoryState;
use trellis_types::codec;
use trellis_types::config::{
    ForkSchedule, NetworkId, PlatformConfig, RewardConfig, StaticFeeConfig,
};
use trellis_types::error::SharedMemoryError;
use trellis_types::ids::{Address, AssetId, ChainId, SubnetId, TxId, UtxoId, UtxoKey};
use trellis_types::tx::{
    CreateChainTx, Credential, SubnetAuth, Tx, UnsignedTx,
};
use trellis_types::utxo::{OutputOwners, TransferInput, TransferOutput, Utxo};

/// The platform's staking asset in tests.
pub(crate) const TEST_ASSET: AssetId = AssetId([0xaa; 32]);

/// A peer chain living in the primary network ("the exchange chain").
pub(crate) const PEER_CHAIN: ChainId = ChainId([2; 32]);

/// A crypto seam that accepts every credential.
pub(crate) struct ApproveAllFx;

impl Fx for ApproveAllFx {
    fn verify_transfer(
        &self,
        _unsigned_bytes: &[u8],
        _input: &TransferInput,
        _credential: &Credential,
        _owners: &OutputOwners,
    ) -> Result<(), String> {
        Ok(())
    }

    fn verify_permission(
        &self,
        _unsigned_bytes: &[u8],
        _auth: &SubnetAuth,
        _credential: &Credential,
        _owners: &OutputOwners,
    ) -> Result<(), String> {
        Ok(())
    }
}

/// A crypto seam that rejects every credential.
pub(crate) struct RejectAllFx;

impl Fx for RejectAllFx {
    fn verify_transfer(
        &self,
        _unsigned_bytes: &[u8],
        _input: &TransferInput,
        _credential: &Credential,
        _owners: &OutputOwners,
    ) -> Result<(), String> {
        Err("signature rejected".to_string())
    }

    fn verify_permission(
        &self,
        _unsigned_bytes: &[u8],
        _auth: &SubnetAuth,
        _credential: &Credential,
        _owners: &OutputOwners,
    ) -> Result<(), String> {
        Err("signature rejected".to_string())
    }
}

/// An in-memory shared-memory region.
#[derive(Default)]
pub(crate) struct MemSharedMemory {
    entries: Mutex<HashMap<ChainId, HashMap<UtxoKey, Vec<u8>>>>,
}

impl MemSharedMemory {
    pub(crate) fn put_utxo(&self, chain_id: ChainId, utxo: &Utxo) {
        self.entries
            .lock()
            .unwrap()
            .entry(chain_id)
            .or_default()
            .insert(utxo.key(), codec::to_bytes_canonical(utxo));
    }

    pub(crate) fn contains(&self, chain_id: ChainId, key: &UtxoKey) -> bool {
        self.entries
            .lock()
            .unwrap()
            .get(&chain_id)
            .is_some_and(|region| region.contains_key(key))
    }
}

impl SharedMemory for MemSharedMemory {
    fn get(
        &self,
        chain_id: ChainId,
        keys: &[UtxoKey],
    ) -> Result<Vec<Vec<u8>>, SharedMemoryError> {
        let entries = self.entries.lock().unwrap();
        let region = entries
            .get(&chain_id)
            .ok_or_else(|| SharedMemoryError("unknown chain".to_string()))?;
        keys.iter()
            .map(|key| {
                region
                    .get(key)
                    .cloned()
                    .ok_or_else(|| SharedMemoryError(format!("missing key {key}")))
            })
            .collect()
    }

    fn apply(
        &self,
        requests: &HashMap<ChainId, AtomicRequests>,
    ) -> Result<(), SharedMemoryError> {
        let mut entries = self.entries.lock().unwrap();
        for (chain_id, batch) in requests {
            let region = entries.entry(*chain_id).or_default();
            for key in &batch.remove_requests {
                region.remove(key);
            }
            for element in &batch.put_requests {
                region.insert(element.key, element.value.clone());
            }
        }
        Ok(())
    }
}

/// A registrar that records which chains were instantiated.
#[derive(Default)]
pub(crate) struct RecordingRegistrar {
    pub(crate) created: Mutex<Vec<TxId>>,
}

impl ChainRegistrar for RecordingRegistrar {
    fn create_chain(&self, tx_id: TxId, _tx: &CreateChainTx) {
        let mut created = self.created.lock().unwrap();
        // Idempotent: a redelivered acceptance is a no-op.
        if !created.contains(&tx_id) {
            created.push(tx_id);
        }
    }
}

pub(crate) const DAY: u64 = 24 * 60 * 60;

pub(crate) fn test_config(forks: ForkSchedule) -> PlatformConfig {
    PlatformConfig {
        network_id: NetworkId::LOCAL,
        asset_id: TEST_ASSET,
        min_validator_stake: 100,
        max_validator_stake: 100_000,
        min_delegator_stake: 10,
        min_delegation_fee: 0,
        min_stake_duration: 60,
        max_stake_duration: 365 * DAY,
        static_fees: StaticFeeConfig {
            tx_fee: 7,
            create_asset_tx_fee: 3,
            create_subnet_tx_fee: 30,
            create_blockchain_tx_fee: 40,
            transform_subnet_tx_fee: 50,
            add_primary_network_validator_fee: 11,
            add_primary_network_delegator_fee: 12,
            add_subnet_validator_fee: 13,
            add_subnet_delegator_fee: 14,
        },
        forks,
        reward_config: test_reward_config(),
        tracked_subnets: Default::default(),
        use_current_height: false,
    }
}

pub(crate) fn test_reward_config() -> RewardConfig {
    RewardConfig {
        max_consumption_rate: 120_000,
        min_consumption_rate: 100_000,
        mint_period: 365 * DAY,
        supply_cap: 720_000_000,
    }
}

pub(crate) struct TestEnv {
    pub(crate) backend: Backend,
    pub(crate) shared_memory: Arc<MemSharedMemory>,
    pub(crate) registrar: Arc<RecordingRegistrar>,
    pub(crate) state: MemoryState,
}

/// Chain time at genesis in the tests.
pub(crate) const GENESIS_TIME: u64 = 10_000;

pub(crate) fn test_env(forks: ForkSchedule) -> TestEnv {
    let config = test_config(forks);
    let shared_memory = Arc::new(MemSharedMemory::default());
    let registrar = Arc::new(RecordingRegistrar::default());
    let backend = Backend::new(
        config,
        ChainId::PLATFORM,
        SubnetId::PRIMARY,
        Arc::new(ApproveAllFx),
        shared_memory.clone(),
        registrar.clone(),
    );
    backend.mark_bootstrapped();

    let mut state = MemoryState::new();
    state.set_timestamp(GENESIS_TIME);
    state.set_current_supply(SubnetId::PRIMARY, 360_000_000);
    state.set_reward_config(SubnetId::PRIMARY, test_reward_config());
    state.add_chain_binding(PEER_CHAIN, SubnetId::PRIMARY);

    TestEnv {
        backend,
        shared_memory,
        registrar,
        state,
    }
}

/// A spendable UTXO held by the default (empty) owner predicate.
pub(crate) fn fund(state: &mut MemoryState, seed: u8, amount: u64) -> Utxo {
    let utxo = Utxo {
        utxo_id: UtxoId {
            tx_id: TxId([seed; 32]),
            output_index: 0,
        },
        output: TransferOutput {
            asset_id: TEST_ASSET,
            amount,
            owners: OutputOwners::default(),
        },
    };
    state.add_utxo(utxo.clone());
    utxo
}

pub(crate) fn input_spending(utxo: &Utxo) -> TransferInput {
    TransferInput {
        utxo_id: utxo.utxo_id,
        asset_id: utxo.output.asset_id,
        amount: utxo.output.amount,
        sig_indices: vec![],
    }
}

pub(crate) fn stake_output(amount: u64) -> TransferOutput {
    TransferOutput {
        asset_id: TEST_ASSET,
        amount,
        owners: OutputOwners::default(),
    }
}

pub(crate) fn owner_of(address_byte: u8) -> OutputOwners {
    OutputOwners {
        locktime: 0,
        threshold: 1,
        addresses: vec![Address([address_byte; 20])],
    }
}

/// Signs an unsigned body with exactly the demanded number of empty
/// credentials.
pub(crate) fn signed(unsigned: UnsignedTx) -> Tx {
    let demand = unsigned.credential_demand();
    Tx {
        version: 0,
        unsigned,
        credentials: vec![Credential::default(); demand],
    }
}
