// Path: crates/validators/src/lib.rs
//! Historical validator-set reconstruction.
//!
//! The manager answers "what was the validator set of subnet S at height H"
//! by taking the current in-memory set and replaying the recorded weight
//! and public-key diffs backwards from the last accepted height down to H.
//! Results are cached per subnet in a small LRU; subnet snapshots borrow
//! their BLS keys from the primary network. Block acceptance takes the
//! accept lock for writing; every query here takes it for reading.

pub mod window;

use lru::LruCache;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::Arc;
use tracing::error;
use trellis_api::CancelToken;
use trellis_state::MemoryState;
use trellis_types::config::PlatformConfig;
use trellis_types::error::{ManagerError, StateError};
use trellis_types::ids::{BlockId, ChainId, SubnetId, TxId};
use trellis_types::tx::{Tx, UnsignedTx};
use trellis_types::validator::ValidatorSet;
use window::{Clock, Window, WindowConfig};

/// Entries per subnet in the validator-set cache.
const VALIDATOR_SETS_CACHE_SIZE: usize = 64;

/// Bounds and TTL of the recently-accepted window.
const MAX_RECENTLY_ACCEPTED_WINDOW_SIZE: usize = 64;
const MIN_RECENTLY_ACCEPTED_WINDOW_SIZE: usize = 16;
const RECENTLY_ACCEPTED_WINDOW_TTL: u64 = 2 * 60;

/// What the manager needs from chain state: transaction lookup, block
/// bookkeeping, the current sets, and reverse diff application.
pub trait ValidatorState: Send + Sync {
    /// Looks up an accepted transaction.
    fn get_tx(&self, tx_id: TxId) -> Result<Tx, StateError>;

    /// The last accepted block.
    fn last_accepted(&self) -> BlockId;

    /// The height of a known block.
    fn get_block_height(&self, block_id: BlockId) -> Result<u64, StateError>;

    /// Materializes the current validator set of a subnet (validator weight
    /// aggregated with its delegators).
    fn validator_set(&self, subnet_id: SubnetId) -> Result<ValidatorSet, ManagerError>;

    /// Rewinds `validators` by inverting weight diffs over
    /// `[end_height, start_height]`, walking downward, checking `cancel`
    /// between heights.
    fn apply_validator_weight_diffs(
        &self,
        validators: &mut ValidatorSet,
        start_height: u64,
        end_height: u64,
        subnet_id: SubnetId,
        cancel: &CancelToken,
    ) -> Result<(), ManagerError>;

    /// Rewinds the BLS keys of `validators` over `[end_height,
    /// start_height]`.
    fn apply_validator_public_key_diffs(
        &self,
        validators: &mut ValidatorSet,
        start_height: u64,
        end_height: u64,
        cancel: &CancelToken,
    ) -> Result<(), ManagerError>;
}

impl ValidatorState for MemoryState {
    fn get_tx(&self, tx_id: TxId) -> Result<Tx, StateError> {
        trellis_api::ChainState::get_tx(self, tx_id)
    }

    fn last_accepted(&self) -> BlockId {
        MemoryState::last_accepted(self)
    }

    fn get_block_height(&self, block_id: BlockId) -> Result<u64, StateError> {
        MemoryState::get_block_height(self, block_id)
    }

    fn validator_set(&self, subnet_id: SubnetId) -> Result<ValidatorSet, ManagerError> {
        MemoryState::validator_set(self, subnet_id)
    }

    fn apply_validator_weight_diffs(
        &self,
        validators: &mut ValidatorSet,
        start_height: u64,
        end_height: u64,
        subnet_id: SubnetId,
        cancel: &CancelToken,
    ) -> Result<(), ManagerError> {
        MemoryState::apply_validator_weight_diffs(
            self,
            validators,
            start_height,
            end_height,
            subnet_id,
            cancel,
        )
    }

    fn apply_validator_public_key_diffs(
        &self,
        validators: &mut ValidatorSet,
        start_height: u64,
        end_height: u64,
        cancel: &CancelToken,
    ) -> Result<(), ManagerError> {
        MemoryState::apply_validator_public_key_diffs(
            self,
            validators,
            start_height,
            end_height,
            cancel,
        )
    }
}

type SetCache = Arc<Mutex<LruCache<u64, ValidatorSet>>>;

/// Reconstructs validator sets at historical heights.
pub struct Manager<S: ValidatorState> {
    config: PlatformConfig,
    accept_lock: Arc<RwLock<()>>,
    state: Arc<S>,

    // The live sets maintained by the accept path.
    current_sets: RwLock<HashMap<SubnetId, ValidatorSet>>,

    // Per-subnet caches, double-checked on miss. Only the primary network
    // and tracked subnets get one.
    caches: RwLock<HashMap<SubnetId, SetCache>>,

    recently_accepted: Mutex<Window<BlockId>>,
}

impl<S: ValidatorState> Manager<S> {
    /// Builds a manager sharing `accept_lock` with the accept path.
    pub fn new(
        config: PlatformConfig,
        accept_lock: Arc<RwLock<()>>,
        state: Arc<S>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            config,
            accept_lock,
            state,
            current_sets: RwLock::new(HashMap::new()),
            caches: RwLock::new(HashMap::new()),
            recently_accepted: Mutex::new(Window::new(
                WindowConfig {
                    min_size: MIN_RECENTLY_ACCEPTED_WINDOW_SIZE,
                    max_size: MAX_RECENTLY_ACCEPTED_WINDOW_SIZE,
                    ttl: RECENTLY_ACCEPTED_WINDOW_TTL,
                },
                clock,
            )),
        }
    }

    /// Installs the live validator set of a subnet. Called by the accept
    /// path, which holds the accept lock for writing.
    pub fn set_current_validators(&self, subnet_id: SubnetId, set: ValidatorSet) {
        self.current_sets.write().insert(subnet_id, set);
    }

    /// Registers a newly accepted block id in the sliding window.
    pub fn on_accepted_block_id(&self, block_id: BlockId) {
        self.recently_accepted.lock().add(block_id);
    }

    /// The height of the last accepted block.
    pub fn get_current_height(&self) -> Result<u64, ManagerError> {
        let _guard = self.accept_lock.read();
        self.current_height_locked()
    }

    fn current_height_locked(&self) -> Result<u64, ManagerError> {
        Ok(self.state.get_block_height(self.state.last_accepted())?)
    }

    /// The height of the block immediately before the oldest entry of the
    /// recently-accepted window; the last accepted height when the window
    /// is empty or `use_current_height` is set.
    pub fn get_minimum_height(&self) -> Result<u64, ManagerError> {
        let _guard = self.accept_lock.read();

        if self.config.use_current_height {
            return self.current_height_locked();
        }

        let oldest = self.recently_accepted.lock().oldest().copied();
        let Some(oldest) = oldest else {
            return self.current_height_locked();
        };

        // The first block ever accepted has height >= 1, so there is always
        // a block before the window.
        let height = self.state.get_block_height(oldest)?;
        Ok(height - 1)
    }

    /// The subnet a chain belongs to. The platform chain itself belongs to
    /// the primary network.
    pub fn get_subnet_id(&self, chain_id: ChainId) -> Result<SubnetId, ManagerError> {
        if chain_id == ChainId::PLATFORM {
            return Ok(SubnetId::PRIMARY);
        }

        let _guard = self.accept_lock.read();
        let chain_tx = self.state.get_tx(TxId(chain_id.0))?;
        match &chain_tx.unsigned {
            UnsignedTx::CreateChain(create) => Ok(create.subnet_id),
            _ => Err(ManagerError::NotABlockchain { chain: chain_id }),
        }
    }

    /// The validator set of `subnet_id` at `target_height`.
    pub fn get_validator_set(
        &self,
        target_height: u64,
        subnet_id: SubnetId,
        cancel: &CancelToken,
    ) -> Result<ValidatorSet, ManagerError> {
        let cache = self.validator_set_cache(subnet_id);
        if let Some(cache) = &cache {
            if let Some(set) = cache.lock().get(&target_height) {
                return Ok(set.clone());
            }
        }

        let set = if subnet_id == SubnetId::PRIMARY {
            self.make_primary_network_validator_set(target_height, cancel)?
        } else {
            self.make_subnet_validator_set(target_height, subnet_id, cancel)?
        };

        if let Some(cache) = &cache {
            cache.lock().put(target_height, set.clone());
        }
        Ok(set)
    }

    /// The cache for a subnet: a live LRU for the primary network and
    /// tracked subnets, nothing for anyone else.
    fn validator_set_cache(&self, subnet_id: SubnetId) -> Option<SetCache> {
        if subnet_id != SubnetId::PRIMARY && !self.config.tracked_subnets.contains(&subnet_id) {
            return None;
        }

        if let Some(cache) = self.caches.read().get(&subnet_id) {
            return Some(cache.clone());
        }

        let mut caches = self.caches.write();
        // Double-checked: another query may have built it meanwhile.
        Some(
            caches
                .entry(subnet_id)
                .or_insert_with(|| {
                    Arc::new(Mutex::new(LruCache::new(
                        NonZeroUsize::new(VALIDATOR_SETS_CACHE_SIZE).expect("nonzero"),
                    )))
                })
                .clone(),
        )
    }

    fn make_primary_network_validator_set(
        &self,
        target_height: u64,
        cancel: &CancelToken,
    ) -> Result<ValidatorSet, ManagerError> {
        let (mut set, current_height) = self.current_primary_validator_set()?;
        if current_height < target_height {
            return Err(ManagerError::NotFound);
        }

        // Diffs are recorded per accepted height; rebuilding the set at
        // [target_height] means inverting everything in
        // [target_height + 1, current_height], newest first.
        self.state.apply_validator_weight_diffs(
            &mut set,
            current_height,
            target_height + 1,
            SubnetId::PRIMARY,
            cancel,
        )?;
        self.state.apply_validator_public_key_diffs(
            &mut set,
            current_height,
            target_height + 1,
            cancel,
        )?;
        Ok(set)
    }

    fn current_primary_validator_set(&self) -> Result<(ValidatorSet, u64), ManagerError> {
        let _guard = self.accept_lock.read();

        let sets = self.current_sets.read();
        let Some(set) = sets.get(&SubnetId::PRIMARY) else {
            // This should never happen.
            error!(subnet = %SubnetId::PRIMARY, "missing primary validator set");
            return Err(ManagerError::MissingValidatorSet {
                subnet: SubnetId::PRIMARY,
            });
        };
        let current_height = self.current_height_locked()?;
        Ok((set.clone(), current_height))
    }

    fn make_subnet_validator_set(
        &self,
        target_height: u64,
        subnet_id: SubnetId,
        cancel: &CancelToken,
    ) -> Result<ValidatorSet, ManagerError> {
        let (mut subnet_set, primary_set, current_height) =
            self.current_validator_sets(subnet_id)?;
        if current_height < target_height {
            return Err(ManagerError::NotFound);
        }

        self.state.apply_validator_weight_diffs(
            &mut subnet_set,
            current_height,
            target_height + 1,
            subnet_id,
            cancel,
        )?;

        // Subnet sets do not record their own keys; overlay the primary
        // network's.
        for (node_id, validator) in subnet_set.iter_mut() {
            let Some(primary) = primary_set.get(node_id) else {
                // This should never happen.
                error!(subnet = %subnet_id, node = %node_id, "subnet validator missing from the primary network");
                return Err(ManagerError::MissingValidator {
                    node: *node_id,
                    subnet: subnet_id,
                });
            };
            validator.public_key = primary.public_key;
        }

        self.state.apply_validator_public_key_diffs(
            &mut subnet_set,
            current_height,
            target_height + 1,
            cancel,
        )?;
        Ok(subnet_set)
    }

    fn current_validator_sets(
        &self,
        subnet_id: SubnetId,
    ) -> Result<(ValidatorSet, ValidatorSet, u64), ManagerError> {
        let _guard = self.accept_lock.read();

        let sets = self.current_sets.read();
        let subnet_set = match sets.get(&subnet_id) {
            Some(set) => set.clone(),
            // Untracked subnet: materialize from state.
            None => self.state.validator_set(subnet_id)?,
        };
        let Some(primary_set) = sets.get(&SubnetId::PRIMARY) else {
            // This should never happen.
            error!(subnet = %SubnetId::PRIMARY, "missing primary validator set");
            return Err(ManagerError::MissingValidatorSet {
                subnet: SubnetId::PRIMARY,
            });
        };
        let current_height = self.current_height_locked()?;
        Ok((subnet_set, primary_set.clone(), current_height))
    }
}

#[cfg(test)]
mod tests;
