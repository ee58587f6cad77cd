// Path: crates/tx/src/executor/proposal.rs
//! The proposal transaction executor: clock advances and staker settlement.
//!
//! Both forms are fee-free and carry no inputs. `AdvanceTimeTx` moves the
//! chain clock and promotes every pending staker whose start has arrived;
//! it is banned once Durango activates (block timestamps drive the clock
//! from then on). `RewardValidatorTx` removes the next expiring current
//! staker at exactly its end time, returns its stake, and settles its
//! reward.

use crate::executor::{produce, Backend};
use crate::reward::ScaledRewardCalculator;
use trellis_api::state::ChainDiff;
use trellis_api::RewardCalculator;
use trellis_types::config::RATE_DENOMINATOR;
use trellis_types::error::{ExecutorError, StakerValidationError, StateError};
use trellis_types::ids::{TxId, UtxoId};
use trellis_types::staker::Staker;
use trellis_types::tx::{AdvanceTimeTx, RewardValidatorTx, Tx, UnsignedTx};
use trellis_types::utxo::{OutputOwners, TransferOutput, Utxo};

/// Executes one proposal transaction against a staged diff.
pub struct ProposalTxExecutor<'a, D: ChainDiff> {
    backend: &'a Backend,
    diff: &'a mut D,
    tx: &'a Tx,
}

impl<'a, D: ChainDiff> ProposalTxExecutor<'a, D> {
    /// Binds an executor to a proposal transaction.
    pub fn new(backend: &'a Backend, diff: &'a mut D, tx: &'a Tx) -> Self {
        Self { backend, diff, tx }
    }

    /// Runs the proposal. On error the diff must be discarded.
    pub fn execute(mut self) -> Result<(), ExecutorError> {
        match self.tx.unsigned {
            UnsignedTx::AdvanceTime(inner) => self.advance_time(inner),
            UnsignedTx::RewardValidator(inner) => self.reward_validator(inner),
            _ => Err(ExecutorError::WrongTxType),
        }
    }

    fn advance_time(&mut self, inner: AdvanceTimeTx) -> Result<(), ExecutorError> {
        let chain_time = self.diff.get_timestamp();
        if self.backend.config.forks.is_durango_active(chain_time) {
            return Err(StakerValidationError::WrongFork.into());
        }
        if inner.time <= chain_time {
            return Err(ExecutorError::TimestampNotMonotonic {
                current: chain_time,
                proposed: inner.time,
            });
        }

        let next_change = next_staker_change_time(&*self.diff).ok_or(StateError::NotFound)?;
        if inner.time > next_change {
            return Err(ExecutorError::TimestampBeyondNextChange {
                proposed: inner.time,
                next_change,
            });
        }

        self.diff.set_timestamp(inner.time);

        // Promote every pending staker whose start has arrived. The pending
        // iterator is ordered by start time, so the prefix is exact.
        let to_promote: Vec<Staker> = self
            .diff
            .get_pending_staker_iterator()
            .take_while(|staker| staker.start_time <= inner.time)
            .collect();

        for staker in to_promote {
            if staker.priority.is_validator() {
                self.diff.delete_pending_validator(&staker);
            } else {
                self.diff.delete_pending_delegator(&staker);
            }

            let current_priority = staker.priority.as_current();
            let mut potential_reward = 0;
            if !current_priority.is_permissioned_validator() {
                let supply = self.diff.get_current_supply(staker.subnet_id)?;
                let reward_config = self.diff.get_reward_config(staker.subnet_id)?;
                let calculator = ScaledRewardCalculator::new(reward_config);
                potential_reward = calculator.calculate(
                    staker.end_time.saturating_sub(staker.start_time),
                    staker.weight,
                    supply,
                );
                self.diff.set_current_supply(
                    staker.subnet_id,
                    supply.saturating_add(potential_reward),
                );
            }

            let promoted = Staker {
                potential_reward,
                earliest_stop_time: staker.end_time,
                priority: current_priority,
                ..staker
            };
            if promoted.priority.is_validator() {
                self.diff.put_current_validator(promoted);
            } else {
                self.diff.put_current_delegator(promoted);
            }
        }
        Ok(())
    }

    fn reward_validator(&mut self, inner: RewardValidatorTx) -> Result<(), ExecutorError> {
        let chain_time = self.diff.get_timestamp();

        let head = self
            .diff
            .get_current_staker_iterator()
            .next()
            .ok_or(StateError::NotFound)?;
        if head.tx_id != inner.tx_id {
            return Err(ExecutorError::WrongRewardedStaker {
                expected: head.tx_id,
                got: inner.tx_id,
            });
        }
        if head.end_time != chain_time {
            return Err(ExecutorError::StakerNotDone {
                end_time: head.end_time,
                chain_time,
            });
        }

        if head.priority.is_validator() {
            self.diff.delete_current_validator(&head);
        } else {
            self.diff.delete_current_delegator(&head);
        }

        // Return the stake and settle the reward against the staker's own
        // transaction, continuing its output index space.
        let staker_tx = self.diff.get_tx(head.tx_id)?;
        let view = staker_tx
            .unsigned
            .staker_view()
            .ok_or(StateError::WrongTxType)?;
        let base_outputs = staker_tx
            .unsigned
            .base_fields()
            .map_or(0, |base| base.outputs.len());

        let stake_outputs: Vec<TransferOutput> = view.stake_outputs.to_vec();
        produce(self.diff, head.tx_id, &stake_outputs, base_outputs as u32);

        if head.potential_reward > 0 {
            let reward_index = (base_outputs + stake_outputs.len()) as u32;
            self.settle_reward(&head, &staker_tx, reward_index)?;
        }
        Ok(())
    }

    /// Pays the staker's reward. A delegator's reward is split with its
    /// validator according to the validator's delegation shares; if the
    /// validator has already left the set, the delegator keeps the whole
    /// reward.
    fn settle_reward(
        &mut self,
        staker: &Staker,
        staker_tx: &Tx,
        first_index: u32,
    ) -> Result<(), ExecutorError> {
        let reward = staker.potential_reward;
        match &staker_tx.unsigned {
            UnsignedTx::AddValidator(v) => {
                self.pay(staker.tx_id, first_index, reward, v.rewards_owner.clone());
                Ok(())
            }
            UnsignedTx::AddPermissionlessValidator(v) => {
                self.pay(
                    staker.tx_id,
                    first_index,
                    reward,
                    v.validation_rewards_owner.clone(),
                );
                Ok(())
            }
            UnsignedTx::AddDelegator(d) => {
                let owner = d.rewards_owner.clone();
                self.split_delegation_reward(staker, first_index, reward, owner)
            }
            UnsignedTx::AddPermissionlessDelegator(d) => {
                let owner = d.rewards_owner.clone();
                self.split_delegation_reward(staker, first_index, reward, owner)
            }
            _ => Err(StateError::WrongTxType.into()),
        }
    }

    fn split_delegation_reward(
        &mut self,
        staker: &Staker,
        first_index: u32,
        reward: u64,
        delegator_owner: OutputOwners,
    ) -> Result<(), ExecutorError> {
        let validator = self
            .diff
            .get_current_validator(staker.subnet_id, staker.node_id);
        let (shares, validator_owner) = match validator {
            Ok(validator) => match self.diff.get_tx(validator.tx_id)?.unsigned {
                UnsignedTx::AddValidator(v) => (v.delegation_shares, Some(v.rewards_owner)),
                UnsignedTx::AddPermissionlessValidator(v) => {
                    (v.delegation_shares, Some(v.delegation_rewards_owner))
                }
                _ => (0, None),
            },
            // The validator expired first; the delegator keeps everything.
            Err(_) => (0, None),
        };

        let validator_cut =
            (u128::from(reward) * u128::from(shares) / u128::from(RATE_DENOMINATOR)) as u64;
        let delegator_cut = reward - validator_cut;

        let mut index = first_index;
        if delegator_cut > 0 {
            self.pay(staker.tx_id, index, delegator_cut, delegator_owner);
            index += 1;
        }
        if validator_cut > 0 {
            if let Some(owner) = validator_owner {
                self.pay(staker.tx_id, index, validator_cut, owner);
            }
        }
        Ok(())
    }

    /// Materializes one reward UTXO in the staking asset.
    fn pay(&mut self, tx_id: TxId, index: u32, amount: u64, owners: OutputOwners) {
        self.diff.add_utxo(Utxo {
            utxo_id: UtxoId {
                tx_id,
                output_index: index,
            },
            output: TransferOutput {
                asset_id: self.backend.config.asset_id,
                amount,
                owners,
            },
        });
    }
}

/// The earliest upcoming staker transition: the first pending start or the
/// first current end, whichever comes sooner.
fn next_staker_change_time<D: ChainDiff>(diff: &D) -> Option<u64> {
    let next_current = diff
        .get_current_staker_iterator()
        .next()
        .map(|staker| staker.next_transition_time());
    let next_pending = diff
        .get_pending_staker_iterator()
        .next()
        .map(|staker| staker.next_transition_time());
    match (next_current, next_pending) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (Some(a), None) => Some(a),
        (None, b) => b,
    }
}
