// Path: crates/tx/src/flow.rs
//! The flow checker: conservation of value per asset.
//!
//! For every asset touched by a transaction, the amounts consumed by its
//! inputs must equal the amounts produced by its outputs plus the required
//! fee for that asset; assets with no required fee must net to zero. Each
//! input must resolve to a live UTXO whose owner predicate its credential
//! satisfies.

use std::collections::HashMap;
use std::sync::Arc;
use trellis_api::state::ChainState;
use trellis_api::Fx;
use trellis_types::error::FlowCheckError;
use trellis_types::ids::AssetId;
use trellis_types::tx::{Credential, Tx};
use trellis_types::utxo::{TransferInput, TransferOutput, Utxo};

/// Verifies input/output/fee balance and spend authorization.
#[derive(Clone)]
pub struct FlowChecker {
    fx: Arc<dyn Fx + Send + Sync>,
}

impl FlowChecker {
    /// A checker delegating credential verification to `fx`.
    pub fn new(fx: Arc<dyn Fx + Send + Sync>) -> Self {
        Self { fx }
    }

    /// Resolves every input against `state` and verifies the spend.
    /// Inputs, outputs, and credentials are the transaction's combined
    /// lists; `required_fees` maps each fee-charged asset to its amount.
    pub fn verify_spend(
        &self,
        tx: &Tx,
        state: &dyn ChainState,
        inputs: &[TransferInput],
        outputs: &[TransferOutput],
        credentials: &[Credential],
        required_fees: &HashMap<AssetId, u64>,
    ) -> Result<(), FlowCheckError> {
        let mut utxos = Vec::with_capacity(inputs.len());
        for input in inputs {
            let utxo = state
                .get_utxo(&input.utxo_id)
                .map_err(|_| FlowCheckError::MissingUtxo(input.utxo_id))?;
            utxos.push(utxo);
        }
        self.verify_spend_utxos(tx, &utxos, inputs, outputs, credentials, required_fees)
    }

    /// Verifies the spend against pre-resolved UTXOs (atomic imports
    /// resolve part of theirs from shared memory).
    pub fn verify_spend_utxos(
        &self,
        tx: &Tx,
        utxos: &[Utxo],
        inputs: &[TransferInput],
        outputs: &[TransferOutput],
        credentials: &[Credential],
        required_fees: &HashMap<AssetId, u64>,
    ) -> Result<(), FlowCheckError> {
        if credentials.len() != inputs.len() {
            return Err(FlowCheckError::CredentialCountMismatch {
                expected: inputs.len(),
                got: credentials.len(),
            });
        }
        debug_assert_eq!(utxos.len(), inputs.len());

        let unsigned_bytes = tx.unsigned_bytes();
        let mut consumed: HashMap<AssetId, u64> = HashMap::new();
        for ((input, utxo), credential) in inputs.iter().zip(utxos).zip(credentials) {
            if input.asset_id != utxo.output.asset_id {
                return Err(FlowCheckError::AssetMismatch {
                    input: input.asset_id,
                    utxo: utxo.output.asset_id,
                });
            }
            if input.amount != utxo.output.amount {
                return Err(FlowCheckError::AmountMismatch {
                    input: input.amount,
                    utxo: utxo.output.amount,
                });
            }
            self.fx
                .verify_transfer(&unsigned_bytes, input, credential, &utxo.output.owners)
                .map_err(|reason| FlowCheckError::Unauthorized {
                    utxo: input.utxo_id,
                    reason,
                })?;

            let entry = consumed.entry(input.asset_id).or_default();
            *entry = entry
                .checked_add(input.amount)
                .ok_or(FlowCheckError::AmountOverflow {
                    asset: input.asset_id,
                })?;
        }

        let mut produced: HashMap<AssetId, u64> = HashMap::new();
        for output in outputs {
            let entry = produced.entry(output.asset_id).or_default();
            *entry = entry
                .checked_add(output.amount)
                .ok_or(FlowCheckError::AmountOverflow {
                    asset: output.asset_id,
                })?;
        }

        // Per-asset conservation over every asset touched anywhere.
        let mut assets: Vec<AssetId> = consumed
            .keys()
            .chain(produced.keys())
            .chain(required_fees.keys())
            .copied()
            .collect();
        assets.sort_unstable();
        assets.dedup();

        for asset in assets {
            let consumed_amount = consumed.get(&asset).copied().unwrap_or(0);
            let produced_amount = produced.get(&asset).copied().unwrap_or(0);
            let fee = required_fees.get(&asset).copied().unwrap_or(0);
            let needed =
                produced_amount
                    .checked_add(fee)
                    .ok_or(FlowCheckError::AmountOverflow { asset })?;
            if consumed_amount != needed {
                return Err(FlowCheckError::UnbalancedAsset {
                    asset,
                    consumed: consumed_amount,
                    produced: produced_amount,
                    fee,
                });
            }
        }
        Ok(())
    }
}
