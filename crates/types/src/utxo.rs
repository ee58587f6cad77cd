// Path: crates/types/src/utxo.rs
//! Unspent transaction outputs and the transferable inputs/outputs that
//! consume and produce them.

use crate::ids::{Address, AssetId, UtxoId, UtxoKey};
use crate::tx::TxSyntaxError;
use parity_scale_codec::{Decode, Encode};
use serde::{Deserialize, Serialize};

/// The ownership predicate attached to an output: `threshold` of the listed
/// addresses must sign to spend it, once `locktime` has passed.
#[derive(Encode, Decode, Serialize, Deserialize, Clone, PartialEq, Eq, Debug, Default, Hash)]
pub struct OutputOwners {
    /// Unix time before which the output cannot be spent.
    pub locktime: u64,
    /// How many of the addresses must sign.
    pub threshold: u32,
    /// Candidate signer addresses. Must be sorted and unique.
    pub addresses: Vec<Address>,
}

impl OutputOwners {
    /// Checks structural validity: threshold within bounds and addresses
    /// sorted and unique.
    pub fn syntactic_verify(&self) -> Result<(), TxSyntaxError> {
        if self.threshold as usize > self.addresses.len() {
            return Err(TxSyntaxError::InvalidThreshold {
                threshold: self.threshold,
                addresses: self.addresses.len(),
            });
        }
        if self.threshold == 0 && !self.addresses.is_empty() {
            return Err(TxSyntaxError::InvalidThreshold {
                threshold: self.threshold,
                addresses: self.addresses.len(),
            });
        }
        if !self.addresses.windows(2).all(|w| w[0] < w[1]) {
            return Err(TxSyntaxError::AddressesNotSortedUnique);
        }
        Ok(())
    }
}

/// A value-bearing output: an amount of one asset guarded by an owner
/// predicate.
#[derive(Encode, Decode, Serialize, Deserialize, Clone, PartialEq, Eq, Debug, Hash)]
pub struct TransferOutput {
    /// The asset carried.
    pub asset_id: AssetId,
    /// The amount carried. Never zero in a valid transaction.
    pub amount: u64,
    /// Who may spend it.
    pub owners: OutputOwners,
}

/// A reference to an existing UTXO together with the claim being made about
/// it. The claimed asset and amount must match the UTXO exactly; the
/// signature indices select which owner addresses the credential signs with.
#[derive(Encode, Decode, Serialize, Deserialize, Clone, PartialEq, Eq, Debug, Hash)]
pub struct TransferInput {
    /// The UTXO being consumed.
    pub utxo_id: UtxoId,
    /// The asset the UTXO is expected to carry.
    pub asset_id: AssetId,
    /// The amount the UTXO is expected to carry.
    pub amount: u64,
    /// Indices into the UTXO owner's address list, sorted and unique.
    pub sig_indices: Vec<u32>,
}

/// An unspent transaction output as materialized in state or shared memory.
#[derive(Encode, Decode, Serialize, Deserialize, Clone, PartialEq, Eq, Debug, Hash)]
pub struct Utxo {
    /// Where this output came from.
    pub utxo_id: UtxoId,
    /// The output payload.
    pub output: TransferOutput,
}

impl Utxo {
    /// The unique key of this UTXO in state and shared memory.
    pub fn key(&self) -> UtxoKey {
        self.utxo_id.input_id()
    }

    /// The addressable traits of this UTXO: the owner addresses, used for
    /// indexed lookup on the remote side of an export.
    pub fn addresses(&self) -> &[Address] {
        &self.output.owners.addresses
    }
}
