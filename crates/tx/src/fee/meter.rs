// Path: crates/tx/src/fee/meter.rs
//! Complexity metering: turning a transaction into fee dimensions.
//!
//! Bandwidth is the canonical encoded size. The unsigned body already
//! contains the inputs and outputs, so their bandwidth is zeroed when their
//! per-entry read/write costs are accumulated; credentials are not part of
//! the unsigned body, so theirs counts.

use trellis_types::codec;
use trellis_types::fees::{Dimension, Dimensions};
use trellis_types::tx::Tx;
use trellis_types::utxo::{TransferInput, TransferOutput};

/// Compute cost of verifying one signature.
pub const SIG_VERIFY_COMPUTE: u64 = 200;

/// State reads to resolve one consumed UTXO.
pub const INPUT_DB_READ: u64 = 1;

/// State writes to delete one consumed UTXO.
pub const INPUT_DB_WRITE: u64 = 1;

/// State writes to materialize one produced UTXO.
pub const OUTPUT_DB_WRITE: u64 = 1;

/// Serialized size of the codec version word.
pub const VERSION_SIZE: u64 = 2;

/// Serialized size of a slice length prefix.
pub const SLICE_LEN_PREFIX_SIZE: u64 = 4;

/// The complexity of one credential carrying `num_signatures` signatures.
pub fn meter_credential(num_signatures: usize) -> Dimensions {
    let signature_bytes = 65u64;
    let n = num_signatures as u64;
    Dimensions::new(
        SLICE_LEN_PREFIX_SIZE + n * signature_bytes,
        0,
        0,
        n * SIG_VERIFY_COMPUTE,
    )
}

/// The complexity of one input: its encoded size plus the read and delete
/// of the UTXO it consumes.
pub fn meter_input(input: &TransferInput) -> Dimensions {
    Dimensions::new(
        codec::encoded_size(input) as u64,
        INPUT_DB_READ,
        INPUT_DB_WRITE,
        0,
    )
}

/// The complexity of one output: its encoded size plus the write that
/// materializes it.
pub fn meter_output(output: &TransferOutput) -> Dimensions {
    Dimensions::new(codec::encoded_size(output) as u64, 0, OUTPUT_DB_WRITE, 0)
}

/// Meters a whole transaction: unsigned bytes as bandwidth, then
/// credentials, then per-input and per-output costs with their bandwidth
/// zeroed (already counted in the unsigned bytes).
pub fn meter_tx(
    tx: &Tx,
    all_outputs: &[TransferOutput],
    all_inputs: &[TransferInput],
) -> Dimensions {
    let mut complexity = Dimensions::EMPTY;
    complexity.set(
        Dimension::Bandwidth,
        tx.unsigned_bytes().len() as u64,
    );

    for credential in &tx.credentials {
        complexity = complexity.saturating_add(&meter_credential(credential.signatures.len()));
    }
    complexity.set(
        Dimension::Bandwidth,
        complexity.get(Dimension::Bandwidth) + VERSION_SIZE + SLICE_LEN_PREFIX_SIZE,
    );

    for input in all_inputs {
        let mut dims = meter_input(input);
        dims.set(Dimension::Bandwidth, 0);
        complexity = complexity.saturating_add(&dims);
    }
    for output in all_outputs {
        let mut dims = meter_output(output);
        dims.set(Dimension::Bandwidth, 0);
        complexity = complexity.saturating_add(&dims);
    }
    complexity
}

#[cfg(test)]
mod tests {
    use super::*;
    use trellis_types::ids::{AssetId, TxId, UtxoId};
    use trellis_types::tx::{BaseTx, BaseTxFields, Credential, UnsignedTx};
    use trellis_types::utxo::OutputOwners;

    fn sample_tx(num_inputs: usize, num_sigs: usize) -> Tx {
        let inputs = (0..num_inputs)
            .map(|i| TransferInput {
                utxo_id: UtxoId {
                    tx_id: TxId([i as u8; 32]),
                    output_index: 0,
                },
                asset_id: AssetId([1; 32]),
                amount: 10,
                sig_indices: vec![0],
            })
            .collect();
        Tx {
            version: 0,
            unsigned: UnsignedTx::Base(BaseTx {
                base: BaseTxFields {
                    network_id: 0,
                    chain_id: Default::default(),
                    inputs,
                    outputs: vec![],
                    memo: vec![],
                },
            }),
            credentials: (0..num_inputs)
                .map(|_| Credential {
                    signatures: vec![vec![0u8; 65]; num_sigs],
                })
                .collect(),
        }
    }

    #[test]
    fn inputs_cost_reads_and_writes_but_no_extra_bandwidth() {
        let one = sample_tx(1, 1);
        let two = sample_tx(2, 1);
        let base = one.unsigned.base_fields().unwrap();
        let base2 = two.unsigned.base_fields().unwrap();
        let m1 = meter_tx(&one, &[], &base.inputs);
        let m2 = meter_tx(&two, &[], &base2.inputs);

        assert_eq!(
            m2.get(Dimension::DbRead) - m1.get(Dimension::DbRead),
            INPUT_DB_READ
        );
        assert_eq!(
            m2.get(Dimension::DbWrite) - m1.get(Dimension::DbWrite),
            INPUT_DB_WRITE
        );
        // The extra input's bandwidth shows up through the unsigned bytes
        // and the extra credential, never double-counted per input.
        let unsigned_growth = two.unsigned_bytes().len() - one.unsigned_bytes().len();
        let cred_growth = meter_credential(1).get(Dimension::Bandwidth);
        assert_eq!(
            m2.get(Dimension::Bandwidth) - m1.get(Dimension::Bandwidth),
            unsigned_growth as u64 + cred_growth
        );
    }

    #[test]
    fn signatures_drive_compute() {
        let tx = sample_tx(1, 3);
        let base = tx.unsigned.base_fields().unwrap();
        let m = meter_tx(&tx, &[], &base.inputs);
        assert_eq!(m.get(Dimension::Compute), 3 * SIG_VERIFY_COMPUTE);
    }

    #[test]
    fn outputs_cost_one_write_each() {
        let tx = sample_tx(0, 0);
        let outputs = vec![
            TransferOutput {
                asset_id: AssetId([1; 32]),
                amount: 5,
                owners: OutputOwners::default(),
            };
            3
        ];
        let m = meter_tx(&tx, &outputs, &[]);
        assert_eq!(m.get(Dimension::DbWrite), 3 * OUTPUT_DB_WRITE);
    }
}
