// Path: crates/types/src/codec.rs
//! The canonical, deterministic binary codec for consensus-critical data.
//!
//! All state entries, transaction bytes, and validator diffs are encoded with
//! SCALE (`parity-scale-codec`): compact, deterministic, and with no
//! self-describing overhead. Centralizing the wrappers here keeps every
//! component on the exact same byte representation; two nodes disagreeing on
//! the encoding of a staker is a consensus split.

use crate::error::StateError;
use parity_scale_codec::{Decode, DecodeAll, Encode};

/// Encodes a value into its canonical byte representation.
///
/// Use this for anything written to state, hashed into an id, or shipped
/// through shared memory.
pub fn to_bytes_canonical<T: Encode>(v: &T) -> Vec<u8> {
    v.encode()
}

/// Decodes a value from its canonical byte representation, rejecting
/// trailing bytes.
///
/// Fails fast on malformed input; a decode failure on data read back from
/// state indicates corruption and is never silently tolerated.
pub fn from_bytes_canonical<T: Decode>(b: &[u8]) -> Result<T, StateError> {
    T::decode_all(&mut &*b).map_err(|e| StateError::Decode(e.to_string()))
}

/// The canonical encoded size of a value, without materializing the bytes.
pub fn encoded_size<T: Encode>(v: &T) -> usize {
    v.encoded_size()
}
