// Path: crates/api/src/fx.rs
//! The credential-verification feature extension.
//!
//! Cryptographic primitive implementations are outside the executor core;
//! this seam is how the executor asks "does this credential satisfy this
//! owner predicate for these bytes". Rejection reasons are plain strings,
//! wrapped into the caller's error domain.

use trellis_types::tx::{Credential, SubnetAuth};
use trellis_types::utxo::{OutputOwners, TransferInput};

/// Verifies credentials against owner predicates.
pub trait Fx {
    /// Verifies that `credential` authorizes spending a UTXO guarded by
    /// `owners`, as claimed by `input`, for the transaction with the given
    /// unsigned bytes.
    fn verify_transfer(
        &self,
        unsigned_bytes: &[u8],
        input: &TransferInput,
        credential: &Credential,
        owners: &OutputOwners,
    ) -> Result<(), String>;

    /// Verifies that `credential` authorizes a subnet (or staker)
    /// modification guarded by `owners`, with `auth` selecting the signing
    /// owner addresses.
    fn verify_permission(
        &self,
        unsigned_bytes: &[u8],
        auth: &SubnetAuth,
        credential: &Credential,
        owners: &OutputOwners,
    ) -> Result<(), String>;
}
