// Path: crates/types/src/ids.rs
//! Fixed-size identifier newtypes used throughout the platform chain.
//!
//! All 32-byte ids (transactions, subnets, blockchains, assets, blocks) are
//! distinct newtypes rather than a shared alias so that a subnet id can never
//! be passed where a chain id is expected. Node ids and addresses are 20
//! bytes. Every id displays as lowercase hex.

use parity_scale_codec::{Decode, Encode};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

macro_rules! impl_id_common {
    ($name:ident, $len:expr) => {
        impl $name {
            /// Byte length of this identifier.
            pub const LEN: usize = $len;

            /// Returns the raw bytes.
            pub fn as_bytes(&self) -> &[u8; $len] {
                &self.0
            }
        }

        impl AsRef<[u8]> for $name {
            fn as_ref(&self) -> &[u8] {
                &self.0
            }
        }

        impl From<[u8; $len]> for $name {
            fn from(bytes: [u8; $len]) -> Self {
                Self(bytes)
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, "{}", hex::encode(self.0))
            }
        }
    };
}

/// A 32-byte transaction identifier: the SHA-256 of the transaction's
/// canonical unsigned bytes.
#[derive(
    Encode,
    Decode,
    Serialize,
    Deserialize,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Debug,
    Default,
    Hash,
)]
pub struct TxId(pub [u8; 32]);
impl_id_common!(TxId, 32);

/// A 32-byte subnet identifier. A subnet is created by a `CreateSubnetTx`
/// and is identified by that transaction's id.
#[derive(
    Encode,
    Decode,
    Serialize,
    Deserialize,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Debug,
    Default,
    Hash,
)]
pub struct SubnetId(pub [u8; 32]);
impl_id_common!(SubnetId, 32);

impl SubnetId {
    /// The primary network: the distinguished subnet every validator belongs
    /// to. Encoded as the all-zero id.
    pub const PRIMARY: Self = Self([0; 32]);
}

/// A 32-byte blockchain identifier. A chain is created by a `CreateChainTx`
/// and is identified by that transaction's id.
#[derive(
    Encode,
    Decode,
    Serialize,
    Deserialize,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Debug,
    Default,
    Hash,
)]
pub struct ChainId(pub [u8; 32]);
impl_id_common!(ChainId, 32);

impl ChainId {
    /// The platform chain itself. Encoded as the all-zero id.
    pub const PLATFORM: Self = Self([0; 32]);
}

/// A 32-byte asset identifier.
#[derive(
    Encode,
    Decode,
    Serialize,
    Deserialize,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Debug,
    Default,
    Hash,
)]
pub struct AssetId(pub [u8; 32]);
impl_id_common!(AssetId, 32);

/// A 32-byte block identifier.
#[derive(
    Encode,
    Decode,
    Serialize,
    Deserialize,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Debug,
    Default,
    Hash,
)]
pub struct BlockId(pub [u8; 32]);
impl_id_common!(BlockId, 32);

/// A 32-byte virtual machine identifier, named by a `CreateChainTx`.
#[derive(
    Encode,
    Decode,
    Serialize,
    Deserialize,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Debug,
    Default,
    Hash,
)]
pub struct VmId(pub [u8; 32]);
impl_id_common!(VmId, 32);

/// A 20-byte staking node identifier.
#[derive(
    Encode,
    Decode,
    Serialize,
    Deserialize,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Debug,
    Default,
    Hash,
)]
pub struct NodeId(pub [u8; 20]);
impl_id_common!(NodeId, 20);

impl NodeId {
    /// The empty node id. Staker transactions naming it are rejected.
    pub const EMPTY: Self = Self([0; 20]);
}

/// A 20-byte payment address, as referenced by output owner predicates.
#[derive(
    Encode,
    Decode,
    Serialize,
    Deserialize,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Debug,
    Default,
    Hash,
)]
pub struct Address(pub [u8; 20]);
impl_id_common!(Address, 20);

/// An opaque 48-byte BLS public key. Key validation and signature
/// verification live behind the crypto seam; the platform chain only stores
/// and compares these bytes.
#[derive(Encode, Decode, Clone, Copy, PartialEq, Eq, Debug, Hash)]
pub struct BlsPublicKey(pub [u8; 48]);

impl BlsPublicKey {
    /// Returns the raw bytes.
    pub fn as_bytes(&self) -> &[u8; 48] {
        &self.0
    }
}

impl core::fmt::Display for BlsPublicKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

/// The pair (originating transaction, output index) naming one UTXO.
#[derive(
    Encode,
    Decode,
    Serialize,
    Deserialize,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Debug,
    Default,
    Hash,
)]
pub struct UtxoId {
    /// The transaction that produced the output.
    pub tx_id: TxId,
    /// The index of the output within that transaction.
    pub output_index: u32,
}

impl UtxoId {
    /// Derives the unique 32-byte key of the referenced UTXO:
    /// `sha256(tx_id ‖ be32(output_index))`. This key is what shared memory
    /// and the UTXO namespace are indexed by.
    pub fn input_id(&self) -> UtxoKey {
        let mut hasher = Sha256::new();
        hasher.update(self.tx_id.0);
        hasher.update(self.output_index.to_be_bytes());
        UtxoKey(hasher.finalize().into())
    }
}

impl core::fmt::Display for UtxoId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}:{}", self.tx_id, self.output_index)
    }
}

/// The 32-byte hash key uniquely identifying a UTXO in state and in shared
/// memory.
#[derive(
    Encode,
    Decode,
    Serialize,
    Deserialize,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Debug,
    Default,
    Hash,
)]
pub struct UtxoKey(pub [u8; 32]);
impl_id_common!(UtxoKey, 32);

/// Hashes arbitrary canonical bytes into a 32-byte id. Used to derive
/// transaction ids from unsigned bytes.
pub fn hash_id(bytes: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hasher.finalize().into()
}
