// Path: crates/api/src/lib.rs
//! Trait seams of the Trellis platform chain.
//!
//! This crate defines the narrow interfaces through which the executor core
//! talks to its collaborators: committed chain state and staged diffs,
//! shared atomic memory, the credential-verification feature extension, the
//! reward calculator, the on-accept chain registrar, and cancellation. The
//! concrete implementations live in `trellis-state` and in the embedding
//! node; tests substitute mocks.

pub mod cancel;
pub mod chain;
pub mod fx;
pub mod reward;
pub mod shared_memory;
pub mod state;

pub use cancel::CancelToken;
pub use chain::ChainRegistrar;
pub use fx::Fx;
pub use reward::RewardCalculator;
pub use shared_memory::{AtomicElement, AtomicRequests, SharedMemory};
pub use state::{ChainDiff, ChainState, StakerIter};
