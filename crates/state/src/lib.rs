// Path: crates/state/src/lib.rs
//! State machinery of the Trellis platform chain.
//!
//! Three layers: [`StakerBook`] keeps stakers in their consensus order with
//! the secondary indexes the verifiers need; [`MemoryState`] is the
//! committed store (backing tests and light deployments) including the
//! validator diff log; [`Diff`] is the staged overlay the executor mutates,
//! applied to the store atomically or dropped.

pub mod diff;
pub mod keys;
pub mod stakers;
pub mod store;

pub use diff::Diff;
pub use stakers::{StakerBook, StakerSortKey};
pub use store::MemoryState;
