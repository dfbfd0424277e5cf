//! Kaia staking snapshots
//!
//! Raw staking-contract figures are merged into logical validator nodes (one
//! per reward address) and summarized by a Gini coefficient over their
//! stakes. Node order is significant: proposer selection consumes it.

pub mod errors;
pub mod gini;
pub mod info;
pub mod module;

pub use errors::*;
pub use gini::*;
pub use info::*;
pub use module::*;
