//! Chain primitives shared by reward, staking and supply accounting.

pub mod address;
pub mod block;
pub mod chain_state;
pub mod fork;
pub mod receipt;
pub mod transaction;

pub use address::*;
pub use block::*;
pub use chain_state::*;
pub use fork::*;
pub use receipt::*;
pub use transaction::*;
