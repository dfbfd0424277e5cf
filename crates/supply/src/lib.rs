//! Kaia supply accounting
//!
//! Keeps a running `{minted, burnt_fee}` checkpoint for the chain head,
//! persists it periodically, re-derives historical checkpoints on demand
//! and composes the total supply with the canonical and rebalance burns.

pub mod checkpoint;
pub mod config;
pub mod errors;
pub mod manager;
pub mod rebalance;
pub mod total_supply;

pub use checkpoint::{accumulate_checkpoint, genesis_checkpoint};
pub use config::SupplyConfig;
pub use errors::{JoinedErrors, SupplyError};
pub use manager::{SupplyManager, SupplyState};
pub use rebalance::{parse_memo, ContractCaller, MemoryContractCaller, RebalanceBurns, RebalanceMemo, MEMO_METHOD};
pub use total_supply::{TotalSupply, TotalSupplyResponse};
