//! Kaia block rewards
//!
//! Computes, for any block, how much was minted, how much of the
//! transaction fee was burnt, and who received the rest. The formulas
//! branch on hardfork (Magma, Kore, Kaia), on proposer policy (simple or
//! full) and on whether fees are deferred to the end of the block.

pub mod api;
pub mod config;
pub mod distribution;
pub mod engine;
pub mod errors;
pub mod fee;
pub mod params;
pub mod ratio;
pub mod spec;

pub use api::{AccumulatedRewards, RewardApi, RewardApiConfig};
pub use config::RewardConfig;
pub use distribution::{
    assign_staking_rewards, calc_deferred_reward, calc_deferred_reward_full, calc_deferred_reward_simple,
};
pub use engine::{RewardEngine, RewardSummarySource};
pub use errors::RewardError;
pub use fee::{burn_amount, burn_amount_magma, total_fee};
pub use params::{GovModule, MemoryGovModule, ParamSet, ProposerPolicy};
pub use ratio::{Kip82Ratio, RatioSplit, RewardRatio};
pub use spec::{RewardSpec, RewardSummary};
