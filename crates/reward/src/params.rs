//! Governance parameter sets consumed by the reward engine.

use anyhow::Result;
use kaia_types::Kei;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Proposer selection policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProposerPolicy {
    RoundRobin,
    Sticky,
    WeightedRandom,
}

impl ProposerPolicy {
    /// Round-robin and sticky pay everything to the rewardbase.
    pub fn is_simple(&self) -> bool {
        matches!(self, ProposerPolicy::RoundRobin | ProposerPolicy::Sticky)
    }
}

/// Effective governance parameters at a block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamSet {
    pub proposer_policy: ProposerPolicy,
    /// Fixed gas price before Magma, in kei.
    pub unit_price: u64,
    /// Newly minted kei per block.
    pub minting_amount: Kei,
    /// Minimum stake of a consensus node, whole tokens.
    pub minimum_stake: u64,
    pub deferred_tx_fee: bool,
    /// `"validators/fund1/fund2"`
    pub ratio: String,
    /// `"proposer/stakers"`, consulted from Kore.
    pub kip82_ratio: String,
}

impl Default for ParamSet {
    fn default() -> Self {
        Self {
            proposer_policy: ProposerPolicy::WeightedRandom,
            unit_price: 25_000_000_000,
            minting_amount: 6_400_000_000_000_000_000,
            minimum_stake: 5_000_000,
            deferred_tx_fee: true,
            ratio: "50/40/10".to_string(),
            kip82_ratio: "20/80".to_string(),
        }
    }
}

/// Source of effective governance parameters.
pub trait GovModule: Send + Sync {
    fn effective_param_set(&self, num: u64) -> Result<ParamSet>;
}

/// Parameter sets held in memory, each effective from its key onward.
pub struct MemoryGovModule {
    sets: RwLock<BTreeMap<u64, ParamSet>>,
}

impl MemoryGovModule {
    /// A module whose `genesis` set applies from block 0.
    pub fn new(genesis: ParamSet) -> Self {
        let mut sets = BTreeMap::new();
        sets.insert(0, genesis);
        Self {
            sets: RwLock::new(sets),
        }
    }

    /// Make `params` effective from block `from` onward.
    pub fn set_from(&self, from: u64, params: ParamSet) {
        self.sets.write().insert(from, params);
    }
}

impl GovModule for MemoryGovModule {
    fn effective_param_set(&self, num: u64) -> Result<ParamSet> {
        self.sets
            .read()
            .range(..=num)
            .next_back()
            .map(|(_, params)| params.clone())
            .ok_or_else(|| anyhow::anyhow!("no parameter set effective at block {num}"))
    }
}
