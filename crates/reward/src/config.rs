//! Per-block economic rules, validated once at construction.

use crate::errors::RewardError;
use crate::params::{ParamSet, ProposerPolicy};
use crate::ratio::{Kip82Ratio, RewardRatio};
use kaia_types::{Fork, Kei, Rules};

/// Immutable snapshot of the reward rules that apply to one block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewardConfig {
    pub fork: Fork,
    pub policy: ProposerPolicy,
    pub minting_amount: Kei,
    /// Whole-token units.
    pub minimum_stake: u64,
    pub deferred_tx_fee: bool,
    /// Only meaningful before Magma.
    pub unit_price: u64,
    pub ratio: RewardRatio,
    /// Parsed from Kore onward; all-proposer before.
    pub kip82: Kip82Ratio,
}

impl RewardConfig {
    /// Parse and validate `params` for a block governed by `rules`.
    ///
    /// Malformed ratio strings are rejected here so that per-block
    /// arithmetic never fails on configuration.
    pub fn new(rules: Rules, params: &ParamSet) -> Result<Self, RewardError> {
        let fork = rules.fork();
        let ratio: RewardRatio = params.ratio.parse()?;
        let kip82 = if fork >= Fork::Kore {
            params.kip82_ratio.parse()?
        } else {
            Kip82Ratio::default()
        };

        Ok(Self {
            fork,
            policy: params.proposer_policy,
            minting_amount: params.minting_amount,
            minimum_stake: params.minimum_stake,
            deferred_tx_fee: params.deferred_tx_fee,
            unit_price: params.unit_price,
            ratio,
            kip82,
        })
    }

    pub fn is_magma(&self) -> bool {
        self.fork >= Fork::Magma
    }

    pub fn is_kore(&self) -> bool {
        self.fork >= Fork::Kore
    }

    pub fn is_kaia(&self) -> bool {
        self.fork >= Fork::Kaia
    }

    /// What the proposer would mint this block: the KIP-82 proposer part of
    /// the validators' part of minting, truncating at each step.
    pub fn proposer_minting_share(&self) -> Kei {
        let validators = self.ratio.split(self.minting_amount).validators;
        self.kip82.split(validators).0
    }
}
