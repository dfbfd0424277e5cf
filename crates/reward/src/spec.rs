//! Reward breakdown types.

use kaia_types::{Address, Kei};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Supply-relevant totals of a block (or a range of blocks).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RewardSummary {
    pub minted: Kei,
    pub total_fee: Kei,
    pub burnt_fee: Kei,
}

/// Who receives what in a block.
///
/// `minted + total_fee - burnt_fee == proposer + stakers + fund1 + fund2`,
/// and the same amount is spread over `rewards`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RewardSpec {
    pub minted: Kei,
    pub total_fee: Kei,
    pub burnt_fee: Kei,
    pub proposer: Kei,
    pub stakers: Kei,
    pub fund1: Kei,
    pub fund2: Kei,
    /// Balance credits; only strictly positive amounts are present.
    pub rewards: BTreeMap<Address, Kei>,
}

impl RewardSpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Credit `amount` to `addr`, merging with any existing credit.
    pub fn increase_account(&mut self, addr: Address, amount: Kei) {
        if amount == 0 {
            return;
        }
        let entry = self.rewards.entry(addr).or_insert(0);
        *entry = entry.saturating_add(amount);
    }

    /// Fold `other` into `self`. Associative and commutative.
    pub fn add(&mut self, other: &RewardSpec) {
        self.minted = self.minted.saturating_add(other.minted);
        self.total_fee = self.total_fee.saturating_add(other.total_fee);
        self.burnt_fee = self.burnt_fee.saturating_add(other.burnt_fee);
        self.proposer = self.proposer.saturating_add(other.proposer);
        self.stakers = self.stakers.saturating_add(other.stakers);
        self.fund1 = self.fund1.saturating_add(other.fund1);
        self.fund2 = self.fund2.saturating_add(other.fund2);
        for (addr, amount) in &other.rewards {
            self.increase_account(*addr, *amount);
        }
    }

    pub fn summary(&self) -> RewardSummary {
        RewardSummary {
            minted: self.minted,
            total_fee: self.total_fee,
            burnt_fee: self.burnt_fee,
        }
    }

    /// Total paid out: `proposer + stakers + fund1 + fund2`.
    pub fn distributed(&self) -> Kei {
        self.proposer + self.stakers + self.fund1 + self.fund2
    }

    /// Sum of every balance credit.
    pub fn credited(&self) -> Kei {
        self.rewards.values().sum()
    }
}
