//! Staking snapshot lookup.

use crate::errors::StakingError;
use crate::info::StakingInfo;
use anyhow::Result;
use kaia_types::{ChainConfig, Fork};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Source of staking snapshots keyed by the block they govern.
pub trait StakingModule: Send + Sync {
    /// Staking snapshot effective for block `num`, or `None` if the node has
    /// no staking data for it (e.g. before the staking contracts existed).
    fn staking_info(&self, num: u64) -> Result<Option<Arc<StakingInfo>>>;
}

/// Staking snapshot refresh schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakingConfig {
    /// Blocks between staking snapshots before Kaia.
    pub update_interval: u64,
}

impl Default for StakingConfig {
    fn default() -> Self {
        Self {
            update_interval: 86_400,
        }
    }
}

impl StakingConfig {
    pub fn new(update_interval: u64) -> Result<Self, StakingError> {
        let config = Self { update_interval };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), StakingError> {
        if self.update_interval == 0 {
            return Err(StakingError::ZeroInterval);
        }
        Ok(())
    }

    /// Block whose staking snapshot governs block `num`.
    ///
    /// Before Kaia snapshots lag by one to two intervals; from Kaia the
    /// parent block's staking state is used.
    pub fn staking_block_number(&self, num: u64, fork: Fork) -> u64 {
        if fork >= Fork::Kaia {
            return num.saturating_sub(1);
        }

        let interval = self.update_interval;
        if num <= 2 * interval {
            return 0;
        }
        if num % interval == 0 {
            num - 2 * interval
        } else {
            num - interval - num % interval
        }
    }
}

/// Staking snapshots held in memory, keyed by snapshot block.
///
/// A lookup for block `num` returns the latest snapshot at or below the
/// block that governs `num`: `num` itself, or the staking block number when
/// a schedule is attached.
#[derive(Default)]
pub struct MemoryStakingModule {
    snapshots: RwLock<BTreeMap<u64, Arc<StakingInfo>>>,
    schedule: Option<(StakingConfig, ChainConfig)>,
}

impl MemoryStakingModule {
    pub fn new() -> Self {
        Self::default()
    }

    /// A module that resolves lookups through the staking update schedule.
    pub fn scheduled(config: StakingConfig, chain: ChainConfig) -> Result<Self, StakingError> {
        config.validate()?;
        Ok(Self {
            snapshots: RwLock::new(BTreeMap::new()),
            schedule: Some((config, chain)),
        })
    }

    pub fn insert(&self, from_block: u64, info: StakingInfo) {
        self.snapshots.write().insert(from_block, Arc::new(info));
    }

    fn governing_block(&self, num: u64) -> u64 {
        match &self.schedule {
            Some((config, chain)) => config.staking_block_number(num, chain.fork_at(num)),
            None => num,
        }
    }
}

impl StakingModule for MemoryStakingModule {
    fn staking_info(&self, num: u64) -> Result<Option<Arc<StakingInfo>>> {
        let target = self.governing_block(num);
        Ok(self
            .snapshots
            .read()
            .range(..=target)
            .next_back()
            .map(|(_, info)| Arc::clone(info)))
    }
}
