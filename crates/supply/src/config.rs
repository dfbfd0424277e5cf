//! Supply engine settings.

use crate::errors::SupplyError;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SupplyConfig {
    /// Blocks between persisted checkpoints.
    pub checkpoint_interval: u64,
    /// Blocks between catch-up progress reports.
    pub log_interval: u64,
    /// Replayed historical checkpoints kept in memory.
    pub checkpoint_cache_size: u64,
    /// Rebalance memos kept in memory.
    pub memo_cache_size: u64,
    /// Longest wait for the catch-up task on shutdown.
    pub shutdown_timeout_ms: u64,
}

impl Default for SupplyConfig {
    fn default() -> Self {
        Self {
            checkpoint_interval: 128,
            log_interval: 102_400,
            checkpoint_cache_size: 86_400,
            memo_cache_size: 16,
            shutdown_timeout_ms: 5_000,
        }
    }
}

impl SupplyConfig {
    /// Load from an optional file, overridden by `KAIA_SUPPLY_*` variables.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = ::config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(::config::File::from(path));
        }
        builder = builder.add_source(::config::Environment::with_prefix("KAIA_SUPPLY").try_parsing(true));
        let config: Self = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), SupplyError> {
        if self.checkpoint_interval == 0 {
            return Err(SupplyError::InvalidConfig("checkpoint_interval must be positive"));
        }
        if self.log_interval == 0 {
            return Err(SupplyError::InvalidConfig("log_interval must be positive"));
        }
        if self.checkpoint_cache_size == 0 || self.memo_cache_size == 0 {
            return Err(SupplyError::InvalidConfig("cache sizes must be positive"));
        }
        Ok(())
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }

    /// Highest checkpoint boundary at or below `num`.
    pub fn boundary_at_or_below(&self, num: u64) -> u64 {
        num - num % self.checkpoint_interval
    }

    pub fn is_boundary(&self, num: u64) -> bool {
        num % self.checkpoint_interval == 0
    }
}
