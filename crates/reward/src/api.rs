//! Read-only reward queries served to the RPC layer.

use crate::engine::RewardEngine;
use crate::errors::RewardError;
use crate::spec::RewardSpec;
use anyhow::Result;
use kaia_types::BlockNumber;
use parking_lot::Mutex;
use rayon::{ThreadPool, ThreadPoolBuilder};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

/// Limits of the reward query API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RewardApiConfig {
    /// Longest block range accepted by `rewards_accumulated`.
    pub max_accumulated_range: u64,
    /// Aggregation workers; 0 uses every available core.
    pub workers: usize,
}

impl Default for RewardApiConfig {
    fn default() -> Self {
        Self {
            max_accumulated_range: 604_800,
            workers: 0,
        }
    }
}

impl RewardApiConfig {
    /// Load from an optional file, overridden by `KAIA_REWARD_*` variables.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = ::config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(::config::File::from(path));
        }
        builder = builder.add_source(::config::Environment::with_prefix("KAIA_REWARD").try_parsing(true));
        Ok(builder.build()?.try_deserialize()?)
    }

    pub fn worker_count(&self) -> usize {
        if self.workers == 0 {
            num_cpus::get().max(1)
        } else {
            self.workers
        }
    }
}

/// Rewards merged over a block range, with the range's endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccumulatedRewards {
    pub first_block_time: u64,
    pub last_block_time: u64,
    pub first_block: u64,
    pub last_block: u64,
    #[serde(flatten)]
    pub spec: RewardSpec,
}

pub struct RewardApi {
    engine: Arc<RewardEngine>,
    config: RewardApiConfig,
    pool: ThreadPool,
}

impl RewardApi {
    pub fn new(engine: Arc<RewardEngine>, config: RewardApiConfig) -> Result<Self, RewardError> {
        let workers = config.worker_count();
        let pool = ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("reward-accumulator-{i}"))
            .build()
            .map_err(|e| RewardError::WorkerPool(e.to_string()))?;
        info!(target: "reward", workers, max_range = config.max_accumulated_range, "reward api ready");
        Ok(Self { engine, config, pool })
    }

    pub fn config(&self) -> &RewardApiConfig {
        &self.config
    }

    pub fn block_reward(&self, number: BlockNumber) -> Result<RewardSpec, RewardError> {
        let num = number.resolve(self.engine.chain().current_number());
        self.engine.block_reward(num)
    }

    /// Rewards of every block in `[lower, upper]`, merged.
    ///
    /// Blocks are fanned out over the worker pool. The first failure is
    /// returned once every dispatched block has finished; workers stop
    /// picking up new blocks after a failure.
    pub fn rewards_accumulated(
        &self,
        lower: BlockNumber,
        upper: BlockNumber,
    ) -> Result<AccumulatedRewards, RewardError> {
        let head = self.engine.chain().current_number();
        let lower = lower.resolve(head);
        let upper = upper.resolve(head);

        if lower > upper {
            return Err(RewardError::InvertedRange { lower, upper });
        }
        if upper > head {
            return Err(RewardError::BeyondHead { upper, head });
        }
        let len = upper - lower + 1;
        if len > self.config.max_accumulated_range {
            return Err(RewardError::RangeTooLarge {
                len,
                max: self.config.max_accumulated_range,
            });
        }

        let first = self
            .engine
            .chain()
            .header_by_number(lower)
            .ok_or(RewardError::BlockNotFound(lower))?;
        let last = self
            .engine
            .chain()
            .header_by_number(upper)
            .ok_or(RewardError::BlockNotFound(upper))?;

        let next = AtomicU64::new(lower);
        let failed = AtomicBool::new(false);
        let total = Mutex::new(RewardSpec::new());
        let first_error: Mutex<Option<RewardError>> = Mutex::new(None);
        let workers = self.pool.current_num_threads().min(len as usize).max(1);

        self.pool.scope(|scope| {
            for _ in 0..workers {
                scope.spawn(|_| loop {
                    if failed.load(Ordering::Acquire) {
                        break;
                    }
                    let num = next.fetch_add(1, Ordering::AcqRel);
                    if num > upper {
                        break;
                    }
                    match self.engine.block_reward(num) {
                        Ok(spec) => total.lock().add(&spec),
                        Err(err) => {
                            failed.store(true, Ordering::Release);
                            first_error.lock().get_or_insert(err);
                            break;
                        }
                    }
                });
            }
        });

        if let Some(err) = first_error.into_inner() {
            return Err(err);
        }

        debug!(target: "reward", lower, upper, workers, "accumulated rewards");
        Ok(AccumulatedRewards {
            first_block_time: first.time,
            last_block_time: last.time,
            first_block: lower,
            last_block: upper,
            spec: total.into_inner(),
        })
    }
}
