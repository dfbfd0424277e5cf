//! Supply checkpoint manager.
//!
//! Tracks `{last_num, checkpoint}` for the chain head, advancing one block
//! per insertion and persisting every `checkpoint_interval` blocks. A
//! background task catches up when the persisted frontier lags the head at
//! start. Historical checkpoints are re-derived on demand from the nearest
//! persisted boundary.

use crate::checkpoint::{accumulate_checkpoint, genesis_checkpoint, replay};
use crate::config::SupplyConfig;
use crate::errors::SupplyError;
use crate::rebalance::{ContractCaller, RebalanceBurns};
use crate::total_supply::{compose, TotalSupply, TotalSupplyResponse};
use kaia_reward::RewardSummarySource;
use kaia_storage::{SupplyCheckpoint, SupplyStore};
use kaia_types::{BlockNumber, Chain};
use moka::sync::Cache as MokaCache;
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Lifecycle of the supply manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SupplyState {
    Stopped,
    Loading,
    Running,
}

/// Accumulated totals at the tracked head.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Frontier {
    last_num: u64,
    checkpoint: SupplyCheckpoint,
}

struct Inner {
    chain: Arc<dyn Chain>,
    rewards: Arc<dyn RewardSummarySource>,
    store: Arc<dyn SupplyStore>,
    config: SupplyConfig,
    state: Mutex<SupplyState>,
    frontier: Mutex<Option<Frontier>>,
    checkpoint_cache: MokaCache<u64, SupplyCheckpoint>,
    rebalance: RebalanceBurns,
    stop: AtomicBool,
    catching_up: AtomicBool,
    catch_up_task: Mutex<Option<JoinHandle<()>>>,
}

/// Cheap to clone; clones share the same state.
#[derive(Clone)]
pub struct SupplyManager {
    inner: Arc<Inner>,
}

impl SupplyManager {
    pub fn new(
        chain: Arc<dyn Chain>,
        rewards: Arc<dyn RewardSummarySource>,
        store: Arc<dyn SupplyStore>,
        caller: Arc<dyn ContractCaller>,
        config: SupplyConfig,
    ) -> Result<Self, SupplyError> {
        config.validate()?;
        let checkpoint_cache = MokaCache::builder()
            .max_capacity(config.checkpoint_cache_size)
            .build();
        let rebalance = RebalanceBurns::new(caller, config.memo_cache_size);

        Ok(Self {
            inner: Arc::new(Inner {
                chain,
                rewards,
                store,
                config,
                state: Mutex::new(SupplyState::Stopped),
                frontier: Mutex::new(None),
                checkpoint_cache,
                rebalance,
                stop: AtomicBool::new(false),
                catching_up: AtomicBool::new(false),
                catch_up_task: Mutex::new(None),
            }),
        })
    }

    pub fn state(&self) -> SupplyState {
        *self.inner.state.lock()
    }

    pub fn config(&self) -> &SupplyConfig {
        &self.inner.config
    }

    /// Block number of the in-memory checkpoint, once loaded.
    pub fn last_number(&self) -> Option<u64> {
        self.inner.frontier.lock().map(|f| f.last_num)
    }

    pub fn is_catching_up(&self) -> bool {
        self.inner.catching_up.load(Ordering::Acquire)
    }

    /// Load the persisted frontier (or bootstrap genesis) and start tracking.
    ///
    /// Spawns the catch-up task on the blocking pool if the frontier lags
    /// the chain head. Must be called within a tokio runtime.
    pub async fn start(&self) -> Result<(), SupplyError> {
        {
            let mut state = self.inner.state.lock();
            if *state != SupplyState::Stopped {
                warn!(target: "supply", state = ?*state, "supply manager already started");
                return Ok(());
            }
            *state = SupplyState::Loading;
        }

        self.inner.checkpoint_cache.invalidate_all();
        self.inner.rebalance.clear();
        self.inner.stop.store(false, Ordering::Release);

        let frontier = match self.inner.load_frontier() {
            Ok(frontier) => frontier,
            Err(err) => {
                *self.inner.state.lock() = SupplyState::Stopped;
                return Err(err);
            }
        };
        *self.inner.frontier.lock() = Some(frontier);

        let head = self.inner.chain.current_number();
        info!(
            target: "supply",
            last = frontier.last_num,
            head,
            "supply manager started"
        );

        if head > frontier.last_num {
            self.inner.catching_up.store(true, Ordering::Release);
            let inner = Arc::clone(&self.inner);
            let handle = tokio::task::spawn_blocking(move || inner.catch_up());
            *self.inner.catch_up_task.lock() = Some(handle);
        }

        *self.inner.state.lock() = SupplyState::Running;
        Ok(())
    }

    /// Signal the catch-up task to stop and wait for it, bounded by
    /// `shutdown_timeout_ms`. Idempotent.
    pub async fn stop(&self) {
        self.inner.stop.store(true, Ordering::Release);
        let handle = self.inner.catch_up_task.lock().take();
        if let Some(handle) = handle {
            match tokio::time::timeout(self.inner.config.shutdown_timeout(), handle).await {
                Ok(Ok(())) => {}
                Ok(Err(err)) => error!(target: "supply", error = %err, "supply catch-up task failed"),
                Err(_) => warn!(
                    target: "supply",
                    timeout_ms = self.inner.config.shutdown_timeout_ms,
                    "supply catch-up did not stop in time"
                ),
            }
        }

        let mut state = self.inner.state.lock();
        if *state != SupplyState::Stopped {
            *state = SupplyState::Stopped;
            info!(target: "supply", "supply manager stopped");
        }
    }

    /// Advance the in-memory checkpoint for a newly inserted block.
    ///
    /// Blocks at or below the frontier are ignored. A gap beyond the next
    /// block is replayed here unless the catch-up task is covering it.
    pub fn on_block_inserted(&self, num: u64) -> Result<(), SupplyError> {
        if self.state() != SupplyState::Running {
            debug!(target: "supply", block = num, "ignoring insertion while not running");
            return Ok(());
        }

        let mut guard = self.inner.frontier.lock();
        let Some(frontier) = guard.as_mut() else {
            return Err(SupplyError::NotRunning);
        };
        if num <= frontier.last_num {
            return Ok(());
        }
        if num > frontier.last_num + 1 {
            if self.is_catching_up() {
                return Ok(());
            }
            warn!(
                target: "supply",
                last = frontier.last_num,
                block = num,
                "gap in inserted blocks, replaying"
            );
        }

        while frontier.last_num < num {
            if self.inner.stop.load(Ordering::Acquire) {
                return Err(SupplyError::Stopped);
            }
            self.inner.advance(frontier)?;
        }
        Ok(())
    }

    /// Handle a reorganization that discarded every block above `new_head`.
    ///
    /// The persisted pointer and the in-memory checkpoint fall back to the
    /// checkpoint boundary at or below `new_head`. Records above it are
    /// left in place and get overwritten as the new branch is processed.
    pub fn on_rewind(&self, new_head: u64) -> Result<(), SupplyError> {
        let boundary = self.inner.config.boundary_at_or_below(new_head);
        let store = &self.inner.store;

        let mut guard = self.inner.frontier.lock();
        let persisted = store
            .read_last_supply_checkpoint_number()
            .map_err(SupplyError::Storage)?;
        if persisted.is_some_and(|last| last > boundary) {
            if let Err(err) = store.write_last_supply_checkpoint_number(boundary) {
                error!(
                    target: "supply",
                    critical = true,
                    block = boundary,
                    error = %err,
                    "failed to rewind supply checkpoint pointer"
                );
                return Err(SupplyError::Storage(err));
            }
        }

        if let Some(frontier) = guard.as_mut() {
            if frontier.last_num > new_head {
                let checkpoint = store
                    .read_supply_checkpoint(boundary)
                    .map_err(SupplyError::Storage)?
                    .ok_or(SupplyError::CheckpointNotFound(boundary))?;
                *frontier = Frontier {
                    last_num: boundary,
                    checkpoint,
                };
            }
        }
        drop(guard);

        self.inner.checkpoint_cache.invalidate_all();
        self.inner.rebalance.clear();
        info!(target: "supply", new_head, boundary, "rewound supply checkpoint");
        Ok(())
    }

    /// Accumulated totals at block `num`.
    ///
    /// Served from the in-memory frontier, an exact persisted record, the
    /// replay cache, or a replay from the nearest lower persisted boundary
    /// (in that order). Replayed results are cached but not persisted.
    pub fn checkpoint(&self, num: u64) -> Result<SupplyCheckpoint, SupplyError> {
        let frontier = self.inner.frontier.lock().ok_or(SupplyError::NotRunning)?;
        if num > frontier.last_num {
            return Err(SupplyError::BeyondFrontier {
                num,
                last: frontier.last_num,
            });
        }
        if num == frontier.last_num {
            return Ok(frontier.checkpoint);
        }

        if let Some(checkpoint) = self.inner.checkpoint_cache.get(&num) {
            return Ok(checkpoint);
        }

        let boundary = self.inner.config.boundary_at_or_below(num);
        let base = self
            .inner
            .store
            .read_supply_checkpoint(boundary)
            .map_err(SupplyError::Storage)?
            .ok_or(SupplyError::CheckpointNotFound(boundary))?;
        if boundary == num {
            return Ok(base);
        }

        let never = AtomicBool::new(false);
        let checkpoint = replay(self.inner.rewards.as_ref(), base, boundary, num, &never)?;
        self.inner.checkpoint_cache.insert(num, checkpoint);
        debug!(target: "supply", block = num, from = boundary, "replayed supply checkpoint");
        Ok(checkpoint)
    }

    /// Full supply breakdown at block `num`.
    pub fn total_supply(&self, num: u64) -> Result<TotalSupply, SupplyError> {
        let checkpoint = self.checkpoint(num)?;
        compose(num, checkpoint, self.inner.chain.as_ref(), &self.inner.rebalance)
    }

    /// RPC entry point.
    ///
    /// With `show_partial`, a partially resolved breakdown is returned with
    /// its joined errors in `error`; otherwise any unresolved component
    /// fails the call.
    pub fn get_total_supply(
        &self,
        number: BlockNumber,
        show_partial: bool,
    ) -> Result<TotalSupplyResponse, SupplyError> {
        let num = number.resolve(self.inner.chain.current_number());
        match self.total_supply(num) {
            Ok(supply) => Ok(TotalSupplyResponse::new(&supply, None)),
            Err(SupplyError::Partial { partial, errors }) if show_partial => {
                Ok(TotalSupplyResponse::new(&partial, Some(errors.to_string())))
            }
            Err(err) => Err(err),
        }
    }
}

impl Inner {
    fn load_frontier(&self) -> Result<Frontier, SupplyError> {
        let last = self
            .store
            .read_last_supply_checkpoint_number()
            .map_err(SupplyError::Storage)?;

        if let Some(last_num) = last {
            let checkpoint = self
                .store
                .read_supply_checkpoint(last_num)
                .map_err(SupplyError::Storage)?
                .ok_or(SupplyError::CheckpointNotFound(last_num))?;
            return Ok(Frontier {
                last_num,
                checkpoint,
            });
        }

        warn!(target: "supply", "no persisted supply checkpoint, bootstrapping from genesis");
        let checkpoint = genesis_checkpoint(self.chain.as_ref())?;
        self.persist(0, &checkpoint)?;
        Ok(Frontier {
            last_num: 0,
            checkpoint,
        })
    }

    /// Advance `frontier` by exactly one block, persisting on boundaries.
    ///
    /// The frontier is left untouched if the write fails.
    fn advance(&self, frontier: &mut Frontier) -> Result<(), SupplyError> {
        let num = frontier.last_num + 1;
        let summary = self.rewards.reward_summary(num)?;
        let checkpoint = accumulate_checkpoint(&frontier.checkpoint, &summary)?;
        if self.config.is_boundary(num) {
            self.persist(num, &checkpoint)?;
        }
        *frontier = Frontier {
            last_num: num,
            checkpoint,
        };
        Ok(())
    }

    fn persist(&self, num: u64, checkpoint: &SupplyCheckpoint) -> Result<(), SupplyError> {
        let written = self
            .store
            .write_supply_checkpoint(num, checkpoint)
            .and_then(|()| self.store.write_last_supply_checkpoint_number(num));
        if let Err(err) = written {
            error!(
                target: "supply",
                critical = true,
                block = num,
                error = %err,
                "failed to persist supply checkpoint"
            );
            return Err(SupplyError::Storage(err));
        }
        Ok(())
    }

    fn catch_up(&self) {
        let started = self.frontier.lock().map(|f| f.last_num).unwrap_or_default();
        info!(target: "supply", from = started, head = self.chain.current_number(), "supply catch-up started");

        let result = loop {
            if self.stop.load(Ordering::Acquire) {
                break Err(SupplyError::Stopped);
            }
            let head = self.chain.current_number();
            let mut guard = self.frontier.lock();
            let Some(frontier) = guard.as_mut() else {
                break Err(SupplyError::NotRunning);
            };
            if frontier.last_num >= head {
                break Ok(frontier.last_num);
            }
            if let Err(err) = self.advance(frontier) {
                break Err(err);
            }
            if frontier.last_num % self.config.log_interval == 0 {
                info!(
                    target: "supply",
                    block = frontier.last_num,
                    head,
                    "supply catch-up in progress"
                );
            }
        };

        self.catching_up.store(false, Ordering::Release);
        match result {
            Ok(last) => info!(target: "supply", from = started, to = last, "supply catch-up finished"),
            Err(SupplyError::Stopped) => info!(target: "supply", "supply catch-up interrupted"),
            Err(err) => error!(target: "supply", error = %err, "supply catch-up aborted"),
        }
    }
}
