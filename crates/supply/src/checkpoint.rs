//! Checkpoint accumulation.
//!
//! `checkpoint(n) = checkpoint(n - 1) + reward_summary(n)`, starting from the
//! genesis allocation at block 0.

use crate::errors::SupplyError;
use kaia_reward::{RewardSummary, RewardSummarySource};
use kaia_storage::SupplyCheckpoint;
use kaia_types::{Chain, Kei};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::info;

/// Fold one block's summary into the running totals.
pub fn accumulate_checkpoint(
    prev: &SupplyCheckpoint,
    summary: &RewardSummary,
) -> Result<SupplyCheckpoint, SupplyError> {
    Ok(SupplyCheckpoint {
        minted: prev
            .minted
            .checked_add(summary.minted)
            .ok_or(SupplyError::Overflow("minted"))?,
        burnt_fee: prev
            .burnt_fee
            .checked_add(summary.burnt_fee)
            .ok_or(SupplyError::Overflow("burnt fee"))?,
    })
}

/// Totals after block 0: every genesis balance counts as minted.
pub fn genesis_checkpoint(chain: &dyn Chain) -> Result<SupplyCheckpoint, SupplyError> {
    let header = chain
        .header_by_number(0)
        .ok_or(SupplyError::BlockNotFound(0))?;
    let state = chain
        .state_at(&header.root)
        .map_err(|source| SupplyError::MissingState { num: 0, source })?;

    let mut minted: Kei = 0;
    let mut overflow = false;
    state
        .for_each_balance(&mut |_, balance| match minted.checked_add(balance) {
            Some(sum) => minted = sum,
            None => overflow = true,
        })
        .map_err(|source| SupplyError::MissingState { num: 0, source })?;
    if overflow {
        return Err(SupplyError::Overflow("genesis allocation"));
    }

    info!(target: "supply", minted = %minted, "computed genesis supply");
    Ok(SupplyCheckpoint::new(minted, 0))
}

/// Replay blocks `from + 1 ..= to` on top of `base`, the checkpoint at `from`.
///
/// Checked against `stop` before every block.
pub fn replay(
    rewards: &dyn RewardSummarySource,
    base: SupplyCheckpoint,
    from: u64,
    to: u64,
    stop: &AtomicBool,
) -> Result<SupplyCheckpoint, SupplyError> {
    let mut checkpoint = base;
    for num in from + 1..=to {
        if stop.load(Ordering::Acquire) {
            return Err(SupplyError::Stopped);
        }
        let summary = rewards.reward_summary(num)?;
        checkpoint = accumulate_checkpoint(&checkpoint, &summary)?;
    }
    Ok(checkpoint)
}
