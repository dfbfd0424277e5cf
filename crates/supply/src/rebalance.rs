//! Treasury rebalance burns (KIP-103, KIP-160).
//!
//! A rebalance contract records its outcome in a JSON memo once the
//! rebalance block has been processed. Until then the burnt amount is
//! unknown, and an empty memo cannot be told apart from a zero burn, so it
//! is reported as unresolved.

use crate::errors::SupplyError;
use anyhow::Result;
use kaia_types::{Address, ChainConfig, Kei, RebalanceKind};
use moka::sync::Cache as MokaCache;
use parking_lot::RwLock;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Read-only contract access against the latest state.
pub trait ContractCaller: Send + Sync {
    /// Raw return value of a parameterless view method.
    fn call(&self, contract: &Address, method: &str) -> Result<Vec<u8>>;
}

/// Contract return values held in memory.
#[derive(Default)]
pub struct MemoryContractCaller {
    results: RwLock<HashMap<(Address, String), Vec<u8>>>,
}

impl MemoryContractCaller {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_result(&self, contract: Address, method: &str, result: impl Into<Vec<u8>>) {
        self.results
            .write()
            .insert((contract, method.to_string()), result.into());
    }
}

impl ContractCaller for MemoryContractCaller {
    fn call(&self, contract: &Address, method: &str) -> Result<Vec<u8>> {
        self.results
            .read()
            .get(&(*contract, method.to_string()))
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("execution reverted: {contract}.{method}()"))
    }
}

pub const MEMO_METHOD: &str = "memo";

/// Decoded rebalance memo. Other fields (retirees, newbies) are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RebalanceMemo {
    pub burnt: Kei,
    pub success: bool,
}

/// Parse a memo, rejecting anything that is not a finalized record.
pub fn parse_memo(
    kind: RebalanceKind,
    contract: Address,
    raw: &[u8],
) -> Result<RebalanceMemo, SupplyError> {
    let unresolved = |reason: String| SupplyError::MemoUnresolved {
        kind,
        contract,
        reason,
    };

    if raw.is_empty() {
        return Err(unresolved("empty memo".to_string()));
    }
    let memo: RebalanceMemo =
        serde_json::from_slice(raw).map_err(|e| unresolved(format!("undecodable memo: {e}")))?;
    if !memo.success {
        return Err(unresolved("rebalance not successful".to_string()));
    }
    Ok(memo)
}

/// Burnt amounts of the rebalance mechanisms, cached per contract once
/// finalized.
pub struct RebalanceBurns {
    caller: Arc<dyn ContractCaller>,
    memos: MokaCache<Address, Kei>,
}

impl RebalanceBurns {
    pub fn new(caller: Arc<dyn ContractCaller>, capacity: u64) -> Self {
        Self {
            caller,
            memos: MokaCache::builder().max_capacity(capacity).build(),
        }
    }

    /// Amount burnt by `kind` as of block `num`.
    ///
    /// Zero while the mechanism is unconfigured or not yet active.
    pub fn burnt(&self, config: &ChainConfig, kind: RebalanceKind, num: u64) -> Result<Kei, SupplyError> {
        let Some(contract) = config.rebalance(kind).active_contract(num) else {
            return Ok(0);
        };

        if let Some(burnt) = self.memos.get(&contract) {
            return Ok(burnt);
        }

        let raw = self
            .caller
            .call(&contract, MEMO_METHOD)
            .map_err(|source| SupplyError::ContractCall { kind, source })?;
        let memo = parse_memo(kind, contract, &raw)?;
        debug!(target: "supply", %kind, %contract, burnt = %memo.burnt, "cached rebalance memo");
        self.memos.insert(contract, memo.burnt);
        Ok(memo.burnt)
    }

    pub fn clear(&self) {
        self.memos.invalidate_all();
    }
}
