//! Per-block staking snapshot and validator consolidation.

use crate::errors::StakingError;
use crate::gini::compute_gini;
use kaia_types::Address;
use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

/// Liquid staking pool attached to a validator node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiquidStakingInfo {
    pub node_id: Address,
    pub pool_addr: Address,
    /// Whole-token units.
    pub staking_amount: u64,
}

/// Raw staking figures as read from the staking contracts.
///
/// `node_ids`, `staking_contracts`, `reward_addrs` and `staking_amounts` are
/// parallel arrays: index `i` in each describes the same staking contract.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakingSnapshot {
    pub block_num: u64,
    pub node_ids: Vec<Address>,
    pub staking_contracts: Vec<Address>,
    pub reward_addrs: Vec<Address>,
    /// Whole-token units.
    pub staking_amounts: Vec<u64>,
    pub fund1_addr: Address,
    pub fund2_addr: Address,
    #[serde(default)]
    pub liquid_staking_infos: Vec<LiquidStakingInfo>,
}

/// One logical validator: every raw entry sharing a reward address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsolidatedNode {
    pub node_ids: Vec<Address>,
    pub staking_contracts: Vec<Address>,
    pub reward_addr: Address,
    /// Sum of the merged entries, whole-token units.
    pub staking_amount: u64,
    pub liquid_staking: Option<LiquidStakingInfo>,
}

/// Immutable staking snapshot with lazily derived views.
#[derive(Debug)]
pub struct StakingInfo {
    snapshot: StakingSnapshot,
    consolidated: OnceCell<Vec<ConsolidatedNode>>,
    gini_by_min_stake: Mutex<HashMap<u64, Option<f64>>>,
}

impl TryFrom<StakingSnapshot> for StakingInfo {
    type Error = StakingError;

    fn try_from(snapshot: StakingSnapshot) -> Result<Self, Self::Error> {
        let n = snapshot.node_ids.len();
        if snapshot.staking_contracts.len() != n
            || snapshot.reward_addrs.len() != n
            || snapshot.staking_amounts.len() != n
        {
            return Err(StakingError::LengthMismatch {
                node_ids: n,
                staking_contracts: snapshot.staking_contracts.len(),
                reward_addrs: snapshot.reward_addrs.len(),
                staking_amounts: snapshot.staking_amounts.len(),
            });
        }

        Ok(Self {
            snapshot,
            consolidated: OnceCell::new(),
            gini_by_min_stake: Mutex::new(HashMap::new()),
        })
    }
}

impl StakingInfo {
    pub fn new(snapshot: StakingSnapshot) -> Result<Self, StakingError> {
        Self::try_from(snapshot)
    }

    pub fn snapshot(&self) -> &StakingSnapshot {
        &self.snapshot
    }

    pub fn block_num(&self) -> u64 {
        self.snapshot.block_num
    }

    pub fn fund1_addr(&self) -> Address {
        self.snapshot.fund1_addr
    }

    pub fn fund2_addr(&self) -> Address {
        self.snapshot.fund2_addr
    }

    /// Validators merged by reward address, in first-appearance order.
    pub fn consolidated_nodes(&self) -> &[ConsolidatedNode] {
        self.consolidated.get_or_init(|| consolidate(&self.snapshot))
    }

    /// Gini coefficient over consolidated stakes of at least `min_stake`.
    ///
    /// `None` when no node qualifies. Memoized per threshold.
    pub fn gini(&self, min_stake: u64) -> Option<f64> {
        if let Some(cached) = self.gini_by_min_stake.lock().get(&min_stake) {
            return *cached;
        }

        let amounts: Vec<f64> = self
            .consolidated_nodes()
            .iter()
            .filter(|node| node.staking_amount >= min_stake)
            .map(|node| node.staking_amount as f64)
            .collect();
        let gini = if amounts.is_empty() {
            None
        } else {
            Some(compute_gini(amounts))
        };

        debug!(
            target: "staking",
            block = self.snapshot.block_num,
            min_stake,
            ?gini,
            "computed gini coefficient"
        );
        self.gini_by_min_stake.lock().insert(min_stake, gini);
        gini
    }
}

fn consolidate(snapshot: &StakingSnapshot) -> Vec<ConsolidatedNode> {
    let mut position: HashMap<Address, usize> = HashMap::new();
    let mut nodes: Vec<ConsolidatedNode> = Vec::new();

    for (i, reward_addr) in snapshot.reward_addrs.iter().enumerate() {
        let node_id = snapshot.node_ids[i];
        let contract = snapshot.staking_contracts[i];
        let amount = snapshot.staking_amounts[i];

        match position.get(reward_addr) {
            Some(&at) => {
                let node = &mut nodes[at];
                node.node_ids.push(node_id);
                node.staking_contracts.push(contract);
                node.staking_amount = node.staking_amount.saturating_add(amount);
            }
            None => {
                position.insert(*reward_addr, nodes.len());
                nodes.push(ConsolidatedNode {
                    node_ids: vec![node_id],
                    staking_contracts: vec![contract],
                    reward_addr: *reward_addr,
                    staking_amount: amount,
                    liquid_staking: None,
                });
            }
        }
    }

    if !snapshot.liquid_staking_infos.is_empty() {
        for node in &mut nodes {
            node.liquid_staking = node.node_ids.iter().find_map(|id| {
                snapshot
                    .liquid_staking_infos
                    .iter()
                    .find(|info| info.node_id == *id)
                    .cloned()
            });
        }
    }

    nodes
}
