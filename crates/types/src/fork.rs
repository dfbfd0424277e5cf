//! Hardfork schedule.
//!
//! Forks are activated by block height and ordered: once a fork is active,
//! every earlier fork is active as well.

use crate::address::Address;
use serde::{Deserialize, Serialize};

/// Protocol upgrades that change reward rules, oldest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Fork {
    PreMagma,
    Magma,
    Kore,
    Kaia,
}

/// Flag view of the active fork at a block.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rules {
    pub is_magma: bool,
    pub is_kore: bool,
    pub is_kaia: bool,
}

impl From<Fork> for Rules {
    fn from(fork: Fork) -> Self {
        Rules {
            is_magma: fork >= Fork::Magma,
            is_kore: fork >= Fork::Kore,
            is_kaia: fork >= Fork::Kaia,
        }
    }
}

impl Rules {
    pub fn fork(&self) -> Fork {
        if self.is_kaia {
            Fork::Kaia
        } else if self.is_kore {
            Fork::Kore
        } else if self.is_magma {
            Fork::Magma
        } else {
            Fork::PreMagma
        }
    }
}

/// One-shot treasury rebalance mechanisms whose burn is reported in a memo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RebalanceKind {
    Kip103,
    Kip160,
}

impl std::fmt::Display for RebalanceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RebalanceKind::Kip103 => f.write_str("kip103"),
            RebalanceKind::Kip160 => f.write_str("kip160"),
        }
    }
}

/// Activation block and contract of a rebalance mechanism.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RebalanceConfig {
    #[serde(default)]
    pub compatible_block: Option<u64>,
    #[serde(default)]
    pub contract: Option<Address>,
}

impl RebalanceConfig {
    /// The contract address if the mechanism is configured and active at `num`.
    pub fn active_contract(&self, num: u64) -> Option<Address> {
        let block = self.compatible_block.filter(|b| *b > 0)?;
        let contract = self.contract.filter(|c| !c.is_zero())?;
        (num >= block).then_some(contract)
    }
}

/// Chain-level configuration relevant to reward and supply accounting.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainConfig {
    pub chain_id: u64,
    #[serde(default)]
    pub magma_compatible_block: Option<u64>,
    #[serde(default)]
    pub kore_compatible_block: Option<u64>,
    #[serde(default)]
    pub kaia_compatible_block: Option<u64>,
    #[serde(default)]
    pub kip103: RebalanceConfig,
    #[serde(default)]
    pub kip160: RebalanceConfig,
}

impl ChainConfig {
    /// Latest fork active at block `num`.
    ///
    /// A later fork configured below an earlier one still implies the
    /// earlier one, which keeps the flags monotonic.
    pub fn fork_at(&self, num: u64) -> Fork {
        let active = |b: Option<u64>| b.is_some_and(|b| num >= b);
        if active(self.kaia_compatible_block) {
            Fork::Kaia
        } else if active(self.kore_compatible_block) {
            Fork::Kore
        } else if active(self.magma_compatible_block) {
            Fork::Magma
        } else {
            Fork::PreMagma
        }
    }

    pub fn rules(&self, num: u64) -> Rules {
        self.fork_at(num).into()
    }

    pub fn rebalance(&self, kind: RebalanceKind) -> &RebalanceConfig {
        match kind {
            RebalanceKind::Kip103 => &self.kip103,
            RebalanceKind::Kip160 => &self.kip160,
        }
    }

    /// Every fork active from genesis.
    pub fn all_forks_at_genesis() -> Self {
        Self {
            chain_id: 1,
            magma_compatible_block: Some(0),
            kore_compatible_block: Some(0),
            kaia_compatible_block: Some(0),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schedule() -> ChainConfig {
        ChainConfig {
            chain_id: 8217,
            magma_compatible_block: Some(100),
            kore_compatible_block: Some(200),
            kaia_compatible_block: Some(300),
            ..Default::default()
        }
    }

    #[test]
    fn forks_activate_by_height() {
        let config = schedule();
        assert_eq!(config.fork_at(0), Fork::PreMagma);
        assert_eq!(config.fork_at(99), Fork::PreMagma);
        assert_eq!(config.fork_at(100), Fork::Magma);
        assert_eq!(config.fork_at(250), Fork::Kore);
        assert_eq!(config.fork_at(300), Fork::Kaia);
    }

    #[test]
    fn rules_are_monotonic() {
        let rules = schedule().rules(300);
        assert!(rules.is_magma && rules.is_kore && rules.is_kaia);
        assert_eq!(rules.fork(), Fork::Kaia);

        let rules = schedule().rules(150);
        assert!(rules.is_magma && !rules.is_kore && !rules.is_kaia);
    }

    #[test]
    fn rebalance_requires_block_and_contract() {
        let contract = Address::from_low_u8(9);
        let unset = RebalanceConfig::default();
        assert_eq!(unset.active_contract(1_000), None);

        let zero_block = RebalanceConfig {
            compatible_block: Some(0),
            contract: Some(contract),
        };
        assert_eq!(zero_block.active_contract(1_000), None);

        let configured = RebalanceConfig {
            compatible_block: Some(500),
            contract: Some(contract),
        };
        assert_eq!(configured.active_contract(499), None);
        assert_eq!(configured.active_contract(500), Some(contract));
    }
}
