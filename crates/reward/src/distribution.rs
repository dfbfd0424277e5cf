//! Deferred reward distribution.
//!
//! Two proposer policies produce different splits:
//! - simple (round-robin, sticky): everything goes to the rewardbase;
//! - full (weighted random): minting is split by the reward ratio, and from
//!   Kore the validators' part is split again between proposer and stakers.
//!
//! Non-deferred mode zeroes the fee inputs because fees were already paid
//! during transaction execution.

use crate::config::RewardConfig;
use crate::fee::burn_amount;
use crate::ratio::mul_div;
use crate::spec::RewardSpec;
use kaia_staking::{ConsolidatedNode, StakingInfo};
use kaia_types::{Address, Header, Kei};
use std::collections::BTreeMap;
use tracing::debug;

/// Deferred reward for the block, dispatching on the proposer policy.
///
/// `total_fee` is the block's full fee; `staking` is only consulted by the
/// full policy.
pub fn calc_deferred_reward(
    header: &Header,
    rc: &RewardConfig,
    total_fee: Kei,
    staking: Option<&StakingInfo>,
) -> RewardSpec {
    if rc.policy.is_simple() {
        calc_deferred_reward_simple(header, rc, total_fee)
    } else {
        calc_deferred_reward_full(header, rc, total_fee, staking)
    }
}

/// Simple policy: minting plus unburnt fee to the rewardbase.
///
/// Before Magma the fee is paid out here even in non-deferred mode, where
/// it was already credited during execution. That double payment is part
/// of the historical chain and must be reproduced.
pub fn calc_deferred_reward_simple(header: &Header, rc: &RewardConfig, total_fee: Kei) -> RewardSpec {
    let minted = rc.minting_amount;
    let mut spec = RewardSpec::new();
    spec.minted = minted;

    if !rc.deferred_tx_fee && rc.is_magma() {
        spec.proposer = minted;
        spec.increase_account(header.rewardbase, minted);
        debug!(
            target: "reward",
            block = header.number,
            proposer = %spec.proposer,
            "simple reward, fees paid during execution"
        );
        return spec;
    }

    let burnt = burn_amount(rc, total_fee);
    spec.total_fee = total_fee;
    spec.burnt_fee = burnt;
    spec.proposer = minted + (total_fee - burnt);
    spec.increase_account(header.rewardbase, spec.proposer);

    debug!(
        target: "reward",
        block = header.number,
        minted = %minted,
        total_fee = %total_fee,
        burnt_fee = %burnt,
        "simple reward"
    );
    spec
}

/// Full policy: ratio split, KIP-82 split, staker shares and fund fallback.
pub fn calc_deferred_reward_full(
    header: &Header,
    rc: &RewardConfig,
    total_fee: Kei,
    staking: Option<&StakingInfo>,
) -> RewardSpec {
    let minted = rc.minting_amount;
    let (total_fee, reward_fee, burnt_fee) = if rc.deferred_tx_fee {
        let burnt = burn_amount(rc, total_fee);
        (total_fee, total_fee - burnt, burnt)
    } else {
        (0, 0, 0)
    };

    let (mut proposer, mut stakers, mut fund1, mut fund2) = if rc.is_kore() {
        let split = rc.ratio.split(minted);
        let (proposer, stakers, kip82_remainder) = rc.kip82.split(split.validators);
        (
            proposer + kip82_remainder + reward_fee,
            stakers,
            split.fund1 + split.remainder,
            split.fund2,
        )
    } else {
        let split = rc.ratio.split(minted + reward_fee);
        (split.validators, 0, split.fund1 + split.remainder, split.fund2)
    };

    let nodes = staking.map(|s| s.consolidated_nodes()).unwrap_or(&[]);
    let (shares, share_remainder) = assign_staking_rewards(nodes, stakers, rc.minimum_stake);
    proposer += share_remainder;
    stakers -= share_remainder;

    let fund1_addr = staking.map(|s| s.fund1_addr()).unwrap_or(Address::ZERO);
    let fund2_addr = staking.map(|s| s.fund2_addr()).unwrap_or(Address::ZERO);
    if fund1_addr.is_zero() {
        proposer += fund1;
        fund1 = 0;
    }
    if fund2_addr.is_zero() {
        proposer += fund2;
        fund2 = 0;
    }

    let mut spec = RewardSpec {
        minted,
        total_fee,
        burnt_fee,
        proposer,
        stakers,
        fund1,
        fund2,
        rewards: BTreeMap::new(),
    };
    spec.increase_account(header.rewardbase, proposer);
    spec.increase_account(fund1_addr, fund1);
    spec.increase_account(fund2_addr, fund2);
    for (addr, amount) in shares {
        spec.increase_account(addr, amount);
    }

    debug!(
        target: "reward",
        block = header.number,
        minted = %minted,
        total_fee = %total_fee,
        burnt_fee = %burnt_fee,
        proposer = %spec.proposer,
        stakers = %spec.stakers,
        fund1 = %spec.fund1,
        fund2 = %spec.fund2,
        "full reward"
    );
    spec
}

/// Split `stakers_reward` across nodes staking more than `minimum_stake`,
/// proportional to the excess over it.
///
/// Returns the per-reward-address shares and the undistributed remainder.
/// Nodes at or below the threshold receive nothing; zero shares are skipped.
pub fn assign_staking_rewards(
    nodes: &[ConsolidatedNode],
    stakers_reward: Kei,
    minimum_stake: u64,
) -> (BTreeMap<Address, Kei>, Kei) {
    let mut shares = BTreeMap::new();
    if stakers_reward == 0 {
        return (shares, 0);
    }

    let excess = |node: &ConsolidatedNode| -> Kei {
        (node.staking_amount.saturating_sub(minimum_stake)) as Kei
    };
    let total_excess: Kei = nodes.iter().map(excess).sum();
    if total_excess == 0 {
        return (shares, stakers_reward);
    }

    let mut assigned: Kei = 0;
    for node in nodes {
        let weight = excess(node);
        if weight == 0 {
            continue;
        }
        let share = mul_div(stakers_reward, weight, total_excess);
        if share == 0 {
            continue;
        }
        *shares.entry(node.reward_addr).or_insert(0) += share;
        assigned += share;
    }

    (shares, stakers_reward - assigned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::{ParamSet, ProposerPolicy};
    use kaia_staking::StakingSnapshot;
    use kaia_types::Fork;

    const KAIA: Kei = 1_000_000_000_000_000_000;

    fn addr(n: u8) -> Address {
        Address::from_low_u8(n)
    }

    fn node(reward: u8, amount: u64) -> ConsolidatedNode {
        ConsolidatedNode {
            node_ids: vec![addr(reward + 100)],
            staking_contracts: vec![addr(reward + 50)],
            reward_addr: addr(reward),
            staking_amount: amount,
            liquid_staking: None,
        }
    }

    fn config(fork: Fork, policy: ProposerPolicy, deferred: bool) -> RewardConfig {
        RewardConfig::new(
            fork.into(),
            &ParamSet {
                proposer_policy: policy,
                deferred_tx_fee: deferred,
                ..Default::default()
            },
        )
        .unwrap()
    }

    fn header() -> Header {
        Header {
            number: 1,
            rewardbase: addr(1),
            ..Default::default()
        }
    }

    fn staking(funds: bool) -> StakingInfo {
        StakingInfo::new(StakingSnapshot {
            block_num: 0,
            node_ids: vec![addr(10), addr(11), addr(12)],
            staking_contracts: vec![addr(20), addr(21), addr(22)],
            reward_addrs: vec![addr(30), addr(31), addr(32)],
            staking_amounts: vec![5_000_000, 6_000_000, 8_000_000],
            fund1_addr: if funds { addr(40) } else { Address::ZERO },
            fund2_addr: if funds { addr(41) } else { Address::ZERO },
            liquid_staking_infos: vec![],
        })
        .unwrap()
    }

    fn assert_conserved(spec: &RewardSpec) {
        let expected = spec.minted + spec.total_fee - spec.burnt_fee;
        assert_eq!(spec.distributed(), expected);
        assert_eq!(spec.credited(), expected);
    }

    #[test]
    fn staking_shares_follow_excess_over_minimum() {
        let nodes = vec![node(1, 5_000_000), node(2, 6_000_000), node(3, 8_000_000)];
        let (shares, rem) = assign_staking_rewards(&nodes, 1_000, 5_000_000);
        assert!(!shares.contains_key(&addr(1)));
        assert_eq!(shares[&addr(2)], 250);
        assert_eq!(shares[&addr(3)], 750);
        assert_eq!(rem, 0);
    }

    #[test]
    fn staking_remainder_is_returned() {
        let nodes = vec![node(1, 6), node(2, 6), node(3, 6)];
        let (shares, rem) = assign_staking_rewards(&nodes, 100, 5);
        assert_eq!(shares.values().copied().collect::<Vec<_>>(), vec![33, 33, 33]);
        assert_eq!(rem, 1);
    }

    #[test]
    fn no_eligible_nodes_leaves_everything_undistributed() {
        let nodes = vec![node(1, 5), node(2, 4)];
        let (shares, rem) = assign_staking_rewards(&nodes, 100, 5);
        assert!(shares.is_empty());
        assert_eq!(rem, 100);
    }

    #[test]
    fn simple_pre_magma_non_deferred_reproduces_legacy_fee_payout() {
        let rc = config(Fork::PreMagma, ProposerPolicy::RoundRobin, false);
        let spec = calc_deferred_reward_simple(&header(), &rc, 70_000_000_000_000_000);
        assert_eq!(spec.proposer, 6_470_000_000_000_000_000);
        assert_eq!(spec.burnt_fee, 0);
        assert_eq!(spec.total_fee, 70_000_000_000_000_000);
        assert_eq!(spec.rewards[&addr(1)], 6_470_000_000_000_000_000);
        assert_conserved(&spec);
    }

    #[test]
    fn simple_magma_non_deferred_excludes_fees() {
        let rc = config(Fork::Magma, ProposerPolicy::Sticky, false);
        let spec = calc_deferred_reward_simple(&header(), &rc, KAIA);
        assert_eq!(spec.proposer, rc.minting_amount);
        assert_eq!(spec.total_fee, 0);
        assert_eq!(spec.burnt_fee, 0);
        assert_conserved(&spec);
    }

    #[test]
    fn simple_magma_deferred_burns_half() {
        let rc = config(Fork::Magma, ProposerPolicy::RoundRobin, true);
        let spec = calc_deferred_reward_simple(&header(), &rc, KAIA);
        assert_eq!(spec.burnt_fee, KAIA / 2);
        assert_eq!(spec.proposer, rc.minting_amount + KAIA / 2);
        assert_conserved(&spec);
    }

    #[test]
    fn full_kore_burns_up_to_proposer_minting_share() {
        let rc = config(Fork::Kore, ProposerPolicy::WeightedRandom, true);
        let info = staking(true);
        let spec = calc_deferred_reward_full(&header(), &rc, 2 * KAIA, Some(&info));

        assert_eq!(spec.burnt_fee, 1_640_000_000_000_000_000);
        // 0.64 minted + (1.0 - 0.64) unburnt fee
        assert_eq!(spec.proposer, KAIA);
        assert_eq!(spec.stakers, 2_560_000_000_000_000_000);
        assert_eq!(spec.fund1, 2_560_000_000_000_000_000);
        assert_eq!(spec.fund2, 640_000_000_000_000_000);
        assert_eq!(spec.rewards[&addr(31)], 640_000_000_000_000_000);
        assert_eq!(spec.rewards[&addr(32)], 1_920_000_000_000_000_000);
        assert!(!spec.rewards.contains_key(&addr(30)));
        assert_conserved(&spec);
    }

    #[test]
    fn full_pre_kore_folds_fee_into_split() {
        let rc = config(Fork::Magma, ProposerPolicy::WeightedRandom, true);
        let info = staking(true);
        let spec = calc_deferred_reward_full(&header(), &rc, 2 * KAIA, Some(&info));

        // (6.4 + 1.0) split 50/40/10
        assert_eq!(spec.burnt_fee, KAIA);
        assert_eq!(spec.proposer, 3_700_000_000_000_000_000);
        assert_eq!(spec.stakers, 0);
        assert_eq!(spec.fund1, 2_960_000_000_000_000_000);
        assert_eq!(spec.fund2, 740_000_000_000_000_000);
        assert_conserved(&spec);
    }

    #[test]
    fn unset_funds_fall_back_to_proposer() {
        let rc = config(Fork::Kore, ProposerPolicy::WeightedRandom, true);
        let info = staking(false);
        let spec = calc_deferred_reward_full(&header(), &rc, 0, Some(&info));
        assert_eq!(spec.fund1, 0);
        assert_eq!(spec.fund2, 0);
        assert_eq!(spec.rewards.get(&Address::ZERO), None);
        assert_eq!(spec.proposer, 640_000_000_000_000_000 + 3_200_000_000_000_000_000);
        assert_conserved(&spec);

        let without_staking = calc_deferred_reward_full(&header(), &rc, 0, None);
        assert_eq!(without_staking.proposer, rc.minting_amount);
        assert_eq!(without_staking.stakers, 0);
        assert_conserved(&without_staking);
    }

    #[test]
    fn full_non_deferred_ignores_fee_inputs() {
        let rc = config(Fork::Kore, ProposerPolicy::WeightedRandom, false);
        let spec = calc_deferred_reward_full(&header(), &rc, 2 * KAIA, Some(&staking(true)));
        assert_eq!(spec.total_fee, 0);
        assert_eq!(spec.burnt_fee, 0);
        assert_eq!(spec.proposer, 640_000_000_000_000_000);
        assert_conserved(&spec);
    }

    #[test]
    fn ratio_remainders_go_to_fund1_and_proposer() {
        let rc = RewardConfig::new(
            Fork::Kore.into(),
            &ParamSet {
                minting_amount: 101,
                ratio: "33/33/34".to_string(),
                kip82_ratio: "33/67".to_string(),
                ..Default::default()
            },
        )
        .unwrap();
        let spec = calc_deferred_reward_full(&header(), &rc, 0, Some(&staking(true)));
        // validators 33 -> proposer 10 + kip82 remainder 1, stakers 22
        assert_eq!(spec.fund1, 33 + 1);
        assert_eq!(spec.fund2, 34);
        assert_eq!(spec.proposer + spec.stakers, 33);
        assert_conserved(&spec);
    }
}
