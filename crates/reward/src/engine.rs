//! Block reward engine.
//!
//! Ties governance parameters, chain data and staking snapshots together to
//! produce the reward breakdown of a block. Every method is a pure function
//! of chain data; the engine holds no mutable state.

use crate::config::RewardConfig;
use crate::distribution::calc_deferred_reward;
use crate::errors::RewardError;
use crate::fee::{burn_amount, total_fee};
use crate::params::GovModule;
use crate::spec::{RewardSpec, RewardSummary};
use kaia_staking::{StakingInfo, StakingModule};
use kaia_types::{Block, Chain, Header, Receipt, Transaction};
use std::sync::Arc;
use tracing::debug;

/// Anything able to report the supply-relevant totals of a block.
pub trait RewardSummarySource: Send + Sync {
    fn reward_summary(&self, num: u64) -> Result<RewardSummary, RewardError>;
}

pub struct RewardEngine {
    chain: Arc<dyn Chain>,
    gov: Arc<dyn GovModule>,
    staking: Arc<dyn StakingModule>,
}

impl RewardEngine {
    pub fn new(chain: Arc<dyn Chain>, gov: Arc<dyn GovModule>, staking: Arc<dyn StakingModule>) -> Self {
        Self { chain, gov, staking }
    }

    pub fn chain(&self) -> &Arc<dyn Chain> {
        &self.chain
    }

    /// Reward rules effective at block `num`.
    pub fn reward_config(&self, num: u64) -> Result<RewardConfig, RewardError> {
        let params = self
            .gov
            .effective_param_set(num)
            .map_err(|source| RewardError::Governance { num, source })?;
        RewardConfig::new(self.chain.config().rules(num), &params)
    }

    /// Reward to credit at the end of the block being finalized.
    ///
    /// In non-deferred mode the fee part is excluded (except for the legacy
    /// simple-policy case before Magma) since it was credited per
    /// transaction.
    pub fn deferred_reward(
        &self,
        header: &Header,
        txs: &[Transaction],
        receipts: &[Receipt],
    ) -> Result<RewardSpec, RewardError> {
        let rc = self.reward_config(header.number)?;
        let fee = total_fee(&rc, header, txs, receipts)?;
        let staking = self.staking_for(&rc, header.number)?;
        Ok(calc_deferred_reward(header, &rc, fee, staking.as_deref()))
    }

    /// Everything block `num` paid out, including fees credited during
    /// execution in non-deferred mode.
    pub fn block_reward(&self, num: u64) -> Result<RewardSpec, RewardError> {
        let (block, receipts) = self.block_with_receipts(num)?;
        let header = &block.header;

        let rc = self.reward_config(num)?;
        let fee = total_fee(&rc, header, &block.transactions, &receipts)?;
        let staking = self.staking_for(&rc, num)?;
        let mut spec = calc_deferred_reward(header, &rc, fee, staking.as_deref());

        let fee_excluded = !rc.deferred_tx_fee && !(rc.policy.is_simple() && !rc.is_magma());
        if fee_excluded {
            let burnt = burn_amount(&rc, fee);
            let unburnt = fee - burnt;
            let recipient = if rc.is_magma() {
                header.rewardbase
            } else {
                self.chain
                    .author(header)
                    .map_err(|source| RewardError::Author { num, source })?
            };

            spec.total_fee = fee;
            spec.burnt_fee = burnt;
            spec.proposer += unburnt;
            spec.increase_account(recipient, unburnt);
        }

        debug!(
            target: "reward",
            block = num,
            fork = ?rc.fork,
            policy = ?rc.policy,
            deferred = rc.deferred_tx_fee,
            minted = %spec.minted,
            total_fee = %spec.total_fee,
            burnt_fee = %spec.burnt_fee,
            "block reward"
        );
        Ok(spec)
    }

    /// Minted, fee and burnt totals of block `num`, without distribution.
    pub fn reward_summary(&self, num: u64) -> Result<RewardSummary, RewardError> {
        let rc = self.reward_config(num)?;
        let fee = if rc.is_kaia() {
            let (block, receipts) = self.block_with_receipts(num)?;
            total_fee(&rc, &block.header, &block.transactions, &receipts)?
        } else {
            let header = self
                .chain
                .header_by_number(num)
                .ok_or(RewardError::BlockNotFound(num))?;
            total_fee(&rc, &header, &[], &[])?
        };

        Ok(RewardSummary {
            minted: rc.minting_amount,
            total_fee: fee,
            burnt_fee: burn_amount(&rc, fee),
        })
    }

    fn block_with_receipts(&self, num: u64) -> Result<(Block, Vec<Receipt>), RewardError> {
        let block = self
            .chain
            .block_by_number(num)
            .ok_or(RewardError::BlockNotFound(num))?;
        let receipts = self
            .chain
            .receipts_by_hash(&block.hash())
            .ok_or(RewardError::ReceiptsNotFound(num))?;
        Ok((block, receipts))
    }

    fn staking_for(&self, rc: &RewardConfig, num: u64) -> Result<Option<Arc<StakingInfo>>, RewardError> {
        if rc.policy.is_simple() {
            return Ok(None);
        }
        self.staking
            .staking_info(num)
            .map_err(|source| RewardError::Staking { num, source })
    }
}

impl RewardSummarySource for RewardEngine {
    fn reward_summary(&self, num: u64) -> Result<RewardSummary, RewardError> {
        RewardEngine::reward_summary(self, num)
    }
}
