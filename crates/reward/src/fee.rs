//! Transaction fee totals and the fee burn schedule.

use crate::config::RewardConfig;
use crate::errors::RewardError;
use kaia_types::{Header, Kei, Receipt, Transaction};

/// Total fee paid by the block's transactions.
///
/// - before Magma: `gas_used * unit_price`
/// - Magma until Kaia: `gas_used * base_fee`
/// - Kaia: `gas_used * base_fee + Σ receipt.gas_used * tx.effective_gas_tip(base_fee)`
pub fn total_fee(
    rc: &RewardConfig,
    header: &Header,
    txs: &[Transaction],
    receipts: &[Receipt],
) -> Result<Kei, RewardError> {
    let gas_used = header.gas_used as Kei;

    if !rc.is_magma() {
        return gas_used
            .checked_mul(rc.unit_price as Kei)
            .ok_or(RewardError::Overflow("total fee"));
    }

    let base_fee = header
        .base_fee
        .ok_or(RewardError::MissingBaseFee(header.number))?;
    let mut fee = gas_used
        .checked_mul(base_fee)
        .ok_or(RewardError::Overflow("total fee"))?;

    if rc.is_kaia() {
        if txs.len() != receipts.len() {
            return Err(RewardError::TxReceiptMismatch {
                txs: txs.len(),
                receipts: receipts.len(),
            });
        }
        for (tx, receipt) in txs.iter().zip(receipts) {
            let tip = tx
                .effective_gas_tip(base_fee)
                .checked_mul(receipt.gas_used as Kei)
                .ok_or(RewardError::Overflow("priority fee"))?;
            fee = fee
                .checked_add(tip)
                .ok_or(RewardError::Overflow("total fee"))?;
        }
    }

    Ok(fee)
}

/// Magma: half of the fee is burnt, rounding down.
pub fn burn_amount_magma(total_fee: Kei) -> Kei {
    total_fee / 2
}

/// Portion of the fee burnt under the active fork.
///
/// From Kore, on top of the Magma half, the proposer's remaining fee share
/// is burnt up to what the proposer mints, so a proposer gains from traffic
/// at most as much as it would have minted anyway.
pub fn burn_amount(rc: &RewardConfig, total_fee: Kei) -> Kei {
    if !rc.is_magma() {
        return 0;
    }
    let magma = burn_amount_magma(total_fee);
    if !rc.is_kore() {
        return magma;
    }
    let remaining = total_fee - magma;
    magma + remaining.min(rc.proposer_minting_share())
}
