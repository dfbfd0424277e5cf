use crate::address::Hash;
use crate::block::Kei;
use serde::{Deserialize, Serialize};

/// Transaction envelope kind. Only the fee-relevant distinction is kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TxKind {
    /// Single gas price; the whole excess over the base fee is the tip.
    Legacy,
    /// Separate fee cap and tip cap.
    DynamicFee,
}

/// The fee-bearing view of a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub hash: Hash,
    pub kind: TxKind,
    /// Maximum price per gas the sender pays (equal to gas price for legacy).
    pub gas_fee_cap: Kei,
    /// Maximum priority fee per gas (equal to gas price for legacy).
    pub gas_tip_cap: Kei,
}

impl Transaction {
    /// Legacy transaction paying a flat `gas_price`.
    pub fn legacy(hash: Hash, gas_price: Kei) -> Self {
        Self {
            hash,
            kind: TxKind::Legacy,
            gas_fee_cap: gas_price,
            gas_tip_cap: gas_price,
        }
    }

    /// Dynamic-fee transaction with explicit caps.
    pub fn dynamic_fee(hash: Hash, gas_fee_cap: Kei, gas_tip_cap: Kei) -> Self {
        Self {
            hash,
            kind: TxKind::DynamicFee,
            gas_fee_cap,
            gas_tip_cap,
        }
    }

    /// Priority fee per gas actually paid on top of `base_fee`.
    ///
    /// `min(tip_cap, fee_cap - base_fee)`, never negative.
    pub fn effective_gas_tip(&self, base_fee: Kei) -> Kei {
        self.gas_tip_cap
            .min(self.gas_fee_cap.saturating_sub(base_fee))
    }
}
