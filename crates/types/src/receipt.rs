use crate::address::Hash;
use serde::{Deserialize, Serialize};

/// Execution receipt for a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    /// Hash of the transaction the receipt corresponds to.
    pub tx_hash: Hash,
    /// Outcome status (1 = success).
    pub status: u8,
    /// Gas consumed by this transaction alone.
    pub gas_used: u64,
}

impl Receipt {
    pub fn new(tx_hash: Hash, gas_used: u64) -> Self {
        Self {
            tx_hash,
            status: 1,
            gas_used,
        }
    }
}
